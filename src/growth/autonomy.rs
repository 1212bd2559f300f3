//! Mission evaluation: the deterministic rule the scheduler's autonomy
//! phase uses to decide whether a growing Seed should keep growing, be
//! harvested, or composted, based on the state of its agents.

use crate::agents::LlmEvalBudget;
use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{AgentNode, AgentStatus, Seed, SeedStatus};
use crate::error::DatabaseError;
use crate::textmodel::TextModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionVerdict {
    Continue,
    Harvest,
    Compost,
}

fn is_active(status: AgentStatus) -> bool {
    matches!(
        status,
        AgentStatus::Spawning | AgentStatus::AwaitingApproval | AgentStatus::Idle | AgentStatus::Working
    )
}

fn is_concluded(status: AgentStatus) -> bool {
    matches!(status, AgentStatus::Completed | AgentStatus::Retired)
}

/// Any active agent → continue. No agents at all → continue. All
/// concluded agents failed → compost. At least 2 concluded successes →
/// harvest. Otherwise → continue.
pub fn evaluate_mission(agents: &[AgentNode]) -> MissionVerdict {
    if agents.is_empty() {
        return MissionVerdict::Continue;
    }
    if agents.iter().any(|a| is_active(a.status)) {
        return MissionVerdict::Continue;
    }

    let concluded: Vec<&AgentNode> = agents.iter().filter(|a| is_concluded(a.status)).collect();
    if concluded.is_empty() {
        return MissionVerdict::Continue;
    }

    let successes = concluded.iter().filter(|a| a.error.is_none() && a.result.is_some()).count();
    let all_failed = concluded.iter().all(|a| a.error.is_some());

    if all_failed {
        MissionVerdict::Compost
    } else if successes >= 2 {
        MissionVerdict::Harvest
    } else {
        MissionVerdict::Continue
    }
}

pub async fn harvest_seed(store: &impl Database, bus: &HormoneBus, seed: &mut Seed) -> Result<(), DatabaseError> {
    if seed.status == SeedStatus::Harvested {
        return Ok(());
    }
    seed.status = SeedStatus::Harvested;
    store.update_seed(seed).await?;
    let _ = bus
        .emit(Hormone::new(
            "auto_harvest",
            "autonomy",
            serde_json::json!({ "seed_id": seed.id, "themes": seed.themes }),
        ))
        .await;
    Ok(())
}

pub async fn compost_seed(store: &impl Database, bus: &HormoneBus, seed: &mut Seed) -> Result<(), DatabaseError> {
    if seed.status == SeedStatus::Composted {
        return Ok(());
    }
    seed.status = SeedStatus::Composted;
    seed.is_composted = true;
    store.update_seed(seed).await?;
    let _ = bus
        .emit(Hormone::new(
            "auto_compost",
            "autonomy",
            serde_json::json!({ "seed_id": seed.id }),
        ))
        .await;
    Ok(())
}

/// Seeds transitioned this tick, partitioned by verdict. The scheduler
/// uses `harvested` to trigger pollination afterward.
pub struct AutonomyOutcome {
    pub harvested: Vec<Seed>,
    pub composted: Vec<Seed>,
}

/// Optionally spend one LLM budget slot to narrate the decision; the
/// transition itself always follows the deterministic mission-evaluation
/// rule regardless of whether the narration succeeds.
async fn narrate(text_model: &TextModel, budget: &mut LlmEvalBudget, seed: &Seed, verdict: MissionVerdict) -> Option<String> {
    if !budget.try_spend() {
        return None;
    }
    let verb = match verdict {
        MissionVerdict::Harvest => "harvested",
        MissionVerdict::Compost => "composted",
        MissionVerdict::Continue => return None,
    };
    let prompt = format!(
        "In one short sentence, explain why the wish \"{}\" was just {verb} by its garden.",
        seed.essence
    );
    let text = text_model.generate(&prompt, None, 0.4, 60, "autonomy", "harvest_compost").await;
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Phase 2 of the tick: for every growing Seed, evaluate its mission
/// against its agents and apply the harvest/compost/continue verdict.
/// Runs with no store transaction held across the text-model call.
pub async fn decide_harvest_compost(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    budget: &mut LlmEvalBudget,
) -> Result<AutonomyOutcome, DatabaseError> {
    let growing = store.list_seeds_by_status(SeedStatus::Growing).await?;
    let mut harvested = Vec::new();
    let mut composted = Vec::new();

    for mut seed in growing {
        let agents = store.list_agents_for_seed(&seed.id).await?;
        let verdict = evaluate_mission(&agents);

        match verdict {
            MissionVerdict::Continue => continue,
            MissionVerdict::Harvest => {
                let narration = narrate(text_model, budget, &seed, verdict).await;
                if let Some(text) = narration {
                    let _ = bus
                        .emit(Hormone::new(
                            "harvest",
                            "autonomy",
                            serde_json::json!({ "seed_id": seed.id, "narration": text }),
                        ))
                        .await;
                }
                harvest_seed(store, bus, &mut seed).await?;
                harvested.push(seed);
            }
            MissionVerdict::Compost => {
                let narration = narrate(text_model, budget, &seed, verdict).await;
                if let Some(text) = narration {
                    let _ = bus
                        .emit(Hormone::new(
                            "compost",
                            "autonomy",
                            serde_json::json!({ "seed_id": seed.id, "narration": text }),
                        ))
                        .await;
                }
                compost_seed(store, bus, &mut seed).await?;
                composted.push(seed);
            }
        }
    }

    Ok(AutonomyOutcome { harvested, composted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn agent(status: AgentStatus, error: Option<&str>, result: Option<&str>) -> AgentNode {
        AgentNode {
            id: "a".to_string(),
            name: "analyze_01".to_string(),
            agent_type: crate::domain::AgentCapability::Analyze,
            status,
            parent_id: None,
            seed_id: None,
            task_description: String::new(),
            capability_params: serde_json::Value::Null,
            context: serde_json::Value::Null,
            result: result.map(str::to_string),
            error: error.map(str::to_string),
            spawned_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retired_at: None,
        }
    }

    #[test]
    fn no_agents_continues() {
        assert_eq!(evaluate_mission(&[]), MissionVerdict::Continue);
    }

    #[test]
    fn any_active_agent_continues() {
        let agents = vec![agent(AgentStatus::Working, None, None)];
        assert_eq!(evaluate_mission(&agents), MissionVerdict::Continue);
    }

    #[test]
    fn all_failed_composts() {
        let agents = vec![
            agent(AgentStatus::Retired, Some("boom"), None),
            agent(AgentStatus::Completed, Some("boom"), None),
        ];
        assert_eq!(evaluate_mission(&agents), MissionVerdict::Compost);
    }

    #[test]
    fn two_successes_harvests() {
        let agents = vec![
            agent(AgentStatus::Retired, None, Some("ok")),
            agent(AgentStatus::Retired, None, Some("ok")),
        ];
        assert_eq!(evaluate_mission(&agents), MissionVerdict::Harvest);
    }

    #[test]
    fn one_success_continues() {
        let agents = vec![agent(AgentStatus::Retired, None, Some("ok"))];
        assert_eq!(evaluate_mission(&agents), MissionVerdict::Continue);
    }
}

//! Per-tick agent orchestration: retire, execute, retire again, plan
//! missions for growing Seeds that lack active agents.

use crate::agents::lifecycle::{self, mark_completed, mark_working};
use crate::agents::{handlers, LlmEvalBudget};
use crate::bus::{Hormone, HormoneBus};
use crate::config::WorkspaceConfig;
use crate::db::Database;
use crate::domain::{AgentCapability, AgentNode, AgentStatus, SeedStatus};
use crate::error::{AgentError, AgentResult};
use crate::textmodel::TextModel;

const MAX_WORKING_PER_TICK: usize = 4;
const MAX_MISSION_PLANS_PER_TICK: usize = 2;

async fn execute_handler(
    workspace: &WorkspaceConfig,
    text_model: &TextModel,
    agent: &AgentNode,
) -> Result<String, AgentError> {
    match agent.agent_type {
        AgentCapability::Analyze => handlers::analyze(text_model, &agent.capability_params).await,
        AgentCapability::Summarize => handlers::summarize(text_model, &agent.capability_params).await,
        AgentCapability::Decompose => handlers::decompose(text_model, &agent.capability_params).await,
        AgentCapability::CodeGen => handlers::code_gen(text_model, &agent.capability_params).await,
        AgentCapability::Planner => handlers::planner(text_model, &agent.capability_params).await,
        AgentCapability::WebSearch => handlers::web_search(text_model, &agent.capability_params).await,
        AgentCapability::FileRead => handlers::file_read(workspace, &agent.capability_params).await,
        AgentCapability::FileWrite => handlers::file_write(workspace, &agent.capability_params).await,
        AgentCapability::CodeExec => handlers::code_exec(workspace, &agent.capability_params).await,
    }
}

/// Step 2–3 of orchestration: mark up to 4 idle agents working, execute
/// their handlers outside any store transaction, then persist the
/// outcome and retire newly completed agents.
pub async fn execute_idle_agents(
    store: &impl Database,
    bus: &HormoneBus,
    workspace: &WorkspaceConfig,
    text_model: &TextModel,
) -> AgentResult<usize> {
    let active = store.list_active_agents().await?;
    let mut to_run: Vec<AgentNode> = active
        .into_iter()
        .filter(|a| a.status == AgentStatus::Idle)
        .take(MAX_WORKING_PER_TICK)
        .collect();

    for agent in to_run.iter_mut() {
        mark_working(agent);
        store.update_agent(agent).await?;
    }

    let mut executed = 0;
    for mut agent in to_run {
        let outcome = execute_handler(workspace, text_model, &agent).await;
        match outcome {
            Ok(result) => mark_completed(&mut agent, Some(result), None),
            Err(e) => mark_completed(&mut agent, None, Some(e.to_string())),
        }
        store.update_agent(&agent).await?;
        let _ = bus
            .emit(Hormone::new(
                "agent_completed",
                "agents",
                serde_json::json!({ "agent_id": agent.id, "failed": agent.error.is_some() }),
            ))
            .await;
        executed += 1;
    }

    lifecycle::retire_completed(store, bus).await?;
    Ok(executed)
}

fn heuristic_initial_plan() -> Vec<(AgentCapability, &'static str)> {
    vec![
        (AgentCapability::Decompose, "decompose the seed's essence into concrete subtasks"),
        (AgentCapability::Analyze, "analyze the seed's current state"),
    ]
}

fn heuristic_followup(agents: &[AgentNode]) -> Option<(AgentCapability, &'static str)> {
    let has_decompose = agents.iter().any(|a| a.agent_type == AgentCapability::Decompose);
    let has_analyze = agents.iter().any(|a| a.agent_type == AgentCapability::Analyze);
    let has_summarize = agents.iter().any(|a| a.agent_type == AgentCapability::Summarize);

    if has_decompose && !has_analyze {
        Some((AgentCapability::Analyze, "analyze after decomposition"))
    } else if has_analyze && !has_summarize {
        Some((AgentCapability::Summarize, "summarize findings"))
    } else {
        None
    }
}

fn parse_llm_capability(name: &str) -> Option<AgentCapability> {
    match name {
        "analyze" => Some(AgentCapability::Analyze),
        "summarize" => Some(AgentCapability::Summarize),
        "decompose" => Some(AgentCapability::Decompose),
        "code_gen" => Some(AgentCapability::CodeGen),
        "planner" => Some(AgentCapability::Planner),
        "web_search" => Some(AgentCapability::WebSearch),
        "file_read" => Some(AgentCapability::FileRead),
        "code_exec" => Some(AgentCapability::CodeExec),
        "file_write" => Some(AgentCapability::FileWrite),
        _ => None,
    }
}

async fn propose_tasks(
    text_model: &TextModel,
    budget: &mut LlmEvalBudget,
    seed_essence: &str,
    max_tasks: usize,
) -> Vec<(AgentCapability, String)> {
    if !budget.try_spend() {
        return Vec::new();
    }
    let prompt = format!(
        "Propose up to {max_tasks} tasks (as a JSON array of {{\"capability\": ..., \
         \"description\": ...}} objects) to grow this wish: \"{seed_essence}\". Valid \
         capabilities: analyze, summarize, decompose, code_gen, planner, web_search, file_read."
    );
    let Some(parsed) = text_model
        .generate_json(&prompt, None, 0.5, 250, "agents", "mission_planning")
        .await
    else {
        return Vec::new();
    };
    let Some(array) = parsed.as_array() else {
        return Vec::new();
    };

    array
        .iter()
        .filter_map(|entry| {
            let capability = entry.get("capability")?.as_str()?;
            let capability = parse_llm_capability(capability)?;
            let description = entry
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unspecified task")
                .to_string();
            Some((capability, description))
        })
        .take(max_tasks)
        .collect()
}

/// Step 4 of orchestration: for up to 2 growing Seeds lacking active
/// agents, plan and spawn their next mission.
pub async fn plan_missions(
    store: &impl Database,
    bus: &HormoneBus,
    text_model: &TextModel,
    budget: &mut LlmEvalBudget,
) -> AgentResult<usize> {
    let growing = store.list_seeds_by_status(SeedStatus::Growing).await?;
    let mut planned = 0;

    for seed in growing.iter().take(MAX_MISSION_PLANS_PER_TICK * 4) {
        if planned >= MAX_MISSION_PLANS_PER_TICK {
            break;
        }
        let agents = store.list_agents_for_seed(&seed.id).await?;
        let has_active = agents.iter().any(|a| {
            matches!(a.status, AgentStatus::Idle | AgentStatus::Working | AgentStatus::AwaitingApproval)
        });
        if has_active {
            continue;
        }

        let tasks: Vec<(AgentCapability, String)> = if agents.is_empty() {
            let llm_tasks = propose_tasks(text_model, budget, &seed.essence, 3).await;
            if llm_tasks.is_empty() {
                heuristic_initial_plan()
                    .into_iter()
                    .map(|(c, d)| (c, d.to_string()))
                    .collect()
            } else {
                llm_tasks
            }
        } else if agents.iter().any(|a| a.status == AgentStatus::Completed) {
            let llm_tasks = propose_tasks(text_model, budget, &seed.essence, 2).await;
            if llm_tasks.is_empty() {
                heuristic_followup(&agents)
                    .map(|(c, d)| vec![(c, d.to_string())])
                    .unwrap_or_default()
            } else {
                llm_tasks
            }
        } else {
            Vec::new()
        };

        if tasks.is_empty() {
            continue;
        }

        for (capability, description) in tasks {
            let _ = lifecycle::spawn(
                store,
                bus,
                capability,
                Some(&seed.id),
                &description,
                serde_json::json!({ "input": seed.essence, "task": description }),
            )
            .await;
        }
        planned += 1;
    }

    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_initial_plan_has_decompose_and_analyze() {
        let plan = heuristic_initial_plan();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].0, AgentCapability::Decompose);
    }

    #[test]
    fn parse_llm_capability_rejects_unknown() {
        assert!(parse_llm_capability("not_a_capability").is_none());
    }
}

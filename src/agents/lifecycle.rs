//! Agent state machine and naming.

use chrono::Utc;

use crate::bus::{Hormone, HormoneBus};
use crate::db::Database;
use crate::domain::{new_id, AgentCapability, AgentNode, AgentStatus};
use crate::error::{AgentError, AgentResult};

pub const GLOBAL_AGENT_CAP: usize = 8;

/// Spawn a new agent for `capability`, naming it `{type}_{nn}` from a
/// per-type counter derived from existing agent names, honoring the
/// global active-agent cap and the safe/gated starting status split.
pub async fn spawn(
    store: &impl Database,
    bus: &HormoneBus,
    capability: AgentCapability,
    seed_id: Option<&str>,
    task_description: &str,
    capability_params: serde_json::Value,
) -> AgentResult<AgentNode> {
    let active = store.list_active_agents().await?;
    if active.len() >= GLOBAL_AGENT_CAP {
        return Err(AgentError::CapacityExceeded { active: active.len(), max: GLOBAL_AGENT_CAP });
    }

    let type_name = capability.as_str();
    let existing_count = active.iter().filter(|a| a.agent_type == capability).count();
    let name = format!("{type_name}_{:02}", existing_count + 1);

    let status = if capability.is_gated() {
        AgentStatus::AwaitingApproval
    } else {
        AgentStatus::Idle
    };

    let agent = AgentNode {
        id: new_id(),
        name,
        agent_type: capability,
        status,
        parent_id: None,
        seed_id: seed_id.map(str::to_string),
        task_description: task_description.to_string(),
        capability_params,
        context: serde_json::Value::Null,
        result: None,
        error: None,
        spawned_at: Utc::now(),
        started_at: None,
        completed_at: None,
        retired_at: None,
    };
    store.insert_agent(&agent).await?;

    let _ = bus
        .emit(Hormone::new(
            "agent_spawned",
            "agents",
            serde_json::json!({ "agent_id": agent.id, "capability": capability.as_str() }),
        ))
        .await;

    Ok(agent)
}

/// User approval for a gated agent: advance to `idle`, or retire with a
/// denial error.
pub async fn approve(store: &impl Database, bus: &HormoneBus, agent: &mut AgentNode, approved: bool) -> AgentResult<()> {
    if agent.status != AgentStatus::AwaitingApproval {
        return Ok(());
    }
    if approved {
        agent.status = AgentStatus::Idle;
        store.update_agent(agent).await?;
    } else {
        agent.status = AgentStatus::Retired;
        agent.error = Some("Denied by user".to_string());
        agent.retired_at = Some(Utc::now());
        store.update_agent(agent).await?;
        let _ = bus
            .emit(Hormone::new("agent_retired", "agents", serde_json::json!({ "agent_id": agent.id })))
            .await;
    }
    Ok(())
}

pub fn mark_working(agent: &mut AgentNode) {
    agent.status = AgentStatus::Working;
    agent.started_at = Some(Utc::now());
}

pub fn mark_completed(agent: &mut AgentNode, result: Option<String>, error: Option<String>) {
    agent.status = AgentStatus::Completed;
    agent.result = result;
    agent.error = error;
    agent.completed_at = Some(Utc::now());
}

pub async fn retire_completed(store: &impl Database, bus: &HormoneBus) -> AgentResult<usize> {
    let active = store.list_active_agents().await?;
    let mut retired = 0;
    for mut agent in active.into_iter().filter(|a| a.status == AgentStatus::Completed) {
        agent.status = AgentStatus::Retired;
        agent.retired_at = Some(Utc::now());
        store.update_agent(&agent).await?;
        let _ = bus
            .emit(Hormone::new("agent_retired", "agents", serde_json::json!({ "agent_id": agent.id })))
            .await;
        retired += 1;
    }
    Ok(retired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gated_capabilities_start_awaiting_approval() {
        assert!(AgentCapability::CodeExec.is_gated());
        assert!(AgentCapability::FileWrite.is_gated());
        assert!(!AgentCapability::Analyze.is_gated());
    }
}

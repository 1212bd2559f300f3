//! Capability handlers: the actual work behind each [`AgentCapability`].

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::WorkspaceConfig;
use crate::domain::AgentCapability;
use crate::error::AgentError;
use crate::textmodel::TextModel;

const FILE_READ_CHAR_LIMIT: usize = 10_000;
const DEFAULT_CODE_EXEC_TIMEOUT_SECS: u64 = 60;

/// Lexically resolve `relative` against `root` without touching the
/// filesystem, collapsing `.`/`..` components so a path cannot escape
/// the workspace root even when the target doesn't exist yet (ruling out
/// `canonicalize`, which requires the path to exist).
fn resolve_in_workspace(workspace: &WorkspaceConfig, relative: &str) -> Result<PathBuf, AgentError> {
    let mut stack: Vec<Component> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => stack.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                if stack.pop().is_none() {
                    return Err(AgentError::PathEscape(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(AgentError::PathEscape(relative.to_string()));
            }
        }
    }

    let mut resolved = PathBuf::from(&workspace.root);
    for component in stack {
        resolved.push(component.as_os_str());
    }
    Ok(resolved)
}

async fn call_text_model(
    text_model: &TextModel,
    capability: AgentCapability,
    params: &serde_json::Value,
) -> String {
    let (system, phase, prompt_key) = match capability {
        AgentCapability::Analyze => ("Analyze the given input concisely.", "analyze", "input"),
        AgentCapability::Summarize => ("Summarize the given input in a few sentences.", "summarize", "input"),
        AgentCapability::Decompose => (
            "Break the given task into a JSON array of short subtasks.",
            "decompose",
            "task",
        ),
        AgentCapability::CodeGen => ("Write the requested code, no commentary.", "code_gen", "request"),
        AgentCapability::Planner => ("Propose a short ordered plan as a JSON array of steps.", "planner", "goal"),
        AgentCapability::WebSearch => ("Summarize what you would search for and why.", "web_search", "query"),
        _ => return String::new(),
    };
    let input = params.get(prompt_key).and_then(|v| v.as_str()).unwrap_or("");
    text_model
        .generate(input, Some(system), 0.5, 400, "agents", phase)
        .await
}

pub async fn analyze(text_model: &TextModel, params: &serde_json::Value) -> Result<String, AgentError> {
    Ok(call_text_model(text_model, AgentCapability::Analyze, params).await)
}

pub async fn summarize(text_model: &TextModel, params: &serde_json::Value) -> Result<String, AgentError> {
    Ok(call_text_model(text_model, AgentCapability::Summarize, params).await)
}

pub async fn decompose(text_model: &TextModel, params: &serde_json::Value) -> Result<String, AgentError> {
    let text = call_text_model(text_model, AgentCapability::Decompose, params).await;
    match crate::textmodel::extract_json(&text) {
        Some(v) => Ok(v.to_string()),
        None => Ok(text),
    }
}

pub async fn code_gen(text_model: &TextModel, params: &serde_json::Value) -> Result<String, AgentError> {
    Ok(call_text_model(text_model, AgentCapability::CodeGen, params).await)
}

pub async fn planner(text_model: &TextModel, params: &serde_json::Value) -> Result<String, AgentError> {
    Ok(call_text_model(text_model, AgentCapability::Planner, params).await)
}

pub async fn web_search(text_model: &TextModel, params: &serde_json::Value) -> Result<String, AgentError> {
    Ok(call_text_model(text_model, AgentCapability::WebSearch, params).await)
}

pub async fn file_read(workspace: &WorkspaceConfig, params: &serde_json::Value) -> Result<String, AgentError> {
    let relative = params
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::PathEscape("missing path parameter".to_string()))?;
    let path = resolve_in_workspace(workspace, relative)?;
    let bytes = tokio::fs::read(&path).await?;
    let mut content = String::from_utf8_lossy(&bytes).into_owned();
    if content.chars().count() > FILE_READ_CHAR_LIMIT {
        content = content.chars().take(FILE_READ_CHAR_LIMIT).collect();
        content.push_str("\n…(truncated)");
    }
    Ok(content)
}

pub async fn file_write(workspace: &WorkspaceConfig, params: &serde_json::Value) -> Result<String, AgentError> {
    let relative = params
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::PathEscape("missing path parameter".to_string()))?;
    let content = params.get("content").and_then(|v| v.as_str()).unwrap_or("");
    let path = resolve_in_workspace(workspace, relative)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, content).await?;
    Ok(format!("wrote {} bytes to {relative}", content.len()))
}

pub async fn code_exec(workspace: &WorkspaceConfig, params: &serde_json::Value) -> Result<String, AgentError> {
    let code = params.get("code").and_then(|v| v.as_str()).unwrap_or("");
    let requested_timeout = params
        .get("timeout")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_CODE_EXEC_TIMEOUT_SECS);
    let capped_timeout = requested_timeout.min(DEFAULT_CODE_EXEC_TIMEOUT_SECS);

    let file_name = format!("agent_exec_{}.py", crate::domain::new_id());
    let script_path = Path::new(&workspace.root).join(&file_name);
    tokio::fs::create_dir_all(&workspace.root).await?;
    {
        let mut file = tokio::fs::File::create(&script_path).await?;
        file.write_all(code.as_bytes()).await?;
    }

    let mut command = Command::new("python3");
    command
        .arg(&script_path)
        .current_dir(&workspace.root)
        .kill_on_drop(true);

    let run = async {
        let output = command.output().await?;
        Ok::<_, std::io::Error>(output)
    };

    let result = timeout(Duration::from_secs(capped_timeout), run).await;
    let _ = tokio::fs::remove_file(&script_path).await;

    match result {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            Ok(format!("stdout:\n{stdout}\nstderr:\n{stderr}"))
        }
        Ok(Err(e)) => Err(AgentError::Io(e)),
        Err(_) => Err(AgentError::Timeout(Duration::from_secs(capped_timeout))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_path_escape() {
        let workspace = WorkspaceConfig {
            root: "/tmp/organism_workspace_test".to_string(),
            max_read_bytes: 10_000,
            subprocess_timeout_secs: 60,
        };
        let result = resolve_in_workspace(&workspace, "../../etc/passwd");
        assert!(result.is_err());
    }
}

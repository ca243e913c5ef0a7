#![allow(missing_docs, unused_results)]

use std::path::Path;

use serde_json::{Value, json};
use warden_core::paths::StatePaths;
use warden_hooks::{
    ContinuityLaunch, EXIT_ASK, EXIT_BLOCK, EXIT_PROCEED, HookResponse, HookType, Services,
    default_engine, dispatch,
};
use warden_settings::WardenSettings;

fn services(root: &Path) -> Services {
    let mut settings = WardenSettings::default();
    settings.continuity.enabled = false;
    settings.budget.session_limit = 1000;
    Services::from_settings(settings, StatePaths::new(root), ContinuityLaunch::Inline).unwrap()
}

fn stdout(response: &HookResponse) -> Value {
    serde_json::from_str(response.stdout.as_deref().unwrap()).unwrap()
}

async fn run(services: &Services, hook_type: HookType, payload: Value) -> HookResponse {
    let engine = default_engine(services);
    dispatch(&engine, hook_type, &payload.to_string(), Path::new("/")).await
}

fn bash(session: &str, command: &str) -> Value {
    json!({
        "session_id": session,
        "cwd": "/repo",
        "hook_event_name": "PreToolUse",
        "tool_name": "Bash",
        "tool_input": { "command": command },
    })
}

#[tokio::test]
async fn read_only_command_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(dir.path());
    let response = run(&services, HookType::PreToolUse, bash("s1", "ls -la && git status")).await;
    assert_eq!(response.exit_code, EXIT_PROCEED);
    assert_eq!(stdout(&response)["hookSpecificOutput"]["permissionDecision"], "allow");
}

#[tokio::test]
async fn destructive_command_is_denied_and_audited() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(dir.path());
    let response = run(&services, HookType::PreToolUse, bash("s1", "cd /tmp && rm -rf /")).await;
    assert_eq!(response.exit_code, EXIT_BLOCK);
    let doc = stdout(&response);
    assert_eq!(doc["hookSpecificOutput"]["permissionDecision"], "deny");
    assert!(
        doc["hookSpecificOutput"]["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .contains("core.rm-root")
    );
    assert!(response.stderr.is_some());

    let audit = std::fs::read_to_string(services.paths.audit_file()).unwrap();
    assert!(audit.contains("core.rm-root"));
}

#[tokio::test]
async fn unknown_command_asks() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(dir.path());
    let response = run(&services, HookType::PreToolUse, bash("s1", "frobnicate --all")).await;
    assert_eq!(response.exit_code, EXIT_ASK);
    assert_eq!(stdout(&response)["hookSpecificOutput"]["permissionDecision"], "ask");
}

#[tokio::test]
async fn garbage_input_on_gating_hook_asks() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(dir.path());
    let engine = default_engine(&services);
    let response = dispatch(&engine, HookType::PreToolUse, "{not json", Path::new("/")).await;
    assert_eq!(response.exit_code, EXIT_ASK);

    let informational = dispatch(&engine, HookType::SessionEnd, "{not json", Path::new("/")).await;
    assert_eq!(informational.exit_code, EXIT_PROCEED);
}

#[tokio::test]
async fn usage_over_limit_blocks_next_action() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(dir.path());
    let post = json!({
        "session_id": "s1",
        "tool_name": "Bash",
        "tool_input": { "command": "ls" },
        "usage": { "total_tokens": 1200 },
    });
    let response = run(&services, HookType::PostToolUse, post).await;
    assert_eq!(response.exit_code, EXIT_BLOCK);

    let next = run(&services, HookType::PreToolUse, bash("s1", "ls")).await;
    assert_eq!(next.exit_code, EXIT_BLOCK);
    assert!(
        stdout(&next)["hookSpecificOutput"]["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .contains("budget.exceeded")
    );

    // Another session is unaffected.
    let other = run(&services, HookType::PreToolUse, bash("s2", "ls")).await;
    assert_eq!(other.exit_code, EXIT_PROCEED);
}

#[tokio::test]
async fn finish_prompt_gets_reminder() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(dir.path());
    let prompt = json!({ "session_id": "s1", "prompt": "looks good, we're done" });
    let response = run(&services, HookType::UserPromptSubmit, prompt).await;
    assert_eq!(response.exit_code, EXIT_PROCEED);
    let context = stdout(&response)["hookSpecificOutput"]["additionalContext"].clone();
    assert!(context.as_str().unwrap().contains("open items"));
}

#[tokio::test]
async fn warden_settings_cannot_be_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(dir.path());

    let write = json!({
        "session_id": "s1",
        "cwd": "/repo",
        "hook_event_name": "PreToolUse",
        "tool_name": "Write",
        "tool_input": { "file_path": ".warden/settings.json", "content": "{}" },
    });
    let response = run(&services, HookType::PreToolUse, write).await;
    assert_eq!(response.exit_code, EXIT_BLOCK);
    assert_eq!(stdout(&response)["hookSpecificOutput"]["permissionDecision"], "deny");

    let state = services.paths.usage_file();
    let edit = json!({
        "session_id": "s1",
        "cwd": "/repo",
        "hook_event_name": "PreToolUse",
        "tool_name": "Edit",
        "tool_input": { "file_path": state, "old_string": "9", "new_string": "0" },
    });
    assert_eq!(run(&services, HookType::PreToolUse, edit).await.exit_code, EXIT_BLOCK);

    let shell = run(
        &services,
        HookType::PreToolUse,
        bash("s1", "echo '{}' > .warden/settings.json"),
    )
    .await;
    assert_eq!(shell.exit_code, EXIT_BLOCK);
    assert!(
        stdout(&shell)["hookSpecificOutput"]["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .contains("core.warden-config")
    );
}

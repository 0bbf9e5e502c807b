use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Run the binary with the given args, optionally piping JSON to stdin.
/// Returns (exit code, stdout, stderr).
pub fn run_cli(args: &[&str], stdin_data: Option<&str>) -> (i32, String, String) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_promptspool"));
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn().expect("failed to spawn binary");
    if let Some(data) = stdin_data {
        child
            .stdin
            .as_mut()
            .unwrap()
            .write_all(data.as_bytes())
            .unwrap();
    }

    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Run in hook mode (no args) with the given event JSON on stdin.
pub fn run_hook(stdin_json: &str) -> (i32, String, String) {
    run_cli(&[], Some(stdin_json))
}

// ---------------------------------------------------------------
// Transcript fixtures
// ---------------------------------------------------------------

pub fn user_line(request_id: &str, content: serde_json::Value) -> String {
    serde_json::to_string(&json!({
        "requestId": request_id,
        "timestamp": 1700000000.0,
        "message": { "role": "user", "content": content }
    }))
    .unwrap()
}

pub fn assistant_line(request_id: &str, content: serde_json::Value) -> String {
    serde_json::to_string(&json!({
        "requestId": request_id,
        "timestamp": 1700000000.0,
        "message": { "role": "assistant", "content": content }
    }))
    .unwrap()
}

/// Write a JSONL transcript into `dir` and return its path.
pub fn write_transcript(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("transcript.jsonl");
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

/// A transcript with three single-part user prompts and three assistant
/// responses, in interleaved chronological order.
pub fn simple_transcript(dir: &Path) -> PathBuf {
    let lines = [
        user_line("req-1", json!("First user prompt")),
        assistant_line("req-1", json!([{ "type": "text", "text": "First assistant response" }])),
        user_line("req-2", json!("Second user prompt")),
        assistant_line("req-2", json!([{ "type": "text", "text": "Second assistant response" }])),
        user_line("req-3", json!("Third user prompt")),
        assistant_line("req-3", json!([{ "type": "text", "text": "Third assistant response" }])),
    ];
    write_transcript(dir, &lines)
}

// ---------------------------------------------------------------
// Hook event payloads
// ---------------------------------------------------------------

pub fn prompt_submit_event(cwd: &Path, transcript_path: &Path, prompt: &str) -> String {
    serde_json::to_string(&json!({
        "hook_event_name": "UserPromptSubmit",
        "session_id": "test-session",
        "transcript_path": transcript_path.to_str().unwrap(),
        "cwd": cwd.to_str().unwrap(),
        "permission_mode": "default",
        "prompt": prompt
    }))
    .unwrap()
}

pub fn session_end_event(cwd: &Path, transcript_path: &Path, reason: &str) -> String {
    serde_json::to_string(&json!({
        "hook_event_name": "SessionEnd",
        "session_id": "test-session",
        "transcript_path": transcript_path.to_str().unwrap(),
        "cwd": cwd.to_str().unwrap(),
        "reason": reason
    }))
    .unwrap()
}

/// Path of the spool file the hook writes for `test-session`.
pub fn spool_path(cwd: &Path) -> PathBuf {
    cwd.join(".promptspool").join("copy-test-session.txt")
}

/// Parse the single-line JSON hook output.
pub fn parse_output(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("hook stdout should be JSON")
}

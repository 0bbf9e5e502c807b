mod common;

use common::*;
use serde_json::json;

#[test]
fn copies_most_recent_response_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = simple_transcript(dir.path());

    let (code, stdout, _) =
        run_hook(&prompt_submit_event(dir.path(), &transcript, "--copy-response"));
    assert_eq!(code, 0);

    let output = parse_output(&stdout);
    assert_eq!(output["decision"], "block");
    assert!(
        output["reason"]
            .as_str()
            .unwrap()
            .contains("Response copied to clipboard")
    );

    let spooled = std::fs::read_to_string(spool_path(dir.path())).unwrap();
    assert_eq!(spooled, "Third assistant response");
}

#[test]
fn copies_requested_count_of_responses() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = simple_transcript(dir.path());

    let (_, stdout, _) =
        run_hook(&prompt_submit_event(dir.path(), &transcript, "--copy-response 2"));
    assert!(
        parse_output(&stdout)["reason"]
            .as_str()
            .unwrap()
            .contains("Last 2 responses copied")
    );

    let spooled = std::fs::read_to_string(spool_path(dir.path())).unwrap();
    assert_eq!(
        spooled,
        "Second assistant response\n\nThird assistant response"
    );
}

#[test]
fn tool_use_blocks_contribute_no_text() {
    let dir = tempfile::tempdir().unwrap();
    let lines = [assistant_line(
        "req-1",
        json!([
            { "type": "text", "text": "Let me help." },
            { "type": "tool_use", "id": "toolu_01", "name": "Bash", "input": { "command": "ls" } },
            { "type": "text", "text": "Done." }
        ]),
    )];
    let transcript = write_transcript(dir.path(), &lines);

    run_hook(&prompt_submit_event(dir.path(), &transcript, "--copy-response"));

    let spooled = std::fs::read_to_string(spool_path(dir.path())).unwrap();
    // Text blocks concatenate in order with no separator; the tool call
    // between them vanishes.
    assert_eq!(spooled, "Let me help.Done.");
}

#[test]
fn tool_only_response_spools_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let lines = [assistant_line(
        "req-1",
        json!([
            { "type": "tool_use", "id": "toolu_01", "name": "Write", "input": {} }
        ]),
    )];
    let transcript = write_transcript(dir.path(), &lines);

    let (_, stdout, _) =
        run_hook(&prompt_submit_event(dir.path(), &transcript, "--copy-response"));

    // The turn exists (counts stay accurate) but has no displayable text.
    assert!(parse_output(&stdout)["reason"]
        .as_str()
        .unwrap()
        .contains("<empty>"));
    assert_eq!(
        std::fs::read_to_string(spool_path(dir.path())).unwrap(),
        ""
    );
}

#[test]
fn system_messages_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let system = serde_json::to_string(&json!({
        "requestId": "req-sys",
        "message": { "role": "system", "content": "System message should be ignored" }
    }))
    .unwrap();
    let lines = [
        system,
        assistant_line("req-1", json!([{ "type": "text", "text": "Final response" }])),
    ];
    let transcript = write_transcript(dir.path(), &lines);

    run_hook(&prompt_submit_event(dir.path(), &transcript, "--copy-response"));

    let spooled = std::fs::read_to_string(spool_path(dir.path())).unwrap();
    assert_eq!(spooled, "Final response");
}

#[test]
fn malformed_line_does_not_poison_valid_ones() {
    let dir = tempfile::tempdir().unwrap();
    let lines = [
        assistant_line("req-1", json!([{ "type": "text", "text": "Early response" }])),
        "this is not json {".to_string(),
        assistant_line("req-2", json!([{ "type": "text", "text": "Final response" }])),
    ];
    let transcript = write_transcript(dir.path(), &lines);

    let (code, _, stderr) =
        run_hook(&prompt_submit_event(dir.path(), &transcript, "--copy-response"));
    assert_eq!(code, 0);
    assert!(stderr.contains("parse error"), "stderr: {stderr}");

    let spooled = std::fs::read_to_string(spool_path(dir.path())).unwrap();
    assert_eq!(spooled, "Final response");
}

#[test]
fn strict_mode_fails_the_copy_on_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let prefs_dir = dir.path().join(".promptspool");
    std::fs::create_dir_all(&prefs_dir).unwrap();
    std::fs::write(prefs_dir.join("promptspool.toml"), "strict = true\n").unwrap();

    let lines = [
        assistant_line("req-1", json!([{ "type": "text", "text": "fine" }])),
        "broken {".to_string(),
    ];
    let transcript = write_transcript(dir.path(), &lines);

    let (code, stdout, _) =
        run_hook(&prompt_submit_event(dir.path(), &transcript, "--copy-response"));
    assert_eq!(code, 0);

    let output = parse_output(&stdout);
    assert_eq!(output["decision"], "block");
    let reason = output["reason"].as_str().unwrap();
    assert!(reason.contains("Failed to copy response"), "got: {reason}");
    assert!(reason.contains("line 2"), "got: {reason}");
}

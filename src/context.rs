use regex::Regex;
use std::sync::LazyLock;

// ===================================================================
// Reflexive-agreement reminder
// ===================================================================

/// How many recent assistant turns to scan for agreement phrases when the
/// preferences don't say otherwise.
pub const DEFAULT_AGREEMENT_LOOKBACK: usize = 5;

/// Only the opening of a response is checked; agreement phrases that
/// matter are the reflexive ones at the start.
const AGREEMENT_SCAN_CHARS: usize = 80;

static AGREEMENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // "You're right", "you are correct"
        Regex::new(r"[Yy]ou.*(right|correct)").unwrap(),
        // "Absolutely"
        Regex::new(r"[Aa]bsolutely").unwrap(),
    ]
});

/// Check whether any of the given assistant turns opens with a reflexive
/// agreement phrase. Callers pass the most recent turns (newest first);
/// only the first 80 characters of each are considered.
pub fn needs_agreement_reminder(recent_turns: &[String]) -> bool {
    recent_turns.iter().any(|turn| {
        let opening: String = turn.chars().take(AGREEMENT_SCAN_CHARS).collect();
        AGREEMENT_PATTERNS.iter().any(|p| p.is_match(&opening))
    })
}

/// Context injected after the assistant has recently agreed reflexively.
pub const AGREEMENT_REMINDER: &str = "\
<system-reminder>
Avoid reflexive agreement phrases like \"you are right\" or \"absolutely correct.\"

Instead, engage thoughtfully: analyze the user's reasoning, identify potential improvements,
or provide substantive confirmation when their approach is sound.

When the user presents a valid solution:
- Acknowledge the correctness with specific technical reasoning
- Consider edge cases, alternative approaches, or potential optimizations
- Build collaboratively rather than merely agreeing

When the user's approach has issues:
- Identify specific problems or gaps
- Suggest concrete improvements
- Explain the technical reasoning behind your analysis
</system-reminder>";

// ===================================================================
// Session-id note for commit-related prompts
// ===================================================================

static COMMIT_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(commit|git commit|create.*commit)\b").unwrap());

/// Detect prompts that ask for a commit to be created.
pub fn is_commit_prompt(prompt: &str) -> bool {
    COMMIT_PROMPT.is_match(prompt)
}

/// Context injected for commit-related prompts: instructs the assistant to
/// append the session ID to commit messages, for traceability from commits
/// back to the conversation.
pub fn session_id_context(session_id: &str) -> String {
    format!(
        "\
**IMPORTANT**: Append the session ID to all commit messages in the format shown below:

```bash
git commit -m \"fix: description of changes

Session: {session_id}\"
```

The session ID provides traceability from commits back to the conversation."
    )
}

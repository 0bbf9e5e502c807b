use crate::transcript::Role;
use minijinja::{context, Environment};
use std::fmt;

// ===================================================================
// Copy commands — "--copy-prompt [N]" / "--copy-response [N]"
// ===================================================================

/// Which side of the conversation a copy command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTarget {
    Prompt,
    Response,
}

impl CopyTarget {
    pub fn noun(&self) -> &'static str {
        match self {
            CopyTarget::Prompt => "prompt",
            CopyTarget::Response => "response",
        }
    }

    pub fn capitalized(&self) -> &'static str {
        match self {
            CopyTarget::Prompt => "Prompt",
            CopyTarget::Response => "Response",
        }
    }

    /// The transcript role whose turns this target selects.
    pub fn role(&self) -> Role {
        match self {
            CopyTarget::Prompt => Role::User,
            CopyTarget::Response => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCommand {
    pub target: CopyTarget,
    pub count: usize,
}

/// Recognize a copy command at the start of a submitted prompt.
///
/// The bare command selects one turn. A whitespace-separated trailer is
/// read as the count when it is all digits; any other trailer falls back
/// to 1. A prompt that merely shares the prefix without a whitespace
/// separator ("--copy-promptly ...") is not a copy command.
pub fn parse_copy_command(prompt: &str) -> Option<CopyCommand> {
    const COMMANDS: [(&str, CopyTarget); 2] = [
        ("--copy-prompt", CopyTarget::Prompt),
        ("--copy-response", CopyTarget::Response),
    ];

    for (prefix, target) in COMMANDS {
        let Some(rest) = prompt.strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() {
            return Some(CopyCommand { target, count: 1 });
        }
        if rest.starts_with(char::is_whitespace) {
            let count = rest.trim().parse::<usize>().unwrap_or(1);
            return Some(CopyCommand { target, count });
        }
        return None;
    }
    None
}

// ===================================================================
// Selection errors — always surfaced, never silently corrected
// ===================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum SelectError {
    /// The transcript yielded no turns for the target role.
    Empty { target: CopyTarget },
    /// The requested count was below 1.
    CountTooSmall { target: CopyTarget },
    /// Fewer turns are available than requested.
    NotEnough {
        target: CopyTarget,
        available: usize,
    },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::Empty { target } => write!(f, "No {}s found", target.noun()),
            SelectError::CountTooSmall { target } => {
                write!(f, "{} count must be at least 1", target.capitalized())
            }
            SelectError::NotEnough { target, available } => {
                let plural = if *available == 1 { "" } else { "s" };
                write!(f, "Only {available} {}{plural} available", target.noun())
            }
        }
    }
}

impl std::error::Error for SelectError {}

// ===================================================================
// Selection
// ===================================================================

/// Outcome of a successful "copy last N" selection.
#[derive(Debug)]
pub struct Selection {
    /// The selected turns in chronological order.
    pub turns: Vec<String>,
    /// Turns joined with a blank-line separator.
    pub combined: String,
    /// One-line preview of the combined text.
    pub preview: String,
    /// "Prompt" / "Last 3 prompts" — for the confirmation message.
    pub label: String,
}

/// Pick the `count` most recent turns from a newest-first list and render
/// them oldest-to-newest.
///
/// The empty check runs before count validation so an empty transcript
/// reports "No prompts found" for any requested count.
pub fn select(
    turns: &[String],
    count: usize,
    target: CopyTarget,
) -> Result<Selection, SelectError> {
    if turns.is_empty() {
        return Err(SelectError::Empty { target });
    }
    if count < 1 {
        return Err(SelectError::CountTooSmall { target });
    }
    if count > turns.len() {
        return Err(SelectError::NotEnough {
            target,
            available: turns.len(),
        });
    }

    // First `count` of a newest-first list, reversed to chronological.
    let mut selected: Vec<String> = turns[..count].to_vec();
    selected.reverse();
    let combined = selected.join("\n\n");

    let label = if count == 1 {
        target.capitalized().to_string()
    } else {
        format!("Last {count} {}s", target.noun())
    };
    let preview = preview(&combined);

    Ok(Selection {
        turns: selected,
        combined,
        preview,
        label,
    })
}

/// First non-blank line of `text`, trimmed, truncated to 60 characters
/// with an ellipsis when longer. Blank or whitespace-only input renders
/// as the literal `<empty>`.
pub fn preview(text: &str) -> String {
    if text.trim().is_empty() {
        return "<empty>".into();
    }
    let line = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(str::trim)
        .unwrap_or_else(|| text.trim());
    truncate(line, 60)
}

/// Truncate to `max` characters, appending "..." when truncated. Operates
/// on char boundaries, not bytes.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
    }
}

// ===================================================================
// Confirmation message rendering
// ===================================================================

#[derive(Debug)]
pub enum RenderError {
    Template(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Template(msg) => write!(f, "template render error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Render the user-facing confirmation from the configured template.
/// The template sees `label` and `preview`.
pub fn render_confirmation(
    template: &str,
    label: &str,
    preview: &str,
) -> Result<String, RenderError> {
    let env = Environment::new();
    let tmpl = env
        .template_from_str(template)
        .map_err(|e| RenderError::Template(format!("parsing template: {e}")))?;
    tmpl.render(context! { label, preview })
        .map_err(|e| RenderError::Template(format!("rendering template: {e}")))
}

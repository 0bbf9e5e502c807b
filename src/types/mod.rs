use serde::{Deserialize, Serialize};

// ===================================================================
// Shared enums
// ===================================================================

/// Permission mode of the session, as reported in every hook payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Default,
    Plan,
    AcceptEdits,
    DontAsk,
    BypassPermissions,
}

/// How a session was started (SessionStart).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStartSource {
    Startup,
    Resume,
    Clear,
    Compact,
}

/// Notification kind (Notification).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PermissionPrompt,
    IdlePrompt,
    AuthSuccess,
    ElicitationDialog,
}

/// Compaction trigger (PreCompact).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactTrigger {
    Manual,
    Auto,
}

/// Why a session ended (SessionEnd). The `clear` reason is what drives
/// transcript export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    Clear,
    Logout,
    PromptInputExit,
    BypassPermissionsDisabled,
    Other,
}

// ===================================================================
// Hook inputs (stdin, snake_case JSON)
// ===================================================================

/// Fields every hook event carries.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonInput {
    pub session_id: String,
    pub transcript_path: String,
    pub cwd: String,
    #[serde(default)]
    pub permission_mode: Option<PermissionMode>,
}

#[derive(Debug, Deserialize)]
pub struct SessionStartInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub source: SessionStartSource,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub agent_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserPromptSubmitInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct PreToolUseInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub tool_use_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PostToolUseInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub tool_response: serde_json::Value,
    pub tool_use_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub message: String,
    #[serde(default)]
    pub title: Option<String>,
    pub notification_type: NotificationType,
}

#[derive(Debug, Deserialize)]
pub struct StopInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub stop_hook_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubagentStopInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub stop_hook_active: bool,
    pub agent_id: String,
    pub agent_type: String,
    pub agent_transcript_path: String,
}

#[derive(Debug, Deserialize)]
pub struct PreCompactInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub trigger: CompactTrigger,
    pub custom_instructions: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionEndInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub reason: SessionEndReason,
}

/// Top-level hook input, tagged by `hook_event_name`.
///
/// Covers the events this hook can be registered for; events without a
/// handler deserialize fine and simply produce no output.
#[derive(Debug, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookInput {
    SessionStart(SessionStartInput),
    UserPromptSubmit(UserPromptSubmitInput),
    PreToolUse(PreToolUseInput),
    PostToolUse(PostToolUseInput),
    Notification(NotificationInput),
    Stop(StopInput),
    SubagentStop(SubagentStopInput),
    PreCompact(PreCompactInput),
    SessionEnd(SessionEndInput),
}

impl HookInput {
    /// Access the common fields shared by all hook events.
    pub fn common(&self) -> &CommonInput {
        match self {
            Self::SessionStart(e) => &e.common,
            Self::UserPromptSubmit(e) => &e.common,
            Self::PreToolUse(e) => &e.common,
            Self::PostToolUse(e) => &e.common,
            Self::Notification(e) => &e.common,
            Self::Stop(e) => &e.common,
            Self::SubagentStop(e) => &e.common,
            Self::PreCompact(e) => &e.common,
            Self::SessionEnd(e) => &e.common,
        }
    }
}

// ===================================================================
// Hook outputs (stdout, camelCase JSON)
// ===================================================================

/// Top-level hook output written to stdout on exit code 0. Absent fields
/// are omitted from the JSON entirely.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// If `false`, Claude stops processing entirely after this hook.
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_processing: Option<bool>,

    /// Message shown to the user when `continue_processing` is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    /// If `true`, hides stdout from verbose mode output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,

    /// Warning message shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    /// Set to `"block"` to prevent the action (here: prompt processing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,

    /// Explanation shown when `decision` is `"block"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Event-specific output fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookOutput {
    /// A `decision: "block"` output with the given reason.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some("block".into()),
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// A UserPromptSubmit output carrying additional context.
    pub fn additional_context(context: impl Into<String>) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput::UserPromptSubmit(
                UserPromptSubmitOutput {
                    additional_context: Some(context.into()),
                },
            )),
            ..Default::default()
        }
    }
}

/// Event-specific output, tagged by `hookEventName`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "hookEventName")]
pub enum HookSpecificOutput {
    UserPromptSubmit(UserPromptSubmitOutput),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptSubmitOutput {
    /// Text injected into the model's context alongside the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

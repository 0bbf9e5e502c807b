use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

// ===================================================================
// Parse errors
// ===================================================================

/// Typed errors for transcript decoding. In lenient mode (the default)
/// these are recovered per line; in strict mode the first one aborts the
/// scan.
#[derive(Debug)]
pub enum ParseError {
    /// The transcript file does not exist.
    FileNotFound(String),
    /// A line was not valid JSON.
    Json { line: usize, message: String },
    /// A line decoded but is missing required structure
    /// (a `message` object, or `role` within it).
    Validation { line: usize, what: String },
    /// `message.content` had a type the normalizer has no rule for
    /// (strict mode only; lenient mode string-converts it).
    UnsupportedContent { line: usize, found: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::FileNotFound(path) => {
                write!(f, "transcript file not found: {path}")
            }
            ParseError::Json { line, message } => {
                write!(f, "JSON parse error on line {line}: {message}")
            }
            ParseError::Validation { line, what } => {
                write!(f, "invalid entry on line {line}: {what}")
            }
            ParseError::UnsupportedContent { line, found } => {
                write!(f, "unsupported content format on line {line}: {found}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

// ===================================================================
// Parse options
// ===================================================================

/// Which top-level field identifies a conversation turn.
///
/// The upstream schema is not stable about this: current transcripts carry
/// `requestId`, earlier revisions grouped by other fields. Rather than
/// hardwiring one name, the extraction strategy is selectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// Probe `requestId`, then `request_id`.
    RequestId,
    /// Probe a caller-chosen top-level field (e.g. `parentUuid`).
    Field(String),
}

impl GroupKey {
    fn extract(&self, entry: &Map<String, Value>) -> Option<String> {
        let value = match self {
            GroupKey::RequestId => entry
                .get("requestId")
                .or_else(|| entry.get("request_id")),
            GroupKey::Field(name) => entry.get(name.as_str()),
        };
        value.and_then(Value::as_str).map(String::from)
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// When `true`, any decode or validation failure aborts the scan with a
    /// typed error. Default is lenient: one bad line becomes one placeholder
    /// record and the rest of the file is still parsed.
    pub strict: bool,
    pub group_key: GroupKey,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            group_key: GroupKey::RequestId,
        }
    }
}

// ===================================================================
// Roles
// ===================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
    Unknown,
}

impl Role {
    /// Map a raw `role` value to the enumerated set. Anything outside
    /// user/assistant/system (including non-strings) is `Unknown`.
    fn classify(value: &Value) -> Role {
        match value.as_str() {
            Some("user") => Role::User,
            Some("assistant") => Role::Assistant,
            Some("system") => Role::System,
            _ => Role::Unknown,
        }
    }
}

// ===================================================================
// Content — the shape-polymorphic `message.content` value
// ===================================================================

/// `message.content` as found in the wild: a plain string (user text), an
/// array of typed blocks (assistant responses, tool results), an object
/// (older single-block form), absent/null, or something else entirely.
/// One classification step produces this sum type; everything downstream
/// matches exhaustively instead of re-probing JSON types.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Blocks(Vec<Value>),
    Object(Map<String, Value>),
    Empty,
    Other(Value),
}

/// Which branch of [`Content`] produced a normalized string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    Text,
    List,
    Object,
    Empty,
    Other,
}

/// Key names probed, in priority order, when flattening object content.
/// The order is contract: later keys are consulted only when earlier ones
/// are absent or not string-valued.
const OBJECT_TEXT_KEYS: [&str; 6] = ["text", "content", "message", "body", "data", "value"];

impl Content {
    pub fn classify(value: Option<&Value>) -> Content {
        match value {
            None | Some(Value::Null) => Content::Empty,
            Some(Value::String(s)) => Content::Text(s.clone()),
            Some(Value::Array(items)) => Content::Blocks(items.clone()),
            Some(Value::Object(map)) => Content::Object(map.clone()),
            Some(other) => Content::Other(other.clone()),
        }
    }

    /// Flatten to a single string. Infallible: the `Other` branch falls back
    /// to a string conversion; strict mode rejects that branch before
    /// flattening (see `decode_entry`).
    pub fn flatten(&self) -> (String, ContentShape) {
        match self {
            Content::Text(s) => (s.clone(), ContentShape::Text),
            Content::Blocks(items) => (flatten_blocks(items), ContentShape::List),
            Content::Object(map) => (flatten_object(map), ContentShape::Object),
            Content::Empty => (String::new(), ContentShape::Empty),
            Content::Other(value) => (value_display(value), ContentShape::Other),
        }
    }
}

/// Concatenate the displayable text of an ordered block list, in order,
/// with no separator. `tool_use` blocks are synthetic action markers with
/// no displayable text and contribute nothing.
fn flatten_blocks(items: &[Value]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            Value::Object(map) => {
                if map.get("type").and_then(Value::as_str) == Some("tool_use") {
                    continue;
                }
                if let Some(text) = block_text(map) {
                    out.push_str(&text);
                }
            }
            Value::String(s) => out.push_str(s),
            other => out.push_str(&value_display(other)),
        }
    }
    out
}

type BlockExtractor = fn(&Map<String, Value>) -> Option<String>;

/// Extractors tried in sequence until one yields text. The sequence order
/// is the behavior under test: a direct `text` key wins over a nested
/// `content.text`, which wins over "any string field".
const BLOCK_EXTRACTORS: [BlockExtractor; 3] =
    [direct_text, nested_content_text, first_string_field];

fn block_text(map: &Map<String, Value>) -> Option<String> {
    BLOCK_EXTRACTORS.iter().find_map(|extract| extract(map))
}

fn direct_text(map: &Map<String, Value>) -> Option<String> {
    map.get("text").and_then(Value::as_str).map(String::from)
}

fn nested_content_text(map: &Map<String, Value>) -> Option<String> {
    map.get("content")
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(String::from)
}

fn first_string_field(map: &Map<String, Value>) -> Option<String> {
    map.values()
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
        .map(String::from)
}

/// Probe the fixed key priority list for the first string value; fall back
/// to a JSON rendering of the whole object so the content is at least
/// inspectable.
fn flatten_object(map: &Map<String, Value>) -> String {
    for key in OBJECT_TEXT_KEYS {
        if let Some(s) = map.get(key).and_then(Value::as_str) {
            return s.to_string();
        }
    }
    Value::Object(map.clone()).to_string()
}

/// String conversion for scalar / unexpected values. Null converts to
/// nothing; everything else renders as its JSON text.
fn value_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ===================================================================
// Record — one decoded transcript line
// ===================================================================

/// One transcript entry, defensively normalized. Every record has a
/// resolvable role and a non-null text, even when decoding partially
/// failed: the failure is carried in `parse_error` instead of aborting
/// the scan.
#[derive(Debug, Clone)]
pub struct Record {
    /// Conversation-turn identifier. Entries without one get a synthetic
    /// per-line id, so they never group with anything.
    pub turn_id: String,
    /// Seconds since the epoch. Defaults to the scan time when the entry
    /// carries no numeric timestamp.
    pub timestamp: f64,
    pub role: Role,
    /// Flattened content text.
    pub text: String,
    pub shape: ContentShape,
    /// Set when this record is a placeholder for a line that failed to
    /// decode or validate.
    pub parse_error: Option<String>,
}

impl Record {
    fn placeholder(line: usize, error: &ParseError) -> Record {
        Record {
            turn_id: synthetic_id(line),
            timestamp: default_timestamp(),
            role: Role::Unknown,
            text: String::new(),
            shape: ContentShape::Empty,
            parse_error: Some(error.to_string()),
        }
    }
}

fn synthetic_id(line: usize) -> String {
    format!("line-{line}")
}

fn default_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Resolve the entry's timestamp: probe `timestamp` then `created_at`,
/// requiring a numeric value; anything else (including the ISO strings
/// some writers emit) falls back to the current time.
fn extract_timestamp(entry: &Map<String, Value>) -> f64 {
    entry
        .get("timestamp")
        .or_else(|| entry.get("created_at"))
        .and_then(Value::as_f64)
        .unwrap_or_else(default_timestamp)
}

/// Decode one trimmed, non-empty line into a `Record`, or a typed error.
/// All defaulting happens here, in one place, so the fallback policy stays
/// auditable.
fn decode_entry(line: &str, number: usize, opts: &ParseOptions) -> Result<Record, ParseError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ParseError::Json {
        line: number,
        message: e.to_string(),
    })?;

    let entry = value.as_object().ok_or_else(|| ParseError::Validation {
        line: number,
        what: "entry is not a JSON object".into(),
    })?;

    let message = entry
        .get("message")
        .ok_or_else(|| ParseError::Validation {
            line: number,
            what: "missing `message` field".into(),
        })?
        .as_object()
        .ok_or_else(|| ParseError::Validation {
            line: number,
            what: "`message` is not an object".into(),
        })?;

    let role_value = message.get("role").ok_or_else(|| ParseError::Validation {
        line: number,
        what: "missing `role` in message".into(),
    })?;

    // `content` is not required: absent and null both normalize to empty
    // text with shape Empty.
    let content = Content::classify(message.get("content"));
    if opts.strict {
        if let Content::Other(value) = &content {
            return Err(ParseError::UnsupportedContent {
                line: number,
                found: value.to_string(),
            });
        }
    }
    let (text, shape) = content.flatten();

    Ok(Record {
        turn_id: opts
            .group_key
            .extract(entry)
            .unwrap_or_else(|| synthetic_id(number)),
        timestamp: extract_timestamp(entry),
        role: Role::classify(role_value),
        text,
        shape,
        parse_error: None,
    })
}

// ===================================================================
// Transcript — parsed JSONL with defensive per-line recovery
// ===================================================================

/// A parsed transcript. Records are kept in file order; grouping into
/// turns happens on demand per extraction call, with no caching — each
/// hook invocation is a short-lived process and re-scans fresh.
#[derive(Debug)]
pub struct Transcript {
    records: Vec<Record>,
}

impl Transcript {
    /// An empty transcript (no records).
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Parse a JSONL string. Blank lines (after trimming) are skipped.
    ///
    /// Lenient mode never fails: lines that don't decode become placeholder
    /// records and are reported in the returned error list with their
    /// 1-based line number. Strict mode returns the first error instead.
    pub fn parse(
        contents: &str,
        opts: &ParseOptions,
    ) -> Result<(Self, Vec<(usize, String)>), ParseError> {
        let mut records = Vec::new();
        let mut errors = Vec::new();

        for (i, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let number = i + 1;
            match decode_entry(line, number, opts) {
                Ok(record) => records.push(record),
                Err(e) if opts.strict => return Err(e),
                Err(e) => {
                    errors.push((number, e.to_string()));
                    records.push(Record::placeholder(number, &e));
                }
            }
        }

        Ok((Self { records }, errors))
    }

    /// Read and parse a transcript file. Fails with `FileNotFound` when the
    /// file cannot be read.
    pub fn load(
        path: &Path,
        opts: &ParseOptions,
    ) -> Result<(Self, Vec<(usize, String)>), ParseError> {
        let contents = fs::read_to_string(path)
            .map_err(|_| ParseError::FileNotFound(path.display().to_string()))?;
        Self::parse(&contents, opts)
    }

    /// All records in file order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    // ---------------------------------------------------------------
    // Turn grouping
    // ---------------------------------------------------------------

    /// Group this transcript's records for one role into turns, newest
    /// first.
    ///
    /// Records are filtered to the requested role, skipping placeholders.
    /// A repeated turn id appends its text to the existing group behind a
    /// newline — but only when the new text is non-empty. A fresh id opens
    /// a new group at the current position, even when its text is empty:
    /// empty turns still count, they're just invisible in previews.
    pub fn turns(&self, role: Role) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for record in &self.records {
            if record.role != role || record.parse_error.is_some() {
                continue;
            }
            match index.get(record.turn_id.as_str()) {
                Some(&i) => {
                    if !record.text.is_empty() {
                        groups[i].push('\n');
                        groups[i].push_str(&record.text);
                    }
                }
                None => {
                    index.insert(record.turn_id.as_str(), groups.len());
                    groups.push(record.text.clone());
                }
            }
        }

        groups.reverse();
        groups
    }
}

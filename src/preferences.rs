use crate::context::DEFAULT_AGREEMENT_LOOKBACK;
use crate::transcript::{GroupKey, ParseOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

const FILENAME: &str = "promptspool.toml";

const DEFAULT_COPY_TEMPLATE: &str = "{{ label }} copied to clipboard: {{ preview }}";

/// User-facing preferences stored in `.promptspool/promptspool.toml`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Preferences {
    /// Abort transcript scans on the first malformed line instead of
    /// degrading it to a placeholder. Default: lenient.
    #[serde(default)]
    pub strict: bool,

    /// Top-level transcript field that identifies a conversation turn.
    /// Unset means the default `requestId` (with `request_id` fallback).
    #[serde(default)]
    pub group_field: Option<String>,

    /// Jinja2 template for the copy confirmation message.
    /// Sees `label` and `preview`.
    #[serde(default = "default_copy_template")]
    pub copy_template: String,

    /// Directory transcripts are exported to on `/clear`.
    /// Unset means `~/claude_exports`.
    #[serde(default)]
    pub export_dir: Option<String>,

    /// How many recent assistant turns the agreement scan covers.
    #[serde(default = "default_agreement_lookback")]
    pub agreement_lookback: usize,
}

fn default_copy_template() -> String {
    DEFAULT_COPY_TEMPLATE.into()
}

fn default_agreement_lookback() -> usize {
    DEFAULT_AGREEMENT_LOOKBACK
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            strict: false,
            group_field: None,
            copy_template: default_copy_template(),
            export_dir: None,
            agreement_lookback: default_agreement_lookback(),
        }
    }
}

impl Preferences {
    /// Load preferences from `<dir>/promptspool.toml`.
    ///
    /// If the file doesn't exist it is created with defaults. Missing keys
    /// in an existing file are filled in with defaults via serde.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(FILENAME);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let prefs: Preferences = toml::from_str(&contents)
                    .with_context(|| format!("parsing {}", path.display()))?;
                Ok(prefs)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let prefs = Preferences::default();
                let toml_str = toml::to_string_pretty(&prefs)
                    .context("serializing default preferences")?;
                fs::write(&path, &toml_str)
                    .with_context(|| format!("writing default {}", path.display()))?;
                Ok(prefs)
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Transcript parse options derived from these preferences.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict: self.strict,
            group_key: match &self.group_field {
                Some(field) => GroupKey::Field(field.clone()),
                None => GroupKey::RequestId,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient_request_id_grouping() {
        let prefs = Preferences::default();
        assert!(!prefs.strict);
        let opts = prefs.parse_options();
        assert!(!opts.strict);
        assert_eq!(opts.group_key, GroupKey::RequestId);
        assert_eq!(prefs.agreement_lookback, 5);
    }

    #[test]
    fn load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(dir.path()).unwrap();
        assert!(!prefs.strict);
        assert!(dir.path().join("promptspool.toml").exists());

        // A second load reads the file it just wrote.
        let again = Preferences::load(dir.path()).unwrap();
        assert_eq!(again.copy_template, prefs.copy_template);
    }

    #[test]
    fn partial_file_fills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("promptspool.toml"),
            "strict = true\ngroup_field = \"parentUuid\"\n",
        )
        .unwrap();

        let prefs = Preferences::load(dir.path()).unwrap();
        assert!(prefs.strict);
        assert_eq!(
            prefs.parse_options().group_key,
            GroupKey::Field("parentUuid".into())
        );
        // Unspecified keys take their defaults.
        assert_eq!(prefs.copy_template, DEFAULT_COPY_TEMPLATE);
        assert_eq!(prefs.agreement_lookback, 5);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("promptspool.toml"), "strict = maybe").unwrap();
        assert!(Preferences::load(dir.path()).is_err());
    }
}

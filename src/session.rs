use crate::context;
use crate::copy::{self, CopyCommand};
use crate::export;
use crate::preferences::Preferences;
use crate::transcript::{ParseError, Role, Transcript};
use crate::types::{HookOutput, SessionEndInput, SessionEndReason, UserPromptSubmitInput};
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Remove a file, ignoring "not found" errors.
fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

pub struct Session {
    dir: PathBuf,
    session_id: String,
    pub prefs: Preferences,
}

impl Session {
    /// Ensure `<cwd>/.promptspool/` exists, load preferences, and return a
    /// `Session` ready for use.
    pub fn open(cwd: &str, session_id: &str) -> Result<Self> {
        let dir = Path::new(cwd).join(".promptspool");
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let prefs = Preferences::load(&dir)?;
        Ok(Self {
            dir,
            session_id: session_id.to_string(),
            prefs,
        })
    }

    // ---------------------------------------------------------------
    // Spool file — the hand-off point for an external clipboard helper
    // ---------------------------------------------------------------

    fn spool_path(&self) -> PathBuf {
        self.dir.join(format!("copy-{}.txt", self.session_id))
    }

    fn write_spool(&self, content: &str) -> Result<()> {
        let path = self.spool_path();
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        eprintln!(
            "promptspool: spooled {} characters to {}",
            content.chars().count(),
            path.display()
        );
        Ok(())
    }

    fn clear_spool(&self) -> Result<()> {
        remove_if_exists(&self.spool_path())
    }

    // ---------------------------------------------------------------
    // Transcript access
    // ---------------------------------------------------------------

    /// Read the session transcript with this session's parse options.
    /// A missing file degrades to an empty transcript in lenient mode;
    /// strict mode propagates every failure.
    fn read_transcript(&self, path: &str) -> Result<Transcript, ParseError> {
        let opts = self.prefs.parse_options();
        match Transcript::load(Path::new(path), &opts) {
            Ok((transcript, errors)) => {
                for (line, err) in &errors {
                    eprintln!("promptspool: transcript parse error at line {line}: {err}");
                }
                Ok(transcript)
            }
            Err(ParseError::FileNotFound(_)) if !opts.strict => Ok(Transcript::empty()),
            Err(e) => Err(e),
        }
    }

    // ---------------------------------------------------------------
    // Hook handlers
    // ---------------------------------------------------------------

    pub fn handle_user_prompt_submit(
        &self,
        input: &UserPromptSubmitInput,
    ) -> Result<Option<HookOutput>> {
        if let Some(command) = copy::parse_copy_command(&input.prompt) {
            return self.handle_copy(command, input);
        }
        self.handle_context_injection(input)
    }

    /// Run a copy command. Always blocks the prompt: on success the reason
    /// is the confirmation message, on failure it describes what went
    /// wrong. Selection errors reflect a caller mistake and are surfaced
    /// verbatim; extraction errors (strict parse failures) are wrapped.
    fn handle_copy(
        &self,
        command: CopyCommand,
        input: &UserPromptSubmitInput,
    ) -> Result<Option<HookOutput>> {
        let target = command.target;

        let transcript = match self.read_transcript(&input.common.transcript_path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("promptspool: {e}");
                return Ok(Some(HookOutput::block(format!(
                    "Failed to copy {}: {e}",
                    target.noun()
                ))));
            }
        };

        let turns = transcript.turns(target.role());
        match copy::select(&turns, command.count, target) {
            Ok(selection) => {
                self.write_spool(&selection.combined)?;
                let message = copy::render_confirmation(
                    &self.prefs.copy_template,
                    &selection.label,
                    &selection.preview,
                )?;
                Ok(Some(HookOutput::block(message)))
            }
            Err(e) => {
                eprintln!("promptspool: {e}");
                Ok(Some(HookOutput::block(format!("Error: {e}"))))
            }
        }
    }

    /// Non-command prompts may still get context injected: a session-id
    /// note for commit-related prompts, and an agreement reminder when the
    /// assistant has recently opened with a reflexive-agreement phrase.
    fn handle_context_injection(
        &self,
        input: &UserPromptSubmitInput,
    ) -> Result<Option<HookOutput>> {
        let mut sections: Vec<String> = Vec::new();

        if context::is_commit_prompt(&input.prompt) {
            sections.push(context::session_id_context(&self.session_id));
        }

        // Injection is best-effort: an unreadable transcript skips the
        // scan instead of failing the whole hook.
        match self.read_transcript(&input.common.transcript_path) {
            Ok(transcript) => {
                let turns = transcript.turns(Role::Assistant);
                let window = turns.len().min(self.prefs.agreement_lookback);
                if context::needs_agreement_reminder(&turns[..window]) {
                    sections.push(context::AGREEMENT_REMINDER.to_string());
                }
            }
            Err(e) => eprintln!("promptspool: skipping agreement scan: {e}"),
        }

        if sections.is_empty() {
            Ok(None)
        } else {
            Ok(Some(HookOutput::additional_context(sections.join("\n\n"))))
        }
    }

    pub fn handle_session_end(&self, input: &SessionEndInput) -> Result<Option<HookOutput>> {
        if input.reason == SessionEndReason::Clear {
            let export_dir = self
                .prefs
                .export_dir
                .as_ref()
                .map(PathBuf::from)
                .or_else(export::default_export_dir);
            match export_dir {
                Some(dir) => {
                    // Export failure must not block session teardown.
                    match export::export_transcript(&input.common.transcript_path, &dir) {
                        Ok(dest) => eprintln!(
                            "promptspool: exported transcript to {}",
                            dest.display()
                        ),
                        Err(e) => eprintln!("promptspool: transcript export failed: {e:#}"),
                    }
                }
                None => eprintln!("promptspool: no export directory available"),
            }
        }

        self.clear_spool()?;
        Ok(None)
    }
}

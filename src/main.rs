mod context;
mod copy;
mod export;
mod preferences;
mod session;
mod transcript;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use copy::CopyTarget;
use session::Session;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use transcript::{GroupKey, ParseOptions, Transcript};
use types::{HookInput, HookOutput};

#[derive(Parser)]
#[command(
    name = "promptspool",
    about = "Claude Code hook that spools prompts and responses out of session transcripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract turns from a transcript file and print them to stdout,
    /// oldest first, separated by blank lines.
    Extract {
        /// Path to the JSONL transcript.
        #[arg(long)]
        transcript: PathBuf,

        /// Which side of the conversation to extract.
        #[arg(long, value_enum, default_value = "prompt")]
        target: TargetArg,

        /// How many of the most recent turns to extract.
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Abort on the first malformed transcript line.
        #[arg(long)]
        strict: bool,

        /// Top-level field that identifies a conversation turn
        /// (default: requestId).
        #[arg(long)]
        group_field: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    Prompt,
    Response,
}

impl From<TargetArg> for CopyTarget {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Prompt => CopyTarget::Prompt,
            TargetArg::Response => CopyTarget::Response,
        }
    }
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Hook mode: one JSON event on stdin, an optional JSON decision on stdout.
fn run_hook() {
    let input = match read_stdin() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("promptspool: failed to read stdin: {e}");
            process::exit(2);
        }
    };
    let hook_input: HookInput = match serde_json::from_str(&input) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("promptspool: failed to parse hook input: {e}");
            process::exit(2);
        }
    };

    let result: Result<Option<HookOutput>> = match &hook_input {
        HookInput::UserPromptSubmit(e) => Session::open(&e.common.cwd, &e.common.session_id)
            .and_then(|s| s.handle_user_prompt_submit(e)),
        HookInput::SessionEnd(e) => Session::open(&e.common.cwd, &e.common.session_id)
            .and_then(|s| s.handle_session_end(e)),
        _ => Ok(None),
    };

    match result {
        Ok(Some(output)) => match serde_json::to_string(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("promptspool: failed to serialize output: {e}");
                process::exit(2);
            }
        },
        Ok(None) => {}
        Err(err) => {
            eprintln!("promptspool: {err:#}");
            process::exit(2);
        }
    }
}

fn run_extract(
    transcript_path: &PathBuf,
    target: CopyTarget,
    count: usize,
    strict: bool,
    group_field: Option<String>,
) {
    let opts = ParseOptions {
        strict,
        group_key: match group_field {
            Some(field) => GroupKey::Field(field),
            None => GroupKey::RequestId,
        },
    };

    let (transcript, errors) = match Transcript::load(transcript_path, &opts) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("promptspool: {e}");
            process::exit(1);
        }
    };
    for (line, err) in &errors {
        eprintln!("promptspool: transcript parse error at line {line}: {err}");
    }

    let turns = transcript.turns(target.role());
    match copy::select(&turns, count, target) {
        Ok(selection) => println!("{}", selection.combined),
        Err(e) => {
            eprintln!("promptspool: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        None => run_hook(),
        Some(Command::Extract {
            transcript,
            target,
            count,
            strict,
            group_field,
        }) => run_extract(&transcript, target.into(), count, strict, group_field),
    }
}

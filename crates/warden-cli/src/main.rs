//! # warden
//!
//! Command-line entry point. The host invokes `warden hook <event>` at each
//! lifecycle point; the remaining subcommands are for operators.

#![deny(unsafe_code)]

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use warden_continuity::Trigger;
use warden_core::paths::StatePaths;
use warden_settings::{LoggingSettings, WardenSettings};

/// Policy and continuity layer for coding-agent hooks.
#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Policy and continuity layer for coding-agent hooks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle one host hook event. Reads the payload from stdin.
    Hook {
        /// Event name, e.g. `PreToolUse` or `pre-tool-use`.
        event: String,
    },
    /// List the built-in hook handlers and their priorities.
    Hooks {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Dry-run a shell command against the policy.
    Check {
        /// Command line to classify.
        command: String,
    },
    /// List the effective policy rules.
    Rules {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show recent non-allow policy verdicts.
    Audit {
        /// Number of entries to show.
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Scan files or directories for secrets and unfinished work.
    Scan {
        /// Paths to scan.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print JSON findings.
        #[arg(long)]
        json: bool,
    },
    /// Validate a commit message.
    ValidateCommit {
        /// Full commit message.
        message: String,
    },
    /// Show token usage for a session (defaults to the current one).
    TokenStatus {
        /// Session id.
        #[arg(long)]
        session: Option<String>,
    },
    /// Reset token usage for a session (defaults to the current one).
    TokenReset {
        /// Session id.
        #[arg(long)]
        session: Option<String>,
    },
    /// Show the latest session brief for this project.
    Brief {
        /// Print the stored JSON record.
        #[arg(long)]
        json: bool,
        /// List every retained brief, oldest first.
        #[arg(long)]
        history: bool,
    },
    /// Continuity pipeline commands.
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PipelineCommand {
    /// Capture, refine and summarize a session into a brief.
    Run {
        /// Session to capture.
        #[arg(long)]
        session_id: String,
        /// Host interaction log.
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Session working directory.
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// What started the run.
        #[arg(long, value_enum, default_value = "manual")]
        trigger: TriggerArg,
    },
    /// Show the last recorded pipeline state.
    Status,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TriggerArg {
    PreCompact,
    SessionEnd,
    Manual,
}

impl From<TriggerArg> for Trigger {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::PreCompact => Self::PreCompact,
            TriggerArg::SessionEnd => Self::SessionEnd,
            TriggerArg::Manual => Self::Manual,
        }
    }
}

fn init_logging(logging: &LoggingSettings) {
    if logging.json {
        warden_core::logging::init_json_subscriber(&logging.level);
    } else {
        warden_core::logging::init_subscriber(&logging.level);
    }
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn load_settings(cwd: &std::path::Path) -> Result<WardenSettings> {
    warden_settings::load_settings(cwd)
        .with_context(|| format!("Failed to load settings for {}", cwd.display()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("Failed to resolve the current directory")?;
    let paths = StatePaths::from_env();

    match cli.command {
        // Hook failures must still produce a protocol response.
        Command::Hook { event } => Ok(exit(commands::hook(&event, &cwd, paths).await)),
        command => {
            let settings = load_settings(&cwd)?;
            init_logging(&settings.logging);
            run(command, &settings, paths, cwd).await.map(exit)
        }
    }
}

async fn run(
    command: Command,
    settings: &WardenSettings,
    paths: StatePaths,
    cwd: PathBuf,
) -> Result<i32> {
    match command {
        Command::Hook { event } => Ok(commands::hook(&event, &cwd, paths).await),
        Command::Hooks { json } => commands::hooks(settings, paths, json),
        Command::Check { command } => commands::check(settings, &command, &cwd),
        Command::Rules { json } => commands::rules(settings, json),
        Command::Audit { limit } => commands::audit(&paths, limit),
        Command::Scan { paths: targets, json } => commands::scan(settings, &targets, json),
        Command::ValidateCommit { message } => commands::validate_commit(settings, &message),
        Command::TokenStatus { session } => commands::token_status(settings, &paths, session),
        Command::TokenReset { session } => commands::token_reset(settings, &paths, session),
        Command::Brief { json, history } => commands::brief(settings, paths, &cwd, json, history),
        Command::Pipeline { command } => match command {
            PipelineCommand::Run {
                session_id,
                transcript,
                cwd: session_cwd,
                trigger,
            } => {
                let session_cwd = session_cwd.unwrap_or(cwd);
                commands::pipeline_run(
                    settings,
                    paths,
                    &session_id,
                    &session_cwd,
                    transcript,
                    trigger.into(),
                )
                .await
            }
            PipelineCommand::Status => commands::pipeline_status(settings, paths),
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_detached_pipeline_args() {
        let cli = Cli::try_parse_from([
            "warden",
            "pipeline",
            "run",
            "--session-id",
            "s9",
            "--cwd",
            "/repo",
            "--trigger",
            "pre-compact",
            "--transcript",
            "/tmp/t.jsonl",
        ])
        .unwrap();
        let Command::Pipeline {
            command:
                PipelineCommand::Run {
                    session_id,
                    trigger,
                    transcript,
                    ..
                },
        } = cli.command
        else {
            panic!("expected pipeline run");
        };
        assert_eq!(session_id, "s9");
        assert_eq!(Trigger::from(trigger), Trigger::PreCompact);
        assert_eq!(transcript, Some(PathBuf::from("/tmp/t.jsonl")));
    }

    #[test]
    fn hook_event_is_free_form() {
        let cli = Cli::try_parse_from(["warden", "hook", "pre-tool-use"]).unwrap();
        assert!(matches!(cli.command, Command::Hook { ref event } if event == "pre-tool-use"));
    }
}

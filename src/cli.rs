//! Command-line interface for yomiage
//!
//! Provides argument parsing using clap derive macros.

use crate::config::EngineKind;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Japanese narration synthesis with pronunciation arbitration
#[derive(Parser, Debug)]
#[command(
    name = "yomiage",
    version,
    about = "Japanese narration synthesis with pronunciation arbitration"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage progress, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Engine selection override for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineChoice {
    Voicevox,
    Voicepeak,
}

impl From<EngineChoice> for EngineKind {
    fn from(choice: EngineChoice) -> Self {
        match choice {
            EngineChoice::Voicevox => EngineKind::Voicevox,
            EngineChoice::Voicepeak => EngineKind::Voicepeak,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize one script into WAV + SRT + audit log
    Synth {
        /// Script file (UTF-8 A-text)
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output directory for audio.wav, subtitles.srt and tts_log.json
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// Channel ID for engine routing and the audit log
        #[arg(long, value_name = "CHANNEL")]
        channel: String,

        /// Video number within the channel
        #[arg(long, value_name = "NO")]
        video: String,

        /// Override the routed engine for this run
        #[arg(long, value_enum, value_name = "ENGINE")]
        engine: Option<EngineChoice>,
    },

    /// Run the pipeline for every job in a jobs file, isolating failures
    Batch {
        /// Jobs file: one `channel,video,script_path,out_dir` per line
        #[arg(long, value_name = "PATH")]
        jobs: PathBuf,
    },

    /// Print tokens and flagged risky spans without synthesizing
    Preview {
        /// Script file (UTF-8 A-text)
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Channel ID for engine routing
        #[arg(long, value_name = "CHANNEL", default_value = "default")]
        channel: String,

        /// Video number for engine routing
        #[arg(long, value_name = "NO", default_value = "0")]
        video: String,
    },

    /// Check the analyzer dictionary, engines and LLM configuration
    Check,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

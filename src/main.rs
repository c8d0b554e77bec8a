use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::Level;
use yomiage::app::{run_batch, run_check, run_preview, run_synth};
use yomiage::cli::{Cli, Commands};
use yomiage::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?.with_env_overrides();

    match cli.command {
        Commands::Synth {
            input,
            out_dir,
            channel,
            video,
            engine,
        } => {
            let result = run_synth(
                &config,
                &channel,
                &video,
                &input,
                &out_dir,
                engine.map(Into::into),
            )?;
            if !cli.quiet {
                println!("wav: {}", result.wav_path.display());
                println!("srt: {}", result.srt_path.display());
                println!("log: {}", result.log_path.display());
                println!(
                    "duration: {:.2}s across {} segments",
                    result.total_duration_sec,
                    result.segments.len()
                );
            }
        }
        Commands::Batch { jobs } => {
            let (succeeded, failed) = run_batch(&config, &jobs)?;
            println!("batch complete: {} ok, {} failed", succeeded, failed);
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Preview {
            input,
            channel,
            video,
        } => {
            run_preview(&config, &channel, &video, &input)?;
        }
        Commands::Check => {
            run_check(&config)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "yomiage", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

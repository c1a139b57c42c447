mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{decode, init, run, DecodeArgs, InitArgs, RunArgs};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inkflow CLI - AI rewrite actions streamed into your document
#[derive(Parser, Debug)]
#[command(name = "inkflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize an Inkflow workspace
    Init(InitArgs),

    /// Decode a recorded response body into deltas
    Decode(DecodeArgs),

    /// Run an action, replaying a recorded response into the document
    Run(RunArgs),
}

/// Logs go to stderr so `--json` output stays clean
fn init_tracing(fallback: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.unwrap_or("warn").into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => {
            let cwd = cwd.display().to_string();
            let log_filter = Config::load(&cwd).ok().and_then(|config| config.log_filter);
            init_tracing(log_filter.as_deref());

            match cli.command {
                Command::Init(args) => init(args, &cwd),
                Command::Decode(args) => decode(args, &cwd),
                Command::Run(args) => run(args, &cwd).await,
            }
        }
        Err(err) => Err(anyhow::anyhow!("Cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use inkflow_editor::{
    ActionKind, CycleStatus, EditSession, EntryKind, FileStore, ReplayService, Role, TextDocument,
    TranscriptLog,
};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Action to run (expand, continue, summarize, translate, custom)
    #[arg(short, long)]
    pub action: String,

    /// Instruction for the custom action
    #[arg(short, long)]
    pub instruction: Option<String>,

    /// Char range to rewrite, as `start..end` (defaults to the whole document)
    #[arg(short, long, value_parser = parse_selection)]
    pub select: Option<(usize, usize)>,

    /// Recorded response body to replay
    #[arg(long)]
    pub stream: PathBuf,

    /// Document to edit (overrides config)
    #[arg(short, long)]
    pub document: Option<String>,

    /// Print the transcript as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RunArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let document_path = match &args.document {
        Some(document) => PathBuf::from(cwd).join(document),
        None => config.get_document_path(cwd),
    };
    let stream_path = PathBuf::from(cwd).join(&args.stream);
    let body = fs::read(&stream_path)
        .with_context(|| format!("Cannot read {}", stream_path.display()))?;

    let kind = ActionKind::parse(&args.action)?;
    let mut session = EditSession::with_store(
        "cli",
        TextDocument::new(""),
        FileStore::new(&document_path),
    )?;
    session.edit(|doc| match args.select {
        Some((start, end)) => doc.select(start, end),
        // Continue Writing picks up at the end; everything else rewrites the whole text
        None if kind == ActionKind::ContinueWriting => {}
        None => doc.select_all(),
    })?;

    if !args.json {
        println!(
            "{} {} → {}",
            "✍️".bright_blue(),
            kind.label().bright_blue().bold(),
            document_path.display()
        );
    }

    let service = ReplayService::new(body).with_chunk_size(config.replay_chunk_size);
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping replay");
        }
    };
    let result = session
        .run_action_until(&service, &args.action, args.instruction.as_deref(), cancel)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(session.transcript())?);
    } else {
        print_transcript(session.transcript());
    }

    let outcome = result?;
    tracing::info!(
        status = ?outcome.status,
        deltas = outcome.deltas,
        document = %document_path.display(),
        "replay finished"
    );
    if !args.json {
        let status = match outcome.status {
            CycleStatus::Completed => "Done".green().bold(),
            CycleStatus::Cancelled => "Cancelled".yellow().bold(),
            CycleStatus::Failed => "Failed".red().bold(),
        };
        println!();
        println!(
            "{} {} deltas applied, saved to {}",
            status,
            outcome.deltas,
            document_path.display()
        );
    }

    Ok(())
}

fn print_transcript(transcript: &TranscriptLog) {
    println!();
    for (handle, entry) in transcript.iter() {
        let who = match entry.role {
            Role::User => "you".bright_white().bold(),
            Role::Assistant => "ai".bright_magenta().bold(),
        };
        match entry.kind {
            EntryKind::Request => println!("{} {} {}", handle, who, entry.text()),
            EntryKind::Intent => println!("{} {} {}", handle, who, entry.text().dimmed()),
            EntryKind::Content => {
                let snapshot = entry
                    .snapshot()
                    .map(|index| format!(" [snapshot {}]", index))
                    .unwrap_or_default();
                println!("{} {} {}{}", handle, who, entry.text(), snapshot.dimmed());
            }
        }
    }
}

fn parse_selection(raw: &str) -> Result<(usize, usize)> {
    let (start, end) = raw
        .split_once("..")
        .ok_or_else(|| anyhow!("expected `start..end`, got `{}`", raw))?;
    let start: usize = start.trim().parse()?;
    let end: usize = end.trim().parse()?;
    if start > end {
        return Err(anyhow!("selection start {} is after end {}", start, end));
    }
    Ok((start, end))
}

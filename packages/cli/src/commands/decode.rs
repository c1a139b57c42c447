use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use inkflow_editor::StreamDecoder;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Recorded response body
    pub stream: PathBuf,

    /// Feed the decoder this many bytes at a time (overrides config)
    #[arg(short, long)]
    pub chunk_size: Option<usize>,

    /// Print the deltas as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub fn decode(args: DecodeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = PathBuf::from(cwd).join(&args.stream);
    let body = fs::read(&path).with_context(|| format!("Cannot read {}", path.display()))?;
    let chunk_size = args.chunk_size.unwrap_or(config.replay_chunk_size).max(1);

    let (deltas, skipped) = decode_chunked(&body, chunk_size);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&deltas)?);
        return Ok(());
    }

    for (i, delta) in deltas.iter().enumerate() {
        println!("{} {:?}", format!("{:>4}", i).dimmed(), delta);
    }
    println!();
    println!(
        "{} {} deltas, {} malformed lines skipped",
        "✓".green(),
        deltas.len(),
        skipped
    );

    Ok(())
}

fn decode_chunked(body: &[u8], chunk_size: usize) -> (Vec<String>, usize) {
    let mut decoder = StreamDecoder::new();
    let mut deltas = Vec::new();
    for chunk in body.chunks(chunk_size) {
        deltas.extend(decoder.push(chunk));
    }
    deltas.extend(decoder.finish());
    (deltas, decoder.skipped())
}

use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Document file to edit
    #[arg(short, long, default_value = "document.txt")]
    pub document: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Inkflow workspace...".bright_blue().bold());

    let config = Config {
        document_path: args.document.clone(),
        ..Config::default()
    };

    let document_path = config.get_document_path(cwd);
    if !document_path.exists() {
        if let Some(parent) = document_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&document_path, "")?;
        println!("  {} Created {}", "✓".green(), args.document);
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Workspace initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Write something in {}", args.document);
    println!("  2. Run: inkflow run --action expand --stream response.txt");

    Ok(())
}

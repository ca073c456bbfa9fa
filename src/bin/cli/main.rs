mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "article-sync", about = "Sync an article collection with a GitHub repository", version)]
struct Cli {
    /// Data directory for settings and the local cache
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Save GitHub access settings
    Configure {
        /// Personal access token
        #[arg(long)]
        token: String,
        /// Repository owner
        #[arg(long)]
        owner: String,
        /// Repository name
        #[arg(long)]
        repo: String,
        /// Branch (defaults to "main")
        #[arg(long, default_value = "")]
        branch: String,
    },

    /// Show whether GitHub is configured
    Status,

    /// Check that the repository is reachable
    Test,

    /// Print the article collection
    Fetch,

    /// Save an article collection read from a JSON file ("-" for stdin)
    Save {
        file: String,
    },

    /// Print the raw URL of the stored document
    RawUrl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut app = app::App::new(cli.data_dir)?;

    match cli.command {
        Command::Configure { token, owner, repo, branch } => {
            commands::configure(&mut app, token, owner, repo, branch)?;
        }
        Command::Status => commands::status(&app, &cli.format)?,
        Command::Test => commands::test(&app, &cli.format).await?,
        Command::Fetch => commands::fetch(&app, &cli.format).await?,
        Command::Save { file } => commands::save(&app, &file, &cli.format).await?,
        Command::RawUrl => println!("{}", app.store.raw_document_url()),
    }

    Ok(())
}

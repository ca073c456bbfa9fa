use std::io::Read;

use anyhow::{bail, Context, Result};

use article_sync::{Document, RepoConfigInput};

use crate::app::App;
use crate::OutputFormat;

pub fn configure(
    app: &mut App,
    token: String,
    owner: String,
    repo: String,
    branch: String,
) -> Result<()> {
    let input = RepoConfigInput { token, owner, repo, branch };
    let configured = app
        .store
        .configure(&app.settings, input)
        .context("Failed to save settings")?;

    if configured {
        let config = app.store.config();
        println!("Configured {} (branch {})", config.full_name(), config.branch);
    } else {
        println!("Settings saved, but token, owner and repository are all required");
    }
    Ok(())
}

pub fn status(app: &App, format: &OutputFormat) -> Result<()> {
    let config = app.store.config();
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "configured": config.is_configured(),
                "owner": config.owner,
                "repo": config.repo,
                "branch": config.branch,
                "path": config.document_path,
                "dataDir": app.settings.data_dir().to_string_lossy(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if config.is_configured() {
                println!("GitHub configured: {} ({})", config.full_name(), config.branch);
            } else {
                println!("GitHub not configured, articles are stored locally only");
            }
            println!("Data directory: {}", app.settings.data_dir().display());
        }
    }
    Ok(())
}

pub async fn test(app: &App, format: &OutputFormat) -> Result<()> {
    let result = app.store.test_connection().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Plain => println!("{}", result.message),
    }
    Ok(())
}

pub async fn fetch(app: &App, format: &OutputFormat) -> Result<()> {
    let document = app.store.fetch_document().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
        OutputFormat::Plain => {
            if document.is_empty() {
                println!("(no articles)");
            }
            for (index, article) in document.iter().enumerate() {
                println!("{}", article_line(index, article));
            }
        }
    }
    Ok(())
}

/// One-line summary of an article: its title when it has one, compact JSON otherwise
fn article_line(index: usize, article: &serde_json::Value) -> String {
    match article.get("title").and_then(|t| t.as_str()) {
        Some(title) if !title.is_empty() => format!("{:>4}  {}", index + 1, title),
        _ => format!("{:>4}  {}", index + 1, article),
    }
}

pub async fn save(app: &App, file: &str, format: &OutputFormat) -> Result<()> {
    let data = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?
    };

    let document: Document =
        serde_json::from_str(&data).context("Input must be a JSON array of articles")?;
    let result = app.store.save_document(&document).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Plain => println!("{}", result.message),
    }

    if !result.success {
        bail!("save did not reach GitHub");
    }
    Ok(())
}

//! comic-import entry point.

use clap::Parser;
use comic_import::{
    BatchImportResult, BatchImportStatus, ComicSource, Config, Database, FileSource,
    ImportProgressState, ImportResult, ImportService, ImportStatus,
    config::{Cli, Command},
    library::format_file_size,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comic_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Import { paths, json } => cmd_import(&config, paths, json).await,
        Command::List => cmd_list(&config),
    }
}

/// Initialize config and database.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let config = Config::default();
    let _db = Database::open(&config.database.path)?;
    std::fs::create_dir_all(&config.cover.covers_dir)?;
    println!("Initialized database: {}", config.database.path.display());
    println!("Covers directory: {}", config.cover.covers_dir.display());

    println!("\nThen run: comic-import import /path/to/comics");

    Ok(())
}

/// Import files and directories.
async fn cmd_import(config: &Config, paths: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let service = ImportService::from_config(config, Arc::new(db), ImportProgressState::new());

    let mut sources: Vec<Arc<dyn ComicSource>> = Vec::new();
    for path in &paths {
        if path.is_dir() {
            sources.extend(service.directory_sources(path)?);
        } else {
            sources.push(Arc::new(FileSource::new(path)));
        }
    }

    if sources.len() == 1 && !paths.iter().any(|p| p.is_dir()) {
        let name = sources[0].name();
        let mut handle = service.import(Arc::clone(&sources[0]));
        let cancel = handle.cancellation_token();
        loop {
            tokio::select! {
                event = handle.next() => match event {
                    Some(event) => print_item(&name, &event, json)?,
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => cancel.cancel(),
            }
        }
        let outcome = handle.finish().await?;
        if outcome.status != ImportStatus::Completed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut handle = service.import_batch(sources);
    let cancel = handle.cancellation_token();
    loop {
        tokio::select! {
            event = handle.next() => match event {
                Some(event) => print_batch(&event, json)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => cancel.cancel(),
        }
    }

    let outcome = handle.finish().await?;
    if !json {
        println!(
            "\nImported {} of {} ({} failed)",
            outcome.succeeded(),
            outcome.total,
            outcome.failed()
        );
    }
    if outcome.status == BatchImportStatus::Failed || outcome.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// List library entries.
fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let manga = db.list_manga()?;

    if manga.is_empty() {
        println!("No comics found.");
        return Ok(());
    }

    println!("{:<6} {:<40} {:>6} {:>8} {:<6} COVER", "ID", "TITLE", "PAGES", "SIZE", "FORMAT");
    println!("{}", "-".repeat(80));
    for m in manga {
        println!(
            "{:<6} {:<40} {:>6} {:>8} {:<6} {}",
            m.id.unwrap_or_default(),
            truncate(&m.title, 40),
            m.page_count,
            format_file_size(m.file_size),
            m.file_format,
            if m.cover_image_path.is_some() { "yes" } else { "no" }
        );
    }

    Ok(())
}

fn print_item(name: &str, event: &ImportResult, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(event);
    }
    println!("{}", describe(name, event));
    Ok(())
}

fn print_batch(event: &BatchImportResult, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(event);
    }

    match (&event.current_file, &event.current) {
        (Some(name), Some(current)) => println!(
            "[{}/{}] {}",
            event.current_index,
            event.total,
            describe(name, current)
        ),
        _ => match event.status {
            BatchImportStatus::Failed => println!(
                "Batch failed: {}",
                event.error.as_deref().unwrap_or("unknown error")
            ),
            BatchImportStatus::Cancelled => println!(
                "Batch cancelled after {} of {}",
                event.results.len(),
                event.total
            ),
            _ => {}
        },
    }
    Ok(())
}

fn describe(name: &str, event: &ImportResult) -> String {
    match event.status {
        ImportStatus::Completed => {
            let pages = event.comic.as_ref().map(|c| c.page_count).unwrap_or_default();
            format!(
                "{}: completed (id {}, {} pages)",
                name,
                event.manga_id.unwrap_or_default(),
                pages
            )
        }
        ImportStatus::Failed => format!(
            "{}: failed: {}",
            name,
            event.error.as_deref().unwrap_or("unknown error")
        ),
        status => format!("{}: {} {}%", name, status.label(), event.progress),
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

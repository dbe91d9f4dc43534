//! todo-cache command line
//!
//! Wires the file store, repository, query cache and session gate together
//! and runs one command against them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::io::{BufRead, Write};
use std::sync::Arc;
use todo_cache::cache::{QueryCache, TaskMutator, TaskQueries};
use todo_cache::cli::{Cli, Command, ListArgs};
use todo_cache::config::{Config, ConfigLoader, ConfigPaths};
use todo_cache::error::{ErrorReport, TaskError};
use todo_cache::format::{self, OutputFormat};
use todo_cache::gate::{
    AllowAll, AuthOutcome, Authenticator, CapabilityGate, SessionGate, ensure_authorized,
};
use todo_cache::logging::{self, LogTarget};
use todo_cache::repository::TaskRepository;
use todo_cache::store::FileStore;
use tracing::{debug, info, warn};

/// Asks for confirmation on the terminal.
struct TerminalAuthenticator;

#[async_trait]
impl Authenticator for TerminalAuthenticator {
    async fn authenticate(&self, reason: &str) -> AuthOutcome {
        let prompt = format!("{} [y/N]: ", reason);
        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            stderr.write_all(prompt.as_bytes())?;
            stderr.flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) if line.is_empty() => AuthOutcome::Unavailable,
            Ok(Ok(line)) => match line.trim().to_lowercase().as_str() {
                "y" | "yes" => AuthOutcome::Success,
                _ => AuthOutcome::Failed("not confirmed".to_string()),
            },
            Ok(Err(e)) => AuthOutcome::Failed(e.to_string()),
            Err(e) => AuthOutcome::Failed(e.to_string()),
        }
    }
}

/// Everything a command needs.
struct App {
    queries: TaskQueries,
    mutator: TaskMutator,
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut loader = match cli.config {
        Some(ref file) => ConfigLoader::load_with_paths(
            ConfigPaths::discover().with_explicit_file(file),
            |name| std::env::var(name).ok(),
        )?,
        None => ConfigLoader::load()?,
    };
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "Using config file");
    }
    if let Some(ref dir) = cli.data_dir {
        loader.config_mut().storage.data_dir = dir.clone();
    }
    let config = loader.into_config();

    let format = cli.format;
    let command = cli.command.unwrap_or(Command::List(ListArgs::default()));

    match run(&config, command, format).await {
        Ok(output) => {
            print!("{}", output);
            Ok(())
        }
        Err(err) => {
            let report = ErrorReport::from(err);
            warn!(code = ?report.code, message = %report.message, "Command failed");
            match format {
                OutputFormat::Json => eprintln!("{}", format::to_json(&report)?),
                OutputFormat::Text => eprintln!("Error: {}", report),
            }
            std::process::exit(1);
        }
    }
}

async fn build_gate(config: &Config, command: &Command) -> Arc<dyn CapabilityGate> {
    if !config.auth.required || !command.is_mutation() {
        return Arc::new(AllowAll);
    }
    let gate = SessionGate::new(Arc::new(TerminalAuthenticator));
    gate.authenticate().await;
    Arc::new(gate)
}

async fn open_app(config: &Config, format: OutputFormat) -> Result<App> {
    config
        .ensure_data_dir()
        .with_context(|| format!("Failed to create {}", config.storage.data_dir.display()))?;
    let store = FileStore::open(&config.storage.data_dir).await?;
    info!(dir = %store.dir().display(), "Opened task store");

    let repo = Arc::new(TaskRepository::new(Arc::new(store)));
    let cache = Arc::new(QueryCache::new());
    let queries = TaskQueries::new(Arc::clone(&repo), Arc::clone(&cache))
        .with_stale_after(config.cache.stale_after());
    let mutator = TaskMutator::new(repo, cache);

    Ok(App {
        queries,
        mutator,
        format,
    })
}

async fn run(config: &Config, command: Command, format: OutputFormat) -> Result<String> {
    let gate = build_gate(config, &command).await;
    if command.is_mutation() {
        ensure_authorized(gate.as_ref()).map_err(|_| ErrorReport::unauthorized())?;
    }

    let app = open_app(config, format).await?;
    match command {
        Command::List(args) => match args.category {
            Some(category) => {
                let tasks = app.queries.by_category(category).await?;
                app.render(&tasks, |t| {
                    format::format_tasks_text(&category.to_string(), t)
                })
            }
            None => {
                let buckets = app.queries.categorized().await?;
                app.render(&buckets, format::format_categorized_text)
            }
        },
        Command::Show { id } => {
            let task = app
                .queries
                .by_id(&id)
                .await?
                .ok_or_else(|| TaskError::NotFound(id.clone()))?;
            app.render(&task, format::format_task_text)
        }
        Command::Add(args) => {
            let task = app.mutator.create(&args.to_data()).await?;
            app.render(&task, format::format_task_text)
        }
        Command::Edit(args) => {
            let task = app.mutator.update(&args.id, &args.to_patch()).await?;
            app.render(&task, format::format_task_text)
        }
        Command::Due { id, date } => {
            let task = app.mutator.update_due_date(&id, &date).await?;
            app.render(&task, format::format_task_text)
        }
        Command::Toggle { id } => {
            let task = app.mutator.toggle(&id).await?;
            app.render(&task, format::format_task_text)
        }
        Command::Rm { id } => {
            app.mutator.delete(&id).await?;
            Ok(app.done(&format!("Deleted {}", id)))
        }
        Command::Clear => {
            app.mutator.delete_all().await?;
            Ok(app.done("Deleted all tasks"))
        }
    }
}

impl App {
    fn render<T, F>(&self, value: &T, text: F) -> Result<String>
    where
        T: serde::Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        match self.format {
            OutputFormat::Json => Ok(format!("{}\n", format::to_json(value)?)),
            OutputFormat::Text => Ok(text(value)),
        }
    }

    fn done(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => format!("{}\n", serde_json::json!({ "ok": true, "message": message })),
            OutputFormat::Text => format!("{}\n", message),
        }
    }
}

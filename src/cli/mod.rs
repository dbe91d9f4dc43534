//! CLI command definitions for todo-cache
//!
//! The main entry point is the `Cli` struct which holds the global options
//! and one subcommand per task operation.

use crate::format::OutputFormat;
use crate::types::{Category, TaskData, TaskPatch};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Local task list with a read-through cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the stored tasks (overrides config)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks grouped by today, tomorrow and later (default)
    List(ListArgs),

    /// Show one task
    Show {
        /// Task ID
        id: String,
    },

    /// Create a task
    Add(AddArgs),

    /// Change fields of a task
    Edit(EditArgs),

    /// Move a task to another due date
    Due {
        /// Task ID
        id: String,
        /// New due date (YYYY-MM-DD)
        date: String,
    },

    /// Flip a task between done and not done
    Toggle {
        /// Task ID
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },

    /// Delete every task
    Clear,
}

impl Command {
    /// Whether the command writes to storage.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Command::List(_) | Command::Show { .. })
    }
}

/// Arguments for `list`.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only show one category: today, tomorrow or other
    #[arg(long, value_name = "CATEGORY", value_parser = parse_category)]
    pub category: Option<Category>,
}

/// Arguments for `add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title
    #[arg(short, long)]
    pub title: String,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub due: String,

    /// Longer description
    #[arg(long)]
    pub description: Option<String>,
}

impl AddArgs {
    pub fn to_data(&self) -> TaskData {
        TaskData {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due.clone(),
        }
    }
}

/// Arguments for `edit`. Omitted fields are left unchanged.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Task ID
    pub id: String,

    /// New title
    #[arg(short, long)]
    pub title: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New due date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub due: Option<String>,

    /// Mark done (true) or not done (false)
    #[arg(long)]
    pub completed: Option<bool>,
}

impl EditArgs {
    pub fn to_patch(&self) -> TaskPatch {
        TaskPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            completed: self.completed,
            due_date: self.due.clone(),
        }
    }
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_str(s).ok_or_else(|| format!("unknown category '{}' (expected today, tomorrow or other)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "todo-cache",
            "add",
            "--title",
            "Buy milk",
            "--due",
            "2026-01-13",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Add(args)) => {
                let data = args.to_data();
                assert_eq!(data.title, "Buy milk");
                assert_eq!(data.due_date, "2026-01-13");
                assert!(data.description.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_edit_builds_partial_patch() {
        let cli = Cli::try_parse_from(["todo-cache", "edit", "abc", "--completed", "true"]).unwrap();
        let Some(Command::Edit(args)) = cli.command else {
            panic!("expected edit");
        };
        let patch = args.to_patch();
        assert_eq!(patch.completed, Some(true));
        assert!(patch.title.is_none());
        assert!(patch.due_date.is_none());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["todo-cache", "list", "--category", "tomorrow", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Some(Command::List(args)) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.category, Some(Category::Tomorrow));
    }

    #[test]
    fn test_unknown_category_rejected() {
        assert!(Cli::try_parse_from(["todo-cache", "list", "--category", "someday"]).is_err());
    }

    #[test]
    fn test_is_mutation() {
        assert!(!Command::Show { id: "1".into() }.is_mutation());
        assert!(Command::Clear.is_mutation());
        assert!(Command::Toggle { id: "1".into() }.is_mutation());
    }
}

use crate::config::{ConfigError, ConfigManager};
use crate::filter::{FilterCriteria, SortKey, StatusFilter};
use crate::models::{parse_due_date, Category, Priority, TaskError, TaskId, TaskPatch};
use crate::preferences::Preferences;
use crate::store::TaskStore;
use crate::view;
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about = "Local task list manager")]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Configuration file (defaults to $TASKDECK_CONFIG or ~/.config/taskdeck/config.json)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Task(TaskCommand),
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Commands that work on the task store.
#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a new task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Due date as YYYY-MM-DD
        #[arg(long, value_parser = parse_due_date)]
        due: Option<NaiveDate>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Change fields of an existing task
    Edit {
        id: TaskId,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Flip a task between active and completed
    #[command(alias = "done")]
    Toggle { id: TaskId },
    /// Delete a task
    #[command(alias = "rm")]
    Remove {
        id: TaskId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every completed task
    ClearCompleted {
        #[arg(short, long)]
        yes: bool,
    },
    /// Show tasks, filtered and sorted
    #[command(alias = "ls")]
    List {
        /// all, active or completed
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        priority: Option<Priority>,
        /// Case-insensitive text search
        #[arg(long, default_value = "")]
        search: String,
        /// date-asc, date-desc, priority, category or status
        #[arg(long)]
        sort: Option<SortKey>,
    },
    /// Show task counts and progress
    Stats,
    /// Show or change the display theme
    Theme {
        #[arg(value_enum, default_value_t = ThemeAction::Show)]
        action: ThemeAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeAction {
    Show,
    Toggle,
    Dark,
    Light,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    List,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Asks on stdin; anything but "y"/"yes" declines.
pub fn confirm_on_stdin(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[tracing::instrument(skip_all)]
pub fn run(cli: Cli) -> anyhow::Result<()> {
    init_tracing(cli.verbose, cli.quiet)?;
    info!(verbose = cli.verbose, quiet = cli.quiet, "starting taskdeck");

    let mut manager =
        ConfigManager::new(cli.config.as_deref()).context("failed to load configuration")?;

    let command = match cli.command {
        Commands::Config(cmd) => return run_config(&mut manager, cmd),
        Commands::Task(command) => command,
    };

    let storage_config = manager
        .storage_config()
        .context("failed to resolve storage")?;
    let storage = storage_config.open().with_context(|| {
        format!(
            "failed to open storage at {}",
            storage_config.storage_path.display()
        )
    })?;
    let mut store = TaskStore::open(storage);

    dispatch(&mut store, &manager, command)?;
    info!("done");
    Ok(())
}

fn dispatch(
    store: &mut TaskStore,
    manager: &ConfigManager,
    command: TaskCommand,
) -> anyhow::Result<()> {
    let settings = manager.effective();

    match command {
        TaskCommand::Add {
            text,
            due,
            category,
            priority,
        } => {
            let category = category.unwrap_or_else(|| settings.category());
            let priority = priority.unwrap_or_else(|| settings.priority());
            match store.add(&text.join(" "), due, category, priority) {
                Ok(task) => println!("Task added successfully! (id {})", task.id),
                Err(e) => report(e),
            }
        }
        TaskCommand::Edit {
            id,
            text,
            due,
            clear_due,
            category,
            priority,
        } => {
            let patch = TaskPatch {
                text,
                due_date: if clear_due { Some(None) } else { due.map(Some) },
                category,
                priority,
            };
            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            match store.edit(id, &patch) {
                Ok(_) => println!("Task updated successfully!"),
                Err(e) => report(e),
            }
        }
        TaskCommand::Toggle { id } => match store.toggle_completion(id) {
            Ok(task) if task.completed => println!("Task completed!"),
            Ok(_) => println!("Task marked as active!"),
            Err(e) => report(e),
        },
        TaskCommand::Remove { id, yes } => {
            let result = if yes {
                store.remove(id, true)
            } else {
                store.remove(id, confirm_on_stdin)
            };
            match result {
                Ok(_) => println!("Task deleted successfully!"),
                Err(e) => report(e),
            }
        }
        TaskCommand::ClearCompleted { yes } => {
            if store.stats().completed == 0 {
                println!("No completed tasks to delete!");
                return Ok(());
            }
            let removed = if yes {
                store.remove_all_completed(true)
            } else {
                store.remove_all_completed(confirm_on_stdin)
            };
            if removed == 0 {
                report(TaskError::Cancelled);
            } else {
                println!("{} completed task(s) deleted!", removed);
            }
        }
        TaskCommand::List {
            status,
            category,
            priority,
            search,
            sort,
        } => {
            let criteria = FilterCriteria {
                status,
                category,
                priority,
                search,
            };
            let sort = sort.unwrap_or_else(|| settings.sort());
            let tasks = store.query(&criteria, sort);
            let views = view::render(&tasks, Local::now().date_naive());

            let mut out = io::stdout().lock();
            view::write_table(&mut out, &views)?;
        }
        TaskCommand::Stats => {
            let stats = store.stats();
            println!("Total:     {}", stats.total);
            println!("Completed: {}", stats.completed);
            println!("Pending:   {}", stats.pending);
            println!("Progress:  {}%", stats.progress);
        }
        TaskCommand::Theme { action } => {
            let storage = store.storage();
            let mut prefs = Preferences::load(storage);
            match action {
                ThemeAction::Show => {}
                ThemeAction::Toggle => {
                    prefs.toggle_dark_mode(storage);
                }
                ThemeAction::Dark => prefs.set_dark_mode(storage, true),
                ThemeAction::Light => prefs.set_dark_mode(storage, false),
            }
            println!("Theme: {}", prefs.theme_name());
        }
    }

    Ok(())
}

// Validation and lookup failures are reported, not fatal.
fn report(error: TaskError) {
    println!("{}", error);
}

fn run_config(manager: &mut ConfigManager, cmd: ConfigCommands) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            if !crate::config::KEYS.contains(&key.as_str()) {
                return Err(ConfigError::InvalidKey(key).into());
            }
            println!("{}", manager.get(&key).unwrap_or_else(|| "null".to_string()));
        }
        ConfigCommands::Set { key, value } => {
            manager.set(&key, &value)?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::Unset { key } => {
            manager.unset(&key)?;
            println!("{} unset", key);
        }
        ConfigCommands::List => {
            for (key, value, is_default) in manager.list() {
                if is_default {
                    println!("{} = {} (default)", key, value);
                } else {
                    println!("{} = {}", key, value);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_options() {
        let cli = Cli::try_parse_from([
            "taskdeck", "add", "Fix", "bug", "--due", "2026-11-01", "--category", "work",
            "--priority", "high",
        ])
        .unwrap();

        match cli.command {
            Commands::Task(TaskCommand::Add {
                text,
                due,
                category,
                priority,
            }) => {
                assert_eq!(text.join(" "), "Fix bug");
                assert_eq!(due, NaiveDate::from_ymd_opt(2026, 11, 1));
                assert_eq!(category, Some(Category::Work));
                assert_eq!(priority, Some(Priority::High));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["taskdeck", "add", "x", "--priority", "urgent"]).is_err());
        assert!(Cli::try_parse_from(["taskdeck", "add", "x", "--due", "tomorrow"]).is_err());
        assert!(Cli::try_parse_from(["taskdeck", "list", "--sort", "newest"]).is_err());
        assert!(
            Cli::try_parse_from(["taskdeck", "edit", "1", "--due", "2026-01-01", "--clear-due"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_list_defaults() {
        let cli = Cli::try_parse_from(["taskdeck", "ls"]).unwrap();
        match cli.command {
            Commands::Task(TaskCommand::List {
                status,
                category,
                sort,
                search,
                ..
            }) => {
                assert_eq!(status, StatusFilter::All);
                assert_eq!(category, None);
                assert_eq!(sort, None);
                assert!(search.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

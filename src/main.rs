//! # Cadence
//!
//! A terminal productivity tracker for recurring tasks and daily habits.
//!
//! ## Usage
//!
//! **Tasks**
//! ```bash
//! # One-off task
//! cadence add "Write report" --project Work --due 2025-12-01
//!
//! # Recurring task: every Monday, Wednesday and Friday until the end of the year
//! cadence add "Gym" --due 2025-12-01 --recur "weekly:1,3,5 until:2025-12-31"
//!
//! # Complete it; the next occurrence is created automatically
//! cadence complete 2
//!
//! cadence list --all
//! ```
//!
//! **Habits**
//! ```bash
//! cadence habit add "Read 20 pages"
//! cadence habit mark 1            # today
//! cadence habit unmark 1 --date 2025-11-30
//! cadence habit list              # streaks and 30-day adherence
//! ```
//!
//! **Projects, subtasks and notes**
//! ```bash
//! cadence project add "Thesis" --deadline 2026-05-01
//! cadence subtask add 3 "Draft chapter one"
//! cadence note add "Ideas" "Try the library on Sunday" --pinned
//! ```
//!
//! **Statistics and notifications**
//! ```bash
//! cadence stats --days 7
//! cadence notifications remind
//! cadence notifications list
//! cadence notifications watch --interval 10
//! ```
//!
//! ## Data Storage
//!
//! Everything is saved in one JSON file in your local data directory
//! (`~/.local/share/cadence/cadence.json` on Linux). Override it with `--db` or
//! the `CADENCE_DB` environment variable.
//!
//! Dates are keyed in UTC+5 unless `CADENCE_UTC_OFFSET` says otherwise. Set
//! `RUST_LOG=debug` to see what the engines compute.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use cadence::commands::*;
use cadence::config::Config;
use cadence::models::{Priority, ProjectStatus, TaskType};
use cadence::notes::NotePatch;
use cadence::store::JsonStore;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

#[derive(Parser)]
#[command(name = "cadence", version)]
#[command(about = "Recurring tasks, habit streaks and statistics", long_about = None)]
struct Cli {
    /// Path to the JSON database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Longer description
        #[arg(short = 'D', long)]
        description: Option<String>,
        /// Project the task belongs to
        #[arg(short, long)]
        project: Option<String>,
        /// Category
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short = 'P', long, value_enum)]
        priority: Option<Priority>,
        #[arg(short = 't', long = "type", value_enum)]
        task_type: Option<TaskType>,
        /// Due date in YYYY-MM-DD or RFC 3339
        #[arg(short, long)]
        due: Option<String>,
        /// Recurrence, e.g. daily, daily/2, weekly:1,3,5 or "monthly until:2026-01-01"
        #[arg(short, long)]
        recur: Option<String>,
    },
    /// List tasks
    List {
        /// Show completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Mark a task as done (creates the next occurrence of recurring tasks)
    Complete { id: u64 },
    /// Set a done task back to todo
    Reopen { id: u64 },
    /// Remove a task and its subtasks
    Remove { id: u64 },
    /// Copy a task as a new open task
    Duplicate { id: u64 },
    /// Manage a task's subtasks
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommands,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Edit a task
    Edit {
        id: u64,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short = 'D', long)]
        description: Option<String>,
        #[arg(short, long)]
        project: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short = 'P', long, value_enum)]
        priority: Option<Priority>,
        #[arg(short = 't', long = "type", value_enum)]
        task_type: Option<TaskType>,
        #[arg(short, long)]
        due: Option<String>,
        /// New recurrence, or "none" to stop repeating
        #[arg(short, long)]
        recur: Option<String>,
    },
    /// Raise medium tasks due within two days to high priority
    Escalate,
    /// Manage habits
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
    /// Show statistics for the last N days
    Stats {
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Manage notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Add a new habit
    Add { title: String },
    /// List habits with streaks
    List,
    /// Mark a day as done
    Mark {
        id: u64,
        /// Day to mark (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Mark a day as not done
    Unmark {
        id: u64,
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Flip a day between done and not done
    Toggle {
        id: u64,
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show the current streak and adherence
    Streak {
        id: u64,
        /// Reference day (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Pre-create open days for the coming week
    Plan {
        id: u64,
        /// daily or weekly:<days>
        recur: String,
    },
}

#[derive(Subcommand)]
enum SubtaskCommands {
    /// Add a subtask to a task
    Add { task_id: u64, title: String },
    /// List the subtasks of a task
    List { task_id: u64 },
    /// Mark a subtask as done
    Done { id: u64 },
    /// Mark a subtask as open again
    Undo { id: u64 },
    /// Remove a subtask
    Remove { id: u64 },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a new project
    Add {
        title: String,
        #[arg(short = 'D', long)]
        description: Option<String>,
        /// Deadline in YYYY-MM-DD or RFC 3339
        #[arg(short, long)]
        deadline: Option<String>,
    },
    /// List projects with task progress
    List,
    /// Change a project's status
    Status {
        id: u64,
        #[arg(value_enum)]
        status: ProjectStatus,
    },
    /// Remove a project (its tasks are kept)
    Remove { id: u64 },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note
    Add {
        title: String,
        #[arg(default_value = "")]
        content: String,
        #[arg(short, long)]
        pinned: bool,
    },
    /// List notes, pinned first
    List,
    /// Edit a note
    Edit {
        id: u64,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short = 'C', long)]
        content: Option<String>,
        #[arg(short, long)]
        pinned: Option<bool>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short = 'P', long)]
        project: Option<String>,
    },
    /// Remove a note
    Remove { id: u64 },
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// Show unread notifications
    List,
    /// Mark a notification as read
    Read { id: u64 },
    /// Create reminders for tasks due soon and habits not done today
    Remind,
    /// Print new notifications as they arrive
    Watch {
        /// Seconds between polls
        #[arg(short, long, default_value_t = 5)]
        interval: u64,
        /// Stop after this many polls
        #[arg(short, long)]
        rounds: Option<u32>,
        /// Send notifications to the log instead of stdout
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "cadence", &mut io::stdout());
        return Ok(());
    }

    let cfg = Config::resolve(cli.db)?;
    let mut store = JsonStore::open(&cfg.db_path);

    match cli.command {
        Commands::Add {
            title,
            description,
            project,
            category,
            priority,
            task_type,
            due,
            recur,
        } => {
            let input = TaskInput {
                title: Some(title),
                description,
                project,
                category,
                priority,
                task_type,
                due,
                recur,
            };
            cmd_add(&mut store, &cfg, input, false)?;
        }
        Commands::List { all } => cmd_list(&store, &cfg, all)?,
        Commands::Complete { id } => {
            cmd_complete(&mut store, &cfg, id, false)?;
        }
        Commands::Reopen { id } => cmd_reopen(&mut store, id, false)?,
        Commands::Remove { id } => cmd_remove(&mut store, id, false)?,
        Commands::Duplicate { id } => {
            cmd_duplicate(&mut store, id, false)?;
        }
        Commands::Subtask { command } => match command {
            SubtaskCommands::Add { task_id, title } => {
                cmd_subtask_add(&mut store, task_id, title, false)?;
            }
            SubtaskCommands::List { task_id } => cmd_subtask_list(&store, task_id)?,
            SubtaskCommands::Done { id } => cmd_subtask_done(&mut store, id, true, false)?,
            SubtaskCommands::Undo { id } => cmd_subtask_done(&mut store, id, false, false)?,
            SubtaskCommands::Remove { id } => cmd_subtask_remove(&mut store, id, false)?,
        },
        Commands::Project { command } => match command {
            ProjectCommands::Add { title, description, deadline } => {
                cmd_project_add(&mut store, &cfg, title, description, deadline, false)?;
            }
            ProjectCommands::List => cmd_project_list(&store, &cfg)?,
            ProjectCommands::Status { id, status } => {
                cmd_project_status(&mut store, id, status, false)?;
            }
            ProjectCommands::Remove { id } => cmd_project_remove(&mut store, id, false)?,
        },
        Commands::Note { command } => match command {
            NoteCommands::Add { title, content, pinned } => {
                cmd_note_add(&mut store, &cfg, title, content, pinned, false)?;
            }
            NoteCommands::List => cmd_note_list(&store, &cfg)?,
            NoteCommands::Edit { id, title, content, pinned, category, project } => {
                let patch = NotePatch { title, content, pinned, category, project };
                cmd_note_edit(&mut store, id, patch, false)?;
            }
            NoteCommands::Remove { id } => cmd_note_remove(&mut store, id, false)?,
        },
        Commands::Edit {
            id,
            title,
            description,
            project,
            category,
            priority,
            task_type,
            due,
            recur,
        } => {
            let input = TaskInput {
                title,
                description,
                project,
                category,
                priority,
                task_type,
                due,
                recur,
            };
            cmd_edit(&mut store, &cfg, id, input, false)?;
        }
        Commands::Escalate => {
            cmd_escalate(&mut store, &cfg, false)?;
        }
        Commands::Habit { command } => match command {
            HabitCommands::Add { title } => {
                cmd_habit_add(&mut store, &cfg, title, false)?;
            }
            HabitCommands::List => cmd_habit_list(&store, &cfg)?,
            HabitCommands::Mark { id, date } => {
                cmd_habit_mark(&mut store, &cfg, id, date, true, false)?;
            }
            HabitCommands::Unmark { id, date } => {
                cmd_habit_mark(&mut store, &cfg, id, date, false, false)?;
            }
            HabitCommands::Toggle { id, date } => {
                cmd_habit_toggle(&mut store, &cfg, id, date, false)?;
            }
            HabitCommands::Streak { id, date } => cmd_habit_streak(&store, &cfg, id, date)?,
            HabitCommands::Plan { id, recur } => {
                cmd_habit_plan(&mut store, &cfg, id, recur, false)?;
            }
        },
        Commands::Stats { days } => cmd_stats(&store, &cfg, days)?,
        Commands::Notifications { command } => match command {
            NotificationCommands::List => cmd_notifications(&store, &cfg)?,
            NotificationCommands::Read { id } => cmd_notification_read(&mut store, id, false)?,
            NotificationCommands::Remind => {
                cmd_remind(&mut store, &cfg, false)?;
            }
            NotificationCommands::Watch { interval, rounds, quiet } => {
                cmd_watch(&store, &cfg, Duration::from_secs(interval), rounds, quiet)?;
            }
        },
        Commands::Completions { .. } => {}
    }
    Ok(())
}

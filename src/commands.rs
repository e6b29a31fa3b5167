use std::collections::HashSet;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::warn;

use crate::config::Config;
use crate::error::{Result, ValidationError};
use crate::escalation::escalate_priorities;
use crate::habits;
use crate::models::{
    Habit, Note, Notification, Priority, Project, ProjectStatus, RecurrenceRule, Status, Task,
    TaskType,
};
use crate::notes::{self, NotePatch};
use crate::notify::{self, ChannelSource, Dispatcher, LogSink, NotificationSink};
use crate::projects;
use crate::recurrence::{materialize_next_task, RecurringTaskCompletionEvent};
use crate::stats::{self, Window};
use crate::store::{Query, RowStore};
use crate::streak::{longest_streak, streak_result};
use crate::subtasks;

const MAX_TITLE: usize = 200;
const MAX_DESCRIPTION: usize = 2000;
const MAX_NOTE: usize = 20_000;

/// Field values for adding or editing a task. `None` leaves a field unset or
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub task_type: Option<TaskType>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub due: Option<String>,
    /// Compact recurrence such as `weekly:1,3,5`, or `none` to clear it.
    pub recur: Option<String>,
}

fn check_text(title: &str, description: Option<&str>) -> std::result::Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE {
        return Err(ValidationError::TooLong { field: "title", max: MAX_TITLE });
    }
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION) {
        return Err(ValidationError::TooLong { field: "description", max: MAX_DESCRIPTION });
    }
    Ok(())
}

fn check_note(title: &str, content: &str) -> std::result::Result<(), ValidationError> {
    check_text(title, None)?;
    if content.chars().count() > MAX_NOTE {
        return Err(ValidationError::TooLong { field: "content", max: MAX_NOTE });
    }
    Ok(())
}

fn parse_recur(raw: &str) -> std::result::Result<Option<RecurrenceRule>, ValidationError> {
    if raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    raw.parse().map(Some)
}

fn parse_day(cfg: &Config, raw: Option<String>) -> std::result::Result<NaiveDate, ValidationError> {
    match raw {
        Some(s) => cfg.calendar.parse_moment(&s),
        None => Ok(cfg.calendar.today()),
    }
}

/// Adds a new task and returns its id.
pub fn cmd_add<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    input: TaskInput,
    silent: bool,
) -> Result<u64> {
    let title = input.title.unwrap_or_default();
    check_text(&title, input.description.as_deref())?;
    let due_date = input.due.map(|d| cfg.calendar.parse_moment(&d)).transpose()?;
    let recurrence = match input.recur {
        Some(r) => parse_recur(&r)?,
        None => None,
    };

    let mut task = Task::new(cfg.owner.clone(), title.trim());
    task.description = input.description;
    task.project = input.project;
    task.category = input.category;
    task.priority = input.priority.unwrap_or_default();
    task.task_type = input.task_type.unwrap_or_default();
    task.due_date = due_date;
    task.recurrence = recurrence;

    let task = store.insert(task)?;
    if !silent { println!("Task added (id = {})", task.id); }
    Ok(task.id)
}

/// Marks a task as done.
///
/// If the task is recurring, the next occurrence is created. The completion is
/// saved first and stays in place even if creating the next occurrence fails.
/// Returns the id of the new occurrence, if any.
pub fn cmd_complete<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    id: u64,
    silent: bool,
) -> Result<Option<u64>> {
    let before: Task = store.get(id)?;
    if before.is_done() {
        if !silent { println!("Task {} is already done.", id); }
        return Ok(None);
    }

    let now = Utc::now();
    let task = store.update(id, |t: &mut Task| {
        t.status = Status::Done;
        t.completed_at = Some(now);
    })?;
    if !silent { println!("Task {} marked as complete.", id); }

    let today = cfg.calendar.date_key(now);
    let Some(event) = RecurringTaskCompletionEvent::from_task(&task, today) else {
        return Ok(None);
    };
    match materialize_next_task(store, &event, now) {
        Ok(Some(next)) => {
            if let Some(due) = next.due_date {
                if !silent { println!("Recurring task created due on {} (id = {})", due, next.id); }
            }
            Ok(Some(next.id))
        }
        Ok(None) => {
            if !silent { println!("Recurrence has ended; no further occurrences."); }
            Ok(None)
        }
        Err(e) => {
            warn!(task = id, error = %e, "next occurrence was not created");
            Err(e)
        }
    }
}

/// Sets a done task back to todo.
pub fn cmd_reopen<S: RowStore>(store: &mut S, id: u64, silent: bool) -> Result<()> {
    store.update(id, |t: &mut Task| {
        t.status = Status::Todo;
        t.completed_at = None;
    })?;
    if !silent { println!("Task {} reopened.", id); }
    Ok(())
}

/// Removes a task together with its subtasks.
pub fn cmd_remove<S: RowStore>(store: &mut S, id: u64, silent: bool) -> Result<()> {
    store.delete::<Task>(id)?;
    let n = subtasks::remove_for_task(store, id)?;
    if !silent { println!("Task {} removed ({} subtask(s)).", id, n); }
    Ok(())
}

/// Copies a task as a new open task titled `<title> (copy)`. Returns the new id.
pub fn cmd_duplicate<S: RowStore>(store: &mut S, id: u64, silent: bool) -> Result<u64> {
    let source: Task = store.get(id)?;
    let mut copy = Task::new(source.owner.clone(), format!("{} (copy)", source.title));
    copy.description = source.description;
    copy.task_type = source.task_type;
    copy.priority = source.priority;
    copy.category = source.category;
    copy.project = source.project;
    copy.due_date = source.due_date;
    copy.recurrence = source.recurrence;
    check_text(&copy.title, copy.description.as_deref())?;

    let copy = store.insert(copy)?;
    if !silent { println!("Task {} duplicated (id = {})", id, copy.id); }
    Ok(copy.id)
}

/// Edits an existing task's details.
pub fn cmd_edit<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    id: u64,
    input: TaskInput,
    silent: bool,
) -> Result<()> {
    let current: Task = store.get(id)?;
    let title = input.title.clone().unwrap_or_else(|| current.title.clone());
    let description = input.description.clone().or_else(|| current.description.clone());
    check_text(&title, description.as_deref())?;
    let due = input.due.map(|d| cfg.calendar.parse_moment(&d)).transpose()?;
    let recur = input.recur.map(|r| parse_recur(&r)).transpose()?;

    store.update(id, |t: &mut Task| {
        t.title = title.trim().to_string();
        t.description = description;
        if let Some(p) = input.project { t.project = Some(p); }
        if let Some(c) = input.category { t.category = Some(c); }
        if let Some(p) = input.priority { t.priority = p; }
        if let Some(k) = input.task_type { t.task_type = k; }
        if let Some(d) = due { t.due_date = Some(d); }
        if let Some(r) = recur { t.recurrence = r; }
    })?;
    if !silent { println!("Task {} updated.", id); }
    Ok(())
}

/// Lists the owner's tasks: open first, then by due date and priority.
pub fn cmd_list<S: RowStore>(store: &S, cfg: &Config, all: bool) -> Result<()> {
    let owner = cfg.owner.as_str();
    let mut tasks =
        store.query(&Query::all().filter(|t: &Task| t.owner == owner && (all || !t.is_done())))?;
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    tasks.sort_by(|a, b| {
        a.is_done()
            .cmp(&b.is_done())
            .then(a.due_date.is_none().cmp(&b.due_date.is_none()))
            .then(a.due_date.cmp(&b.due_date))
            .then(b.priority.cmp(&a.priority))
    });

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Project").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Time Left").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Repeats").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    let today = cfg.calendar.today();

    for t in tasks {
        let done = t.is_done();
        let (time_left, overdue) = match t.due_date {
            Some(due) => {
                let days_left = (due - today).num_days();
                let text = if days_left < 0 {
                    format!("{}d overdue", days_left.abs())
                } else if days_left == 0 {
                    "Today".to_string()
                } else {
                    format!("{}d", days_left)
                };
                (text, days_left < 0)
            }
            None => ("-".to_string(), false),
        };

        let priority_color = match t.priority {
            _ if done => Color::Grey,
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };
        let (status, status_color) =
            if done { ("Done", Color::Green) } else { ("Todo", Color::Yellow) };

        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.project.unwrap_or_default()),
            Cell::new(t.category.unwrap_or_default()),
            Cell::new(t.due_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(time_left).fg(if overdue && !done { Color::Red } else { Color::Reset }),
            Cell::new(format!("{:?}", t.priority)).fg(priority_color),
            Cell::new(t.recurrence.map(|r| r.to_string()).unwrap_or_default()),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn cmd_escalate<S: RowStore>(store: &mut S, cfg: &Config, silent: bool) -> Result<usize> {
    let n = escalate_priorities(store, &cfg.owner, cfg.calendar.today())?;
    if !silent { println!("{} task(s) raised to high priority.", n); }
    Ok(n)
}

pub fn cmd_habit_add<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    title: String,
    silent: bool,
) -> Result<u64> {
    check_text(&title, None)?;
    let habit = habits::create(store, &cfg.owner, title.trim())?;
    if !silent { println!("Habit added (id = {})", habit.id); }
    Ok(habit.id)
}

/// Lists active habits with their streaks and adherence.
pub fn cmd_habit_list<S: RowStore>(store: &S, cfg: &Config) -> Result<()> {
    let owner = cfg.owner.as_str();
    let list = store.query(&Query::all().filter(|h: &Habit| h.owner == owner && h.active))?;
    if list.is_empty() {
        println!("No habits found.");
        return Ok(());
    }
    let today = cfg.calendar.today();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Habit").add_attribute(Attribute::Bold),
        Cell::new("Today").add_attribute(Attribute::Bold),
        Cell::new("Streak").add_attribute(Attribute::Bold),
        Cell::new("Best").add_attribute(Attribute::Bold),
        Cell::new(format!("{}d", cfg.window_days)).add_attribute(Attribute::Bold),
    ]);
    for h in list {
        let logs = habits::logs_for(store, h.id)?;
        let result = streak_result(h.id, &logs, today, cfg.lookback_days, cfg.window_days)?;
        let done_today = logs.iter().any(|e| e.date == today && e.done);
        table.add_row(vec![
            Cell::new(h.id),
            Cell::new(&h.title),
            Cell::new(if done_today { "✓" } else { "·" })
                .fg(if done_today { Color::Green } else { Color::Grey }),
            Cell::new(result.current_streak),
            Cell::new(longest_streak(h.id, &logs)),
            Cell::new(format!("{:.0}%", result.adherence_percent.unwrap_or(0.0))),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Marks or unmarks a habit for a day (today by default).
pub fn cmd_habit_mark<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    id: u64,
    date: Option<String>,
    done: bool,
    silent: bool,
) -> Result<u32> {
    let day = parse_day(cfg, date)?;
    let streak = habits::mark(store, id, day, done)?;
    if !silent {
        let verb = if done { "marked" } else { "unmarked" };
        println!("Habit {} {} for {}. Current streak: {}", id, verb, day, streak);
    }
    Ok(streak)
}

pub fn cmd_habit_toggle<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    id: u64,
    date: Option<String>,
    silent: bool,
) -> Result<bool> {
    let day = parse_day(cfg, date)?;
    let done = habits::toggle(store, id, day)?;
    if !silent {
        let state = if done { "done" } else { "not done" };
        println!("Habit {} is now {} for {}.", id, state, day);
    }
    Ok(done)
}

pub fn cmd_habit_streak<S: RowStore>(
    store: &S,
    cfg: &Config,
    id: u64,
    date: Option<String>,
) -> Result<()> {
    let day = parse_day(cfg, date)?;
    let habit: Habit = store.get(id)?;
    let logs = habits::logs_for(store, id)?;
    let result = streak_result(id, &logs, day, cfg.lookback_days, cfg.window_days)?;
    println!(
        "{}: {} day streak as of {}, {:.1}% over the last {} days (best {})",
        habit.title,
        result.current_streak,
        day,
        result.adherence_percent.unwrap_or(0.0),
        cfg.window_days,
        longest_streak(id, &logs)
    );
    Ok(())
}

pub fn cmd_habit_plan<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    id: u64,
    recur: String,
    silent: bool,
) -> Result<usize> {
    let rule: RecurrenceRule = recur.parse()?;
    let n = habits::plan_week(store, id, &rule, cfg.calendar.today())?;
    if !silent { println!("Planned {} day(s) for habit {}.", n, id); }
    Ok(n)
}

/// Prints task, project and habit statistics for the trailing window.
pub fn cmd_stats<S: RowStore>(store: &S, cfg: &Config, days: Option<u32>) -> Result<()> {
    let window = Window::trailing(cfg.calendar.today(), days.unwrap_or(cfg.window_days))?;
    let summary = stats::task_summary(store, &cfg.owner, window, &cfg.calendar)?;

    println!("Tasks {} .. {}", window.start, window.end);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Total", "Done", "Pending", "Overdue", "Done in window"]);
    table.add_row(vec![
        summary.total.to_string(),
        summary.done.to_string(),
        summary.pending.to_string(),
        summary.overdue.to_string(),
        summary.completed_in_window.to_string(),
    ]);
    println!("{table}");

    let per_day = stats::done_per_day(store, &cfg.owner, window, &cfg.calendar)?;
    if per_day.iter().any(|(_, n)| *n > 0) {
        let line: Vec<String> =
            per_day.iter().map(|(d, n)| format!("{} {}", d.format("%m-%d"), n)).collect();
        println!("Completed per day: {}", line.join(", "));
    }

    let categories = stats::by_category(store, &cfg.owner)?;
    if !categories.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Category", "Total", "Done"]);
        for c in categories {
            table.add_row(vec![c.category, c.total.to_string(), c.done.to_string()]);
        }
        println!("{table}");
    }

    let projects = stats::project_progress(store, &cfg.owner)?;
    if !projects.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Project", "Done", "Progress"]);
        for p in projects {
            let done = format!("{}/{}", p.done, p.total);
            table.add_row(vec![p.project, done, format!("{:.0}%", p.percent)]);
        }
        println!("{table}");
    }

    let adherence = stats::habit_adherence(store, &cfg.owner, window)?;
    if !adherence.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Habit", "Adherence"]);
        for (h, pct) in adherence {
            table.add_row(vec![h.title, format!("{:.1}%", pct)]);
        }
        println!("{table}");
    }
    Ok(())
}

pub fn cmd_notifications<S: RowStore>(store: &S, cfg: &Config) -> Result<()> {
    let list = notify::unread(store, &cfg.owner)?;
    if list.is_empty() {
        println!("No unread notifications.");
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["ID", "When", "Title", "Message"]);
    for n in list {
        table.add_row(vec![
            n.id.to_string(),
            cfg.calendar.date_key(n.created_at).to_string(),
            n.title,
            n.message,
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_notification_read<S: RowStore>(store: &mut S, id: u64, silent: bool) -> Result<()> {
    notify::mark_read(store, id)?;
    if !silent { println!("Notification {} marked as read.", id); }
    Ok(())
}

/// Prints delivered notifications to stdout.
struct PrintSink;

impl NotificationSink for PrintSink {
    fn show(&mut self, n: &Notification) {
        println!("[{:?}] {}: {}", n.kind, n.title, n.message);
    }
}

/// Polls for unread notifications and delivers each one once.
///
/// Runs `rounds` polls (forever when `None`), sleeping `interval` between them.
/// With `silent` the notifications go to the log instead of stdout.
pub fn cmd_watch<S: RowStore>(
    store: &S,
    cfg: &Config,
    interval: Duration,
    rounds: Option<u32>,
    silent: bool,
) -> Result<()> {
    let (source, tx) = ChannelSource::new();
    let mut dispatcher = if silent {
        Dispatcher::new(source, LogSink)
    } else {
        Dispatcher::new(source, PrintSink)
    };
    dispatcher.start()?;

    let mut seen = HashSet::new();
    let mut round = 0;
    let outcome = loop {
        let unread = match notify::unread(store, &cfg.owner) {
            Ok(list) => list,
            Err(e) => break Err(e),
        };
        // oldest first
        for n in unread.into_iter().rev() {
            if seen.insert(n.id) && tx.send(n).is_err() {
                warn!("notification worker is gone");
            }
        }
        round += 1;
        if rounds.is_some_and(|r| round >= r) {
            break Ok(());
        }
        std::thread::sleep(interval);
    };

    dispatcher.stop();
    outcome
}

/// Creates reminders for open tasks due today or tomorrow, for active habits
/// not yet done today, and for project deadlines in the next few days.
/// Returns how many notifications were stored.
pub fn cmd_remind<S: RowStore>(store: &mut S, cfg: &Config, silent: bool) -> Result<usize> {
    let now = Utc::now();
    let today = cfg.calendar.date_key(now);
    let tomorrow = today.succ_opt().unwrap_or(today);
    let owner = cfg.owner.clone();

    let due = store.query(&Query::all().filter(|t: &Task| {
        t.owner == owner && !t.is_done() && t.due_date.is_some_and(|d| d >= today && d <= tomorrow)
    }))?;
    let mut created = 0;
    for task in &due {
        let hours = if task.due_date == Some(today) { 1 } else { 24 };
        notify::task_due(store, task, hours)?;
        created += 1;
    }

    let time = now.with_timezone(&cfg.calendar.offset()).format("%H:%M").to_string();
    let active = store.query(&Query::all().filter(|h: &Habit| h.owner == owner && h.active))?;
    for habit in &active {
        let logs = habits::logs_for(&*store, habit.id)?;
        if !logs.iter().any(|e| e.date == today && e.done) {
            notify::habit_reminder(store, habit, &time)?;
            created += 1;
        }
    }

    created += projects::remind_deadlines(store, &owner, today)?;

    if !silent { println!("{} reminder(s) created.", created); }
    Ok(created)
}

pub fn cmd_subtask_add<S: RowStore>(
    store: &mut S,
    task_id: u64,
    title: String,
    silent: bool,
) -> Result<u64> {
    check_text(&title, None)?;
    let sub = subtasks::add(store, task_id, title.trim())?;
    if !silent { println!("Subtask added to task {} (id = {})", task_id, sub.id); }
    Ok(sub.id)
}

pub fn cmd_subtask_list<S: RowStore>(store: &S, task_id: u64) -> Result<()> {
    let task: Task = store.get(task_id)?;
    let items = subtasks::list(store, task_id)?;
    let done = items.iter().filter(|s| s.done).count();
    println!("{} ({}/{} done)", task.title, done, items.len());
    for s in items {
        println!("  [{}] {} {}", if s.done { "x" } else { " " }, s.id, s.title);
    }
    Ok(())
}

pub fn cmd_subtask_done<S: RowStore>(
    store: &mut S,
    id: u64,
    done: bool,
    silent: bool,
) -> Result<()> {
    subtasks::set_done(store, id, done)?;
    if !silent { println!("Subtask {} marked as {}.", id, if done { "done" } else { "open" }); }
    Ok(())
}

pub fn cmd_subtask_remove<S: RowStore>(store: &mut S, id: u64, silent: bool) -> Result<()> {
    subtasks::remove(store, id)?;
    if !silent { println!("Subtask {} removed.", id); }
    Ok(())
}

pub fn cmd_project_add<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    title: String,
    description: Option<String>,
    deadline: Option<String>,
    silent: bool,
) -> Result<u64> {
    check_text(&title, description.as_deref())?;
    let deadline = deadline.map(|d| cfg.calendar.parse_moment(&d)).transpose()?;
    let project = projects::create(store, &cfg.owner, title.trim(), description, deadline)?;
    if !silent { println!("Project added (id = {})", project.id); }
    Ok(project.id)
}

/// Lists projects with their task progress and deadline.
pub fn cmd_project_list<S: RowStore>(store: &S, cfg: &Config) -> Result<()> {
    let list = projects::list(store, &cfg.owner)?;
    if list.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    let progress = stats::project_progress(store, &cfg.owner)?;
    let today = cfg.calendar.today();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Project").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Deadline").add_attribute(Attribute::Bold),
        Cell::new("Tasks").add_attribute(Attribute::Bold),
    ]);
    for p in list {
        let tasks = progress
            .iter()
            .find(|pp| pp.project == p.title)
            .map(|pp| format!("{}/{} ({:.0}%)", pp.done, pp.total, pp.percent))
            .unwrap_or_else(|| "-".to_string());
        let late = p.status == ProjectStatus::Active && p.deadline.is_some_and(|d| d < today);
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(&p.title),
            Cell::new(format!("{:?}", p.status)),
            Cell::new(p.deadline.map(|d| d.to_string()).unwrap_or_default())
                .fg(if late { Color::Red } else { Color::Reset }),
            Cell::new(tasks),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_project_status<S: RowStore>(
    store: &mut S,
    id: u64,
    status: ProjectStatus,
    silent: bool,
) -> Result<()> {
    projects::set_status(store, id, status)?;
    if !silent { println!("Project {} is now {:?}.", id, status); }
    Ok(())
}

/// Removes a project record. Its tasks keep their project name.
pub fn cmd_project_remove<S: RowStore>(store: &mut S, id: u64, silent: bool) -> Result<()> {
    store.delete::<Project>(id)?;
    if !silent { println!("Project {} removed.", id); }
    Ok(())
}

pub fn cmd_note_add<S: RowStore>(
    store: &mut S,
    cfg: &Config,
    title: String,
    content: String,
    pinned: bool,
    silent: bool,
) -> Result<u64> {
    check_note(&title, &content)?;
    let note = notes::create(store, &cfg.owner, title.trim(), &content, pinned)?;
    if !silent { println!("Note added (id = {})", note.id); }
    Ok(note.id)
}

pub fn cmd_note_list<S: RowStore>(store: &S, cfg: &Config) -> Result<()> {
    let list = notes::list(store, &cfg.owner)?;
    if list.is_empty() {
        println!("No notes found.");
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "", "Title", "Content", "Updated"]);
    for n in list {
        table.add_row(vec![
            n.id.to_string(),
            if n.pinned { "*".to_string() } else { String::new() },
            n.title,
            n.content,
            cfg.calendar.date_key(n.updated_at).to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_note_edit<S: RowStore>(
    store: &mut S,
    id: u64,
    patch: NotePatch,
    silent: bool,
) -> Result<()> {
    let current: Note = store.get(id)?;
    let title = patch.title.as_deref().unwrap_or(&current.title);
    let content = patch.content.as_deref().unwrap_or(&current.content);
    check_note(title, content)?;
    notes::update(store, id, patch)?;
    if !silent { println!("Note {} updated.", id); }
    Ok(())
}

pub fn cmd_note_remove<S: RowStore>(store: &mut S, id: u64, silent: bool) -> Result<()> {
    notes::remove(store, id)?;
    if !silent { println!("Note {} removed.", id); }
    Ok(())
}

//! Notifications: stored rows plus a pluggable delivery pipeline.
//!
//! Delivery goes through an [`EventSource`] with an explicit `start` / `stop`
//! lifecycle, handed to a [`Dispatcher`] by its owner. There is no global
//! instance; tests substitute their own source.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{NotifyError, Result};
use crate::habits::streak_milestone;
use crate::models::{Habit, Notification, NotificationKind, Project, Task};
use crate::store::{Query, RowStore};

/// Callback receiving each delivered notification.
pub type OnEvent = Box<dyn FnMut(Notification) + Send>;

/// A feed of newly created notifications.
pub trait EventSource {
    /// Begins delivering events to `on_event`. Fails if already started.
    fn start(&mut self, on_event: OnEvent) -> std::result::Result<(), NotifyError>;

    /// Stops delivery. Calling it on a stopped source is a no-op.
    fn stop(&mut self);
}

/// Where delivered notifications end up (a desktop popup, a log line, ...).
pub trait NotificationSink: Send {
    fn show(&mut self, notification: &Notification);
}

/// Sink that reports notifications through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&mut self, n: &Notification) {
        info!(id = n.id, kind = ?n.kind, title = %n.title, "{}", n.message);
    }
}

/// Event source fed through an mpsc channel and drained by a worker thread.
pub struct ChannelSource {
    receiver: Option<Receiver<Notification>>,
    running: Option<(Sender<()>, JoinHandle<Receiver<Notification>>)>,
}

impl ChannelSource {
    /// Returns the source and the sender that feeds it.
    pub fn new() -> (Self, Sender<Notification>) {
        let (tx, rx) = mpsc::channel();
        (ChannelSource { receiver: Some(rx), running: None }, tx)
    }
}

impl EventSource for ChannelSource {
    fn start(&mut self, mut on_event: OnEvent) -> std::result::Result<(), NotifyError> {
        let receiver = self.receiver.take().ok_or(NotifyError::AlreadyStarted)?;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("cadence-notify".into())
            .spawn(move || {
                loop {
                    match receiver.recv_timeout(Duration::from_millis(50)) {
                        Ok(n) => on_event(n),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if stop_rx.try_recv().is_ok() {
                        // deliver what is already queued before stopping
                        while let Ok(n) = receiver.try_recv() {
                            on_event(n);
                        }
                        break;
                    }
                }
                receiver
            })
            .map_err(NotifyError::Spawn)?;
        self.running = Some((stop_tx, handle));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.running.take() {
            let _ = stop_tx.send(());
            // the receiver comes back so the source can be restarted
            if let Ok(receiver) = handle.join() {
                self.receiver = Some(receiver);
            }
        }
    }
}

impl Drop for ChannelSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Connects an event source to a sink for the lifetime between `start` and
/// `stop`.
pub struct Dispatcher<S: EventSource> {
    source: S,
    sink: Arc<Mutex<dyn NotificationSink>>,
    started: bool,
}

impl<S: EventSource> Dispatcher<S> {
    pub fn new(source: S, sink: impl NotificationSink + 'static) -> Self {
        Dispatcher { source, sink: Arc::new(Mutex::new(sink)), started: false }
    }

    pub fn start(&mut self) -> std::result::Result<(), NotifyError> {
        if self.started {
            return Err(NotifyError::AlreadyStarted);
        }
        let sink = Arc::clone(&self.sink);
        self.source.start(Box::new(move |n| {
            if let Ok(mut sink) = sink.lock() {
                sink.show(&n);
            }
        }))?;
        self.started = true;
        debug!("notification dispatcher started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.started {
            self.source.stop();
            self.started = false;
            debug!("notification dispatcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.started
    }
}

fn create<St: RowStore>(
    store: &mut St,
    owner: &str,
    kind: NotificationKind,
    title: String,
    message: String,
    metadata: serde_json::Value,
) -> Result<Notification> {
    let n = Notification {
        id: 0,
        owner: owner.to_string(),
        title,
        message,
        kind,
        read: false,
        metadata,
        created_at: Utc::now(),
    };
    Ok(store.insert(n)?)
}

pub fn task_due<St: RowStore>(
    store: &mut St,
    task: &Task,
    hours_before: u32,
) -> Result<Notification> {
    let plural = if hours_before == 1 { "" } else { "s" };
    create(
        store,
        &task.owner,
        NotificationKind::TaskDue,
        format!("Due in {hours_before} hour{plural}"),
        format!("Task \"{}\" must be finished.", task.title),
        json!({ "taskId": task.id }),
    )
}

pub fn habit_reminder<St: RowStore>(
    store: &mut St,
    habit: &Habit,
    time: &str,
) -> Result<Notification> {
    create(
        store,
        &habit.owner,
        NotificationKind::HabitReminder,
        "Habit reminder".to_string(),
        format!("Don't forget \"{}\"", habit.title),
        json!({ "habitId": habit.id, "time": time }),
    )
}

pub fn project_deadline<St: RowStore>(
    store: &mut St,
    project: &Project,
    days_left: i64,
) -> Result<Notification> {
    let message = match days_left {
        0 => format!("Project \"{}\" is due today.", project.title),
        1 => format!("Project \"{}\" is due tomorrow.", project.title),
        n => format!("Project \"{}\" is due in {n} days.", project.title),
    };
    create(
        store,
        &project.owner,
        NotificationKind::ProjectDeadline,
        "Project deadline".to_string(),
        message,
        json!({ "projectId": project.id, "daysLeft": days_left }),
    )
}

/// Stores an achievement for a streak milestone. Non-milestones use a
/// generic message.
pub fn achievement<St: RowStore>(
    store: &mut St,
    habit: &Habit,
    streak: u32,
) -> Result<Notification> {
    let text = streak_milestone(streak).unwrap_or_else(|| format!("{streak} days in a row!"));
    create(
        store,
        &habit.owner,
        NotificationKind::Achievement,
        "Habit achievement!".to_string(),
        format!("{text} Habit: \"{}\"", habit.title),
        json!({ "habitId": habit.id, "streak": streak }),
    )
}

/// Unread notifications of `owner`, newest first.
pub fn unread<St: RowStore>(store: &St, owner: &str) -> Result<Vec<Notification>> {
    Ok(store.query(
        &Query::all()
            .filter(|n: &Notification| n.owner == owner && !n.read)
            .order_by(|a: &Notification, b: &Notification| {
                b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
            }),
    )?)
}

pub fn mark_read<St: RowStore>(store: &mut St, id: u64) -> Result<Notification> {
    Ok(store.update(id, |n: &mut Notification| n.read = true)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Replays a fixed list synchronously on start.
    struct FakeSource {
        events: Vec<Notification>,
        stopped: bool,
    }

    impl EventSource for FakeSource {
        fn start(&mut self, mut on_event: OnEvent) -> std::result::Result<(), NotifyError> {
            for n in self.events.drain(..) {
                on_event(n);
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<String>>>);

    impl NotificationSink for Collect {
        fn show(&mut self, n: &Notification) {
            self.0.lock().unwrap().push(n.title.clone());
        }
    }

    fn sample(title: &str) -> Notification {
        Notification {
            id: 1,
            owner: "me".into(),
            title: title.into(),
            message: String::new(),
            kind: NotificationKind::TaskDue,
            read: false,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dispatcher_forwards_events_to_sink() {
        let seen = Collect::default();
        let source = FakeSource { events: vec![sample("a"), sample("b")], stopped: false };
        let mut d = Dispatcher::new(source, seen.clone());
        d.start().unwrap();
        assert!(matches!(d.start(), Err(NotifyError::AlreadyStarted)));
        d.stop();
        assert!(!d.is_running());
        assert!(d.source.stopped);
        assert_eq!(*seen.0.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn channel_source_delivers_until_stopped() {
        let seen = Collect::default();
        let (source, tx) = ChannelSource::new();
        let mut d = Dispatcher::new(source, seen.clone());
        d.start().unwrap();
        tx.send(sample("first")).unwrap();
        tx.send(sample("second")).unwrap();
        d.stop();
        assert_eq!(*seen.0.lock().unwrap(), vec!["first", "second"]);

        // restartable after stop
        d.start().unwrap();
        tx.send(sample("third")).unwrap();
        d.stop();
        assert_eq!(seen.0.lock().unwrap().len(), 3);
    }

    #[test]
    fn unread_and_mark_read() {
        let mut store = MemoryStore::new();
        let mut task = Task::new("me", "Report");
        task.id = 3;
        let first = task_due(&mut store, &task, 2).unwrap();
        task_due(&mut store, &task, 1).unwrap();
        let mut other = task.clone();
        other.owner = "you".into();
        task_due(&mut store, &other, 1).unwrap();

        let mine = unread(&store, "me").unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[1].title, "Due in 2 hours");
        assert_eq!(mine[0].title, "Due in 1 hour");

        mark_read(&mut store, first.id).unwrap();
        assert_eq!(unread(&store, "me").unwrap().len(), 1);
    }
}

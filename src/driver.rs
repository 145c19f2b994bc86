//! Driver task that owns a session and serializes all mutation onto it.
//!
//! The core state machine in [`session`](crate::session) is synchronous.
//! `SessionDriver::spawn` moves one `RaceSession` into a dedicated task that
//! processes operator commands from an mpsc channel, runs the one-second
//! display tick while the race is Running, and publishes derived
//! [`DisplayState`] on a watch channel after every mutation and every tick.
//! Everything that touches the session happens inside this one task, so no
//! locking discipline is needed anywhere else.
//!
//! The tick is a capability owned by the task ([`Ticker`]): it exists only
//! between the Running transitions, `stop` is idempotent and called on every
//! path out of Running, and a stopped ticker's tick future is pending
//! forever, so a stale tick can never fire into a finished session.
//!
//! The archive write at Running→Finished is fire-and-forget: the driver
//! spawns the `put` and keeps serving commands; a failure is logged and
//! surfaced as a non-blocking warning on the display state.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::RaceArchive;
use crate::error::{RaceError, Result};
use crate::ledger::{SplitOutcome, UndoOutcome};
use crate::session::{RaceSession, SessionState};
use crate::types::{RaceSnapshot, SessionId, SplitRecord, format_hms};

/// Display tick cadence while a race is Running
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Derived, read-only view of one runner for the display surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerStatus {
    /// Runner number, 1-based
    pub runner: u32,

    /// Next stage this runner will record, `None` once finished
    pub next_stage: Option<u32>,

    /// Whether every stage is recorded
    pub finished: bool,

    /// Sum of recorded segment durations so far, in milliseconds
    pub total_ms: u64,
}

impl RunnerStatus {
    fn from_record(record: &SplitRecord) -> Self {
        Self {
            runner: record.runner,
            next_stage: record.first_unset().map(|stage| stage.id),
            finished: record.is_finished(),
            total_ms: record.total_ms(),
        }
    }
}

/// Derived, read-only view of the whole session, published after every
/// mutation and every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    /// Lifecycle state
    pub state: SessionState,

    /// Elapsed race time, formatted `HH:MM:SS`
    pub elapsed: String,

    /// Elapsed race time in milliseconds
    pub elapsed_ms: u64,

    /// Operator-supplied race name
    pub race_name: String,

    /// Per-runner status, ascending runner order
    pub runners: Vec<RunnerStatus>,

    /// Non-blocking notice from a failed archive write, cleared on the next
    /// race start
    pub archive_warning: Option<String>,
}

impl DisplayState {
    fn derive(session: &RaceSession, archive_warning: Option<String>) -> Self {
        let elapsed_ms = session.elapsed_ms();
        Self {
            state: session.state(),
            elapsed: format_hms(elapsed_ms),
            elapsed_ms,
            race_name: session.metadata().race_name.clone(),
            runners: session.ledger().records().iter().map(RunnerStatus::from_record).collect(),
            archive_warning,
        }
    }
}

/// Operator commands accepted by the driver task
enum Command {
    Start(oneshot::Sender<Result<SessionId>>),
    Finish(oneshot::Sender<Result<()>>),
    RecordSplit(u32, oneshot::Sender<Result<SplitOutcome>>),
    UndoLastSplit(u32, oneshot::Sender<Result<UndoOutcome>>),
    SetRunners(u32, oneshot::Sender<Result<()>>),
    SetStages(u32, oneshot::Sender<Result<()>>),
    Snapshot(oneshot::Sender<RaceSnapshot>),
}

/// The one-second display tick, owned by the driver task.
///
/// `start` and `stop` are both idempotent. While stopped, [`tick`](Self::tick)
/// never resolves, which makes it safe to keep in the driver's select loop
/// in every state.
struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    fn stopped() -> Self {
        Self { interval: None }
    }

    fn start(&mut self) {
        if self.interval.is_none() {
            let mut interval = interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(interval);
        }
    }

    fn stop(&mut self) {
        self.interval = None;
    }

    async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Outcome of a fire-and-forget archive write, reported back to the driver
enum PersistReport {
    Stored(SessionId),
    Failed(String),
}

/// Spawns and manages the session task
pub struct SessionDriver;

impl SessionDriver {
    /// Move `session` into its own task, persisting finished races to
    /// `archive`. Returns the handle operators drive the session through.
    pub fn spawn(session: RaceSession, archive: Arc<dyn RaceArchive>) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (display_tx, display_rx) = watch::channel(DisplayState::derive(&session, None));
        let cancel = CancellationToken::new();

        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            Self::session_task(session, archive, command_rx, display_tx, cancel_task).await;
        });

        SessionHandle { commands: command_tx, display: display_rx, cancel }
    }

    async fn session_task(
        mut session: RaceSession,
        archive: Arc<dyn RaceArchive>,
        mut commands: mpsc::Receiver<Command>,
        display: watch::Sender<DisplayState>,
        cancel: CancellationToken,
    ) {
        info!("session task started");
        let mut ticker = Ticker::stopped();
        if session.state() == SessionState::Running {
            ticker.start();
        }
        let mut archive_warning: Option<String> = None;
        let (persist_tx, mut persist_rx) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("session task cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    session.advance_clock();
                    let _ = display.send(DisplayState::derive(&session, archive_warning.clone()));
                }
                report = persist_rx.recv() => {
                    match report {
                        Some(PersistReport::Stored(id)) => {
                            debug!(%id, "finished race archived");
                        }
                        Some(PersistReport::Failed(message)) => {
                            archive_warning = Some(message);
                        }
                        // Unreachable while the task holds persist_tx.
                        None => {}
                    }
                    let _ = display.send(DisplayState::derive(&session, archive_warning.clone()));
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("command channel closed, shutting down");
                        break;
                    };
                    Self::handle_command(
                        command,
                        &mut session,
                        &mut ticker,
                        &archive,
                        &persist_tx,
                        &mut archive_warning,
                    );
                    let _ = display.send(DisplayState::derive(&session, archive_warning.clone()));
                }
            }
        }

        ticker.stop();
        info!("session task ended");
    }

    fn handle_command(
        command: Command,
        session: &mut RaceSession,
        ticker: &mut Ticker,
        archive: &Arc<dyn RaceArchive>,
        persist_tx: &mpsc::UnboundedSender<PersistReport>,
        archive_warning: &mut Option<String>,
    ) {
        match command {
            Command::Start(reply) => {
                let result = session.start();
                if result.is_ok() {
                    *archive_warning = None;
                    ticker.start();
                }
                let _ = reply.send(result);
            }
            Command::Finish(reply) => {
                let result = session.finish().map(|snapshot| {
                    ticker.stop();
                    Self::persist(snapshot, archive, persist_tx);
                });
                let _ = reply.send(result);
            }
            Command::RecordSplit(runner, reply) => {
                let result = session.record_split(runner);
                // Auto-finish: the split may have ended the race.
                if result.is_ok() && session.state() == SessionState::Finished {
                    ticker.stop();
                    Self::persist(session.snapshot(), archive, persist_tx);
                }
                let _ = reply.send(result);
            }
            Command::UndoLastSplit(runner, reply) => {
                let _ = reply.send(session.undo_last_split(runner));
            }
            Command::SetRunners(runners, reply) => {
                let result = session.set_runners(runners);
                if result.is_ok() {
                    ticker.stop();
                }
                let _ = reply.send(result);
            }
            Command::SetStages(stages, reply) => {
                let result = session.set_stages(stages);
                if result.is_ok() {
                    ticker.stop();
                }
                let _ = reply.send(result);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(session.snapshot());
            }
        }
    }

    /// Fire-and-forget archive write. The driver never awaits or retries;
    /// the outcome flows back through `persist_tx` for display only.
    fn persist(
        snapshot: RaceSnapshot,
        archive: &Arc<dyn RaceArchive>,
        persist_tx: &mpsc::UnboundedSender<PersistReport>,
    ) {
        let archive = Arc::clone(archive);
        let persist_tx = persist_tx.clone();
        tokio::spawn(async move {
            let id = snapshot.id.clone();
            match archive.put(&snapshot).await {
                Ok(()) => {
                    let _ = persist_tx.send(PersistReport::Stored(id));
                }
                Err(err) => {
                    warn!(%id, error = %err, "failed to archive finished race");
                    let _ = persist_tx
                        .send(PersistReport::Failed(format!("race {id} was not archived: {err}")));
                }
            }
        });
    }
}

/// Handle to a spawned session task.
///
/// Commands are serialized onto the owning task; replies come back per
/// command. Dropping the handle cancels the task.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    display: watch::Receiver<DisplayState>,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Start the race
    pub async fn start(&self) -> Result<SessionId> {
        self.command(Command::Start).await?
    }

    /// Manually finish the race
    pub async fn finish(&self) -> Result<()> {
        self.command(Command::Finish).await?
    }

    /// Record a split for `runner` at the current instant
    pub async fn record_split(&self, runner: u32) -> Result<SplitOutcome> {
        self.command(|reply| Command::RecordSplit(runner, reply)).await?
    }

    /// Clear the last recorded stage for `runner`
    pub async fn undo_last_split(&self, runner: u32) -> Result<UndoOutcome> {
        self.command(|reply| Command::UndoLastSplit(runner, reply)).await?
    }

    /// Replace the runner count (Configuring or Finished only)
    pub async fn set_runners(&self, runners: u32) -> Result<()> {
        self.command(|reply| Command::SetRunners(runners, reply)).await?
    }

    /// Replace the stage count (Configuring or Finished only)
    pub async fn set_stages(&self, stages: u32) -> Result<()> {
        self.command(|reply| Command::SetStages(stages, reply)).await?
    }

    /// Current full session snapshot
    pub async fn snapshot(&self) -> Result<RaceSnapshot> {
        self.command(Command::Snapshot).await
    }

    /// Latest published display state
    pub fn display(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    /// Display updates as a stream, starting from the current state
    pub fn display_updates(&self) -> impl Stream<Item = DisplayState> + 'static {
        WatchStream::new(self.display.clone())
    }

    /// Wait for the next published display state
    pub async fn display_changed(&mut self) -> Result<DisplayState> {
        self.display.changed().await.map_err(|_| RaceError::Closed)?;
        Ok(self.display.borrow().clone())
    }

    /// Stop the session task
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn command<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands.send(build(reply_tx)).await.map_err(|_| RaceError::Closed)?;
        reply_rx.await.map_err(|_| RaceError::Closed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        debug!("dropping session handle");
        self.cancel.cancel();
    }
}

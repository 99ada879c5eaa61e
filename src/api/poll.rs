//! Background polling and command delivery (feature-gated)

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use tokio::sync::{mpsc as tmpsc, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::client::HttpSource;
use super::source::{FetchError, PipelineSource};
use super::{Command, MoveSequencer, Wake, coalesce};
use crate::graph_utils::pipeline::Snapshot;
use crate::gui::drag::MoveRequest;
use crate::persistence::settings::AppSettings;

// How long in-flight requests may run after the canvas goes away.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// UI-side end of the poll loop. Dropping it stops polling.
pub struct PollHandle {
    snapshots: Receiver<Snapshot>,
    commands: Option<tmpsc::UnboundedSender<Command>>,
    shutdown: Option<watch::Sender<bool>>,
    next_seq: u64,
}

pub fn spawn(cfg: &AppSettings, wake: Wake) -> anyhow::Result<PollHandle> {
    let source = HttpSource::new(cfg)?;
    spawn_with(source, cfg.poll_interval(), wake)
}

/// Run the poll loop and command worker for `source` on their own thread.
pub fn spawn_with<S: PipelineSource>(source: S, interval: Duration, wake: Wake) -> anyhow::Result<PollHandle> {
    let (snap_tx, snap_rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = tmpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);

    std::thread::Builder::new().name("pipeline-poll".into()).spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build() {
                Ok(r) => r,
                Err(e) => {
                    log::error!("failed to create tokio runtime for polling: {}", e);
                    return;
                }
            };
        rt.block_on(async move {
            let source = Arc::new(source);
            let worker = tokio::spawn(run_command_worker(source.clone(), cmd_rx));
            run_poll_loop(source, interval, snap_tx, wake, stop_rx).await;
            if tokio::time::timeout(FLUSH_TIMEOUT, worker).await.is_err() {
                log::warn!("gave up waiting for pending pipeline requests");
            }
        });
        log::info!("pipeline polling stopped");
    })?;

    Ok(PollHandle {
        snapshots: snap_rx,
        commands: Some(cmd_tx),
        shutdown: Some(stop_tx),
        next_seq: 0,
    })
}

impl PollHandle {
    /// Snapshots received since the last call, oldest first.
    pub fn drain(&self) -> Vec<Snapshot> { self.snapshots.try_iter().collect() }

    fn send(&self, cmd: Command) {
        let Some(tx) = &self.commands else {
            log::debug!("polling stopped; dropping {:?}", cmd);
            return;
        };
        if let Err(e) = tx.send(cmd) {
            log::debug!("poll worker gone; dropping {:?}", e.0);
        }
    }

    pub fn persist_move(&mut self, req: MoveRequest) {
        self.next_seq += 1;
        self.send(Command::MovePipe { pipe: req.pipe, x: req.x, y: req.y, seq: self.next_seq });
    }

    pub fn rename(&self, name: String) { self.send(Command::Rename(name)); }

    pub fn set_running(&self, running: bool) { self.send(Command::SetRunning(running)); }

    /// Stop polling. Commands already queued are still delivered.
    pub fn shutdown(&mut self) {
        if let Some(stop) = self.shutdown.take() {
            let _ = stop.send(true);
        }
        self.commands = None;
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) { self.shutdown(); }
}

/// Fetch every `interval` until told to stop or the UI hangs up. Failures
/// are logged and the loop carries on.
pub async fn run_poll_loop<S: PipelineSource>(
    source: Arc<S>,
    interval: Duration,
    snapshots: Sender<Snapshot>,
    wake: Wake,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        let fetched = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            r = source.fetch() => r,
        };
        match fetched {
            Ok(snapshot) => {
                if snapshots.send(snapshot).is_err() {
                    break;
                }
                wake();
            }
            Err(FetchError::Malformed(e)) => log::warn!("skipping malformed snapshot: {}", e),
            Err(e) => log::warn!("{}", e),
        }
    }
}

/// Deliver commands until every sender is gone, then wait for the requests
/// still in flight.
pub async fn run_command_worker<S: PipelineSource>(source: Arc<S>, mut commands: tmpsc::UnboundedReceiver<Command>) {
    let sequencer = Arc::new(MoveSequencer::default());
    let mut in_flight = JoinSet::new();
    while let Some(first) = commands.recv().await {
        let mut batch = vec![first];
        while let Ok(more) = commands.try_recv() {
            batch.push(more);
        }
        for cmd in coalesce(batch) {
            if let Command::MovePipe { pipe, seq, .. } = &cmd
                && !sequencer.observe(pipe, *seq)
            {
                log::debug!("dropping stale move #{} for '{}'", seq, pipe);
                continue;
            }
            in_flight.spawn(deliver(source.clone(), sequencer.clone(), cmd));
        }
        // Reap finished requests so the set does not grow unbounded.
        while in_flight.try_join_next().is_some() {}
    }
    while in_flight.join_next().await.is_some() {}
}

async fn deliver<S: PipelineSource>(source: Arc<S>, sequencer: Arc<MoveSequencer>, cmd: Command) {
    let result = match &cmd {
        Command::MovePipe { pipe, x, y, seq } => {
            if !sequencer.is_current(pipe, *seq) {
                log::debug!("move #{} for '{}' superseded before sending", seq, pipe);
                return;
            }
            source.move_pipe(pipe, *x, *y).await
        }
        Command::Rename(name) => source.rename(name).await,
        Command::SetRunning(running) => source.set_running(*running).await,
    };
    if let Err(e) = result {
        log::warn!("{:?} failed: {:#}", cmd, e);
    }
}

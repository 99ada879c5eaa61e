use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::graph_utils::pipeline::PipeId;

pub mod source;

/// Called from background threads when the UI has something new to show.
pub type Wake = Arc<dyn Fn() + Send + Sync>;

/// Fire-and-forget requests from the canvas to the pipeline server.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // `seq` grows with every move the canvas issues.
    MovePipe { pipe: PipeId, x: f32, y: f32, seq: u64 },
    Rename(String),
    SetRunning(bool),
}

/// Collapse a batch of queued commands so that only the newest move per
/// pipe survives. Everything else keeps its order.
pub fn coalesce(batch: Vec<Command>) -> Vec<Command> {
    let mut newest: HashMap<PipeId, u64> = HashMap::new();
    for cmd in &batch {
        if let Command::MovePipe { pipe, seq, .. } = cmd {
            let e = newest.entry(pipe.clone()).or_insert(*seq);
            *e = (*e).max(*seq);
        }
    }
    batch
        .into_iter()
        .filter(|cmd| match cmd {
            Command::MovePipe { pipe, seq, .. } => newest.get(pipe) == Some(seq),
            _ => true,
        })
        .collect()
}

/// Latest move sequence seen per pipe. Shared between the worker and its
/// in-flight requests so a request can tell it has been superseded.
#[derive(Debug, Default)]
pub struct MoveSequencer {
    latest: Mutex<HashMap<PipeId, u64>>,
}

impl MoveSequencer {
    /// Record `seq` for `pipe`; false if something newer is already known.
    pub fn observe(&self, pipe: &str, seq: u64) -> bool {
        let Ok(mut latest) = self.latest.lock() else { return true };
        match latest.get(pipe) {
            Some(&known) if known > seq => false,
            _ => {
                latest.insert(pipe.to_string(), seq);
                true
            }
        }
    }

    pub fn is_current(&self, pipe: &str, seq: u64) -> bool {
        self.latest
            .lock()
            .map(|latest| latest.get(pipe).is_none_or(|&known| known <= seq))
            .unwrap_or(true)
    }
}

// Networking is feature-gated. Builds without it get an idle poll handle.
#[cfg(feature = "remote")]
pub mod client;
#[cfg(feature = "remote")]
pub mod poll;

#[cfg(not(feature = "remote"))]
pub mod poll {
    use super::Wake;
    use crate::graph_utils::pipeline::Snapshot;
    use crate::gui::drag::MoveRequest;
    use crate::persistence::settings::AppSettings;

    pub struct PollHandle;

    pub fn spawn(_cfg: &AppSettings, _wake: Wake) -> anyhow::Result<PollHandle> {
        log::info!("built without the `remote` feature; the canvas will stay empty");
        Ok(PollHandle)
    }

    impl PollHandle {
        pub fn drain(&self) -> Vec<Snapshot> { Vec::new() }
        pub fn persist_move(&mut self, _req: MoveRequest) {}
        pub fn rename(&self, _name: String) {}
        pub fn set_running(&self, _running: bool) {}
        pub fn shutdown(&mut self) {}
    }
}

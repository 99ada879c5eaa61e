use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::graph_utils::pipeline::{Snapshot, SnapshotError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("pipeline server unreachable: {0}")]
    Remote(#[from] anyhow::Error),
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] SnapshotError),
}

/// The pipeline server as seen by the canvas: one pipeline, polled for its
/// state and told about layout and control changes.
pub trait PipelineSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;

    fn move_pipe(&self, pipe: &str, x: f32, y: f32) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn rename(&self, name: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn set_running(&self, running: bool) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Body of `POST /pipelines/{id}/update`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UpdateBody<'a> {
    MovePipe { name: &'a str, x: f32, y: f32 },
    ChangeName { name: &'a str },
}

/// The server answers control calls with `{status, error?}`; turn a
/// `failed` status into an error.
pub fn check_status(body: &Value) -> anyhow::Result<()> {
    match body.get("status").and_then(Value::as_str) {
        Some("failed") => {
            let reason = body.get("error").and_then(Value::as_str).unwrap_or("unknown");
            anyhow::bail!("server refused: {}", reason)
        }
        _ => Ok(()),
    }
}

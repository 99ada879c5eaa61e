//! HTTP implementation of the pipeline source (feature-gated)

use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::source::{FetchError, PipelineSource, UpdateBody, check_status};
use crate::graph_utils::pipeline::Snapshot;
use crate::persistence::settings::AppSettings;

pub struct HttpSource {
    client: Client,
    pipeline: Url,
    update: Url,
    start: Url,
    stop: Url,
}

impl HttpSource {
    pub fn new(cfg: &AppSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            pipeline: cfg.pipeline_url(None)?,
            update: cfg.pipeline_url(Some("update"))?,
            start: cfg.pipeline_url(Some("start"))?,
            stop: cfg.pipeline_url(Some("stop"))?,
        })
    }

    async fn post_update(&self, body: &UpdateBody<'_>) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.update.clone())
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let reply: Value = resp.json().await?;
        check_status(&reply)
    }
}

impl PipelineSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let resp = self
            .client
            .get(self.pipeline.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("GET {}", self.pipeline))?;
        let body: Value = resp.json().await.context("reading snapshot body")?;
        check_status(&body)?;
        Ok(Snapshot::from_json(&body)?)
    }

    async fn move_pipe(&self, pipe: &str, x: f32, y: f32) -> anyhow::Result<()> {
        self.post_update(&UpdateBody::MovePipe { name: pipe, x, y }).await
    }

    async fn rename(&self, name: &str) -> anyhow::Result<()> {
        self.post_update(&UpdateBody::ChangeName { name }).await
    }

    async fn set_running(&self, running: bool) -> anyhow::Result<()> {
        let url = if running { &self.start } else { &self.stop };
        let resp = self.client.get(url.clone()).send().await?.error_for_status()?;
        let reply: Value = resp.json().await?;
        check_status(&reply)
    }
}

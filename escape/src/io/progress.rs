//! Progress store abstraction.
//!
//! The [`ProgressStore`] trait decouples level orchestration from the HTTP
//! backend. Tests use an in-memory store (see `test_support`) that can be
//! scripted to fail.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::core::types::{Level, TaskSignal, TaskState, Verdict};
use crate::wire::{
    PlayerInitResponse, ProgressResponse, TaskUpdate, ValidateRequest, ValidateResponse,
};

/// Task state of one player and level as reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub tasks: TaskState,
    pub done: bool,
    /// Last manifest accepted by server-side validation.
    pub manifest: Option<String>,
}

impl From<ProgressResponse> for Progress {
    fn from(response: ProgressResponse) -> Self {
        Self {
            tasks: response.tasks,
            done: response.done,
            manifest: response.manifest,
        }
    }
}

/// Remote source of truth for task completion.
///
/// Updates must be idempotent and commutative: the store merges flags with
/// OR semantics, so requests may land in any order.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Register a player id. Repeated calls are harmless.
    async fn register(&self, player_id: &str) -> Result<()>;

    async fn fetch(&self, player_id: &str, level: Level) -> Result<Progress>;

    async fn update(&self, player_id: &str, level: Level, signal: &TaskSignal) -> Result<Progress>;

    /// Grade a manifest server-side. A passing verdict is persisted by the store.
    async fn validate(&self, player_id: &str, manifest: &str) -> Result<Verdict>;
}

/// [`ProgressStore`] backed by the escape-server HTTP API.
#[derive(Debug, Clone)]
pub struct HttpProgressStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProgressStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ProgressStore for HttpProgressStore {
    #[instrument(skip(self))]
    async fn register(&self, player_id: &str) -> Result<()> {
        let url = self.endpoint("/api/player/init");
        let response: PlayerInitResponse = self
            .client
            .get(&url)
            .query(&[("playerId", player_id)])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json()
            .await
            .context("decode player init response")?;
        if !response.ok {
            return Err(anyhow!("progress store rejected player id"));
        }
        debug!("player registered");
        Ok(())
    }

    #[instrument(skip(self), fields(level = level.number()))]
    async fn fetch(&self, player_id: &str, level: Level) -> Result<Progress> {
        let url = self.endpoint("/api/progress");
        let level_number = level.number().to_string();
        let response: ProgressResponse = self
            .client
            .get(&url)
            .query(&[("playerId", player_id), ("level", level_number.as_str())])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json()
            .await
            .context("decode progress response")?;
        debug!(done = response.done, "progress fetched");
        Ok(response.into())
    }

    #[instrument(skip(self, signal), fields(level = level.number(), task = %signal.task))]
    async fn update(&self, player_id: &str, level: Level, signal: &TaskSignal) -> Result<Progress> {
        let url = self.endpoint("/api/progress/update");
        let body = TaskUpdate {
            player_id: player_id.to_string(),
            level: level.number(),
            task: signal.task.clone(),
            completed: signal.completed,
        };
        let response: ProgressResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url}"))?
            .json()
            .await
            .context("decode progress response")?;
        debug!(done = response.done, "task update acknowledged");
        Ok(response.into())
    }

    #[instrument(skip(self, manifest), fields(bytes = manifest.len()))]
    async fn validate(&self, player_id: &str, manifest: &str) -> Result<Verdict> {
        let url = self.endpoint("/api/level/2/validate");
        let body = ValidateRequest {
            player_id: player_id.to_string(),
            manifest: manifest.to_string(),
        };
        let response: ValidateResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url}"))?
            .json()
            .await
            .context("decode validate response")?;
        debug!(ok = response.ok, "manifest validated remotely");
        Ok(response.into())
    }
}

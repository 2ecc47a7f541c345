//! Shared request state and the fetch, rewrite and cache pipeline.

use std::sync::Arc;

use lazarus_client::{ArchiveConfig, ArchiveSource, FetchOrchestrator, RenderSource, RewriteConfig, Rewriter, SiteProfile};
use lazarus_core::fetch::STATUS_ADAPTER_FAILURE;
use lazarus_core::{AppConfig, ContentStore, DiskStore, FetchOutcome, RequestPath};

use crate::error::StartupError;
use crate::inflight::InFlight;

/// What a cold request for a path produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Rewritten markup, already handed to the cache.
    Page(Arc<str>),
    /// The final source answered 200 with no content.
    Empty,
    /// Every source failed; the last upstream status.
    Failed(u16),
}

/// State shared by every request handler.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ContentStore>,
    pub orchestrator: FetchOrchestrator,
    pub rewriter: Rewriter,
    inflight: InFlight<MirrorOutcome>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>, store: Arc<dyn ContentStore>, orchestrator: FetchOrchestrator, rewriter: Rewriter,
    ) -> Self {
        Self { config, store, orchestrator, rewriter, inflight: InFlight::new() }
    }

    /// Build the production state: disk cache, render source chosen at
    /// startup, archive fallback.
    pub async fn build(config: AppConfig) -> Result<Self, StartupError> {
        let store = DiskStore::open(&config.cache_dir).await?;
        let rewriter = Rewriter::new(&SiteProfile::from(&config))?;
        let archive = ArchiveSource::new(ArchiveConfig::from(&config))?;

        let render = if config.remote_fetch_enabled() {
            RenderSource::from_config(&config).await
        } else {
            RenderSource::unavailable(&config)
        };

        match store.len().await {
            Ok(entries) => tracing::info!(
                entries,
                render = render.is_available(),
                "cache at {} ready",
                store.dir().display()
            ),
            Err(e) => tracing::warn!("cannot count cache entries: {e}"),
        }
        let orchestrator = FetchOrchestrator::new(Arc::new(render), Arc::new(archive));

        Ok(Self::new(Arc::new(config), Arc::new(store), orchestrator, rewriter))
    }

    /// Fetch, rewrite and cache `path`, joining a run already in progress
    /// for the same path when deduplication is on.
    ///
    /// The work runs on its own task so it completes and fills the cache even
    /// if every waiting client goes away.
    pub async fn mirror(self: &Arc<Self>, path: &RequestPath) -> MirrorOutcome {
        let work = || {
            let state = Arc::clone(self);
            let path = path.clone();
            async move { state.fetch_and_store(&path).await }
        };

        let outcome = if self.config.dedupe_fetches {
            self.inflight.run(path.as_str(), work).await
        } else {
            match tokio::spawn(work()).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(%path, "mirror task failed: {e}");
                    None
                }
            }
        };
        outcome.unwrap_or(MirrorOutcome::Failed(STATUS_ADAPTER_FAILURE))
    }

    async fn fetch_and_store(&self, path: &RequestPath) -> MirrorOutcome {
        let result = self.orchestrator.resolve(path).await;

        let markup = match (result.outcome(), result.content) {
            (FetchOutcome::Success, Some(markup)) => markup,
            (FetchOutcome::Failed(status), _) => return MirrorOutcome::Failed(status),
            _ => return MirrorOutcome::Empty,
        };

        let rewritten = self
            .rewriter
            .rewrite(&markup, &RewriteConfig::for_path(path, self.config.domain.as_str()));

        if let Err(e) = self.store.put(path, &rewritten).await {
            tracing::warn!("failed to cache {path}: {e}");
        }
        MirrorOutcome::Page(Arc::from(rewritten))
    }
}

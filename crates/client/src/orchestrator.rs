//! Fallback chain over the upstream sources.

use std::sync::Arc;

use async_trait::async_trait;
use lazarus_core::{FetchResult, RequestPath};

/// An upstream that can be asked for a path.
///
/// Implementations never fail: every problem is folded into the returned
/// [`FetchResult`] status.
#[async_trait]
pub trait Source: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn fetch(&self, path: &RequestPath) -> FetchResult;
}

/// Tries the primary source and falls back to the secondary one.
#[derive(Clone)]
pub struct FetchOrchestrator {
    primary: Arc<dyn Source>,
    fallback: Arc<dyn Source>,
}

impl FetchOrchestrator {
    pub fn new(primary: Arc<dyn Source>, fallback: Arc<dyn Source>) -> Self {
        Self { primary, fallback }
    }

    /// Resolve a path.
    ///
    /// A successful primary result wins immediately. Anything else, including
    /// an empty primary result, falls through to the fallback, whose result
    /// is returned as is.
    pub async fn resolve(&self, path: &RequestPath) -> FetchResult {
        let first = self.primary.fetch(path).await;
        if first.is_success() {
            tracing::info!(%path, source = self.primary.name(), "resolved");
            return first;
        }

        tracing::debug!(
            %path,
            source = self.primary.name(),
            status = first.status,
            "falling back to {}",
            self.fallback.name()
        );
        let second = self.fallback.fetch(path).await;
        if second.is_success() {
            tracing::info!(%path, source = self.fallback.name(), "resolved");
        } else {
            tracing::info!(%path, source = self.fallback.name(), status = second.status, "unresolved");
        }
        second
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: FetchResult,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, result: FetchResult) -> Arc<Self> {
            Arc::new(Self { name, result, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Source for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _path: &RequestPath) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn path() -> RequestPath {
        RequestPath::parse("/blog").unwrap()
    }

    #[tokio::test]
    async fn test_primary_success_wins() {
        let render = Fixed::new("render", FetchResult::success("<html>rendered</html>"));
        let archive = Fixed::new("archive", FetchResult::success("<html>archived</html>"));
        let orch = FetchOrchestrator::new(render.clone(), archive.clone());

        assert_eq!(orch.resolve(&path()).await, FetchResult::success("<html>rendered</html>"));
        assert_eq!(render.calls(), 1);
        assert_eq!(archive.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let render = Fixed::new("render", FetchResult::failure(500));
        let archive = Fixed::new("archive", FetchResult::success("<html>archived</html>"));
        let orch = FetchOrchestrator::new(render, archive.clone());

        assert_eq!(orch.resolve(&path()).await, FetchResult::success("<html>archived</html>"));
        assert_eq!(archive.calls(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_empty_primary() {
        let render = Fixed::new("render", FetchResult::empty());
        let archive = Fixed::new("archive", FetchResult::failure(404));
        let orch = FetchOrchestrator::new(render, archive);

        assert_eq!(orch.resolve(&path()).await, FetchResult::failure(404));
    }

    #[tokio::test]
    async fn test_fallback_result_returned_unchanged() {
        for fallback in [FetchResult::failure(503), FetchResult::empty(), FetchResult::failure(500)] {
            let render = Fixed::new("render", FetchResult::failure(404));
            let archive = Fixed::new("archive", fallback.clone());
            let orch = FetchOrchestrator::new(render, archive);
            assert_eq!(orch.resolve(&path()).await, fallback);
        }
    }
}

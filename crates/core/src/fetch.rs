//! Outcome of asking an upstream source for a path.

/// Status used when an adapter fails before getting an upstream answer.
pub const STATUS_ADAPTER_FAILURE: u16 = 500;

/// Status used when an upstream answers with something that is not a page.
pub const STATUS_NOT_A_PAGE: u16 = 404;

/// Result of a fetch from one upstream source.
///
/// `status == 200` with content is the only success. `status == 200` without
/// content is the distinguished "empty" outcome. Any other status is a hard
/// failure and keeps the upstream code for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub content: Option<String>,
    pub status: u16,
}

/// How the router should treat a [`FetchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Empty,
    Failed(u16),
}

impl FetchResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), status: 200 }
    }

    pub fn empty() -> Self {
        Self { content: None, status: 200 }
    }

    pub fn failure(status: u16) -> Self {
        Self { content: None, status }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == FetchOutcome::Success
    }

    pub fn outcome(&self) -> FetchOutcome {
        match (self.status, &self.content) {
            (200, Some(_)) => FetchOutcome::Success,
            (200, None) => FetchOutcome::Empty,
            (status, _) => FetchOutcome::Failed(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        let result = FetchResult::success("<html></html>");
        assert!(result.is_success());
        assert_eq!(result.outcome(), FetchOutcome::Success);
    }

    #[test]
    fn test_outcome_empty_is_not_success() {
        let result = FetchResult::empty();
        assert!(!result.is_success());
        assert_eq!(result.outcome(), FetchOutcome::Empty);
    }

    #[test]
    fn test_outcome_failure_keeps_status() {
        assert_eq!(FetchResult::failure(503).outcome(), FetchOutcome::Failed(503));
        assert_eq!(FetchResult::failure(STATUS_NOT_A_PAGE).outcome(), FetchOutcome::Failed(404));
    }

    #[test]
    fn test_outcome_non_200_with_content_is_failure() {
        let result = FetchResult { content: Some("gone".into()), status: 410 };
        assert_eq!(result.outcome(), FetchOutcome::Failed(410));
    }
}

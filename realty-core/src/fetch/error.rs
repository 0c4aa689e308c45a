use thiserror::Error;

/// Structured fetch errors.
///
/// A fetch never panics past the fetcher boundary; each failure is one of
/// these, returned to the caller (or collected by `fetch_all`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("unsupported strategy '{strategy}' for '{index}'")]
    UnsupportedStrategy { index: String, strategy: String },

    #[error("'{index}' is missing strategy parameter '{param}'")]
    MissingParameter { index: String, param: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("rate limited by source (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("response parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Configuration errors that no retry can fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownSource(_) | Self::UnsupportedStrategy { .. } | Self::MissingParameter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_not_transient() {
        assert!(FetchError::UnknownSource("rent".into()).is_configuration());
        assert!(FetchError::MissingParameter {
            index: "rent".into(),
            param: "selector".into(),
        }
        .is_configuration());
        assert!(!FetchError::Transport("timed out".into()).is_configuration());
        assert!(!FetchError::RateLimited { retry_after_secs: Some(30) }.is_configuration());
        assert!(!FetchError::Parse("bad value".into()).is_configuration());
    }
}

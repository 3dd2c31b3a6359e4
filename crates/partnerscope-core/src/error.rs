use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while interpreting user-supplied selectors.
///
/// Record-level data quality problems never surface here: normalization and
/// aggregation always substitute an empty sentinel instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown window kind '{0}' (expected day, week, month, quarter or semester)")]
    UnknownWindowKind(String),
    #[error("unknown dimension '{0}' (expected agent, state, region, city or contract-type)")]
    UnknownDimension(String),
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    #[error("unknown granularity '{0}' (expected day, week or month)")]
    UnknownGranularity(String),
    #[error("invalid date '{0}' (expected YYYY-MM-DD or DD/MM/YYYY)")]
    InvalidDate(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failures reported by the ingest, query and summary services.
///
/// Malformed `after`/`before` filters and non-numeric values are deliberately
/// absent: both are tolerated rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorDataError {
    /// Unknown calendar period (`daily|weekly|monthly`) or trailing window
    /// (`day|week|month|year|all`) token.
    InvalidPeriod(String),
    /// A required request field was absent or blank.
    MissingRequiredField(&'static str),
    /// Sensor code does not match `[A-Za-z0-9_-]{1,50}` on the write path.
    InvalidSensorCode(String),
    /// The backing store failed; the message carries the operation context.
    Store(String),
}

impl Display for SensorDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SensorDataError::InvalidPeriod(p) => write!(f, "invalid period: {}", p),
            SensorDataError::MissingRequiredField(field) => write!(f, "missing required field: {}", field),
            SensorDataError::InvalidSensorCode(code) => write!(
                f,
                "invalid sensor code {:?}: only letters, numbers, underscores, and hyphens (max 50)",
                code
            ),
            SensorDataError::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl Error for SensorDataError {}

impl From<diesel::r2d2::PoolError> for SensorDataError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        SensorDataError::Store(format!("connection checkout failed: {}", e))
    }
}

impl SensorDataError {
    /// Whether the caller, rather than the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SensorDataError::Store(_))
    }
}

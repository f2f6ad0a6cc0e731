use core::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MeasureError {
    /// The pixel buffer could not be accepted.
    InvalidInput(sg_core::Error),
    /// No sampled line produced an acceptable edge pair, or no strong
    /// refined edge point survived.
    NoEdgesFound,
    /// The calibration factor is unset, zero or non-finite.
    CalibrationMissing,
    /// Manually placed measurement lines were rejected.
    InvalidLines(String),
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(e) => write!(f, "invalid input: {e}"),
            Self::NoEdgesFound => write!(f, "no edges found"),
            Self::CalibrationMissing => write!(f, "calibration factor is not set"),
            Self::InvalidLines(msg) => write!(f, "invalid measurement lines: {msg}"),
        }
    }
}

impl std::error::Error for MeasureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidInput(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sg_core::Error> for MeasureError {
    fn from(e: sg_core::Error) -> Self {
        Self::InvalidInput(e)
    }
}

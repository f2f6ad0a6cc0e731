use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    SizeMismatch { expected: usize, actual: usize },
    OutOfBounds,
    InvalidStride,
    InvalidDimensions { width: usize, height: usize },
    UnsupportedChannels(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {expected}, got {actual}")
            }
            Self::OutOfBounds => write!(f, "out of bounds"),
            Self::InvalidStride => write!(f, "invalid stride"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid dimensions {width}x{height}: both must be > 0")
            }
            Self::UnsupportedChannels(n) => {
                write!(f, "unsupported channel count {n}: expected 1, 3 or 4")
            }
        }
    }
}

impl std::error::Error for Error {}

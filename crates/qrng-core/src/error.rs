//! Error taxonomy with wire-stable integer codes.
//!
//! Callers embedding the generator behind an FFI or IPC boundary rely on the
//! numeric codes staying fixed, so every variant maps to a documented code
//! and [`error_string`] translates any code back to a human-readable
//! description. Two variants (`NullContext`, `NullBuffer`) cannot be produced
//! through the safe Rust surface — draws take `&mut self` and buffers are
//! slices — but their codes remain reserved and translatable.

use thiserror::Error;

/// Errors returned by the fallible generator operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QrngError {
    /// No generator state was supplied. Unreachable from safe Rust.
    #[error("Null context error")]
    NullContext,

    /// A required caller-owned buffer was absent. Unreachable from safe Rust.
    #[error("Null buffer error")]
    NullBuffer,

    /// A zero-length (or mismatched-length) buffer was passed where a
    /// non-empty one is required.
    #[error("Invalid length error")]
    InvalidLength,

    /// Reserved: the generator never emits this.
    #[error("Insufficient entropy error")]
    InsufficientEntropy,

    /// Reserved: the range draws fall back to `max` instead of emitting this.
    #[error("Invalid range parameters")]
    InvalidRange,
}

impl QrngError {
    /// Wire-stable integer code for this error. Success is 0 and is not an
    /// error variant.
    pub fn code(&self) -> i32 {
        match self {
            Self::NullContext => -1,
            Self::NullBuffer => -2,
            Self::InvalidLength => -3,
            Self::InsufficientEntropy => -4,
            Self::InvalidRange => -5,
        }
    }

    /// Reverse mapping from a wire code. Returns `None` for 0 (success) and
    /// for unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::NullContext),
            -2 => Some(Self::NullBuffer),
            -3 => Some(Self::InvalidLength),
            -4 => Some(Self::InsufficientEntropy),
            -5 => Some(Self::InvalidRange),
            _ => None,
        }
    }
}

/// Human-readable description of a wire code, including success and codes
/// this build never emits.
pub fn error_string(code: i32) -> &'static str {
    match code {
        0 => "Success",
        -1 => "Null context error",
        -2 => "Null buffer error",
        -3 => "Invalid length error",
        -4 => "Insufficient entropy error",
        -5 => "Invalid range parameters",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in [-1, -2, -3, -4, -5] {
            let err = QrngError::from_code(code).unwrap();
            assert_eq!(err.code(), code);
        }
        assert_eq!(QrngError::from_code(0), None);
        assert_eq!(QrngError::from_code(7), None);
    }

    #[test]
    fn display_matches_error_string() {
        for code in [-1, -2, -3, -4, -5] {
            let err = QrngError::from_code(code).unwrap();
            assert_eq!(err.to_string(), error_string(code));
        }
    }

    #[test]
    fn unknown_codes_translate() {
        assert_eq!(error_string(0), "Success");
        assert_eq!(error_string(42), "Unknown error");
        assert_eq!(error_string(-99), "Unknown error");
    }
}

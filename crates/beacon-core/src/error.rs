// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Beacon.
//
// Every failed method call resolves with exactly one of two wire codes.
// Missing and wrongly typed parameters deliberately share a code; only the
// message tells them apart.

use std::fmt;

use thiserror::Error;

/// A single value that has no encodable representation.
///
/// Scoped to one attribute: callers drop the attribute and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot encode value of type {type_name} at {path}")]
pub struct EncodingError {
    /// Descriptive type name of the offending value.
    pub type_name: String,
    /// Location inside the encoded structure, e.g. `$.attributes.tags[2]`.
    pub path: String,
}

/// Top-level error type for all dispatch operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Contract violations --
    #[error("missing required parameter `{parameter}` calling {method}")]
    MissingParameter { method: String, parameter: String },

    #[error("parameter `{parameter}` calling {method} must be {expected}, got {actual}")]
    WrongType {
        method: String,
        parameter: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0}")]
    Encoding(#[from] EncodingError),

    // -- State errors --
    #[error("{0}")]
    InvalidOperation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Convenience constructor for state errors.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// The stable wire code this error resolves with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingParameter { .. } | Self::WrongType { .. } | Self::Encoding(_) => {
                ErrorCode::ContractViolation
            }
            Self::InvalidOperation(_) | Self::Serialization(_) => ErrorCode::InvalidOperation,
        }
    }
}

/// Error codes carried by structured error results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed or missing caller input.
    ContractViolation,
    /// Valid input, but the system was not in a state to accept it.
    InvalidOperation,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContractViolation => "ContractViolation",
            Self::InvalidOperation => "InvalidOperation",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the rolling writer, its policy and its config.

use thiserror::Error;

/// Rolling writer errors.
#[derive(Debug, Error)]
pub enum RollingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported roll period: {0:?}")]
    UnsupportedPeriod(String),

    #[error("Invalid rolled file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: String },

    #[error("Time out of range for calendar arithmetic")]
    TimeOutOfRange,

    #[error("Writer is closed")]
    Closed,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RollingError {
    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFileName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<RollingError> for std::io::Error {
    fn from(err: RollingError) -> Self {
        match err {
            RollingError::Io(e) => e,
            other => std::io::Error::other(other),
        }
    }
}

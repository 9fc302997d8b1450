// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// A malformed program line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed program line '{line}': {message}")]
pub struct ParseError {
    /// The complete line as written, including nested bodies.
    pub line: String,
    pub message: String,
}

impl ParseError {
    pub fn new<L: Into<String>, M: Into<String>>(line: L, message: M) -> Self {
        Self {
            line: line.into(),
            message: message.into(),
        }
    }
}

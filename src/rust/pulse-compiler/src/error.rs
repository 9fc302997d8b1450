// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use pulse_dsl::ParseError;

use crate::scheduler::LoopId;

/// Errors aborting a compile.
///
/// Every variant is fatal; no partial instruction stream is produced.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Resources exhausted: {0}")]
    ResourceExhausted(String),
    #[error("Undefined {kind} '{name}'")]
    UndefinedReference { kind: &'static str, name: String },
    #[error("Invalid envelope for pulse '{pulse}': {message}")]
    EnvelopeMismatch { pulse: String, message: String },
    #[error("Value out of range: {0}")]
    Range(String),
    /// Loops of different channels overlap without one containing the other.
    #[error("Loop {closing} ends while loop {open} is still open, loops must nest")]
    InterleavedLoops { open: LoopId, closing: LoopId },
    #[error(transparent)]
    Asm(#[from] tproc_asm::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }

    pub(crate) fn undefined<S: Into<String>>(kind: &'static str, name: S) -> Self {
        Error::UndefinedReference {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn envelope<P: Into<String>, M: Into<String>>(pulse: P, message: M) -> Self {
        Error::EnvelopeMismatch {
            pulse: pulse.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

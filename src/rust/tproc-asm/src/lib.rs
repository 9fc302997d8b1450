// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Instruction stream for the tightly-coupled processor (tProc).
//!
//! The compiler emits [`AsmStatement`]s through the [`InstructionSink`] trait;
//! [`AsmProgram`] is the default sink which validates and renders the program
//! as assembly text for the runtime loader.

pub mod asm_program;
pub mod asm_statements;

pub use asm_program::{AsmProgram, InstructionSink, MAX_SYNC_CYCLES, immediate_load};
pub use asm_statements::{AsmStatement, BitOp, Channel, FireRegisters, MathOp, Page, Register};

/// Number of tProc time-base cycles.
pub type Cycles = u64;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::Cycles;
use std::fmt;

pub type Page = u8;
pub type Channel = u8;

/// Index of a register within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(pub u8);

impl Register {
    /// Register 0 of every page reads as constant zero and cannot be written.
    pub const ZERO: Register = Register(0);

    pub fn offset(self, offset: u8) -> Register {
        Register(self.0 + offset)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// The six registers a fire instruction reads its pulse parameters from.
///
/// All of them must live on the page passed with the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FireRegisters {
    pub frequency: Register,
    pub phase: Register,
    pub address: Register,
    pub gain: Register,
    pub mode: Register,
    pub time: Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOp {
    ShiftLeft,
}

impl fmt::Display for BitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitOp::ShiftLeft => write!(f, "<<"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Add,
}

impl fmt::Display for MathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathOp::Add => write!(f, "+"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AsmStatement {
    Comment {
        text: String,
    },
    /// `regwi`: load an immediate into a register.
    RegisterWrite {
        page: Page,
        register: Register,
        value: i32,
        comment: Option<String>,
    },
    /// `bitwi`: bitwise operation of a register with an immediate.
    BitwiseImmediate {
        page: Page,
        destination: Register,
        source: Register,
        op: BitOp,
        value: u32,
    },
    /// `mathi`: arithmetic of a register with an immediate.
    MathImmediate {
        page: Page,
        destination: Register,
        source: Register,
        op: MathOp,
        value: i32,
    },
    /// `synci`: advance the time reference of all outputs.
    SyncImmediate {
        cycles: Cycles,
    },
    /// `set`: queue a pulse on an output channel.
    Fire {
        channel: Channel,
        page: Page,
        registers: FireRegisters,
    },
    Label {
        name: String,
    },
    /// `loopnz`: decrement the counter and branch while it is not zero.
    LoopNotZero {
        page: Page,
        register: Register,
        label: String,
    },
    End,
}

impl AsmStatement {
    pub fn is_comment(&self) -> bool {
        matches!(self, AsmStatement::Comment { .. })
    }

    /// Register written by the statement, if any.
    pub fn written_register(&self) -> Option<(Page, Register)> {
        match self {
            AsmStatement::RegisterWrite { page, register, .. } => Some((*page, *register)),
            AsmStatement::BitwiseImmediate {
                page, destination, ..
            } => Some((*page, *destination)),
            AsmStatement::MathImmediate {
                page, destination, ..
            } => Some((*page, *destination)),
            AsmStatement::LoopNotZero { page, register, .. } => Some((*page, *register)),
            _ => None,
        }
    }
}

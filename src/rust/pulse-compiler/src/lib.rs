// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Compiler from per-channel pulse sequences to a tProc instruction stream.
//!
//! The compile pass allocates a register block per distinct pulse, binds
//! envelopes into the waveform memories and merges the channel timelines into
//! one time ordered stream, using native hardware loops for repetitions.

pub mod allocator;
pub mod catalog;
mod compiler;
pub mod envelope;
mod error;
pub mod mode_code;
pub mod program;
pub mod pulse;
pub mod quantizer;
pub mod scheduler;
pub mod topology;

#[cfg(test)]
mod tests;

pub use catalog::{
    EnvelopeLibrary, ProgramLibrary, ProgramSource, PulseCatalog, PulseLibrary, SampleSource,
};
pub use compiler::{CompiledProgram, Compiler, ProgramResources};
pub use error::{Error, Result};
pub use mode_code::ModeCode;
pub use program::{GeneratorDeclaration, Program};
pub use pulse::{OutputSelect, PulseDefinition, PulseStyle, RepeatMode, SteadyState};
pub use topology::{CompilerSettings, GeneratorClocks, Topology};

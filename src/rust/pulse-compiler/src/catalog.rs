// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Sources of pulse definitions, envelope samples and programs.

use anyhow::Context;
use indexmap::IndexMap;

use crate::program::Program;
use crate::pulse::PulseDefinition;
use crate::{Error, Result};

pub trait PulseCatalog {
    fn lookup(&self, name: &str) -> Result<PulseDefinition>;
}

pub trait SampleSource {
    fn lookup(&self, reference: &str) -> Result<Vec<i32>>;
}

pub trait ProgramSource {
    fn lookup(&self, name: &str) -> Result<Program>;
}

#[derive(Debug, Clone, Default)]
pub struct PulseLibrary {
    pulses: IndexMap<String, PulseDefinition>,
}

impl PulseLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pulse: PulseDefinition) -> Result<()> {
        if self.pulses.contains_key(&pulse.name) {
            return Err(Error::new(format!(
                "Pulse '{}' is declared more than once",
                pulse.name
            )));
        }
        self.pulses.insert(pulse.name.clone(), pulse);
        Ok(())
    }

    /// Load a JSON list of pulse definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let pulses: Vec<PulseDefinition> =
            serde_json::from_str(json).context("Failed to parse pulse library")?;
        Self::try_from_iter(pulses)
    }

    pub fn try_from_iter<I: IntoIterator<Item = PulseDefinition>>(pulses: I) -> Result<Self> {
        let mut library = Self::new();
        for pulse in pulses {
            library.add(pulse)?;
        }
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }
}

impl PulseCatalog for PulseLibrary {
    fn lookup(&self, name: &str) -> Result<PulseDefinition> {
        self.pulses
            .get(name)
            .cloned()
            .ok_or_else(|| Error::undefined("pulse", name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvelopeLibrary {
    envelopes: IndexMap<String, Vec<i32>>,
}

impl EnvelopeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, samples: Vec<i32>) {
        self.envelopes.insert(name.into(), samples);
    }

    /// Load a JSON object mapping envelope names to sample arrays.
    pub fn from_json(json: &str) -> Result<Self> {
        let envelopes: IndexMap<String, Vec<i32>> =
            serde_json::from_str(json).context("Failed to parse envelope library")?;
        Ok(Self { envelopes })
    }
}

impl SampleSource for EnvelopeLibrary {
    fn lookup(&self, reference: &str) -> Result<Vec<i32>> {
        self.envelopes
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::undefined("envelope", reference))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgramLibrary {
    programs: IndexMap<String, Program>,
}

impl ProgramLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, program: Program) -> Result<()> {
        if self.programs.contains_key(&program.name) {
            return Err(Error::new(format!(
                "Program '{}' is declared more than once",
                program.name
            )));
        }
        self.programs.insert(program.name.clone(), program);
        Ok(())
    }

    /// Load a JSON list of programs.
    pub fn from_json(json: &str) -> Result<Self> {
        let programs: Vec<Program> =
            serde_json::from_str(json).context("Failed to parse program library")?;
        let mut library = Self::new();
        for program in programs {
            library.add(program)?;
        }
        Ok(library)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

impl ProgramSource for ProgramLibrary {
    fn lookup(&self, name: &str) -> Result<Program> {
        self.programs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::undefined("program", name))
    }
}

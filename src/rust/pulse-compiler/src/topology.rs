// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Board description and compiler settings.

use serde::Deserialize;
use tproc_asm::Register;
use tproc_units::{Clock, Dds, megahertz};

use crate::{Error, Result};

/// Registers of a pulse parameter block: frequency, phase, address, gain, mode.
pub const PULSE_BLOCK_SIZE: u8 = 5;

/// Board dependent layout of the tProc and its outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Topology {
    pub num_channels: u8,
    pub num_pages: u8,
    pub registers_per_page: u8,
    /// Samples played per fabric cycle.
    pub samples_per_cycle: u32,
    pub max_amplitude: i32,
    /// Capacity of each channel's waveform memory.
    pub envelope_memory_samples: usize,
}

pub const REFERENCE_BOARD: Topology = Topology {
    num_channels: 7,
    num_pages: 8,
    registers_per_page: 32,
    samples_per_cycle: 16,
    max_amplitude: 32766,
    envelope_memory_samples: 65536,
};

impl Default for Topology {
    fn default() -> Self {
        REFERENCE_BOARD
    }
}

impl Topology {
    /// Pulse blocks that fit on one page.
    ///
    /// Register 0 is hardwired and the last register holds the fire time.
    pub fn blocks_per_page(&self) -> usize {
        usize::from(self.registers_per_page).saturating_sub(2) / usize::from(PULSE_BLOCK_SIZE)
    }

    /// Total number of distinct pulses a program may reference.
    pub fn pulse_capacity(&self) -> usize {
        usize::from(self.num_pages).saturating_sub(1) * self.blocks_per_page()
    }

    /// Loop counters live on page 0, every register except register 0.
    pub fn loop_counter_capacity(&self) -> usize {
        usize::from(self.registers_per_page).saturating_sub(1)
    }

    /// Register receiving the fire time on every pulse page.
    pub fn time_register(&self) -> Register {
        Register(self.registers_per_page.saturating_sub(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_channels == 0 {
            return Err(Error::new("Board must have at least one output channel"));
        }
        if self.num_pages < 2 {
            return Err(Error::new(format!(
                "Board needs a loop counter page and at least one pulse page, got {} page(s)",
                self.num_pages
            )));
        }
        if self.blocks_per_page() == 0 {
            return Err(Error::new(format!(
                "{} registers per page cannot hold a pulse block",
                self.registers_per_page
            )));
        }
        if self.samples_per_cycle == 0 {
            return Err(Error::new("Samples per cycle must be positive"));
        }
        if self.max_amplitude <= 0 {
            return Err(Error::new("Maximum amplitude must be positive"));
        }
        Ok(())
    }
}

/// Clock domains involved in a compile.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorClocks {
    /// tProc time base, used for start times.
    pub tproc: Clock,
    /// Output fabric, used for pulse lengths.
    pub fabric: Clock,
    /// DDS sample clock.
    pub dds: Clock,
    pub dds_bits: u32,
}

pub const REFERENCE_CLOCKS: GeneratorClocks = GeneratorClocks {
    tproc: megahertz(409.6),
    fabric: megahertz(430.08),
    dds: megahertz(6881.28),
    dds_bits: 32,
};

impl Default for GeneratorClocks {
    fn default() -> Self {
        REFERENCE_CLOCKS
    }
}

impl GeneratorClocks {
    pub fn dds(&self) -> Dds {
        Dds::new(self.dds, self.dds_bits)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, clock) in [
            ("tProc", self.tproc),
            ("fabric", self.fabric),
            ("DDS", self.dds),
        ] {
            if !clock.is_valid() {
                return Err(Error::new(format!(
                    "Invalid {name} clock frequency: {} MHz",
                    clock.frequency_mhz()
                )));
            }
        }
        if !(1..=32).contains(&self.dds_bits) {
            return Err(Error::new(format!(
                "DDS register width must be between 1 and 32 bits, got {}",
                self.dds_bits
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Time-base cycles to wait after the pulse parameters are loaded.
    pub sync_after_load: u64,
    pub emit_comments: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            sync_after_load: 200,
            emit_comments: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_board() {
        assert!(REFERENCE_BOARD.validate().is_ok());
        assert_eq!(REFERENCE_BOARD.blocks_per_page(), 6);
        assert_eq!(REFERENCE_BOARD.pulse_capacity(), 42);
        assert_eq!(REFERENCE_BOARD.loop_counter_capacity(), 31);
        assert_eq!(REFERENCE_BOARD.time_register(), Register(31));
        assert!(REFERENCE_CLOCKS.validate().is_ok());
    }

    #[test]
    fn test_invalid_boards() {
        let single_page = Topology {
            num_pages: 1,
            ..REFERENCE_BOARD
        };
        assert!(single_page.validate().is_err());
        let narrow = Topology {
            registers_per_page: 6,
            ..REFERENCE_BOARD
        };
        assert!(narrow.validate().is_err());
        let clocks = GeneratorClocks {
            fabric: megahertz(0.0),
            ..REFERENCE_CLOCKS
        };
        assert!(clocks.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let topology: Topology =
            serde_json::from_str(r#"{"num_channels": 2, "registers_per_page": 12}"#).unwrap();
        assert_eq!(topology.num_channels, 2);
        assert_eq!(topology.num_pages, REFERENCE_BOARD.num_pages);
        assert_eq!(topology.blocks_per_page(), 2);

        let settings: CompilerSettings =
            serde_json::from_str(r#"{"emit_comments": false}"#).unwrap();
        assert_eq!(settings.sync_after_load, 200);
        assert!(!settings.emit_comments);

        let clocks: GeneratorClocks = serde_json::from_str(r#"{"tproc": 1000.0}"#).unwrap();
        assert_eq!(clocks.tproc.frequency_mhz(), 1000.0);
        assert_eq!(clocks.dds_bits, 32);
    }
}

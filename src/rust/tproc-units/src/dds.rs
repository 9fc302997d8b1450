// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::angle::Angle64;
use crate::clock::Clock;

/// A direct digital synthesizer with a `bits` wide phase accumulator clocked by `clock`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dds {
    pub clock: Clock,
    pub bits: u32,
}

impl Dds {
    pub fn new(clock: Clock, bits: u32) -> Self {
        Dds { clock, bits }
    }

    fn modulus(&self) -> f64 {
        (1u128 << self.bits) as f64
    }

    /// Frequency tuning word for `frequency_mhz`.
    ///
    /// Frequencies above the DDS clock alias back into the first zone, negative
    /// frequencies map to the upper half of the word range.
    pub fn frequency_word(&self, frequency_mhz: f64) -> u64 {
        let turns = (frequency_mhz / self.clock.frequency_mhz()).rem_euclid(1.0);
        let word = (turns * self.modulus()).round() as u128;
        (word % (1u128 << self.bits)) as u64
    }

    /// Phase offset word for `degrees`.
    pub fn phase_word(&self, degrees: f64) -> u64 {
        Angle64::from_degrees(degrees).to_phase_word(self.bits)
    }
}

// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::topology::GeneratorClocks;

/// Conversion of carrier parameters into generator register values.
pub trait FrequencyQuantizer {
    fn freq_to_reg(&self, frequency_mhz: f64) -> i64;
    fn phase_to_reg(&self, degrees: f64) -> i64;
}

/// Conversion of durations into the two clock domains.
///
/// Start times are counted in tProc time-base cycles, pulse lengths in output
/// fabric cycles.
pub trait TimeQuantizer {
    fn ns_to_time_cycles(&self, ns: u64) -> u64;
    fn ns_to_fabric_cycles(&self, ns: u64) -> u64;
    /// Duration of `cycles` fabric cycles, rounded up to whole nanoseconds.
    fn fabric_cycles_to_ns(&self, cycles: u64) -> u64;
}

impl FrequencyQuantizer for GeneratorClocks {
    fn freq_to_reg(&self, frequency_mhz: f64) -> i64 {
        self.dds().frequency_word(frequency_mhz) as i64
    }

    fn phase_to_reg(&self, degrees: f64) -> i64 {
        self.dds().phase_word(degrees) as i64
    }
}

impl TimeQuantizer for GeneratorClocks {
    fn ns_to_time_cycles(&self, ns: u64) -> u64 {
        self.tproc.ns_to_cycles(ns)
    }

    fn ns_to_fabric_cycles(&self, ns: u64) -> u64 {
        self.fabric.ns_to_cycles(ns)
    }

    fn fabric_cycles_to_ns(&self, cycles: u64) -> u64 {
        self.fabric.cycles_to_ns(cycles).ceil() as u64
    }
}

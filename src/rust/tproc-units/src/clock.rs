// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

/// A clock domain, described by its frequency in MHz.
///
/// The tProc time base and the output fabric run on different clocks; each is
/// represented by its own [`Clock`] so the two conversions cannot be mixed up
/// by accident.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Clock {
    frequency_mhz: f64,
}

pub const fn megahertz(frequency_mhz: f64) -> Clock {
    Clock { frequency_mhz }
}

impl Clock {
    pub fn frequency_mhz(&self) -> f64 {
        self.frequency_mhz
    }

    /// Period of one cycle in nanoseconds.
    pub fn period_ns(&self) -> f64 {
        1e3 / self.frequency_mhz
    }

    /// Convert a duration in nanoseconds to the nearest number of cycles.
    pub fn ns_to_cycles(&self, ns: u64) -> u64 {
        (ns as f64 * self.frequency_mhz / 1e3).round() as u64
    }

    pub fn cycles_to_ns(&self, cycles: u64) -> f64 {
        cycles as f64 * self.period_ns()
    }

    pub fn is_valid(&self) -> bool {
        self.frequency_mhz.is_finite() && self.frequency_mhz > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ns_to_cycles() {
        let clock = megahertz(430.08);
        assert_eq!(clock.ns_to_cycles(0), 0);
        assert_eq!(clock.ns_to_cycles(100), 43);
        assert_eq!(clock.ns_to_cycles(1000), 430);

        let clock = megahertz(1000.0);
        assert_eq!(clock.ns_to_cycles(40), 40);
        assert_eq!(clock.cycles_to_ns(40), 40.0);
    }

    #[test]
    fn test_validity() {
        assert!(megahertz(384.0).is_valid());
        assert!(!megahertz(0.0).is_valid());
        assert!(!megahertz(f64::NAN).is_valid());
    }
}

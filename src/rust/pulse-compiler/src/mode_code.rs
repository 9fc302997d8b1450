// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::pulse::{OutputSelect, RepeatMode, SteadyState};
use crate::{Error, Result};

const LENGTH_BITS: u32 = 16;
const LENGTH_MASK: u32 = (1 << LENGTH_BITS) - 1;

/// Behaviour flags and length of a pulse, packed into the generator's mode word.
///
/// Layout from the most significant bit: phase reset (1), steady state (1),
/// repeat mode (1), output select (2), then 16 bits of length in fabric cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCode {
    pub phase_reset: bool,
    pub steady_state: SteadyState,
    pub repeat: RepeatMode,
    pub output_select: OutputSelect,
    pub length_cycles: u16,
}

impl ModeCode {
    pub const MIN_LENGTH: u64 = 3;
    pub const MAX_LENGTH: u64 = 1 << LENGTH_BITS;

    pub fn new(
        phase_reset: bool,
        steady_state: SteadyState,
        repeat: RepeatMode,
        output_select: OutputSelect,
        length_cycles: u64,
    ) -> Result<Self> {
        if !(Self::MIN_LENGTH..Self::MAX_LENGTH).contains(&length_cycles) {
            return Err(Error::Range(format!(
                "Pulse length of {length_cycles} cycles is outside [{}, {})",
                Self::MIN_LENGTH,
                Self::MAX_LENGTH
            )));
        }
        Ok(Self {
            phase_reset,
            steady_state,
            repeat,
            output_select,
            length_cycles: length_cycles as u16,
        })
    }

    pub fn encode(&self) -> u32 {
        let steady_state: u32 = match self.steady_state {
            SteadyState::Last => 0,
            SteadyState::Zero => 1,
        };
        let repeat: u32 = match self.repeat {
            RepeatMode::Oneshot => 0,
            RepeatMode::Periodic => 1,
        };
        let output_select: u32 = match self.output_select {
            OutputSelect::Product => 0,
            OutputSelect::Dds => 1,
            OutputSelect::Input => 2,
            OutputSelect::Zero => 3,
        };
        let flags = (u32::from(self.phase_reset) << 4)
            | (steady_state << 3)
            | (repeat << 2)
            | output_select;
        (flags << LENGTH_BITS) | u32::from(self.length_cycles)
    }

    pub fn decode(word: u32) -> Result<Self> {
        let flags = word >> LENGTH_BITS;
        if flags > 0x1f {
            return Err(Error::Range(format!(
                "Mode word {word:#x} has bits set above the flag field"
            )));
        }
        let steady_state = match (flags >> 3) & 1 {
            0 => SteadyState::Last,
            _ => SteadyState::Zero,
        };
        let repeat = match (flags >> 2) & 1 {
            0 => RepeatMode::Oneshot,
            _ => RepeatMode::Periodic,
        };
        let output_select = match flags & 0b11 {
            0 => OutputSelect::Product,
            1 => OutputSelect::Dds,
            2 => OutputSelect::Input,
            _ => OutputSelect::Zero,
        };
        Self::new(
            (flags >> 4) & 1 == 1,
            steady_state,
            repeat,
            output_select,
            u64::from(word & LENGTH_MASK),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let code = ModeCode::new(
            true,
            SteadyState::Last,
            RepeatMode::Periodic,
            OutputSelect::Dds,
            100,
        )
        .unwrap();
        let word = code.encode();
        assert_eq!(word, (0b10101 << 16) | 100);
        assert_eq!(ModeCode::decode(word).unwrap(), code);
    }

    #[test]
    fn test_defaults_encoding() {
        let code = ModeCode::new(
            false,
            SteadyState::default(),
            RepeatMode::default(),
            OutputSelect::default(),
            3,
        )
        .unwrap();
        assert_eq!(code.encode(), (0b01000 << 16) | 3);
    }

    #[test]
    fn test_length_range() {
        let make = |length| {
            ModeCode::new(
                false,
                SteadyState::Zero,
                RepeatMode::Oneshot,
                OutputSelect::Product,
                length,
            )
        };
        assert!(matches!(make(2), Err(Error::Range(_))));
        assert!(matches!(make(65536), Err(Error::Range(_))));
        assert_eq!(make(65535).unwrap().length_cycles, 65535);
        assert!(ModeCode::decode(1 << 21).is_err());
        assert!(ModeCode::decode(0b00001 << 16).is_err());
    }
}

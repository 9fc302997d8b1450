// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseStyle {
    /// DDS tone with flat envelope.
    #[serde(alias = "const")]
    Constant,
    /// Envelope from sample tables.
    #[serde(alias = "arb")]
    Arbitrary,
}

/// Output level after the pulse ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SteadyState {
    Last,
    #[default]
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Oneshot,
    Periodic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSelect {
    /// Envelope multiplied with the DDS tone.
    #[default]
    Product,
    Dds,
    Input,
    Zero,
}

/// A pulse as declared in the pulse library.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PulseDefinition {
    #[serde(alias = "pulse_name")]
    pub name: String,
    pub style: PulseStyle,
    /// Carrier frequency in MHz.
    #[serde(alias = "freq")]
    pub frequency: f64,
    /// Phase offset in degrees.
    #[serde(default)]
    pub phase: f64,
    pub gain: i64,
    /// Duration of constant-style pulses. Arbitrary pulses take theirs from the envelope.
    #[serde(default, alias = "length")]
    pub length_ns: u64,
    #[serde(default, alias = "phrst")]
    pub phase_reset: Option<u8>,
    #[serde(default, alias = "outsel")]
    pub output_select: Option<OutputSelect>,
    #[serde(default, alias = "stdysel")]
    pub steady_state_select: Option<SteadyState>,
    #[serde(default, alias = "mode")]
    pub repeat_mode: Option<RepeatMode>,
    #[serde(default, alias = "i_data_name")]
    pub i_samples_ref: Option<String>,
    #[serde(default, alias = "q_data_name")]
    pub q_samples_ref: Option<String>,
}

impl PulseDefinition {
    pub fn constant<S: Into<String>>(name: S, frequency: f64, gain: i64, length_ns: u64) -> Self {
        Self {
            name: name.into(),
            style: PulseStyle::Constant,
            frequency,
            phase: 0.0,
            gain,
            length_ns,
            phase_reset: None,
            output_select: None,
            steady_state_select: None,
            repeat_mode: None,
            i_samples_ref: None,
            q_samples_ref: None,
        }
    }

    pub fn arbitrary<S: Into<String>>(
        name: S,
        frequency: f64,
        gain: i64,
        i_samples_ref: Option<&str>,
        q_samples_ref: Option<&str>,
    ) -> Self {
        Self {
            style: PulseStyle::Arbitrary,
            i_samples_ref: i_samples_ref.map(str::to_string),
            q_samples_ref: q_samples_ref.map(str::to_string),
            ..Self::constant(name, frequency, gain, 0)
        }
    }

    pub fn uses_envelope(&self) -> bool {
        self.style == PulseStyle::Arbitrary
    }
}

// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use pulse_dsl::{Token, parse_line};
use serde::Deserialize;
use tproc_asm::asm_statements::Channel;

use crate::topology::Topology;
use crate::{Error, Result};

/// One pulse sequence per output channel.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub name: String,
    /// Channel key to program line, e.g. `"ch1" -> "[X, 10, Y]"`.
    #[serde(alias = "prog_structure")]
    pub channels: IndexMap<String, String>,
    #[serde(default, alias = "nqz")]
    pub nyquist_zones: IndexMap<String, u8>,
}

impl Program {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_channel<K: Into<String>, L: Into<String>>(mut self, key: K, line: L) -> Self {
        self.channels.insert(key.into(), line.into());
        self
    }

    pub fn with_nyquist_zone<K: Into<String>>(mut self, key: K, zone: u8) -> Self {
        self.nyquist_zones.insert(key.into(), zone);
        self
    }
}

/// Nyquist zone a generator has to be configured for before the program runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorDeclaration {
    pub channel: Channel,
    pub nyquist_zone: u8,
}

#[derive(Debug, Clone)]
pub(crate) struct ChannelProgram {
    pub key: String,
    pub channel: Channel,
    pub tokens: Vec<Token>,
}

/// Numeric channel of a key, taken from its trailing digits (`"ch3"` is channel 3).
pub fn channel_index(key: &str, topology: &Topology) -> Result<Channel> {
    let prefix_len = key.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let digits = &key[prefix_len..];
    let index: usize = digits
        .parse()
        .map_err(|_| Error::new(format!("Channel key '{key}' does not end in a channel number")))?;
    if index >= usize::from(topology.num_channels) {
        return Err(Error::new(format!(
            "Channel {index} ('{key}') does not exist, the board has {} channels",
            topology.num_channels
        )));
    }
    Ok(index as Channel)
}

pub(crate) fn parse_channels(
    program: &Program,
    topology: &Topology,
) -> Result<Vec<ChannelProgram>> {
    let mut channels: Vec<ChannelProgram> = Vec::with_capacity(program.channels.len());
    for (key, line) in &program.channels {
        let channel = channel_index(key, topology)?;
        if let Some(other) = channels.iter().find(|c| c.channel == channel) {
            return Err(Error::new(format!(
                "Channel keys '{}' and '{key}' both refer to channel {channel}",
                other.key
            )));
        }
        channels.push(ChannelProgram {
            key: key.clone(),
            channel,
            tokens: parse_line(line)?,
        });
    }
    Ok(channels)
}

/// Generators to declare, one per channel that is programmed or has a zone assigned.
///
/// Channels without an explicit zone run in the first Nyquist zone.
pub(crate) fn generator_declarations(
    program: &Program,
    topology: &Topology,
) -> Result<Vec<GeneratorDeclaration>> {
    let mut zones: IndexMap<Channel, u8> = IndexMap::new();
    for key in program.channels.keys() {
        zones.insert(channel_index(key, topology)?, 1);
    }
    for (key, &zone) in &program.nyquist_zones {
        if !(1..=2).contains(&zone) {
            return Err(Error::new(format!(
                "Nyquist zone of '{key}' must be 1 or 2, got {zone}"
            )));
        }
        zones.insert(channel_index(key, topology)?, zone);
    }
    zones.sort_keys();
    Ok(zones
        .into_iter()
        .map(|(channel, nyquist_zone)| GeneratorDeclaration {
            channel,
            nyquist_zone,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::REFERENCE_BOARD;

    #[test]
    fn test_channel_index() {
        assert_eq!(channel_index("ch1", &REFERENCE_BOARD).unwrap(), 1);
        assert_eq!(channel_index("3", &REFERENCE_BOARD).unwrap(), 3);
        assert_eq!(channel_index("gen_06", &REFERENCE_BOARD).unwrap(), 6);
        assert!(channel_index("ch7", &REFERENCE_BOARD).is_err());
        assert!(channel_index("drive", &REFERENCE_BOARD).is_err());
        assert!(channel_index("", &REFERENCE_BOARD).is_err());
    }

    #[test]
    fn test_duplicate_channels() {
        let program = Program::new("p")
            .with_channel("ch1", "[X]")
            .with_channel("out1", "[Y]");
        assert!(parse_channels(&program, &REFERENCE_BOARD).is_err());
    }

    #[test]
    fn test_parse_error_surfaces() {
        let program = Program::new("p").with_channel("ch1", "[X, loop(2,[])]");
        assert!(matches!(
            parse_channels(&program, &REFERENCE_BOARD),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_generator_declarations() {
        let program = Program::new("p")
            .with_channel("ch3", "[X]")
            .with_channel("ch1", "[X]")
            .with_nyquist_zone("ch3", 2)
            .with_nyquist_zone("ch5", 1);
        let generators = generator_declarations(&program, &REFERENCE_BOARD).unwrap();
        assert_eq!(
            generators,
            vec![
                GeneratorDeclaration {
                    channel: 1,
                    nyquist_zone: 1
                },
                GeneratorDeclaration {
                    channel: 3,
                    nyquist_zone: 2
                },
                GeneratorDeclaration {
                    channel: 5,
                    nyquist_zone: 1
                },
            ]
        );

        let invalid = Program::new("p").with_nyquist_zone("ch1", 3);
        assert!(generator_declarations(&invalid, &REFERENCE_BOARD).is_err());
    }
}

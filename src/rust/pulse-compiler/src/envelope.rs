// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use tproc_asm::Channel;

use crate::catalog::SampleSource;
use crate::pulse::PulseDefinition;
use crate::topology::Topology;
use crate::{Error, Result};

/// Envelope placed in a waveform memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEnvelope {
    /// Start address in fabric cycles.
    pub address: u64,
    pub i_samples: Vec<i32>,
    pub q_samples: Vec<i32>,
}

/// Waveform memory of one output channel.
#[derive(Debug, Clone)]
pub struct WaveformMemory {
    pub channel: Channel,
    envelopes: IndexMap<String, StoredEnvelope>,
    used_samples: usize,
    capacity: usize,
    samples_per_cycle: usize,
}

impl WaveformMemory {
    fn new(channel: Channel, topology: &Topology) -> Self {
        Self {
            channel,
            envelopes: IndexMap::new(),
            used_samples: 0,
            capacity: topology.envelope_memory_samples,
            samples_per_cycle: topology.samples_per_cycle as usize,
        }
    }

    fn add(&mut self, name: &str, i_samples: Vec<i32>, q_samples: Vec<i32>) -> Result<u64> {
        if self.envelopes.contains_key(name) {
            return Err(Error::new(format!(
                "Envelope '{name}' already exists in the memory of channel {}",
                self.channel
            )));
        }
        let length = i_samples.len();
        if self.used_samples + length > self.capacity {
            return Err(Error::ResourceExhausted(format!(
                "envelope '{name}' ({length} samples) does not fit on channel {}, {} of {} samples in use",
                self.channel, self.used_samples, self.capacity
            )));
        }
        let address = (self.used_samples / self.samples_per_cycle) as u64;
        self.used_samples += length;
        self.envelopes.insert(
            name.to_string(),
            StoredEnvelope {
                address,
                i_samples,
                q_samples,
            },
        );
        Ok(address)
    }

    pub fn envelopes(&self) -> &IndexMap<String, StoredEnvelope> {
        &self.envelopes
    }

    pub fn used_samples(&self) -> usize {
        self.used_samples
    }
}

/// Address and length of a bound envelope, valid on every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeBinding {
    pub address: u64,
    pub length_cycles: u64,
}

/// Places the envelopes of arbitrary-style pulses into the waveform memories.
///
/// Every envelope goes into the memory of every channel, so a pulse has the same
/// address wherever it is played.
#[derive(Debug, Clone)]
pub struct EnvelopeBinder {
    memories: Vec<WaveformMemory>,
    bindings: IndexMap<String, EnvelopeBinding>,
    samples_per_cycle: usize,
    max_amplitude: i32,
}

impl EnvelopeBinder {
    pub fn new(topology: &Topology) -> Self {
        Self {
            memories: (0..topology.num_channels)
                .map(|channel| WaveformMemory::new(channel, topology))
                .collect(),
            bindings: IndexMap::new(),
            samples_per_cycle: topology.samples_per_cycle as usize,
            max_amplitude: topology.max_amplitude,
        }
    }

    fn load_samples(
        &self,
        pulse: &PulseDefinition,
        source: &dyn SampleSource,
    ) -> Result<(Vec<i32>, Vec<i32>)> {
        let i_samples = pulse
            .i_samples_ref
            .as_deref()
            .map(|reference| source.lookup(reference))
            .transpose()?;
        let q_samples = pulse
            .q_samples_ref
            .as_deref()
            .map(|reference| source.lookup(reference))
            .transpose()?;
        match (i_samples, q_samples) {
            (Some(i), Some(q)) => Ok((i, q)),
            (Some(i), None) => {
                let q = vec![0; i.len()];
                Ok((i, q))
            }
            (None, Some(q)) => Ok((vec![0; q.len()], q)),
            (None, None) => Err(Error::envelope(
                &pulse.name,
                "neither I nor Q samples are referenced",
            )),
        }
    }

    fn validate(
        &self,
        pulse: &PulseDefinition,
        i_samples: &[i32],
        q_samples: &[i32],
    ) -> Result<()> {
        if i_samples.len() != q_samples.len() {
            return Err(Error::envelope(
                &pulse.name,
                format!(
                    "I and Q have different lengths ({} and {})",
                    i_samples.len(),
                    q_samples.len()
                ),
            ));
        }
        if i_samples.is_empty() {
            return Err(Error::envelope(&pulse.name, "envelope is empty"));
        }
        if i_samples.len() % self.samples_per_cycle != 0 {
            return Err(Error::envelope(
                &pulse.name,
                format!(
                    "length {} is not a multiple of {} samples per cycle",
                    i_samples.len(),
                    self.samples_per_cycle
                ),
            ));
        }
        let limit = i64::from(self.max_amplitude);
        if let Some(value) = i_samples
            .iter()
            .chain(q_samples)
            .find(|v| i64::from(**v).abs() > limit)
        {
            return Err(Error::envelope(
                &pulse.name,
                format!("sample {value} exceeds the maximum amplitude of {limit}"),
            ));
        }
        Ok(())
    }

    /// Bind the envelope of `pulse` into all waveform memories.
    pub fn bind(
        &mut self,
        pulse: &PulseDefinition,
        source: &dyn SampleSource,
    ) -> Result<EnvelopeBinding> {
        if let Some(binding) = self.bindings.get(&pulse.name) {
            return Ok(*binding);
        }
        let (i_samples, q_samples) = self.load_samples(pulse, source)?;
        self.validate(pulse, &i_samples, &q_samples)?;
        let length_cycles = (i_samples.len() / self.samples_per_cycle) as u64;

        let mut address = None;
        for memory in &mut self.memories {
            let channel_address = memory.add(&pulse.name, i_samples.clone(), q_samples.clone())?;
            match address {
                None => address = Some(channel_address),
                Some(expected) if expected != channel_address => {
                    return Err(Error::new(format!(
                        "Envelope of pulse '{}' lands at {channel_address} on channel {}, not {expected}",
                        pulse.name, memory.channel
                    )));
                }
                Some(_) => {}
            }
        }
        let binding = EnvelopeBinding {
            address: address.unwrap_or_default(),
            length_cycles,
        };
        self.bindings.insert(pulse.name.clone(), binding);
        Ok(binding)
    }

    pub fn memories(&self) -> &[WaveformMemory] {
        &self.memories
    }

    pub fn into_memories(self) -> Vec<WaveformMemory> {
        self.memories
    }
}

// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use pulse_dsl::PulseName;
use tproc_asm::{FireRegisters, Page, Register};

use crate::scheduler::{LoopId, PulseDurations};
use crate::topology::{PULSE_BLOCK_SIZE, Topology};
use crate::{Error, Result};

/// Page holding the loop counters.
pub const LOOP_COUNTER_PAGE: Page = 0;

/// Register block holding the parameters of one pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PulseRegisters {
    pub page: Page,
    pub base: Register,
    time: Register,
    uses_envelope: bool,
}

impl PulseRegisters {
    pub fn frequency(&self) -> Register {
        self.base
    }

    pub fn phase(&self) -> Register {
        self.base.offset(1)
    }

    /// Envelope address register, `None` for pulses without an envelope.
    pub fn address(&self) -> Option<Register> {
        self.uses_envelope.then_some(self.base.offset(2))
    }

    pub fn gain(&self) -> Register {
        self.base.offset(3)
    }

    pub fn mode(&self) -> Register {
        self.base.offset(4)
    }

    /// Shared time register of the page, written before each fire.
    pub fn time(&self) -> Register {
        self.time
    }

    pub fn fire_registers(&self) -> FireRegisters {
        FireRegisters {
            frequency: self.frequency(),
            phase: self.phase(),
            address: self.address().unwrap_or(Register::ZERO),
            gain: self.gain(),
            mode: self.mode(),
            time: self.time(),
        }
    }
}

/// Bump allocator for the tProc register file.
///
/// Pulse blocks are handed out on pages 1 and up, loop counters on page 0.
/// Nothing is ever freed; a fresh allocator is needed for every compile.
#[derive(Debug, Clone)]
pub struct RegisterAllocator {
    topology: Topology,
    next_pulse: (Page, u8),
    next_loop_counter: u8,
    pulses: IndexMap<PulseName, PulseRegisters>,
    loop_counters: IndexMap<LoopId, Register>,
}

impl RegisterAllocator {
    pub fn new(topology: &Topology) -> Self {
        Self {
            topology: *topology,
            next_pulse: (1, 1),
            next_loop_counter: 1,
            pulses: IndexMap::new(),
            loop_counters: IndexMap::new(),
        }
    }

    /// Registers of `pulse`, allocating a block on first use.
    pub fn allocate_pulse(
        &mut self,
        pulse: &PulseName,
        uses_envelope: bool,
    ) -> Result<PulseRegisters> {
        if let Some(registers) = self.pulses.get(pulse) {
            return Ok(*registers);
        }
        let (mut page, mut base) = self.next_pulse;
        // Last register of the page is the time register
        let last_usable = usize::from(self.topology.registers_per_page).saturating_sub(2);
        if usize::from(base) + usize::from(PULSE_BLOCK_SIZE) - 1 > last_usable {
            page += 1;
            base = 1;
        }
        if page >= self.topology.num_pages {
            return Err(Error::ResourceExhausted(format!(
                "no registers left for pulse '{pulse}', {} pulses fit on the board",
                self.topology.pulse_capacity()
            )));
        }
        let registers = PulseRegisters {
            page,
            base: Register(base),
            time: self.topology.time_register(),
            uses_envelope,
        };
        self.next_pulse = (page, base + PULSE_BLOCK_SIZE);
        self.pulses.insert(pulse.clone(), registers);
        Ok(registers)
    }

    pub fn pulse_registers(&self, pulse: &PulseName) -> Result<PulseRegisters> {
        self.pulses
            .get(pulse)
            .copied()
            .ok_or_else(|| Error::undefined("pulse", pulse.as_str()))
    }

    /// Counter register of loop `id` on [`LOOP_COUNTER_PAGE`].
    pub fn allocate_loop_counter(&mut self, id: LoopId) -> Result<Register> {
        if let Some(register) = self.loop_counters.get(&id) {
            return Ok(*register);
        }
        if usize::from(self.next_loop_counter) > self.topology.loop_counter_capacity() {
            return Err(Error::ResourceExhausted(format!(
                "no registers left for the counter of loop {id}, at most {} loops are supported",
                self.topology.loop_counter_capacity()
            )));
        }
        let register = Register(self.next_loop_counter);
        self.next_loop_counter += 1;
        self.loop_counters.insert(id, register);
        Ok(register)
    }

    pub fn loop_counter(&self, id: LoopId) -> Option<Register> {
        self.loop_counters.get(&id).copied()
    }

    pub fn pulses(&self) -> &IndexMap<PulseName, PulseRegisters> {
        &self.pulses
    }

    pub fn into_tables(
        self,
    ) -> (
        IndexMap<PulseName, PulseRegisters>,
        IndexMap<LoopId, Register>,
    ) {
        (self.pulses, self.loop_counters)
    }
}

/// Duration of every pulse in nanoseconds, as seen by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct DurationTable {
    durations: IndexMap<PulseName, u64>,
}

impl DurationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pulse: PulseName, duration_ns: u64) {
        self.durations.insert(pulse, duration_ns);
    }
}

impl PulseDurations for DurationTable {
    fn duration_ns(&self, pulse: &PulseName) -> Result<u64> {
        self.durations
            .get(pulse)
            .copied()
            .ok_or_else(|| Error::undefined("pulse", pulse.as_str()))
    }
}

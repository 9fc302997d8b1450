// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use pulse_dsl::{PulseName, collect_pulse_names};
use tproc_asm::{AsmProgram, AsmStatement, Cycles, InstructionSink, MAX_SYNC_CYCLES, Register};
use tproc_log::{debug, diagnostic, info, warn};

use crate::allocator::{DurationTable, LOOP_COUNTER_PAGE, PulseRegisters, RegisterAllocator};
use crate::catalog::{ProgramSource, PulseCatalog, SampleSource};
use crate::envelope::{EnvelopeBinder, WaveformMemory};
use crate::mode_code::ModeCode;
use crate::program::{
    ChannelProgram, GeneratorDeclaration, Program, generator_declarations, parse_channels,
};
use crate::pulse::{OutputSelect, PulseDefinition, PulseStyle};
use crate::quantizer::{FrequencyQuantizer, TimeQuantizer};
use crate::scheduler::{EventKind, LoopId, ScheduleEvent, Scheduler};
use crate::topology::{CompilerSettings, GeneratorClocks, Topology};
use crate::{Error, Result};

/// Tables describing the resources a compiled program uses.
#[derive(Debug, Clone)]
pub struct ProgramResources {
    pub registers: IndexMap<PulseName, PulseRegisters>,
    pub loop_counters: IndexMap<LoopId, Register>,
    pub waveform_memories: Vec<WaveformMemory>,
    pub generators: Vec<GeneratorDeclaration>,
}

#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub name: String,
    pub asm: AsmProgram,
    pub registers: IndexMap<PulseName, PulseRegisters>,
    pub loop_counters: IndexMap<LoopId, Register>,
    pub waveform_memories: Vec<WaveformMemory>,
    pub generators: Vec<GeneratorDeclaration>,
}

impl CompiledProgram {
    pub fn to_asm(&self) -> String {
        self.asm.generate_asm()
    }
}

fn loop_label(id: LoopId) -> String {
    format!("LOOP_{id}")
}

fn sync(cycles: Cycles) -> Result<AsmStatement> {
    if cycles > MAX_SYNC_CYCLES {
        return Err(Error::Range(format!(
            "synci of {cycles} cycles exceeds the maximum of {MAX_SYNC_CYCLES}"
        )));
    }
    Ok(AsmStatement::SyncImmediate { cycles })
}

/// Parameters of one pulse in register units.
struct PreparedPulse {
    frequency: i64,
    phase: i64,
    address: Option<u64>,
    gain: i64,
    mode: ModeCode,
    duration_ns: u64,
}

/// Emission state while walking the schedule.
struct Emitter<'a, S: InstructionSink> {
    sink: &'a mut S,
    clocks: &'a GeneratorClocks,
    /// Absolute time the tProc time reference points at, in ns.
    reference: u64,
    /// Loops entered and not yet closed, innermost last.
    open_loops: Vec<LoopId>,
}

impl<S: InstructionSink> Emitter<'_, S> {
    /// Move the time reference forward to `absolute` with `synci`.
    fn sync_to(&mut self, absolute: u64) -> Result<()> {
        let cycles = self
            .clocks
            .ns_to_time_cycles(absolute.saturating_sub(self.reference));
        if cycles > 0 {
            self.sink.emit(sync(cycles)?)?;
            self.reference = absolute;
        }
        Ok(())
    }

    fn emit_event(
        &mut self,
        event: &ScheduleEvent,
        allocator: &mut RegisterAllocator,
    ) -> Result<()> {
        match &event.kind {
            EventKind::Pulse(name) => {
                let registers = allocator.pulse_registers(name)?;
                let offset = event.absolute.saturating_sub(self.reference);
                let cycles = self.clocks.ns_to_time_cycles(offset);
                self.sink.load_immediate(
                    registers.page,
                    registers.time(),
                    cycles as i64,
                    Some(format!("{name} on channel {} @ {} ns", event.channel, event.time)),
                )?;
                self.sink.emit(AsmStatement::Fire {
                    channel: event.channel,
                    page: registers.page,
                    registers: registers.fire_registers(),
                })?;
            }
            EventKind::LoopStart { id, count } => {
                let counter = allocator.allocate_loop_counter(*id)?;
                self.sink.load_immediate(
                    LOOP_COUNTER_PAGE,
                    counter,
                    i64::from(*count) - 1,
                    Some(format!("loop {id}: {count} iterations")),
                )?;
                self.sync_to(event.absolute)?;
                self.sink.emit(AsmStatement::Label {
                    name: loop_label(*id),
                })?;
                self.open_loops.push(*id);
            }
            EventKind::LoopEnd { id, .. } => {
                match self.open_loops.pop() {
                    Some(open) if open == *id => {}
                    Some(open) => {
                        return Err(Error::InterleavedLoops { open, closing: *id });
                    }
                    None => return Err(Error::new(format!("Loop {id} ends before it started"))),
                }
                let counter = allocator
                    .loop_counter(*id)
                    .ok_or_else(|| Error::new(format!("Loop {id} has no counter register")))?;
                self.sync_to(event.absolute)?;
                self.sink.emit(AsmStatement::LoopNotZero {
                    page: LOOP_COUNTER_PAGE,
                    register: counter,
                    label: loop_label(*id),
                })?;
            }
        }
        Ok(())
    }
}

/// Compiles programs for one board against a pulse catalog and sample source.
///
/// A compile owns all its allocation state, so one [`Compiler`] can compile any
/// number of programs independently.
pub struct Compiler<'a> {
    pulses: &'a dyn PulseCatalog,
    samples: &'a dyn SampleSource,
    topology: Topology,
    clocks: GeneratorClocks,
    settings: CompilerSettings,
}

impl<'a> Compiler<'a> {
    pub fn new(pulses: &'a dyn PulseCatalog, samples: &'a dyn SampleSource) -> Self {
        Self {
            pulses,
            samples,
            topology: Topology::default(),
            clocks: GeneratorClocks::default(),
            settings: CompilerSettings::default(),
        }
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_clocks(mut self, clocks: GeneratorClocks) -> Self {
        self.clocks = clocks;
        self
    }

    pub fn with_settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Look up `name` in `programs` and compile it.
    pub fn compile_named(
        &self,
        name: &str,
        programs: &dyn ProgramSource,
    ) -> Result<CompiledProgram> {
        let program = programs.lookup(name)?;
        self.compile(&program)
    }

    pub fn compile(&self, program: &Program) -> Result<CompiledProgram> {
        let mut asm = AsmProgram::new(self.settings.emit_comments);
        let resources = self.compile_into(program, &mut asm)?;
        asm.validate()?;
        Ok(CompiledProgram {
            name: program.name.clone(),
            asm,
            registers: resources.registers,
            loop_counters: resources.loop_counters,
            waveform_memories: resources.waveform_memories,
            generators: resources.generators,
        })
    }

    /// Compile `program`, emitting the instruction stream into `sink`.
    pub fn compile_into<S: InstructionSink>(
        &self,
        program: &Program,
        sink: &mut S,
    ) -> Result<ProgramResources> {
        self.topology.validate()?;
        self.clocks.validate()?;
        let channels = parse_channels(program, &self.topology)?;
        let generators = generator_declarations(program, &self.topology)?;
        info!(
            "Compiling program '{}' for {} channel(s)",
            program.name,
            channels.len()
        );
        for channel in channels.iter().filter(|c| c.tokens.is_empty()) {
            warn!(
                "Program '{}' has no pulses on channel '{}'",
                program.name,
                channel.key
            );
        }

        let mut allocator = RegisterAllocator::new(&self.topology);
        let mut binder = EnvelopeBinder::new(&self.topology);
        let durations = self.load_pulses(&channels, &mut allocator, &mut binder, sink)?;
        sink.emit(sync(self.settings.sync_after_load)?)?;

        let scheduler = Scheduler::new(
            channels.iter().map(|c| (c.channel, c.tokens.as_slice())),
            &durations,
        );
        let mut emitter = Emitter {
            sink,
            clocks: &self.clocks,
            reference: 0,
            open_loops: Vec::new(),
        };
        let mut num_events = 0usize;
        let mut num_loops = 0usize;
        for event in scheduler {
            let event = event?;
            if matches!(event.kind, EventKind::LoopStart { .. }) {
                num_loops += 1;
            }
            emitter.emit_event(&event, &mut allocator)?;
            num_events += 1;
        }
        emitter.sink.emit(AsmStatement::End)?;
        diagnostic!(
            "Scheduled {} events, {} loops, {} pulses in registers",
            num_events,
            num_loops,
            allocator.pulses().len()
        );
        info!(
            "Compiled program '{}': {} pulse(s), {} loop(s)",
            program.name,
            allocator.pulses().len(),
            num_loops
        );

        let (registers, loop_counters) = allocator.into_tables();
        Ok(ProgramResources {
            registers,
            loop_counters,
            waveform_memories: binder.into_memories(),
            generators,
        })
    }

    /// Allocate registers for every referenced pulse and load its parameters.
    fn load_pulses<S: InstructionSink>(
        &self,
        channels: &[ChannelProgram],
        allocator: &mut RegisterAllocator,
        binder: &mut EnvelopeBinder,
        sink: &mut S,
    ) -> Result<DurationTable> {
        let names = collect_pulse_names(channels.iter().map(|c| c.tokens.as_slice()));
        let mut durations = DurationTable::new();
        for name in names {
            let definition = self.pulses.lookup(name.as_str())?;
            let prepared = self.prepare_pulse(&definition, binder)?;
            let registers = allocator.allocate_pulse(&name, definition.uses_envelope())?;
            debug!(
                "Pulse '{}' on page {}, registers {}..{}",
                name,
                registers.page,
                registers.frequency(),
                registers.mode()
            );
            sink.emit(AsmStatement::Comment {
                text: format!("Pulse '{name}'"),
            })?;
            let page = registers.page;
            sink.load_immediate(
                page,
                registers.frequency(),
                prepared.frequency,
                Some(format!("frequency = {} MHz", definition.frequency)),
            )?;
            sink.load_immediate(
                page,
                registers.phase(),
                prepared.phase,
                Some(format!("phase = {} deg", definition.phase)),
            )?;
            if let (Some(register), Some(address)) = (registers.address(), prepared.address) {
                sink.load_immediate(
                    page,
                    register,
                    address as i64,
                    Some("envelope address".to_string()),
                )?;
            }
            sink.load_immediate(page, registers.gain(), prepared.gain, Some("gain".to_string()))?;
            sink.load_immediate(
                page,
                registers.mode(),
                i64::from(prepared.mode.encode()),
                Some(format!("mode, length = {} cycles", prepared.mode.length_cycles)),
            )?;
            durations.insert(name, prepared.duration_ns);
        }
        Ok(durations)
    }

    fn prepare_pulse(
        &self,
        definition: &PulseDefinition,
        binder: &mut EnvelopeBinder,
    ) -> Result<PreparedPulse> {
        if i16::try_from(definition.gain).is_err() {
            return Err(Error::Range(format!(
                "Gain {} of pulse '{}' exceeds the 16 bit range",
                definition.gain, definition.name
            )));
        }
        let phase_reset = match definition.phase_reset.unwrap_or(0) {
            0 => false,
            1 => true,
            other => {
                return Err(Error::Range(format!(
                    "Phase reset of pulse '{}' must be 0 or 1, got {other}",
                    definition.name
                )));
            }
        };
        let (address, length_cycles, output_select, duration_ns) = match definition.style {
            PulseStyle::Constant => (
                None,
                self.clocks.ns_to_fabric_cycles(definition.length_ns),
                OutputSelect::Dds,
                definition.length_ns,
            ),
            PulseStyle::Arbitrary => {
                let binding = binder.bind(definition, self.samples)?;
                debug!(
                    "Envelope of pulse '{}' at address {}, {} cycles",
                    definition.name,
                    binding.address,
                    binding.length_cycles
                );
                (
                    Some(binding.address),
                    binding.length_cycles,
                    definition.output_select.unwrap_or_default(),
                    self.clocks.fabric_cycles_to_ns(binding.length_cycles),
                )
            }
        };
        let mode = ModeCode::new(
            phase_reset,
            definition.steady_state_select.unwrap_or_default(),
            definition.repeat_mode.unwrap_or_default(),
            output_select,
            length_cycles,
        )
        .map_err(|error| match error {
            Error::Range(message) => {
                Error::Range(format!("pulse '{}': {message}", definition.name))
            }
            other => other,
        })?;
        Ok(PreparedPulse {
            frequency: self.clocks.freq_to_reg(definition.frequency),
            phase: self.clocks.phase_to_reg(definition.phase),
            address,
            gain: definition.gain,
            mode,
            duration_ns,
        })
    }
}

// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use pulse_dsl::PulseName;
use tproc_asm::{AsmStatement, Channel, Register};
use tproc_units::megahertz;

use crate::topology::REFERENCE_BOARD;
use crate::*;

/// Clocks where one cycle of either domain is one nanosecond.
const UNIT_CLOCKS: GeneratorClocks = GeneratorClocks {
    tproc: megahertz(1000.0),
    fabric: megahertz(1000.0),
    dds: megahertz(1024.0),
    dds_bits: 32,
};

fn quiet() -> CompilerSettings {
    CompilerSettings {
        emit_comments: false,
        ..Default::default()
    }
}

fn pulses() -> PulseLibrary {
    PulseLibrary::try_from_iter([
        PulseDefinition::constant("X", 0.0, 1000, 40),
        PulseDefinition::constant("Y", 0.0, 1000, 60),
        PulseDefinition::constant("A", 0.0, 1000, 10),
        PulseDefinition::constant("B", 0.0, 1000, 10),
        PulseDefinition::constant("C", 0.0, 1000, 10),
        PulseDefinition::arbitrary("G", 0.0, 1000, Some("gauss"), None),
    ])
    .unwrap()
}

fn envelopes() -> EnvelopeLibrary {
    let mut library = EnvelopeLibrary::new();
    library.insert("gauss", vec![100; 64]);
    library
}

fn fires(program: &CompiledProgram) -> Vec<(Channel, Register)> {
    program
        .asm
        .statements()
        .iter()
        .filter_map(|s| match s {
            AsmStatement::Fire {
                channel, registers, ..
            } => Some((*channel, registers.frequency)),
            _ => None,
        })
        .collect()
}

fn time_loads(program: &CompiledProgram) -> Vec<i32> {
    program
        .asm
        .statements()
        .iter()
        .filter_map(|s| match s {
            AsmStatement::RegisterWrite {
                register, value, ..
            } if *register == REFERENCE_BOARD.time_register() => Some(*value),
            _ => None,
        })
        .collect()
}

#[test]
fn test_loop_program_end_to_end() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_clocks(UNIT_CLOCKS)
        .with_settings(quiet());
    let program = Program::new("rabi").with_channel("ch1", "[loop(3,[X,10,Y]), X]");
    let compiled = compiler.compile(&program).unwrap();
    let expected = "\
regwi 1, $1, 0;
regwi 1, $2, 0;
regwi 1, $4, 1000;
regwi 1, $5, 589864;
regwi 1, $6, 0;
regwi 1, $7, 0;
regwi 1, $9, 1000;
regwi 1, $10, 589884;
synci 200;
regwi 0, $1, 2;
LOOP_1:
regwi 1, $31, 0;
set 1, 1, $1, $2, $0, $4, $5, $31;
regwi 1, $31, 50;
set 1, 1, $6, $7, $0, $9, $10, $31;
synci 110;
loopnz 0, $1, @LOOP_1;
regwi 1, $31, 0;
set 1, 1, $1, $2, $0, $4, $5, $31;
end;
";
    assert_eq!(compiled.to_asm(), expected);
    assert_eq!(compiled.name, "rabi");
    assert_eq!(compiled.loop_counters[&1], Register(1));
    assert_eq!(compiled.registers.len(), 2);
}

/// Parameter loads of `X` and `Y` on page 1, as emitted with [`UNIT_CLOCKS`].
const XY_PREAMBLE: &str = "\
regwi 1, $1, 0;
regwi 1, $2, 0;
regwi 1, $4, 1000;
regwi 1, $5, 589864;
regwi 1, $6, 0;
regwi 1, $7, 0;
regwi 1, $9, 1000;
regwi 1, $10, 589884;
synci 200;
";

#[test]
fn test_nested_loops_end_to_end() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_clocks(UNIT_CLOCKS)
        .with_settings(quiet());
    let program = Program::new("p").with_channel("ch1", "[5, loop(2,[X, loop(3,[10, Y]), Y]), X]");
    let compiled = compiler.compile(&program).unwrap();
    let body = "\
regwi 0, $1, 1;
synci 5;
LOOP_1:
regwi 1, $31, 0;
set 1, 1, $1, $2, $0, $4, $5, $31;
regwi 0, $2, 2;
synci 40;
LOOP_2:
regwi 1, $31, 10;
set 1, 1, $6, $7, $0, $9, $10, $31;
synci 70;
loopnz 0, $2, @LOOP_2;
regwi 1, $31, 0;
set 1, 1, $6, $7, $0, $9, $10, $31;
synci 60;
loopnz 0, $1, @LOOP_1;
regwi 1, $31, 0;
set 1, 1, $1, $2, $0, $4, $5, $31;
end;
";
    assert_eq!(compiled.to_asm(), format!("{XY_PREAMBLE}{body}"));
    assert_eq!(compiled.loop_counters[&2], Register(2));
}

#[test]
fn test_loop_with_second_channel_end_to_end() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_clocks(UNIT_CLOCKS)
        .with_settings(quiet());
    let program = Program::new("p")
        .with_channel("ch0", "[loop(2,[X, 10, X]), X]")
        .with_channel("ch1", "[100, Y, Y]");
    let compiled = compiler.compile(&program).unwrap();
    let body = "\
regwi 0, $1, 1;
LOOP_1:
regwi 1, $31, 0;
set 0, 1, $1, $2, $0, $4, $5, $31;
regwi 1, $31, 50;
set 0, 1, $1, $2, $0, $4, $5, $31;
synci 90;
loopnz 0, $1, @LOOP_1;
regwi 1, $31, 0;
set 0, 1, $1, $2, $0, $4, $5, $31;
regwi 1, $31, 10;
set 1, 1, $6, $7, $0, $9, $10, $31;
regwi 1, $31, 70;
set 1, 1, $6, $7, $0, $9, $10, $31;
end;
";
    assert_eq!(compiled.to_asm(), format!("{XY_PREAMBLE}{body}"));
}

#[test]
fn test_interleaved_loops_are_rejected() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes).with_clocks(UNIT_CLOCKS);
    // Loop 1 spans 0..80 ns, loop 2 spans 50..110 ns
    let program = Program::new("p")
        .with_channel("ch0", "[loop(2,[X, X])]")
        .with_channel("ch1", "[50, loop(2,[Y])]");
    assert!(matches!(
        compiler.compile(&program),
        Err(Error::InterleavedLoops {
            open: 2,
            closing: 1
        })
    ));

    struct Collect(Vec<AsmStatement>);
    impl tproc_asm::InstructionSink for Collect {
        fn emit(&mut self, statement: AsmStatement) -> tproc_asm::Result<()> {
            self.0.push(statement);
            Ok(())
        }
    }
    // The error is raised before the second branch reaches any sink
    let mut sink = Collect(Vec::new());
    assert!(compiler.compile_into(&program, &mut sink).is_err());
    let branches = sink
        .0
        .iter()
        .filter(|s| matches!(s, AsmStatement::LoopNotZero { .. }))
        .count();
    assert_eq!(branches, 0);
}

#[test]
fn test_sync_out_of_range() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes);
    let program = Program::new("p").with_channel("ch0", "[6000000000, loop(2,[X])]");
    assert!(matches!(compiler.compile(&program), Err(Error::Range(_))));

    let compiler = Compiler::new(&pulses, &envelopes).with_settings(CompilerSettings {
        sync_after_load: 1 << 31,
        ..Default::default()
    });
    let program = Program::new("p").with_channel("ch0", "[X]");
    assert!(matches!(compiler.compile(&program), Err(Error::Range(_))));
}

#[test]
fn test_time_overflow() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes);
    let program = Program::new("p").with_channel("ch0", "[18446744073709551615, X, X]");
    assert!(matches!(compiler.compile(&program), Err(Error::Range(_))));
}

#[test]
fn test_comments_are_rendered() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes).with_clocks(UNIT_CLOCKS);
    let program = Program::new("p").with_channel("ch0", "[X]");
    let asm = compiler.compile(&program).unwrap().to_asm();
    assert!(asm.contains("// Pulse 'X'\n"));
    assert!(asm.contains("regwi 1, $31, 0;  // X on channel 0 @ 0 ns\n"));
}

#[test]
fn test_channels_interleave_by_time() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_clocks(UNIT_CLOCKS)
        .with_settings(quiet());
    let program = Program::new("p")
        .with_channel("ch0", "[A, A]")
        .with_channel("ch1", "[15, B]");
    let compiled = compiler.compile(&program).unwrap();
    let channels: Vec<Channel> = fires(&compiled).into_iter().map(|(c, _)| c).collect();
    assert_eq!(channels, vec![0, 0, 1]);
    assert_eq!(time_loads(&compiled), vec![0, 10, 15]);
}

#[test]
fn test_shared_pulse_shares_registers() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_clocks(UNIT_CLOCKS)
        .with_settings(quiet());
    let program = Program::new("p")
        .with_channel("ch2", "[X, Y]")
        .with_channel("ch4", "[5, X]");
    let compiled = compiler.compile(&program).unwrap();
    assert_eq!(compiled.registers.len(), 2);
    let x = compiled.registers[&PulseName::from("X")];
    let x_fires: Vec<(Channel, Register)> = fires(&compiled)
        .into_iter()
        .filter(|(_, register)| *register == x.frequency())
        .collect();
    assert_eq!(x_fires, vec![(2, x.frequency()), (4, x.frequency())]);
}

#[test]
fn test_register_exhaustion() {
    let pulses = pulses();
    let envelopes = envelopes();
    let small = Topology {
        num_pages: 2,
        registers_per_page: 12,
        ..REFERENCE_BOARD
    };
    assert_eq!(small.pulse_capacity(), 2);
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_topology(small)
        .with_clocks(UNIT_CLOCKS);
    let fits = Program::new("p").with_channel("ch0", "[A, B, A]");
    assert!(compiler.compile(&fits).is_ok());
    let too_many = Program::new("p").with_channel("ch0", "[A, B]").with_channel("ch1", "[C]");
    assert!(matches!(
        compiler.compile(&too_many),
        Err(Error::ResourceExhausted(_))
    ));
}

#[test]
fn test_loop_counters_are_not_reused() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes).with_clocks(UNIT_CLOCKS);
    let program = Program::new("p").with_channel(
        "ch0",
        "[loop(2,[A]), loop(2,[B]), loop(5,[loop(2,[C])])]",
    );
    let compiled = compiler.compile(&program).unwrap();
    let counters: Vec<(u32, Register)> = compiled
        .loop_counters
        .iter()
        .map(|(id, register)| (*id, *register))
        .collect();
    assert_eq!(
        counters,
        vec![
            (1, Register(1)),
            (2, Register(2)),
            (3, Register(3)),
            (4, Register(4))
        ]
    );
}

#[test]
fn test_loop_count_does_not_change_stream_size() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes).with_clocks(UNIT_CLOCKS);
    let once = compiler
        .compile(&Program::new("p").with_channel("ch0", "[loop(1,[X, 10, loop(1,[Y])])]"))
        .unwrap();
    let many = compiler
        .compile(&Program::new("p").with_channel("ch0", "[loop(1000000,[X, 10, loop(7,[Y])])]"))
        .unwrap();
    assert_eq!(
        once.asm.num_noncomment_statements(),
        many.asm.num_noncomment_statements()
    );
}

#[test]
fn test_repeated_compiles_are_independent() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes).with_clocks(UNIT_CLOCKS);
    let program = Program::new("p").with_channel("ch0", "[loop(2,[G, X]), Y]");
    let first = compiler.compile(&program).unwrap();
    let second = compiler.compile(&program).unwrap();
    assert_eq!(first.to_asm(), second.to_asm());
    assert_eq!(second.loop_counters[&1], Register(1));
}

#[test]
fn test_envelope_pulse() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_clocks(UNIT_CLOCKS)
        .with_settings(quiet());
    let program = Program::new("p").with_channel("ch3", "[G, G]");
    let compiled = compiler.compile(&program).unwrap();
    let registers = compiled.registers[&PulseName::from("G")];
    assert_eq!(registers.address(), Some(Register(3)));
    let asm = compiled.to_asm();
    // Address 0, product output, 64 samples are 4 fabric cycles
    assert!(asm.contains("regwi 1, $3, 0;\n"));
    assert!(asm.contains("regwi 1, $5, 524292;\n"));
    assert!(asm.contains("set 3, 1, $1, $2, $3, $4, $5, $31;\n"));
    // Second firing follows after the 4 ns envelope
    assert_eq!(time_loads(&compiled), vec![0, 4]);
    assert_eq!(compiled.waveform_memories.len(), 7);
    assert!(
        compiled
            .waveform_memories
            .iter()
            .all(|memory| memory.envelopes()["G"].address == 0)
    );
}

#[test]
fn test_undefined_references() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes);
    let program = Program::new("p").with_channel("ch0", "[X, nope]");
    assert!(matches!(
        compiler.compile(&program),
        Err(Error::UndefinedReference { kind: "pulse", .. })
    ));

    let programs = ProgramLibrary::new();
    assert!(matches!(
        compiler.compile_named("missing", &programs),
        Err(Error::UndefinedReference {
            kind: "program",
            ..
        })
    ));
}

#[test]
fn test_compile_named() {
    let pulses = pulses();
    let envelopes = envelopes();
    let programs = ProgramLibrary::from_json(
        r#"[{"name": "two", "prog_structure": {"ch0": "[X]", "ch1": "[Y]"}, "nqz": {"ch1": 2}}]"#,
    )
    .unwrap();
    let compiler = Compiler::new(&pulses, &envelopes);
    let compiled = compiler.compile_named("two", &programs).unwrap();
    assert_eq!(fires(&compiled).len(), 2);
    assert_eq!(
        compiled.generators,
        vec![
            GeneratorDeclaration {
                channel: 0,
                nyquist_zone: 1
            },
            GeneratorDeclaration {
                channel: 1,
                nyquist_zone: 2
            },
        ]
    );
}

#[test]
fn test_parse_error() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes);
    let program = Program::new("p").with_channel("ch0", "[X, loop(2,[Y]]");
    match compiler.compile(&program) {
        Err(Error::Parse(error)) => assert_eq!(error.line, "[X, loop(2,[Y]]"),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_pulse_range_errors() {
    let envelopes = envelopes();
    let loud =
        PulseLibrary::try_from_iter([PulseDefinition::constant("X", 0.0, 40000, 40)]).unwrap();
    let compiler = Compiler::new(&loud, &envelopes);
    let program = Program::new("p").with_channel("ch0", "[X]");
    assert!(matches!(compiler.compile(&program), Err(Error::Range(_))));

    let short = PulseLibrary::try_from_iter([PulseDefinition::constant("X", 0.0, 100, 2)]).unwrap();
    let compiler = Compiler::new(&short, &envelopes).with_clocks(UNIT_CLOCKS);
    assert!(matches!(compiler.compile(&program), Err(Error::Range(_))));
}

#[test]
fn test_wide_frequency_word_is_split() {
    let envelopes = envelopes();
    let pulses =
        PulseLibrary::try_from_iter([PulseDefinition::constant("X", 600.0, 100, 40)]).unwrap();
    let compiler = Compiler::new(&pulses, &envelopes)
        .with_clocks(UNIT_CLOCKS)
        .with_settings(quiet());
    let compiled = compiler
        .compile(&Program::new("p").with_channel("ch0", "[X]"))
        .unwrap();
    assert!(compiled.to_asm().contains("bitwi 1, $1, $1 << 2;\n"));
}

#[test]
fn test_empty_channel() {
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes).with_settings(quiet());
    let compiled = compiler
        .compile(&Program::new("p").with_channel("ch0", "[]"))
        .unwrap();
    assert_eq!(compiled.to_asm(), "synci 200;\nend;\n");
}

#[test]
fn test_generic_sink() {
    struct Counter(usize);
    impl tproc_asm::InstructionSink for Counter {
        fn emit(&mut self, _statement: AsmStatement) -> tproc_asm::Result<()> {
            self.0 += 1;
            Ok(())
        }
    }
    let pulses = pulses();
    let envelopes = envelopes();
    let compiler = Compiler::new(&pulses, &envelopes);
    let mut sink = Counter(0);
    let resources = compiler
        .compile_into(&Program::new("p").with_channel("ch0", "[X]"), &mut sink)
        .unwrap();
    assert_eq!(resources.registers.len(), 1);
    // Comment, 4 parameter loads, sync, time load, fire, end
    assert_eq!(sink.0, 9);
}

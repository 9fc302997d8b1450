// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! `tprocc`: compile a pulse program bundle into tProc assembly.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use indexmap::IndexMap;
use pulse_compiler::{
    CompiledProgram, Compiler, CompilerSettings, EnvelopeLibrary, GeneratorClocks, Program,
    ProgramLibrary, PulseDefinition, PulseLibrary, Topology,
};
use serde::Deserialize;
use tproc_log::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tprocc")]
#[command(about = "Compile a pulse program bundle into tProc assembly")]
struct Cli {
    /// JSON bundle with pulses, envelopes and programs
    bundle: PathBuf,

    /// Program to compile; may be omitted if the bundle holds a single program
    #[arg(long)]
    program: Option<String>,

    /// JSON board description overriding the one in the bundle
    #[arg(long)]
    board: Option<PathBuf>,

    /// Write the assembly to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Log compiler internals
    #[arg(long)]
    diagnostics: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Board {
    topology: Topology,
    clocks: GeneratorClocks,
    settings: CompilerSettings,
}

#[derive(Debug, Deserialize)]
struct Bundle {
    pulses: Vec<PulseDefinition>,
    #[serde(default)]
    envelopes: IndexMap<String, Vec<i32>>,
    programs: Vec<Program>,
    #[serde(default)]
    board: Option<Board>,
}

struct Libraries {
    pulses: PulseLibrary,
    envelopes: EnvelopeLibrary,
    programs: ProgramLibrary,
}

impl Bundle {
    fn into_libraries(self) -> anyhow::Result<(Libraries, Option<Board>)> {
        let pulses = PulseLibrary::try_from_iter(self.pulses)?;
        let mut envelopes = EnvelopeLibrary::new();
        for (name, samples) in self.envelopes {
            envelopes.insert(name, samples);
        }
        let mut programs = ProgramLibrary::new();
        for program in self.programs {
            programs.add(program)?;
        }
        Ok((
            Libraries {
                pulses,
                envelopes,
                programs,
            },
            self.board,
        ))
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn select_program(requested: Option<String>, programs: &ProgramLibrary) -> anyhow::Result<String> {
    if let Some(name) = requested {
        return Ok(name);
    }
    let names: Vec<&str> = programs.names().collect();
    match names.as_slice() {
        [name] => Ok(name.to_string()),
        [] => bail!("The bundle contains no programs"),
        _ => bail!(
            "The bundle contains several programs, select one with --program: {}",
            names.join(", ")
        ),
    }
}

fn compile(cli: &Cli) -> anyhow::Result<CompiledProgram> {
    let bundle: Bundle = read_json(&cli.bundle)?;
    let (libraries, bundled_board) = bundle.into_libraries()?;
    let board = match &cli.board {
        Some(path) => read_json(path)?,
        None => bundled_board.unwrap_or_default(),
    };
    let name = select_program(cli.program.clone(), &libraries.programs)?;
    let compiler = Compiler::new(&libraries.pulses, &libraries.envelopes)
        .with_topology(board.topology)
        .with_clocks(board.clocks)
        .with_settings(board.settings);
    let compiled = compiler
        .compile_named(&name, &libraries.programs)
        .with_context(|| format!("Failed to compile program '{name}'"))?;
    Ok(compiled)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tproc_log::init_logging(cli.diagnostics);

    let compiled = compile(&cli)?;
    let asm = compiled.to_asm();
    match &cli.output {
        Some(path) => {
            fs::write(path, &asm)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                "Wrote {} statements to {}",
                compiled.asm.num_noncomment_statements(),
                path.display()
            );
        }
        None => print!("{asm}"),
    }
    Ok(())
}

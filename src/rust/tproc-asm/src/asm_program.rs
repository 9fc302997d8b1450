// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::asm_statements::{AsmStatement, BitOp, MathOp, Page, Register};
use crate::{Cycles, Result};
use anyhow::anyhow;
use indexmap::IndexSet;

/// Immediates below this magnitude fit into a single `regwi`.
const REGWI_LIMIT: i64 = 1 << 30;
/// `synci` takes a 31 bit immediate.
pub const MAX_SYNC_CYCLES: Cycles = (1 << 31) - 1;

fn format_comment(comment: &Option<String>) -> String {
    match comment {
        Some(comment) if !comment.is_empty() => format!("  // {comment}"),
        _ => String::new(),
    }
}

/// Split an immediate load into statements the tProc can execute.
///
/// Values up to 30 bits are loaded directly. Wider values (up to the 32 bit register
/// width, signed or unsigned) are loaded shifted right by two, shifted back and
/// completed with the two low bits.
pub fn immediate_load(
    page: Page,
    register: Register,
    value: i64,
    comment: Option<String>,
) -> Result<Vec<AsmStatement>> {
    if register == Register::ZERO {
        return Err(anyhow!("Register {register} on page {page} is read-only").into());
    }
    if !(i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(&value) {
        return Err(anyhow!(
            "Immediate {value} for register {register} on page {page} exceeds 32 bits"
        )
        .into());
    }
    if value.abs() < REGWI_LIMIT {
        return Ok(vec![AsmStatement::RegisterWrite {
            page,
            register,
            value: value as i32,
            comment,
        }]);
    }
    let mut statements = vec![
        AsmStatement::RegisterWrite {
            page,
            register,
            value: (value >> 2) as i32,
            comment,
        },
        AsmStatement::BitwiseImmediate {
            page,
            destination: register,
            source: register,
            op: BitOp::ShiftLeft,
            value: 2,
        },
    ];
    let low_bits = value.rem_euclid(4);
    if low_bits != 0 {
        statements.push(AsmStatement::MathImmediate {
            page,
            destination: register,
            source: register,
            op: MathOp::Add,
            value: low_bits as i32,
        });
    }
    Ok(statements)
}

/// Receiver of the instruction stream.
///
/// The compiler never renders instructions itself; it hands each statement to a sink.
pub trait InstructionSink {
    fn emit(&mut self, statement: AsmStatement) -> Result<()>;

    /// Load `value` into `register`, splitting wide immediates if necessary.
    fn load_immediate(
        &mut self,
        page: Page,
        register: Register,
        value: i64,
        comment: Option<String>,
    ) -> Result<()> {
        for statement in immediate_load(page, register, value, comment)? {
            self.emit(statement)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AsmProgram {
    statements: Vec<AsmStatement>,
    emit_comments: bool,
}

impl Default for AsmProgram {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AsmProgram {
    pub fn new(emit_comments: bool) -> Self {
        Self {
            statements: Vec::new(),
            emit_comments,
        }
    }

    pub fn statements(&self) -> &Vec<AsmStatement> {
        &self.statements
    }

    pub fn num_noncomment_statements(&self) -> usize {
        self.statements.iter().filter(|s| !s.is_comment()).count()
    }

    pub fn add_sync(&mut self, cycles: Cycles) -> Result<()> {
        if cycles > MAX_SYNC_CYCLES {
            return Err(anyhow!(
                "synci({cycles}) exceeds the maximum of {MAX_SYNC_CYCLES} cycles"
            )
            .into());
        }
        self.statements.push(AsmStatement::SyncImmediate { cycles });
        Ok(())
    }

    pub fn add_label<S: Into<String>>(&mut self, name: S) -> Result<()> {
        let name: String = name.into();
        if self.has_label(&name) {
            return Err(anyhow!("Label '{name}' has already been declared").into());
        }
        self.statements.push(AsmStatement::Label { name });
        Ok(())
    }

    fn has_label(&self, name: &str) -> bool {
        self.statements
            .iter()
            .any(|s| matches!(s, AsmStatement::Label { name: n } if n == name))
    }

    /// Check the structural rules the tProc relies on.
    ///
    /// * Labels are unique.
    /// * `loopnz` branches backwards to the innermost label not yet closed by a branch.
    /// * `synci` fits its 31 bit immediate.
    /// * Register 0 is never written.
    /// * The last non-comment statement is `end`.
    pub fn validate(&self) -> Result<()> {
        let mut labels: IndexSet<&str> = IndexSet::new();
        let mut open: Vec<&str> = Vec::new();
        for statement in &self.statements {
            match statement {
                AsmStatement::Label { name } if !labels.insert(name) => {
                    return Err(anyhow!("Label '{name}' is declared more than once").into());
                }
                AsmStatement::Label { name } => open.push(name.as_str()),
                AsmStatement::LoopNotZero { label, .. } => match open.pop() {
                    Some(innermost) if innermost == label.as_str() => {}
                    Some(innermost) => {
                        return Err(anyhow!(
                            "Branch to label '{label}' while loop '{innermost}' is still open"
                        )
                        .into());
                    }
                    None => {
                        return Err(anyhow!(
                            "Branch to label '{label}' which is not declared before it"
                        )
                        .into());
                    }
                },
                AsmStatement::SyncImmediate { cycles } if *cycles > MAX_SYNC_CYCLES => {
                    return Err(anyhow!(
                        "synci({cycles}) exceeds the maximum of {MAX_SYNC_CYCLES} cycles"
                    )
                    .into());
                }
                _ => {}
            }
            if let Some((page, Register::ZERO)) = statement.written_register() {
                return Err(anyhow!("Write to read-only register $0 on page {page}").into());
            }
        }
        match self.statements.iter().rev().find(|s| !s.is_comment()) {
            Some(AsmStatement::End) => Ok(()),
            _ => Err(anyhow!("Program does not terminate with 'end'").into()),
        }
    }

    pub fn generate_asm(&self) -> String {
        self.statements
            .iter()
            .map(|statement| self.emit_statement(statement))
            .collect::<String>()
    }

    fn emit_statement(&self, statement: &AsmStatement) -> String {
        match statement {
            AsmStatement::Comment { text } => {
                if self.emit_comments {
                    format!("// {text}\n")
                } else {
                    String::new()
                }
            }
            AsmStatement::RegisterWrite {
                page,
                register,
                value,
                comment,
            } => {
                let comment = match self.emit_comments {
                    true => format_comment(comment),
                    false => String::new(),
                };
                format!("regwi {page}, {register}, {value};{comment}\n")
            }
            AsmStatement::BitwiseImmediate {
                page,
                destination,
                source,
                op,
                value,
            } => format!("bitwi {page}, {destination}, {source} {op} {value};\n"),
            AsmStatement::MathImmediate {
                page,
                destination,
                source,
                op,
                value,
            } => format!("mathi {page}, {destination}, {source} {op} {value};\n"),
            AsmStatement::SyncImmediate { cycles } => format!("synci {cycles};\n"),
            AsmStatement::Fire {
                channel,
                page,
                registers,
            } => format!(
                "set {channel}, {page}, {}, {}, {}, {}, {}, {};\n",
                registers.frequency,
                registers.phase,
                registers.address,
                registers.gain,
                registers.mode,
                registers.time
            ),
            AsmStatement::Label { name } => format!("{name}:\n"),
            AsmStatement::LoopNotZero {
                page,
                register,
                label,
            } => format!("loopnz {page}, {register}, @{label};\n"),
            AsmStatement::End => "end;\n".to_string(),
        }
    }
}

impl InstructionSink for AsmProgram {
    fn emit(&mut self, statement: AsmStatement) -> Result<()> {
        match statement {
            AsmStatement::SyncImmediate { cycles } => self.add_sync(cycles),
            AsmStatement::Label { name } => self.add_label(name),
            statement => {
                self.statements.push(statement);
                Ok(())
            }
        }
    }
}

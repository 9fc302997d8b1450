// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use indexmap::IndexSet;

use crate::LOOP_KEYWORD;
use crate::error::ParseError;
use crate::tokenizer::{scan, strip_whitespace};

/// Name of a pulse as referenced from a program line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct PulseName(pub String);

impl PulseName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PulseName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PulseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Idle time in nanoseconds.
    Wait(u64),
    Pulse(PulseName),
    /// Body executed `count` times by the hardware.
    Loop { count: u32, body: Vec<Token> },
}

fn parse_wait(raw: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|_| format!("'{raw}' is not a valid wait duration in nanoseconds"))
}

fn parse_count(raw: &str) -> Result<u32, String> {
    match raw.parse::<u32>() {
        Ok(0) => Err("loop count must be at least 1".to_string()),
        Ok(count) => Ok(count),
        Err(_) => Err(format!("'{raw}' is not a valid loop count")),
    }
}

fn parse_tokens(compact: &str) -> Result<Vec<Token>, String> {
    let raw_tokens = scan(compact)?;
    let mut tokens = Vec::with_capacity(raw_tokens.len());
    let mut raw_tokens = raw_tokens.into_iter();
    while let Some(raw) = raw_tokens.next() {
        let token = if raw == LOOP_KEYWORD {
            let (Some(count), Some(body)) = (raw_tokens.next(), raw_tokens.next()) else {
                return Err("incomplete loop".to_string());
            };
            Token::Loop {
                count: parse_count(&count)?,
                body: parse_tokens(&body)?,
            }
        } else if raw.starts_with(|c: char| c.is_ascii_digit()) {
            Token::Wait(parse_wait(&raw)?)
        } else {
            Token::Pulse(PulseName(raw))
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Parse one channel line into its token tree.
///
/// Loop bodies are parsed once, independent of the loop count.
pub fn parse_line(line: &str) -> Result<Vec<Token>, ParseError> {
    parse_tokens(&strip_whitespace(line)).map_err(|message| ParseError::new(line, message))
}

/// Distinct pulse names in order of first appearance.
pub fn collect_pulse_names<'a, I>(lines: I) -> IndexSet<PulseName>
where
    I: IntoIterator<Item = &'a [Token]>,
{
    fn visit(tokens: &[Token], names: &mut IndexSet<PulseName>) {
        for token in tokens {
            match token {
                Token::Pulse(name) => {
                    if !names.contains(name) {
                        names.insert(name.clone());
                    }
                }
                Token::Loop { body, .. } => visit(body, names),
                Token::Wait(_) => {}
            }
        }
    }
    let mut names = IndexSet::new();
    for tokens in lines {
        visit(tokens, &mut names);
    }
    names
}

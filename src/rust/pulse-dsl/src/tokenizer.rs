// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::LOOP_KEYWORD;
use crate::error::ParseError;

enum Mode {
    /// Reading a pulse name, a wait or the `loop` keyword.
    Item,
    /// Inside the parentheses of `loop(...)`.
    LoopArguments { closers: Vec<char> },
    /// Right after the closing parenthesis of a loop; only a separator may follow.
    AfterLoop,
}

fn closer_of(open: char) -> char {
    if open == '(' { ')' } else { ']' }
}

/// Whether `text` is exactly one bracketed list, i.e. the first `[` closes at the end.
fn is_single_list(text: &str) -> bool {
    if !text.starts_with('[') {
        return false;
    }
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return index + c.len_utf8() == text.len();
                }
            }
            _ => {}
        }
    }
    false
}

fn finish_item(item: &mut String, tokens: &mut Vec<String>) -> Result<(), String> {
    if item.is_empty() {
        return Err("empty item".to_string());
    }
    if item == LOOP_KEYWORD {
        return Err(format!("'{LOOP_KEYWORD}' is missing its arguments"));
    }
    tokens.push(std::mem::take(item));
    Ok(())
}

fn finish_loop(arguments: &str, tokens: &mut Vec<String>) -> Result<(), String> {
    let Some((count, body)) = arguments.split_once(',') else {
        return Err(format!("'{LOOP_KEYWORD}({arguments})' requires a count and a body"));
    };
    if count.is_empty() {
        return Err(format!("'{LOOP_KEYWORD}({arguments})' is missing its count"));
    }
    if !is_single_list(body) {
        return Err(format!("loop body '{body}' is not a bracketed list"));
    }
    if body == "[]" {
        return Err("empty loop body".to_string());
    }
    tokens.push(LOOP_KEYWORD.to_string());
    tokens.push(count.to_string());
    tokens.push(body.to_string());
    Ok(())
}

/// Scan a whitespace-free line. Errors carry only the message.
pub(crate) fn scan(compact: &str) -> Result<Vec<String>, String> {
    let inner = compact
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| "expected a list enclosed in '[' and ']'".to_string())?;
    let mut tokens = Vec::new();
    if inner.is_empty() {
        return Ok(tokens);
    }
    let mut item = String::new();
    let mut mode = Mode::Item;
    for c in inner.chars() {
        mode = match mode {
            Mode::Item => match c {
                ',' => {
                    finish_item(&mut item, &mut tokens)?;
                    Mode::Item
                }
                '(' if item == LOOP_KEYWORD => {
                    item.clear();
                    Mode::LoopArguments {
                        closers: vec![')'],
                    }
                }
                '(' => return Err(format!("unexpected '(' after '{item}'")),
                '[' | ']' | ')' => return Err(format!("unbalanced '{c}'")),
                _ => {
                    item.push(c);
                    Mode::Item
                }
            },
            Mode::LoopArguments { mut closers } => match c {
                '(' | '[' => {
                    closers.push(closer_of(c));
                    item.push(c);
                    Mode::LoopArguments { closers }
                }
                ')' | ']' => {
                    if closers.pop() != Some(c) {
                        return Err(format!("mismatched '{c}'"));
                    }
                    if closers.is_empty() {
                        finish_loop(&item, &mut tokens)?;
                        item.clear();
                        Mode::AfterLoop
                    } else {
                        item.push(c);
                        Mode::LoopArguments { closers }
                    }
                }
                _ => {
                    item.push(c);
                    Mode::LoopArguments { closers }
                }
            },
            Mode::AfterLoop => match c {
                ',' => Mode::Item,
                _ => return Err(format!("expected ',' after a loop, found '{c}'")),
            },
        };
    }
    match mode {
        Mode::Item => finish_item(&mut item, &mut tokens)?,
        Mode::LoopArguments { .. } => return Err("unbalanced loop arguments".to_string()),
        Mode::AfterLoop => {}
    }
    Ok(tokens)
}

pub(crate) fn strip_whitespace(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Split one channel line into raw tokens.
///
/// Loop bodies are kept as opaque bracketed strings, so that
/// `"[loop(2,[X, Y]), Z]"` becomes `["loop", "2", "[X,Y]", "Z"]`.
/// Whitespace is insignificant and removed.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    scan(&strip_whitespace(line)).map_err(|message| ParseError::new(line, message))
}

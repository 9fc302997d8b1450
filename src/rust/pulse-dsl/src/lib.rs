// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! The per-channel pulse sequence language.
//!
//! A line is a bracketed, comma separated list of items. An item is a pulse
//! name, a wait in nanoseconds or `loop(<count>, [<items>])`:
//!
//! ```
//! use pulse_dsl::{Token, parse_line};
//!
//! let tokens = parse_line("[loop(2, [X, 10]), Y]").unwrap();
//! assert!(matches!(&tokens[0], Token::Loop { count: 2, body } if body.len() == 2));
//! ```

mod error;
mod token;
mod tokenizer;

pub use error::ParseError;
pub use token::{PulseName, Token, collect_pulse_names, parse_line};
pub use tokenizer::tokenize;

/// Raw token introducing a repetition.
pub const LOOP_KEYWORD: &str = "loop";

// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Unit conversions between the physical quantities used to describe pulses
//! (nanoseconds, megahertz, degrees) and the integer words understood by the
//! tProc and its signal generators.

mod angle;
pub mod clock;
pub mod dds;

pub use angle::{Angle, Angle64};
pub use clock::{Clock, megahertz};
pub use dds::Dds;

// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::num::Wrapping;

use num_traits::{AsPrimitive, Float, FromPrimitive, PrimInt, Signed};

/// An angle stored as a fixed-point value in a signed integer.
///
/// The full range of the integer type maps to [-180°, 180°). A DDS phase
/// accumulator uses the same representation, which makes the raw bits directly
/// usable as a phase word.
///
/// # Examples
/// ```rust
/// use tproc_units::Angle64;
///
/// let angle = Angle64::from_degrees(90.0);
/// let wrapped = Angle64::from_degrees(450.0); // Same as 90°
/// assert_eq!(angle, wrapped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Angle<T>(Wrapping<T>)
where
    T: PrimInt + Signed;

impl<T> Angle<T>
where
    T: PrimInt + Signed + 'static,
{
    fn bit_size() -> u32 {
        T::zero().count_zeros()
    }

    fn period<F: Float + FromPrimitive>() -> F {
        F::from_u128(1 << Self::bit_size()).unwrap_or_else(F::infinity)
    }

    /// Normalize the value by wrapping to [-0.5, 0.5).
    fn normalize<F: Float>(value: F) -> F {
        let normalized = value.fract();
        if normalized + normalized >= F::one() {
            return normalized - F::one();
        }
        if normalized + normalized < -F::one() {
            return normalized + F::one();
        }
        normalized
    }

    /// Creates an angle from degrees. Values outside [-180, +180) will be wrapped.
    pub fn from_degrees<F>(degrees: F) -> Self
    where
        F: Float + AsPrimitive<T> + FromPrimitive,
    {
        let full_turn = F::from_u16(360).unwrap_or_else(F::one);
        let normalized = Self::normalize(degrees / full_turn);
        let scaled = normalized * Self::period();
        Self(Wrapping(scaled.round().as_()))
    }

    /// The angle as an unsigned phase word of `bits` width.
    ///
    /// The word counts from 0 at 0° up to `2^bits - 1` just below 360°, i.e.
    /// negative angles land in the upper half. Extra precision is truncated.
    pub fn to_phase_word(self, bits: u32) -> u64
    where
        T: AsPrimitive<i128>,
    {
        let size = Self::bit_size();
        let bits = bits.min(size);
        let raw: i128 = self.0.0.as_();
        let unsigned = raw.rem_euclid(1i128 << size);
        (unsigned >> (size - bits)) as u64
    }
}

pub type Angle64 = Angle<i64>;

//! Fixed-point payment token amounts.
//!
//! Amounts are stored as an integer count of minor units. The decimal scale
//! (6 for the default token) only matters at the client boundary, where
//! [`Amount::parse_units`] and [`Amount::format_units`] convert to and from
//! human decimals. The core never rounds.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OpenlotError, Result};

/// A non-negative quantity of the payment token, in minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the sum does not fit.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(OpenlotError::AmountOverflow)
    }

    /// Subtraction that refuses to go below zero.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Parse a human decimal ("12.5") into minor units at the given scale.
    ///
    /// # Errors
    /// - `InvalidAmount` if the string is not a decimal, is negative, or
    ///   carries more fractional digits than `decimals`
    /// - `AmountOverflow` if the scaled value does not fit in `u64`
    pub fn parse_units(text: &str, decimals: u32) -> Result<Self> {
        let value: Decimal = text
            .trim()
            .parse()
            .map_err(|_| OpenlotError::InvalidAmount {
                reason: format!("'{text}' is not a decimal number"),
            })?;
        Self::from_decimal(value, decimals)
    }

    /// Convert a decimal into minor units at the given scale.
    ///
    /// # Errors
    /// Same as [`Amount::parse_units`].
    pub fn from_decimal(value: Decimal, decimals: u32) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(OpenlotError::InvalidAmount {
                reason: format!("{value} is negative"),
            });
        }
        let normalized = value.normalize();
        if normalized.scale() > decimals {
            return Err(OpenlotError::InvalidAmount {
                reason: format!("{value} has more than {decimals} fractional digits"),
            });
        }
        let factor = Decimal::from(10u64.pow(decimals));
        let scaled = normalized
            .checked_mul(factor)
            .ok_or(OpenlotError::AmountOverflow)?;
        let units = u64::try_from(scaled).map_err(|_| OpenlotError::AmountOverflow)?;
        Ok(Self(units))
    }

    /// Exact decimal value at the given scale.
    #[must_use]
    pub fn to_decimal(self, decimals: u32) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), decimals)
    }

    /// Render for display at the given scale, trailing zeros removed.
    #[must_use]
    pub fn format_units(self, decimals: u32) -> String {
        self.to_decimal(decimals).normalize().to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(0u64, |acc, a| acc.saturating_add(a.0)))
    }
}

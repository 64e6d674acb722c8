//! Type-safe price representation using decimal arithmetic.
//!
//! The payment gateway charges in minor units (paise for INR), while the
//! catalog stores prices in major units (e.g., 19.99). The conversion lives
//! here so that no handler does float math on money.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price denominated in INR.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// The charge amount in minor units for `quantity` items:
    /// `round(amount * quantity * 100)`.
    ///
    /// Returns `None` if the result does not fit in an `i64` or is negative.
    #[must_use]
    pub fn total_paise(&self, quantity: u32) -> Option<i64> {
        let total = self.amount
            .checked_mul(Decimal::from(quantity))?
            .checked_mul(Decimal::ONE_HUNDRED)?;
        let paise = total.round().to_i64()?;
        (paise >= 0).then_some(paise)
    }

    /// The unit price in minor units.
    #[must_use]
    pub fn unit_paise(&self) -> Option<i64> {
        self.total_paise(1)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
}

impl CurrencyCode {
    /// The ISO 4217 code as a string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }
}

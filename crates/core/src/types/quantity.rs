//! Positive line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity was zero or negative.
    #[error("quantity must be positive, got {0}")]
    NotPositive(i64),
    /// Quantity does not fit in a line.
    #[error("quantity {0} exceeds the maximum of {max}", max = Quantity::MAX)]
    TooLarge(i64),
}

/// A cart line quantity, always greater than zero.
///
/// ## Examples
///
/// ```
/// use cartbridge_core::Quantity;
///
/// assert!(Quantity::new(1).is_ok());
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::from_signed(-3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a single line may hold.
    pub const MAX: u32 = 9_999;

    /// A quantity of one.
    pub const ONE: Self = Self(1);

    /// Create a quantity from an unsigned value.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is zero or above [`Quantity::MAX`].
    pub fn new(n: u32) -> Result<Self, QuantityError> {
        Self::from_signed(i64::from(n))
    }

    /// Create a quantity from a signed value, as received over the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is zero, negative or above [`Quantity::MAX`].
    pub fn from_signed(n: i64) -> Result<Self, QuantityError> {
        if n <= 0 {
            return Err(QuantityError::NotPositive(n));
        }
        u32::try_from(n)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Self)
            .ok_or(QuantityError::TooLarge(n))
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Add two quantities.
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` with the full sum if it exceeds [`Quantity::MAX`].
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        Self::from_signed(i64::from(self.0) + i64::from(other.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Self::from_signed(n)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive(0)));
        assert_eq!(
            Quantity::from_signed(-2),
            Err(QuantityError::NotPositive(-2))
        );
    }

    #[test]
    fn test_rejects_too_large() {
        assert!(matches!(
            Quantity::new(Quantity::MAX + 1),
            Err(QuantityError::TooLarge(_))
        ));
    }

    #[test]
    fn test_checked_add_reports_overflowing_sum() {
        let big = Quantity::new(Quantity::MAX).unwrap();
        assert_eq!(
            big.checked_add(Quantity::new(5).unwrap()),
            Err(QuantityError::TooLarge(10_004))
        );
        let two = Quantity::new(2).unwrap();
        assert_eq!(two.checked_add(Quantity::ONE).unwrap().get(), 3);
    }

    #[test]
    fn test_deserialize_validates() {
        let q: Quantity = serde_json::from_str("4").unwrap();
        assert_eq!(q.get(), 4);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert!(serde_json::from_str::<Quantity>("-1").is_err());
    }
}

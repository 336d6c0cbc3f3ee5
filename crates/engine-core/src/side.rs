//! Side (Buy / Sell) for orders and book halves.

use std::fmt;

use rust_decimal::Decimal;

/// Order side: Buy or Sell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order of this side matches against.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Returns `true` if an incoming order on this side with `limit`
    /// can trade against a resting order priced at `resting`.
    ///
    /// Buy crosses when `limit >= resting`, Sell when `limit <= resting`.
    pub fn crosses(self, limit: Decimal, resting: Decimal) -> bool {
        match self {
            Side::Buy => limit >= resting,
            Side::Sell => limit <= resting,
        }
    }

    /// Wire / log representation (`"BUY"` / `"SELL"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn crossing_is_inclusive_and_mirrored() {
        assert!(Side::Buy.crosses(dec!(100.0), dec!(100.0)));
        assert!(Side::Buy.crosses(dec!(101.0), dec!(100.0)));
        assert!(!Side::Buy.crosses(dec!(90.0), dec!(100.0)));

        assert!(Side::Sell.crosses(dec!(100.0), dec!(100.0)));
        assert!(Side::Sell.crosses(dec!(99.0), dec!(100.0)));
        assert!(!Side::Sell.crosses(dec!(101.0), dec!(100.0)));
    }

    #[test]
    fn opposite_and_display() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
        assert_eq!(Side::Sell.to_string(), "SELL");
    }
}

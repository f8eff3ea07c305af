//! Price formatting and decomposition.
//!
//! Both display paths work from the price rounded to whole cents, so the
//! fixed-decimal string and the integer/fraction split always agree.

use serde::Serialize;

/// A price split for oversized typographic rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceParts {
    /// Whole units, no grouping separators.
    pub integer: String,
    /// True when the cent remainder is non-zero.
    pub has_fraction: bool,
    /// Two-digit cent string without separator ("00" when there is none).
    pub fraction: String,
}

fn to_cents(price: f64) -> u64 {
    if !price.is_finite() || price <= 0.0 {
        return 0;
    }
    (price * 100.0).round() as u64
}

/// Split a price into integer and fractional display parts.
pub fn decompose(price: f64) -> PriceParts {
    let cents = to_cents(price);
    let fraction = cents % 100;
    PriceParts {
        integer: (cents / 100).to_string(),
        has_fraction: fraction != 0,
        fraction: format!("{fraction:02}"),
    }
}

/// Format a price with exactly two decimals, e.g. `12.50`.
pub fn format_fixed(price: f64) -> String {
    let cents = to_cents(price);
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Fixed two-decimal price followed by the currency suffix.
pub fn format_with_currency(price: f64, currency: &str) -> String {
    if currency.is_empty() {
        format_fixed(price)
    } else {
        format!("{} {}", format_fixed(price), currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_fractional_price() {
        let parts = decompose(12.50);
        assert_eq!(parts.integer, "12");
        assert!(parts.has_fraction);
        assert_eq!(parts.fraction, "50");
        assert_eq!(format!("{}.{}", parts.integer, parts.fraction), format_fixed(12.50));
    }

    #[test]
    fn integral_price_has_no_fraction() {
        let parts = decompose(12.00);
        assert_eq!(parts.integer, "12");
        assert!(!parts.has_fraction);
        assert_eq!(format_fixed(12.0), "12.00");
    }

    #[test]
    fn rounds_to_the_cent_consistently() {
        // 12.999 rounds up to 13.00 in both paths.
        let parts = decompose(12.999);
        assert_eq!(parts.integer, "13");
        assert!(!parts.has_fraction);
        assert_eq!(format_fixed(12.999), "13.00");

        let parts = decompose(0.05);
        assert_eq!(parts.integer, "0");
        assert_eq!(parts.fraction, "05");
    }

    #[test]
    fn currency_suffix() {
        assert_eq!(format_with_currency(3.5, "€"), "3.50 €");
        assert_eq!(format_with_currency(3.5, ""), "3.50");
    }

    #[test]
    fn reconstruction_matches_fixed_format() {
        for cents in [1u64, 99, 100, 101, 1250, 99999] {
            let price = cents as f64 / 100.0;
            let parts = decompose(price);
            let rebuilt = format!("{}.{}", parts.integer, parts.fraction);
            assert_eq!(rebuilt, format_fixed(price), "price {price}");
        }
    }
}

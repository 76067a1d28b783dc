//! Kubernetes resource quantity parsing
//!
//! Quantities are fixed-point decimals serialized with an optional suffix:
//!
//! ```text
//! <quantity>        ::= <signedNumber><suffix>
//! <suffix>          ::= <binarySI> | <decimalExponent> | <decimalSI>
//! <binarySI>        ::= Ki | Mi | Gi | Ti | Pi | Ei
//! <decimalSI>       ::= n | u | m | "" | k | M | G | T | P | E
//! <decimalExponent> ::= "e" <signedNumber> | "E" <signedNumber>
//! ```
//!
//! Values are approximated to the closest `f64`. Decimal scaling goes through
//! the float parser in scientific notation so `1500m` is exactly `1.5` rather
//! than the product `1500.0 * 0.001`.

use thiserror::Error;

/// Error returned when a quantity string does not follow the Kubernetes grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("quantity {0:?} has no numeric part")]
    MissingNumber(String),

    #[error("quantity {quantity:?} has unsupported suffix {suffix:?}")]
    UnsupportedSuffix { quantity: String, suffix: String },

    #[error("quantity {0:?} does not fit in a double")]
    OutOfRange(String),
}

/// Scale applied by a suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    /// Multiply by 10^n
    Decimal(i32),
    /// Multiply by 2^n
    Binary(i32),
}

/// Parse a Kubernetes quantity (e.g. `"1500m"`, `"2Gi"`, `"80"`) to a double
pub fn parse_quantity(input: &str) -> Result<f64, QuantityError> {
    if input.is_empty() {
        return Err(QuantityError::Empty);
    }

    let (number, suffix) = split_number(input);
    if !number.bytes().any(|b| b.is_ascii_digit()) {
        return Err(QuantityError::MissingNumber(input.to_string()));
    }

    let scale = parse_suffix(suffix).ok_or_else(|| QuantityError::UnsupportedSuffix {
        quantity: input.to_string(),
        suffix: suffix.to_string(),
    })?;

    let value = match scale {
        Scale::Decimal(exp) => format!("{}e{}", number, exp)
            .parse::<f64>()
            .map_err(|_| QuantityError::MissingNumber(input.to_string()))?,
        Scale::Binary(exp) => {
            let mantissa = number
                .parse::<f64>()
                .map_err(|_| QuantityError::MissingNumber(input.to_string()))?;
            mantissa * 2f64.powi(exp)
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(QuantityError::OutOfRange(input.to_string()))
    }
}

/// Split `input` into its signed decimal number and the remaining suffix
fn split_number(input: &str) -> (&str, &str) {
    let bytes = input.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    input.split_at(end)
}

fn parse_suffix(suffix: &str) -> Option<Scale> {
    let scale = match suffix {
        "" => Scale::Decimal(0),
        "n" => Scale::Decimal(-9),
        "u" => Scale::Decimal(-6),
        "m" => Scale::Decimal(-3),
        "k" => Scale::Decimal(3),
        "M" => Scale::Decimal(6),
        "G" => Scale::Decimal(9),
        "T" => Scale::Decimal(12),
        "P" => Scale::Decimal(15),
        "E" => Scale::Decimal(18),
        "Ki" => Scale::Binary(10),
        "Mi" => Scale::Binary(20),
        "Gi" => Scale::Binary(30),
        "Ti" => Scale::Binary(40),
        "Pi" => Scale::Binary(50),
        "Ei" => Scale::Binary(60),
        _ => return parse_exponent(suffix).map(Scale::Decimal),
    };
    Some(scale)
}

/// `e3`, `E-2`, `e+6`
fn parse_exponent(suffix: &str) -> Option<i32> {
    let rest = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))?;
    let digits = rest.strip_prefix(['+', '-']).unwrap_or(rest);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse::<i32>().ok()
}

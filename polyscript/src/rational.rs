use std::f64::consts::{E, PI};

use crate::localization::localize;

/// How a rational number is rendered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberMode {
    Decimal,
    ReducedFraction,
    #[default]
    IntAndFraction,
}

/// A fraction of two doubles.
///
/// Arithmetic stays exact while both parts are integers. As soon as either
/// part is fractional (or the denominator is zero) the value collapses into
/// the numerator and the denominator becomes 1.
#[derive(Debug, Clone, Copy)]
pub struct RationalNumber {
    numerator: f64,
    denominator: f64,
}

const FUZZY_TOLERANCE: f64 = 1e-10;

fn is_integer(x: f64) -> bool {
    x.is_finite() && x.fract() == 0.0
}

impl RationalNumber {
    pub fn new(numerator: f64, denominator: f64) -> Self {
        let r = Self {
            numerator,
            denominator,
        };
        if is_integer(denominator) { r } else { r.reduce() }
    }

    pub fn integer(value: f64) -> Self {
        Self::new(value, 1.0)
    }

    #[must_use]
    pub fn numerator(&self) -> f64 {
        self.numerator
    }

    #[must_use]
    pub fn denominator(&self) -> f64 {
        self.denominator
    }

    /// The decimal value of the fraction.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.numerator / self.denominator
    }

    #[must_use]
    pub fn reduce(self) -> Self {
        let Self {
            mut numerator,
            mut denominator,
        } = self;

        if !is_integer(denominator) || !is_integer(numerator) || denominator == 0.0 {
            numerator /= denominator;
            denominator = 1.0;
        } else if denominator != 1.0 {
            let sign = sign(numerator) * sign(denominator);
            numerator = numerator.abs();
            denominator = denominator.abs();

            let mut a = numerator.max(denominator);
            let mut b = numerator.min(denominator);
            while b != 0.0 {
                let t = b;
                b = a % b;
                a = t;
            }

            numerator /= a;
            denominator /= a;
            numerator *= sign;
        }

        Self {
            numerator,
            denominator,
        }
    }

    #[must_use]
    pub fn plus(&self, b: &RationalNumber) -> Self {
        Self::new(
            self.numerator * b.denominator + b.numerator * self.denominator,
            self.denominator * b.denominator,
        )
        .reduce()
    }

    #[must_use]
    pub fn minus(&self, b: &RationalNumber) -> Self {
        Self::new(
            self.numerator * b.denominator - b.numerator * self.denominator,
            self.denominator * b.denominator,
        )
        .reduce()
    }

    #[must_use]
    pub fn times(&self, b: &RationalNumber) -> Self {
        Self::new(self.numerator * b.numerator, self.denominator * b.denominator).reduce()
    }

    #[must_use]
    pub fn divided_by(&self, b: &RationalNumber) -> Self {
        Self::new(self.numerator * b.denominator, self.denominator * b.numerator).reduce()
    }

    /// Raises to a rational power; a negative exponent flips the fraction first.
    #[must_use]
    pub fn pow(&self, b: &RationalNumber) -> Self {
        let exponent = b.value();
        if exponent < 0.0 {
            Self::new(
                self.denominator.powf(-exponent),
                self.numerator.powf(-exponent),
            )
            .reduce()
        } else {
            self.powf(exponent)
        }
    }

    #[must_use]
    pub fn powf(&self, exponent: f64) -> Self {
        Self::new(
            self.numerator.powf(exponent),
            self.denominator.powf(exponent),
        )
        .reduce()
    }

    #[must_use]
    pub fn modulo(&self, b: &RationalNumber) -> Self {
        let d = self.denominator * b.denominator;
        let n1 = self.numerator * b.denominator;
        let n2 = b.numerator * self.denominator;
        Self::new(n1 % n2, d).reduce()
    }

    /// Exact equality, or closeness within 1e-10 when either side is whole.
    #[must_use]
    pub fn fuzzy_eq(&self, b: &RationalNumber) -> bool {
        self.value() == b.value()
            || ((self.denominator == 1.0 || b.denominator == 1.0)
                && (self.value() - b.value()).abs() < FUZZY_TOLERANCE)
    }

    /// Renders the number.
    ///
    /// With `serialize` set the output is locale-free and parses back through
    /// the number block grammar without loss.
    pub fn to_text(&self, mode: NumberMode, should_round: bool, serialize: bool) -> String {
        let text = |key: &str, fallback: &str| {
            if serialize {
                fallback.to_owned()
            } else {
                localize(key, fallback, &[])
            }
        };

        if self.numerator == 0.0 && self.denominator == 0.0 {
            return text("NumberBlock.notANumber", "NaN");
        }
        if self.numerator == 0.0 {
            return text("NumberBlock.zero", "0");
        }

        if self.denominator == 1.0 || mode == NumberMode::Decimal {
            let n = self.value();

            if n == PI {
                return text("NumberBlock.pi", "π");
            } else if n == E {
                return text("NumberBlock.eulersNumber", "e");
            } else if n.abs() < 1e-15 && should_round {
                return text("NumberBlock.zero", "0");
            } else if n == f64::INFINITY {
                return text("NumberBlock.infinity", "∞");
            } else if n == f64::NEG_INFINITY {
                return text("NumberBlock.negativeInfinity", "-∞");
            } else if n.is_nan() {
                return text("NumberBlock.notANumber", "NaN");
            }

            if serialize {
                return format!("{}", n);
            }

            if !should_round && !is_integer(n) {
                let full = shortest_number_string(n);
                return match full.find('.') {
                    Some(dot) => full.chars().take(dot + 4).collect(),
                    None => full,
                };
            }

            let exact = locale_string(n);
            let magnitude = n.abs();
            let most_significant_digit = magnitude.log10().floor();

            if !(-3.0..=7.0).contains(&most_significant_digit) {
                return to_exponential(n, 2);
            }

            let decimal_part = magnitude - magnitude.floor();
            if decimal_part < 1e-15 || !should_round {
                return exact;
            }

            let fixed = format!("{:.3}", n);
            if exact.chars().count() <= 9 {
                exact
            } else if fixed.len() > 8 {
                to_exponential(n, 2)
            } else {
                fixed
            }
        } else if mode == NumberMode::IntAndFraction {
            let int_part = (self.numerator / self.denominator).trunc();
            let fractional = ((self.numerator - self.denominator * int_part) % self.denominator).abs();

            if fractional == 0.0 {
                return if serialize {
                    format!("{}", int_part)
                } else {
                    locale_string(int_part)
                };
            }

            let lead = if int_part != 0.0 {
                format!("{} ", shortest_number_string(int_part))
            } else if self.numerator < 0.0 {
                "-".to_owned()
            } else {
                String::new()
            };
            format!(
                "{}{}/{}",
                lead,
                shortest_number_string(fractional),
                shortest_number_string(self.denominator)
            )
        } else if serialize {
            format!("{}/{}", self.numerator, self.denominator)
        } else {
            format!(
                "{}/{}",
                shortest_number_string(self.numerator),
                shortest_number_string(self.denominator)
            )
        }
    }
}

impl Default for RationalNumber {
    fn default() -> Self {
        Self::integer(0.0)
    }
}

impl From<f64> for RationalNumber {
    fn from(value: f64) -> Self {
        Self::integer(value)
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Shortest round-trip text of `x`, switching to exponent notation outside
/// `1e-6 <= |x| < 1e21`.
pub fn shortest_number_string(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_owned();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        return with_signed_exponent(format!("{:e}", x));
    }
    format!("{}", x)
}

/// `x` with `digits` fraction digits in exponent notation, e.g. `1.23e+8`.
pub fn to_exponential(x: f64, digits: usize) -> String {
    with_signed_exponent(format!("{:.*e}", digits, x))
}

fn with_signed_exponent(s: String) -> String {
    match s.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => s,
    }
}

/// Grouped decimal text with at most three fraction digits, e.g. `1,234.5`.
pub fn locale_string(x: f64) -> String {
    let fixed = format!("{:.3}", x.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let negative = x < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

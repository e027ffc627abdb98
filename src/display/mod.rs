//! Display readout.
//!
//! The display surface is an external collaborator behind [`DisplaySink`];
//! the core only decides *what* it shows: a rounded population figure with
//! thousands separators and a percent-of-reference line.

use serde::{Deserialize, Serialize};

/// What the population readout shows after a successful query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayReading {
    /// Rounded aggregate population.
    pub population: i64,
    /// `""` for a zero population, otherwise a share of the reference
    /// population (see [`percent_of_reference`]).
    pub percent_of_reference: String,
}

/// The display surface. Implementations render; the core never waits on
/// them.
pub trait DisplaySink {
    fn show(&mut self, reading: DisplayReading);
}

/// Build the reading for a population value against the fixed reference.
pub fn reading(value: f64, reference_population: f64) -> DisplayReading {
    DisplayReading {
        population: value.round() as i64,
        percent_of_reference: percent_of_reference(value, reference_population),
    }
}

/// Group digits in threes for the population readout.
pub fn format_population(value: f64) -> String {
    let n = value.round() as i64;
    let digits = n.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 { format!("-{grouped}") } else { grouped }
}

/// Percent-of-reference line.
///
/// Exactly zero population reads as an empty string; a nonzero share below
/// 0.01% reads as the literal `"< 0.01% of reference population"`;
/// everything else is formatted with two decimals.
pub fn percent_of_reference(value: f64, reference: f64) -> String {
    if value == 0.0 || reference <= 0.0 {
        return String::new();
    }
    let percent = value / reference * 100.0;
    if percent < 0.01 {
        "< 0.01% of reference population".to_string()
    } else {
        format!("{percent:.2}% of reference population")
    }
}

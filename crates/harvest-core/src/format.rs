//! Human-readable rendering of [`BigNumber`] values.
//!
//! Values below one million are printed as grouped integers. From one million
//! upward the value is divided by the largest power-of-1000 step it reaches and
//! printed with up to two truncated fractional digits plus a suffix chosen by
//! the configured [`Notation`].

use serde::{Deserialize, Serialize};

use crate::config::FormatConfig;
use crate::number::BigNumber;

/// Suffix scheme for values of one million and above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notation {
    /// Long-scale Portuguese names, then scientific past `Centilhão`.
    #[default]
    Named,
    /// `M`, `B`, `T`, then `AA`…`ZZZZZ` with a superscript cycle marker.
    Letters,
    /// `m.mme<exp>` for everything from one million up.
    Scientific,
}

/// Long-scale names for steps 10^6, 10^9, …, 10^303.
pub const NAMED_SUFFIXES: [&str; 100] = [
    "Milhão", "Bilhão", "Trilhão", "Quadrilhão", "Quintilhão", "Sextilhão",
    "Septilhão", "Octilhão", "Nonilhão", "Decilhão", "Undecilhão", "Duodecilhão",
    "Tredecilhão", "Quatuordecilhão", "Quindecilhão", "Sexdecilhão",
    "Septendecilhão", "Octodecilhão", "Novendecilhão", "Vigintilhão",
    "Unvigintilhão", "Duovigintilhão", "Trevigintilhão", "Quatuorvigintilhão",
    "Quinvigintilhão", "Sexvigintilhão", "Septenvigintilhão", "Octovigintilhão",
    "Novenvigintilhão", "Trigintilhão", "Untrigintilhão", "Duotrigintilhão",
    "Tretrigintilhão", "Quatuortrigintilhão", "Quintrigintilhão",
    "Sextrigintilhão", "Septentrigintilhão", "Octotrigintilhão",
    "Noventrigintilhão", "Quadragintilhão", "Unquadragintilhão",
    "Duoquadragintilhão", "Trequadragintilhão", "Quatuorquadragintilhão",
    "Quinquadragintilhão", "Sexquadragintilhão", "Septenquadragintilhão",
    "Octoquadragintilhão", "Novenquadragintilhão", "Quinquagintilhão",
    "Unquinquagintilhão", "Duoquinquagintilhão", "Trequinquagintilhão",
    "Quatuorquinquagintilhão", "Quinquinquagintilhão", "Sexquinquagintilhão",
    "Septenquinquagintilhão", "Octoquinquagintilhão", "Novenquinquagintilhão",
    "Sexagintilhão", "Unsexagintilhão", "Duosexagintilhão", "Tresexagintilhão",
    "Quatuorsexagintilhão", "Quinsexagintilhão", "Sexsexagintilhão",
    "Septensexagintilhão", "Octosexagintilhão", "Novensexagintilhão",
    "Septuagintilhão", "Unseptuagintilhão", "Duoseptuagintilhão",
    "Treseptuagintilhão", "Quatuorseptuagintilhão", "Quinseptuagintilhão",
    "Sexseptuagintilhão", "Septenseptuagintilhão", "Octoseptuagintilhão",
    "Novenseptuagintilhão", "Octogintilhão", "Unoctogintilhão",
    "Duooctogintilhão", "Treoctogintilhão", "Quatuoroctogintilhão",
    "Quinoctogintilhão", "Sexoctogintilhão", "Septenoctogintilhão",
    "Octooctogintilhão", "Novenoctogintilhão", "Nonagintilhão",
    "Unnonagintilhão", "Duononagintilhão", "Trenonagintilhão",
    "Quatuornonagintilhão", "Quinnonagintilhão", "Sexnonagintilhão",
    "Septennonagintilhão", "Octononagintilhão", "Novennonagintilhão",
    "Centilhão",
];

const SHORT_SUFFIXES: [&str; 3] = ["M", "B", "T"];

/// Letter suffixes per phase (AA, AAA, AAAA, AAAAA) before the cycle repeats.
const LETTER_PHASES: i64 = 4;
const LETTERS_PER_CYCLE: i64 = 26 * LETTER_PHASES;

/// Separator between the number and a named suffix.
const NAMED_GAP: char = '\u{00A0}';

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// Formats numbers according to a [`FormatConfig`].
#[derive(Debug, Clone, Default)]
pub struct NumberFormatter {
    config: FormatConfig,
}

impl NumberFormatter {
    pub fn new(config: FormatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    pub fn format(&self, value: &BigNumber) -> String {
        if value.is_negative() {
            return format!("-{}", self.format(&value.abs()));
        }
        let exp = value.exponent();
        if exp < 6 {
            return self.grouped(value.floor().to_f64() as u64);
        }

        let step = exp / 3;
        match self.config.notation {
            Notation::Scientific => self.scientific(value),
            Notation::Named => {
                let index = (step - 2) as usize;
                match NAMED_SUFFIXES.get(index) {
                    Some(name) => format!("{}{NAMED_GAP}{name}", self.scaled(value, step)),
                    None => self.scientific(value),
                }
            }
            Notation::Letters => format!("{}{}", self.scaled(value, step), letter_suffix(step)),
        }
    }

    /// Integer with thousands grouping.
    fn grouped(&self, v: u64) -> String {
        let digits = v.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(self.config.thousands_separator);
            }
            out.push(ch);
        }
        out
    }

    /// `value / 1000^step`, truncated to two fractional digits with trailing
    /// zeros dropped.
    fn scaled(&self, value: &BigNumber, step: i64) -> String {
        let (mantissa, exp) = value.parts();
        let quotient = mantissa * 10f64.powi((exp - step * 3) as i32);
        self.two_places(quotient, 99_999)
    }

    fn scientific(&self, value: &BigNumber) -> String {
        let (mantissa, exp) = value.parts();
        let hundredths = truncate_hundredths(mantissa, 999);
        format!(
            "{}{}{:02}e{exp}",
            hundredths / 100,
            self.config.decimal_separator,
            hundredths % 100
        )
    }

    fn two_places(&self, v: f64, ceiling: u64) -> String {
        let hundredths = truncate_hundredths(v, ceiling);
        let whole = hundredths / 100;
        let frac = hundredths % 100;
        let sep = self.config.decimal_separator;
        if frac == 0 {
            whole.to_string()
        } else if frac % 10 == 0 {
            format!("{whole}{sep}{}", frac / 10)
        } else {
            format!("{whole}{sep}{frac:02}")
        }
    }
}

/// `floor(v × 100)` with a small tolerance for representation error, capped
/// so a value just under a step boundary never renders as the next step.
fn truncate_hundredths(v: f64, ceiling: u64) -> u64 {
    let raw = (v * 100.0 + 1e-9).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as u64).min(ceiling)
    }
}

/// Suffix for power-of-1000 `step` (≥ 2) in [`Notation::Letters`].
pub fn letter_suffix(step: i64) -> String {
    if step < 5 {
        let idx = (step - 2).clamp(0, 2) as usize;
        return SHORT_SUFFIXES[idx].to_string();
    }
    let aa_index = step - 5;
    let cycle = aa_index / LETTERS_PER_CYCLE;
    let within = aa_index % LETTERS_PER_CYCLE;
    let phase = within / 26;
    let letter = char::from(b'A' + (within % 26) as u8);
    let mut suffix: String = std::iter::repeat_n(letter, (phase + 2) as usize).collect();
    if cycle > 0 {
        suffix.push_str(&superscript(cycle + 1));
    }
    suffix
}

fn superscript(n: i64) -> String {
    n.to_string()
        .chars()
        .filter_map(|d| d.to_digit(10))
        .map(|d| SUPERSCRIPT_DIGITS[d as usize])
        .collect()
}

/// Format with the default configuration.
pub fn format_number(value: &BigNumber) -> String {
    NumberFormatter::default().format(value)
}

/// Cycle time in seconds, at most two fractional digits, for a base duration
/// sped up by `speed`.
pub fn format_duration_secs(duration_ms: u64, speed: f64) -> String {
    let speed = if speed > 0.0 { speed } else { 1.0 };
    let secs = duration_ms as f64 / 1000.0 / speed;
    let hundredths = (secs * 100.0).round() as u64;
    let whole = hundredths / 100;
    let frac = hundredths % 100;
    if frac == 0 {
        format!("{whole}s")
    } else if frac % 10 == 0 {
        format!("{whole}.{}s", frac / 10)
    } else {
        format!("{whole}.{frac:02}s")
    }
}

//! Typed extraction of values from a section.
//!
//! A key describes one named value and where to store it. Consumers build a
//! list of keys over their own variables and hand it to
//! [`Entry::parse_key_values`](crate::Entry::parse_key_values).

use std::{env, fmt::Display};

use thiserror::Error;

use crate::Diagnostic;

/// Reasons a key rejects a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Numeric value below the allowed minimum; the minimum was stored.
    #[error("value too low, min value {0}")]
    TooLow(String),
    /// Numeric value above the allowed maximum; the maximum was stored.
    #[error("value too high, max value {0}")]
    TooHigh(String),
    /// String shorter than required; the default was kept.
    #[error("value too short, min length {0}")]
    TooShort(usize),
    /// Not a recognised boolean; the default was stored.
    #[error("invalid boolean '{0}'")]
    InvalidBool(String),
}

/// Outcome of [`Entry::parse_key_values`](crate::Entry::parse_key_values).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyReport {
    /// Names of the keys that had a matching entry, in key order.
    pub found: Vec<String>,
    /// Values that were present but rejected.
    pub errors: Vec<Diagnostic>,
}

impl KeyReport {
    /// True if a key named `name` (case-insensitive) was found.
    pub fn was_found(&self, name: &str) -> bool {
        self.found.iter().any(|f| f.eq_ignore_ascii_case(name))
    }
}

/// A named value extracted from a section.
pub trait CfgKey {
    /// Entry name this key reads.
    fn name(&self) -> &str;

    /// Parse `value` and store it in the key's target.
    fn parse_value(&mut self, value: &str) -> Result<(), KeyError>;
}

/// Numeric types usable with [`KeyNumeric`].
pub trait Numeric: Copy + PartialOrd + Display {
    /// Smallest representable value.
    const MIN: Self;
    /// Largest representable value.
    const MAX: Self;
    /// Zero.
    const ZERO: Self;

    /// Convert a parsed float, saturating at the type's bounds.
    fn from_f64(v: f64) -> Self;
}

/// Implement [`Numeric`] for primitive types.
macro_rules! numeric {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;
                const ZERO: Self = 0 as $t;

                fn from_f64(v: f64) -> Self {
                    v as $t
                }
            }
        )*
    };
}

numeric!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

/// A numeric key with default and inclusive bounds.
pub struct KeyNumeric<'a, T: Numeric> {
    /// Entry name.
    name: String,
    /// Where the parsed value goes.
    target: &'a mut T,
    /// Stored when the value is not a number.
    default: T,
    /// Inclusive lower bound.
    min: T,
    /// Inclusive upper bound.
    max: T,
}

impl<'a, T: Numeric> KeyNumeric<'a, T> {
    /// Key over the full range of `T` with a default of zero.
    pub fn new(name: &str, target: &'a mut T) -> Self {
        Self {
            name: name.to_string(),
            target,
            default: T::ZERO,
            min: T::MIN,
            max: T::MAX,
        }
    }

    /// Value stored when the entry is not a number.
    pub fn default(mut self, default: T) -> Self {
        self.default = default;
        self
    }

    /// Restrict accepted values to `min..=max`.
    pub fn range(mut self, min: T, max: T) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

impl<T: Numeric> CfgKey for KeyNumeric<'_, T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse_value(&mut self, value: &str) -> Result<(), KeyError> {
        let Some(parsed) = leading_number(value) else {
            *self.target = self.default;
            return Ok(());
        };
        let v = T::from_f64(parsed);
        if v < self.min {
            *self.target = self.min;
            return Err(KeyError::TooLow(self.min.to_string()));
        }
        if v > self.max {
            *self.target = self.max;
            return Err(KeyError::TooHigh(self.max.to_string()));
        }
        *self.target = v;
        Ok(())
    }
}

/// The longest decimal number at the start of `value`, ignoring leading
/// whitespace and whatever follows, so `"42px"` reads as 42.
fn leading_number(value: &str) -> Option<f64> {
    let value = value.trim_start();
    let len = value
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(value.len());
    (1..=len).rev().find_map(|end| value[..end].parse::<f64>().ok())
}

/// A boolean key: `true`/`1` and `false`/`0`, case-insensitive.
pub struct KeyBool<'a> {
    /// Entry name.
    name: String,
    /// Where the parsed value goes.
    target: &'a mut bool,
    /// Stored when the value is not recognised.
    default: bool,
}

impl<'a> KeyBool<'a> {
    /// Boolean key with the given default.
    pub fn new(name: &str, target: &'a mut bool, default: bool) -> Self {
        Self {
            name: name.to_string(),
            target,
            default,
        }
    }
}

impl CfgKey for KeyBool<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse_value(&mut self, value: &str) -> Result<(), KeyError> {
        let v = value.trim();
        if v.eq_ignore_ascii_case("true") || v == "1" {
            *self.target = true;
        } else if v.eq_ignore_ascii_case("false") || v == "0" {
            *self.target = false;
        } else {
            *self.target = self.default;
            return Err(KeyError::InvalidBool(value.to_string()));
        }
        Ok(())
    }
}

/// A string key with an optional minimum length.
pub struct KeyString<'a> {
    /// Entry name.
    name: String,
    /// Where the value goes; holds the default until a value is parsed.
    target: &'a mut String,
    /// Minimum length in characters.
    min_len: usize,
}

impl<'a> KeyString<'a> {
    /// String key; `target` is set to `default` immediately.
    pub fn new(name: &str, target: &'a mut String, default: &str) -> Self {
        default.clone_into(target);
        Self {
            name: name.to_string(),
            target,
            min_len: 0,
        }
    }

    /// Reject values shorter than `min_len` characters.
    pub fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }
}

impl CfgKey for KeyString<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse_value(&mut self, value: &str) -> Result<(), KeyError> {
        if value.chars().count() < self.min_len {
            return Err(KeyError::TooShort(self.min_len));
        }
        value.clone_into(self.target);
        Ok(())
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &str) -> String {
    match path.strip_prefix('~') {
        Some(rest) => format!("{}{}", env::var("HOME").unwrap_or_default(), rest),
        None => path.to_string(),
    }
}

/// A filesystem path key; a leading `~` is expanded.
pub struct KeyPath<'a> {
    /// Entry name.
    name: String,
    /// Where the expanded path goes.
    target: &'a mut String,
}

impl<'a> KeyPath<'a> {
    /// Path key; `target` is set to the expanded `default` immediately.
    pub fn new(name: &str, target: &'a mut String, default: &str) -> Self {
        *target = expand_home(default);
        Self {
            name: name.to_string(),
            target,
        }
    }
}

impl CfgKey for KeyPath<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse_value(&mut self, value: &str) -> Result<(), KeyError> {
        *self.target = expand_home(value);
        Ok(())
    }
}

//! Signal vocabulary.
//!
//! `SignalValue` is the raw, unordered value a remote signal carries.
//! `StateLabel` is the semantic device state derived from those values,
//! and `StateEntry` is one cell of a signal-state lookup table: either a
//! label or the `Defer` marker for readings that do not discriminate
//! between states.

use core::fmt;
use core::str::FromStr;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;

// ─── SignalValue ────────────────────────────────────────────────────

/// Raw discrete value read from a Signal Binding.
///
/// No ordering is assumed between values. Booleans are carried as
/// `Int(0)` / `Int(1)`, matching how limit switches report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Integer or enumeration index.
    Int(i64),
    /// Enumerated string value.
    Str(String),
}

impl SignalValue {
    /// Parse a lookup-table key.
    ///
    /// TOML table keys are always strings, so `"1"` becomes `Int(1)` and
    /// anything that is not an integer stays a string.
    pub fn from_key(key: &str) -> Self {
        match key.trim().parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Str(key.to_string()),
        }
    }

    /// Integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(_) => None,
        }
    }

    /// String payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(s) => Some(s),
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for SignalValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for SignalValue {
    fn from(n: i32) -> Self {
        Self::Int(n as i64)
    }
}

impl From<bool> for SignalValue {
    fn from(b: bool) -> Self {
        Self::Int(b as i64)
    }
}

impl From<&str> for SignalValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for SignalValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<'de> Deserialize<'de> for SignalValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl Visitor<'_> for ValueVisitor {
            type Value = SignalValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer, boolean or string signal value")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<SignalValue, E> {
                Ok(SignalValue::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SignalValue, E> {
                Ok(SignalValue::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SignalValue, E> {
                i64::try_from(v)
                    .map(SignalValue::Int)
                    .map_err(|_| E::custom(format!("signal value {v} out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SignalValue, E> {
                Ok(SignalValue::Str(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<SignalValue, E> {
                Ok(SignalValue::Str(v))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

// ─── StateLabel ─────────────────────────────────────────────────────

/// Semantic device state (`"IN"`, `"OUT"`, `"UNKNOWN"`, ...).
///
/// Labels are normalized to upper case. `UNKNOWN` is the implicit
/// fallback of every device class and can never be commanded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateLabel(Cow<'static, str>);

impl StateLabel {
    /// Fallback for ambiguous, conflicting or missing evidence.
    pub const UNKNOWN: Self = Self(Cow::Borrowed("UNKNOWN"));
    /// Device inserted into the beam / valve closed.
    pub const IN: Self = Self(Cow::Borrowed("IN"));
    /// Device removed from the beam / valve open.
    pub const OUT: Self = Self(Cow::Borrowed("OUT"));

    /// Build a label, normalizing to upper case.
    ///
    /// An empty string yields `UNKNOWN`.
    pub fn new(label: impl AsRef<str>) -> Self {
        let normalized = label.as_ref().trim().to_ascii_uppercase();
        match normalized.as_str() {
            "" | "UNKNOWN" => Self::UNKNOWN,
            "IN" => Self::IN,
            "OUT" => Self::OUT,
            _ => Self(Cow::Owned(normalized)),
        }
    }

    /// Label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the `UNKNOWN` fallback.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.as_str() == "UNKNOWN"
    }
}

impl Default for StateLabel {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StateLabel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("state label cannot be empty".to_string());
        }
        if trimmed.eq_ignore_ascii_case(StateEntry::DEFER_KEYWORD) {
            return Err(format!("{trimmed:?} is reserved and cannot be a state label"));
        }
        Ok(Self::new(trimmed))
    }
}

impl From<&str> for StateLabel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StateLabel {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Serialize for StateLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StateLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ─── StateEntry ─────────────────────────────────────────────────────

/// One cell of a signal-state lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateEntry {
    /// The raw value indicates this state.
    Label(StateLabel),
    /// The raw value is uninformative; it neither supports nor
    /// contradicts any state.
    Defer,
}

impl StateEntry {
    /// Keyword used in configuration files for [`StateEntry::Defer`].
    pub const DEFER_KEYWORD: &'static str = "defer";

    /// Label carried by this entry, `None` for `Defer`.
    pub fn label(&self) -> Option<&StateLabel> {
        match self {
            Self::Label(label) => Some(label),
            Self::Defer => None,
        }
    }
}

impl From<StateLabel> for StateEntry {
    fn from(label: StateLabel) -> Self {
        Self::Label(label)
    }
}

impl FromStr for StateEntry {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(Self::DEFER_KEYWORD) {
            Ok(Self::Defer)
        } else {
            s.parse().map(Self::Label)
        }
    }
}

impl fmt::Display for StateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => fmt::Display::fmt(label, f),
            Self::Defer => f.write_str(Self::DEFER_KEYWORD),
        }
    }
}

impl Serialize for StateEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parsing_prefers_integers() {
        assert_eq!(SignalValue::from_key("0"), SignalValue::Int(0));
        assert_eq!(SignalValue::from_key(" -3 "), SignalValue::Int(-3));
        assert_eq!(
            SignalValue::from_key("OUT"),
            SignalValue::Str("OUT".to_string())
        );
    }

    #[test]
    fn bool_values_are_integers() {
        assert_eq!(SignalValue::from(true), SignalValue::Int(1));
        assert_eq!(SignalValue::from(false), SignalValue::Int(0));
    }

    #[test]
    fn signal_value_deserializes_mixed_types() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            a: SignalValue,
            b: SignalValue,
            c: SignalValue,
        }
        let w: Wrapper = toml::from_str("a = 1\nb = true\nc = \"IN\"").unwrap();
        assert_eq!(w.a, SignalValue::Int(1));
        assert_eq!(w.b, SignalValue::Int(1));
        assert_eq!(w.c, SignalValue::Str("IN".to_string()));
    }

    #[test]
    fn labels_normalize_case() {
        assert_eq!(StateLabel::new("in"), StateLabel::IN);
        assert_eq!(StateLabel::new(" Out "), StateLabel::OUT);
        assert_eq!(StateLabel::new("moving").as_str(), "MOVING");
        assert!(StateLabel::new("").is_unknown());
        assert!(StateLabel::default().is_unknown());
    }

    #[test]
    fn defer_is_not_a_label() {
        assert!("defer".parse::<StateLabel>().is_err());
        assert!("".parse::<StateLabel>().is_err());
        assert_eq!("DEFER".parse::<StateEntry>().unwrap(), StateEntry::Defer);
        assert_eq!(
            "in".parse::<StateEntry>().unwrap(),
            StateEntry::Label(StateLabel::IN)
        );
    }

    #[test]
    fn state_entry_roundtrips_through_toml() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Wrapper {
            entry: StateEntry,
        }
        let w = Wrapper {
            entry: StateEntry::Defer,
        };
        let text = toml::to_string(&w).unwrap();
        assert!(text.contains("defer"));
        assert_eq!(toml::from_str::<Wrapper>(&text).unwrap(), w);
    }
}

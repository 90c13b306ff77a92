//! Static extension configuration.
//!
//! # Responsibility
//! - Describe the extension values, their feedback colors and the trigger
//!   identifiers that select them.
//! - Name the host members the extension reads, writes and hooks.
//!
//! # Invariants
//! - Entry values are finite and strictly ascending, hence distinct.
//! - Trigger `i` targets domain index `i + native_domain_len`, so there are
//!   never more triggers than entries.
//! - The table is built in-process and never loaded from disk.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// 8-bit RGBA display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// One value appended to the host domain, with its display color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    pub value: f32,
    pub color: Color,
}

impl ExtensionEntry {
    pub const fn new(value: f32, color: Color) -> Self {
        Self { value, color }
    }
}

/// External input identifier, e.g. a key code name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerId(String);

impl TriggerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TriggerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TriggerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Whether a host session change reopens the initialization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateResetPolicy {
    /// The gate stays closed for the whole process lifetime.
    #[default]
    Never,
    /// Session changes detach hooks, restore the display and reopen the gate.
    OnSessionChange,
}

/// Full configuration of one extension instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Extension values ordered ascending.
    pub entries: Vec<ExtensionEntry>,
    /// Trigger identifiers; position `i` selects the `i`-th extension slot.
    pub triggers: Vec<TriggerId>,
    /// Entry count of the host domain before any extension.
    pub native_domain_len: usize,
    /// Float sequence property holding the domain.
    pub domain_property: String,
    /// Optional uint property bounding the selectable range.
    pub bound_property: String,
    /// Uint property holding the active index; read by the post-hook.
    pub active_index_property: String,
    /// Host methods that receive the feedback post-hook.
    pub hooked_methods: Vec<String>,
    /// Scene node name of the feedback display.
    pub feedback_display: String,
    /// Passed to the host activation entry point.
    pub force_apply: bool,
    pub gate_reset: GateResetPolicy,
}

impl ExtensionConfig {
    /// Game speed preset: six extra speeds bound to the 5..0 number keys.
    ///
    /// 5 and 10 exist on the host but stay locked behind the visible bound;
    /// the rest are new. Palette is a yellow to orange gradient.
    pub fn game_speed() -> Self {
        Self {
            entries: vec![
                ExtensionEntry::new(5.0, Color::rgb(255, 234, 0)),
                ExtensionEntry::new(10.0, Color::rgb(255, 203, 0)),
                ExtensionEntry::new(15.0, Color::rgb(255, 171, 0)),
                ExtensionEntry::new(20.0, Color::rgb(255, 140, 0)),
                ExtensionEntry::new(30.0, Color::rgb(255, 108, 0)),
                ExtensionEntry::new(50.0, Color::rgb(255, 77, 0)),
            ],
            triggers: ["Alpha5", "Alpha6", "Alpha7", "Alpha8", "Alpha9", "Alpha0"]
                .into_iter()
                .map(TriggerId::from)
                .collect(),
            native_domain_len: 4,
            domain_property: "timeScales".to_string(),
            bound_property: "highestVisibleTimeScaleIndex".to_string(),
            active_index_property: "timeScaleIndex".to_string(),
            hooked_methods: vec![
                "SetTimeScale".to_string(),
                "IncreaseTimeScale".to_string(),
                "DecreaseTimeScale".to_string(),
            ],
            feedback_display: "Game Speed Text".to_string(),
            force_apply: true,
            gate_reset: GateResetPolicy::Never,
        }
    }

    /// Validates the table before any host is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::EmptyEntries);
        }
        let mut previous: Option<f32> = None;
        for entry in &self.entries {
            if !entry.value.is_finite() {
                return Err(ConfigError::NonFiniteValue(entry.value));
            }
            if let Some(prev) = previous {
                if entry.value <= prev {
                    return Err(ConfigError::UnorderedValues {
                        previous: prev,
                        next: entry.value,
                    });
                }
            }
            previous = Some(entry.value);
        }

        if self.triggers.is_empty() {
            return Err(ConfigError::EmptyTriggers);
        }
        let mut seen = BTreeSet::new();
        for trigger in &self.triggers {
            if trigger.as_str().trim().is_empty() {
                return Err(ConfigError::BlankName("trigger"));
            }
            if !seen.insert(trigger) {
                return Err(ConfigError::DuplicateTrigger(trigger.clone()));
            }
        }
        if self.triggers.len() > self.entries.len() {
            return Err(ConfigError::TooManyTriggers {
                triggers: self.triggers.len(),
                entries: self.entries.len(),
            });
        }

        require_identifier(&self.domain_property)?;
        require_identifier(&self.bound_property)?;
        require_identifier(&self.active_index_property)?;
        if self.hooked_methods.is_empty() {
            return Err(ConfigError::BlankName("hooked method"));
        }
        for method in &self.hooked_methods {
            require_identifier(method)?;
        }
        if self.feedback_display.trim().is_empty() {
            return Err(ConfigError::BlankName("feedback display"));
        }
        Ok(())
    }

    /// Smallest extension value; everything below it is host-native.
    pub fn first_extension_value(&self) -> Option<f32> {
        self.entries.first().map(|entry| entry.value)
    }

    /// Exact-match color lookup.
    pub fn color_for(&self, value: f32) -> Option<Color> {
        self.entries
            .iter()
            .find(|entry| entry.value == value)
            .map(|entry| entry.color)
    }

    /// Extension values in configured order.
    pub fn extension_values(&self) -> Vec<f32> {
        self.entries.iter().map(|entry| entry.value).collect()
    }

    /// Position of `trigger` in the trigger list.
    pub fn trigger_slot(&self, trigger: &TriggerId) -> Option<usize> {
        self.triggers.iter().position(|candidate| candidate == trigger)
    }
}

fn require_identifier(value: &str) -> Result<(), ConfigError> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(value.to_string()))
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    EmptyEntries,
    NonFiniteValue(f32),
    UnorderedValues { previous: f32, next: f32 },
    EmptyTriggers,
    DuplicateTrigger(TriggerId),
    TooManyTriggers { triggers: usize, entries: usize },
    InvalidIdentifier(String),
    BlankName(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEntries => write!(f, "extension entries must not be empty"),
            Self::NonFiniteValue(value) => write!(f, "extension value is not finite: {value}"),
            Self::UnorderedValues { previous, next } => write!(
                f,
                "extension values must be strictly ascending: {next} follows {previous}"
            ),
            Self::EmptyTriggers => write!(f, "trigger list must not be empty"),
            Self::DuplicateTrigger(trigger) => write!(f, "trigger is duplicated: {trigger}"),
            Self::TooManyTriggers { triggers, entries } => write!(
                f,
                "{triggers} triggers configured for only {entries} extension entries"
            ),
            Self::InvalidIdentifier(value) => write!(f, "host member name is invalid: {value}"),
            Self::BlankName(what) => write!(f, "{what} name must not be blank"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{Color, ConfigError, ExtensionConfig, ExtensionEntry, TriggerId};

    #[test]
    fn game_speed_preset_is_valid() {
        let config = ExtensionConfig::game_speed();
        config.validate().expect("preset should validate");
        assert_eq!(config.first_extension_value(), Some(5.0));
        assert_eq!(config.color_for(15.0), Some(Color::rgb(255, 171, 0)));
        assert_eq!(config.color_for(16.0), None);
    }

    #[test]
    fn rejects_unordered_entries() {
        let mut config = ExtensionConfig::game_speed();
        config.entries.swap(0, 1);
        let err = config.validate().expect_err("unordered entries must fail");
        assert!(matches!(err, ConfigError::UnorderedValues { .. }));
    }

    #[test]
    fn rejects_duplicate_entry_values() {
        let mut config = ExtensionConfig::game_speed();
        config.entries[1] = ExtensionEntry::new(5.0, Color::WHITE);
        let err = config.validate().expect_err("duplicate values must fail");
        assert!(matches!(err, ConfigError::UnorderedValues { .. }));
    }

    #[test]
    fn rejects_nan_entries() {
        let mut config = ExtensionConfig::game_speed();
        config.entries[0].value = f32::NAN;
        let err = config.validate().expect_err("nan must fail");
        assert!(matches!(err, ConfigError::NonFiniteValue(_)));
    }

    #[test]
    fn rejects_more_triggers_than_entries() {
        let mut config = ExtensionConfig::game_speed();
        config.triggers.push(TriggerId::new("Minus"));
        let err = config.validate().expect_err("extra trigger must fail");
        assert_eq!(
            err,
            ConfigError::TooManyTriggers {
                triggers: 7,
                entries: 6
            }
        );
    }

    #[test]
    fn rejects_duplicate_triggers() {
        let mut config = ExtensionConfig::game_speed();
        config.triggers[1] = TriggerId::new("Alpha5");
        let err = config.validate().expect_err("duplicate trigger must fail");
        assert_eq!(err, ConfigError::DuplicateTrigger(TriggerId::new("Alpha5")));
    }

    #[test]
    fn rejects_non_identifier_member_names() {
        let mut config = ExtensionConfig::game_speed();
        config.hooked_methods.push("Set Time Scale".to_string());
        let err = config.validate().expect_err("spaces must fail");
        assert_eq!(
            err,
            ConfigError::InvalidIdentifier("Set Time Scale".to_string())
        );
    }

    #[test]
    fn trigger_slot_follows_configured_order() {
        let config = ExtensionConfig::game_speed();
        assert_eq!(config.trigger_slot(&TriggerId::new("Alpha5")), Some(0));
        assert_eq!(config.trigger_slot(&TriggerId::new("Alpha0")), Some(5));
        assert_eq!(config.trigger_slot(&TriggerId::new("Alpha1")), None);
    }

    #[test]
    fn color_displays_as_hex() {
        assert_eq!(Color::rgb(255, 77, 0).to_string(), "#ff4d00ff");
    }
}

use anyhow::{bail, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

bitflags! {
    /// Modifier keys required by a shortcut. A shortcut matches when the
    /// currently held modifiers are a superset of its required set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const CMD = 1 << 3;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers::empty()
    }
}

impl Modifiers {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "shift" => Some(Modifiers::SHIFT),
            "ctrl" | "control" => Some(Modifiers::CTRL),
            "alt" => Some(Modifiers::ALT),
            "cmd" | "super" | "meta" => Some(Modifiers::CMD),
            _ => None,
        }
    }
}

/// A physical input binding (key or pointer button name, lowercased) plus
/// the modifier keys that must be held. Equality and hashing cover both
/// fields so shortcuts can key the dispatcher's pending queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub modifiers: Modifiers,
    pub binding: String,
}

impl Shortcut {
    pub fn new(modifiers: Modifiers, binding: &str) -> Self {
        Self { modifiers, binding: binding.to_lowercase() }
    }

    /// Bare binding with no modifiers.
    pub fn key(binding: &str) -> Self {
        Self::new(Modifiers::empty(), binding)
    }

    /// Parses the `ctrl+shift+f` form: zero or more modifier tokens
    /// followed by a single binding token, joined with `+`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut modifiers = Modifiers::empty();
        let mut binding = None;
        for token in raw.split('+') {
            let token = token.trim().to_lowercase();
            if token.is_empty() {
                bail!("Empty token in shortcut '{raw}'");
            }
            if let Some(flag) = Modifiers::from_token(&token) {
                modifiers |= flag;
            } else if binding.is_none() {
                binding = Some(token);
            } else {
                bail!("Shortcut '{raw}' has more than one binding token");
            }
        }
        match binding {
            Some(binding) => Ok(Self { modifiers, binding }),
            None => bail!("Shortcut '{raw}' has no binding token"),
        }
    }

    /// True when every required modifier is currently held. Extra held
    /// modifiers do not disqualify a match.
    pub fn satisfied_by(&self, held: Modifiers) -> bool {
        held.contains(self.modifiers)
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, label) in [
            (Modifiers::CTRL, "ctrl"),
            (Modifiers::SHIFT, "shift"),
            (Modifiers::ALT, "alt"),
            (Modifiers::CMD, "cmd"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{label}+")?;
            }
        }
        write!(f, "{}", self.binding)
    }
}

/// On-disk shortcut override file: action id -> shortcut text. Loaded
/// leniently (bad entries are skipped, defaults kept) and saved from the
/// registry's current overrides.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RebindFile {
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
}

impl RebindFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handles_modifier_chains() {
        let shortcut = Shortcut::parse("Ctrl+Shift+F").expect("parse chained shortcut");
        assert_eq!(shortcut.modifiers, Modifiers::CTRL | Modifiers::SHIFT);
        assert_eq!(shortcut.binding, "f");
        assert_eq!(shortcut.to_string(), "ctrl+shift+f");
    }

    #[test]
    fn parse_rejects_missing_binding() {
        assert!(Shortcut::parse("ctrl+shift").is_err(), "modifier-only shortcut is invalid");
        assert!(Shortcut::parse("a+b").is_err(), "two binding tokens are invalid");
    }

    #[test]
    fn extra_held_modifiers_still_satisfy() {
        let shortcut = Shortcut::new(Modifiers::CTRL, "z");
        assert!(shortcut.satisfied_by(Modifiers::CTRL | Modifiers::SHIFT));
        assert!(!shortcut.satisfied_by(Modifiers::SHIFT));
    }
}

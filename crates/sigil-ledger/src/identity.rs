//! # Sigil Identity Helpers
//!
//! Derivations tying a sigil's pulse coordinates to its signature and owner
//! key, and the chakra-day normalization used in signed messages.

use std::fmt;

use sigil_core::{base58_check, hash_str, sha256_bytes, HashHex};

/// Canonical chakra-day labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChakraDay {
    Root,
    Sacral,
    SolarPlexus,
    Heart,
    Throat,
    ThirdEye,
    Crown,
}

impl ChakraDay {
    pub const ALL: [ChakraDay; 7] = [
        Self::Root,
        Self::Sacral,
        Self::SolarPlexus,
        Self::Heart,
        Self::Throat,
        Self::ThirdEye,
        Self::Crown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Sacral => "Sacral",
            Self::SolarPlexus => "Solar Plexus",
            Self::Heart => "Heart",
            Self::Throat => "Throat",
            Self::ThirdEye => "Third Eye",
            Self::Crown => "Crown",
        }
    }
}

impl fmt::Display for ChakraDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalize a loose chakra label ("root gate", "THIRD-EYE", "solar") to its
/// canonical form. Returns `None` for anything unrecognized.
pub fn normalize_chakra_day(input: &str) -> Option<ChakraDay> {
    let lowered = input.to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();
    let simplified = spaced
        .split_whitespace()
        .filter(|w| !matches!(*w, "gate" | "chakra" | "day"))
        .collect::<Vec<_>>()
        .join(" ");
    let squashed: String = simplified.chars().filter(|c| !c.is_whitespace()).collect();

    if squashed.contains("thirdeye") {
        return Some(ChakraDay::ThirdEye);
    }
    if squashed.contains("solarplexus") {
        return Some(ChakraDay::SolarPlexus);
    }
    if let Some(day) = ChakraDay::ALL
        .into_iter()
        .find(|d| d.label().to_lowercase() == simplified)
    {
        return Some(day);
    }
    match simplified.as_str() {
        "solar" | "plexus" => Some(ChakraDay::SolarPlexus),
        "third" | "eye" => Some(ChakraDay::ThirdEye),
        "krown" => Some(ChakraDay::Crown),
        _ => None,
    }
}

/// `hash("{pulse}|{beat}|{stepIndex}|{chakraDay}|{intention}")`.
pub fn compute_kai_signature(
    pulse: u64,
    beat: u64,
    step_index: u64,
    chakra_day: &str,
    intention: Option<&str>,
) -> HashHex {
    hash_str(&format!(
        "{pulse}|{beat}|{step_index}|{chakra_day}|{}",
        intention.unwrap_or("")
    ))
}

/// Owner key derived from a kai signature: base58check (version 0) of the
/// first 20 bytes of `SHA-256(sig + "φ")`.
pub fn derive_user_key_from_signature(kai_signature: &str) -> String {
    let digest = sha256_bytes(format!("{kai_signature}φ").as_bytes());
    base58_check(&digest[..20], 0x00)
}

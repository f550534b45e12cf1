//! Secret strength analysis.
//!
//! `analyze` is a pure function: no persistence, no I/O, deterministic
//! output for a given plaintext.  The entropy figure is an upper bound
//! (length × log2 of the effective alphabet), not true Shannon entropy —
//! it assumes every character was drawn uniformly from the union of the
//! classes actually present.

pub mod patterns;

use serde::Serialize;

/// Strength category derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthTier {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl StrengthTier {
    /// Map a 0–100 score onto its tier.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => StrengthTier::VeryStrong,
            60..=79 => StrengthTier::Strong,
            40..=59 => StrengthTier::Moderate,
            20..=39 => StrengthTier::Weak,
            _ => StrengthTier::VeryWeak,
        }
    }

    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthTier::VeryWeak => "very weak",
            StrengthTier::Weak => "weak",
            StrengthTier::Moderate => "moderate",
            StrengthTier::Strong => "strong",
            StrengthTier::VeryStrong => "very strong",
        }
    }

    /// True for the tiers the remediation engine treats as rotation
    /// candidates.
    pub fn needs_remediation(&self) -> bool {
        matches!(self, StrengthTier::VeryWeak | StrengthTier::Weak)
    }
}

/// Weakness patterns detected in a plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTag {
    SequentialRun,
    RepeatedRun,
    KeyboardRun,
    LeetCommonWord,
    CommonSecret,
}

/// Result of analyzing one plaintext.  Ephemeral — only the score is
/// denormalized onto the stored record.
#[derive(Debug, Clone, Serialize)]
pub struct StrengthReport {
    /// Character count.
    pub length: usize,
    /// Number of active character classes (lower/upper/digit/symbol/extended).
    pub class_count: usize,
    /// Effective alphabet size implied by the active classes.
    pub alphabet_size: u32,
    /// Entropy upper bound in bits: length × log2(alphabet_size).
    pub entropy_bits: f64,
    /// Weakness patterns that fired.
    pub patterns: Vec<PatternTag>,
    /// Overall score, clamped to 0–100.
    pub score: u8,
    /// Tier derived from the score.
    pub tier: StrengthTier,
    /// Human-readable problems found.
    pub issues: Vec<String>,
    /// Human-readable improvement suggestions.
    pub recommendations: Vec<String>,
}

// Per-class alphabet contributions.
const ALPHABET_LOWER: u32 = 26;
const ALPHABET_UPPER: u32 = 26;
const ALPHABET_DIGIT: u32 = 10;
const ALPHABET_SYMBOL: u32 = 33;
const ALPHABET_EXTENDED: u32 = 64;

// Score weights.  Chosen so that the monotonicity property holds: every
// positive term is non-decreasing in length and in the set of active
// classes, and penalties only ever subtract for patterns that fired.
const CLASS_POINTS: f64 = 5.0;
const LENGTH_CAP: f64 = 40.0;
const ENTROPY_DIVISOR: f64 = 4.0;
const ENTROPY_CAP: f64 = 20.0;
const PENALTY_RUN: f64 = 10.0;
const PENALTY_LEET: f64 = 8.0;
const PENALTY_COMMON: f64 = 40.0;

/// Analyze a plaintext secret and produce a [`StrengthReport`].
pub fn analyze(plaintext: &str) -> StrengthReport {
    let length = plaintext.chars().count();

    // Active character classes.
    let has_lower = plaintext.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = plaintext.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = plaintext.chars().any(|c| c.is_ascii_digit());
    let has_symbol = plaintext
        .chars()
        .any(|c| c.is_ascii() && !c.is_ascii_alphanumeric() && !c.is_ascii_control());
    let has_extended = plaintext.chars().any(|c| !c.is_ascii());

    let mut alphabet_size = 0u32;
    let mut class_count = 0usize;
    for (active, size) in [
        (has_lower, ALPHABET_LOWER),
        (has_upper, ALPHABET_UPPER),
        (has_digit, ALPHABET_DIGIT),
        (has_symbol, ALPHABET_SYMBOL),
        (has_extended, ALPHABET_EXTENDED),
    ] {
        if active {
            alphabet_size += size;
            class_count += 1;
        }
    }

    // Entropy upper bound: length × log2(alphabet).
    let entropy_bits = if alphabet_size > 0 {
        (length as f64) * f64::from(alphabet_size).log2()
    } else {
        0.0
    };

    // Pattern detection.
    let mut patterns = Vec::new();
    if patterns::has_sequential_run(plaintext) {
        patterns.push(PatternTag::SequentialRun);
    }
    if patterns::has_repeated_run(plaintext) {
        patterns.push(PatternTag::RepeatedRun);
    }
    if patterns::has_keyboard_run(plaintext) {
        patterns.push(PatternTag::KeyboardRun);
    }
    if patterns::has_leet_common_word(plaintext) {
        patterns.push(PatternTag::LeetCommonWord);
    }
    if patterns::is_common_secret(plaintext) {
        patterns.push(PatternTag::CommonSecret);
    }

    // Length score: 3 points per character for the first 8, 2 for the
    // next 8, then diminishing returns, capped.
    let length_score = length_points(length);

    // Class diversity score.
    let class_score = class_count as f64 * CLASS_POINTS;

    // Entropy bonus.
    let entropy_bonus = (entropy_bits / ENTROPY_DIVISOR).min(ENTROPY_CAP);

    // Penalties.
    let penalty: f64 = patterns
        .iter()
        .map(|p| match p {
            PatternTag::SequentialRun | PatternTag::RepeatedRun | PatternTag::KeyboardRun => {
                PENALTY_RUN
            }
            PatternTag::LeetCommonWord => PENALTY_LEET,
            PatternTag::CommonSecret => PENALTY_COMMON,
        })
        .sum();

    let raw = length_score + class_score + entropy_bonus - penalty;
    let score = raw.clamp(0.0, 100.0).round() as u8;
    let tier = StrengthTier::from_score(score);

    let (issues, recommendations) = describe(
        length,
        has_lower,
        has_upper,
        has_digit,
        has_symbol,
        &patterns,
    );

    StrengthReport {
        length,
        class_count,
        alphabet_size,
        entropy_bits,
        patterns,
        score,
        tier,
        issues,
        recommendations,
    }
}

/// Tiered length score with diminishing returns past 16 characters.
fn length_points(length: usize) -> f64 {
    let length = length as f64;
    let first = length.min(8.0) * 3.0;
    let second = (length - 8.0).clamp(0.0, 8.0) * 2.0;
    let tail = (length - 16.0).max(0.0) * 0.5;
    (first + second + tail).min(LENGTH_CAP)
}

/// Turn fired penalties and missing classes into reader-facing text.
fn describe(
    length: usize,
    has_lower: bool,
    has_upper: bool,
    has_digit: bool,
    has_symbol: bool,
    patterns: &[PatternTag],
) -> (Vec<String>, Vec<String>) {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if length < 12 {
        issues.push(format!("only {length} characters long"));
        recommendations.push("use at least 16 characters".to_string());
    }
    if !has_lower {
        recommendations.push("add lowercase letters".to_string());
    }
    if !has_upper {
        recommendations.push("add uppercase letters".to_string());
    }
    if !has_digit {
        recommendations.push("add digits".to_string());
    }
    if !has_symbol {
        recommendations.push("add symbols".to_string());
    }

    for pattern in patterns {
        match pattern {
            PatternTag::SequentialRun => {
                issues.push("contains a sequential run like 'abc' or '123'".to_string());
            }
            PatternTag::RepeatedRun => {
                issues.push("repeats the same character three or more times".to_string());
            }
            PatternTag::KeyboardRun => {
                issues.push("contains a keyboard row pattern like 'qwe'".to_string());
            }
            PatternTag::LeetCommonWord => {
                issues.push("disguises a common word with character substitutions".to_string());
            }
            PatternTag::CommonSecret => {
                issues.push("matches a widely known secret".to_string());
            }
        }
    }
    if !patterns.is_empty() {
        recommendations.push("avoid dictionary words and predictable patterns".to_string());
    }

    (issues, recommendations)
}

//! Pattern detection for the strength analyzer.
//!
//! Each detector returns whether a weakness pattern is present in the
//! plaintext.  Detection is deliberately coarse: the goal is a penalty
//! signal, not an exhaustive cracker model.

use std::sync::OnceLock;

use regex::RegexSet;

/// Secrets (and secret stems) seen constantly in breach dumps.
///
/// Matching is done on the leet-normalized lowercase plaintext, so
/// "P@ssw0rd!" and "password" hit the same entries.
pub const COMMON_SECRETS: &[&str] = &[
    "password", "passwort", "passw0rd", "123456", "1234567", "12345678", "123456789",
    "1234567890", "qwerty", "qwertyuiop", "azerty", "admin", "root", "letmein", "welcome",
    "monkey", "dragon", "master", "login", "abc123", "iloveyou", "trustno1", "sunshine",
    "princess", "football", "baseball", "soccer", "shadow", "superman", "batman", "michael",
    "jordan", "hunter", "ninja", "mustang", "access", "starwars", "whatever", "secret",
    "freedom", "charlie", "aa123456", "donald", "password1", "qwerty123",
];

/// Keyboard rows used for adjacency detection (QWERTY layout).
const KEYBOARD_ROWS: &[&str] = &["qwertyuiop", "asdfghjkl", "zxcvbnm", "1234567890"];

/// Minimum run length that counts as a pattern.
const RUN_LEN: usize = 3;

/// True if the plaintext contains an ascending or descending run of
/// `RUN_LEN`+ consecutive letters or digits ("abc", "321", "xyz").
pub fn has_sequential_run(plaintext: &str) -> bool {
    let chars: Vec<char> = plaintext.chars().collect();
    chars.windows(RUN_LEN).any(|w| {
        let all_alnum = w.iter().all(|c| c.is_ascii_alphanumeric());
        if !all_alnum {
            return false;
        }
        let ascending = w.windows(2).all(|p| p[1] as u32 == p[0] as u32 + 1);
        let descending = w.windows(2).all(|p| p[0] as u32 == p[1] as u32 + 1);
        ascending || descending
    })
}

/// True if the plaintext repeats one character `RUN_LEN`+ times in a row.
pub fn has_repeated_run(plaintext: &str) -> bool {
    let chars: Vec<char> = plaintext.chars().collect();
    chars.windows(RUN_LEN).any(|w| w.iter().all(|c| *c == w[0]))
}

/// True if the lowercased plaintext contains a `RUN_LEN`+ substring of a
/// keyboard row, forwards or backwards ("qwe", "lkj", "789").
pub fn has_keyboard_run(plaintext: &str) -> bool {
    let chars: Vec<char> = plaintext.to_lowercase().chars().collect();
    chars.windows(RUN_LEN).any(|w| {
        let window: String = w.iter().collect();
        let reversed: String = w.iter().rev().collect();
        KEYBOARD_ROWS
            .iter()
            .any(|row| row.contains(&window) || row.contains(&reversed))
    })
}

/// Normalize common leet substitutions to letters ("P@ssw0rd" → "password").
pub fn leet_normalize(plaintext: &str) -> String {
    plaintext
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' | '!' => 'i',
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            '7' => 't',
            '8' => 'b',
            _ => c,
        })
        .collect()
}

/// True if the plaintext exactly matches a common-secret entry, either
/// verbatim (lowercased) or after leet normalization.
pub fn is_common_secret(plaintext: &str) -> bool {
    let lower = plaintext.to_lowercase();
    let normalized = leet_normalize(plaintext);
    COMMON_SECRETS
        .iter()
        .any(|w| *w == lower || *w == normalized)
}

/// True if leet substitutions were used to disguise a common word:
/// normalization changed the plaintext, and the normalized form contains
/// a common-secret entry.
pub fn has_leet_common_word(plaintext: &str) -> bool {
    let lower = plaintext.to_lowercase();
    let normalized = leet_normalize(plaintext);
    if normalized == lower {
        return false;
    }
    common_word_set().is_match(&normalized)
}

/// Compiled substring matcher over `COMMON_SECRETS`, built once.
fn common_word_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new(COMMON_SECRETS.iter().map(|w| regex::escape(w)))
            .unwrap_or_else(|_| RegexSet::empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_runs() {
        assert!(has_sequential_run("xabcx"));
        assert!(has_sequential_run("password321"));
        assert!(has_sequential_run("123"));
        assert!(!has_sequential_run("a1b2c3"));
        assert!(!has_sequential_run("acegik"));
    }

    #[test]
    fn repeated_runs() {
        assert!(has_repeated_run("aaab"));
        assert!(has_repeated_run("pass111"));
        assert!(!has_repeated_run("aabb"));
    }

    #[test]
    fn keyboard_runs() {
        assert!(has_keyboard_run("xqwex"));
        assert!(has_keyboard_run("ASDF9911"));
        assert!(has_keyboard_run("poi-reversed")); // "poi" is "iop" backwards
        assert!(!has_keyboard_run("qaz")); // column, not row
    }

    #[test]
    fn leet_normalization() {
        assert_eq!(leet_normalize("P@ssw0rd"), "password");
        assert_eq!(leet_normalize("l33t"), "leet");
    }

    #[test]
    fn common_secret_exact_match() {
        assert!(is_common_secret("password"));
        assert!(is_common_secret("PASSWORD"));
        assert!(is_common_secret("P@ssw0rd"));
        assert!(!is_common_secret("uncommon-phrase-xk"));
    }

    #[test]
    fn leet_disguised_common_word() {
        assert!(has_leet_common_word("MyP@ssw0rd2020"));
        // No substitution at all — handled by the common-list check instead.
        assert!(!has_leet_common_word("mypassword"));
        assert!(!has_leet_common_word("Tr9kqLmWz"));
    }
}

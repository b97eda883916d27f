// src/utils/quiz_code.rs

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

/// Uppercase letters without I, L, O and digits without 0, 1.
pub const QUIZ_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const QUIZ_CODE_LEN: usize = 6;

static QUIZ_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-HJKMNP-Z2-9]{6}$").expect("quiz code pattern is valid"));

/// Generates a quiz code uniformly at random from `QUIZ_CODE_ALPHABET`.
///
/// No uniqueness check happens here; publishing retries on collision.
pub fn generate_quiz_code() -> String {
    let mut rng = rand::thread_rng();
    (0..QUIZ_CODE_LEN)
        .map(|_| QUIZ_CODE_ALPHABET[rng.gen_range(0..QUIZ_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trims and upper-cases user input.
pub fn normalize_quiz_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

pub fn is_valid_quiz_code(code: &str) -> bool {
    QUIZ_CODE_PATTERN.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_alphabet_and_length() {
        for _ in 0..10_000 {
            let code = generate_quiz_code();
            assert_eq!(code.len(), QUIZ_CODE_LEN);
            assert!(code.bytes().all(|b| QUIZ_CODE_ALPHABET.contains(&b)), "{code}");
            assert!(is_valid_quiz_code(&code), "{code}");
        }
    }

    #[test]
    fn pattern_matches_alphabet_exactly() {
        for b in b'0'..=b'z' {
            let code = String::from_utf8(vec![b; QUIZ_CODE_LEN]).unwrap();
            assert_eq!(
                is_valid_quiz_code(&code),
                QUIZ_CODE_ALPHABET.contains(&b),
                "char {:?}",
                b as char
            );
        }
    }

    #[test]
    fn ambiguous_and_malformed_codes_are_rejected() {
        assert!(!is_valid_quiz_code("ABCDE"));
        assert!(!is_valid_quiz_code("ABCDEFG"));
        assert!(!is_valid_quiz_code("ABCDE1"));
        assert!(!is_valid_quiz_code("ABCDEO"));
        assert!(!is_valid_quiz_code("abcdef"));
        assert!(is_valid_quiz_code(&normalize_quiz_code("  abcdef ")));
    }
}

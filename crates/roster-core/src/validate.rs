//! name validation for record submission
//!
//! pure functions only: the caller decides what to do with the result,
//! nothing here touches session state.

use serde::{Deserialize, Serialize};

/// minimum accepted name length, counted in chars on the raw input
pub const MIN_NAME_CHARS: usize = 3;

/// per-field validity, consumed by the session and mirrored into the view
/// so a shell can mark the offending inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCheck {
    pub first_name: bool,
    pub last_name: bool,
}

impl NameCheck {
    pub fn all_valid(&self) -> bool {
        self.first_name && self.last_name
    }
}

/// validate both names independently
pub fn validate_names(first_name: &str, last_name: &str) -> NameCheck {
    NameCheck {
        first_name: name_ok(first_name),
        last_name: name_ok(last_name),
    }
}

/// a name passes iff it is non-blank after trimming and the raw input
/// carries at least MIN_NAME_CHARS chars
fn name_ok(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().count() >= MIN_NAME_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_minimum_length() {
        let check = validate_names("Ali", "Lee");
        assert!(check.first_name);
        assert!(check.last_name);
        assert!(check.all_valid());
    }

    #[test]
    fn rejects_two_char_names() {
        let check = validate_names("Al", "Le");
        assert!(!check.first_name);
        assert!(!check.last_name);
    }

    #[test]
    fn fields_fail_independently() {
        let check = validate_names("Alice", "Le");
        assert!(check.first_name);
        assert!(!check.last_name);
        assert!(!check.all_valid());
    }

    #[test]
    fn rejects_blank_padding() {
        // five chars of whitespace around a single letter: long enough,
        // but blank once trimmed
        let check = validate_names("  a  ", "Lee");
        assert!(!check.first_name);
        assert!(check.last_name);
    }

    #[test]
    fn length_counts_raw_input() {
        // " Al" is three raw chars and non-blank trimmed, so it passes
        let check = validate_names(" Al", "Lee");
        assert!(check.first_name);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let check = validate_names("Åsa", "Öst");
        assert!(check.all_valid());
    }

    proptest! {
        #[test]
        fn matches_rule_for_any_input(first in ".*", last in ".*") {
            let check = validate_names(&first, &last);
            prop_assert_eq!(
                check.first_name,
                !first.trim().is_empty() && first.chars().count() >= MIN_NAME_CHARS
            );
            prop_assert_eq!(
                check.last_name,
                !last.trim().is_empty() && last.chars().count() >= MIN_NAME_CHARS
            );
        }
    }
}

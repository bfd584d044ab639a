//! Character-level filtering for ids and free-text fields.
//!
//! This is a filter, not an escaper: characters outside the allow-list are
//! dropped, spaces become the separator, and nothing is ever encoded.

pub const SLUG_SEPARATOR: &str = "-";
pub const TEXT_SEPARATOR: &str = " ";

/// Filters `input` down to the characters in `allowed`.
///
/// Literal double-spaces are removed before the scan. During the scan a space
/// that is not itself allowed is replaced by `separator`; every other
/// character missing from `allowed` is dropped.
#[must_use]
pub fn clean_string(input: &str, allowed: &str, separator: &str, lowercase: bool) -> String {
    let lowered;
    let input = if lowercase {
        lowered = input.to_lowercase();
        lowered.as_str()
    } else {
        input
    };

    let collapsed = input.replace("  ", "");

    let mut cleaned = String::with_capacity(collapsed.len());
    for character in collapsed.chars() {
        if allowed.contains(character) {
            cleaned.push(character);
        } else if character == ' ' {
            cleaned.push_str(separator);
        }
    }

    cleaned
}

/// Lower-cased, `-`-separated id derived from a title. Safe as a file name
/// and as a path segment as long as `letters` is.
#[must_use]
pub fn slugify(title: &str, letters: &str) -> String {
    clean_string(title, letters, SLUG_SEPARATOR, true)
}

/// Free-text scrub applied to titles, descriptions and usernames before storage.
#[must_use]
pub fn scrub(text: &str, allowed: &str) -> String {
    clean_string(text, allowed, TEXT_SEPARATOR, false)
}

#[cfg(test)]
mod tests {
    use crate::sanitize::{clean_string, scrub, slugify};

    const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

    #[test]
    fn slug_is_deterministic() {
        let title = "My First Post";
        assert_eq!(slugify(title, LETTERS), "my-first-post");
        assert_eq!(slugify(title, LETTERS), slugify(title, LETTERS));
    }

    #[test]
    fn double_spaces_are_removed_before_scanning() {
        // The double space vanishes entirely, the single space maps to the separator.
        assert_eq!(
            clean_string("Hello  World! <script>", LETTERS, "-", true),
            "helloworld-script"
        );
        assert_eq!(clean_string("a   b", LETTERS, "-", false), "a-b");
    }

    #[test]
    fn disallowed_characters_are_dropped() {
        assert_eq!(slugify("Rust 2024: What's new?", LETTERS), "rust--whats-new");
        assert_eq!(slugify("<>&;", LETTERS), "");
    }

    #[test]
    fn allowed_space_is_kept_verbatim() {
        let allowed = format!("{LETTERS} ");
        assert_eq!(clean_string("a b", &allowed, "-", false), "a b");
    }

    #[test]
    fn scrub_keeps_case_and_punctuation() {
        let allowed = format!("{LETTERS}!?'");
        assert_eq!(scrub("Hi there! <b>bold</b>", &allowed), "Hi there! bboldb");
        assert_eq!(scrub("It's fine?", &allowed), "It's fine?");
    }

    #[test]
    fn non_ascii_letters_need_to_be_allowed() {
        assert_eq!(slugify("Crème Brûlée", LETTERS), "crme-brle");
        assert_eq!(slugify("Crème Brûlée", &format!("{LETTERS}èûé")), "crème-brûlée");
    }
}

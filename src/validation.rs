//! Name validation for accounts, characters and friend tags.

use std::collections::HashSet;

/// Username validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username is too short (minimum 2 characters)")]
    TooShort,

    #[error("Username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Username contains path separators (/ or \\)")]
    PathTraversal,

    #[error("Username contains reserved characters")]
    ReservedCharacters,

    #[error("Username is a reserved system name")]
    Reserved,
}

/// Errors for free-text names (characters, campaigns, log titles).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} is too long (maximum {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains control characters")]
    ControlCharacters { field: &'static str },
}

/// Username validation rules configuration
#[derive(Debug, Clone)]
pub struct UsernameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_spaces: bool,
    pub allow_unicode: bool,
}

impl UsernameRules {
    /// Rules for player accounts
    pub fn user() -> Self {
        UsernameRules {
            min_length: 2,
            max_length: 30,
            allow_spaces: true,
            allow_unicode: true,
        }
    }
}

pub const MAX_CHARACTER_NAME: usize = 60;
pub const MAX_TITLE: usize = 120;
pub const TAG_LEN: usize = 5;

/// Get set of reserved usernames that should not be allowed
fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "administrator", "root", "system", "operator", "guest", "anonymous", "session",
        "gm", "gamemaster", "narrator",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a username according to the given rules
pub fn validate_username(username: &str, rules: &UsernameRules) -> Result<String, UsernameError> {
    let trimmed = username.trim();

    if trimmed.chars().count() < rules.min_length {
        return Err(UsernameError::TooShort);
    }
    if trimmed.chars().count() > rules.max_length {
        return Err(UsernameError::TooLong {
            max: rules.max_length,
        });
    }

    if trimmed != username {
        return Err(UsernameError::InvalidWhitespace);
    }

    if reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(UsernameError::Reserved);
    }

    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(UsernameError::PathTraversal);
    }

    // ':' separates key segments in the store, '#' separates name and tag
    let reserved_chars = [':', '#', '<', '>', '"', '|', '?', '*', '\0'];
    if trimmed.chars().any(|c| reserved_chars.contains(&c)) {
        return Err(UsernameError::ReservedCharacters);
    }

    let mut invalid_chars = Vec::new();
    for ch in trimmed.chars() {
        let valid = if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.' {
            true
        } else if ch == ' ' {
            rules.allow_spaces
        } else if ch.is_control() {
            false
        } else if !ch.is_ascii() {
            rules.allow_unicode
        } else {
            false
        };

        if !valid {
            invalid_chars.push(ch);
        }
    }

    if !invalid_chars.is_empty() {
        let unique_chars: HashSet<char> = invalid_chars.into_iter().collect();
        let mut chars: Vec<char> = unique_chars.into_iter().collect();
        chars.sort_unstable();
        let chars_str: String = chars
            .into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect();
        return Err(UsernameError::InvalidCharacters { chars: chars_str });
    }

    Ok(trimmed.to_string())
}

/// Validate a player account name
pub fn validate_user_name(name: &str) -> Result<String, UsernameError> {
    validate_username(name, &UsernameRules::user())
}

/// Validate a free-text name, returning it trimmed.
pub fn validate_title(field: &'static str, value: &str, max: usize) -> Result<String, NameError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(NameError::TooLong { field, max });
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(NameError::ControlCharacters { field });
    }
    Ok(trimmed.to_string())
}

pub fn validate_character_name(name: &str) -> Result<String, NameError> {
    validate_title("character name", name, MAX_CHARACTER_NAME)
}

/// Friend tags are exactly five ASCII digits.
pub fn is_valid_tag(tag: &str) -> bool {
    tag.len() == TAG_LEN && tag.bytes().all(|b| b.is_ascii_digit())
}

/// Split `name#12345` into its parts.
pub fn split_name_tag(handle: &str) -> Option<(&str, &str)> {
    let (name, tag) = handle.rsplit_once('#')?;
    if name.is_empty() || !is_valid_tag(tag) {
        return None;
    }
    Some((name, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_validation() {
        assert!(validate_user_name("klein").is_ok());
        assert!(validate_user_name("Audrey Hall").is_ok());
        assert!(validate_user_name("José María").is_ok());

        assert_eq!(validate_user_name("../etc/passwd"), Err(UsernameError::PathTraversal));
        assert_eq!(validate_user_name("a:b"), Err(UsernameError::ReservedCharacters));
        assert_eq!(validate_user_name("bob#1"), Err(UsernameError::ReservedCharacters));
        assert_eq!(validate_user_name("Admin"), Err(UsernameError::Reserved));
        assert_eq!(validate_user_name(" klein"), Err(UsernameError::InvalidWhitespace));
        assert_eq!(validate_user_name("k"), Err(UsernameError::TooShort));
        assert!(matches!(
            validate_user_name("bad\u{7}bell"),
            Err(UsernameError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn test_character_name() {
        assert_eq!(validate_character_name("  Sherlock Moriarty ").unwrap(), "Sherlock Moriarty");
        assert_eq!(
            validate_character_name("   "),
            Err(NameError::Empty { field: "character name" })
        );
        let long = "x".repeat(MAX_CHARACTER_NAME + 1);
        assert!(matches!(validate_character_name(&long), Err(NameError::TooLong { .. })));
    }

    #[test]
    fn test_name_tag_split() {
        assert_eq!(split_name_tag("Klein#12345"), Some(("Klein", "12345")));
        assert_eq!(split_name_tag("Dwayne Dantès#00001"), Some(("Dwayne Dantès", "00001")));
        assert_eq!(split_name_tag("Klein#1234"), None);
        assert_eq!(split_name_tag("#12345"), None);
        assert_eq!(split_name_tag("Klein"), None);
    }
}

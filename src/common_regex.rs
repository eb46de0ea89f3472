// Regular expression construction
// Inline-flag extraction, grammar check and compilation

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Regex construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegexError {
    #[error("regular expression is empty.")]
    Empty,

    #[error("'{pattern}' is not a valid regex: {message}")]
    Invalid { pattern: String, message: String },
}

/// Grammar a pattern must satisfy before it is compiled.
pub trait PatternGrammar {
    fn check(&self, pattern: &str) -> Result<(), String>;
}

/// Default grammar backed by `regex_syntax`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexSyntaxGrammar;

impl PatternGrammar for RegexSyntaxGrammar {
    fn check(&self, pattern: &str) -> Result<(), String> {
        regex_syntax::Parser::new()
            .parse(pattern)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Flags {
    case_insensitive: bool,
    multi_line: bool,
    dot_all: bool,
    ungreedy: bool,
    extended: bool,
}

const FLAG_CHARS: &str = "imsxJU";

/// Remove every standalone flag group such as `(?i)` or `(?im)`, wherever it
/// sits, and collect its flags.
fn extract_flags(pattern: &str) -> (String, Flags) {
    let mut flags = Flags::default();
    let mut body = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find("(?") {
        body.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let group = after
            .find(')')
            .map(|end| &after[..end])
            .filter(|g| !g.is_empty() && g.chars().all(|c| FLAG_CHARS.contains(c)));
        match group {
            Some(group) => {
                for c in group.chars() {
                    match c {
                        'i' => flags.case_insensitive = true,
                        'm' => flags.multi_line = true,
                        's' => flags.dot_all = true,
                        'U' => flags.ungreedy = true,
                        'x' => flags.extended = true,
                        // duplicate group names have no equivalent; accepted and ignored
                        _ => {}
                    }
                }
                rest = &after[group.len() + 1..];
            }
            None => {
                body.push_str("(?");
                rest = after;
            }
        }
    }
    body.push_str(rest);
    (body, flags)
}

/// Compile `pattern` with the default grammar.
pub fn create_regex(pattern: &str) -> Result<Regex, RegexError> {
    create_regex_with(&RegexSyntaxGrammar, pattern)
}

/// Compile `pattern`, validating it against `grammar` first.
pub fn create_regex_with<G: PatternGrammar + ?Sized>(
    grammar: &G,
    pattern: &str,
) -> Result<Regex, RegexError> {
    if pattern.is_empty() {
        return Err(RegexError::Empty);
    }
    let invalid = |message: String| RegexError::Invalid {
        pattern: pattern.to_string(),
        message,
    };

    let (body, flags) = extract_flags(pattern);
    grammar.check(&body).map_err(invalid)?;

    RegexBuilder::new(&body)
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_all)
        .swap_greed(flags.ungreedy)
        .ignore_whitespace(flags.extended)
        .build()
        .map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_anywhere_in_pattern() {
        let re = create_regex("abc(?i)").unwrap();
        assert!(re.is_match("xABCx"));
        let re = create_regex("(?m)^b$").unwrap();
        assert!(re.is_match("a\nb\nc"));
        let re = create_regex("(?s)a.c").unwrap();
        assert!(re.is_match("a\nc"));
    }

    #[test]
    fn test_extract_flags_strips_groups() {
        let (body, flags) = extract_flags("(?im)a(?x)b");
        assert_eq!(body, "ab");
        assert!(flags.case_insensitive && flags.multi_line && flags.extended);
        assert!(!flags.dot_all);
    }

    #[test]
    fn test_non_flag_groups_are_kept() {
        let (body, flags) = extract_flags("(?:ab)(?P<n>c)");
        assert_eq!(body, "(?:ab)(?P<n>c)");
        assert_eq!(flags, Flags::default());
    }

    #[test]
    fn test_rejects_bad_patterns() {
        assert_eq!(create_regex("").unwrap_err(), RegexError::Empty);
        assert!(matches!(create_regex("(abc"), Err(RegexError::Invalid { .. })));
    }

    #[test]
    fn test_custom_grammar() {
        struct NoDigits;
        impl PatternGrammar for NoDigits {
            fn check(&self, pattern: &str) -> Result<(), String> {
                if pattern.contains(r"\d") {
                    Err("digit classes are not allowed".to_string())
                } else {
                    Ok(())
                }
            }
        }
        assert!(create_regex_with(&NoDigits, "a+").is_ok());
        let err = create_regex_with(&NoDigits, r"\d+").unwrap_err();
        assert_eq!(
            err.to_string(),
            r"'\d+' is not a valid regex: digit classes are not allowed"
        );
    }
}

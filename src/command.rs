//! Parsing of free-text lookup commands.
//!
//! A command is `<record-type> <domain-name>`, e.g. `A example.com`. Only spaces separate
//! tokens. Splitting is deliberately lenient: runs of spaces yield empty tokens, so
//! `"A  example.com"` parses with an empty domain name and the upstream resolver decides what
//! to do with it. Tokens after the domain name are ignored.

use crate::error::Error;

/// A parsed lookup command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub record_type: String,
    pub domain_name: String,
}

impl Command {
    /// Parse `text` into a [`Command`], uppercasing the record type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCommand`] if `text` holds fewer than two space separated tokens
    /// once leading and trailing spaces are trimmed.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut chunks = text.trim_matches(' ').split(' ');
        match (chunks.next(), chunks.next()) {
            (Some(record_type), Some(domain_name)) => Ok(Self {
                record_type: record_type.trim_matches(' ').to_uppercase(),
                domain_name: domain_name.trim_matches(' ').to_string(),
            }),
            _ => Err(Error::MalformedCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Command {
        Command::parse(text).unwrap()
    }

    #[test]
    fn parses_type_and_name() {
        assert_eq!(
            parse("A example.com"),
            Command {
                record_type: "A".to_string(),
                domain_name: "example.com".to_string(),
            }
        );
    }

    #[test]
    fn uppercases_record_type_only() {
        let cmd = parse("aaaa Example.COM");
        assert_eq!(cmd.record_type, "AAAA");
        assert_eq!(cmd.domain_name, "Example.COM");
    }

    #[test]
    fn ignores_extra_tokens() {
        let cmd = parse("mx example.com and more");
        assert_eq!(cmd.record_type, "MX");
        assert_eq!(cmd.domain_name, "example.com");
    }

    #[test]
    fn trims_surrounding_spaces() {
        let cmd = parse("   txt example.com   ");
        assert_eq!(cmd.record_type, "TXT");
        assert_eq!(cmd.domain_name, "example.com");
    }

    #[test]
    fn consecutive_spaces_yield_empty_name() {
        let cmd = parse("A  example.com");
        assert_eq!(cmd.record_type, "A");
        assert_eq!(cmd.domain_name, "");
    }

    #[test]
    fn rejects_fewer_than_two_tokens() {
        for text in ["", " ", "nonsense", "  A  ", "A\texample.com"] {
            assert!(
                matches!(Command::parse(text), Err(Error::MalformedCommand)),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_message_is_stable() {
        assert_eq!(
            Command::parse("nonsense").unwrap_err().to_string(),
            "Missing required args [type name]"
        );
    }
}

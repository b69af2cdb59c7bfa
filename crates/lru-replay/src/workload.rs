//! Workload file parser using nom
//!
//! One operation per line:
//! ```text
//! # comment
//! put <key> <value>
//! get <key>
//! remove <key>
//! contains <key>
//! ```
//! Keywords are case-insensitive; keys and values are whitespace-free tokens.

use std::fs;
use std::io::{self, Read};

use anyhow::{anyhow, Context, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_till1},
    character::complete::{space0, space1},
    combinator::{all_consuming, map},
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult,
};

/// A single cache operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert or replace a value
    Put {
        /// Entry key
        key: String,
        /// Entry value
        value: String,
    },
    /// Lookup with recency bump
    Get(String),
    /// Explicit removal
    Remove(String),
    /// Presence check without recency bump
    Contains(String),
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    alt((
        map(
            preceded(
                terminated(tag_no_case("put"), space1),
                separated_pair(token, space1, token),
            ),
            |(key, value): (&str, &str)| Command::Put {
                key: key.to_string(),
                value: value.to_string(),
            },
        ),
        map(
            preceded(terminated(tag_no_case("get"), space1), token),
            |key: &str| Command::Get(key.to_string()),
        ),
        map(
            preceded(terminated(tag_no_case("remove"), space1), token),
            |key: &str| Command::Remove(key.to_string()),
        ),
        map(
            preceded(terminated(tag_no_case("contains"), space1), token),
            |key: &str| Command::Contains(key.to_string()),
        ),
    ))(input)
}

/// Parse one line; blank lines and comments yield `None`
pub fn parse_line(line: &str) -> Option<std::result::Result<Command, String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    Some(
        all_consuming(delimited(space0, command, space0))(trimmed)
            .map(|(_, cmd)| cmd)
            .map_err(|e| format!("{:?}", e)),
    )
}

/// Parse a whole workload, failing on the first malformed line
pub fn parse(source: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        match parse_line(line) {
            Some(Ok(cmd)) => commands.push(cmd),
            Some(Err(e)) => {
                return Err(anyhow!("line {}: invalid command {:?} ({})", idx + 1, line.trim(), e))
            }
            None => {}
        }
    }
    Ok(commands)
}

/// Read a workload from a path, or from stdin when the path is `-`
pub fn load(path: &str) -> Result<String> {
    if path == "-" {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read workload from stdin")?;
        return Ok(source);
    }

    fs::read_to_string(path).with_context(|| format!("Failed to read workload {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_each_command() {
        assert_eq!(
            parse_line("put a 1"),
            Some(Ok(Command::Put {
                key: "a".to_string(),
                value: "1".to_string()
            }))
        );
        assert_eq!(parse_line("get a"), Some(Ok(Command::Get("a".to_string()))));
        assert_eq!(
            parse_line("remove a"),
            Some(Ok(Command::Remove("a".to_string())))
        );
        assert_eq!(
            parse_line("contains a"),
            Some(Ok(Command::Contains("a".to_string())))
        );
    }

    #[test]
    fn test_parse_case_and_whitespace() {
        assert_eq!(
            parse_line("  PUT   /music/a.mp3\tcluster-7  "),
            Some(Ok(Command::Put {
                key: "/music/a.mp3".to_string(),
                value: "cluster-7".to_string()
            }))
        );
        assert_eq!(parse_line("Get x"), Some(Ok(Command::Get("x".to_string()))));
    }

    #[test]
    fn test_skip_blank_and_comments() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# warm up"), None);
    }

    #[test]
    fn test_reject_malformed() {
        assert!(matches!(parse_line("put a"), Some(Err(_))));
        assert!(matches!(parse_line("get a b"), Some(Err(_))));
        assert!(matches!(parse_line("getx a"), Some(Err(_))));
        assert!(matches!(parse_line("evict a"), Some(Err(_))));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let source = "put a 1\n\n# ok\nget\n";
        let err = parse(source).unwrap_err();
        assert!(err.to_string().starts_with("line 4:"), "{}", err);
    }

    #[test]
    fn test_parse_workload() {
        let commands = parse("put a 1\nget a\n# done\ncontains b\n").unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2], Command::Contains("b".to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "put k v").unwrap();

        let source = load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(source, "put k v\n");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load("/nonexistent/workload.txt").unwrap_err();
        assert!(err.to_string().contains("Failed to read workload"));
    }
}

//! # Intcode program text
//! Programs are written as comma separated decimal integers, e.g. `1,0,0,3,99`.
//! Whitespace around values and a trailing comma or newline are tolerated.

use core::num::ParseIntError;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProgramParseError {
    #[error("program is empty")]
    Empty,
    #[error("value {index} ({token:?}) is not an integer: {source}")]
    InvalidInteger {
        index: usize,
        token: String,
        source: ParseIntError,
    },
}

/// Parses the textual form of an Intcode program.
/// ```rust
/// # use intcode::program::parse_program;
/// assert_eq!(parse_program("1,9,10,3,\n2,3,11,0,99,30,40,50\n"), Ok(vec![1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]));
/// assert!(parse_program("1,,2").is_err());
/// ```
pub fn parse_program(text: &str) -> Result<Vec<i64>, ProgramParseError> {
    let text = text.trim();
    let text = text.strip_suffix(',').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ProgramParseError::Empty);
    }

    text.split(',')
        .map(str::trim)
        .enumerate()
        .map(|(index, token)| {
            token
                .parse()
                .map_err(|source| ProgramParseError::InvalidInteger {
                    index,
                    token: token.to_owned(),
                    source,
                })
        })
        .collect()
}

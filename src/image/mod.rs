//! The program image loader for LS-8.
//!
//! A program image is a text file with one byte per line, written as a
//! binary literal. Anything after a `#` is a comment, and blank or
//! comment-only lines are skipped:
//!
//! ```text
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! ```

use std::{fs, path::Path};

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, line_ending, not_line_ending, space0},
    combinator::{eof, map_res, opt},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use nom_locate::LocatedSpan;
use thiserror::Error;

use crate::plat::MEM_SIZE;

pub type Span<'a> = LocatedSpan<&'a str>;

/// An error for the image loader of LS-8.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("syntax error at ({}:{}): {}", .loc.0, .loc.1, .text)]
    Syntax { loc: (u32, usize), text: String },
    #[error("program image has {0} bytes, memory only holds {}", MEM_SIZE)]
    TooLarge(usize),
    #[error("couldn't read program image: {0}")]
    Io(#[from] std::io::Error),
}

/// Lexes a binary literal that fits in one byte.
pub fn lex_byte(inp: Span) -> IResult<Span, u8> {
    map_res(take_while1(|c: char| c == '0' || c == '1'), |s: Span| {
        u8::from_str_radix(s.fragment(), 2)
    })(inp)
}

pub fn lex_comment(inp: Span) -> IResult<Span, Span> {
    preceded(char('#'), not_line_ending)(inp)
}

/// Lexes one line, yielding its byte if it has one.
pub fn lex_line(inp: Span) -> IResult<Span, Option<u8>> {
    terminated(
        delimited(space0, opt(lex_byte), space0),
        pair(opt(lex_comment), alt((line_ending, eof))),
    )(inp)
}

/// Parses a whole program image into the bytes to load at address 0.
///
/// # Errors
///
/// This function will return an error if a line holds anything other than a
/// byte-sized binary literal and a comment, or if the image doesn't fit in memory.
pub fn parse_image(src: &str) -> Result<Vec<u8>, ImageError> {
    let mut inp = Span::new(src);
    let mut out = vec![];
    while !inp.fragment().is_empty() {
        match lex_line(inp) {
            Ok((rest, byte)) => {
                out.extend(byte);
                inp = rest;
            }
            Err(_) => {
                return Err(ImageError::Syntax {
                    loc: (inp.location_line(), inp.get_utf8_column()),
                    text: inp.fragment().lines().next().unwrap_or_default().to_string(),
                })
            }
        }
    }
    if out.len() > MEM_SIZE {
        return Err(ImageError::TooLarge(out.len()));
    }
    log::debug!("parsed program image: {} bytes", out.len());
    Ok(out)
}

/// Reads and parses the program image at `path`.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<u8>, ImageError> {
    let src = fs::read_to_string(path)?;
    parse_image(&src)
}

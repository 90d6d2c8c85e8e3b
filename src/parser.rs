//! implements a parser for reply lines in the beanstalkd TCP protocol.
use std::fmt;
use std::str::{FromStr, Split};

use crate::types::protocol::ReplyHead;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParsingError {
    BadFormat,
    UnknownReply,
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::BadFormat => "bad format",
            Self::UnknownReply => "unknown reply",
        })
    }
}

impl std::error::Error for ParsingError {}

/// Consumes a token and parses it as an unsigned decimal integer. Only ASCII
/// digits are accepted: no sign, no whitespace.
fn next_num<N: FromStr>(tokens: &mut Split<char>) -> Result<N, ParsingError> {
    let token = tokens.next().ok_or(ParsingError::BadFormat)?;

    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParsingError::BadFormat);
    }

    // Relies on FromStr for overflow checking.
    token.parse().map_err(|_| ParsingError::BadFormat)
}

/// Consumes a token and validates it as a tube name per the beanstalkd name
/// rules.
fn next_name(tokens: &mut Split<char>) -> Result<String, ParsingError> {
    let token = tokens.next().ok_or(ParsingError::BadFormat)?;

    fn char_is_name_safe(c: u8, is_first: bool) -> bool {
        match c {
            b'a'..=b'z' => true,
            b'A'..=b'Z' => true,
            b'0'..=b'9' => true,
            b'+' | b'/' | b';' | b'.' | b'$' | b'_' | b'(' | b')' => true,
            b'-' => !is_first, // - is only name safe outside first position
            _ => false,
        }
    }

    if !token.is_empty()
        && token.len() <= 200
        && token
            .bytes()
            .enumerate()
            .all(|(i, c)| char_is_name_safe(c, i == 0))
    {
        Ok(token.to_owned())
    } else {
        Err(ParsingError::BadFormat)
    }
}

// Parsing is implemented to fulfil the TryFrom trait. The input is the reply
// line with its trailing CRLF already removed.
impl TryFrom<&[u8]> for ReplyHead {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        // Reply lines are pure ASCII; anything else is malformed.
        let line =
            std::str::from_utf8(value).map_err(|_| ParsingError::BadFormat)?;

        let mut tokens = line.split(' ');

        let head = match tokens.next() {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ParsingError::BadFormat),
        };

        let reply = match head {
            // <name>
            "NOT_FOUND" => ReplyHead::NotFound,
            "DELETED" => ReplyHead::Deleted,
            "TIMED_OUT" => ReplyHead::TimedOut,
            "DEADLINE_SOON" => ReplyHead::DeadlineSoon,
            "NOT_IGNORED" => ReplyHead::NotIgnored,
            "OUT_OF_MEMORY" => ReplyHead::OutOfMemory,
            "INTERNAL_ERROR" => ReplyHead::InternalError,
            "BAD_FORMAT" => ReplyHead::BadFormat,
            "UNKNOWN_COMMAND" => ReplyHead::UnknownCommand,
            "EXPECTED_CRLF" => ReplyHead::ExpectedCrlf,
            "JOB_TOO_BIG" => ReplyHead::JobTooBig,
            "DRAINING" => ReplyHead::Draining,

            // <name> <arg>...
            "INSERTED" => ReplyHead::Inserted {
                id: next_num(&mut tokens)?,
            },
            "USING" => ReplyHead::Using {
                tube: next_name(&mut tokens)?,
            },
            "FOUND" => ReplyHead::Found {
                id: next_num(&mut tokens)?,
                n_bytes: next_num(&mut tokens)?,
            },
            "RESERVED" => ReplyHead::Reserved {
                id: next_num(&mut tokens)?,
                n_bytes: next_num(&mut tokens)?,
            },
            "OK" => ReplyHead::Ok {
                n_bytes: next_num(&mut tokens)?,
            },
            "WATCHING" => ReplyHead::Watching {
                count: next_num(&mut tokens)?,
            },

            // <name> [<arg>] - the argument distinguishes the kick/put forms
            // from the kick-job/bury ones.
            "KICKED" => ReplyHead::Kicked {
                count: match tokens.next() {
                    Some(t) => Some(parse_num(t)?),
                    None => None,
                },
            },
            "BURIED" => ReplyHead::Buried {
                id: match tokens.next() {
                    Some(t) => Some(parse_num(t)?),
                    None => None,
                },
            },

            _ => return Err(ParsingError::UnknownReply),
        };

        // Reject trailing tokens (including trailing spaces).
        if tokens.next().is_some() {
            return Err(ParsingError::BadFormat);
        }

        Ok(reply)
    }
}

/// As `next_num`, for an already-taken token.
fn parse_num<N: FromStr>(token: &str) -> Result<N, ParsingError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParsingError::BadFormat);
    }

    token.parse().map_err(|_| ParsingError::BadFormat)
}

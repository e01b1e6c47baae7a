//! Topic level parsing
//!
//! Topics are walked one level at a time: `next_level` returns the first
//! level and the rest of the topic, rejecting misplaced wildcards on the way.
//!
//! Rules:
//! - `/` separates levels
//! - `+` must occupy an entire level
//! - `#` must occupy an entire level and be the last one
//! - A zero-length level is keyed as `LEADING_EMPTY_LEVEL`
//! - A trailing `/` does not open another level

use super::error::TopicError;

/// Level separator
pub const SEPARATOR: u8 = b'/';

/// Single-level wildcard
pub const SINGLE_WILDCARD: &str = "+";

/// Multi-level wildcard
pub const MULTI_WILDCARD: &str = "#";

/// Trie key used for a zero-length level (`/a`, `a//b`).
///
/// It is the single-level wildcard, so an empty level matches any level.
pub const LEADING_EMPTY_LEVEL: &str = SINGLE_WILDCARD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Regular characters
    Chr,
    /// Saw `#` at the start of the level
    Mwc,
    /// Saw `+` at the start of the level
    Swc,
}

/// Split `topic` into its first level and the remaining levels.
///
/// When there is no separator the whole topic is the level and the
/// remainder is empty.
pub fn next_level(topic: &str) -> Result<(&str, &str), TopicError> {
    let mut state = State::Chr;

    for (i, c) in topic.bytes().enumerate() {
        match c {
            SEPARATOR => {
                if state == State::Mwc {
                    return Err(TopicError::MultiWildcardNotLast);
                }
                if i == 0 {
                    return Ok((LEADING_EMPTY_LEVEL, &topic[1..]));
                }
                return Ok((&topic[..i], &topic[i + 1..]));
            }
            b'#' => {
                if i != 0 {
                    return Err(TopicError::MultiWildcardNotAlone);
                }
                state = State::Mwc;
            }
            b'+' => {
                if i != 0 {
                    return Err(TopicError::SingleWildcardNotAlone);
                }
                state = State::Swc;
            }
            _ => match state {
                State::Mwc => return Err(TopicError::MultiWildcardNotAlone),
                State::Swc => return Err(TopicError::SingleWildcardNotAlone),
                State::Chr => {}
            },
        }
    }

    Ok((topic, ""))
}

/// Walk every level of `topic`, failing on the first misplaced wildcard
pub fn validate(topic: &str) -> Result<(), TopicError> {
    let mut rest = topic;
    while !rest.is_empty() {
        let (_, next) = next_level(rest)?;
        rest = next;
    }
    Ok(())
}

use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid frame range '{0}'. Expected 'N', 'A..B', 'A..=B' or 'A..'.")]
    InvalidFrameRange(String),

    #[error("Invalid frame number '{0}'.")]
    InvalidFrameNumber(String),

    #[error("Frame range '{0}' is empty.")]
    EmptyFrameRange(String),

    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidAssignment(String),
}

/// A frame range as written on the command line. An open end extends to the
/// last frame of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl FrameRange {
    pub fn all() -> Self {
        Self {
            start: 0,
            end: None,
        }
    }

    pub fn resolve(&self, frame_count: usize) -> Range<usize> {
        self.start..self.end.unwrap_or(frame_count)
    }
}

fn parse_frame_number(value: &str) -> Result<usize, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidFrameNumber(value.to_string()))
}

pub fn parse_frame_range(value: &str) -> Result<FrameRange, ParseError> {
    let trimmed = value.trim();
    let Some((start, rest)) = trimmed.split_once("..") else {
        let frame = parse_frame_number(trimmed)?;
        return Ok(FrameRange {
            start: frame,
            end: Some(frame + 1),
        });
    };

    let start = if start.is_empty() {
        0
    } else {
        parse_frame_number(start)?
    };
    let end = if let Some(inclusive) = rest.strip_prefix('=') {
        if inclusive.is_empty() {
            return Err(ParseError::InvalidFrameRange(value.to_string()));
        }
        Some(parse_frame_number(inclusive)? + 1)
    } else if rest.is_empty() {
        None
    } else {
        Some(parse_frame_number(rest)?)
    };

    if end.is_some_and(|end| end <= start) {
        return Err(ParseError::EmptyFrameRange(value.to_string()));
    }
    Ok(FrameRange { start, end })
}

/// Splits a `KEY=VALUE` override into its trimmed parts.
pub fn parse_assignment(value: &str) -> Result<(&str, &str), ParseError> {
    match value.split_once('=') {
        Some((key, raw)) if !key.trim().is_empty() => Ok((key.trim(), raw.trim())),
        _ => Err(ParseError::InvalidAssignment(value.to_string())),
    }
}

/// Interprets an override value as a TOML value, falling back to a plain
/// string for bare words.
pub fn parse_toml_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

//! Raw `multipart/form-data` decoder for upload bodies.
//!
//! Pure transformation from body bytes to named fields. Parts that cannot
//! be parsed are skipped and counted rather than failing the whole body;
//! whether a missing field is fatal is the caller's decision.

use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// A decoded form field: either a plain text value or an uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File { filename: String, content: Vec<u8> },
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::File { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DecodedForm {
    pub fields: HashMap<String, FormValue>,
    /// Parts dropped because they had no recognizable Content-Disposition
    /// or an undecodable text body. Callers log this for observability.
    pub skipped_parts: usize,
}

/// Decodes a raw multipart body using the boundary from `content_type`.
pub fn decode(body: &[u8], content_type: &str) -> Result<DecodedForm> {
    let boundary = boundary_param(content_type).ok_or(PipelineError::MalformedContentType)?;
    let delimiter = format!("--{boundary}").into_bytes();

    let segments = split_on(body, &delimiter);
    let mut form = DecodedForm::default();
    if segments.len() < 3 {
        // No complete part between two delimiters.
        return Ok(form);
    }

    // Drop the preamble before the first delimiter and the epilogue after
    // the closing one.
    for segment in &segments[1..segments.len() - 1] {
        match parse_part(segment) {
            Some((name, value)) => {
                form.fields.insert(name, value);
            }
            None => form.skipped_parts += 1,
        }
    }

    Ok(form)
}

/// Extracts the `boundary` parameter from a Content-Type header value.
fn boundary_param(content_type: &str) -> Option<String> {
    for param in content_type.split(';') {
        let param = param.trim();
        if let Some(value) = param.strip_prefix("boundary=") {
            let value = value.trim_matches('"');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn parse_part(segment: &[u8]) -> Option<(String, FormValue)> {
    // Headers end at the first blank line.
    let separator = find(segment, b"\r\n\r\n")?;
    let headers = String::from_utf8_lossy(&segment[..separator]);
    let body = trim_trailing_newline(&segment[separator + 4..]);

    let (name, filename) = content_disposition(&headers)?;

    let value = match filename {
        Some(filename) => FormValue::File {
            filename,
            content: body.to_vec(),
        },
        None => FormValue::Text(String::from_utf8(body.to_vec()).ok()?),
    };
    Some((name, value))
}

/// Recovers field `name` and optional `filename` from the part's
/// Content-Disposition header.
fn content_disposition(headers: &str) -> Option<(String, Option<String>)> {
    let line = headers
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("content-disposition:"))?;

    let mut name = None;
    let mut filename = None;
    for param in line.split(';') {
        let param = param.trim();
        if let Some(value) = param.strip_prefix("name=") {
            name = Some(value.trim_matches('"').to_string());
        } else if let Some(value) = param.strip_prefix("filename=") {
            filename = Some(value.trim_matches('"').to_string());
        }
    }
    name.map(|name| (name, filename))
}

/// Trims a single trailing line break, which belongs to the framing and
/// not to the part body.
fn trim_trailing_newline(body: &[u8]) -> &[u8] {
    if let Some(stripped) = body.strip_suffix(b"\r\n") {
        stripped
    } else if let Some(stripped) = body.strip_suffix(b"\n") {
        stripped
    } else {
        body
    }
}

fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut at = 0;
    while at + needle.len() <= haystack.len() {
        if &haystack[at..at + needle.len()] == needle {
            segments.push(&haystack[start..at]);
            at += needle.len();
            start = at;
        } else {
            at += 1;
        }
    }
    segments.push(&haystack[start..]);
    segments
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

//! Boundary Scanner
//!
//! Pure functions over the session's working buffer: find the header/body
//! separator of a part, find the next boundary, and decide how many bytes
//! can be flushed without risking a boundary split across two reads.

use memchr::memmem;

use super::types::{HEADER_SEPARATOR, MAX_BOUNDARY_LEN};

// ============================================================================
// Delimiter
// ============================================================================

/// The boundary token of one request, plus its retention margin.
///
/// The searched token is `--<boundary>`. A delimiter line in the body is
/// `\r\n--<boundary>`, so up to `token.len() + 1` trailing bytes can be the
/// start of a delimiter that the next read completes.
#[derive(Debug)]
pub struct Delimiter {
    token: Vec<u8>,
    finder: memmem::Finder<'static>,
    margin: usize,
}

impl Delimiter {
    /// Build the delimiter for `boundary`, holding back at least `min_margin` bytes
    pub fn new(boundary: &str, min_margin: usize) -> Self {
        let token = format!("--{boundary}").into_bytes();
        let finder = memmem::Finder::new(&token).into_owned();
        let margin = (token.len() + 2 - 1).max(min_margin);
        Self { token, finder, margin }
    }

    /// The literal `--<boundary>` token
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// Bytes retained at the buffer tail while no boundary is found
    pub fn margin(&self) -> usize {
        self.margin
    }

    /// How many leading bytes of a `len`-byte body buffer can be flushed
    pub fn safe_flush_len(&self, len: usize) -> usize {
        len.saturating_sub(self.margin)
    }

    fn find(&self, haystack: &[u8]) -> Option<usize> {
        self.finder.find(haystack)
    }
}

// ============================================================================
// Locate
// ============================================================================

/// Result of one scan over the working buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// Start of the CRLF CRLF separator ending the part header block
    pub header_end: Option<usize>,
    /// Start of the `--<boundary>` token ending the part body
    pub boundary_pos: Option<usize>,
}

impl Location {
    /// Nothing found; the caller keeps its buffer and waits for more data
    pub fn needs_more_data(&self) -> bool {
        self.header_end.is_none() && self.boundary_pos.is_none()
    }
}

/// Scan `buffer` for the structure relevant to the current phase.
///
/// While `header_found` is false only the header separator is searched,
/// starting at `from` (bytes before it are known not to hold a match).
/// Once the header is consumed only the boundary token is searched.
pub fn locate(buffer: &[u8], delimiter: &Delimiter, header_found: bool, from: usize) -> Location {
    if header_found {
        return Location {
            header_end: None,
            boundary_pos: delimiter.find(buffer),
        };
    }

    let from = from.min(buffer.len());
    Location {
        header_end: memmem::find(&buffer[from..], HEADER_SEPARATOR).map(|pos| pos + from),
        boundary_pos: None,
    }
}

/// Start of the last CRLF in `buffer`.
///
/// While a header is incomplete, the lines before it are complete and can be
/// parsed and dropped; the CRLF itself may begin the header separator.
pub fn last_line_break(buffer: &[u8]) -> Option<usize> {
    memmem::rfind(buffer, b"\r\n")
}

/// Where the content before a boundary at `boundary_pos` ends.
///
/// The CRLF preceding the boundary belongs to the delimiter, not the content.
pub fn content_end(buffer: &[u8], boundary_pos: usize) -> usize {
    if boundary_pos >= 2 && &buffer[boundary_pos - 2..boundary_pos] == b"\r\n" {
        boundary_pos - 2
    } else {
        boundary_pos
    }
}

// ============================================================================
// Header Parsing
// ============================================================================

/// Fields of a part's `Content-Disposition` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeader {
    pub name: Option<String>,
    pub filename: Option<String>,
}

impl PartHeader {
    /// Parse a raw header block (may start with the boundary line)
    pub fn parse(block: &[u8]) -> Self {
        let mut header = PartHeader::default();
        header.absorb(block);
        header
    }

    /// Merge the fields found in `block`, a run of complete header lines
    pub fn absorb(&mut self, block: &[u8]) {
        let text = String::from_utf8_lossy(block);

        for line in text.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("content-disposition") {
                continue;
            }
            for param in value.split(';').skip(1) {
                let Some((k, v)) = param.trim().split_once('=') else {
                    continue;
                };
                let k = k.trim();
                if k.eq_ignore_ascii_case("name") {
                    self.name = Some(unquote(v));
                } else if k.eq_ignore_ascii_case("filename") {
                    self.filename = Some(unquote(v));
                }
            }
        }
    }

    /// A part without a filename and not named `file` is a plain form field
    pub fn is_form_field(&self) -> bool {
        match (&self.name, &self.filename) {
            (Some(name), None) => name != "file",
            _ => false,
        }
    }
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

// ============================================================================
// Content-Type
// ============================================================================

/// Boundary parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundaryError {
    #[error("Invalid content type")]
    NotMultipart,
    #[error("Invalid multipart boundary")]
    MissingBoundary,
}

/// Extract the boundary from a `multipart/form-data; boundary=...` header
pub fn parse_boundary(content_type: &str) -> Result<String, BoundaryError> {
    let mut params = content_type.split(';');
    let main = params.next().unwrap_or("").trim();
    if !main.eq_ignore_ascii_case("multipart/form-data") {
        return Err(BoundaryError::NotMultipart);
    }

    for param in params {
        let Some((k, v)) = param.trim().split_once('=') else {
            continue;
        };
        if k.trim().eq_ignore_ascii_case("boundary") {
            let boundary = v.trim().trim_matches('"');
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(BoundaryError::MissingBoundary);
            }
            return Ok(boundary.to_string());
        }
    }

    Err(BoundaryError::MissingBoundary)
}

// ============================================================================
// Tests
// ============================================================================

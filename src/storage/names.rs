//! Random names for stored files, short URLs and deletion tokens

use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use tokio::fs::OpenOptions;

/// URL-safe characters used in generated names
pub const NAME_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_~";

/// Default length of a generated stem
pub const DEFAULT_NAME_LENGTH: usize = 8;

/// Length of deletion tokens, independent of the configured name length
pub const DELETION_TOKEN_LENGTH: usize = 24;

/// Attempts before giving up on finding a free file name
const MAX_RESERVE_ATTEMPTS: usize = 32;

/// What a generated name is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMode {
    /// Random stem plus the original's extension
    File,
    /// Bare random token
    Url,
}

/// Generates random names of a fixed length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameGenerator {
    length: usize,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_LENGTH)
    }
}

impl NameGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    /// A bare random token
    pub fn token(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
            .collect()
    }

    pub fn generate(&self, original: &str, mode: NameMode) -> String {
        match mode {
            NameMode::Url => self.token(),
            NameMode::File => format!("{}{}", self.token(), extension(original)),
        }
    }

    /// Pick a free name in `dir` and create it empty so no other session can take it.
    ///
    /// The returned path is then replaced by the committed upload.
    pub async fn reserve_file_name(
        &self,
        dir: &Path,
        original: &str,
    ) -> io::Result<(String, PathBuf)> {
        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let name = self.generate(original, NameMode::File);
            let path = dir.join(&name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok((name, path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(name = %name, "Generated name taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free file name found",
        ))
    }
}

/// A fresh secret for a deletion URL
pub fn deletion_token() -> String {
    NameGenerator::new(DELETION_TOKEN_LENGTH).token()
}

/// Last extension of `name`, including the dot, or an empty string
pub fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[pos..],
        None => "",
    }
}

/// Turn a raw `x-file-name` header value into a safe base name.
///
/// The value is URL-decoded, reduced to its last path component and
/// stripped of leading dots. Returns `None` when nothing usable is left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    let base = decoded
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('.');

    if base.is_empty() || base.chars().any(char::is_control) {
        return None;
    }

    Some(base.to_string())
}

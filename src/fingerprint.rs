//! File fingerprint computation
//!
//! A fingerprint is the MD5 digest of a file's full content plus, for
//! capture-eligible files, the content itself. The file is read once:
//! captured files are buffered and hashed from the buffer, all others are
//! streamed through the hasher.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const BUFFER_SIZE: usize = 64 * 1024;

/// Fingerprint of a single file at scan time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub path: PathBuf,
    /// Lower-case hex MD5 of the full content
    pub hash: String,
    /// `None` when the file is not capture-eligible. An eligible empty file
    /// yields `Some(vec![])`.
    pub content: Option<Vec<u8>>,
    pub size: u64,
}

impl Fingerprint {
    /// Fingerprint `path`, capturing its content when `capture` is set
    pub fn from_path(path: &Path, capture: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        if capture {
            let mut content = Vec::new();
            BufReader::new(file)
                .read_to_end(&mut content)
                .map_err(|e| Error::io(path, e))?;

            return Ok(Self {
                path: path.to_path_buf(),
                hash: hash_bytes(&content),
                size: content.len() as u64,
                content: Some(content),
            });
        }

        let (hash, size) = hash_reader(file).map_err(|e| Error::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            hash,
            content: None,
            size,
        })
    }

    /// Captured content decoded for display and diffing
    pub fn content_text(&self) -> Option<String> {
        self.content
            .as_deref()
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }
}

/// MD5 of an in-memory buffer as lower-case hex
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Stream a reader through MD5, returning the hex digest and byte count
fn hash_reader(reader: impl Read) -> std::io::Result<(String, u64)> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, reader);
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        context.consume(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok((format!("{:x}", context.compute()), total))
}

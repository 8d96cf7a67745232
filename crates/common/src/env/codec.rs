use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use super::{EnvError, Snapshot};

/// Render a snapshot as sorted `KEY=value\n` lines
///
/// Values that the unquoted dialect would alter (surrounding whitespace,
/// quotes, `#`, backslashes, line breaks) are written double quoted with
/// escapes, so parsing the output always gives back the same snapshot.
pub fn canonicalize(snapshot: &Snapshot) -> Vec<u8> {
    let mut out = String::new();
    for (key, value) in snapshot {
        out.push_str(key);
        out.push('=');
        if is_plain(value) {
            out.push_str(value);
        } else {
            push_quoted(&mut out, value);
        }
        out.push('\n');
    }
    out.into_bytes()
}

/// Render a snapshot as a `.env` file with every value double quoted
pub fn encode_env_file(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for (key, value) in snapshot {
        out.push_str(key);
        out.push('=');
        push_quoted(&mut out, value);
        out.push('\n');
    }
    out
}

fn is_plain(value: &str) -> bool {
    value.trim() == value
        && !value
            .chars()
            .any(|c| matches!(c, '"' | '\'' | '#' | '\\' | '\n' | '\r'))
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Gzip-compress a canonical payload
pub fn compress(data: &[u8]) -> Result<Vec<u8>, EnvError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| EnvError::PayloadCorrupt(format!("compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| EnvError::PayloadCorrupt(format!("compression failed: {}", e)))
}

/// Decompress a gzip payload
///
/// Truncated or malformed streams are rejected as a whole; partial output
/// is never returned.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, EnvError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| EnvError::PayloadCorrupt(format!("decompression failed: {}", e)))?;
    Ok(out)
}

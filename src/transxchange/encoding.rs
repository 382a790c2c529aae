// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Text encoding of TransXChange files, which come as UTF-8 (with or
//! without byte order mark), UTF-16 or legacy single byte encodings.

use super::ParseError;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// Encoding announced by the document itself: byte order mark, UTF-16
/// without byte order mark, or XML declaration. Defaults to UTF-8.
pub(crate) fn sniff(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    match bytes {
        [0, b'<', ..] => UTF_16BE,
        [b'<', 0, ..] => UTF_16LE,
        _ => declared_encoding(bytes).unwrap_or(UTF_8),
    }
}

fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let declaration = head.trim_start().strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];
    let value = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let value = value.trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let label = value[1..].split(quote).next()?;
    match Encoding::for_label(label.as_bytes()) {
        // An ASCII readable declaration cannot be UTF-16
        Some(encoding) if encoding == UTF_16LE || encoding == UTF_16BE => None,
        encoding => encoding,
    }
}

/// Guess the encoding from the content itself.
pub(crate) fn detect(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Decode the whole document, failing on any malformed sequence.
pub(crate) fn decode(bytes: &[u8], encoding: &'static Encoding) -> Result<String, ParseError> {
    let bytes = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_length)) if bom_encoding == encoding => &bytes[bom_length..],
        _ => bytes,
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(ParseError::Encoding(encoding.name()));
    }
    Ok(text.into_owned())
}

//! Byte-encoding detection for CSV input.
//!
//! Detection produces a probable encoding with a confidence score. Below
//! [`CONFIDENCE_THRESHOLD`] the bytes are tried against [`FALLBACK_ENCODINGS`]
//! in order and the first one that decodes without error wins. A clean decode
//! says nothing about whether the text is what the author meant; a cp1252 file
//! decoded as latin1 will "succeed" with the wrong characters.

use std::fmt;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};

pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

pub const FALLBACK_ENCODINGS: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Cp1252,
    TextEncoding::Iso8859_1,
    TextEncoding::Latin1,
];

/// Bytes with no assigned character in windows-1252.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// High bytes that are letters in windows-1252 (Š, Œ, Ž, š, œ, ž, Ÿ).
const CP1252_HIGH_LETTERS: [u8; 7] = [0x8A, 0x8C, 0x8E, 0x9A, 0x9C, 0x9E, 0x9F];

/// Confidence multiplier for single-byte Western guesses.
const SINGLE_BYTE_CONFIDENCE_SCALE: f32 = 0.73;

const UTF8_ONE_CHAR_PROBABILITY: f32 = 0.5;
const UTF8_CONFIDENT_SEQUENCES: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Cp1252,
    Iso8859_1,
    Latin1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Cp1252 => "cp1252",
            TextEncoding::Iso8859_1 => "iso-8859-1",
            TextEncoding::Latin1 => "latin1",
        }
    }

    /// Strict decode: `None` when any byte sequence is invalid for this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => decode_strict(UTF_8, strip_bom(bytes, UTF_8)),
            TextEncoding::Utf16Le => decode_strict(UTF_16LE, strip_bom(bytes, UTF_16LE)),
            TextEncoding::Utf16Be => decode_strict(UTF_16BE, strip_bom(bytes, UTF_16BE)),
            TextEncoding::Cp1252 => {
                if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
                    None
                } else {
                    decode_strict(WINDOWS_1252, bytes)
                }
            }
            // encoding_rs folds ISO-8859-1 into windows-1252, so map bytes directly.
            TextEncoding::Iso8859_1 | TextEncoding::Latin1 => {
                if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
                    None
                } else {
                    Some(bytes.iter().map(|&b| char::from(b)).collect())
                }
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub encoding: Option<TextEncoding>,
    pub confidence: f32,
}

/// Sniffs the most probable encoding of `bytes`.
pub fn detect(bytes: &[u8]) -> Detection {
    if bytes.is_empty() {
        return Detection {
            encoding: None,
            confidence: 0.0,
        };
    }
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        let encoding = if encoding == UTF_16LE {
            TextEncoding::Utf16Le
        } else if encoding == UTF_16BE {
            TextEncoding::Utf16Be
        } else {
            TextEncoding::Utf8
        };
        return Detection {
            encoding: Some(encoding),
            confidence: 1.0,
        };
    }
    if bytes.is_ascii() {
        return Detection {
            encoding: Some(TextEncoding::Utf8),
            confidence: 1.0,
        };
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        let multibyte = text.chars().filter(|c| c.len_utf8() > 1).count();
        return Detection {
            encoding: Some(TextEncoding::Utf8),
            confidence: utf8_confidence(multibyte),
        };
    }
    Detection {
        encoding: Some(TextEncoding::Cp1252),
        confidence: single_byte_confidence(bytes),
    }
}

/// Picks the encoding used to decode CSV bytes.
pub fn resolve(bytes: &[u8]) -> TextEncoding {
    let detection = detect(bytes);
    if detection.confidence < CONFIDENCE_THRESHOLD
        && let Some(fallback) = FALLBACK_ENCODINGS
            .iter()
            .find(|candidate| candidate.decode(bytes).is_some())
    {
        return *fallback;
    }
    detection.encoding.unwrap_or(TextEncoding::Utf8)
}

fn utf8_confidence(multibyte: usize) -> f32 {
    let sequences = i32::try_from(multibyte).unwrap_or(i32::MAX);
    if sequences >= UTF8_CONFIDENT_SEQUENCES {
        0.99
    } else {
        1.0 - 0.99 * UTF8_ONE_CHAR_PROBABILITY.powi(sequences)
    }
}

fn single_byte_confidence(bytes: &[u8]) -> f32 {
    let (high, letters) = bytes
        .iter()
        .filter(|b| **b >= 0x80)
        .fold((0usize, 0usize), |(high, letters), b| {
            let letter = *b >= 0xC0 || CP1252_HIGH_LETTERS.contains(b);
            (high + 1, letters + usize::from(letter))
        });
    if high == 0 {
        return 0.0;
    }
    SINGLE_BYTE_CONFIDENCE_SCALE * (letters as f32 / high as f32)
}

fn strip_bom<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> &'a [u8] {
    match Encoding::for_bom(bytes) {
        Some((found, len)) if found == encoding => &bytes[len..],
        _ => bytes,
    }
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

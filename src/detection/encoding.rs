//! Encoding detection by explicit byte scoring.
//!
//! Two candidates are scored from the raw bytes: UTF-8 and Windows-1252 (the Western
//! European single-byte encoding the source files are exported in). A byte-order mark
//! short-circuits scoring. Scores within [`ENCODING_TIE_EPSILON`] of the best are resolved
//! by [`preference_order`], and a best score under the policy's minimum confidence falls
//! back to [`fallback_encoding`] with `low_confidence` set.

use std::cmp::Ordering;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tracing::{debug, warn};

use crate::error::{NormalizeError, NormalizeResult};
use crate::types::EncodingGuess;

/// Below this confidence the detector falls back to [`fallback_encoding`].
pub const MIN_ENCODING_CONFIDENCE: f32 = 0.7;

/// Candidates scoring within this distance of the best are considered tied.
pub const ENCODING_TIE_EPSILON: f32 = 0.05;

/// Score given to every candidate when the sample is plain ASCII (all candidates agree).
pub const ASCII_CONFIDENCE: f32 = 0.99;

/// Only this many leading bytes are scored.
pub const ENCODING_SAMPLE_BYTES: usize = 1 << 20;

/// Windows-1252 byte values with no assigned character.
const UNDEFINED_1252: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Tie-break order: single-byte Western European before multi-byte.
pub fn preference_order() -> [&'static Encoding; 2] {
    [WINDOWS_1252, UTF_8]
}

/// Encoding used when detection is not confident enough.
pub fn fallback_encoding() -> &'static Encoding {
    WINDOWS_1252
}

/// Thresholds used by [`detect_encoding_with`] and [`decode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingPolicy {
    pub min_confidence: f32,
    pub tie_epsilon: f32,
    pub fallback: &'static Encoding,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            min_confidence: MIN_ENCODING_CONFIDENCE,
            tie_epsilon: ENCODING_TIE_EPSILON,
            fallback: fallback_encoding(),
        }
    }
}

/// One scored candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingCandidate {
    pub encoding: &'static Encoding,
    pub score: f32,
}

/// Score every candidate and return them best first.
///
/// Ties (within `tie_epsilon` of each other) keep [`preference_order`].
pub fn rank_encodings(bytes: &[u8], tie_epsilon: f32) -> Vec<EncodingCandidate> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return vec![EncodingCandidate { encoding, score: 1.0 }];
    }

    let sample = &bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)];
    let truncated = sample.len() < bytes.len();

    let mut ranked: Vec<EncodingCandidate> = preference_order()
        .into_iter()
        .map(|encoding| {
            let score = if encoding == UTF_8 {
                utf8_score(sample, truncated)
            } else {
                windows_1252_score(sample)
            };
            EncodingCandidate { encoding, score }
        })
        .collect();

    // Candidates tied with the best come first, in preference order (the sort is stable).
    let best = ranked.iter().map(|c| c.score).fold(0.0f32, f32::max);
    ranked.sort_by(|a, b| {
        let a_tied = best - a.score <= tie_epsilon;
        let b_tied = best - b.score <= tie_epsilon;
        b_tied.cmp(&a_tied).then_with(|| {
            if a_tied {
                Ordering::Equal
            } else {
                b.score.total_cmp(&a.score)
            }
        })
    });
    ranked
}

/// Detect the encoding of `bytes` with the default [`EncodingPolicy`].
pub fn detect_encoding(bytes: &[u8]) -> NormalizeResult<EncodingGuess> {
    detect_encoding_with(bytes, &EncodingPolicy::default())
}

/// Detect the encoding of `bytes`.
///
/// Never fails on non-empty input; the worst case is a low-confidence fallback.
pub fn detect_encoding_with(bytes: &[u8], policy: &EncodingPolicy) -> NormalizeResult<EncodingGuess> {
    if bytes.is_empty() {
        return Err(NormalizeError::EmptyFile);
    }

    let ranked = rank_encodings(bytes, policy.tie_epsilon);
    let guess = match ranked.first() {
        Some(top) if top.score >= policy.min_confidence => EncodingGuess {
            encoding: top.encoding,
            confidence: top.score,
            low_confidence: false,
        },
        Some(top) => EncodingGuess {
            encoding: policy.fallback,
            confidence: top.score,
            low_confidence: true,
        },
        None => EncodingGuess {
            encoding: policy.fallback,
            confidence: 0.0,
            low_confidence: true,
        },
    };

    debug!(
        encoding = guess.name(),
        confidence = guess.confidence,
        low_confidence = guess.low_confidence,
        candidates = ranked.len(),
        "encoding detected"
    );
    Ok(guess)
}

/// Text produced by [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedText {
    pub text: String,
    /// The encoding actually used (the fallback when the first decode failed).
    pub guess: EncodingGuess,
    /// First decode error, when the guessed encoding could not decode the bytes.
    pub decode_error: Option<String>,
}

/// Decode `bytes` with the guessed encoding, re-decoding with the policy's fallback when
/// the guess hits malformed sequences.
///
/// A leading byte-order mark matching the guessed encoding is stripped.
pub fn decode(bytes: &[u8], guess: EncodingGuess, policy: &EncodingPolicy) -> DecodedText {
    let body = strip_bom(bytes, guess.encoding);
    if let Some(text) = guess.encoding.decode_without_bom_handling_and_without_replacement(body) {
        return DecodedText {
            text: text.into_owned(),
            guess,
            decode_error: None,
        };
    }

    let error = describe_decode_error(body, guess.encoding);
    warn!(
        encoding = guess.name(),
        fallback = policy.fallback.name(),
        error = %error,
        "decode failed, retrying with fallback encoding"
    );

    let (text, _had_errors) = policy.fallback.decode_without_bom_handling(body);
    DecodedText {
        text: text.into_owned(),
        guess: EncodingGuess {
            encoding: policy.fallback,
            confidence: guess.confidence,
            low_confidence: true,
        },
        decode_error: Some(error),
    }
}

fn strip_bom<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> &'a [u8] {
    match Encoding::for_bom(bytes) {
        Some((bom_encoding, len)) if bom_encoding == encoding => &bytes[len..],
        _ => bytes,
    }
}

fn describe_decode_error(bytes: &[u8], encoding: &'static Encoding) -> String {
    if encoding == UTF_8 {
        if let Err(e) = std::str::from_utf8(bytes) {
            return format!("invalid UTF-8 sequence at byte {}", e.valid_up_to());
        }
    }
    format!("malformed {} input", encoding.name())
}

/// Share of non-ASCII sequences that are well-formed UTF-8.
///
/// C0 control bytes (other than tab, CR, LF) count against the score.
pub fn utf8_score(sample: &[u8], truncated: bool) -> f32 {
    let controls = count_controls(sample);
    let mut valid_multibyte = 0usize;
    let mut invalid = 0usize;

    let mut rest = sample;
    loop {
        match std::str::from_utf8(rest) {
            Ok(_) => {
                valid_multibyte += count_lead_bytes(rest);
                break;
            }
            Err(e) => {
                let (good, after) = rest.split_at(e.valid_up_to());
                valid_multibyte += count_lead_bytes(good);
                match e.error_len() {
                    Some(len) => {
                        invalid += 1;
                        rest = &after[len..];
                    }
                    None => {
                        // Incomplete sequence at the end: only an error if the sample is the whole input.
                        if !truncated {
                            invalid += 1;
                        }
                        break;
                    }
                }
            }
        }
    }

    ratio(valid_multibyte, valid_multibyte + invalid + controls)
}

/// Share of high bytes that read as plausible Western European text in Windows-1252.
///
/// Well-formed UTF-8 multi-byte sequences are the classic mojibake signature and count as
/// implausible, as do undefined byte values and C0 control bytes.
pub fn windows_1252_score(sample: &[u8]) -> f32 {
    let controls = count_controls(sample);
    let mut high = 0usize;
    let mut plausible = 0usize;

    let mut i = 0;
    while i < sample.len() {
        let b = sample[i];
        if b < 0x80 {
            i += 1;
            continue;
        }
        if let Some(len) = utf8_sequence_len(&sample[i..]) {
            high += len;
            i += len;
            continue;
        }
        high += 1;
        if !UNDEFINED_1252.contains(&b) {
            plausible += 1;
        }
        i += 1;
    }

    ratio(plausible, high + controls)
}

/// Length of the well-formed UTF-8 multi-byte sequence starting at `bytes[0]`, if any.
fn utf8_sequence_len(bytes: &[u8]) -> Option<usize> {
    let len = match bytes.first()? {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return None,
    };
    let seq = bytes.get(..len)?;
    std::str::from_utf8(seq).ok().map(|_| len)
}

fn count_lead_bytes(valid_utf8: &[u8]) -> usize {
    valid_utf8.iter().filter(|&&b| b >= 0xC0).count()
}

fn count_controls(sample: &[u8]) -> usize {
    sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
        .count()
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        ASCII_CONFIDENCE
    } else if num == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

//! Parser for the tuple-serialized (RadioML-2016-style) container.
//!
//! The decoded input is a single flat textual representation of a dict
//! whose keys are tuples `('<modName>', snr_dB)` and whose values contain a
//! bracketed list of decimal floats. See SPEC_FULL.md section 5 / spec
//! section 4.3.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::constants::{constants, DatasetKind};
use crate::dataset::{DatasetKey, FrameData, IqPoint, SignalData};
use crate::error::{Error, Result};
use crate::modulation::{ModulationName, ModulationRegistry};

/// Parses a decoded tuple-serialized dict literal into `(key, signal)`
/// pairs.
///
/// # Errors
///
/// Returns [`Error::InputFormat`] on a missing separator, an unclosed
/// quote, a value array whose float count doesn't match
/// `frame_length * frames * 2`, a duplicate `(modulation, snr)` key (per
/// the Open Question in SPEC_FULL.md section 5, duplicates are rejected
/// rather than silently deduplicated), an unrecognized modulation alias, or
/// a final distinct-modulation/distinct-SNR count that doesn't match
/// [`crate::constants::DatasetConstants`].
pub fn parse(registry: &ModulationRegistry, input: &str) -> Result<Vec<(DatasetKey, SignalData)>> {
    let shape = constants(DatasetKind::TupleSerialized);
    let mut raw_entries = Vec::new();
    let mut seen_keys = HashSet::new();
    let mut cursor = 0usize;

    // Locating each key/value region is an inherently sequential
    // single-pass scan over the text; the per-entry parse and reshape work
    // it hands off below is not, and runs on rayon once every region has
    // been found.
    while let Some(key_paren) = find_from(input, cursor, '(') {
        let after_paren = key_paren + 1;
        let Some(quote_kind) = input[after_paren..].chars().next().filter(|c| *c == '\'' || *c == '"') else {
            // Not a key tuple opening; keep scanning.
            cursor = after_paren;
            continue;
        };
        let quote_start = after_paren + quote_kind.len_utf8();
        let quote_end = find_from(input, quote_start, quote_kind)
            .ok_or_else(|| Error::input_format("unclosed quote in modulation key"))?;
        let alias = &input[quote_start..quote_end];

        let sep_start = quote_end + quote_kind.len_utf8();
        let sep = ", ";
        if !input[sep_start..].starts_with(sep) {
            return Err(Error::input_format(format!(
                "missing ', ' separator after modulation alias '{alias}'"
            )));
        }
        let int_start = sep_start + sep.len();
        let key_close = find_from(input, int_start, ')')
            .ok_or_else(|| Error::input_format("unclosed key tuple"))?;
        let snr_db: i32 = input[int_start..key_close]
            .trim()
            .parse()
            .map_err(|_| Error::input_format(format!("malformed SNR integer in key for '{alias}'")))?;

        let value_paren = find_from(input, key_close + 1, '(')
            .ok_or_else(|| Error::input_format("no value region found after key"))?;
        let list_open = find_from(input, value_paren + 1, '[')
            .ok_or_else(|| Error::input_format("no value list found after key"))?;
        let list_close = find_from(input, list_open + 1, ']')
            .ok_or_else(|| Error::input_format("unclosed value list"))?;

        if !seen_keys.insert((alias.to_string(), snr_db)) {
            return Err(Error::input_format(format!(
                "duplicate key ('{alias}', {snr_db})"
            )));
        }

        raw_entries.push((alias, snr_db, &input[list_open + 1..list_close]));
        cursor = list_close + 1;
    }

    let entries: Vec<(DatasetKey, SignalData)> = raw_entries
        .into_par_iter()
        .map(|(alias, snr_db, list_text)| {
            let floats = parse_float_list(list_text)?;

            let expected = shape.frame_length * shape.frames_per_combination * 2;
            if floats.len() != expected {
                return Err(Error::input_format(format!(
                    "value list for ('{alias}', {snr_db}) has {} floats, expected {expected}",
                    floats.len()
                )));
            }

            let frames = reshape_into_frames(&floats, shape.frame_length, shape.frames_per_combination);
            let signal = SignalData::new(frames, shape.frame_length, shape.frames_per_combination)?;

            let modulation = registry.lookup(alias);
            if modulation == ModulationName::Unknown {
                return Err(Error::input_format(format!("unrecognized modulation alias '{alias}'")));
            }

            Ok((DatasetKey { modulation, snr_db }, signal))
        })
        .collect::<Result<Vec<_>>>()?;

    let distinct_modulations: HashSet<_> = entries.iter().map(|(key, _)| key.modulation as u32).collect();
    let distinct_snrs: HashSet<_> = entries.iter().map(|(key, _)| key.snr_db).collect();

    if distinct_modulations.len() != shape.modulation_count || distinct_snrs.len() != shape.snr_count {
        return Err(Error::input_format(format!(
            "expected {} modulations and {} SNRs, got {} and {}",
            shape.modulation_count,
            shape.snr_count,
            distinct_modulations.len(),
            distinct_snrs.len()
        )));
    }

    Ok(entries)
}

/// Splits `frame_length * frames * 2` floats into `frames` frames of
/// `frame_length` `(I, Q)` pairs: the first half of `floats` is the
/// I-stream (frame-sized chunks, one per frame), the second half is the
/// Q-stream, chunked the same way.
fn reshape_into_frames(floats: &[f32], frame_length: usize, frames: usize) -> Vec<FrameData> {
    let half = frame_length * frames;
    let (i_stream, q_stream) = floats.split_at(half);
    (0..frames)
        .map(|frame_index| {
            let start = frame_index * frame_length;
            let end = start + frame_length;
            let points = i_stream[start..end]
                .iter()
                .zip(&q_stream[start..end])
                .map(|(&i, &q)| IqPoint::new(i, q))
                .collect();
            FrameData::new(points)
        })
        .collect()
}

/// Tokenizes a comma-separated list of decimal floats, tolerating a
/// trailing comma and surrounding whitespace around each token.
fn parse_float_list(body: &str) -> Result<Vec<f32>> {
    body.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| Error::input_format(format!("malformed float token '{token}'")))
        })
        .collect()
}

/// Finds the byte index of the first occurrence of `needle` at or after
/// `from`.
fn find_from(haystack: &str, from: usize, needle: char) -> Option<usize> {
    haystack[from..].find(needle).map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_value(alias: &str, snr: i32, floats: &[f32]) -> String {
        let list = floats.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        format!("('{alias}', {snr}): (array([{list}], dtype=float32),)")
    }

    #[test]
    fn single_key_reshapes_and_rejects_on_modulation_count() {
        let registry = ModulationRegistry::new().expect("valid table");
        let shape = constants(DatasetKind::TupleSerialized);
        let half = shape.frame_length * shape.frames_per_combination;
        let ones = vec![1.0_f32; half];
        let twos = vec![2.0_f32; half];
        let floats: Vec<f32> = ones.into_iter().chain(twos).collect();
        let input = format!("{{{}}}", key_value("QPSK", -4, &floats));

        // The single entry reshapes successfully (it has the right shape);
        // the parse still fails because only 1 of 11 required modulations
        // is present.
        let err = parse(&registry, &input).expect_err("only 1 of 11 required modulations present");
        assert!(matches!(err, Error::InputFormat { .. }));
    }

    #[test]
    fn reshape_places_i_then_q_per_frame() {
        let ones = vec![1.0_f32; 128 * 2];
        let twos = vec![2.0_f32; 128 * 2];
        let floats: Vec<f32> = ones.into_iter().chain(twos).collect();
        let frames = reshape_into_frames(&floats, 128, 2);
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            assert_eq!(frame.len(), 128);
            for point in frame.points() {
                assert_eq!(*point, IqPoint::new(1.0, 2.0));
            }
        }
    }

    #[test]
    fn missing_separator_fails_whole_parse() {
        let registry = ModulationRegistry::new().expect("valid table");
        let input = "{('QPSK'-4): (array([1.0], dtype=float32),)}";
        let err = parse(&registry, input).unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
    }

    #[test]
    fn unclosed_quote_fails_whole_parse() {
        let registry = ModulationRegistry::new().expect("valid table");
        let input = "{('QPSK, -4): (array([1.0], dtype=float32),)}";
        let err = parse(&registry, input).unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
    }
}

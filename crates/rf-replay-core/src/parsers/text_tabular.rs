//! Parser for the text-tabular (HisarMod-2019-style) container.
//!
//! One frame per line, 1024 comma-separated complex tokens in `I+Qi` /
//! `I-Qi` form. See SPEC_FULL.md section 7 / spec section 4.5.

use std::io::BufRead;
use std::path::Path;

use crate::constants::{constants, DatasetKind};
use crate::dataset::{DatasetKey, FrameData, IqPoint, SignalData};
use crate::error::{Error, Result};
use crate::modulation::{ModulationName, ModulationRegistry};

/// Physical ordering of the 26 modulation codes in the text-tabular file;
/// see spec section 6.
const MODULATION_SERIES: [u8; 26] = [
    4, 14, 44, 32, 2, 12, 22, 34, 23, 3, 13, 54, 30, 0, 40, 10, 50, 20, 51, 21, 61, 31, 1, 41, 11, 24,
];

/// Lines per `(SNR, modulation)` combination: `500 frames * 26 modulations`.
const LINES_PER_SNR: usize = 13_000;

/// Maps a `MODULATION_SERIES` code to its canonical alias string, per spec
/// section 6.
const fn modulation_alias_for_code(code: u8) -> Option<&'static str> {
    Some(match code {
        0 => "BPSK",
        10 => "QPSK",
        20 => "8PSK",
        30 => "16PSK",
        40 => "32PSK",
        50 => "64PSK",
        1 => "4QAM",
        11 => "8QAM",
        21 => "16QAM",
        31 => "32QAM",
        41 => "64QAM",
        51 => "128QAM",
        61 => "256QAM",
        2 => "2FSK",
        12 => "4FSK",
        22 => "8FSK",
        32 => "16FSK",
        3 => "4PAM",
        13 => "8PAM",
        23 => "16PAM",
        4 => "AM-DSB",
        14 => "AM-DSB-SC",
        24 => "AM-USB",
        34 => "AM-LSB",
        44 => "FM",
        54 => "PM",
        _ => return None,
    })
}

/// `(snr_dB, modulation)` for the line at `line_nr`.
fn classify_line(registry: &ModulationRegistry, line_nr: usize) -> Result<(i32, ModulationName)> {
    let snr_db = -20 + 2 * i32::try_from(line_nr / LINES_PER_SNR).unwrap_or(i32::MAX);
    let series_idx = (line_nr % LINES_PER_SNR) / 500;
    let mod_code = MODULATION_SERIES[series_idx];
    let alias = modulation_alias_for_code(mod_code)
        .ok_or_else(|| Error::input_format(format!("unknown modulation code {mod_code} at line {line_nr}")))?;
    let modulation = registry.lookup(alias);
    if modulation == ModulationName::Unknown {
        return Err(Error::input_format(format!("unrecognized modulation alias '{alias}'")));
    }
    Ok((snr_db, modulation))
}

/// Parses one `I+Qi` / `I-Qi` complex token into `(i, q)`.
///
/// Per the Open Question in SPEC_FULL.md section 7, a possible leading `-`
/// on the real part is skipped before searching for the inner sign, so
/// `-1-1i` parses as `(-1, -1)` rather than misreading a digit as the
/// separator. A sign immediately preceded by `e`/`E` is treated as part of
/// an exponent, not the I/Q separator, since the token grammar in spec
/// section 6 permits exponential notation.
fn parse_complex_token(token: &str) -> Result<IqPoint> {
    let token = token.trim();
    let body = token
        .strip_suffix('i')
        .ok_or_else(|| Error::input_format(format!("token '{token}' is missing trailing 'i'")))?;
    let bytes = body.as_bytes();
    let search_start = usize::from(body.starts_with('-'));

    let mut separator = None;
    for idx in search_start.max(1)..bytes.len() {
        let ch = bytes[idx] as char;
        if (ch == '+' || ch == '-') && !matches!(bytes[idx - 1] as char, 'e' | 'E') {
            separator = Some(idx);
            break;
        }
    }

    let separator = separator
        .ok_or_else(|| Error::input_format(format!("token '{token}' has no real/imaginary separator")))?;

    let real = body[..separator]
        .parse::<f32>()
        .map_err(|_| Error::input_format(format!("malformed real part in token '{token}'")))?;
    let imag = body[separator..]
        .parse::<f32>()
        .map_err(|_| Error::input_format(format!("malformed imaginary part in token '{token}'")))?;

    Ok(IqPoint::new(real, imag))
}

/// Parses one line of `frame_length` comma-separated complex tokens into a
/// [`FrameData`].
fn parse_line(line: &str, frame_length: usize) -> Result<FrameData> {
    let tokens: Vec<&str> = line.trim().split(',').collect();
    if tokens.len() != frame_length {
        return Err(Error::input_format(format!(
            "line has {} tokens, expected {frame_length}",
            tokens.len()
        )));
    }
    let points = tokens
        .into_iter()
        .map(parse_complex_token)
        .collect::<Result<Vec<_>>>()?;
    Ok(FrameData::new(points))
}

/// Parses a text-tabular dataset from any buffered byte source.
///
/// # Errors
///
/// Returns [`Error::InputFormat`] on a malformed line length, a malformed
/// complex token, an unrecognized modulation code, or a final distinct
/// modulation/SNR count that doesn't match
/// [`crate::constants::DatasetConstants`].
pub fn parse(registry: &ModulationRegistry, reader: impl BufRead) -> Result<Vec<(DatasetKey, SignalData)>> {
    let shape = constants(DatasetKind::TextTabular);
    let mut entries = Vec::new();
    let mut pending_frames: Vec<FrameData> = Vec::with_capacity(shape.frames_per_combination);
    let mut pending_key: Option<DatasetKey> = None;

    for (line_nr, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::input_format(format!("I/O error reading line {line_nr}: {e}")))?;
        let (snr_db, modulation) = classify_line(registry, line_nr)?;
        let frame = parse_line(&line, shape.frame_length)?;

        let key = DatasetKey { modulation, snr_db };
        if pending_key != Some(key) && pending_key.is_some() {
            return Err(Error::input_format(format!(
                "line {line_nr} changed (modulation, SNR) mid-combination"
            )));
        }
        pending_key = Some(key);
        pending_frames.push(frame);

        if pending_frames.len() == shape.frames_per_combination {
            let frames = std::mem::replace(&mut pending_frames, Vec::with_capacity(shape.frames_per_combination));
            let signal = SignalData::new(frames, shape.frame_length, shape.frames_per_combination)?;
            entries.push((key, signal));
            pending_key = None;
        }
    }

    if !pending_frames.is_empty() {
        return Err(Error::input_format("trailing incomplete (modulation, SNR) combination"));
    }

    let distinct_modulations: std::collections::HashSet<_> =
        entries.iter().map(|(key, _)| key.modulation as u32).collect();
    let distinct_snrs: std::collections::HashSet<_> = entries.iter().map(|(key, _)| key.snr_db).collect();

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

/// Parses a text-tabular dataset from the file at `path`.
///
/// # Errors
///
/// See [`parse`]. Additionally returns [`Error::InputFormat`] if `path`
/// cannot be opened.
pub fn parse_path(registry: &ModulationRegistry, path: &Path) -> Result<Vec<(DatasetKey, SignalData)>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::input_format_at(path, format!("could not open text-tabular file: {e}")))?;
    parse(registry, std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_first_two_points_of_a_line() {
        let mut tokens = vec!["1.5+2.25i".to_string(), "-0.5-0.75i".to_string()];
        tokens.resize(1024, "0+0i".to_string());
        let line = tokens.join(",");

        let frame = parse_line(&line, 1024).expect("well-formed line");
        assert_eq!(frame.points()[0], IqPoint::new(1.5, 2.25));
        assert_eq!(frame.points()[1], IqPoint::new(-0.5, -0.75));
    }

    #[test]
    fn negative_real_and_imaginary_both_parse() {
        let point = parse_complex_token("-1-1i").expect("valid token");
        assert_eq!(point, IqPoint::new(-1.0, -1.0));
    }

    #[test]
    fn exponential_notation_does_not_confuse_the_separator() {
        let point = parse_complex_token("1.5e-3+2.25i").expect("valid token");
        assert_eq!(point, IqPoint::new(1.5e-3, 2.25));
    }

    #[test]
    fn missing_trailing_i_fails() {
        let err = parse_complex_token("1.5+2.25").unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
    }

    #[test]
    fn classify_line_matches_snr_and_modulation_series() {
        let registry = ModulationRegistry::new().expect("valid table");
        // line_nr 0 is SNR -20dB, series index 0 -> code 4 -> AM-DSB.
        let (snr, modulation) = classify_line(&registry, 0).expect("valid");
        assert_eq!(snr, -20);
        assert_eq!(modulation, ModulationName::AmDsb);

        // line_nr 13_000 rolls over to SNR -18dB, series index back to 0.
        let (snr, modulation) = classify_line(&registry, LINES_PER_SNR).expect("valid");
        assert_eq!(snr, -18);
        assert_eq!(modulation, ModulationName::AmDsb);

        // line_nr 500 is still SNR -20dB, series index 1 -> code 14 -> AM-DSB-SC.
        let (snr, modulation) = classify_line(&registry, 500).expect("valid");
        assert_eq!(snr, -20);
        assert_eq!(modulation, ModulationName::AmDsbSc);
    }

    #[test]
    fn wrong_token_count_fails_the_line() {
        let line = "1+1i,2+2i";
        let err = parse_line(line, 1024).unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
    }
}

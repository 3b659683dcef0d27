//! Optional dump-file writer, gated behind the `dump` Cargo feature. See
//! SPEC_FULL.md section 11 / spec section 6.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::constants::DatasetKind;
use crate::dataset::SignalData;
use crate::error::{Error, Result};

/// Builds the default dump filename: `<DatasetLabel>_<ModulationAlias>_<SNR>dB.txt`.
#[must_use]
pub fn default_dump_path(kind: DatasetKind, modulation_alias: &str, snr_db: i32) -> PathBuf {
    PathBuf::from(format!("{}_{modulation_alias}_{snr_db}dB.txt", kind.label()))
}

/// Writes the first two frames of `signal`'s normalized `(i, q)` samples to
/// `path`, one `sampleIndex i q` line per sample.
///
/// # Errors
///
/// Returns [`Error::InputFormat`] if `path` cannot be created or written.
pub fn write_first_two_frames(signal: &SignalData, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| Error::input_format_at(path, format!("could not create dump file: {e}")))?;
    let mut writer = std::io::BufWriter::new(file);

    let mut sample_index = 0_usize;
    for frame in signal.frames().iter().take(2) {
        for point in frame.points() {
            writeln!(writer, "{sample_index} {} {}", point.i, point.q)
                .map_err(|e| Error::input_format_at(path, format!("could not write dump line: {e}")))?;
            sample_index += 1;
        }
    }

    writer
        .flush()
        .map_err(|e| Error::input_format_at(path, format!("could not flush dump file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_matches_spec_naming() {
        let path = default_dump_path(DatasetKind::TupleSerialized, "QPSK", -4);
        assert_eq!(path, PathBuf::from("RadioML2016_QPSK_-4dB.txt"));
    }

    #[test]
    fn dumps_only_the_first_two_frames() {
        use crate::dataset::{FrameData, IqPoint};

        let frame = |v: f32| FrameData::new(vec![IqPoint::new(v, v); 2]);
        let frames = vec![frame(1.0), frame(2.0), frame(3.0)];
        let signal = SignalData::new(frames, 2, 3).expect("valid signal");

        let dir = std::env::temp_dir().join(format!("rf-replay-dump-test-{:p}", &signal));
        write_first_two_frames(&signal, &dir).expect("writes");

        let contents = std::fs::read_to_string(&dir).expect("readable");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "0 1 1");
        assert_eq!(lines[3], "3 2 2");

        let _ = std::fs::remove_file(&dir);
    }
}

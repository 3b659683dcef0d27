//! Parser for the hierarchical-scientific (RadioML-2018-style) container.
//!
//! The on-disk container is tens of gigabytes; this parser reads only the
//! contiguous slab for one caller-chosen modulation (~800 MB), never the
//! full cube. See SPEC_FULL.md section 6 / spec section 4.4.

use std::path::Path;

use ndarray::{s, Array3, Axis};
use rayon::prelude::*;

use crate::constants::{constants, DatasetKind};
use crate::dataset::{DatasetKey, FrameData, IqPoint, SignalData};
use crate::error::{Error, Result};
use crate::modulation::{ModulationName, ModulationRegistry};

/// Total number of rows in `X`/`Y`/`Z` at the root of the container.
const TOTAL_ROWS: usize = 2_555_904;

/// Fixed modulation enumeration order assumed for row layout: rows are
/// ordered first by modulation (in this order), then by SNR ascending from
/// -20dB in steps of +2dB, then by frame index. See spec section 6.
const HIERARCHICAL_MOD_ORDER: [&str; 24] = [
    "OOK", "4ASK", "8ASK", "BPSK", "QPSK", "8PSK", "16PSK", "32PSK", "16APSK", "32APSK", "64APSK",
    "128APSK", "16QAM", "32QAM", "64QAM", "128QAM", "256QAM", "AM-SSB-WC", "AM-SSB-SC",
    "AM-DSB-WC", "AM-DSB-SC", "FM", "GMSK", "OQPSK",
];

/// Number of rows belonging to a single modulation: `total_rows / 24`.
const fn mod_slab_len() -> usize {
    TOTAL_ROWS / HIERARCHICAL_MOD_ORDER.len()
}

/// Number of rows belonging to a single `(modulation, SNR)` combination:
/// `MOD_SLAB / 26`.
fn snr_slab_len() -> usize {
    let shape = constants(DatasetKind::HierarchicalScientific);
    mod_slab_len() / shape.snr_count
}

/// The `[start, end)` row range, within `X`/`Y`/`Z`, belonging to the
/// modulation at `mod_offset` in [`HIERARCHICAL_MOD_ORDER`].
fn mod_slab_range(mod_offset: usize) -> std::ops::Range<usize> {
    let len = mod_slab_len();
    (mod_offset * len)..((mod_offset + 1) * len)
}

/// SNR, in dB, for a row at `row_in_slab` within a single modulation's slab.
fn snr_db_for_row_in_mod_slab(row_in_slab: usize, snr_slab: usize) -> i32 {
    let snr_index = row_in_slab / snr_slab;
    -20 + 2 * i32::try_from(snr_index).unwrap_or(i32::MAX)
}

/// Finds `modulation`'s position in [`HIERARCHICAL_MOD_ORDER`].
fn mod_offset_of(registry: &ModulationRegistry, modulation: ModulationName) -> Option<usize> {
    HIERARCHICAL_MOD_ORDER
        .iter()
        .position(|alias| registry.lookup(alias) == modulation)
}

/// Rank/shape record populated during a single traversal of the container's
/// root, per the "Polymorphic tree-of-items" redesign note in
/// SPEC_FULL.md section 6 / spec section 9: the only reader needs just
/// these three shapes, so there is no generic tree.
struct RootShapes {
    x_shape: Vec<usize>,
    y_shape: Vec<usize>,
    z_shape: Vec<usize>,
}

/// Visits the container's root and validates the presence, rank, and
/// dimensions of `X`, `Y`, `Z` against [`crate::constants::DatasetConstants`].
fn validate_root(file: &hdf5::File) -> Result<RootShapes> {
    let shape = constants(DatasetKind::HierarchicalScientific);

    let x = file
        .dataset("X")
        .map_err(|e| Error::input_format(format!("missing dataset 'X': {e}")))?;
    let y = file
        .dataset("Y")
        .map_err(|e| Error::input_format(format!("missing dataset 'Y': {e}")))?;
    let z = file
        .dataset("Z")
        .map_err(|e| Error::input_format(format!("missing dataset 'Z': {e}")))?;

    let x_shape = x.shape();
    let y_shape = y.shape();
    let z_shape = z.shape();

    let expected_x = vec![TOTAL_ROWS, shape.frame_length, 2];
    let expected_y = vec![TOTAL_ROWS, shape.modulation_count];
    let expected_z = vec![TOTAL_ROWS, 1];

    if x_shape != expected_x {
        return Err(Error::input_format(format!(
            "'X' has shape {x_shape:?}, expected {expected_x:?}"
        )));
    }
    if y_shape != expected_y {
        return Err(Error::input_format(format!(
            "'Y' has shape {y_shape:?}, expected {expected_y:?}"
        )));
    }
    if z_shape != expected_z {
        return Err(Error::input_format(format!(
            "'Z' has shape {z_shape:?}, expected {expected_z:?}"
        )));
    }
    if !matches!(x.dtype().map(|d| d.is::<f32>() || d.is::<f64>()), Ok(true)) {
        return Err(Error::input_format("'X' is not a floating-point dataset"));
    }

    Ok(RootShapes { x_shape, y_shape, z_shape })
}

/// Parses the contiguous slab for `modulation` out of the hierarchical
/// container at `path`, without ever materializing the full cube.
///
/// # Errors
///
/// Returns [`Error::InputFormat`] on a missing/mis-shaped/non-floating-point
/// root dataset, or if `modulation` is not one of the 24 modulations this
/// dataset layout recognizes. Returns [`Error::ResourceExhausted`] if the
/// slab cannot be allocated.
pub fn parse_single_modulation(
    registry: &ModulationRegistry,
    path: &Path,
    modulation: ModulationName,
) -> Result<Vec<(DatasetKey, SignalData)>> {
    let shape = constants(DatasetKind::HierarchicalScientific);

    let file = hdf5::File::open(path)
        .map_err(|e| Error::input_format_at(path, format!("could not open hierarchical container: {e}")))?;

    let root = validate_root(&file)?;
    mt_logger::mt_log!(
        mt_logger::Level::Debug,
        "validated hierarchical root: X={:?} Y={:?} Z={:?}",
        root.x_shape,
        root.y_shape,
        root.z_shape
    );

    let mod_offset = mod_offset_of(registry, modulation)
        .ok_or_else(|| Error::input_format("modulation is not present in the hierarchical dataset's modulation order"))?;

    let snr_slab = snr_slab_len();
    let mod_range = mod_slab_range(mod_offset);
    let slab_rows = mod_range.end - mod_range.start;

    let float_count = slab_rows * shape.frame_length * 2;
    let mut probe: Vec<f32> = Vec::new();
    probe
        .try_reserve_exact(float_count)
        .map_err(|_| Error::ResourceExhausted {
            bytes: float_count * std::mem::size_of::<f32>(),
            reason: "could not allocate the per-modulation IQ slab".to_string(),
        })?;
    drop(probe);

    let x = file.dataset("X").map_err(|e| Error::input_format(e.to_string()))?;
    let slab: Array3<f32> = x
        .read_slice(s![mod_range.start..mod_range.end, .., ..])
        .map_err(|e| Error::input_format(format!("failed to read modulation slab: {e}")))?;

    let entries: Vec<(DatasetKey, SignalData)> = (0..shape.snr_count)
        .into_par_iter()
        .map(|snr_index| {
            let row_in_slab = snr_index * snr_slab;
            let snr_slice = slab.slice(s![row_in_slab..row_in_slab + snr_slab, .., ..]);

            let snr_db = snr_db_for_row_in_mod_slab(row_in_slab, snr_slab);
            debug_assert_eq!(snr_db, -20 + 2 * i32::try_from(snr_index).unwrap_or(i32::MAX));

            let frames: Vec<FrameData> = snr_slice
                .axis_iter(Axis(0))
                .map(|frame| {
                    let points = frame
                        .axis_iter(Axis(0))
                        .map(|point| IqPoint::new(point[0], point[1]))
                        .collect();
                    FrameData::new(points)
                })
                .collect();

            let signal = SignalData::new(frames, shape.frame_length, shape.frames_per_combination)?;
            Ok((DatasetKey { modulation, snr_db }, signal))
        })
        .collect::<Result<Vec<_>>>()?;

    if entries.len() != shape.snr_count {
        return Err(Error::input_format(format!(
            "expected {} SNR levels, produced {}",
            shape.snr_count,
            entries.len()
        )));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slab_math_matches_spec_scenario() {
        // total_rows = 2_555_904, mod_offset = 5, snr_index = 13.
        assert_eq!(mod_slab_len(), 106_496);
        let range = mod_slab_range(5);
        assert_eq!(range.start, 5 * 106_496);
        assert_eq!(range.end - range.start, 106_496);

        let snr_slab = snr_slab_len();
        assert_eq!(snr_slab, 4096);
        let row_in_slab = 13 * snr_slab;
        assert_eq!(snr_db_for_row_in_mod_slab(row_in_slab, snr_slab), 6);
    }

    #[test]
    fn mod_offset_matches_documented_order() {
        let registry = ModulationRegistry::new().expect("valid table");
        assert_eq!(mod_offset_of(&registry, ModulationName::Ook), Some(0));
        assert_eq!(mod_offset_of(&registry, ModulationName::Psk8), Some(5));
        assert_eq!(mod_offset_of(&registry, ModulationName::Oqpsk), Some(23));
    }

    #[test]
    fn unknown_modulation_has_no_offset() {
        let registry = ModulationRegistry::new().expect("valid table");
        assert_eq!(mod_offset_of(&registry, ModulationName::Pam4), None);
    }
}

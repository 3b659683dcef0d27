//! The in-memory data model linking parsed datasets to the Transmit HAL.
//! See SPEC_FULL.md section 4 / spec section 3.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::modulation::ModulationName;

/// One complex baseband sample in host-normalized units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqPoint {
    /// In-phase component.
    pub i: f32,
    /// Quadrature component.
    pub q: f32,
}

impl IqPoint {
    /// Builds a point from its components.
    #[must_use]
    pub const fn new(i: f32, q: f32) -> Self {
        Self { i, q }
    }

    /// The larger of `|i|` and `|q|`.
    #[must_use]
    fn abs_max(self) -> f32 {
        self.i.abs().max(self.q.abs())
    }
}

/// An ordered sequence of [`IqPoint`]s whose length is fixed per dataset
/// kind (128 or 1024 points).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameData {
    points: Vec<IqPoint>,
}

impl FrameData {
    /// Builds a frame from `points`, without checking its length against any
    /// dataset's expected frame length (callers validate that against
    /// [`crate::constants::DatasetConstants::frame_length`]).
    #[must_use]
    pub const fn new(points: Vec<IqPoint>) -> Self {
        Self { points }
    }

    /// The points in this frame, in order.
    #[must_use]
    pub fn points(&self) -> &[IqPoint] {
        &self.points
    }

    /// Number of points in this frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether this frame has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// An ordered sequence of equal-length [`FrameData`] plus a precomputed
/// `max_abs` scalar, used as the scale-factor denominator during sample
/// conversion (see [`crate::device`]).
#[derive(Debug, Clone)]
pub struct SignalData {
    frames: Vec<FrameData>,
    max_abs: f32,
}

impl SignalData {
    /// Builds a `SignalData` from `frames`, validating the invariants from
    /// spec section 3: every frame has the dataset's expected length, the
    /// frame count matches `frames_per_combination`, and the computed
    /// `max_abs` is strictly positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputFormat`] if the frame count or any frame's
    /// length is wrong, or if every sample is zero (the loader's division
    /// guard: `max_abs` is later used as a scale-factor denominator).
    pub fn new(frames: Vec<FrameData>, frame_length: usize, frames_per_combination: usize) -> Result<Self> {
        if frames.len() != frames_per_combination {
            return Err(Error::input_format(format!(
                "expected {frames_per_combination} frames, got {}",
                frames.len()
            )));
        }
        for (index, frame) in frames.iter().enumerate() {
            if frame.len() != frame_length {
                return Err(Error::input_format(format!(
                    "frame {index} has length {}, expected {frame_length}",
                    frame.len()
                )));
            }
        }

        let max_abs = frames
            .iter()
            .flat_map(FrameData::points)
            .map(|point| point.abs_max())
            .fold(0.0_f32, f32::max);

        if max_abs == 0.0 {
            return Err(Error::input_format(
                "all samples are zero; max_abs would be zero and cannot be used as a scale-factor denominator",
            ));
        }

        Ok(Self { frames, max_abs })
    }

    /// The frames that make up this signal.
    #[must_use]
    pub fn frames(&self) -> &[FrameData] {
        &self.frames
    }

    /// `max over all (i, q) components of |component|` across every frame.
    #[must_use]
    pub const fn max_abs(&self) -> f32 {
        self.max_abs
    }
}

/// `(modulation, SNR in dB)`, the key under which every [`SignalData`] is
/// indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetKey {
    /// The modulation scheme.
    pub modulation: ModulationName,
    /// The signal-to-noise ratio, in whole decibels.
    pub snr_db: i32,
}

/// In-memory mapping from `(modulation, SNR_dB)` to [`SignalData`].
///
/// Cleared and repopulated atomically at the end of each successful parse
/// (see [`DatasetStore::publish`]); never mutated during transmission. See
/// spec section 3's ownership note: the store is single-owner, held by the
/// Transmit orchestration, and parsers only ever write through a
/// publish-on-success transfer.
#[derive(Debug, Default)]
pub struct DatasetStore {
    entries: BTreeMap<(ModulationNameOrdKey, i32), SignalData>,
}

/// `ModulationName`'s discriminant, used only as a sortable map key.
type ModulationNameOrdKey = u32;

impl DatasetStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entire contents of this store with `entries` in one
    /// step. A failed parse never calls this, so the previous store is left
    /// untouched (spec section 3's ownership note).
    pub fn publish(&mut self, entries: Vec<(DatasetKey, SignalData)>) {
        self.entries = entries
            .into_iter()
            .map(|(key, signal)| ((key.modulation as u32, key.snr_db), signal))
            .collect();
    }

    /// The signal for `key`, if present.
    #[must_use]
    pub fn get(&self, key: DatasetKey) -> Option<&SignalData> {
        self.entries.get(&(key.modulation as u32, key.snr_db))
    }

    /// Number of `(modulation, SNR)` entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The distinct modulations present, deduplicated, in ascending
    /// discriminant order.
    #[must_use]
    pub fn modulations(&self) -> Vec<ModulationName> {
        let mut seen = Vec::new();
        for &(modulation, _) in self.entries.keys() {
            if seen.last().copied() != Some(modulation) {
                seen.push(modulation);
            }
        }
        seen.sort_unstable();
        seen.dedup();
        seen.into_iter().map(discriminant_to_name).collect()
    }

    /// The distinct SNR levels present, deduplicated and ascending.
    #[must_use]
    pub fn snrs(&self) -> Vec<i32> {
        let mut seen: Vec<i32> = self.entries.keys().map(|&(_, snr)| snr).collect();
        seen.sort_unstable();
        seen.dedup();
        seen
    }
}

/// All [`ModulationName`] variants, in the same order as their discriminant
/// (needed to invert the `u32` key back to a name).
const ALL_NAMES: &[ModulationName] = &[
    ModulationName::Ook,
    ModulationName::Ask4,
    ModulationName::Ask8,
    ModulationName::Bpsk,
    ModulationName::Qpsk,
    ModulationName::Psk8,
    ModulationName::Psk16,
    ModulationName::Psk32,
    ModulationName::Psk64,
    ModulationName::Apsk16,
    ModulationName::Apsk32,
    ModulationName::Apsk64,
    ModulationName::Apsk128,
    ModulationName::Qam4,
    ModulationName::Qam8,
    ModulationName::Qam16,
    ModulationName::Qam32,
    ModulationName::Qam64,
    ModulationName::Qam128,
    ModulationName::Qam256,
    ModulationName::Fsk2,
    ModulationName::Fsk4,
    ModulationName::Fsk8,
    ModulationName::Fsk16,
    ModulationName::Pam4,
    ModulationName::Pam8,
    ModulationName::Pam16,
    ModulationName::AmDsb,
    ModulationName::AmDsbWc,
    ModulationName::AmDsbSc,
    ModulationName::AmSsbWc,
    ModulationName::AmSsbSc,
    ModulationName::AmUsb,
    ModulationName::AmLsb,
    ModulationName::Fm,
    ModulationName::Pm,
    ModulationName::Gmsk,
    ModulationName::Oqpsk,
    ModulationName::Unknown,
];

/// Recovers a [`ModulationName`] from its `as u32` discriminant.
fn discriminant_to_name(discriminant: u32) -> ModulationName {
    ALL_NAMES[discriminant as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(value: f32, len: usize) -> FrameData {
        FrameData::new(vec![IqPoint::new(value, value); len])
    }

    #[test]
    fn signal_data_computes_max_abs() {
        let frames = vec![frame_of(1.0, 128), frame_of(-2.0, 128)];
        let signal = SignalData::new(frames, 128, 2).expect("valid signal");
        assert_eq!(signal.max_abs(), 2.0);
    }

    #[test]
    fn signal_data_rejects_all_zero() {
        let frames = vec![frame_of(0.0, 128)];
        let err = SignalData::new(frames, 128, 1).unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
    }

    #[test]
    fn signal_data_rejects_wrong_frame_count() {
        let frames = vec![frame_of(1.0, 128)];
        let err = SignalData::new(frames, 128, 2).unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
    }

    #[test]
    fn signal_data_rejects_wrong_frame_length() {
        let frames = vec![frame_of(1.0, 64)];
        let err = SignalData::new(frames, 128, 1).unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
    }

    #[test]
    fn store_publish_is_atomic_and_queryable() {
        let mut store = DatasetStore::new();
        let key = DatasetKey { modulation: ModulationName::Qpsk, snr_db: -4 };
        let signal = SignalData::new(vec![frame_of(2.0, 128)], 128, 1).expect("valid");
        store.publish(vec![(key, signal)]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(key).map(SignalData::max_abs), Some(2.0));
        assert_eq!(store.modulations(), vec![ModulationName::Qpsk]);
        assert_eq!(store.snrs(), vec![-4]);
    }

    #[test]
    fn republish_replaces_prior_contents() {
        let mut store = DatasetStore::new();
        let key_a = DatasetKey { modulation: ModulationName::Bpsk, snr_db: 0 };
        let signal_a = SignalData::new(vec![frame_of(1.0, 128)], 128, 1).expect("valid");
        store.publish(vec![(key_a, signal_a)]);

        let key_b = DatasetKey { modulation: ModulationName::Qam16, snr_db: 10 };
        let signal_b = SignalData::new(vec![frame_of(3.0, 128)], 128, 1).expect("valid");
        store.publish(vec![(key_b, signal_b)]);

        assert_eq!(store.len(), 1);
        assert!(store.get(key_a).is_none());
        assert!(store.get(key_b).is_some());
    }
}

//! Static per-dataset shape table. See SPEC_FULL.md section 3.

/// The three on-disk dataset formats this crate ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// RadioML-2016-style serialized-object container.
    TupleSerialized,
    /// RadioML-2018-style hierarchical scientific-data container.
    HierarchicalScientific,
    /// HisarMod-2019-style text-tabular container.
    TextTabular,
}

impl DatasetKind {
    /// A short label used in dump filenames; see SPEC_FULL.md section 4.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TupleSerialized => "RadioML2016",
            Self::HierarchicalScientific => "RadioML2018",
            Self::TextTabular => "HisarMod2019",
        }
    }
}

/// Per-dataset shape invariants: frame length, frames per `(modulation,
/// SNR)` combination, distinct modulation count, distinct SNR count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetConstants {
    /// Number of `(I, Q)` points in one frame.
    pub frame_length: usize,
    /// Number of frames stored per `(modulation, SNR)` combination.
    pub frames_per_combination: usize,
    /// Number of distinct modulations in the dataset.
    pub modulation_count: usize,
    /// Number of distinct SNR levels in the dataset.
    pub snr_count: usize,
}

/// Looks up the shape invariants for `kind`.
#[must_use]
pub const fn constants(kind: DatasetKind) -> DatasetConstants {
    match kind {
        DatasetKind::TupleSerialized => DatasetConstants {
            frame_length: 128,
            frames_per_combination: 1000,
            modulation_count: 11,
            snr_count: 20,
        },
        DatasetKind::HierarchicalScientific => DatasetConstants {
            frame_length: 1024,
            frames_per_combination: 4096,
            modulation_count: 24,
            snr_count: 26,
        },
        DatasetKind::TextTabular => DatasetConstants {
            frame_length: 1024,
            frames_per_combination: 500,
            modulation_count: 26,
            snr_count: 20,
        },
    }
}

/// The smallest `frame_length` across all three dataset kinds. Used by the
/// Transmit HAL's sampling-rate policy (SPEC_FULL.md section 10 / spec
/// section 4.8).
#[must_use]
pub const fn min_frame_length() -> usize {
    let a = constants(DatasetKind::TupleSerialized).frame_length;
    let b = constants(DatasetKind::HierarchicalScientific).frame_length;
    let c = constants(DatasetKind::TextTabular).frame_length;
    let ab = if a < b { a } else { b };
    if ab < c {
        ab
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_spec() {
        assert_eq!(
            constants(DatasetKind::TupleSerialized),
            DatasetConstants { frame_length: 128, frames_per_combination: 1000, modulation_count: 11, snr_count: 20 }
        );
        assert_eq!(
            constants(DatasetKind::HierarchicalScientific),
            DatasetConstants { frame_length: 1024, frames_per_combination: 4096, modulation_count: 24, snr_count: 26 }
        );
        assert_eq!(
            constants(DatasetKind::TextTabular),
            DatasetConstants { frame_length: 1024, frames_per_combination: 500, modulation_count: 26, snr_count: 20 }
        );
    }

    #[test]
    fn min_frame_length_is_128() {
        assert_eq!(min_frame_length(), 128);
    }
}

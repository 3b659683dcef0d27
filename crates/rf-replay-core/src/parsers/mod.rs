//! Dataset parsers: one module per on-disk format. See SPEC_FULL.md
//! sections 5-7 / spec section 4.3-4.5.
//!
//! Each parser is a pure function from its input source to a list of
//! `(DatasetKey, SignalData)` pairs; none of them touch [`crate::dataset::DatasetStore`]
//! directly; the caller publishes the result on success and discards it on
//! failure (spec section 3's ownership note).

pub mod hierarchical;
pub mod text_tabular;
pub mod tuple_serialized;

use std::path::Path;

use crate::constants::DatasetKind;
use crate::dataset::{DatasetKey, DatasetStore, SignalData};
use crate::error::{Error, Result};
use crate::modulation::{ModulationName, ModulationRegistry};

/// Reads `path` as decoded UTF-8 text, then parses it as the tuple-serialized
/// format.
///
/// # Errors
///
/// Returns [`Error::InputFormat`] if `path` cannot be read as UTF-8, or on
/// any parse failure described in [`tuple_serialized::parse`].
pub fn parse_tuple_serialized_file(
    registry: &ModulationRegistry,
    path: &Path,
) -> Result<Vec<(DatasetKey, SignalData)>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::input_format_at(path, format!("could not read tuple-serialized file: {e}")))?;
    tuple_serialized::parse(registry, &text)
}

/// Dispatches to the parser matching `kind` and returns the parsed entries
/// without touching any [`DatasetStore`]. This is the function a parser
/// worker thread calls (see `rf-replay-shell`'s worker module): the worker
/// thread never owns the store, so it reports entries back through a
/// completion channel and the presenter publishes them on its own thread.
///
/// `modulation` is required, and used only, for
/// [`DatasetKind::HierarchicalScientific`], since that format's parser reads
/// a single modulation's slab rather than the whole container (see
/// SPEC_FULL.md section 6).
///
/// # Errors
///
/// Returns [`Error::InputFormat`] for [`DatasetKind::HierarchicalScientific`]
/// if `modulation` is `None`, plus whatever error the chosen parser itself
/// returns.
pub fn load_entries(
    registry: &ModulationRegistry,
    kind: DatasetKind,
    path: &Path,
    modulation: Option<ModulationName>,
) -> Result<Vec<(DatasetKey, SignalData)>> {
    match kind {
        DatasetKind::TupleSerialized => parse_tuple_serialized_file(registry, path),
        DatasetKind::TextTabular => text_tabular::parse_path(registry, path),
        DatasetKind::HierarchicalScientific => {
            let modulation = modulation.ok_or_else(|| {
                Error::input_format("hierarchical-scientific datasets require a chosen modulation")
            })?;
            hierarchical::parse_single_modulation(registry, path, modulation)
        }
    }
}

/// Dispatches to the parser matching `kind` via [`load_entries`], publishing
/// the result into `store` only on success.
///
/// # Errors
///
/// See [`load_entries`]. The store is left untouched on any error.
pub fn load_into_store(
    registry: &ModulationRegistry,
    store: &mut DatasetStore,
    kind: DatasetKind,
    path: &Path,
    modulation: Option<ModulationName>,
) -> Result<()> {
    let entries = load_entries(registry, kind, path, modulation)?;
    store.publish(entries);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchical_load_without_modulation_fails() {
        let registry = ModulationRegistry::new().expect("valid table");
        let mut store = DatasetStore::new();
        let err = load_into_store(
            &registry,
            &mut store,
            DatasetKind::HierarchicalScientific,
            Path::new("/nonexistent.h5"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InputFormat { .. }));
        assert!(store.is_empty());
    }
}

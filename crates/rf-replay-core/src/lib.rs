//! Dataset ingestion and transmit streaming core for replaying RF
//! modulation datasets through SDR transmitters.
//!
//! Three dataset formats are ingested into a common in-memory
//! [`dataset::SignalData`] model ([`parsers`]), and the resulting signals
//! are streamed through one of three ADI transmit front-ends
//! ([`device`], [`hal`]) behind a small attribute-bus abstraction so the
//! core never depends on a concrete transport library beyond this crate's
//! one production backing ([`industrial_io_bus`]).

pub mod constants;
pub mod dataset;
pub mod device;
pub mod error;
pub mod hal;
pub mod industrial_io_bus;
pub mod modulation;
pub mod parsers;

#[cfg(feature = "dump")]
pub mod dump;

pub use constants::{constants, DatasetConstants, DatasetKind};
pub use dataset::{DatasetKey, DatasetStore, FrameData, IqPoint, SignalData};
pub use device::{AttributeBus, DeviceCore, DumpContext, TxParameters};
pub use error::{Error, Result};
pub use hal::{DeviceVariant, IioScanContext, TransmitHal, Transport, VariantTag};
pub use modulation::{ModulationFamily, ModulationKind, ModulationName, ModulationRegistry};

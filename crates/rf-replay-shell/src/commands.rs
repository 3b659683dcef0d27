//! The CLI's command surface: `parse`, `list`, `contexts`, `select`,
//! `tune`, `transmit`, `stop`. See SPEC_FULL.md section 0.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// One line of input to the REPL, parsed the same way `clap` parses
/// `argv`, matching the teacher's `shell` crate's derive-based CLI
/// surface.
#[derive(Parser, Debug)]
#[command(name = "rf-replay", no_binary_name = true)]
pub struct Line {
    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// The on-disk dataset format a `parse` command targets.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetKindArg {
    /// RadioML-2016-style serialized-object container.
    TupleSerialized,
    /// RadioML-2018-style hierarchical scientific-data container.
    Hierarchical,
    /// HisarMod-2019-style text-tabular container.
    TextTabular,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parses a dataset file in the background and publishes it to the
    /// Dataset Store on success.
    Parse {
        /// The dataset file to read.
        path: PathBuf,
        /// Which of the three formats `path` is in.
        #[arg(value_enum)]
        kind: DatasetKindArg,
        /// Required for `hierarchical`: which modulation's slab to read.
        #[arg(long)]
        modulation: Option<String>,
    },
    /// Lists the modulations and SNR levels currently in the Dataset
    /// Store.
    List,
    /// Enumerates transport contexts visible on the system bus.
    Contexts,
    /// Tears down the active device (if any) and initializes the variant
    /// at `uri`.
    Select {
        /// The transport URI to select, from a prior `contexts` listing.
        uri: String,
    },
    /// Sets one or more transmit parameters on the active device.
    Tune {
        /// Local-oscillator (or NCO, on variant C) frequency, in Hz.
        #[arg(long)]
        lo_hz: Option<f64>,
        /// Sampling frequency, in Hz. Fixed on variants B/C.
        #[arg(long)]
        sampling_hz: Option<f64>,
        /// RF bandwidth, in Hz. Unsupported on variant C.
        #[arg(long)]
        bandwidth_hz: Option<f64>,
        /// Hardware gain, in dB. Unsupported on variant C.
        #[arg(long)]
        gain_db: Option<f64>,
    },
    /// Starts replaying the named `(modulation, SNR)` signal on the active
    /// device. Rejected outside the `Ready` presenter state.
    Transmit {
        /// The modulation alias to transmit (e.g. `QPSK`).
        modulation: String,
        /// The SNR level, in dB.
        snr_db: i32,
    },
    /// Silences the active device's output.
    Stop,
    /// Exits the REPL.
    Quit,
}

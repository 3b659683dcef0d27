//! The presenter's `{Idle -> Parsing -> Ready}` state machine (spec
//! section 5 / section 9's worker-per-parser-thread redesign note) and the
//! command dispatch that drives [`rf_replay_core`] from it.

use std::path::PathBuf;
use std::sync::Arc;

use rf_replay_core::industrial_io_bus::IndustrialIoBus;
use rf_replay_core::{constants, DatasetKind, DatasetStore, ModulationRegistry, TransmitHal};

use crate::commands::{Command, DatasetKindArg};
use crate::worker::{spawn_parse, ParseHandle};

/// The presenter's own state, gating which commands are accepted. Transmit
/// requests are rejected outside [`PresenterState::Ready`] (spec section 5:
/// "`start_streaming()` must not be called while a parse is running").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterState {
    /// No parse has completed yet; the Dataset Store is empty.
    Idle,
    /// A parse worker is in flight; the Dataset Store is untouched until
    /// it reports back.
    Parsing,
    /// The most recent parse succeeded; `transmit` is accepted.
    Ready,
}

impl DatasetKindArg {
    const fn into_core(self) -> DatasetKind {
        match self {
            Self::TupleSerialized => DatasetKind::TupleSerialized,
            Self::Hierarchical => DatasetKind::HierarchicalScientific,
            Self::TextTabular => DatasetKind::TextTabular,
        }
    }
}

/// All of the presenter's owned state: the single [`ModulationRegistry`]
/// constructed once at process entry, the Dataset Store, the Transmit
/// HAL, the `{Idle -> Parsing -> Ready}` state, and the in-flight parse
/// handle (if any).
pub struct App {
    registry: Arc<ModulationRegistry>,
    store: DatasetStore,
    hal: TransmitHal<IndustrialIoBus>,
    state: PresenterState,
    in_flight: Option<ParseHandle>,
    /// The dataset kind of the currently in-flight (or just-finished) parse,
    /// used to drive the sampling-rate policy (spec section 4.8) once the
    /// parse completes.
    in_flight_kind: Option<DatasetKind>,
    /// The dataset kind of the most recently *published* parse, kept around
    /// (unlike `in_flight_kind`) for as long as the store holds that
    /// parse's entries; used to name the optional dump file (SPEC_FULL.md
    /// section 11) during `transmit`.
    last_parsed_kind: Option<DatasetKind>,
}

impl App {
    /// Builds the app, constructing the modulation registry once.
    ///
    /// # Errors
    ///
    /// Returns a message if the modulation alias table is inconsistent
    /// ([`Error::DuplicateAlias`]) — the one fatal condition in this
    /// crate, matching spec section 7.
    pub fn new() -> Result<Self, String> {
        let registry = ModulationRegistry::new().map_err(|e| format!("fatal: {e}"))?;
        Ok(Self {
            registry: Arc::new(registry),
            store: DatasetStore::new(),
            hal: TransmitHal::new(IndustrialIoBus::new()),
            state: PresenterState::Idle,
            in_flight: None,
            in_flight_kind: None,
            last_parsed_kind: None,
        })
    }

    /// Non-blocking check for a finished parse. Call this once per REPL
    /// iteration before dispatching the next command.
    pub fn poll_parse(&mut self) {
        let Some(handle) = self.in_flight.as_mut() else { return };
        let Some(outcome) = handle.poll() else { return };
        self.in_flight = None;
        let kind = self.in_flight_kind.take();

        match outcome {
            Ok(entries) => {
                let count = entries.len();
                self.store.publish(entries);
                self.state = PresenterState::Ready;
                self.last_parsed_kind = kind;
                println!("Parsing finished: {count} (modulation, SNR) entries.");

                // Sampling-rate policy (spec section 4.8): applied once per
                // newly parsed dataset, against whichever device variant is
                // currently active (a no-op with none active, or on
                // variants B/C, whose rate is fixed).
                if let Some(kind) = kind {
                    if self.hal.active_uri().is_some() {
                        let frame_length = constants(kind).frame_length;
                        if let Err(e) = self.hal.apply_sampling_rate_policy(frame_length) {
                            println!("Sampling-rate policy not applied: {e}");
                        }
                    }
                }
            }
            Err(e) => {
                self.state = PresenterState::Idle;
                println!("Parsing failed: {e}");
            }
        }
    }

    /// Dispatches one parsed [`Command`] against the current state,
    /// printing a status line the way the teacher's `shell` crate reports
    /// outcomes.
    ///
    /// Returns `true` if the REPL should keep looping.
    pub fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::Parse { path, kind, modulation } => self.start_parse(path, kind, modulation),
            Command::List => self.list(),
            Command::Contexts => self.contexts(),
            Command::Select { uri } => self.select(&uri),
            Command::Tune { lo_hz, sampling_hz, bandwidth_hz, gain_db } => {
                self.tune(lo_hz, sampling_hz, bandwidth_hz, gain_db);
            }
            Command::Transmit { modulation, snr_db } => self.transmit(&modulation, snr_db),
            Command::Stop => self.stop(),
            Command::Quit => return false,
        }
        true
    }

    fn start_parse(&mut self, path: PathBuf, kind: DatasetKindArg, modulation: Option<String>) {
        if self.state == PresenterState::Parsing {
            println!("A parse is already running; parses are serialized (spec section 5).");
            return;
        }

        let modulation_name = modulation.map(|alias| self.registry.lookup(&alias));
        let core_kind = kind.into_core();
        self.state = PresenterState::Parsing;
        self.in_flight_kind = Some(core_kind);
        self.in_flight = Some(spawn_parse(Arc::clone(&self.registry), core_kind, path, modulation_name));
        println!("Parsing started.");
    }

    fn list(&self) {
        if self.store.is_empty() {
            println!("Dataset Store is empty.");
            return;
        }
        let modulations: Vec<&str> = self.store.modulations().iter().map(|m| self.registry.canonical(*m)).collect();
        println!("Modulations: {}", modulations.join(", "));
        println!("SNR levels (dB): {:?}", self.store.snrs());
    }

    fn contexts(&mut self) {
        match self.hal.discover_contexts() {
            Ok(contexts) => {
                if contexts.is_empty() {
                    println!("No transport contexts discovered.");
                }
                for ctx in contexts {
                    println!("{}  {}", ctx.uri, ctx.description);
                }
            }
            Err(e) => println!("Context discovery failed: {e}"),
        }
    }

    fn select(&mut self, uri: &str) {
        match self.hal.select(uri) {
            Ok(()) => println!("Selected '{uri}'."),
            Err(e) => println!("Select failed: {e}"),
        }
    }

    fn tune(&mut self, lo_hz: Option<f64>, sampling_hz: Option<f64>, bandwidth_hz: Option<f64>, gain_db: Option<f64>) {
        if self.hal.active_uri().is_none() {
            println!("No active device; use 'select' first.");
            return;
        }
        if let Some(hz) = lo_hz {
            report_setter("LO frequency", self.hal.set_lo_hz(hz));
        }
        if let Some(hz) = sampling_hz {
            report_setter("sampling frequency", self.hal.set_sampling_hz(hz));
        }
        if let Some(hz) = bandwidth_hz {
            report_setter("bandwidth", self.hal.set_bandwidth_hz(hz));
        }
        if let Some(db) = gain_db {
            report_setter("hardware gain", self.hal.set_hardware_gain_db(db));
        }
    }

    fn transmit(&mut self, modulation: &str, snr_db: i32) {
        if self.state != PresenterState::Ready {
            println!("Transmit rejected: presenter is not in the Ready state.");
            return;
        }
        let name = self.registry.lookup(modulation);
        if name == rf_replay_core::ModulationName::Unknown {
            println!("Unknown modulation alias '{modulation}'.");
            return;
        }
        let Some(signal) = self.store.get(rf_replay_core::DatasetKey { modulation: name, snr_db }) else {
            println!("No signal stored for ({modulation}, {snr_db} dB).");
            return;
        };
        let dump_ctx = self.last_parsed_kind.map(|kind| rf_replay_core::DumpContext {
            kind,
            modulation_alias: self.registry.canonical(name),
            snr_db,
        });
        match self.hal.start_streaming(signal, dump_ctx) {
            Ok(()) => println!("Transmitting ({modulation}, {snr_db} dB)."),
            Err(e) => println!("Transmit failed: {e}"),
        }
    }

    fn stop(&self) {
        match self.hal.stop_streaming() {
            Ok(()) => println!("Output silenced."),
            Err(e) => println!("Stop failed: {e}"),
        }
    }
}

fn report_setter(label: &str, outcome: rf_replay_core::Result<()>) {
    match outcome {
        Ok(()) => println!("{label} updated."),
        Err(e) => println!("{label} rejected: {e}"),
    }
}

//! Transmit HAL: context discovery, variant dispatch, sampling-rate policy,
//! and teardown-on-reselect. See SPEC_FULL.md section 10 / spec section
//! 4.8.

use crate::constants::min_frame_length;
use crate::dataset::SignalData;
use crate::device::{AttributeBus, DeviceCore, DumpContext, TxParameters, VariantA, VariantB, VariantC};
use crate::error::{Error, Result};

/// The reference sampling rate variant A is set to at init, chosen because
/// it exceeds variant A's ~2.083 MHz minimum (spec section 4.8).
const VARIANT_A_REFERENCE_SAMPLING_HZ: f64 = 2_500_000.0;

/// One entry in the discovered context list, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IioScanContext {
    /// The transport URI (`usb:…`, `ip:…`, `local:`).
    pub uri: String,
    /// A free-text description, used only to classify the device variant.
    pub description: String,
}

/// Collaborator that can enumerate and describe transport contexts, in
/// addition to the per-attribute operations of [`AttributeBus`]. The one
/// production implementation talks to `libiio` through the `industrial-io`
/// crate; tests use a recording fake.
pub trait Transport: AttributeBus {
    /// Enumerates every context currently visible on the system bus.
    fn scan_contexts(&self) -> Result<Vec<IioScanContext>>;

    /// Opens `uri` as the current context for all subsequent
    /// [`AttributeBus`] calls.
    fn open(&self, uri: &str) -> Result<()>;

    /// Briefly probes `uri` and returns its free-text description, without
    /// making it the current context.
    fn describe(&self, uri: &str) -> Result<String>;
}

/// Classifies a context's free-text description into the device variant it
/// should be driven as, by substring match (spec section 4.7).
#[must_use]
pub fn classify_description(description: &str) -> Option<VariantTag> {
    if description.contains("AD936") || description.contains("PLUTO") || description.contains("Pluto") {
        Some(VariantTag::A)
    } else if description.contains("ADRV9009") {
        Some(VariantTag::B)
    } else if description.contains("AD9081") || description.contains("AD9082") {
        Some(VariantTag::C)
    } else {
        None
    }
}

/// Which of the three device variants a context was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantTag {
    /// Baseband TRX, 12-bit DAC.
    A,
    /// Wideband TRX, 14-bit DAC.
    B,
    /// Mixed-signal frontend, 16-bit DAC.
    C,
}

/// A tagged sum over the three device variants (spec section 9's
/// "inheritance over three device variants" redesign note): no trait
/// object, no vtable; [`DeviceCore`] is implemented once here and
/// dispatches on the tag.
pub enum DeviceVariant {
    /// Baseband TRX, 12-bit DAC.
    A(VariantA),
    /// Wideband TRX, 14-bit DAC.
    B(VariantB),
    /// Mixed-signal frontend, 16-bit DAC.
    C(VariantC),
}

impl DeviceVariant {
    /// Builds an uninitialized variant for `tag`.
    #[must_use]
    pub fn new(tag: VariantTag) -> Self {
        match tag {
            VariantTag::A => Self::A(VariantA::new()),
            VariantTag::B => Self::B(VariantB::new()),
            VariantTag::C => Self::C(VariantC::new()),
        }
    }

    /// The tag identifying which variant this is.
    #[must_use]
    pub const fn tag(&self) -> VariantTag {
        match self {
            Self::A(_) => VariantTag::A,
            Self::B(_) => VariantTag::B,
            Self::C(_) => VariantTag::C,
        }
    }
}

impl DeviceCore for DeviceVariant {
    fn initialize(&mut self, bus: &dyn AttributeBus, uri: &str) -> Result<()> {
        match self {
            Self::A(v) => v.initialize(bus, uri),
            Self::B(v) => v.initialize(bus, uri),
            Self::C(v) => v.initialize(bus, uri),
        }
    }

    fn is_initialized(&self) -> bool {
        match self {
            Self::A(v) => v.is_initialized(),
            Self::B(v) => v.is_initialized(),
            Self::C(v) => v.is_initialized(),
        }
    }

    fn set_lo_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        match self {
            Self::A(v) => v.set_lo_hz(bus, hz),
            Self::B(v) => v.set_lo_hz(bus, hz),
            Self::C(v) => v.set_lo_hz(bus, hz),
        }
    }

    fn set_sampling_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        match self {
            Self::A(v) => v.set_sampling_hz(bus, hz),
            Self::B(v) => v.set_sampling_hz(bus, hz),
            Self::C(v) => v.set_sampling_hz(bus, hz),
        }
    }

    fn set_bandwidth_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        match self {
            Self::A(v) => v.set_bandwidth_hz(bus, hz),
            Self::B(v) => v.set_bandwidth_hz(bus, hz),
            Self::C(v) => v.set_bandwidth_hz(bus, hz),
        }
    }

    fn set_hardware_gain_db(&mut self, bus: &dyn AttributeBus, db: f64) -> Result<()> {
        match self {
            Self::A(v) => v.set_hardware_gain_db(bus, db),
            Self::B(v) => v.set_hardware_gain_db(bus, db),
            Self::C(v) => v.set_hardware_gain_db(bus, db),
        }
    }

    fn load_signal(&mut self, signal: &SignalData) {
        match self {
            Self::A(v) => v.load_signal(signal),
            Self::B(v) => v.load_signal(signal),
            Self::C(v) => v.load_signal(signal),
        }
    }

    fn start_streaming(&mut self, bus: &dyn AttributeBus, signal: &SignalData, dump_ctx: Option<DumpContext<'_>>) -> Result<()> {
        match self {
            Self::A(v) => v.start_streaming(bus, signal, dump_ctx),
            Self::B(v) => v.start_streaming(bus, signal, dump_ctx),
            Self::C(v) => v.start_streaming(bus, signal, dump_ctx),
        }
    }

    fn stop_streaming(&self, bus: &dyn AttributeBus) -> Result<()> {
        match self {
            Self::A(v) => v.stop_streaming(bus),
            Self::B(v) => v.stop_streaming(bus),
            Self::C(v) => v.stop_streaming(bus),
        }
    }

    fn parameters(&self) -> &TxParameters {
        match self {
            Self::A(v) => v.parameters(),
            Self::B(v) => v.parameters(),
            Self::C(v) => v.parameters(),
        }
    }
}

/// Default IP context appended after a successful variant-B/C probe (spec
/// section 4.8).
const DEFAULT_IP_URI: &str = "ip:10.0.0.2";

/// Owns the discovered contexts and the single active device variant, and
/// forwards every parameter read/write, start/stop, to it. With no active
/// variant, every forwarding operation is a no-op returning failure (spec
/// section 4.8).
pub struct TransmitHal<T: Transport> {
    transport: T,
    contexts: Vec<IioScanContext>,
    active: Option<DeviceVariant>,
    active_uri: Option<String>,
}

impl<T: Transport> TransmitHal<T> {
    /// Builds a HAL with no contexts discovered yet and no active variant.
    pub fn new(transport: T) -> Self {
        Self { transport, contexts: Vec::new(), active: None, active_uri: None }
    }

    /// Enumerates contexts from the system bus, keeps only USB-prefixed
    /// URIs, and appends the default IP context if probing it reveals
    /// variant B or C.
    ///
    /// # Errors
    ///
    /// Returns whatever error [`Transport::scan_contexts`] returns.
    pub fn discover_contexts(&mut self) -> Result<&[IioScanContext]> {
        let scanned = self.transport.scan_contexts()?;
        let mut contexts: Vec<IioScanContext> =
            scanned.into_iter().filter(|ctx| ctx.uri.starts_with("usb")).collect();

        if let Ok(description) = self.transport.describe(DEFAULT_IP_URI) {
            if matches!(classify_description(&description), Some(VariantTag::B | VariantTag::C)) {
                contexts.push(IioScanContext { uri: DEFAULT_IP_URI.to_string(), description });
            }
        }

        self.contexts = contexts;
        Ok(&self.contexts)
    }

    /// The contexts discovered by the most recent [`Self::discover_contexts`]
    /// call.
    #[must_use]
    pub fn contexts(&self) -> &[IioScanContext] {
        &self.contexts
    }

    /// Tears down the active variant (if any), classifies `uri` by its
    /// discovered description, and initializes the matching variant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] if `uri` is not among the
    /// discovered contexts or its description doesn't classify to a known
    /// variant; otherwise returns whatever [`DeviceCore::initialize`]
    /// returns.
    pub fn select(&mut self, uri: &str) -> Result<()> {
        if let Some(active) = &self.active {
            if active.is_initialized() {
                active.stop_streaming(&self.transport)?;
            }
        }
        self.active = None;
        self.active_uri = None;

        let context = self
            .contexts
            .iter()
            .find(|ctx| ctx.uri == uri)
            .ok_or_else(|| Error::DeviceMissing(format!("'{uri}' was not among the discovered contexts")))?;
        let tag = classify_description(&context.description)
            .ok_or_else(|| Error::DeviceMissing(format!("'{uri}' does not match any known device variant")))?;

        self.transport.open(uri)?;
        let mut variant = DeviceVariant::new(tag);
        variant.initialize(&self.transport, uri)?;

        self.active = Some(variant);
        self.active_uri = Some(uri.to_string());
        Ok(())
    }

    /// The currently selected context's URI, if any.
    #[must_use]
    pub fn active_uri(&self) -> Option<&str> {
        self.active_uri.as_deref()
    }

    /// Computes `ratio = frame_length(dataset) / min_frame_length_over_datasets`
    /// and, on variant A only, sets sampling frequency to
    /// `2_500_000 * ratio`. A no-op on variants B and C, whose rate is
    /// fixed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] with no active variant, otherwise
    /// whatever [`DeviceCore::set_sampling_hz`] returns.
    pub fn apply_sampling_rate_policy(&mut self, frame_length: usize) -> Result<()> {
        let active = self.active.as_mut().ok_or_else(|| Error::DeviceMissing("no active device variant".to_string()))?;
        if active.tag() != VariantTag::A {
            return Ok(());
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = frame_length as f64 / min_frame_length() as f64;
        active.set_sampling_hz(&self.transport, VARIANT_A_REFERENCE_SAMPLING_HZ * ratio)
    }

    /// Forwards to the active variant's [`DeviceCore::set_lo_hz`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] with no active variant, otherwise
    /// whatever [`DeviceCore::set_lo_hz`] returns.
    pub fn set_lo_hz(&mut self, hz: f64) -> Result<()> {
        let active = self.active.as_mut().ok_or_else(|| Error::DeviceMissing("no active device variant".to_string()))?;
        active.set_lo_hz(&self.transport, hz)
    }

    /// Forwards to the active variant's [`DeviceCore::set_sampling_hz`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] with no active variant, otherwise
    /// whatever [`DeviceCore::set_sampling_hz`] returns.
    pub fn set_sampling_hz(&mut self, hz: f64) -> Result<()> {
        let active = self.active.as_mut().ok_or_else(|| Error::DeviceMissing("no active device variant".to_string()))?;
        active.set_sampling_hz(&self.transport, hz)
    }

    /// Forwards to the active variant's [`DeviceCore::set_bandwidth_hz`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] with no active variant, otherwise
    /// whatever [`DeviceCore::set_bandwidth_hz`] returns.
    pub fn set_bandwidth_hz(&mut self, hz: f64) -> Result<()> {
        let active = self.active.as_mut().ok_or_else(|| Error::DeviceMissing("no active device variant".to_string()))?;
        active.set_bandwidth_hz(&self.transport, hz)
    }

    /// Forwards to the active variant's [`DeviceCore::set_hardware_gain_db`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] with no active variant, otherwise
    /// whatever [`DeviceCore::set_hardware_gain_db`] returns.
    pub fn set_hardware_gain_db(&mut self, db: f64) -> Result<()> {
        let active = self.active.as_mut().ok_or_else(|| Error::DeviceMissing("no active device variant".to_string()))?;
        active.set_hardware_gain_db(&self.transport, db)
    }

    /// Forwards to the active variant's [`DeviceCore::load_signal`] then
    /// [`DeviceCore::start_streaming`]. `dump_ctx` is forwarded unchanged;
    /// see [`DeviceCore::start_streaming`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] with no active variant.
    pub fn start_streaming(&mut self, signal: &SignalData, dump_ctx: Option<DumpContext<'_>>) -> Result<()> {
        let active = self.active.as_mut().ok_or_else(|| Error::DeviceMissing("no active device variant".to_string()))?;
        active.load_signal(signal);
        active.start_streaming(&self.transport, signal, dump_ctx)
    }

    /// Forwards to the active variant's [`DeviceCore::stop_streaming`].
    /// With no active variant, this is a no-op success, matching
    /// "idempotent, callable at any time" from spec section 5.
    ///
    /// # Errors
    ///
    /// Returns whatever [`DeviceCore::stop_streaming`] returns.
    pub fn stop_streaming(&self) -> Result<()> {
        match &self.active {
            Some(active) => active.stop_streaming(&self.transport),
            None => Ok(()),
        }
    }

    /// Forwards to the active variant's cached parameters, if any.
    #[must_use]
    pub fn parameters(&self) -> Option<&TxParameters> {
        self.active.as_ref().map(DeviceCore::parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeTransport {
        contexts: Vec<IioScanContext>,
        ip_description: Option<String>,
        names: RefCell<std::collections::HashMap<String, String>>,
    }

    impl FakeTransport {
        fn new_pluto_and_adrv() -> Self {
            let mut names = std::collections::HashMap::new();
            names.insert("ad9361-phy:name".to_string(), "ad9361-phy".to_string());
            names.insert("cf-ad9361-dds-core-lpc:name".to_string(), "cf-ad9361-dds-core-lpc".to_string());
            names.insert("ad9361-phy:altvoltage1:frequency".to_string(), "2400000000".to_string());
            names.insert("ad9361-phy:altvoltage1:frequency_available".to_string(), "[70000000 1 6000000000]".to_string());
            names.insert("ad9361-phy:sampling_frequency_available".to_string(), "[2083000 1 61440000]".to_string());
            names.insert("ad9361-phy:rf_bandwidth_available".to_string(), "[200000 1 56000000]".to_string());
            names.insert("ad9361-phy:hardwaregain_available".to_string(), "[-89.75 0.25 0]".to_string());

            Self {
                contexts: vec![IioScanContext { uri: "usb:1.2.3".to_string(), description: "PLUTO rev C".to_string() }],
                ip_description: Some("ADRV9009 wideband".to_string()),
                names: RefCell::new(names),
            }
        }
    }

    impl AttributeBus for FakeTransport {
        fn read_str(&self, device: &str, channel: Option<&str>, attribute: &str) -> Result<String> {
            let key = match channel {
                Some(c) => format!("{device}:{c}:{attribute}"),
                None => format!("{device}:{attribute}"),
            };
            self.names
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::AttributeIo { attribute: attribute.to_string(), reason: "not present".to_string() })
        }

        fn write_str(&self, _device: &str, _channel: Option<&str>, _attribute: &str, _value: &str) -> Result<()> {
            Ok(())
        }

        fn read_f64(&self, _device: &str, _channel: Option<&str>, _attribute: &str) -> Result<f64> {
            Ok(0.0)
        }

        fn write_f64(&self, _device: &str, _channel: Option<&str>, _attribute: &str, _value: f64) -> Result<()> {
            Ok(())
        }

        fn push_cyclic_buffer(&self, _device: &str, _samples: &[(i16, i16)]) -> Result<()> {
            Ok(())
        }
    }

    impl Transport for FakeTransport {
        fn scan_contexts(&self) -> Result<Vec<IioScanContext>> {
            Ok(self.contexts.clone())
        }

        fn open(&self, _uri: &str) -> Result<()> {
            Ok(())
        }

        fn describe(&self, uri: &str) -> Result<String> {
            if uri == DEFAULT_IP_URI {
                self.ip_description
                    .clone()
                    .ok_or_else(|| Error::DeviceMissing("no context at that URI".to_string()))
            } else {
                self.contexts
                    .iter()
                    .find(|ctx| ctx.uri == uri)
                    .map(|ctx| ctx.description.clone())
                    .ok_or_else(|| Error::DeviceMissing("no context at that URI".to_string()))
            }
        }
    }

    #[test]
    fn classify_matches_spec_substrings() {
        assert_eq!(classify_description("PLUTO rev C"), Some(VariantTag::A));
        assert_eq!(classify_description("Pluto"), Some(VariantTag::A));
        assert_eq!(classify_description("AD9361 generic"), Some(VariantTag::A));
        assert_eq!(classify_description("ADRV9009 wideband"), Some(VariantTag::B));
        assert_eq!(classify_description("AD9081 mixed signal"), Some(VariantTag::C));
        assert_eq!(classify_description("AD9082"), Some(VariantTag::C));
        assert_eq!(classify_description("unrelated device"), None);
    }

    #[test]
    fn discovery_keeps_usb_and_appends_ip_when_probe_matches() {
        let mut hal = TransmitHal::new(FakeTransport::new_pluto_and_adrv());
        let contexts = hal.discover_contexts().expect("scan succeeds").to_vec();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].uri, "usb:1.2.3");
        assert_eq!(contexts[1].uri, DEFAULT_IP_URI);
    }

    #[test]
    fn selecting_initializes_variant_a_for_pluto() {
        let mut hal = TransmitHal::new(FakeTransport::new_pluto_and_adrv());
        hal.discover_contexts().expect("scan succeeds");
        hal.select("usb:1.2.3").expect("pluto selects as variant A");
        assert_eq!(hal.active_uri(), Some("usb:1.2.3"));
        assert!(hal.parameters().is_some());
    }

    #[test]
    fn sampling_rate_policy_matches_spec_scenario_6() {
        let mut hal = TransmitHal::new(FakeTransport::new_pluto_and_adrv());
        hal.discover_contexts().expect("scan succeeds");
        hal.select("usb:1.2.3").expect("selects");

        hal.apply_sampling_rate_policy(1024).expect("variant A accepts the computed rate");
        assert_eq!(hal.parameters().and_then(|p| p.sampling_hz), Some(20_000_000.0));
    }

    #[test]
    fn selecting_unknown_uri_fails_without_disturbing_state() {
        let mut hal = TransmitHal::new(FakeTransport::new_pluto_and_adrv());
        hal.discover_contexts().expect("scan succeeds");
        let err = hal.select("usb:nonexistent").unwrap_err();
        assert!(matches!(err, Error::DeviceMissing(_)));
        assert_eq!(hal.active_uri(), None);
    }
}

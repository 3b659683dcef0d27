//! Variant C: mixed-signal frontend, 16-bit DAC (AD9081/AD9082 family). See
//! spec section 4.7.
//!
//! Different topology from A/B: no PHY device. A control device
//! (`axi-ad9081-rx-hpc`) is opened solely to reach the Tx NCO; bandwidth and
//! hardware gain are unsupported, and sampling frequency is read-only.

use super::variant_a::{start_streaming_generic, stop_streaming_generic};
use crate::dataset::SignalData;
use crate::device::{AttributeBus, DacWidth, DeviceCore, DumpContext, RangeF64, TxParameters};
use crate::error::{Error, Result};

const STREAM_DEVICE: &str = "axi-ad9081-tx-hpc";
const CONTROL_DEVICE: &str = "axi-ad9081-rx-hpc";
const NCO_ATTRIBUTE: &str = "main_nco_frequency";
const DAC_WIDTH: DacWidth = DacWidth(16);

const NCO_GAIN_RANGE: RangeF64 = RangeF64 { min: 0.0, step: 0.000_001, max: 1.0 };

/// The AD9081/AD9082 device variant.
#[derive(Debug, Default)]
pub struct VariantC {
    initialized: bool,
    sampling_hz_pinned: Option<f64>,
    params: TxParameters,
}

impl VariantC {
    /// An uninitialized variant, ready for [`DeviceCore::initialize`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the NCO gain scale, in `[0, 1]`. Variant C has no hardware
    /// gain attribute; this stands in for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `scale` lies outside `[0, 1]`.
    pub fn set_nco_gain_scale(&mut self, bus: &dyn AttributeBus, scale: f64) -> Result<()> {
        if !NCO_GAIN_RANGE.contains(scale) {
            return Err(Error::OutOfRange {
                attribute: "nco_gain_scale".to_string(),
                value: scale.to_string(),
                min: NCO_GAIN_RANGE.min.to_string(),
                max: NCO_GAIN_RANGE.max.to_string(),
            });
        }
        bus.write_f64(STREAM_DEVICE, None, "nco_gain_scale", scale)?;
        self.params.nco_gain_scale = Some(scale);
        Ok(())
    }
}

impl DeviceCore for VariantC {
    fn initialize(&mut self, bus: &dyn AttributeBus, uri: &str) -> Result<()> {
        bus.read_str(STREAM_DEVICE, None, "name")
            .map_err(|_| Error::DeviceMissing(format!("'{STREAM_DEVICE}' not present at '{uri}'")))?;
        bus.read_str(CONTROL_DEVICE, None, "name")
            .map_err(|_| Error::DeviceMissing(format!("'{CONTROL_DEVICE}' not present at '{uri}'")))?;
        bus.read_str(STREAM_DEVICE, None, NCO_ATTRIBUTE)
            .map_err(|_| Error::DeviceMissing(format!("attribute '{NCO_ATTRIBUTE}' not present on '{STREAM_DEVICE}'")))?;

        bus.push_cyclic_buffer(STREAM_DEVICE, &[])?;

        let sampling_text = bus.read_str(STREAM_DEVICE, None, "sampling_frequency")?;
        self.sampling_hz_pinned = sampling_text.trim().parse::<f64>().ok();
        self.params.sampling_hz = self.sampling_hz_pinned;
        self.set_nco_gain_scale(bus, 1.0)?;

        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_lo_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        // `main_nco_frequency` stands in for the LO on this variant; there
        // is no documented range, so any write is forwarded as-is.
        bus.write_f64(STREAM_DEVICE, None, NCO_ATTRIBUTE, hz)?;
        self.params.lo_hz = Some(hz);
        Ok(())
    }

    fn set_sampling_hz(&mut self, _bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        Err(Error::AttributeIo {
            attribute: "sampling_frequency".to_string(),
            reason: format!("read-only and pinned on this variant; {hz} Hz rejected"),
        })
    }

    fn set_bandwidth_hz(&mut self, _bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        Err(Error::AttributeIo {
            attribute: "rf_bandwidth".to_string(),
            reason: format!("unsupported on this variant; {hz} Hz rejected"),
        })
    }

    fn set_hardware_gain_db(&mut self, _bus: &dyn AttributeBus, db: f64) -> Result<()> {
        Err(Error::AttributeIo {
            attribute: "hardwaregain".to_string(),
            reason: format!("unsupported on this variant; {db} dB rejected; use set_nco_gain_scale instead"),
        })
    }

    fn load_signal(&mut self, signal: &SignalData) {
        self.params.frame_length = signal.frames().first().map(crate::dataset::FrameData::len);
        self.params.frame_count = Some(signal.frames().len());
    }

    fn start_streaming(&mut self, bus: &dyn AttributeBus, signal: &SignalData, dump_ctx: Option<DumpContext<'_>>) -> Result<()> {
        start_streaming_generic(bus, STREAM_DEVICE, signal, DAC_WIDTH, dump_ctx)
    }

    fn stop_streaming(&self, bus: &dyn AttributeBus) -> Result<()> {
        stop_streaming_generic(bus, STREAM_DEVICE)
    }

    fn parameters(&self) -> &TxParameters {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeBus {
        strings: HashMap<(String, Option<String>, String), String>,
        pushed: RefCell<Vec<(String, usize)>>,
    }

    impl FakeBus {
        fn with_variant_c_defaults() -> Self {
            let mut bus = Self::default();
            bus.strings.insert((STREAM_DEVICE.into(), None, "name".into()), "axi-ad9081-tx-hpc".into());
            bus.strings.insert((CONTROL_DEVICE.into(), None, "name".into()), "axi-ad9081-rx-hpc".into());
            bus.strings.insert((STREAM_DEVICE.into(), None, NCO_ATTRIBUTE.into()), "2000000000".into());
            bus.strings.insert((STREAM_DEVICE.into(), None, "sampling_frequency".into()), "3932160000".into());
            bus
        }
    }

    impl AttributeBus for FakeBus {
        fn read_str(&self, device: &str, channel: Option<&str>, attribute: &str) -> Result<String> {
            self.strings
                .get(&(device.to_string(), channel.map(str::to_string), attribute.to_string()))
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

        fn push_cyclic_buffer(&self, device: &str, samples: &[(i16, i16)]) -> Result<()> {
            self.pushed.borrow_mut().push((device.to_string(), samples.len()));
            Ok(())
        }
    }

    #[test]
    fn initialize_pins_sampling_rate_and_sets_full_nco_gain() {
        let bus = FakeBus::with_variant_c_defaults();
        let mut variant = VariantC::new();
        variant.initialize(&bus, "usb:3.4.5").expect("initializes");

        assert_eq!(variant.parameters().sampling_hz, Some(3_932_160_000.0));
        assert_eq!(variant.parameters().nco_gain_scale, Some(1.0));
    }

    #[test]
    fn bandwidth_and_gain_are_unsupported() {
        let bus = FakeBus::with_variant_c_defaults();
        let mut variant = VariantC::new();
        variant.initialize(&bus, "usb:3.4.5").expect("initializes");

        assert!(variant.set_bandwidth_hz(&bus, 10_000_000.0).is_err());
        assert!(variant.set_hardware_gain_db(&bus, -5.0).is_err());
    }

    #[test]
    fn nco_gain_scale_rejects_out_of_range() {
        let bus = FakeBus::with_variant_c_defaults();
        let mut variant = VariantC::new();
        variant.initialize(&bus, "usb:3.4.5").expect("initializes");

        let err = variant.set_nco_gain_scale(&bus, 1.5).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
        assert_eq!(variant.parameters().nco_gain_scale, Some(1.0));
    }
}

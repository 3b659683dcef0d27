//! Variant B: wideband TRX, 14-bit DAC (ADRV9009 family). See spec
//! section 4.7.
//!
//! Unlike variant A, most ranges are hard-coded rather than queried from
//! the bus, and bandwidth/sampling frequency are not writable.

use super::variant_a::{start_streaming_generic, stop_streaming_generic};
use crate::dataset::SignalData;
use crate::device::{AttributeBus, DacWidth, DeviceCore, DumpContext, RangeF64, RangeI64, TxParameters};
use crate::error::{Error, Result};

const PHY_DEVICE: &str = "adrv9009-phy";
const STREAM_DEVICE: &str = "axi-adrv9009-tx-hpc";
const LO_CHANNEL: &str = "altvoltage0";
const DAC_WIDTH: DacWidth = DacWidth(14);

const LO_RANGE: RangeI64 = RangeI64 { min: 70_000_000, step: 1, max: 6_000_000_000 };
const SAMPLING_HZ: f64 = 122_880_000.0;
const BANDWIDTH_HZ: f64 = 100_000_000.0;
const GAIN_RANGE: RangeF64 = RangeF64 { min: -30.0, step: 0.05, max: 0.0 };

/// The ADRV9009 device variant.
#[derive(Debug, Default)]
pub struct VariantB {
    initialized: bool,
    params: TxParameters,
}

impl VariantB {
    /// An uninitialized variant, ready for [`DeviceCore::initialize`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceCore for VariantB {
    fn initialize(&mut self, bus: &dyn AttributeBus, uri: &str) -> Result<()> {
        bus.read_str(PHY_DEVICE, None, "name")
            .map_err(|_| Error::DeviceMissing(format!("'{PHY_DEVICE}' not present at '{uri}'")))?;
        bus.read_str(STREAM_DEVICE, None, "name")
            .map_err(|_| Error::DeviceMissing(format!("'{STREAM_DEVICE}' not present at '{uri}'")))?;
        bus.read_str(PHY_DEVICE, Some(LO_CHANNEL), "frequency")
            .map_err(|_| Error::DeviceMissing(format!("channel '{LO_CHANNEL}' not present on '{PHY_DEVICE}'")))?;

        bus.push_cyclic_buffer(STREAM_DEVICE, &[])?;

        // Sampling frequency and bandwidth are pinned and not writable on
        // this variant; the cached values reflect hardware reality without
        // ever issuing a write.
        self.params.sampling_hz = Some(SAMPLING_HZ);
        self.params.bandwidth_hz = Some(BANDWIDTH_HZ);
        self.set_hardware_gain_db(bus, GAIN_RANGE.max)?;

        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_lo_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        if !LO_RANGE.contains(hz as i64) {
            return Err(out_of_range("frequency", hz, LO_RANGE.min as f64, LO_RANGE.max as f64));
        }
        bus.write_f64(PHY_DEVICE, Some(LO_CHANNEL), "frequency", hz)?;
        self.params.lo_hz = Some(hz);
        Ok(())
    }

    fn set_sampling_hz(&mut self, _bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        Err(Error::AttributeIo {
            attribute: "sampling_frequency".to_string(),
            reason: format!("fixed at {SAMPLING_HZ} Hz on this variant; {hz} Hz rejected"),
        })
    }

    fn set_bandwidth_hz(&mut self, _bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        Err(Error::AttributeIo {
            attribute: "rf_bandwidth".to_string(),
            reason: format!("fixed at {BANDWIDTH_HZ} Hz on this variant; {hz} Hz rejected"),
        })
    }

    fn set_hardware_gain_db(&mut self, bus: &dyn AttributeBus, db: f64) -> Result<()> {
        if !GAIN_RANGE.contains(db) {
            return Err(out_of_range("hardwaregain", db, GAIN_RANGE.min, GAIN_RANGE.max));
        }
        bus.write_f64(PHY_DEVICE, None, "hardwaregain", db)?;
        self.params.hardware_gain_db = Some(db);
        Ok(())
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

#[allow(clippy::cast_precision_loss)]
fn out_of_range(attribute: &str, value: f64, min: f64, max: f64) -> Error {
    Error::OutOfRange {
        attribute: attribute.to_string(),
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBus {
        pushed: RefCell<Vec<(String, usize)>>,
    }

    impl AttributeBus for FakeBus {
        fn read_str(&self, _device: &str, _channel: Option<&str>, _attribute: &str) -> Result<String> {
            Ok(String::new())
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
    fn initialize_pins_bandwidth_and_sampling_rate() {
        let bus = FakeBus::default();
        let mut variant = VariantB::new();
        variant.initialize(&bus, "ip:10.0.0.2").expect("initializes");

        assert_eq!(variant.parameters().sampling_hz, Some(SAMPLING_HZ));
        assert_eq!(variant.parameters().bandwidth_hz, Some(BANDWIDTH_HZ));
        assert_eq!(variant.parameters().hardware_gain_db, Some(0.0));
    }

    #[test]
    fn sampling_rate_and_bandwidth_are_not_writable() {
        let bus = FakeBus::default();
        let mut variant = VariantB::new();
        variant.initialize(&bus, "ip:10.0.0.2").expect("initializes");

        assert!(variant.set_sampling_hz(&bus, 50_000_000.0).is_err());
        assert!(variant.set_bandwidth_hz(&bus, 50_000_000.0).is_err());
        // rejecting the write must not disturb the cached pinned values.
        assert_eq!(variant.parameters().sampling_hz, Some(SAMPLING_HZ));
    }

    #[test]
    fn lo_range_matches_spec_scenario_5() {
        let bus = FakeBus::default();
        let mut variant = VariantB::new();
        variant.initialize(&bus, "ip:10.0.0.2").expect("initializes");

        assert!(variant.set_lo_hz(&bus, 69_999_999.0).is_err());
        variant.set_lo_hz(&bus, 70_000_000.0).expect("boundary accepted");
        assert_eq!(variant.parameters().lo_hz, Some(70_000_000.0));
    }
}

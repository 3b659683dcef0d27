//! Variant A: baseband TRX, 12-bit DAC (AD9361 / ADALM-Pluto family). See
//! spec section 4.7.

use crate::dataset::SignalData;
use crate::device::{
    convert_sample, parse_range_f64, parse_range_i64, AttributeBus, DacWidth, DeviceCore, DumpContext, RangeF64,
    RangeI64, TxParameters,
};
use crate::error::{Error, Result};

const PHY_DEVICE: &str = "ad9361-phy";
const STREAM_DEVICE: &str = "cf-ad9361-dds-core-lpc";
const LO_CHANNEL: &str = "altvoltage1";
const DAC_WIDTH: DacWidth = DacWidth(12);

/// At init, hardware gain and bandwidth are driven to their maxima and the
/// sampling rate is set to this default (spec section 4.7).
const DEFAULT_SAMPLING_HZ: f64 = 2_500_000.0;

/// Ranges cached at [`DeviceCore::initialize`] time.
#[derive(Debug, Clone, Copy, Default)]
struct CachedRanges {
    lo: Option<RangeI64>,
    sampling: Option<RangeI64>,
    bandwidth: Option<RangeI64>,
    gain: Option<RangeF64>,
}

/// The AD9361/Pluto device variant.
#[derive(Debug, Default)]
pub struct VariantA {
    initialized: bool,
    ranges: CachedRanges,
    params: TxParameters,
}

impl VariantA {
    /// An uninitialized variant, ready for [`DeviceCore::initialize`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceCore for VariantA {
    fn initialize(&mut self, bus: &dyn AttributeBus, uri: &str) -> Result<()> {
        bus.read_str(PHY_DEVICE, None, "name")
            .map_err(|_| Error::DeviceMissing(format!("'{PHY_DEVICE}' not present at '{uri}'")))?;
        bus.read_str(STREAM_DEVICE, None, "name")
            .map_err(|_| Error::DeviceMissing(format!("'{STREAM_DEVICE}' not present at '{uri}'")))?;
        bus.read_str(PHY_DEVICE, Some(LO_CHANNEL), "frequency")
            .map_err(|_| Error::DeviceMissing(format!("channel '{LO_CHANNEL}' not present on '{PHY_DEVICE}'")))?;

        let lo_text = bus.read_str(PHY_DEVICE, Some(LO_CHANNEL), "frequency_available")?;
        let sampling_text = bus.read_str(PHY_DEVICE, None, "sampling_frequency_available")?;
        let bandwidth_text = bus.read_str(PHY_DEVICE, None, "rf_bandwidth_available")?;
        let gain_text = bus.read_str(PHY_DEVICE, None, "hardwaregain_available")?;

        self.ranges = CachedRanges {
            lo: Some(parse_range_i64("frequency_available", &lo_text)?),
            sampling: Some(parse_range_i64("sampling_frequency_available", &sampling_text)?),
            bandwidth: Some(parse_range_i64("rf_bandwidth_available", &bandwidth_text)?),
            gain: Some(parse_range_f64("hardwaregain_available", &gain_text)?),
        };

        bus.push_cyclic_buffer(STREAM_DEVICE, &[])?;

        if let Some(gain) = self.ranges.gain {
            self.set_hardware_gain_db(bus, gain.max)?;
        }
        if let Some(bandwidth) = self.ranges.bandwidth {
            #[allow(clippy::cast_precision_loss)]
            self.set_bandwidth_hz(bus, bandwidth.max as f64)?;
        }
        self.set_sampling_hz(bus, DEFAULT_SAMPLING_HZ)?;

        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_lo_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        let range = self.ranges.lo.ok_or_else(|| Error::DeviceMissing("LO range not cached".to_string()))?;
        #[allow(clippy::cast_possible_truncation)]
        if !range.contains(hz as i64) {
            return Err(out_of_range("frequency", hz, f64_from_i64(range.min), f64_from_i64(range.max)));
        }
        bus.write_f64(PHY_DEVICE, Some(LO_CHANNEL), "frequency", hz)?;
        self.params.lo_hz = Some(hz);
        Ok(())
    }

    fn set_sampling_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        let range = self.ranges.sampling.ok_or_else(|| Error::DeviceMissing("sampling range not cached".to_string()))?;
        #[allow(clippy::cast_possible_truncation)]
        if !range.contains(hz as i64) {
            return Err(out_of_range("sampling_frequency", hz, f64_from_i64(range.min), f64_from_i64(range.max)));
        }
        bus.write_f64(PHY_DEVICE, None, "sampling_frequency", hz)?;
        self.params.sampling_hz = Some(hz);
        Ok(())
    }

    fn set_bandwidth_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()> {
        let range = self.ranges.bandwidth.ok_or_else(|| Error::DeviceMissing("bandwidth range not cached".to_string()))?;
        #[allow(clippy::cast_possible_truncation)]
        if !range.contains(hz as i64) {
            return Err(out_of_range("rf_bandwidth", hz, f64_from_i64(range.min), f64_from_i64(range.max)));
        }
        bus.write_f64(PHY_DEVICE, None, "rf_bandwidth", hz)?;
        self.params.bandwidth_hz = Some(hz);
        Ok(())
    }

    fn set_hardware_gain_db(&mut self, bus: &dyn AttributeBus, db: f64) -> Result<()> {
        let range = self.ranges.gain.ok_or_else(|| Error::DeviceMissing("gain range not cached".to_string()))?;
        if !range.contains(db) {
            return Err(out_of_range("hardwaregain", db, range.min, range.max));
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

/// Shared `start_streaming` body: convert every cached sample and push one
/// cyclic buffer. Lives outside the `impl` block so all three variants can
/// share it without a blanket trait impl.
pub(super) fn start_streaming_generic(
    bus: &dyn AttributeBus,
    device: &str,
    signal: &SignalData,
    width: DacWidth,
    dump_ctx: Option<DumpContext<'_>>,
) -> Result<()> {
    #[cfg(feature = "dump")]
    if let Some(ctx) = dump_ctx {
        let path = crate::dump::default_dump_path(ctx.kind, ctx.modulation_alias, ctx.snr_db);
        crate::dump::write_first_two_frames(signal, &path)?;
    }
    #[cfg(not(feature = "dump"))]
    let _ = dump_ctx;

    let max_abs = signal.max_abs();
    let samples: Vec<(i16, i16)> = signal
        .frames()
        .iter()
        .flat_map(crate::dataset::FrameData::points)
        .map(|point| convert_sample(point.i, point.q, max_abs, width))
        .collect();
    bus.push_cyclic_buffer(device, &samples)
}

/// Shared `stop_streaming` body: a 1024-slot zero buffer.
pub(super) fn stop_streaming_generic(bus: &dyn AttributeBus, device: &str) -> Result<()> {
    let zeroes = vec![(0_i16, 0_i16); 1024];
    bus.push_cyclic_buffer(device, &zeroes)
}

fn out_of_range(attribute: &str, value: f64, min: f64, max: f64) -> Error {
    Error::OutOfRange {
        attribute: attribute.to_string(),
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn f64_from_i64(value: i64) -> f64 {
    value as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeBus {
        strings: HashMap<(String, Option<String>, String), String>,
        floats: RefCell<HashMap<(String, Option<String>, String), f64>>,
        pushed: RefCell<Vec<(String, usize)>>,
    }

    impl FakeBus {
        fn with_variant_a_defaults() -> Self {
            let mut bus = Self::default();
            bus.strings.insert((PHY_DEVICE.into(), None, "name".into()), "ad9361-phy".into());
            bus.strings.insert((STREAM_DEVICE.into(), None, "name".into()), "cf-ad9361-dds-core-lpc".into());
            bus.strings.insert((PHY_DEVICE.into(), Some(LO_CHANNEL.into()), "frequency".into()), "2400000000".into());
            bus.strings.insert(
                (PHY_DEVICE.into(), Some(LO_CHANNEL.into()), "frequency_available".into()),
                "[70000000 1 6000000000]".into(),
            );
            bus.strings.insert(
                (PHY_DEVICE.into(), None, "sampling_frequency_available".into()),
                "[2083000 1 61440000]".into(),
            );
            bus.strings.insert((PHY_DEVICE.into(), None, "rf_bandwidth_available".into()), "[200000 1 56000000]".into());
            bus.strings.insert((PHY_DEVICE.into(), None, "hardwaregain_available".into()), "[-89.75 0.25 0]".into());
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

        fn read_f64(&self, device: &str, channel: Option<&str>, attribute: &str) -> Result<f64> {
            self.floats
                .borrow()
                .get(&(device.to_string(), channel.map(str::to_string), attribute.to_string()))
                .copied()
                .ok_or_else(|| Error::AttributeIo { attribute: attribute.to_string(), reason: "not present".to_string() })
        }

        fn write_f64(&self, device: &str, channel: Option<&str>, attribute: &str, value: f64) -> Result<()> {
            self.floats
                .borrow_mut()
                .insert((device.to_string(), channel.map(str::to_string), attribute.to_string()), value);
            Ok(())
        }

        fn push_cyclic_buffer(&self, device: &str, samples: &[(i16, i16)]) -> Result<()> {
            self.pushed.borrow_mut().push((device.to_string(), samples.len()));
            Ok(())
        }
    }

    #[test]
    fn initialize_sets_gain_bandwidth_and_sampling_defaults() {
        let bus = FakeBus::with_variant_a_defaults();
        let mut variant = VariantA::new();
        variant.initialize(&bus, "usb:1.2.3").expect("initializes");

        assert!(variant.is_initialized());
        assert_eq!(variant.parameters().hardware_gain_db, Some(0.0));
        assert_eq!(variant.parameters().bandwidth_hz, Some(56_000_000.0));
        assert_eq!(variant.parameters().sampling_hz, Some(DEFAULT_SAMPLING_HZ));
    }

    #[test]
    fn set_lo_hz_rejects_out_of_range_scenario_5() {
        let bus = FakeBus::with_variant_a_defaults();
        let mut variant = VariantA::new();
        variant.initialize(&bus, "usb:1.2.3").expect("initializes");

        let err = variant.set_lo_hz(&bus, 69_999_999.0).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
        assert_eq!(variant.parameters().lo_hz, None);

        variant.set_lo_hz(&bus, 70_000_000.0).expect("boundary value accepted");
        assert_eq!(variant.parameters().lo_hz, Some(70_000_000.0));
    }

    #[test]
    fn stop_streaming_pushes_1024_zero_slots() {
        let bus = FakeBus::with_variant_a_defaults();
        let variant = VariantA::new();
        variant.stop_streaming(&bus).expect("idempotent");
        assert_eq!(bus.pushed.borrow().last(), Some(&(STREAM_DEVICE.to_string(), 1024)));
    }
}

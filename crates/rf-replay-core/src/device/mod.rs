//! Device abstraction shared by all three ADI front-end variants. See
//! SPEC_FULL.md section 8 / spec section 4.6.

mod variant_a;
mod variant_b;
mod variant_c;

pub use variant_a::VariantA;
pub use variant_b::VariantB;
pub use variant_c::VariantC;

use crate::constants::DatasetKind;
use crate::dataset::SignalData;
use crate::error::{Error, Result};

/// Naming context for the optional dump file (SPEC_FULL.md section 11 /
/// spec section 6), threaded through [`DeviceCore::start_streaming`] so the
/// `dump` feature can name the file
/// `<DatasetLabel>_<ModulationAlias>_<SNR>dB.txt` without the device layer
/// needing to know about [`crate::modulation::ModulationRegistry`] or
/// [`crate::dataset::DatasetStore`].
#[derive(Debug, Clone, Copy)]
pub struct DumpContext<'a> {
    /// The dataset kind the streamed signal was parsed from.
    pub kind: DatasetKind,
    /// The modulation's canonical alias, for the dump filename.
    pub modulation_alias: &'a str,
    /// The SNR level, in dB, for the dump filename.
    pub snr_db: i32,
}

/// A key/value attribute bus, consumed as a black box by every device
/// variant. The one production implementation
/// ([`industrial_io_bus::IndustrialIoBus`]) talks to `libiio` through the
/// `industrial-io` crate; tests use a recording fake.
pub trait AttributeBus {
    /// Reads a string-valued attribute.
    fn read_str(&self, device: &str, channel: Option<&str>, attribute: &str) -> Result<String>;
    /// Writes a string-valued attribute.
    fn write_str(&self, device: &str, channel: Option<&str>, attribute: &str, value: &str) -> Result<()>;
    /// Reads a floating-point attribute.
    fn read_f64(&self, device: &str, channel: Option<&str>, attribute: &str) -> Result<f64>;
    /// Writes a floating-point attribute.
    fn write_f64(&self, device: &str, channel: Option<&str>, attribute: &str, value: f64) -> Result<()>;
    /// Replaces `device`'s cyclic DMA buffer with `samples` and starts
    /// hardware replay. An empty slice silences the output.
    fn push_cyclic_buffer(&self, device: &str, samples: &[(i16, i16)]) -> Result<()>;
}

/// A closed integer range parsed from the bus's `"[min step max]"` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeI64 {
    /// Inclusive lower bound.
    pub min: i64,
    /// Granularity between valid values; informational only, not enforced.
    pub step: i64,
    /// Inclusive upper bound.
    pub max: i64,
}

impl RangeI64 {
    /// Whether `value` lies within `[min, max]`.
    #[must_use]
    pub const fn contains(self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A closed floating-point range parsed from the bus's `"[min step max]"`
/// form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeF64 {
    /// Inclusive lower bound.
    pub min: f64,
    /// Granularity between valid values; informational only, not enforced.
    pub step: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl RangeF64 {
    /// Whether `value` lies within `[min, max]`.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Parses a bus-reported `"[min step max]"` range string into an
/// integer range.
///
/// # Errors
///
/// Returns [`Error::AttributeIo`] if `text` doesn't have exactly three
/// whitespace-separated, bracket-delimited integer tokens.
pub fn parse_range_i64(attribute: &str, text: &str) -> Result<RangeI64> {
    let (min, step, max) = split_range_tokens(attribute, text)?;
    let parse = |token: &str| {
        token
            .parse::<i64>()
            .map_err(|_| Error::AttributeIo { attribute: attribute.to_string(), reason: format!("'{token}' is not an integer") })
    };
    Ok(RangeI64 { min: parse(min)?, step: parse(step)?, max: parse(max)? })
}

/// Parses a bus-reported `"[min step max]"` range string into a
/// floating-point range.
///
/// # Errors
///
/// Returns [`Error::AttributeIo`] if `text` doesn't have exactly three
/// whitespace-separated, bracket-delimited numeric tokens.
pub fn parse_range_f64(attribute: &str, text: &str) -> Result<RangeF64> {
    let (min, step, max) = split_range_tokens(attribute, text)?;
    let parse = |token: &str| {
        token
            .parse::<f64>()
            .map_err(|_| Error::AttributeIo { attribute: attribute.to_string(), reason: format!("'{token}' is not a number") })
    };
    Ok(RangeF64 { min: parse(min)?, step: parse(step)?, max: parse(max)? })
}

/// Splits a `"[min step max]"` string into its three tokens.
fn split_range_tokens<'a>(attribute: &str, text: &'a str) -> Result<(&'a str, &'a str, &'a str)> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| Error::AttributeIo {
            attribute: attribute.to_string(),
            reason: format!("range string '{text}' is not bracket-delimited"),
        })?;
    let mut tokens = inner.split_whitespace();
    let (Some(min), Some(step), Some(max), None) = (tokens.next(), tokens.next(), tokens.next(), tokens.next()) else {
        return Err(Error::AttributeIo {
            attribute: attribute.to_string(),
            reason: format!("range string '{text}' does not have exactly 3 tokens"),
        });
    };
    Ok((min, step, max))
}

/// Cached per-variant transmit parameters plus the loaded signal's shape, as
/// described in spec section 4.6.
#[derive(Debug, Clone, Default)]
pub struct TxParameters {
    /// Local-oscillator (or, on variant C, NCO) center frequency, in Hz.
    pub lo_hz: Option<f64>,
    /// Sampling frequency, in Hz.
    pub sampling_hz: Option<f64>,
    /// RF bandwidth, in Hz.
    pub bandwidth_hz: Option<f64>,
    /// Hardware gain, in dB.
    pub hardware_gain_db: Option<f64>,
    /// NCO gain scale, in `[0, 1]`; variant C only.
    pub nco_gain_scale: Option<f64>,
    /// Number of `(I, Q)` points in one cached frame.
    pub frame_length: Option<usize>,
    /// Number of frames in the cached signal.
    pub frame_count: Option<usize>,
}

/// The DAC bit width a variant converts samples for; determines the
/// left-shift applied after scaling (spec section 4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DacWidth(pub u32);

impl DacWidth {
    /// `S = 16 - W`.
    #[must_use]
    pub const fn shift(self) -> u32 {
        16 - self.0
    }

    /// `2^(W-1) - 1`, the largest magnitude representable by a signed `W`-bit
    /// sample.
    #[must_use]
    pub const fn full_scale(self) -> i64 {
        (1_i64 << (self.0 - 1)) - 1
    }
}

/// Converts one `(i, q)` sample, normalized to `[-max_abs, max_abs]`, into
/// the `(i16, i16)` pair the DMA buffer expects, per spec section 4.6's
/// scale-and-shift rule.
///
/// Truncates toward zero, matching the spec's `cast_i16` description.
#[must_use]
pub fn convert_sample(i: f32, q: f32, max_abs: f32, width: DacWidth) -> (i16, i16) {
    let scale = f64::from(width.full_scale() as i16) / f64::from(max_abs);
    let shift = width.shift();
    let convert = |value: f32| -> i16 {
        let scaled = (f64::from(value) * scale).trunc();
        #[allow(clippy::cast_possible_truncation)]
        let truncated = scaled as i16;
        truncated << shift
    };
    (convert(i), convert(q))
}

/// Contract common to every device variant. See SPEC_FULL.md section 8 /
/// spec section 4.6.
pub trait DeviceCore {
    /// Opens a transport context named by `uri`, locates the family's PHY
    /// and streaming sub-devices and I/Q channels, enables channels,
    /// creates a zero-length cyclic DMA buffer, and queries parameter
    /// ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] if a required sub-device or channel
    /// is absent, or [`Error::AttributeIo`] if a range query fails.
    fn initialize(&mut self, bus: &dyn AttributeBus, uri: &str) -> Result<()>;

    /// Whether [`DeviceCore::initialize`] has completed successfully.
    fn is_initialized(&self) -> bool;

    /// Sets the local-oscillator (or NCO, on variant C) frequency, in Hz.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `hz` lies outside the cached range,
    /// or [`Error::AttributeIo`] on a bus failure; the cached value is left
    /// untouched either way.
    fn set_lo_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()>;

    /// Sets the sampling frequency, in Hz.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`], [`Error::AttributeIo`], or (on
    /// variants where the rate is fixed) an [`Error::AttributeIo`] noting
    /// the attribute is read-only.
    fn set_sampling_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()>;

    /// Sets RF bandwidth, in Hz. Unsupported on variant C.
    ///
    /// # Errors
    ///
    /// See [`DeviceCore::set_lo_hz`].
    fn set_bandwidth_hz(&mut self, bus: &dyn AttributeBus, hz: f64) -> Result<()>;

    /// Sets hardware gain, in dB. Unsupported on variant C.
    ///
    /// # Errors
    ///
    /// See [`DeviceCore::set_lo_hz`].
    fn set_hardware_gain_db(&mut self, bus: &dyn AttributeBus, db: f64) -> Result<()>;

    /// Borrows `signal`'s shape, caching `frame_length` and `frame_count`
    /// for the next [`DeviceCore::start_streaming`].
    fn load_signal(&mut self, signal: &SignalData);

    /// Converts every cached sample and pushes one cyclic DMA buffer of
    /// exactly `frame_length * frame_count` slots.
    ///
    /// `dump_ctx`, when `Some`, names the optional first-two-frames dump
    /// file written before conversion under the `dump` Cargo feature
    /// (SPEC_FULL.md section 11); it is ignored when that feature is off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceMissing`] if no signal has been loaded, or
    /// [`Error::AttributeIo`] if the push fails.
    fn start_streaming(&mut self, bus: &dyn AttributeBus, signal: &SignalData, dump_ctx: Option<DumpContext<'_>>) -> Result<()>;

    /// Pushes a 1024-slot zero-filled cyclic buffer, silencing the output.
    /// Idempotent; may be called at any time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttributeIo`] if the push fails.
    fn stop_streaming(&self, bus: &dyn AttributeBus) -> Result<()>;

    /// The parameters cached so far.
    fn parameters(&self) -> &TxParameters;
}

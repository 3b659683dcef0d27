//! `industrial-io` (`libiio`)-backed [`AttributeBus`]/[`Transport`]
//! implementation. This is the one concrete backing for the "opaque
//! key/value attribute bus... consumed as a black-box" collaborator named
//! out-of-scope by spec section 1; every device variant still only talks to
//! the trait, never to this module directly. See SPEC_FULL.md section 8.

use std::cell::RefCell;

use industrial_io::Context;

use crate::device::AttributeBus;
use crate::error::{Error, Result};
use crate::hal::{IioScanContext, Transport};

/// Streaming output channels are addressed by these fixed names on every
/// variant's TX streaming device; `I` and `Q` are interleaved samples on
/// the two channels, matching how these ADI drivers expose baseband TX.
const CHANNEL_I: &str = "voltage0";
const CHANNEL_Q: &str = "voltage1";

/// Holds the currently opened `libiio` context, if any. A single bus
/// instance is shared by the whole [`crate::hal::TransmitHal`]; only one
/// context is ever open at a time, matching the "at most one active
/// variant" invariant from spec section 5.
pub struct IndustrialIoBus {
    current: RefCell<Option<Context>>,
}

impl Default for IndustrialIoBus {
    fn default() -> Self {
        Self::new()
    }
}

impl IndustrialIoBus {
    /// A bus with no context open yet.
    #[must_use]
    pub fn new() -> Self {
        Self { current: RefCell::new(None) }
    }

    fn with_context<R>(&self, f: impl FnOnce(&Context) -> Result<R>) -> Result<R> {
        let guard = self.current.borrow();
        let context = guard
            .as_ref()
            .ok_or_else(|| Error::DeviceMissing("no transport context is open".to_string()))?;
        f(context)
    }
}

impl AttributeBus for IndustrialIoBus {
    fn read_str(&self, device: &str, channel: Option<&str>, attribute: &str) -> Result<String> {
        self.with_context(|context| {
            let dev = context
                .find_device(device)
                .ok_or_else(|| Error::DeviceMissing(format!("device '{device}' not found")))?;
            match channel {
                Some(name) => find_channel(&dev, name)?
                    .attr_read_str(attribute)
                    .map_err(|e| attribute_io(attribute, e)),
                None => dev.attr_read_str(attribute).map_err(|e| attribute_io(attribute, e)),
            }
        })
    }

    fn write_str(&self, device: &str, channel: Option<&str>, attribute: &str, value: &str) -> Result<()> {
        self.with_context(|context| {
            let dev = context
                .find_device(device)
                .ok_or_else(|| Error::DeviceMissing(format!("device '{device}' not found")))?;
            match channel {
                Some(name) => find_channel(&dev, name)?
                    .attr_write_str(attribute, value)
                    .map_err(|e| attribute_io(attribute, e)),
                None => dev.attr_write_str(attribute, value).map_err(|e| attribute_io(attribute, e)),
            }
        })
    }

    fn read_f64(&self, device: &str, channel: Option<&str>, attribute: &str) -> Result<f64> {
        self.with_context(|context| {
            let dev = context
                .find_device(device)
                .ok_or_else(|| Error::DeviceMissing(format!("device '{device}' not found")))?;
            match channel {
                Some(name) => find_channel(&dev, name)?
                    .attr_read_float(attribute)
                    .map_err(|e| attribute_io(attribute, e)),
                None => dev.attr_read_float(attribute).map_err(|e| attribute_io(attribute, e)),
            }
        })
    }

    fn write_f64(&self, device: &str, channel: Option<&str>, attribute: &str, value: f64) -> Result<()> {
        self.with_context(|context| {
            let dev = context
                .find_device(device)
                .ok_or_else(|| Error::DeviceMissing(format!("device '{device}' not found")))?;
            match channel {
                Some(name) => find_channel(&dev, name)?
                    .attr_write_float(attribute, value)
                    .map_err(|e| attribute_io(attribute, e)),
                None => dev.attr_write_float(attribute, value).map_err(|e| attribute_io(attribute, e)),
            }
        })
    }

    fn push_cyclic_buffer(&self, device: &str, samples: &[(i16, i16)]) -> Result<()> {
        self.with_context(|context| {
            let dev = context
                .find_device(device)
                .ok_or_else(|| Error::DeviceMissing(format!("device '{device}' not found")))?;
            let chan_i = find_channel(&dev, CHANNEL_I)?;
            let chan_q = find_channel(&dev, CHANNEL_Q)?;
            chan_i.enable();
            chan_q.enable();

            let count = samples.len().max(1);
            let mut buffer = dev
                .create_buffer(count, true)
                .map_err(|e| Error::AttributeIo { attribute: "cyclic_buffer".to_string(), reason: e.to_string() })?;

            let i_samples: Vec<i16> = samples.iter().map(|(i, _)| *i).collect();
            let q_samples: Vec<i16> = samples.iter().map(|(_, q)| *q).collect();
            chan_i
                .write(&mut buffer, &i_samples)
                .map_err(|e| Error::AttributeIo { attribute: "cyclic_buffer".to_string(), reason: e.to_string() })?;
            chan_q
                .write(&mut buffer, &q_samples)
                .map_err(|e| Error::AttributeIo { attribute: "cyclic_buffer".to_string(), reason: e.to_string() })?;

            buffer
                .push()
                .map_err(|e| Error::AttributeIo { attribute: "cyclic_buffer".to_string(), reason: e.to_string() })
        })
    }
}

impl Transport for IndustrialIoBus {
    fn scan_contexts(&self) -> Result<Vec<IioScanContext>> {
        let found = industrial_io::scan_contexts()
            .map_err(|e| Error::AttributeIo { attribute: "scan_contexts".to_string(), reason: e.to_string() })?;
        Ok(found
            .into_iter()
            .map(|(uri, description)| IioScanContext { uri, description })
            .collect())
    }

    fn open(&self, uri: &str) -> Result<()> {
        let context = Context::with_uri(uri)
            .map_err(|e| Error::DeviceMissing(format!("could not open context '{uri}': {e}")))?;
        *self.current.borrow_mut() = Some(context);
        Ok(())
    }

    fn describe(&self, uri: &str) -> Result<String> {
        let context = Context::with_uri(uri)
            .map_err(|e| Error::DeviceMissing(format!("could not probe context '{uri}': {e}")))?;
        Ok(context.description().to_string())
    }
}

fn find_channel<'a>(device: &'a industrial_io::Device, name: &str) -> Result<industrial_io::Channel<'a>> {
    device
        .find_channel(name, true)
        .or_else(|| device.find_channel(name, false))
        .ok_or_else(|| Error::DeviceMissing(format!("channel '{name}' not found")))
}

fn attribute_io(attribute: &str, error: impl std::fmt::Display) -> Error {
    Error::AttributeIo { attribute: attribute.to_string(), reason: error.to_string() }
}

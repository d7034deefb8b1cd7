//! This module is the boundary with the transport layer
//!
//! The receiver emits context packets (reference level, tuned frequency, sweep
//! start id) ahead of each data packet. Everything upstream of here decodes
//! bytes into packets; we only pair the context with the data it describes.

use crate::complex::IqBlock;

/// The subset of context packet fields the pipeline needs
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContextFields {
    pub reference_level: Option<f64>,
    pub rf_freq_hz: Option<f64>,
    /// Set on the context that opens a new sweep pass
    pub start_id: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    Context(ContextFields),
    Data(IqBlock),
}

/// One data packet with whatever context preceded it
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub iq: IqBlock,
    pub reference_level: Option<f64>,
    pub rf_freq_hz: Option<f64>,
    pub start_id: bool,
}

impl Capture {
    /// A capture with no context at all
    pub fn bare(iq: IqBlock) -> Self {
        Self {
            iq,
            reference_level: None,
            rf_freq_hz: None,
            start_id: false,
        }
    }
}

/// Anything the pipeline can poll for captures. Must not block.
pub trait CaptureSource {
    /// The next complete capture, or `None` if there isn't one yet
    fn read_capture(&mut self) -> Option<Capture>;
}

impl<S: CaptureSource + ?Sized> CaptureSource for &mut S {
    fn read_capture(&mut self) -> Option<Capture> {
        (**self).read_capture()
    }
}

/// Folds context packets into the data packet that follows them
#[derive(Debug, Default)]
pub struct PacketAssembler {
    context: ContextFields,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one packet; yields a capture on every data packet
    pub fn push(&mut self, packet: Packet) -> Option<Capture> {
        match packet {
            Packet::Context(fields) => {
                if fields.reference_level.is_some() {
                    self.context.reference_level = fields.reference_level;
                }
                if fields.rf_freq_hz.is_some() {
                    self.context.rf_freq_hz = fields.rf_freq_hz;
                }
                self.context.start_id |= fields.start_id;
                None
            }
            Packet::Data(iq) => {
                // Context only describes the next data packet
                let ctx = std::mem::take(&mut self.context);
                Some(Capture {
                    iq,
                    reference_level: ctx.reference_level,
                    rf_freq_hz: ctx.rf_freq_hz,
                    start_id: ctx.start_id,
                })
            }
        }
    }
}

/// Pulls packets off a ring buffer filled by a capture thread
pub struct RingSource {
    consumer: rtrb::Consumer<Packet>,
    assembler: PacketAssembler,
}

impl RingSource {
    pub fn new(consumer: rtrb::Consumer<Packet>) -> Self {
        Self {
            consumer,
            assembler: PacketAssembler::new(),
        }
    }
}

impl CaptureSource for RingSource {
    fn read_capture(&mut self) -> Option<Capture> {
        while let Ok(packet) = self.consumer.pop() {
            if let Some(capture) = self.assembler.push(packet) {
                return Some(capture);
            }
        }
        None
    }
}

impl CaptureSource for std::collections::VecDeque<Capture> {
    fn read_capture(&mut self) -> Option<Capture> {
        self.pop_front()
    }
}

// src/display/mod.rs
//! Hand-off of rendered frames to the physical (or simulated) panel.

use std::io;

use log::{error, trace};

use crate::canvas::Canvas;

/// Byte sink for packed frames.
///
/// A frame is `width * height / 8` bytes: byte `x + (y / 8) * width` holds
/// rows `8 * (y / 8)` to `8 * (y / 8) + 7` of column `x`, least significant
/// bit on top.
pub trait DisplayTransport: Send {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()>;
}

impl<T: DisplayTransport + ?Sized> DisplayTransport for Box<T> {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).transmit(frame)
    }
}

/// What [`FrameSink::send`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Transmitted,
    Unchanged,
    Failed,
}

/// Packs canvases and pushes them through a transport.
pub struct FrameSink {
    transport: Box<dyn DisplayTransport>,
    frame: Vec<u8>,
    last_sent: Option<Vec<u8>>,
    skip_unchanged: bool,
}

impl FrameSink {
    pub fn new(transport: Box<dyn DisplayTransport>, skip_unchanged: bool) -> Self {
        Self {
            transport,
            frame: Vec::new(),
            last_sent: None,
            skip_unchanged,
        }
    }

    /// Pack `canvas` and transmit it. Transport errors are logged, not raised.
    pub fn send(&mut self, canvas: &Canvas) -> SendOutcome {
        self.frame.resize(canvas.packed_len(), 0);
        canvas.pack_into(&mut self.frame);

        if self.skip_unchanged && self.last_sent.as_deref() == Some(self.frame.as_slice()) {
            trace!("Frame unchanged; not transmitting");
            return SendOutcome::Unchanged;
        }

        match self.transport.transmit(&self.frame) {
            Ok(()) => {
                if self.skip_unchanged {
                    self.last_sent = Some(self.frame.clone());
                }
                SendOutcome::Transmitted
            }
            Err(err) => {
                error!("Failed to transmit frame: {err}");
                SendOutcome::Failed
            }
        }
    }
}

/// Transport that keeps every frame in memory; used by tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    frames: std::sync::Arc<parking_lot::Mutex<Vec<Vec<u8>>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.frames.lock().last().cloned()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }
}

impl DisplayTransport for MemoryTransport {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        self.frames.lock().push(frame.to_vec());
        Ok(())
    }
}

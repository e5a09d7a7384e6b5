//! Reading and writing runs of back-to-back records.
//!
//! Records are fixed size so a file of them is just concatenated 26-byte
//! blocks; there is no length prefix or checksum.
use std::io::{ErrorKind, Read, Write};

use crate::error::Result;
use crate::record::{PARTICIPANT_POSITION_SIZE, ParticipantPosition};
use crate::registry::PositionRegistry;

/// Decodes consecutive records from `R`, registering each one.
///
/// Stops cleanly at EOF on a record boundary. A short trailing record is
/// reported once as `InvalidPacketSize` and ends the stream, as does any I/O
/// error.
pub struct PositionReader<'r, R, G: ?Sized> {
    inner: R,
    registry: &'r G,
    buf: [u8; PARTICIPANT_POSITION_SIZE],
    done: bool,
}

impl<'r, R: Read, G: PositionRegistry + ?Sized> PositionReader<'r, R, G> {
    pub fn new(inner: R, registry: &'r G) -> Self {
        Self { inner, registry, buf: [0u8; PARTICIPANT_POSITION_SIZE], done: false }
    }

    /// Fill the buffer as far as possible; returns the number of bytes read.
    fn fill(&mut self) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read, G: PositionRegistry + ?Sized> Iterator for PositionReader<'_, R, G> {
    type Item = Result<ParticipantPosition>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let n = match self.fill() {
            Ok(0) => {
                self.done = true;
                return None;
            }
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };
        if n < PARTICIPANT_POSITION_SIZE {
            self.done = true;
        }
        Some(ParticipantPosition::decode(&self.buf[..n], self.registry))
    }
}

/// Appends encoded records to `W`.
pub struct PositionWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> PositionWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write(&mut self, position: &ParticipantPosition) -> Result<()> {
        self.inner.write_all(&position.encode())?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

use std::sync::{Arc, Mutex, MutexGuard};

use crate::encode::codec::{BufferFlags, BufferInfo, OutputFormat};
use crate::encode::container::ContainerWriter;
use crate::foundation::error::{ReelError, ReelResult};

/// One call observed by an [`InMemoryContainer`], in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerEvent {
    AddTrack(usize),
    Start,
    Write {
        track: usize,
        presentation_time_us: u64,
        size: usize,
    },
    Stop,
    Release,
}

/// A sample captured by an [`InMemoryContainer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemorySample {
    pub track: usize,
    pub presentation_time_us: u64,
    pub flags: BufferFlags,
    pub data: Vec<u8>,
}

/// Everything an [`InMemoryContainer`] has seen so far.
#[derive(Clone, Debug, Default)]
pub struct ContainerLog {
    pub tracks: Vec<OutputFormat>,
    pub samples: Vec<MemorySample>,
    pub events: Vec<ContainerEvent>,
    pub started: bool,
    pub stopped: bool,
    pub released: bool,
}

impl ContainerLog {
    /// Presentation time of the last written sample.
    pub fn duration_us(&self) -> u64 {
        self.samples
            .last()
            .map(|s| s.presentation_time_us)
            .unwrap_or(0)
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.samples
            .iter()
            .map(|s| s.presentation_time_us)
            .collect()
    }
}

/// Container writer that keeps everything in memory.
///
/// Clones share the same log, so a test can keep one handle while the session owns another.
/// Enforces the same ordering rules as a real muxer.
#[derive(Clone, Debug, Default)]
pub struct InMemoryContainer {
    log: Arc<Mutex<ContainerLog>>,
}

impl InMemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current log.
    pub fn snapshot(&self) -> ContainerLog {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock(&self) -> ReelResult<MutexGuard<'_, ContainerLog>> {
        self.log
            .lock()
            .map_err(|_| ReelError::container("in-memory container lock poisoned"))
    }
}

impl ContainerWriter for InMemoryContainer {
    fn add_track(&mut self, format: &OutputFormat) -> ReelResult<usize> {
        let mut log = self.lock()?;
        if log.started {
            return Err(ReelError::protocol("add_track called after start"));
        }
        let index = log.tracks.len();
        log.tracks.push(format.clone());
        log.events.push(ContainerEvent::AddTrack(index));
        Ok(index)
    }

    fn start(&mut self) -> ReelResult<()> {
        let mut log = self.lock()?;
        if log.started {
            return Err(ReelError::state("container already started"));
        }
        if log.tracks.is_empty() {
            return Err(ReelError::protocol("container started without tracks"));
        }
        log.started = true;
        log.events.push(ContainerEvent::Start);
        Ok(())
    }

    fn write_sample_data(
        &mut self,
        track: usize,
        data: &[u8],
        info: &BufferInfo,
    ) -> ReelResult<()> {
        let mut log = self.lock()?;
        if !log.started || log.stopped {
            return Err(ReelError::protocol(
                "sample written while container is not running",
            ));
        }
        if track >= log.tracks.len() {
            return Err(ReelError::protocol(format!("unknown track index {track}")));
        }
        log.samples.push(MemorySample {
            track,
            presentation_time_us: info.presentation_time_us,
            flags: info.flags,
            data: data.to_vec(),
        });
        log.events.push(ContainerEvent::Write {
            track,
            presentation_time_us: info.presentation_time_us,
            size: data.len(),
        });
        Ok(())
    }

    fn stop(&mut self) -> ReelResult<()> {
        let mut log = self.lock()?;
        if !log.started || log.stopped {
            return Err(ReelError::state("container stopped while not running"));
        }
        log.stopped = true;
        log.events.push(ContainerEvent::Stop);
        Ok(())
    }

    fn release(&mut self) {
        if let Ok(mut log) = self.log.lock()
            && !log.released
        {
            log.released = true;
            log.events.push(ContainerEvent::Release);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/memory.rs"]
mod tests;

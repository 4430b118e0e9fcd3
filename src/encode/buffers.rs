use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::encode::codec::{BufferInfo, InputSurface};
use crate::foundation::error::{ReelError, ReelResult};
use crate::frame::raster::FrameRGBA;

type FrameQueue = Arc<Mutex<VecDeque<FrameRGBA>>>;

/// Lifecycle of the in-process encoders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Created,
    Configured,
    Started,
    Stopped,
    Released,
}

impl Lifecycle {
    pub(crate) fn require(self, expected: Self, encoder: &str, op: &str) -> ReelResult<()> {
        if self != expected {
            return Err(ReelError::state(format!(
                "{encoder} encoder {op} called in state {self:?}"
            )));
        }
        Ok(())
    }
}

/// Input surface that queues posted canvases for an in-process encoder.
#[derive(Debug)]
pub struct QueueSurface {
    width: u32,
    height: u32,
    queue: FrameQueue,
    locked: bool,
    released: bool,
}

/// Encoder-side end of a [`QueueSurface`].
#[derive(Clone, Debug, Default)]
pub(crate) struct PostedFrames(FrameQueue);

impl PostedFrames {
    pub(crate) fn surface(&self, width: u32, height: u32) -> QueueSurface {
        QueueSurface {
            width,
            height,
            queue: Arc::clone(&self.0),
            locked: false,
            released: false,
        }
    }

    /// Take every frame posted since the last call, oldest first.
    pub(crate) fn take_all(&self) -> ReelResult<Vec<FrameRGBA>> {
        let mut queue = self
            .0
            .lock()
            .map_err(|_| ReelError::encoder("input surface queue lock poisoned"))?;
        Ok(queue.drain(..).collect())
    }
}

impl InputSurface for QueueSurface {
    fn lock_canvas(&mut self) -> ReelResult<FrameRGBA> {
        if self.released {
            return Err(ReelError::state("input surface already released"));
        }
        if self.locked {
            return Err(ReelError::state("input surface canvas is already locked"));
        }
        self.locked = true;
        Ok(FrameRGBA::new(self.width, self.height))
    }

    fn unlock_canvas_and_post(&mut self, canvas: FrameRGBA) -> ReelResult<()> {
        if !self.locked {
            return Err(ReelError::state("input surface canvas was not locked"));
        }
        self.locked = false;
        if canvas.width != self.width || canvas.height != self.height {
            return Err(ReelError::encoder(format!(
                "posted canvas is {}x{}, surface is {}x{}",
                canvas.width, canvas.height, self.width, self.height
            )));
        }
        self.queue
            .lock()
            .map_err(|_| ReelError::encoder("input surface queue lock poisoned"))?
            .push_back(canvas);
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
        self.locked = false;
    }
}

/// Ready output buffers plus the slots of buffers handed out but not yet released.
#[derive(Debug, Default)]
pub(crate) struct OutputQueue {
    ready: VecDeque<(BufferInfo, Vec<u8>)>,
    slots: Vec<Option<Vec<u8>>>,
}

impl OutputQueue {
    pub(crate) fn push(&mut self, info: BufferInfo, data: Vec<u8>) {
        self.ready.push_back((info, data));
    }

    pub(crate) fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Move the oldest ready buffer into a free slot and return its index.
    pub(crate) fn dequeue(&mut self, info: &mut BufferInfo) -> Option<usize> {
        let (ready_info, data) = self.ready.pop_front()?;
        *info = ready_info;
        let index = match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(data);
                free
            }
            None => {
                self.slots.push(Some(data));
                self.slots.len() - 1
            }
        };
        Some(index)
    }

    pub(crate) fn get(&self, index: usize) -> ReelResult<&[u8]> {
        self.slots
            .get(index)
            .and_then(|slot| slot.as_deref())
            .ok_or_else(|| ReelError::state(format!("output buffer {index} is not dequeued")))
    }

    pub(crate) fn release(&mut self, index: usize) -> ReelResult<()> {
        self.slots
            .get_mut(index)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or_else(|| ReelError::state(format!("output buffer {index} is not dequeued")))
    }

    /// Number of buffers handed out and not yet released.
    pub(crate) fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub(crate) fn clear(&mut self) {
        self.ready.clear();
        self.slots.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/buffers.rs"]
mod tests;

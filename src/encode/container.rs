use crate::encode::codec::{BufferInfo, OutputFormat};
use crate::foundation::error::ReelResult;

/// Multiplexer that assembles encoded samples into a container file.
///
/// Lifecycle: created bound to its destination (not started, no tracks) -> `add_track` ->
/// `start` -> `write_sample_data`* -> `stop` -> `release`.
pub trait ContainerWriter {
    /// Register a track for `format`, returning its index. Only valid before `start`.
    fn add_track(&mut self, format: &OutputFormat) -> ReelResult<usize>;

    fn start(&mut self) -> ReelResult<()>;

    /// Write one sample. `data` is exactly the sample's valid bytes; `info.offset` is ignored.
    fn write_sample_data(&mut self, track: usize, data: &[u8], info: &BufferInfo)
    -> ReelResult<()>;

    /// Finalize the container.
    fn stop(&mut self) -> ReelResult<()>;

    fn release(&mut self);
}

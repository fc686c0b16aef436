pub mod queue;
pub mod sink;

pub use queue::{PlaybackHandle, PlaybackItem, PlaybackQueue, PlaybackUpdate};
pub use sink::{AudioSink, RodioSink};

pub mod clip;
pub mod device;
pub mod session;

pub use clip::{AudioChunk, AudioClip, CaptureFormat};
pub use device::{CaptureDevice, CpalDevice};
pub use session::{CaptureSession, CaptureState, ClipOutcome};

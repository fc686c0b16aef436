pub mod backoff;
pub mod channel;
pub mod stream;
pub mod upload;

pub use backoff::BackoffPolicy;
pub use channel::{ConnectionState, TransportChannel, TransportFactory};
pub use stream::StreamChannel;
pub use upload::UploadChannel;

pub mod client;
pub mod logging;
pub mod mock_client;
pub mod stream;

pub use client::{AskClient, ByteStream, StreamSource};
pub use logging::{EventLog, RecordingEventLog, TracingEventLog};
pub use stream::{decode_event, FrameDecoder};

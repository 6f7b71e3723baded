//! Duplex voice relay between a caller and the voice agent backend.

pub mod protocol;
pub mod relay;
pub mod transport;

pub use relay::{run_session, Frame, FrameSink, FrameSource, RelayError, SessionEnd, VoiceSession};
pub use transport::{connect_backend, BackendSink, BackendSource, ClientSink, ClientSource};

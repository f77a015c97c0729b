// Logs module - Log groups, streams, and events as seen by the client

mod event;
mod stream;

pub use event::{EventPage, LogEvent};
pub use stream::{LogGroup, LogStreamInfo, StreamHandle};

pub mod handle;
pub mod mock;
pub mod stream;

pub use handle::StreamHandle;
pub use mock::{MockCommand, MockStream, MockStreamFactory};
pub use stream::{MediaStream, StreamFactory, StreamStatus};

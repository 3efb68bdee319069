pub mod segment;
pub mod session;

pub use segment::{Segment, SegmentTable, SegmentTableError};
pub use session::{LaneRole, SourceRef, SourceSpec, StreamId};

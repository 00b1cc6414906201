//! Capture loop plumbing: sources of raw name batches and the session that
//! feeds them through the batch filter, presence tracker and matcher.

pub mod session;
pub mod source;

pub use session::{
    BatchPipeline, CaptureConfig, CaptureErrorPolicy, CaptureHandle, CaptureSession, TickReport,
};
pub use source::{CaptureSource, FnSource, QueueSource};

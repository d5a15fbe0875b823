//! Signpipe Core - concurrent signing pipeline
//!
//! Items flow through SingleHash → MultiHash → CombineResults over bounded
//! channels, one runner thread per stage and a bounded set of per-item
//! workers. Calls to the rate-limited `hash1` primitive are serialized
//! process-wide by a shared single-permit semaphore (the rate token).

pub mod channel;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod semaphore;
pub mod shutdown;
pub mod signer;
pub mod stages;

// Re-exports for convenience
pub use channel::{EdgeStats, Inbox, Outbox};
pub use error::{Disconnected, PipelineError, SourceError};
pub use logging::{IndicatifLogger, init_logging};
pub use pipeline::{
    DEFAULT_CHANNEL_CAPACITY, FnStage, Pipeline, PipelineConfig, RunReport, Stage, stage_fn,
};
pub use progress::{ProgressContext, SharedProgress};
pub use semaphore::{Semaphore, SemaphoreGuard};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
pub use signer::{DataSigner, Signer, SignerConfig, SigningContext};
pub use stages::{
    CombineResults, DEFAULT_MAX_IN_FLIGHT, MultiHash, SingleHash, bounded_signing_stages,
    signing_stages,
};

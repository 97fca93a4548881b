pub mod cancel;
pub mod compare;
pub mod discovery;
pub mod engine;
pub mod normalize;
pub mod pipeline;
pub mod report;

pub use cancel::CancelToken;
pub use engine::{ReconcileEngine, RunOutcome, RunSummary};
pub use normalize::normalize;
pub use pipeline::ReconcilePipeline;

pub mod annotate;
pub mod cache;
pub mod candidate;
pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod depth;
pub mod error;
pub mod haplotype;
pub mod orchestrator;
pub mod pileup;
pub mod read;
pub mod result;
pub mod writer;

pub use config::Config;
pub use error::{CacheError, CandidateError, CheckpointError, PileupError};
pub use orchestrator::{Mode, Orchestrator, OrchestratorPaths};
pub use result::{DeNovoResult, HaplotypeResult, ReferencePosition, Sample};

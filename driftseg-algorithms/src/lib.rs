//! driftseg-algorithms: Combinatorial segment reconstruction.
//!
//! This crate provides the pattern recognition for drift-tube super-layers:
//! - **Compatibility** - wire-distance admission window between two hits
//! - **Fit gate** - acceptance policy for trial candidates
//! - **Builder** - recursive left/right search with watermark pruning
//! - **Cleaner** - conflict resolution and ghost busting
//! - **Updator** - least-squares fits with time-offset recovery
//!
#![warn(missing_docs)]

mod builder;
mod cleaner;
mod compatibility;
mod config;
mod dedup;
mod gate;
mod processing;
mod reco;
mod updator;

pub use builder::{render_pattern, SegmentSearch, MIN_SEGMENT_HITS};
pub use cleaner::{GhostBusterCleaner, SegmentCleaner};
pub use compatibility::{CompatibilityWindow, MAX_LAYER_DISTANCE};
pub use config::{CleanerConfig, ConflictMode, PatternRecoConfig, ReconstructionConfig};
pub use dedup::is_new_candidate;
pub use gate::FitGate;
pub use processing::{reconstruct_event, reconstruct_event_with_statistics, SuperLayerHits};
pub use reco::{ReconstructionStatistics, SegmentReconstructor};
pub use updator::{FitModel, LinearUpdator, SegmentUpdator, UpdatorConfig};

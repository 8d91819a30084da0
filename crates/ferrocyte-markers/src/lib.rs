//! ferrocyte-markers: Marker feature resolution.
//!
//! Accepts markers in any of three shapes (global set, per-label sets,
//! pairwise sets) or derives them from the reference by pairwise differential
//! comparison, and always produces one canonical [`PairwiseMarkers`] table so
//! scoring never branches on the input shape.

mod de;
mod pairwise;
mod resolver;
mod spec;

pub use de::derive_pairwise_markers;
pub use pairwise::PairwiseMarkers;
pub use resolver::resolve_markers;
pub use spec::MarkerSpec;

//! Intake (wish → Seed) and growth (Seed → fractal Sprout tree).

pub mod autonomy;
pub mod ethics;
pub mod intake;
pub mod lexicon;
pub mod tree;

pub use autonomy::{decide_harvest_compost, AutonomyOutcome, MissionVerdict};
pub use ethics::{gate_sprout, EthicalVerdict};
pub use intake::plant_wish;
pub use tree::grow_tree;

/// The golden ratio, used throughout growth for sibling energy weighting.
pub const PHI: f64 = 1.618_033_988_749_895;

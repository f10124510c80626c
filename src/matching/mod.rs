// matching/ - Similarity scoring and catalog ranking.

pub mod ranking;
pub mod similarity;

pub use ranking::{MatchResult, RankingService};
pub use similarity::{evaluate, score_profile, ProfileMatch};

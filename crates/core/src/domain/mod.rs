pub mod normalize;
pub mod snapshot;

pub use normalize::normalize;
pub use snapshot::AnalysisSnapshot;

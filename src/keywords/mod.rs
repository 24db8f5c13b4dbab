// Keywords module - distress keyword detection
//
// - catalogue: mutable keyword catalogue with variant forms
// - acoustic: distress, emergency and pain predicates on clip features
// - detector: DistressKeywordDetector combining both signals

pub mod acoustic;
mod catalogue;
mod detector;

pub use catalogue::{AddOutcome, KeywordCatalogue, KeywordEntry, KeywordStatistics};
pub use detector::{DistressKeywordDetector, KeywordTestReport};

/*!
# ccstudy
This library evaluates coiled-coil heptad register predictions and uses the most trusted ones to rank alignments of candidate templates against a target.

Key functionality:
* Register equivalence over gapped sequences, with one-letter predictions expanded into full registers
* Consensus voting across prediction methods, with per-method accuracy against either the consensus or a ground-truth method
* Aggregation of normalized alignment score tracks with a peak or a mean strategy

Performance notes:
* Voting compares every pair of predictions on a template, which is cheap for the handful of methods in practice
* Alignment tracks are provided by an `AlignmentSource`, so the cost of alignment itself is outside of this crate

# Example usage
```rust
use ccstudy::alignment_track::PrecomputedAlignments;
use ccstudy::study::{Study, StudySelection};
use ccstudy::study_config::StudyConfig;
use ccstudy::study_data::StudyData;

let data = StudyData::parse("
TARGET seq:MKQLEDKVEELLSKNYHLEN Socket:a Marcoil:a Coils:c
T1 seq:LEDKVEELLSKN Socket:d Marcoil:d Coils:d
", "Paper").unwrap();
let tracks = PrecomputedAlignments::parse("
T1 chain chain 0 2.0
T1 register heptads 0 4.0
T1 register heptads 1 2.0
T1 register charges 1 1.0
").unwrap();

let study = Study::from_data(&data, StudyConfig::default()).unwrap();
let result = study.run(&tracks).unwrap();

// Coils disagrees on the target, so it is right 1 out of 2 times
assert_eq!(result.accuracy().get("Coils").unwrap().hits, 1);
assert_eq!(result.accuracy().get("Socket").unwrap().accuracy, 1.0);

// the default strategy takes the mean over the offsets of the charges track
match result.choose().unwrap() {
    StudySelection::Mean(Some(best)) => {
        assert_eq!(best.template_id(), "T1");
        assert_eq!(best.mean_score(), 1.5);
        assert_eq!(best.best().offset, 1);
    },
    _ => panic!("expected a mean selection")
}
```
*/

/// Score tracks from aligning a candidate against the target, and the sources that provide them
pub mod alignment_track;
/// Main functionality for picking a consensus prediction and scoring methods
pub mod consensus_vote;
/// Utility for generating examples
pub mod example_gen;
/// Heptad register utilities
pub mod register;
/// Selection of the best alignment from normalized tracks
pub mod score_aggregator;
/// Main functionality for running a full study
pub mod study;
/// Configuration for a Study
pub mod study_config;
/// Parsing of study files into templates and predictions
pub mod study_data;
/// Errors raised by this crate
pub mod study_error;
/// Utility for accumulating per-method agreement counts
pub mod tally_tracker;

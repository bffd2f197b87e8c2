/*!
Contains configuration information for a register study.
Typical usage is to the use the builder to construct the config, e.g.
```
use ccstudy::consensus_vote::TallyMode;
use ccstudy::study_config::{MethodPriorities, StudyConfig, StudyConfigBuilder};
let config: StudyConfig = StudyConfigBuilder::default()
    .priorities(MethodPriorities::new(&["Socket", "Marcoil", "Coils"]))
    .tally_mode(TallyMode::GroundTruth("Socket".to_string()))
    .build()
    .unwrap();
assert_eq!(config.target_id, "TARGET");
```
*/

use rustc_hash::FxHashMap as HashMap;

use crate::consensus_vote::TallyMode;

/// The register prediction methods we recognize out of the box, highest priority first.
pub const DEFAULT_METHODS: [&str; 7] = [
    "Socket", "Paper", "Marcoil", "Multicoil", "Paircoil", "Pcoils", "Coils"
];

/// Ranking over prediction method names, used both as the set of recognized methods and for breaking consensus ties.
/// Methods earlier in the ranking have higher priority.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodPriorities {
    /// Method names in priority order
    ranking: Vec<String>,
    /// Reverse lookup from method name to its index in `ranking`
    index: HashMap<String, usize>
}

impl MethodPriorities {
    /// Creates a ranking from method names, highest priority first.
    /// If a name is repeated, its first position is kept.
    /// # Arguments
    /// * `ranking` - the method names in descending priority
    pub fn new<S: AsRef<str>>(ranking: &[S]) -> MethodPriorities {
        let mut ordered: Vec<String> = Vec::with_capacity(ranking.len());
        let mut index: HashMap<String, usize> = Default::default();
        for name in ranking.iter().map(|s| s.as_ref()) {
            if !index.contains_key(name) {
                index.insert(name.to_string(), ordered.len());
                ordered.push(name.to_string());
            }
        }
        MethodPriorities {
            ranking: ordered,
            index
        }
    }

    /// Returns true if the method takes part in voting
    pub fn is_recognized(&self, method: &str) -> bool {
        self.index.contains_key(method)
    }

    /// Returns the priority of a method, larger is better; unrecognized methods get None
    pub fn priority(&self, method: &str) -> Option<usize> {
        self.index.get(method).map(|&i| self.ranking.len() - i)
    }

    /// Returns true if `method` should win a tie against `other`
    pub fn outranks(&self, method: &str, other: &str) -> bool {
        self.priority(method) > self.priority(other)
    }

    pub fn ranking(&self) -> &[String] {
        &self.ranking
    }
}

impl Default for MethodPriorities {
    fn default() -> Self {
        MethodPriorities::new(&DEFAULT_METHODS)
    }
}

/// How `expand_register` treats gap columns in the sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GapPolicy {
    /// Gaps receive the gap symbol and do not advance the heptad cycle
    #[default]
    Skip,
    /// Gaps receive the gap symbol but still advance the heptad cycle by one
    Consume
}

/// Which aggregation the study reports by default.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SelectionStrategy {
    /// Best single combined score over all offsets, reported for both the chain and register track sets
    Peak,
    /// Best mean combined score over the register track set
    #[default]
    Mean
}

/**
Contains configuration information for a register study.
Typical usage is to the use the builder to construct the config, e.g.
```
use ccstudy::study_config::{GapPolicy, StudyConfig, StudyConfigBuilder};
let config: StudyConfig = StudyConfigBuilder::default()
    .gap_policy(GapPolicy::Consume)
    .pad_symbol(b'G')
    .build()
    .unwrap();
```
*/
#[derive(derive_builder::Builder, Clone, Debug)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct StudyConfig {
    /// Recognized methods and their tie-break ranking
    pub priorities: MethodPriorities,
    /// The identifier of the template everything gets aligned against
    pub target_id: String,
    /// Selects the reference prediction used when tallying method accuracy
    pub tally_mode: TallyMode,
    /// Gap handling when a start label gets expanded into a register
    pub gap_policy: GapPolicy,
    /// Residue appended to candidates that are shorter than the target, sequences are ASCII
    pub pad_symbol: u8,
    /// The one input key that carries two values, e.g. "Paper:abc...:ref"
    pub multi_field_key: String,
    /// The track whose offsets form the base domain of the mean strategy
    pub mean_base_track: String,
    /// The aggregation used by `StudyResult::choose`
    pub strategy: SelectionStrategy
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            priorities: Default::default(),
            // the reference chain is always named this in our data files
            target_id: "TARGET".to_string(),
            tally_mode: TallyMode::Consensus,
            gap_policy: GapPolicy::Skip,
            // W is the least likely residue at every heptad position
            pad_symbol: b'W',
            multi_field_key: "Paper".to_string(),
            mean_base_track: "charges".to_string(),
            strategy: SelectionStrategy::Mean
        }
    }
}

impl StudyConfigBuilder {
    /// Checks the fields that have constraints beyond their type
    fn validate(&self) -> Result<(), String> {
        if let Some(pad_symbol) = self.pad_symbol {
            if !pad_symbol.is_ascii_graphic() {
                return Err(format!("pad_symbol must be a printable ASCII residue, got byte {pad_symbol}"));
            }
        }
        if let Some(TallyMode::GroundTruth(method)) = &self.tally_mode {
            let recognized = match &self.priorities {
                Some(priorities) => priorities.is_recognized(method),
                None => MethodPriorities::default().is_recognized(method)
            };
            if !recognized {
                return Err(format!("ground truth method \"{method}\" is not a recognized method"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities() {
        let priorities = MethodPriorities::new(&["A", "B", "C", "A"]);
        assert_eq!(priorities.ranking(), &["A".to_string(), "B".to_string(), "C".to_string()]);
        assert_eq!(priorities.priority("A"), Some(3));
        assert_eq!(priorities.priority("C"), Some(1));
        assert_eq!(priorities.priority("D"), None);
        assert!(priorities.outranks("A", "B"));
        assert!(!priorities.outranks("C", "B"));
        assert!(priorities.outranks("C", "D"));
        assert!(priorities.is_recognized("B"));
        assert!(!priorities.is_recognized("seq"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = StudyConfigBuilder::default()
            .pad_symbol(b'A')
            .build().unwrap();
        assert_eq!(config.pad_symbol, b'A');
        assert_eq!(config.target_id, "TARGET");
        assert_eq!(config.gap_policy, GapPolicy::Skip);
        assert_eq!(config.strategy, SelectionStrategy::Mean);
        assert_eq!(config.tally_mode, TallyMode::Consensus);
        assert_eq!(config.priorities.ranking().len(), DEFAULT_METHODS.len());
    }

    #[test]
    fn test_builder_rejects_pad_symbol() {
        assert!(StudyConfigBuilder::default().pad_symbol(0xC9).build().is_err());
        assert!(StudyConfigBuilder::default().pad_symbol(b' ').build().is_err());
        assert_eq!(StudyConfigBuilder::default().pad_symbol(b'G').build().unwrap().pad_symbol, b'G');
    }

    #[test]
    fn test_builder_rejects_unknown_ground_truth() {
        let err = StudyConfigBuilder::default()
            .tally_mode(TallyMode::GroundTruth("Sockett".to_string()))
            .build().unwrap_err();
        assert!(err.to_string().contains("Sockett"));

        // recognized against the configured ranking, not the default one
        assert!(StudyConfigBuilder::default()
            .priorities(MethodPriorities::new(&["X", "Y"]))
            .tally_mode(TallyMode::GroundTruth("Socket".to_string()))
            .build().is_err());
        assert!(StudyConfigBuilder::default()
            .priorities(MethodPriorities::new(&["X", "Y"]))
            .tally_mode(TallyMode::GroundTruth("Y".to_string()))
            .build().is_ok());
    }
}

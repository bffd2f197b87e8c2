/*!
This module provides the Study, which ties the consensus vote and the alignment scoring together.

A study run will:
1. vote on every template to pick a consensus register and score each prediction method
2. take the consensus register of the target and of each candidate
3. pad candidates that are shorter than the target
4. ask an `AlignmentSource` for the score tracks of each candidate and normalize them

The returned `StudyResult` then selects the best alignment with either aggregation strategy.

# Example usage
```rust
use ccstudy::alignment_track::PrecomputedAlignments;
use ccstudy::study::Study;
use ccstudy::study_config::StudyConfig;
use ccstudy::study_data::StudyData;

let data = StudyData::parse("
TARGET seq:ACDEFGHIK Coils:a Marcoil:a
T1 seq:ACDEFG Coils:b Marcoil:b
", "Paper").unwrap();
let tracks = PrecomputedAlignments::parse("
T1 chain chain 0 4.0
T1 chain chain 1 2.0
T1 register heptads 0 1.0
T1 register charges 0 1.0
").unwrap();

let study = Study::from_data(&data, StudyConfig::default()).unwrap();
let result = study.run(&tracks).unwrap();
assert_eq!(result.accuracy().get("Coils").unwrap().accuracy, 1.0);

let (best_chain, best_register) = result.choose_best().unwrap();
assert_eq!(best_chain.unwrap().offset(), 0);
assert_eq!(best_register.unwrap().score(), 2.0);
```
*/

use itertools::Itertools;
use log::{debug, warn};
use std::path::Path;

use crate::alignment_track::{AlignmentQuery, AlignmentSource, TemplateAlignment};
use crate::consensus_vote::{ConsensusChoice, ConsensusVoter};
use crate::register::{extend_register, GAP_SYMBOL};
use crate::score_aggregator::{select_best_mean, select_best_peak, BestAlignment, MeanAlignment};
use crate::study_config::{SelectionStrategy, StudyConfig};
use crate::study_data::{StudyData, Template};
use crate::study_error::StudyError;
use crate::tally_tracker::AccuracyTable;

/// Right-pads a sequence that is shorter than `target_len` so it reaches `target_len + 1`.
/// Sequences that are already long enough are returned unchanged.
/// # Arguments
/// * `sequence` - the candidate sequence
/// * `target_len` - the length of the target sequence
/// * `pad_symbol` - the ASCII residue appended
/// # Examples
/// ```rust
/// use ccstudy::study::pad_sequence;
/// assert_eq!(pad_sequence("ACD", 5, b'W'), "ACDWWW");
/// assert_eq!(pad_sequence("ACDEF", 5, b'W'), "ACDEF");
/// ```
pub fn pad_sequence(sequence: &str, target_len: usize, pad_symbol: u8) -> String {
    let current = sequence.len();
    if current >= target_len {
        return sequence.to_string();
    }
    let mut padded = String::with_capacity(target_len + 1);
    padded.push_str(sequence);
    padded.extend(std::iter::repeat(pad_symbol as char).take(target_len - current + 1));
    padded
}

/// Which alignment(s) the configured strategy selected
#[derive(Clone, Debug, PartialEq)]
pub enum StudySelection {
    /// Peak strategy over the chain and the register track sets
    Peak {
        chain: Option<BestAlignment>,
        register: Option<BestAlignment>
    },
    /// Mean strategy over the register track set
    Mean(Option<MeanAlignment>)
}

/// Contains the outcome of one study run
#[derive(Clone, Debug)]
pub struct StudyResult {
    /// Per-method accuracy
    accuracy: AccuracyTable,
    /// Consensus choice for each template
    choices: Vec<ConsensusChoice>,
    /// Normalized tracks for each aligned candidate, in template order
    alignments: Vec<(String, TemplateAlignment)>,
    /// Base track for the mean strategy
    mean_base_track: String,
    /// Strategy used by `choose`
    strategy: SelectionStrategy
}

impl StudyResult {
    // Getters
    pub fn accuracy(&self) -> &AccuracyTable {
        &self.accuracy
    }

    pub fn choices(&self) -> &[ConsensusChoice] {
        &self.choices
    }

    pub fn alignments(&self) -> &[(String, TemplateAlignment)] {
        &self.alignments
    }

    pub fn alignment(&self, template_id: &str) -> Option<&TemplateAlignment> {
        self.alignments.iter()
            .find(|(id, _a)| id == template_id)
            .map(|(_id, a)| a)
    }

    /// Selects the best chain alignment and the best register alignment with the peak strategy.
    /// Either is None when there were no candidates to align.
    /// # Errors
    /// * if a candidate has an empty primary track
    pub fn choose_best(&self) -> Result<(Option<BestAlignment>, Option<BestAlignment>), Box<dyn std::error::Error>> {
        let best_chain = select_best_peak(
            self.alignments.iter().map(|(id, a)| (id.as_str(), a.chain()))
        )?;
        let best_register = select_best_peak(
            self.alignments.iter().map(|(id, a)| (id.as_str(), a.register()))
        )?;
        Ok((best_chain, best_register))
    }

    /// Selects the register alignment with the best mean combined score.
    /// # Errors
    /// * if a candidate has an empty base track
    pub fn choose_best_mean(&self) -> Result<Option<MeanAlignment>, Box<dyn std::error::Error>> {
        select_best_mean(
            self.alignments.iter().map(|(id, a)| (id.as_str(), a.register())),
            &self.mean_base_track
        )
    }

    /// Selects the best alignment(s) with the configured strategy
    /// # Errors
    /// * see `choose_best` and `choose_best_mean`
    pub fn choose(&self) -> Result<StudySelection, Box<dyn std::error::Error>> {
        Ok(match self.strategy {
            SelectionStrategy::Peak => {
                let (chain, register) = self.choose_best()?;
                StudySelection::Peak { chain, register }
            },
            SelectionStrategy::Mean => StudySelection::Mean(self.choose_best_mean()?)
        })
    }
}

/// Core utility for evaluating register predictions and aligning candidate templates against the target.
#[derive(Clone, Debug)]
pub struct Study {
    /// All templates, target included
    templates: Vec<Template>,
    /// The config for this study
    config: StudyConfig
}

impl Study {
    /// Creates a study from already built templates
    pub fn new(templates: Vec<Template>, config: StudyConfig) -> Study {
        Study {
            templates,
            config
        }
    }

    /// Creates a study from parsed study records.
    /// # Errors
    /// * if any record has no sequence, or holds a bad start label
    pub fn from_data(data: &StudyData, config: StudyConfig) -> Result<Study, Box<dyn std::error::Error>> {
        let templates = data.iter()
            .map(|(id, record)| Template::from_record(id, record, &config))
            .collect::<Result<Vec<Template>, _>>()?;
        Ok(Study::new(templates, config))
    }

    /// Loads a study file and creates a study from it.
    /// # Errors
    /// * if the file cannot be read or parsed, see also `from_data`
    pub fn from_path(filename: &Path, config: StudyConfig) -> Result<Study, Box<dyn std::error::Error>> {
        let data = StudyData::from_path(filename, &config.multi_field_key)?;
        Study::from_data(&data, config)
    }

    // Getters
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Returns the register of a template's consensus choice
    fn chosen_register<'t>(template: &'t Template, choice: Option<&ConsensusChoice>) -> Option<&'t str> {
        choice.and_then(|c| template.prediction(c.method()))
            .map(|p| p.register())
    }

    /// The core function: votes, then aligns every candidate against the target.
    /// Each run builds all of its results from scratch.
    /// # Arguments
    /// * `source` - the collaborator producing score tracks
    /// # Errors
    /// * if the target template is absent or has no recognized prediction
    /// * if voting fails, see `ConsensusVoter::vote`
    /// * if the alignment source fails for a candidate
    pub fn run<A: AlignmentSource + ?Sized>(&self, source: &A) -> Result<StudyResult, Box<dyn std::error::Error>> {
        let voter = ConsensusVoter::new(self.config.priorities.clone(), self.config.tally_mode.clone());
        let vote = voter.vote(&self.templates)?;
        debug!(
            "Consensus: {}",
            vote.choices().iter().map(|c| format!("{}={}({})", c.template_id(), c.method(), c.agreement())).join(", ")
        );

        let target_id = self.config.target_id.as_str();
        let target = match self.templates.iter().find(|t| t.id() == target_id) {
            Some(t) => t,
            None => return Err(Box::new(StudyError::MissingData {
                template_id: target_id.to_string(),
                field: "template".to_string()
            }))
        };
        let target_register = match Study::chosen_register(target, vote.choice(target_id)) {
            Some(r) => r,
            None => return Err(Box::new(StudyError::MissingData {
                template_id: target_id.to_string(),
                field: "register prediction".to_string()
            }))
        };
        let target_len = target.sequence().len();

        let mut alignments: Vec<(String, TemplateAlignment)> = vec![];
        for template in self.templates.iter().filter(|t| t.id() != target_id) {
            let register = match Study::chosen_register(template, vote.choice(template.id())) {
                Some(r) => r,
                None => {
                    warn!("{}: no recognized register prediction, not aligning", template.id());
                    continue;
                }
            };

            if register.bytes().all(|s| s == GAP_SYMBOL) {
                warn!("{}: register has no heptad labels, not aligning", template.id());
                continue;
            }

            let sequence = pad_sequence(template.sequence(), target_len, self.config.pad_symbol);
            let register = extend_register(register, sequence.len())?;
            let query = AlignmentQuery {
                template_id: template.id(),
                sequence: &sequence,
                register: &register,
                target_sequence: target.sequence(),
                target_register
            };

            let mut alignment = source.align(&query)?;
            alignment.normalize();
            alignments.push((template.id().to_string(), alignment));
        }
        debug!("Aligned {} candidates against {target_id}", alignments.len());

        let (accuracy, choices) = vote.into_parts();
        Ok(StudyResult {
            accuracy,
            choices,
            alignments,
            mean_base_track: self.config.mean_base_track.clone(),
            strategy: self.config.strategy
        })
    }
}

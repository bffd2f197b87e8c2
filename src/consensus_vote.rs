/*!
This module provides the ConsensusVoter, which picks the most agreed-upon register prediction for each template and scores every method against a reference.

# Example usage
```rust
use ccstudy::consensus_vote::{ConsensusVoter, TallyMode};
use ccstudy::study_config::MethodPriorities;
use ccstudy::study_data::{Prediction, Template};

let prediction = |method: &str, register: &str| Prediction::new(method.to_string(), register.to_string(), None);
let templates = [
    Template::new("T1".to_string(), "ACDEFGH".to_string(), vec![
        prediction("Coils", "abcdefg"),
        prediction("Marcoil", "abcdefg"), // agrees with Coils
        prediction("Pcoils", "cdefgab")
    ])
];

let voter = ConsensusVoter::new(MethodPriorities::new(&["Marcoil", "Coils", "Pcoils"]), TallyMode::Consensus);
let result = voter.vote(&templates).unwrap();

// Coils and Marcoil tie on agreement, Marcoil has the higher priority
assert_eq!(result.choices()[0].method(), "Marcoil");
assert_eq!(result.choices()[0].agreement(), 1);
assert_eq!(result.accuracy().get("Pcoils").unwrap().hits, 0);
```
*/

use log::{debug, trace, warn};

use crate::register::same_register;
use crate::study_config::MethodPriorities;
use crate::study_data::{Prediction, Template};
use crate::tally_tracker::{AccuracyTable, TallyTracker};

/// Selects which prediction each method gets compared against when tallying accuracy.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TallyMode {
    /// Compare against the consensus winner of each template
    #[default]
    Consensus,
    /// Compare against the named method wherever it has a prediction, otherwise against the consensus winner
    GroundTruth(String)
}

impl TallyMode {
    /// Returns the method whose prediction is the reference for this template.
    /// # Arguments
    /// * `template` - the template being tallied
    /// * `choice` - the consensus winner of the template
    pub fn reference_method<'a>(&'a self, template: &Template, choice: &'a ConsensusChoice) -> &'a str {
        match self {
            TallyMode::GroundTruth(method) if template.prediction(method).is_some() => method,
            _ => choice.method()
        }
    }
}

/// The consensus winner for one template
#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusChoice {
    /// The template this choice belongs to
    template_id: String,
    /// The winning method
    method: String,
    /// Number of other methods that agree with the winner
    agreement: usize
}

impl ConsensusChoice {
    /// Constructor
    pub fn new(template_id: String, method: String, agreement: usize) -> ConsensusChoice {
        ConsensusChoice {
            template_id,
            method,
            agreement
        }
    }

    // Getters
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn agreement(&self) -> usize {
        self.agreement
    }
}

/// Contains the result of a vote: one choice per template with at least one recognized prediction, and the accuracy of each method.
#[derive(Clone, Debug, PartialEq)]
pub struct VoteResult {
    /// Per-method accuracy relative to the tally reference
    accuracy: AccuracyTable,
    /// Consensus choices, in template order
    choices: Vec<ConsensusChoice>
}

impl VoteResult {
    // Getters
    pub fn accuracy(&self) -> &AccuracyTable {
        &self.accuracy
    }

    pub fn choices(&self) -> &[ConsensusChoice] {
        &self.choices
    }

    /// Returns the choice for a template, if it had any recognized predictions
    pub fn choice(&self, template_id: &str) -> Option<&ConsensusChoice> {
        self.choices.iter().find(|c| c.template_id == template_id)
    }

    /// Splits the result into the accuracy table and the choices
    pub fn into_parts(self) -> (AccuracyTable, Vec<ConsensusChoice>) {
        (self.accuracy, self.choices)
    }
}

/// Core utility that ranks prediction methods by how often they agree with each other.
#[derive(Clone, Debug, Default)]
pub struct ConsensusVoter {
    /// The recognized methods and their tie-break order
    priorities: MethodPriorities,
    /// The tally reference selection
    mode: TallyMode
}

impl ConsensusVoter {
    /// Creates a new voter.
    /// # Arguments
    /// * `priorities` - recognized methods, highest priority first; other methods are ignored
    /// * `mode` - how the tally reference gets selected
    pub fn new(priorities: MethodPriorities, mode: TallyMode) -> ConsensusVoter {
        if let TallyMode::GroundTruth(method) = &mode {
            if !priorities.is_recognized(method) {
                warn!("Ground truth method {method} is not recognized, every template falls back to its consensus");
            }
        }
        ConsensusVoter {
            priorities,
            mode
        }
    }

    /// Returns the predictions of a template that take part in the vote
    pub fn sources<'t>(&self, template: &'t Template) -> Vec<&'t Prediction> {
        template.predictions().iter()
            .filter(|p| {
                let recognized = self.priorities.is_recognized(p.method());
                if !recognized {
                    trace!("{}: ignoring method {}", template.id(), p.method());
                }
                recognized
            })
            .collect()
    }

    /// Counts, for every source of a template, how many other sources predict the same register.
    /// # Arguments
    /// * `template` - the template to count on
    /// # Errors
    /// * if any two registers cannot be compared over the template sequence
    pub fn agreement_counts<'t>(&self, template: &'t Template) -> Result<Vec<(&'t Prediction, usize)>, Box<dyn std::error::Error>> {
        let sources = self.sources(template);
        let mut counts: Vec<(&Prediction, usize)> = Vec::with_capacity(sources.len());
        for (i, &prediction) in sources.iter().enumerate() {
            let mut agreement = 0;
            for (j, other) in sources.iter().enumerate() {
                if i != j && same_register(prediction.register(), other.register(), template.sequence())? {
                    agreement += 1;
                }
            }
            counts.push((prediction, agreement));
        }
        Ok(counts)
    }

    /// Picks the consensus winner of a template: maximum agreement, ties go to the higher priority.
    /// Returns None if the template has no recognized predictions.
    /// # Arguments
    /// * `template` - the template to choose on
    /// # Errors
    /// * if any two registers cannot be compared over the template sequence
    pub fn choose(&self, template: &Template) -> Result<Option<ConsensusChoice>, Box<dyn std::error::Error>> {
        let counts = self.agreement_counts(template)?;
        let mut best: Option<(&Prediction, usize)> = None;
        for (prediction, agreement) in counts.into_iter() {
            best = match best {
                Some((best_prediction, best_agreement)) if
                    best_agreement > agreement ||
                    (best_agreement == agreement && !self.priorities.outranks(prediction.method(), best_prediction.method())) => {
                    Some((best_prediction, best_agreement))
                },
                _ => Some((prediction, agreement))
            };
        }

        Ok(best.map(|(prediction, agreement)| {
            trace!("{}: consensus {} with {} agreeing", template.id(), prediction.method(), agreement);
            ConsensusChoice::new(template.id().to_string(), prediction.method().to_string(), agreement)
        }))
    }

    /// The core function, picks a consensus per template and then tallies every method against the reference selected by the mode.
    /// # Arguments
    /// * `templates` - all the templates of the study
    /// # Errors
    /// * if any two registers of a template cannot be compared over its sequence
    pub fn vote(&self, templates: &[Template]) -> Result<VoteResult, Box<dyn std::error::Error>> {
        // choices are fixed before any tallying happens
        let mut choices: Vec<ConsensusChoice> = Vec::with_capacity(templates.len());
        let mut chosen: Vec<(&Template, usize)> = Vec::with_capacity(templates.len());
        for template in templates.iter() {
            match self.choose(template)? {
                Some(choice) => {
                    chosen.push((template, choices.len()));
                    choices.push(choice);
                },
                None => debug!("{}: no recognized predictions, skipping", template.id())
            }
        }

        let mut tracker = TallyTracker::new();
        for &(template, choice_index) in chosen.iter() {
            let reference_method = self.mode.reference_method(template, &choices[choice_index]);
            // the reference always comes from this template, either the winner or the ground truth
            let reference = match template.prediction(reference_method) {
                Some(p) => p.register(),
                None => continue
            };
            for prediction in self.sources(template).into_iter() {
                let is_hit = same_register(prediction.register(), reference, template.sequence())?;
                tracker.record(prediction.method(), is_hit);
            }
        }

        let accuracy = tracker.into_table();
        debug!("Vote finished: {} choices, {} methods scored", choices.len(), accuracy.len());
        Ok(VoteResult {
            accuracy,
            choices
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study_error::StudyError;

    fn prediction(method: &str, register: &str) -> Prediction {
        Prediction::new(method.to_string(), register.to_string(), None)
    }

    fn template(id: &str, sequence: &str, predictions: &[(&str, &str)]) -> Template {
        Template::new(
            id.to_string(),
            sequence.to_string(),
            predictions.iter().map(|&(m, r)| prediction(m, r)).collect()
        )
    }

    #[test]
    fn test_two_template_scenario() {
        let templates = [
            template("TARGET", "ACDEFGH", &[("X", "abcdefg")]),
            template("T1", "ACDE", &[("X", "abcd"), ("Y", "abcx")])
        ];
        let voter = ConsensusVoter::new(MethodPriorities::new(&["X", "Y"]), TallyMode::Consensus);

        // one comparator each, and they disagree
        let counts = voter.agreement_counts(&templates[1]).unwrap();
        assert_eq!(counts.iter().map(|(p, c)| (p.method(), *c)).collect::<Vec<_>>(), vec![("X", 0), ("Y", 0)]);

        let result = voter.vote(&templates).unwrap();
        assert_eq!(result.choices(), &[
            ConsensusChoice::new("TARGET".to_string(), "X".to_string(), 0),
            ConsensusChoice::new("T1".to_string(), "X".to_string(), 0)
        ]);

        let accuracy = result.accuracy();
        let x = accuracy.get("X").unwrap();
        assert_eq!((x.hits, x.tries), (2, 2));
        let y = accuracy.get("Y").unwrap();
        assert_eq!((y.hits, y.tries), (0, 1));
        assert_eq!(y.accuracy, 0.0);
    }

    #[test]
    fn test_priority_breaks_ties() {
        let t = template("T1", "ACDEFGH", &[("X", "abcdefg"), ("Y", "abcx---")]);
        let voter = ConsensusVoter::new(MethodPriorities::new(&["Y", "X"]), TallyMode::Consensus);
        assert_eq!(voter.choose(&t).unwrap().unwrap().method(), "Y");

        // flipping the ranking flips the winner
        let voter = ConsensusVoter::new(MethodPriorities::new(&["X", "Y"]), TallyMode::Consensus);
        assert_eq!(voter.choose(&t).unwrap().unwrap().method(), "X");
    }

    #[test]
    fn test_majority_beats_priority() {
        // A and B agree, C is the top priority but disagrees with both
        let t = template("T1", "ACDEFGH", &[("A", "abcdefg"), ("B", "abcdefg"), ("C", "gabcdef")]);
        for ranking in [["C", "A", "B"], ["C", "B", "A"], ["A", "B", "C"], ["B", "C", "A"]] {
            let voter = ConsensusVoter::new(MethodPriorities::new(&ranking), TallyMode::Consensus);
            let choice = voter.choose(&t).unwrap().unwrap();
            assert_ne!(choice.method(), "C");
            assert_eq!(choice.agreement(), 1);
            // of the agreeing two, the ranking decides
            let expected = ranking.iter().find(|&&m| m != "C").unwrap();
            assert_eq!(choice.method(), *expected);
        }
    }

    #[test]
    fn test_unknown_methods_ignored() {
        let t = template("T1", "ACDEFGH", &[("A", "abcdefg"), ("Junk", "abcdefg"), ("Other", "abcdefg")]);
        let voter = ConsensusVoter::new(MethodPriorities::new(&["A", "B"]), TallyMode::Consensus);
        let result = voter.vote(&[t]).unwrap();
        assert_eq!(result.choices()[0].agreement(), 0);
        assert_eq!(result.accuracy().len(), 1);
        assert!(result.accuracy().get("Junk").is_none());
        // B is recognized but never present, so it has no row at all
        assert!(result.accuracy().get("B").is_none());
    }

    #[test]
    fn test_no_sources() {
        let t = template("T1", "ACDEFGH", &[("Junk", "abcdefg")]);
        let voter = ConsensusVoter::new(MethodPriorities::new(&["A"]), TallyMode::Consensus);
        assert!(voter.choose(&t).unwrap().is_none());
        let result = voter.vote(&[t]).unwrap();
        assert!(result.choices().is_empty());
        assert!(result.accuracy().is_empty());
    }

    #[test]
    fn test_accuracy_is_ratio() {
        let templates = [
            template("T1", "ACDEFGH", &[("A", "abcdefg"), ("B", "abcdefg"), ("C", "gabcdef")]),
            template("T2", "ACDEFGH", &[("A", "abcdefg"), ("B", "bcdefga"), ("C", "bcdefga")]),
            template("T3", "ACDEFGH", &[("A", "cdefgab"), ("C", "cdefgab")])
        ];
        let voter = ConsensusVoter::new(MethodPriorities::new(&["A", "B", "C"]), TallyMode::Consensus);
        let result = voter.vote(&templates).unwrap();
        let winners: Vec<&str> = result.choices().iter().map(|c| c.method()).collect();
        assert_eq!(winners, vec!["A", "B", "A"]);

        for entry in result.accuracy().entries() {
            assert!(entry.tries > 0);
            assert_eq!(entry.accuracy, entry.hits as f64 / entry.tries as f64);
        }
        let a = result.accuracy().get("A").unwrap();
        assert_eq!((a.hits, a.tries), (2, 3));
        let b = result.accuracy().get("B").unwrap();
        assert_eq!((b.hits, b.tries), (2, 2));
        let c = result.accuracy().get("C").unwrap();
        assert_eq!((c.hits, c.tries), (2, 3));
    }

    #[test]
    fn test_ground_truth_mode() {
        let templates = [
            // Socket is the odd one out, consensus would be A
            template("T1", "ACDEFGH", &[("A", "abcdefg"), ("B", "abcdefg"), ("Socket", "gabcdef")]),
            // no Socket here, falls back to the consensus (A by priority)
            template("T2", "ACDEFGH", &[("A", "abcdefg"), ("B", "bcdefga")])
        ];
        let priorities = MethodPriorities::new(&["A", "B", "Socket"]);

        let consensus = ConsensusVoter::new(priorities.clone(), TallyMode::Consensus)
            .vote(&templates).unwrap();
        let truth = ConsensusVoter::new(priorities, TallyMode::GroundTruth("Socket".to_string()))
            .vote(&templates).unwrap();

        // choices do not depend on the mode
        assert_eq!(consensus.choices(), truth.choices());

        let a = consensus.accuracy().get("A").unwrap();
        assert_eq!((a.hits, a.tries), (2, 2));
        let socket = consensus.accuracy().get("Socket").unwrap();
        assert_eq!((socket.hits, socket.tries), (0, 1));

        let a = truth.accuracy().get("A").unwrap();
        assert_eq!((a.hits, a.tries), (1, 2));
        let b = truth.accuracy().get("B").unwrap();
        assert_eq!((b.hits, b.tries), (0, 2));
        let socket = truth.accuracy().get("Socket").unwrap();
        assert_eq!((socket.hits, socket.tries), (1, 1));
    }

    #[test_log::test]
    fn test_unrecognized_ground_truth_falls_back() {
        let templates = [
            template("T1", "ACDEFGH", &[("A", "abcdefg"), ("B", "abcdefg"), ("C", "gabcdef")])
        ];
        let priorities = MethodPriorities::new(&["A", "B", "C"]);
        let consensus = ConsensusVoter::new(priorities.clone(), TallyMode::Consensus)
            .vote(&templates).unwrap();
        let misspelled = ConsensusVoter::new(priorities, TallyMode::GroundTruth("Sockett".to_string()))
            .vote(&templates).unwrap();
        assert_eq!(consensus, misspelled);
    }

    #[test]
    fn test_reference_method() {
        let t = template("T1", "ACD", &[("A", "abc")]);
        let choice = ConsensusChoice::new("T1".to_string(), "A".to_string(), 0);
        assert_eq!(TallyMode::Consensus.reference_method(&t, &choice), "A");
        assert_eq!(TallyMode::GroundTruth("A".to_string()).reference_method(&t, &choice), "A");
        assert_eq!(TallyMode::GroundTruth("Socket".to_string()).reference_method(&t, &choice), "A");
    }

    #[test]
    fn test_gaps_do_not_vote() {
        // the only difference is on the gap column
        let t = template("T1", "AC-EFGH", &[("A", "ab-defg"), ("B", "abzdefg")]);
        let voter = ConsensusVoter::new(MethodPriorities::new(&["B", "A"]), TallyMode::Consensus);
        let choice = voter.choose(&t).unwrap().unwrap();
        assert_eq!(choice.method(), "B");
        assert_eq!(choice.agreement(), 1);
    }

    #[test]
    fn test_length_mismatch() {
        let t = template("T1", "ACDEFGH", &[("A", "abcdefg"), ("B", "abc")]);
        let voter = ConsensusVoter::new(MethodPriorities::new(&["A", "B"]), TallyMode::Consensus);
        let err = voter.vote(&[t]).unwrap_err();
        assert!(matches!(err.downcast_ref::<StudyError>(), Some(StudyError::LengthMismatch { register_len: 3, required_len: 7 })));
    }
}

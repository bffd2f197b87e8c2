use rand::distributions::Uniform;
use rand::{Rng, SeedableRng};

use crate::alignment_track::{AlignmentTrack, PrecomputedAlignments, TemplateAlignment, TrackSet, CHAIN_TRACK, CHARGES_TRACK, HEPTADS_TRACK, RES_LIKE_TRACK};
use crate::register::HEPTAD_LABELS;
use crate::study_config::DEFAULT_METHODS;
use crate::study_data::{Prediction, Template};

/// Residues used for synthetic sequences
const RESIDUES: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Builds a full register of `len` labels starting from label index `start`
fn cycle_register(start: usize, len: usize) -> String {
    (0..len)
        .map(|i| HEPTAD_LABELS[(start + i) % HEPTAD_LABELS.len()] as char)
        .collect()
}

/// Creates a synthetic study we can verify is working.
/// The first template is "TARGET", the rest are named "T0", "T1", ...
/// Every template has a true register start, and each of the default methods reports it correctly with probability `1 - error_rate`.
/// Every candidate gets a chain track set and a register track set with `num_offsets` offsets.
/// # Arguments
/// * `seq_len` - the length of the target sequence, candidates range from half to 1.5x of this
/// * `num_templates` - the number of candidate templates, the target is added on top
/// * `num_offsets` - the number of scored offsets per track
/// * `error_rate` - the chance that a method reports a wrong register start
pub fn generate_study(seq_len: usize, num_templates: usize, num_offsets: usize, error_rate: f64) -> (Vec<Template>, PrecomputedAlignments) {
    assert!(seq_len > 1);
    assert!((0.0..=1.0).contains(&error_rate));

    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let residue_distribution = Uniform::new(0, RESIDUES.len());
    let label_distribution = Uniform::new(0, HEPTAD_LABELS.len());
    let labelm1_distribution = Uniform::new(1, HEPTAD_LABELS.len());
    let length_distribution = Uniform::new_inclusive(seq_len / 2, seq_len + seq_len / 2);
    let error_distribution = Uniform::new(0.0, 1.0);
    let score_distribution = Uniform::new(-1.0, 10.0);

    let mut templates = Vec::with_capacity(num_templates + 1);
    let mut alignments = PrecomputedAlignments::new();
    for t in 0..=num_templates {
        let (template_id, len) = if t == 0 {
            ("TARGET".to_string(), seq_len)
        } else {
            (format!("T{}", t - 1), rng.sample(length_distribution).max(1))
        };

        let sequence: String = (0..len)
            .map(|_i| RESIDUES[rng.sample(residue_distribution)] as char)
            .collect();

        let true_start = rng.sample(label_distribution);
        let predictions: Vec<Prediction> = DEFAULT_METHODS.iter()
            .map(|&method| {
                let is_error = rng.sample(error_distribution) < error_rate;
                let start = if is_error {
                    // any label other than the true one
                    (true_start + rng.sample(labelm1_distribution)) % HEPTAD_LABELS.len()
                } else {
                    true_start
                };
                Prediction::new(method.to_string(), cycle_register(start, len), None)
            })
            .collect();

        if t > 0 {
            let mut random_track = || {
                let pairs: Vec<(f64, i64)> = (0..num_offsets)
                    .map(|o| (rng.sample(score_distribution), o as i64))
                    .collect();
                AlignmentTrack::from_pairs(&pairs)
            };

            let mut chain = TrackSet::new(CHAIN_TRACK);
            chain.insert(CHAIN_TRACK, random_track());
            let mut register = TrackSet::new(HEPTADS_TRACK);
            for name in [HEPTADS_TRACK, CHARGES_TRACK, RES_LIKE_TRACK] {
                register.insert(name, random_track());
            }
            alignments.insert(&template_id, TemplateAlignment::new(chain, register));
        }

        templates.push(Template::new(template_id, sequence, predictions));
    }

    (templates, alignments)
}

/*!
Selection of the best alignment from the per-offset score tracks of every candidate template.

Two strategies are provided:
* `select_best_peak` - the single best combined score over the primary track offsets of every template
* `select_best_mean` - the template with the best average combined score, reported at its own peak offset

Ordering rules, shared by both strategies:
* scores are compared with `f64::total_cmp`
* equal scores at different offsets go to the **lower** offset
* equal results across templates go to the lexicographically smaller template id

# Example usage
```rust
use ccstudy::alignment_track::{AlignmentTrack, TrackSet};
use ccstudy::score_aggregator::{select_best_mean, select_best_peak};

let mut tracks = TrackSet::new("heptads");
for name in ["heptads", "charges", "res_like"] {
    tracks.insert(name, AlignmentTrack::from_pairs(&[(1.0, 0), (2.0, 1)]));
}

let peak = select_best_peak([("1ABC", &tracks)]).unwrap().unwrap();
assert_eq!((peak.template_id(), peak.score(), peak.offset()), ("1ABC", 6.0, 1));

let mean = select_best_mean([("1ABC", &tracks)], "charges").unwrap().unwrap();
assert_eq!(mean.mean_score(), 4.5);
assert_eq!(mean.best().offset, 1);
```
*/

use log::{debug, trace};
use std::cmp::Ordering;

use crate::alignment_track::{ScoredOffset, TrackSet};
use crate::study_error::StudyError;

/// The winning alignment of the peak strategy
#[derive(Clone, Debug, PartialEq)]
pub struct BestAlignment {
    /// The candidate template
    template_id: String,
    /// Combined score at `offset`
    score: f64,
    /// The alignment offset
    offset: i64
}

impl BestAlignment {
    /// Constructor
    pub fn new(template_id: String, score: f64, offset: i64) -> BestAlignment {
        BestAlignment {
            template_id,
            score,
            offset
        }
    }

    // Getters
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

/// The winning template of the mean strategy
#[derive(Clone, Debug, PartialEq)]
pub struct MeanAlignment {
    /// The candidate template
    template_id: String,
    /// Average combined score over all base offsets of the template
    mean_score: f64,
    /// The peak combined score within the template, used as its representative position
    best: ScoredOffset
}

impl MeanAlignment {
    /// Constructor
    pub fn new(template_id: String, mean_score: f64, best: ScoredOffset) -> MeanAlignment {
        MeanAlignment {
            template_id,
            mean_score,
            best
        }
    }

    // Getters
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn mean_score(&self) -> f64 {
        self.mean_score
    }

    pub fn best(&self) -> ScoredOffset {
        self.best
    }
}

/// Orders two points so that the better one is `Greater`: higher score first, then lower offset.
pub fn compare_points(p1: &ScoredOffset, p2: &ScoredOffset) -> Ordering {
    p1.score.total_cmp(&p2.score)
        .then_with(|| p2.offset.cmp(&p1.offset))
}

/// Returns the best point of a list, see `compare_points`
pub fn peak(points: &[ScoredOffset]) -> Option<ScoredOffset> {
    points.iter()
        .copied()
        .max_by(compare_points)
}

/// Returns the combined scores over the `base` track of a template.
/// # Errors
/// * if the template has no `base` track, or it has no offsets
fn required_combined(template_id: &str, tracks: &TrackSet, base: &str) -> Result<Vec<ScoredOffset>, StudyError> {
    match tracks.combined_scores(base) {
        Some(combined) if !combined.is_empty() => Ok(combined),
        _ => Err(StudyError::EmptyTrack {
            template_id: template_id.to_string(),
            track: base.to_string()
        })
    }
}

/// Returns the best combined score of one template over the offsets of its primary track.
/// # Arguments
/// * `template_id` - used for error reporting
/// * `tracks` - the template's tracks
/// # Errors
/// * if the primary track is missing or empty
pub fn local_peak(template_id: &str, tracks: &TrackSet) -> Result<ScoredOffset, Box<dyn std::error::Error>> {
    let combined = required_combined(template_id, tracks, tracks.primary_name())?;
    // non-empty is guaranteed above
    let best = peak(&combined).ok_or_else(|| StudyError::EmptyTrack {
        template_id: template_id.to_string(),
        track: tracks.primary_name().to_string()
    })?;
    trace!("{template_id}: local peak {} at {}", best.score, best.offset);
    Ok(best)
}

/// Selects the best alignment over all templates with the peak strategy.
/// Each template contributes its best combined score over the offsets of its primary track.
/// Returns None when there are no templates.
/// # Arguments
/// * `templates` - (template id, track set) for each candidate
/// # Errors
/// * if any template has a missing or empty primary track
pub fn select_best_peak<'a, I>(templates: I) -> Result<Option<BestAlignment>, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = (&'a str, &'a TrackSet)>
{
    let mut best: Option<(&str, ScoredOffset)> = None;
    for (template_id, tracks) in templates.into_iter() {
        let local = local_peak(template_id, tracks)?;
        let is_better = match best {
            None => true,
            Some((best_id, best_point)) => compare_points(&local, &best_point)
                .then_with(|| best_id.cmp(template_id))
                .is_gt()
        };
        if is_better {
            best = Some((template_id, local));
        }
    }

    let result = best.map(|(template_id, point)| BestAlignment::new(template_id.to_string(), point.score, point.offset));
    debug!("Best peak alignment: {result:?}");
    Ok(result)
}

/// Selects the best template by its mean combined score.
/// For each template the offsets of the `base` track form the domain, the mean is sum / count over that domain.
/// The winner is reported together with its own peak offset.
/// Returns None when there are no templates.
/// # Arguments
/// * `templates` - (template id, track set) for each candidate
/// * `base` - the name of the track whose offsets are enumerated
/// # Errors
/// * if any template has a missing or empty `base` track
pub fn select_best_mean<'a, I>(templates: I, base: &str) -> Result<Option<MeanAlignment>, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = (&'a str, &'a TrackSet)>
{
    let mut best: Option<(&str, f64, Vec<ScoredOffset>)> = None;
    for (template_id, tracks) in templates.into_iter() {
        let combined = required_combined(template_id, tracks, base)?;
        let total: f64 = combined.iter().map(|p| p.score).sum();
        let mean = total / combined.len() as f64;
        trace!("{template_id}: mean {mean} over {} offsets", combined.len());

        let is_better = match &best {
            None => true,
            Some((best_id, best_mean, _c)) => mean.total_cmp(best_mean)
                .then_with(|| best_id.cmp(&template_id))
                .is_gt()
        };
        if is_better {
            best = Some((template_id, mean, combined));
        }
    }

    let result = best.and_then(|(template_id, mean, combined)| {
        peak(&combined).map(|point| MeanAlignment::new(template_id.to_string(), mean, point))
    });
    debug!("Best mean alignment: {result:?}");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_track::{AlignmentTrack, CHAIN_TRACK, CHARGES_TRACK, HEPTADS_TRACK, RES_LIKE_TRACK};

    fn register_set(heptads: &[(f64, i64)], charges: &[(f64, i64)], res_like: &[(f64, i64)]) -> TrackSet {
        let mut tracks = TrackSet::new(HEPTADS_TRACK);
        tracks.insert(HEPTADS_TRACK, AlignmentTrack::from_pairs(heptads));
        tracks.insert(CHARGES_TRACK, AlignmentTrack::from_pairs(charges));
        tracks.insert(RES_LIKE_TRACK, AlignmentTrack::from_pairs(res_like));
        tracks
    }

    #[test]
    fn test_three_equal_tracks() {
        let pairs = [(1.0, 0), (2.0, 1)];
        let tracks = register_set(&pairs, &pairs, &pairs);

        let best = select_best_peak([("T1", &tracks)]).unwrap().unwrap();
        assert_eq!(best, BestAlignment::new("T1".to_string(), 6.0, 1));

        let mean = select_best_mean([("T1", &tracks)], CHARGES_TRACK).unwrap().unwrap();
        assert_eq!(mean, MeanAlignment::new("T1".to_string(), 4.5, ScoredOffset::new(6.0, 1)));
    }

    #[test]
    fn test_offset_tie_goes_low() {
        let tracks = register_set(&[(1.0, 5), (1.0, -3), (1.0, 2)], &[], &[]);
        let best = select_best_peak([("T1", &tracks)]).unwrap().unwrap();
        assert_eq!(best.offset(), -3);
        assert_eq!(peak(&[ScoredOffset::new(2.0, 4), ScoredOffset::new(2.0, 1)]), Some(ScoredOffset::new(2.0, 1)));
        assert_eq!(peak(&[]), None);
    }

    #[test]
    fn test_template_tie_goes_to_smaller_id() {
        let pairs = [(0.5, 0), (0.75, 1)];
        let tracks = register_set(&pairs, &[], &[]);
        let same = tracks.clone();
        let best = select_best_peak([("T2", &tracks), ("T1", &same)]).unwrap().unwrap();
        assert_eq!(best.template_id(), "T1");
        let best = select_best_peak([("T1", &tracks), ("T2", &same)]).unwrap().unwrap();
        assert_eq!(best.template_id(), "T1");

        let charges = register_set(&[], &pairs, &[]);
        let charges_same = charges.clone();
        let mean = select_best_mean([("B", &charges), ("A", &charges_same)], CHARGES_TRACK).unwrap().unwrap();
        assert_eq!(mean.template_id(), "A");
    }

    #[test]
    fn test_peak_across_templates() {
        let t1 = register_set(&[(0.9, 0), (0.1, 1)], &[(0.1, 0)], &[(0.1, 1)]);
        // lower primary peak, but the secondaries push offset 2 past T1
        let t2 = register_set(&[(0.5, 2), (0.2, 3)], &[(0.4, 2)], &[(0.3, 2), (0.9, 7)]);
        let best = select_best_peak([("T1", &t1), ("T2", &t2)]).unwrap().unwrap();
        assert_eq!(best.template_id(), "T2");
        assert_eq!(best.offset(), 2);
        assert!((best.score() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_peak_vs_mean_disagree() {
        // T1 has one sharp peak, T2 is consistently good
        let t1 = register_set(&[], &[(3.0, 0), (0.0, 1), (0.0, 2)], &[]);
        let t2 = register_set(&[], &[(1.5, 0), (1.5, 1), (1.5, 2)], &[]);
        let mean = select_best_mean([("T1", &t1), ("T2", &t2)], CHARGES_TRACK).unwrap().unwrap();
        assert_eq!(mean.template_id(), "T2");
        assert_eq!(mean.mean_score(), 1.5);
        assert_eq!(mean.best(), ScoredOffset::new(1.5, 0));

        let mut t1_peak = t1.clone();
        t1_peak.insert(HEPTADS_TRACK, AlignmentTrack::from_pairs(&[(0.0, 0), (0.0, 1), (0.0, 2)]));
        let mut t2_peak = t2.clone();
        t2_peak.insert(HEPTADS_TRACK, AlignmentTrack::from_pairs(&[(0.0, 0), (0.0, 1), (0.0, 2)]));
        let best = select_best_peak([("T1", &t1_peak), ("T2", &t2_peak)]).unwrap().unwrap();
        assert_eq!(best, BestAlignment::new("T1".to_string(), 3.0, 0));
    }

    #[test]
    fn test_mean_is_sum_over_count() {
        let tracks = register_set(&[(0.2, 1), (0.4, 9)], &[(0.1, 0), (0.3, 1), (0.5, 2), (0.7, 3)], &[(1.0, 3)]);
        let mean = select_best_mean([("T1", &tracks)], CHARGES_TRACK).unwrap().unwrap();
        let combined = tracks.combined_scores(CHARGES_TRACK).unwrap();
        let expected = combined.iter().map(|p| p.score).sum::<f64>() / 4.0;
        assert_eq!(mean.mean_score(), expected);
        // offset 9 is not part of the charges domain
        assert_eq!(combined.len(), 4);
        assert_eq!(mean.best().offset, 3);
    }

    #[test]
    fn test_empty_inputs() {
        let none: [(&str, &TrackSet); 0] = [];
        assert_eq!(select_best_peak(none).unwrap(), None);
        assert_eq!(select_best_mean(none, CHARGES_TRACK).unwrap(), None);
    }

    #[test]
    fn test_empty_track_errors() {
        let tracks = register_set(&[], &[(1.0, 0)], &[]);
        let err = select_best_peak([("T1", &tracks)]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StudyError>(),
            Some(&StudyError::EmptyTrack { template_id: "T1".to_string(), track: HEPTADS_TRACK.to_string() })
        );

        let chain = TrackSet::new(CHAIN_TRACK);
        let err = select_best_peak([("T1", &chain)]).unwrap_err();
        assert!(matches!(err.downcast_ref::<StudyError>(), Some(StudyError::EmptyTrack { .. })));

        let err = select_best_mean([("T1", &register_set(&[(1.0, 0)], &[], &[]))], CHARGES_TRACK).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StudyError>(),
            Some(&StudyError::EmptyTrack { template_id: "T1".to_string(), track: CHARGES_TRACK.to_string() })
        );
    }

    #[test]
    fn test_peak_idempotent() {
        let t1 = register_set(&[(0.3, 0), (0.6, 1), (0.6, 2)], &[(0.2, 1)], &[(0.2, 2)]);
        let t2 = register_set(&[(0.5, 0)], &[], &[]);
        let first = select_best_peak([("T1", &t1), ("T2", &t2)]).unwrap();
        let second = select_best_peak([("T1", &t1), ("T2", &t2)]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.unwrap().offset(), 1);
    }
}

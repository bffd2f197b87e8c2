/*!
Per-offset score tracks produced by an alignment collaborator, and the `AlignmentSource` trait that the study uses to obtain them.

A template is scored with two track sets:
* the chain set, whose primary track is "chain"
* the register set, whose primary track is "heptads" with "charges" and "res_like" as secondaries

```
use ccstudy::alignment_track::{AlignmentTrack, TrackSet};

let mut tracks = TrackSet::new("heptads");
tracks.insert("heptads", AlignmentTrack::from_pairs(&[(1.0, 0), (2.0, 1)]));
tracks.insert("charges", AlignmentTrack::from_pairs(&[(0.5, 1)]));

let combined = tracks.combined_scores("heptads").unwrap();
assert_eq!(combined[0].score, 1.0); // offset 0 is missing from charges and adds nothing
assert_eq!(combined[1].score, 2.5);
```
*/

use log::trace;
use rustc_hash::FxHashMap as HashMap;
use std::path::Path;

use crate::study_error::StudyError;

/// Primary track of the chain set
pub const CHAIN_TRACK: &str = "chain";
/// Primary track of the register set
pub const HEPTADS_TRACK: &str = "heptads";
pub const CHARGES_TRACK: &str = "charges";
pub const RES_LIKE_TRACK: &str = "res_like";

/// A score at one alignment offset
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredOffset {
    pub score: f64,
    pub offset: i64
}

impl ScoredOffset {
    pub fn new(score: f64, offset: i64) -> ScoredOffset {
        ScoredOffset { score, offset }
    }
}

/// An ordered list of scores over candidate offsets
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentTrack {
    points: Vec<ScoredOffset>
}

impl AlignmentTrack {
    pub fn new(points: Vec<ScoredOffset>) -> AlignmentTrack {
        AlignmentTrack { points }
    }

    /// Convenience constructor from (score, offset) pairs
    pub fn from_pairs(pairs: &[(f64, i64)]) -> AlignmentTrack {
        AlignmentTrack {
            points: pairs.iter().map(|&(s, o)| ScoredOffset::new(s, o)).collect()
        }
    }

    pub fn push(&mut self, point: ScoredOffset) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[ScoredOffset] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the score at an offset, or None if the track does not cover it.
    /// If an offset is listed twice, the first entry wins.
    pub fn score_at(&self, offset: i64) -> Option<f64> {
        self.points.iter()
            .find(|p| p.offset == offset)
            .map(|p| p.score)
    }

    /// Returns the score at an offset, with an uncovered offset contributing exactly 0.0
    pub fn lookup(&self, offset: i64) -> f64 {
        self.score_at(offset).unwrap_or(0.0)
    }

    /// Scales every score by the largest absolute score, so the strongest offset becomes +/-1.0.
    /// A track with no non-zero scores is left untouched.
    pub fn normalize(&mut self) {
        let max_abs = self.points.iter()
            .map(|p| p.score.abs())
            .fold(0.0_f64, f64::max);
        if max_abs > 0.0 {
            for p in self.points.iter_mut() {
                p.score /= max_abs;
            }
        }
    }
}

/// A set of named tracks evaluated over the same offsets, with one track designated as primary
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackSet {
    /// Name of the primary track; it might not have been inserted yet
    primary: String,
    /// Tracks in insertion order
    tracks: Vec<(String, AlignmentTrack)>
}

impl TrackSet {
    /// Creates an empty set with the given primary track name
    pub fn new(primary: &str) -> TrackSet {
        TrackSet {
            primary: primary.to_string(),
            tracks: vec![]
        }
    }

    /// Adds a track, replacing any track with the same name
    pub fn insert(&mut self, name: &str, track: AlignmentTrack) {
        match self.tracks.iter_mut().find(|(n, _t)| n == name) {
            Some(entry) => entry.1 = track,
            None => self.tracks.push((name.to_string(), track))
        }
    }

    /// Returns a mutable track, creating an empty one if needed
    pub fn track_mut(&mut self, name: &str) -> &mut AlignmentTrack {
        let index = match self.tracks.iter().position(|(n, _t)| n == name) {
            Some(i) => i,
            None => {
                self.tracks.push((name.to_string(), AlignmentTrack::default()));
                self.tracks.len() - 1
            }
        };
        &mut self.tracks[index].1
    }

    pub fn get(&self, name: &str) -> Option<&AlignmentTrack> {
        self.tracks.iter()
            .find(|(n, _t)| n == name)
            .map(|(_n, t)| t)
    }

    pub fn primary_name(&self) -> &str {
        &self.primary
    }

    pub fn primary(&self) -> Option<&AlignmentTrack> {
        self.get(&self.primary)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|(n, _t)| n.as_str())
    }

    /// Combined score of a point from the `base` track: its own score plus every other track's score at the same offset.
    /// # Arguments
    /// * `base` - the track the point came from
    /// * `point` - the base score and offset
    pub fn combined_at(&self, base: &str, point: ScoredOffset) -> f64 {
        self.tracks.iter()
            .filter(|(n, _t)| n != base)
            .fold(point.score, |acc, (_n, t)| acc + t.lookup(point.offset))
    }

    /// Returns the combined score at every offset of the `base` track, in track order.
    /// Returns None if the set has no track named `base`.
    pub fn combined_scores(&self, base: &str) -> Option<Vec<ScoredOffset>> {
        let base_track = self.get(base)?;
        Some(base_track.points().iter()
            .map(|&p| ScoredOffset::new(self.combined_at(base, p), p.offset))
            .collect())
    }

    /// Normalizes every track independently
    pub fn normalize(&mut self) {
        for (_n, t) in self.tracks.iter_mut() {
            t.normalize();
        }
    }
}

/// All the tracks for one candidate template against the target
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateAlignment {
    /// Tracks from the chain alignment
    chain: TrackSet,
    /// Tracks from the register alignment
    register: TrackSet
}

impl Default for TemplateAlignment {
    fn default() -> Self {
        TemplateAlignment {
            chain: TrackSet::new(CHAIN_TRACK),
            register: TrackSet::new(HEPTADS_TRACK)
        }
    }
}

impl TemplateAlignment {
    /// Constructor
    pub fn new(chain: TrackSet, register: TrackSet) -> TemplateAlignment {
        TemplateAlignment {
            chain,
            register
        }
    }

    // Getters
    pub fn chain(&self) -> &TrackSet {
        &self.chain
    }

    pub fn register(&self) -> &TrackSet {
        &self.register
    }

    pub fn chain_mut(&mut self) -> &mut TrackSet {
        &mut self.chain
    }

    pub fn register_mut(&mut self) -> &mut TrackSet {
        &mut self.register
    }

    /// Brings all the tracks onto a comparable scale, see `AlignmentTrack::normalize`
    pub fn normalize(&mut self) {
        self.chain.normalize();
        self.register.normalize();
    }
}

/// Everything an alignment collaborator needs to score one candidate against the target
#[derive(Clone, Copy, Debug)]
pub struct AlignmentQuery<'a> {
    /// The candidate template id
    pub template_id: &'a str,
    /// Candidate sequence, already padded to the usable length
    pub sequence: &'a str,
    /// Candidate register, same length as `sequence`
    pub register: &'a str,
    pub target_sequence: &'a str,
    pub target_register: &'a str
}

/// Produces the per-offset score tracks for a candidate.
/// Each call must return a fresh `TemplateAlignment` the caller is free to normalize.
pub trait AlignmentSource {
    /// # Errors
    /// * implementation defined, typically when the candidate cannot be aligned
    fn align(&self, query: &AlignmentQuery) -> Result<TemplateAlignment, Box<dyn std::error::Error>>;
}

/// An `AlignmentSource` that serves tracks that were computed ahead of time, keyed by template id.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedAlignments {
    alignments: HashMap<String, TemplateAlignment>
}

impl PrecomputedAlignments {
    pub fn new() -> PrecomputedAlignments {
        Default::default()
    }

    /// Adds or replaces the alignment for a template
    pub fn insert(&mut self, template_id: &str, alignment: TemplateAlignment) {
        self.alignments.insert(template_id.to_string(), alignment);
    }

    pub fn get(&self, template_id: &str) -> Option<&TemplateAlignment> {
        self.alignments.get(template_id)
    }

    pub fn len(&self) -> usize {
        self.alignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alignments.is_empty()
    }

    /// Parses a track table. Each non-comment line is `template_id set track offset score`, where `set` is "chain" or "register".
    /// # Arguments
    /// * `text` - the full table contents
    /// # Errors
    /// * if a line has the wrong number of columns, an unknown set, or unparseable numbers
    pub fn parse(text: &str) -> Result<PrecomputedAlignments, Box<dyn std::error::Error>> {
        let mut precomputed = PrecomputedAlignments::new();
        for (line_index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line_number = line_index + 1;
            let format_error = |message: String| StudyError::DataFormat { line_number, message };
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() != 5 {
                return Err(Box::new(format_error(format!("expected 5 columns, found {}", columns.len()))));
            }

            let offset: i64 = columns[3].parse()
                .map_err(|_e| format_error(format!("bad offset \"{}\"", columns[3])))?;
            let score: f64 = columns[4].parse()
                .map_err(|_e| format_error(format!("bad score \"{}\"", columns[4])))?;

            let alignment = precomputed.alignments.entry(columns[0].to_string()).or_default();
            let track_set = match columns[1] {
                "chain" => alignment.chain_mut(),
                "register" => alignment.register_mut(),
                other => return Err(Box::new(format_error(format!("unknown track set \"{other}\""))))
            };
            track_set.track_mut(columns[2]).push(ScoredOffset::new(score, offset));
        }
        trace!("Loaded precomputed tracks for {} templates", precomputed.len());
        Ok(precomputed)
    }

    /// Reads and parses a track table file, see `parse`
    pub fn from_path(filename: &Path) -> Result<PrecomputedAlignments, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(filename)
            .map_err(|e| simple_error::simple_error!("Cannot open track file {}: {}", filename.display(), e))?;
        PrecomputedAlignments::parse(&text)
    }
}

impl AlignmentSource for PrecomputedAlignments {
    fn align(&self, query: &AlignmentQuery) -> Result<TemplateAlignment, Box<dyn std::error::Error>> {
        match self.alignments.get(query.template_id) {
            // hand out a copy, the caller normalizes it
            Some(alignment) => Ok(alignment.clone()),
            None => Err(Box::new(StudyError::MissingData {
                template_id: query.template_id.to_string(),
                field: "tracks".to_string()
            }))
        }
    }
}

use log::trace;
use rustc_hash::FxHashMap as HashMap;

/// Raw agreement counts for a single method.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgreementTally {
    /// Number of templates where the method matched the reference prediction
    pub hits: u64,
    /// Number of templates where the method was compared at all
    pub tries: u64
}

impl AgreementTally {
    /// Returns hits / tries, or None if the method was never tried
    pub fn accuracy(&self) -> Option<f64> {
        if self.tries == 0 {
            None
        } else {
            Some(self.hits as f64 / self.tries as f64)
        }
    }
}

/// Struct for accumulating per-method agreement counts over a study.
/// One tracker is created per vote and consumed into an `AccuracyTable` when the vote finishes.
#[derive(Debug, Default)]
pub struct TallyTracker {
    /// The counts for each method seen so far
    tallies: HashMap<String, AgreementTally>
}

impl TallyTracker {
    /// Creates an empty tracker
    pub fn new() -> TallyTracker {
        Default::default()
    }

    /// Records one comparison of `method` against the reference.
    /// # Arguments
    /// * `method` - the method that was compared
    /// * `is_hit` - true if it agreed with the reference
    pub fn record(&mut self, method: &str, is_hit: bool) {
        let tally = self.tallies.entry(method.to_string()).or_default();
        tally.tries += 1;
        if is_hit {
            tally.hits += 1;
        }
        trace!("record {method} => {}/{}", tally.hits, tally.tries);
    }

    /// Returns the current counts for a method, zero if it was never recorded
    pub fn tally(&self, method: &str) -> AgreementTally {
        self.tallies.get(method).copied().unwrap_or_default()
    }

    /// Total number of comparisons recorded across all methods
    pub fn total_tries(&self) -> u64 {
        self.tallies.values().map(|t| t.tries).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_tries() == 0
    }

    /// Converts the counts into the final accuracy table.
    /// Methods without any tries are left out instead of being reported as 0.
    pub fn into_table(self) -> AccuracyTable {
        let mut entries: Vec<MethodAccuracy> = self.tallies.into_iter()
            .filter_map(|(method, tally)| {
                tally.accuracy().map(|accuracy| MethodAccuracy {
                    method,
                    accuracy,
                    hits: tally.hits,
                    tries: tally.tries
                })
            })
            .collect();
        entries.sort_by(|e1, e2| e1.method.cmp(&e2.method));
        AccuracyTable { entries }
    }
}

/// One row of the accuracy table
#[derive(Clone, Debug, PartialEq)]
pub struct MethodAccuracy {
    pub method: String,
    /// Always hits / tries, and tries is never 0
    pub accuracy: f64,
    pub hits: u64,
    pub tries: u64
}

/// Final per-method accuracy, ordered by method name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccuracyTable {
    entries: Vec<MethodAccuracy>
}

impl AccuracyTable {
    pub fn entries(&self) -> &[MethodAccuracy] {
        &self.entries
    }

    /// Returns the row for a method, None if the method was never tried
    pub fn get(&self, method: &str) -> Option<&MethodAccuracy> {
        self.entries.iter().find(|e| e.method == method)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

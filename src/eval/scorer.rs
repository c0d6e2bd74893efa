use std::collections::HashSet;
use std::fmt;

/// Aggregate multi-label scores over every record fed to a
/// [`ScoreAccumulator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Precision: {:.3}", self.precision)?;
        writeln!(f, "Recall:    {:.3}", self.recall)?;
        write!(f, "F1 Score:  {:.3}", self.f1)
    }
}

/// Accumulates aligned boolean membership vectors across records and
/// computes aggregate precision/recall/F1 once at the end.
///
/// Per record, the predicted and truth key sets are merged into a sorted
/// label universe; for each label in the universe one boolean is appended to
/// the truth vector and one to the prediction vector. The universe itself is
/// discarded, so the two flat vectors stay parallel by construction.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use tagbench::eval::ScoreAccumulator;
///
/// let truth: HashSet<String> = ["cuisine", "phone"].iter().map(|s| s.to_string()).collect();
/// let predicted: HashSet<String> = ["cuisine", "website"].iter().map(|s| s.to_string()).collect();
///
/// let mut acc = ScoreAccumulator::new();
/// assert!(acc.record(&truth, &predicted));
///
/// let metrics = acc.finish().expect("one record was scored");
/// assert!((metrics.precision - 0.5).abs() < 1e-9);
/// assert!((metrics.recall - 0.5).abs() < 1e-9);
/// ```
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    y_true: Vec<bool>,
    y_pred: Vec<bool>,
    scored: usize,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records that contributed to the score so far.
    pub fn scored_records(&self) -> usize {
        self.scored
    }

    /// Scores one record. Returns `false` without touching the accumulator
    /// when the truth set is empty: precision and recall are undefined for
    /// such a record and it must be skipped, not counted as zero.
    pub fn record(&mut self, truth: &HashSet<String>, predicted: &HashSet<String>) -> bool {
        if truth.is_empty() {
            return false;
        }

        let mut universe: Vec<&String> = truth.union(predicted).collect();
        universe.sort();

        for key in universe {
            self.y_true.push(truth.contains(key));
            self.y_pred.push(predicted.contains(key));
        }
        self.scored += 1;
        true
    }

    /// Computes the aggregate metrics, or `None` when no record was scored.
    /// The "no data" outcome is distinct from a numeric zero on purpose:
    /// reporting 0.0 over an empty accumulator would be misleading.
    ///
    /// Each metric is 0 when its denominator is 0; there is no
    /// division-by-zero failure mode.
    pub fn finish(&self) -> Option<Metrics> {
        if self.scored == 0 {
            return None;
        }

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in self.y_true.iter().zip(&self.y_pred) {
            match (t, p) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Some(Metrics {
            precision,
            recall,
            f1,
        })
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

//! Aggregates over a condition's trials. Rounding is half-to-even everywhere so
//! that summaries reproduce the reference analysis bit for bit.

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ReactionTime {
    pub milliseconds: f64,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Evaluation {
    Correct(ReactionTime),
    Incorrect,
}

/// Reaction-time aggregates over correct trials only, in whole milliseconds.
/// Every field is `None` when no trial was correct.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct CorrectReactionTimes {
    pub mean_milliseconds: Option<i64>,
    pub median_milliseconds: Option<i64>,
    pub min_milliseconds: Option<i64>,
    pub max_milliseconds: Option<i64>,
}

pub fn correct_reaction_times<T: Iterator<Item = Evaluation>>(
    evaluations: T,
) -> CorrectReactionTimes {
    let mut correct = evaluations
        .filter_map(|e| match e {
            Evaluation::Correct(reaction_time) => Some(reaction_time.milliseconds),
            Evaluation::Incorrect => None,
        })
        .collect::<Vec<_>>();
    correct.sort_by(f64::total_cmp);
    CorrectReactionTimes {
        mean_milliseconds: mean(&correct).map(round_to_integer),
        median_milliseconds: median(&correct).map(round_to_integer),
        min_milliseconds: correct.first().copied().map(round_to_integer),
        max_milliseconds: correct.last().copied().map(round_to_integer),
    }
}

pub fn accuracy_percentage(accuracy: &[u8]) -> Option<f64> {
    let count = accuracy.len();
    if count == 0 {
        return None;
    }
    let correct = accuracy.iter().filter(|&&a| a == 1).count();
    // 100 * mean, not 100 * correct / count.
    Some(round_to_tenth(100. * (correct as f64 / count as f64)))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Expects `sorted` in ascending order. Even-length input averages the two
/// middle values.
pub fn median(sorted: &[f64]) -> Option<f64> {
    let count = sorted.len();
    if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(sorted[count / 2])
    } else {
        Some((sorted[count / 2 - 1] + sorted[count / 2]) / 2.)
    }
}

pub fn round_to_integer(x: f64) -> i64 {
    x.round_ties_even() as i64
}

pub fn round_to_tenth(x: f64) -> f64 {
    (x * 10.).round_ties_even() / 10.
}

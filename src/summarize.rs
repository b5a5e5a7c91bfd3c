use tracing::{debug, info};

use crate::error::SummaryError;
use crate::stats::{
    accuracy_percentage, correct_reaction_times, round_to_integer, round_to_tenth,
    CorrectReactionTimes, Evaluation, ReactionTime,
};
use crate::table::RawTrialLog;
use crate::variant::{
    DurationSource, LabelRule, ResponseColumns, ResponseFields, ResponseRule, SortOrder,
    TaskVariant,
};

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct TimeAnchor {
    pub row: usize,
    pub value: f64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ConditionSummary {
    /// Discriminator values, in the variant's column order.
    pub key: Vec<String>,
    pub condition: String,
    pub onsets_seconds: Vec<f64>,
    pub durations_seconds: Vec<f64>,
    pub accuracy: Vec<u8>,
    pub accuracy_percentage: Option<f64>,
    /// `None` for conditions that never ask for a response.
    pub reaction_times_milliseconds: Option<Vec<i64>>,
    pub correct_reaction_times: Option<CorrectReactionTimes>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SummaryTable {
    pub key_columns: Vec<String>,
    pub min_max: bool,
    pub rows: Vec<ConditionSummary>,
}

struct Trial {
    row: usize,
    key: Vec<String>,
}

pub fn summarize(log: &RawTrialLog, variant: &TaskVariant) -> Result<SummaryTable, SummaryError> {
    check_columns(log, variant)?;
    let anchor = resolve_anchor(log, &variant.anchor_column)?;
    info!(
        task = %variant.name,
        anchor = anchor.value,
        row = anchor.row,
        "resolved time anchor from {}",
        variant.anchor_column
    );

    let trials = find_trials(log, variant)?;
    if trials.is_empty() {
        return Err(SummaryError::NoTrials);
    }
    let keys = condition_keys(&trials, variant.sort_order);
    info!(
        trials = trials.len(),
        conditions = keys.len(),
        "partitioned trials"
    );

    let rows = keys
        .into_iter()
        .map(|key| {
            let rows = trials
                .iter()
                .filter(|trial| trial.key == key)
                .map(|trial| trial.row)
                .collect::<Vec<_>>();
            summarize_condition(log, variant, anchor, key, &rows)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SummaryTable {
        key_columns: variant.discriminator_columns.clone(),
        min_max: variant.min_max,
        rows,
    })
}

/// The earliest value in `column` across the whole log. Ties go to the first
/// row holding the minimum.
pub fn resolve_anchor(log: &RawTrialLog, column: &str) -> Result<TimeAnchor, SummaryError> {
    let column_index = log.column(column)?;
    let mut anchor: Option<TimeAnchor> = None;
    for row in 0..log.len() {
        if let Some(value) = log.number(row, column_index)? {
            if anchor.map_or(true, |a| value < a.value) {
                anchor = Some(TimeAnchor { row, value });
            }
        }
    }
    anchor.ok_or_else(|| {
        SummaryError::malformed("no timestamp found").within(format!("column {column}"))
    })
}

fn check_columns(log: &RawTrialLog, variant: &TaskVariant) -> Result<(), SummaryError> {
    for column in variant.referenced_columns() {
        log.column(column)?;
    }
    let mut discriminator_fields = vec![];
    if let LabelRule::Field(field) = &variant.label_rule {
        discriminator_fields.push(field);
    }
    if let ResponseRule::WhenEquals { field, .. } = &variant.response_rule {
        discriminator_fields.push(field);
    }
    if let ResponseColumns::ByDiscriminator { field, .. } = &variant.response_columns {
        discriminator_fields.push(field);
    }
    for field in discriminator_fields {
        if !variant.discriminator_columns.contains(field) {
            return Err(SummaryError::missing_column(field));
        }
    }
    Ok(())
}

fn find_trials(log: &RawTrialLog, variant: &TaskVariant) -> Result<Vec<Trial>, SummaryError> {
    let filter_column = log.column(variant.trial_filter.column())?;
    let derived = variant
        .derived_fields
        .iter()
        .map(|field| Ok((field, log.column(&field.source)?)))
        .collect::<Result<Vec<_>, SummaryError>>()?;
    let discriminators = variant
        .discriminator_columns
        .iter()
        .map(|name| match derived.iter().position(|(field, _)| &field.name == name) {
            Some(position) => Ok(Discriminator::Derived(position)),
            None => log.column(name).map(Discriminator::Raw),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((0..log.len())
        .filter(|&row| variant.trial_filter.accepts(log.cell(row, filter_column)))
        .map(|row| {
            let key = discriminators
                .iter()
                .map(|discriminator| match discriminator {
                    Discriminator::Raw(column) => log.cell(row, *column).to_string(),
                    Discriminator::Derived(position) => {
                        let (field, source) = derived[*position];
                        field.derivation.apply(log.cell(row, source))
                    }
                })
                .collect();
            Trial { row, key }
        })
        .collect())
}

enum Discriminator {
    Raw(usize),
    Derived(usize),
}

fn condition_keys(trials: &[Trial], sort_order: SortOrder) -> Vec<Vec<String>> {
    let mut keys: Vec<Vec<String>> = vec![];
    for trial in trials {
        if !keys.contains(&trial.key) {
            keys.push(trial.key.clone());
        }
    }
    if sort_order == SortOrder::Sorted {
        keys.sort();
    }
    keys
}

fn discriminator_value<'a>(variant: &TaskVariant, key: &'a [String], field: &str) -> &'a str {
    variant
        .discriminator_columns
        .iter()
        .position(|c| c == field)
        .map(|i| key[i].as_str())
        .unwrap_or("")
}

fn label(variant: &TaskVariant, key: &[String]) -> String {
    match &variant.label_rule {
        LabelRule::Join => key.join("_"),
        LabelRule::Field(field) => discriminator_value(variant, key, field).to_string(),
    }
}

fn responds(variant: &TaskVariant, key: &[String]) -> bool {
    match &variant.response_rule {
        ResponseRule::Always => true,
        ResponseRule::WhenEquals { field, value } => {
            discriminator_value(variant, key, field) == value
        }
    }
}

fn response_fields<'a>(variant: &'a TaskVariant, key: &[String]) -> &'a ResponseFields {
    match &variant.response_columns {
        ResponseColumns::Fixed(fields) => fields,
        ResponseColumns::ByDiscriminator {
            field,
            table,
            fallback,
        } => {
            let value = discriminator_value(variant, key, field);
            table
                .iter()
                .find(|(v, _)| v == value)
                .map(|(_, fields)| fields)
                .unwrap_or(fallback)
        }
    }
}

fn summarize_condition(
    log: &RawTrialLog,
    variant: &TaskVariant,
    anchor: TimeAnchor,
    key: Vec<String>,
    rows: &[usize],
) -> Result<ConditionSummary, SummaryError> {
    let condition = label(variant, &key);
    let scale = variant.time_scale;

    let onset_column = log.column(&variant.onset_column)?;
    let onsets_seconds = rows
        .iter()
        .map(|&row| {
            let onset = log.required_number(row, onset_column)?;
            Ok(round_to_tenth((onset - anchor.value) / scale))
        })
        .collect::<Result<Vec<_>, SummaryError>>()?;

    let durations_seconds = match &variant.duration_source {
        DurationSource::Column(name) => {
            let column = log.column(name)?;
            rows.iter()
                .map(|&row| Ok(round_to_tenth(log.required_number(row, column)? / scale)))
                .collect::<Result<Vec<_>, SummaryError>>()?
        }
        DurationSource::Seconds(seconds) => vec![*seconds; rows.len()],
    };

    let fields = response_fields(variant, &key);
    let acc_column = log.column(&fields.acc)?;
    let accuracy = rows
        .iter()
        .map(|&row| Ok(log.number(row, acc_column)?.map_or(0, |a| a as u8)))
        .collect::<Result<Vec<_>, SummaryError>>()?;

    let (reaction_times_milliseconds, correct) = if responds(variant, &key) {
        let rt_column = log.column(&fields.rt)?;
        let reaction_times = rows
            .iter()
            .map(|&row| log.required_number(row, rt_column))
            .collect::<Result<Vec<_>, _>>()?;
        let evaluations = reaction_times.iter().zip(&accuracy).map(|(&milliseconds, &a)| {
            if a == 1 {
                Evaluation::Correct(ReactionTime { milliseconds })
            } else {
                Evaluation::Incorrect
            }
        });
        (
            Some(reaction_times.iter().map(|&rt| round_to_integer(rt)).collect()),
            Some(correct_reaction_times(evaluations)),
        )
    } else {
        (None, None)
    };

    let summary = ConditionSummary {
        key,
        accuracy_percentage: accuracy_percentage(&accuracy),
        condition,
        onsets_seconds,
        durations_seconds,
        accuracy,
        reaction_times_milliseconds,
        correct_reaction_times: correct,
    };
    debug!(
        condition = %summary.condition,
        trials = rows.len(),
        accuracy = ?summary.accuracy_percentage,
        mean_correct_rt = ?summary.correct_reaction_times.as_ref().and_then(|c| c.mean_milliseconds),
        "summarized condition"
    );
    Ok(summary)
}

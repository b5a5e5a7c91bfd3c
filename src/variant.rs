//! Declarative description of one task's log layout. Each task differs only in
//! which columns it reads and a handful of rules; the summarizer itself is
//! shared.

use crate::table::is_missing;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskVariant {
    pub name: String,
    /// Column whose minimum, over the whole log, is time zero.
    pub anchor_column: String,
    pub trial_filter: TrialFilter,
    /// Computed before conditions are enumerated and usable as discriminators.
    pub derived_fields: Vec<DerivedField>,
    pub discriminator_columns: Vec<String>,
    pub label_rule: LabelRule,
    pub sort_order: SortOrder,
    pub onset_column: String,
    pub duration_source: DurationSource,
    /// Native time units per second.
    pub time_scale: f64,
    pub response_rule: ResponseRule,
    pub response_columns: ResponseColumns,
    pub min_max: bool,
    pub output_naming: OutputNaming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrialFilter {
    NotEmpty(String),
    Equals { column: String, value: String },
    OneOf { column: String, values: Vec<String> },
}

impl TrialFilter {
    pub fn column(&self) -> &str {
        match self {
            TrialFilter::NotEmpty(column) => column,
            TrialFilter::Equals { column, .. } => column,
            TrialFilter::OneOf { column, .. } => column,
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            TrialFilter::NotEmpty(_) => !is_missing(value),
            TrialFilter::Equals { value: wanted, .. } => value == wanted,
            TrialFilter::OneOf { values, .. } => values.iter().any(|v| v == value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedField {
    pub name: String,
    pub source: String,
    pub derivation: Derivation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    /// Exact text lookup.
    Remap {
        table: Vec<(String, String)>,
        otherwise: String,
    },
    /// Numeric equality, so `7` and `7.0` both match.
    NumericMatch {
        value: f64,
        matched: String,
        otherwise: String,
    },
}

impl Derivation {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Derivation::Remap { table, otherwise } => table
                .iter()
                .find(|(from, _)| from == raw)
                .map(|(_, to)| to)
                .unwrap_or(otherwise)
                .clone(),
            Derivation::NumericMatch {
                value,
                matched,
                otherwise,
            } => {
                if raw.parse::<f64>().map_or(false, |v| v == *value) {
                    matched.clone()
                } else {
                    otherwise.clone()
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelRule {
    /// Discriminator values joined with `_`.
    Join,
    /// The value of one discriminator column.
    Field(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortOrder {
    FirstSeen,
    Sorted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DurationSource {
    /// Native units, scaled like onsets and rounded to a tenth of a second.
    Column(String),
    Seconds(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseRule {
    Always,
    WhenEquals { field: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFields {
    pub rt: String,
    pub acc: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseColumns {
    Fixed(ResponseFields),
    /// Chosen per condition by the value of one discriminator, e.g. a standard
    /// tone logging to `StandardTone.RT` and a deviant to `Stim.RT`.
    ByDiscriminator {
        field: String,
        table: Vec<(String, ResponseFields)>,
        fallback: ResponseFields,
    },
}

impl ResponseColumns {
    pub fn all(&self) -> Vec<&ResponseFields> {
        match self {
            ResponseColumns::Fixed(fields) => vec![fields],
            ResponseColumns::ByDiscriminator {
                table, fallback, ..
            } => table
                .iter()
                .map(|(_, fields)| fields)
                .chain([fallback])
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputNaming {
    /// `<stem>_summary.csv` inside a directory, defaulting to the input's own.
    Directory,
    /// An explicit output file, defaulting to `<stem>_summary.csv` in the
    /// working directory.
    ExplicitPath,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn fields(rt: &str, acc: &str) -> ResponseFields {
    ResponseFields {
        rt: rt.to_string(),
        acc: acc.to_string(),
    }
}

impl TaskVariant {
    pub fn oddball() -> Self {
        TaskVariant {
            name: "oddball".to_string(),
            anchor_column: "scanstart2.OnsetTime".to_string(),
            trial_filter: TrialFilter::Equals {
                column: "Running".to_string(),
                value: "MainStimuli".to_string(),
            },
            derived_fields: vec![DerivedField {
                name: "Condition".to_string(),
                source: "tone".to_string(),
                derivation: Derivation::Remap {
                    table: vec![
                        ("stimuli\\silence.wav".to_string(), "Silence".to_string()),
                        ("stimuli\\1000.wav".to_string(), "Tone".to_string()),
                        ("stimuli\\1200.wav".to_string(), "Oddball".to_string()),
                    ],
                    otherwise: String::new(),
                },
            }],
            discriminator_columns: strings(&["Running", "Condition"]),
            label_rule: LabelRule::Field("Condition".to_string()),
            sort_order: SortOrder::FirstSeen,
            onset_column: "MainScreen.OnsetTime".to_string(),
            duration_source: DurationSource::Column("duration".to_string()),
            time_scale: 1000.,
            response_rule: ResponseRule::WhenEquals {
                field: "Condition".to_string(),
                value: "Oddball".to_string(),
            },
            response_columns: ResponseColumns::Fixed(fields("MainScreen.RT", "MainScreen.ACC")),
            min_max: false,
            output_naming: OutputNaming::Directory,
        }
    }

    pub fn oddball_old() -> Self {
        TaskVariant {
            name: "oddball-old".to_string(),
            min_max: true,
            output_naming: OutputNaming::ExplicitPath,
            ..Self::oddball()
        }
    }

    pub fn spt() -> Self {
        TaskVariant {
            name: "spt".to_string(),
            anchor_column: "Instructions.RTTime".to_string(),
            trial_filter: TrialFilter::NotEmpty("ImageType".to_string()),
            derived_fields: vec![],
            discriminator_columns: strings(&["ImageType", "bbcolor"]),
            label_rule: LabelRule::Join,
            sort_order: SortOrder::Sorted,
            onset_column: "PresentPicture.OnsetTime".to_string(),
            duration_source: DurationSource::Seconds(1.),
            time_scale: 1000.,
            response_rule: ResponseRule::WhenEquals {
                field: "bbcolor".to_string(),
                value: "red".to_string(),
            },
            response_columns: ResponseColumns::Fixed(fields(
                "PresentPicture.RT",
                "PresentPicture.ACC",
            )),
            min_max: true,
            output_naming: OutputNaming::ExplicitPath,
        }
    }

    pub fn spt_esop() -> Self {
        TaskVariant {
            name: "spt-esop".to_string(),
            derived_fields: vec![DerivedField {
                name: "Target".to_string(),
                source: "PresentPicture.CRESP".to_string(),
                derivation: Derivation::NumericMatch {
                    value: 7.,
                    matched: "Target".to_string(),
                    otherwise: "Foil".to_string(),
                },
            }],
            discriminator_columns: strings(&["ImageType", "Target"]),
            response_rule: ResponseRule::WhenEquals {
                field: "Target".to_string(),
                value: "Target".to_string(),
            },
            ..Self::spt()
        }
    }

    pub fn wm() -> Self {
        TaskVariant {
            name: "wm".to_string(),
            anchor_column: "GetReady.OffsetTime".to_string(),
            trial_filter: TrialFilter::NotEmpty("StimType".to_string()),
            derived_fields: vec![],
            discriminator_columns: strings(&["BlockType", "StimType"]),
            label_rule: LabelRule::Join,
            sort_order: SortOrder::Sorted,
            onset_column: "Stim.OnsetTime".to_string(),
            duration_source: DurationSource::Seconds(2.5),
            time_scale: 1000.,
            response_rule: ResponseRule::Always,
            response_columns: ResponseColumns::Fixed(fields("Stim.RT", "Stim.ACC")),
            min_max: false,
            output_naming: OutputNaming::Directory,
        }
    }

    /// Every column the variant reads directly from the raw log.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let derived = |name: &str| self.derived_fields.iter().any(|d| d.name == name);
        let mut columns = vec![self.anchor_column.as_str(), self.trial_filter.column()];
        columns.extend(self.derived_fields.iter().map(|d| d.source.as_str()));
        columns.extend(
            self.discriminator_columns
                .iter()
                .map(String::as_str)
                .filter(|c| !derived(*c)),
        );
        columns.push(self.onset_column.as_str());
        if let DurationSource::Column(column) = &self.duration_source {
            columns.push(column);
        }
        for fields in self.response_columns.all() {
            columns.push(&fields.rt);
            columns.push(&fields.acc);
        }
        let mut seen = Vec::new();
        columns.retain(|c| {
            if seen.contains(c) {
                false
            } else {
                seen.push(*c);
                true
            }
        });
        columns
    }
}

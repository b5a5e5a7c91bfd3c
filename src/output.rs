//! Summary table serialization. Sequences are written as bracketed lists and
//! undefined aggregates as empty fields.

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::info;

use crate::error::SummaryError;
use crate::summarize::{ConditionSummary, SummaryTable};
use crate::variant::OutputNaming;

const CONDITION: &str = "Condition";

pub fn header(table: &SummaryTable) -> Vec<String> {
    let mut columns = table
        .key_columns
        .iter()
        .filter(|c| c.as_str() != CONDITION)
        .cloned()
        .collect::<Vec<_>>();
    columns.extend(
        [
            CONDITION,
            "OnsetsSec",
            "DurationsSec",
            "Accuracy",
            "PctAccuracy",
            "RTms",
            "MeanCorrectRTms",
            "MedianCorrectRTms",
        ]
        .map(String::from),
    );
    if table.min_max {
        columns.extend(["MinCorrectRTms", "MaxCorrectRTms"].map(String::from));
    }
    columns
}

fn list<T: Debug>(values: &[T]) -> String {
    let items = values
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>();
    format!("[{}]", items.join(", "))
}

fn optional<T: Debug>(value: Option<T>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

fn record(table: &SummaryTable, row: &ConditionSummary) -> Vec<String> {
    let mut fields = table
        .key_columns
        .iter()
        .zip(&row.key)
        .filter(|(c, _)| c.as_str() != CONDITION)
        .map(|(_, value)| value.clone())
        .collect::<Vec<_>>();
    let correct = row.correct_reaction_times.clone().unwrap_or_default();
    fields.extend([
        row.condition.clone(),
        list(&row.onsets_seconds),
        list(&row.durations_seconds),
        list(&row.accuracy),
        optional(row.accuracy_percentage),
        row.reaction_times_milliseconds
            .as_deref()
            .map(list)
            .unwrap_or_default(),
        optional(correct.mean_milliseconds),
        optional(correct.median_milliseconds),
    ]);
    if table.min_max {
        fields.extend([
            optional(correct.min_milliseconds),
            optional(correct.max_milliseconds),
        ]);
    }
    fields
}

pub fn write_summary<W: Write>(table: &SummaryTable, output: W) -> Result<(), SummaryError> {
    let mut writer = WriterBuilder::new().from_writer(output);
    writer.write_record(header(table))?;
    for row in &table.rows {
        writer.write_record(record(table, row))?;
    }
    writer.flush()?;
    Ok(())
}

/// Serializes fully in memory, then moves a sibling temporary file into place
/// so that a failed run never leaves a truncated summary behind.
pub fn write_summary_file(table: &SummaryTable, path: &Path) -> Result<(), SummaryError> {
    let mut contents = vec![];
    write_summary(table, &mut contents)?;
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    if let Err(e) = fs::write(&staging, &contents).and_then(|_| fs::rename(&staging, path)) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    info!(
        path = %path.display(),
        conditions = table.rows.len(),
        "wrote summary"
    );
    Ok(())
}

/// `run1.csv` becomes `run1_summary.csv`; other names get the suffix appended.
pub fn summary_file_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".csv").unwrap_or(&name);
    format!("{stem}_summary.csv")
}

pub fn output_path(naming: OutputNaming, input: &Path, output: Option<&Path>) -> PathBuf {
    let name = summary_file_name(input);
    match (naming, output) {
        (OutputNaming::Directory, Some(directory)) => directory.join(name),
        (OutputNaming::Directory, None) => input
            .parent()
            .map(|parent| parent.join(&name))
            .unwrap_or_else(|| PathBuf::from(&name)),
        (OutputNaming::ExplicitPath, Some(path)) => path.to_path_buf(),
        (OutputNaming::ExplicitPath, None) => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::path::PathBuf;

    use super::output_path;
    use super::write_summary;
    use super::write_summary_file;
    use crate::stats::CorrectReactionTimes;
    use crate::summarize::{ConditionSummary, SummaryTable};
    use crate::variant::OutputNaming;

    fn oddball_table() -> SummaryTable {
        SummaryTable {
            key_columns: vec!["Running".to_string(), "Condition".to_string()],
            min_max: false,
            rows: vec![
                ConditionSummary {
                    key: vec!["MainStimuli".to_string(), "Tone".to_string()],
                    condition: "Tone".to_string(),
                    onsets_seconds: vec![1., 4.5],
                    durations_seconds: vec![0.2, 0.2],
                    accuracy: vec![0, 0],
                    accuracy_percentage: Some(0.),
                    reaction_times_milliseconds: None,
                    correct_reaction_times: None,
                },
                ConditionSummary {
                    key: vec!["MainStimuli".to_string(), "Oddball".to_string()],
                    condition: "Oddball".to_string(),
                    onsets_seconds: vec![2.],
                    durations_seconds: vec![0.2],
                    accuracy: vec![1],
                    accuracy_percentage: Some(100.),
                    reaction_times_milliseconds: Some(vec![412]),
                    correct_reaction_times: Some(CorrectReactionTimes {
                        mean_milliseconds: Some(412),
                        median_milliseconds: Some(412),
                        min_milliseconds: Some(412),
                        max_milliseconds: Some(412),
                    }),
                },
            ],
        }
    }

    fn render(table: &SummaryTable) -> String {
        let mut out = vec![];
        write_summary(table, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn writes_condition_column_once() {
        assert_eq!(
            "Running,Condition,OnsetsSec,DurationsSec,Accuracy,PctAccuracy,RTms,MeanCorrectRTms,MedianCorrectRTms
MainStimuli,Tone,\"[1.0, 4.5]\",\"[0.2, 0.2]\",\"[0, 0]\",0.0,,,
MainStimuli,Oddball,[2.0],[0.2],[1],100.0,[412],412,412
",
            render(&oddball_table())
        );
    }

    #[test]
    fn writes_min_and_max_when_enabled() {
        let table = SummaryTable {
            key_columns: vec!["ImageType".to_string(), "bbcolor".to_string()],
            min_max: true,
            rows: vec![ConditionSummary {
                key: vec!["Face".to_string(), "red".to_string()],
                condition: "Face_red".to_string(),
                onsets_seconds: vec![3.1],
                durations_seconds: vec![1.],
                accuracy: vec![0],
                accuracy_percentage: Some(0.),
                reaction_times_milliseconds: Some(vec![0]),
                correct_reaction_times: Some(CorrectReactionTimes::default()),
            }],
        };
        assert_eq!(
            "ImageType,bbcolor,Condition,OnsetsSec,DurationsSec,Accuracy,PctAccuracy,RTms,MeanCorrectRTms,MedianCorrectRTms,MinCorrectRTms,MaxCorrectRTms
Face,red,Face_red,[3.1],[1.0],[0],0.0,[0],,,,
",
            render(&table)
        );
    }

    #[test]
    fn rewriting_identical_table_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run1_summary.csv");
        write_summary_file(&oddball_table(), &path).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_summary_file(&oddball_table(), &path).unwrap();
        assert_eq!(first, std::fs::read(&path).unwrap());
        assert!(!dir.path().join("run1_summary.csv.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_no_output_behind() {
        let dir = tempfile::tempdir().unwrap();
        let occupied = dir.path().join("run1_summary.csv");
        std::fs::create_dir(&occupied).unwrap();
        std::fs::write(occupied.join("keep"), "").unwrap();
        assert!(write_summary_file(&oddball_table(), &occupied).is_err());
        assert!(!dir.path().join("run1_summary.csv.tmp").exists());

        let missing = dir.path().join("absent").join("run1_summary.csv");
        assert!(write_summary_file(&oddball_table(), &missing).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn derives_output_paths() {
        let input = Path::new("data/WM-123456-2.csv");
        assert_eq!(
            PathBuf::from("data/WM-123456-2_summary.csv"),
            output_path(OutputNaming::Directory, input, None)
        );
        assert_eq!(
            PathBuf::from("out/WM-123456-2_summary.csv"),
            output_path(OutputNaming::Directory, input, Some(Path::new("out")))
        );
        assert_eq!(
            PathBuf::from("WM-123456-2_summary.csv"),
            output_path(OutputNaming::ExplicitPath, input, None)
        );
        assert_eq!(
            PathBuf::from("elsewhere.csv"),
            output_path(
                OutputNaming::ExplicitPath,
                input,
                Some(Path::new("elsewhere.csv"))
            )
        );
        assert_eq!(
            PathBuf::from("run_summary.csv"),
            output_path(OutputNaming::ExplicitPath, Path::new("run"), None)
        );
    }
}

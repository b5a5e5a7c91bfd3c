//! Plain-text report of a summary table, one section per view, headed by
//! free-form labels such as project, subject and session.

use std::io::Read;

use csv::{ReaderBuilder, Trim};

use crate::error::SummaryError;

const MAX_CELL_WIDTH: usize = 100;

const VIEWS: [&[&str]; 5] = [
    &[
        "Condition",
        "PctAccuracy",
        "MeanCorrectRTms",
        "MedianCorrectRTms",
    ],
    &["Condition", "OnsetsSec"],
    &["Condition", "DurationsSec"],
    &["Condition", "Accuracy"],
    &["Condition", "RTms"],
];

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
        Ok(Label {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        })
    }
}

pub fn render_report<R: Read>(summary: R, labels: &[Label]) -> Result<String, SummaryError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(summary);
    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let rows = reader
        .records()
        .map(|r| r.map(|record| record.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()?;
    if !headers.iter().any(|h| h == "Condition") {
        return Err(SummaryError::missing_column("Condition"));
    }

    let mut sections = vec![];
    if !labels.is_empty() {
        sections.push(
            labels
                .iter()
                .map(|label| format!("{}: {}", label.key, label.value))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }
    for view in VIEWS {
        let columns = view
            .iter()
            .filter_map(|name| headers.iter().position(|h| h == name))
            .collect::<Vec<_>>();
        sections.push(render_view(&headers, &rows, &columns));
    }
    Ok(sections.join("\n\n") + "\n")
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() > MAX_CELL_WIDTH {
        let kept = cell.chars().take(MAX_CELL_WIDTH - 3).collect::<String>();
        format!("{kept}...")
    } else {
        cell.to_string()
    }
}

fn render_view(headers: &[String], rows: &[Vec<String>], columns: &[usize]) -> String {
    let cells = std::iter::once(
        columns
            .iter()
            .map(|&c| headers[c].clone())
            .collect::<Vec<_>>(),
    )
    .chain(rows.iter().map(|row| {
        columns
            .iter()
            .map(|&c| truncate(row.get(c).map(String::as_str).unwrap_or("")))
            .collect()
    }))
    .collect::<Vec<Vec<String>>>();
    let widths = (0..columns.len())
        .map(|i| {
            cells
                .iter()
                .map(|line| line[i].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();
    cells
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::render_report;
    use super::Label;

    const SUMMARY: &str = "Running,Condition,OnsetsSec,DurationsSec,Accuracy,PctAccuracy,RTms,MeanCorrectRTms,MedianCorrectRTms
MainStimuli,Tone,\"[1.0, 4.5]\",\"[0.2, 0.2]\",\"[0, 0]\",0.0,,,
MainStimuli,Oddball,[2.0],[0.2],[1],100.0,[412],412,412
";

    #[test]
    fn renders_labels_and_views() {
        let labels = vec![
            "project=GF".parse::<Label>().unwrap(),
            "subject = 123456".parse::<Label>().unwrap(),
        ];
        assert_eq!(
            "project: GF
subject: 123456

Condition  PctAccuracy  MeanCorrectRTms  MedianCorrectRTms
Tone       0.0
Oddball    100.0        412              412

Condition  OnsetsSec
Tone       [1.0, 4.5]
Oddball    [2.0]

Condition  DurationsSec
Tone       [0.2, 0.2]
Oddball    [0.2]

Condition  Accuracy
Tone       [0, 0]
Oddball    [1]

Condition  RTms
Tone
Oddball    [412]
",
            render_report(SUMMARY.as_bytes(), &labels).unwrap()
        );
    }

    #[test]
    fn truncates_long_cells() {
        let onsets = format!("[{}]", vec!["10.5"; 40].join(", "));
        let summary = format!("Condition,OnsetsSec\nTone,\"{onsets}\"\n");
        let report = render_report(summary.as_bytes(), &[]).unwrap();
        let line = report
            .lines()
            .find(|l| l.starts_with("Tone") && l.contains("10.5"))
            .unwrap();
        assert!(line.ends_with("..."));
        assert_eq!(100, line.trim_start_matches("Tone").trim_start().chars().count());
    }

    #[test]
    fn requires_condition_column() {
        let error = render_report("OnsetsSec\n[1.0]\n".as_bytes(), &[])
            .err()
            .unwrap();
        assert!(error.is_configuration());
    }

    #[test]
    fn rejects_label_without_separator() {
        assert!("subject".parse::<Label>().is_err());
    }
}

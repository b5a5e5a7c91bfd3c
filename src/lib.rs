//! Per-condition summaries of E-Prime behavioral task logs: onsets relative to
//! the scanner trigger, durations, accuracy and reaction times, for building
//! fMRI task regressors.

pub mod archive;
pub mod error;
pub mod output;
pub mod report;
pub mod stats;
pub mod summarize;
pub mod table;
pub mod variant;

pub use error::SummaryError;
pub use summarize::{summarize, ConditionSummary, SummaryTable, TimeAnchor};
pub use table::RawTrialLog;
pub use variant::TaskVariant;

#[cfg(test)]
mod tests {
    use super::output::write_summary;
    use super::output::write_summary_file;
    use super::summarize;
    use super::RawTrialLog;
    use super::TaskVariant;

    const WM_LOG: &str = "GetReady.OffsetTime,BlockType,StimType,Stim.OnsetTime,Stim.RT,Stim.ACC
12000,,,,,
,0back,Target,14000,520,1
,2back,Foil,16500,0,1
,0back,Foil,19000,0,1
,2back,Target,21500,733,0
,0back,Target,24000,610,1
,2back,Target,26500,689,1
";

    #[test]
    fn summarizes_working_memory_log() {
        let table = summarize(
            &RawTrialLog::from_reader(WM_LOG.as_bytes()).unwrap(),
            &TaskVariant::wm(),
        )
        .unwrap();
        let mut out = vec![];
        write_summary(&table, &mut out).unwrap();
        assert_eq!(
            "BlockType,StimType,Condition,OnsetsSec,DurationsSec,Accuracy,PctAccuracy,RTms,MeanCorrectRTms,MedianCorrectRTms
0back,Foil,0back_Foil,[7.0],[2.5],[1],100.0,[0],0,0
0back,Target,0back_Target,\"[2.0, 12.0]\",\"[2.5, 2.5]\",\"[1, 1]\",100.0,\"[520, 610]\",565,565
2back,Foil,2back_Foil,[4.5],[2.5],[1],100.0,[0],0,0
2back,Target,2back_Target,\"[9.5, 14.5]\",\"[2.5, 2.5]\",\"[0, 1]\",50.0,\"[733, 689]\",689,689
",
            String::from_utf8(out).unwrap()
        );
    }

    fn summarize_bytes(input: &[u8]) -> Vec<u8> {
        let table = summarize(
            &RawTrialLog::from_reader(input).unwrap(),
            &TaskVariant::wm(),
        )
        .unwrap();
        let mut out = vec![];
        write_summary(&table, &mut out).unwrap();
        out
    }

    #[test]
    fn same_log_gives_same_summary_bytes() {
        assert_eq!(
            summarize_bytes(WM_LOG.as_bytes()),
            summarize_bytes(WM_LOG.as_bytes())
        );
    }

    #[test]
    fn same_log_gives_same_summary_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("WM-123456-1.csv");
        std::fs::write(&input, WM_LOG).unwrap();
        let output = dir.path().join("WM-123456-1_summary.csv");
        let mut written = vec![];
        for _ in 0..2 {
            let table = summarize(
                &RawTrialLog::from_path(&input).unwrap(),
                &TaskVariant::wm(),
            )
            .unwrap();
            write_summary_file(&table, &output).unwrap();
            written.push(std::fs::read(&output).unwrap());
        }
        assert_eq!(written[0], written[1]);
        assert_eq!(summarize_bytes(WM_LOG.as_bytes()), written[0]);
    }
}

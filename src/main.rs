use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trial_summary::archive::{upload_log, DirectoryArchive, UploadOutcome};
use trial_summary::output::{output_path, write_summary, write_summary_file};
use trial_summary::report::{render_report, Label};
use trial_summary::{summarize, RawTrialLog, TaskVariant};

#[derive(Parser)]
#[command(name = "trial-summary", version, about)]
struct Cli {
    /// Log more detail (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce an E-Prime CSV to per-condition onsets, accuracy and reaction times.
    Summarize {
        #[arg(value_enum)]
        task: Task,

        /// CSV file from the E-Prime converter.
        #[arg(value_name = "EPRIME_CSV")]
        eprime_csv: PathBuf,

        /// Output directory for oddball and wm, output CSV file for the others.
        #[arg(short, long, visible_aliases = ["outdir", "outcsv"])]
        output: Option<PathBuf>,

        /// Also print the summary table.
        #[arg(long)]
        print: bool,
    },
    /// Format a summary CSV as a text report.
    Report {
        #[arg(short, long)]
        incsv: PathBuf,

        /// Report file; printed when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Header line such as subject=123456. Repeatable.
        #[arg(long = "label", value_name = "KEY=VALUE")]
        labels: Vec<Label>,
    },
    /// Store an E-Prime .txt log as the EPRIME_TXT resource of its scan.
    Upload {
        #[arg(long)]
        eprime_txt: PathBuf,

        #[arg(long)]
        project: String,

        /// Archive root laid out as <project>/<session>/<scan>/<resource>.
        #[arg(long)]
        archive: PathBuf,

        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Task {
    Oddball,
    OddballOld,
    Spt,
    SptEsop,
    Wm,
}

impl Task {
    fn variant(self) -> TaskVariant {
        match self {
            Task::Oddball => TaskVariant::oddball(),
            Task::OddballOld => TaskVariant::oddball_old(),
            Task::Spt => TaskVariant::spt(),
            Task::SptEsop => TaskVariant::spt_esop(),
            Task::Wm => TaskVariant::wm(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Commands::Summarize {
            task,
            eprime_csv,
            output,
            print,
        } => {
            let variant = task.variant();
            let log = RawTrialLog::from_path(&eprime_csv)
                .with_context(|| format!("reading {}", eprime_csv.display()))?;
            let table = summarize(&log, &variant).with_context(|| {
                format!("summarizing {} as {}", eprime_csv.display(), variant.name)
            })?;
            if print {
                write_summary(&table, std::io::stdout().lock())?;
            }
            let out = output_path(variant.output_naming, &eprime_csv, output.as_deref());
            write_summary_file(&table, &out)
                .with_context(|| format!("writing {}", out.display()))?;
        }
        Commands::Report {
            incsv,
            out,
            labels,
        } => {
            let summary = fs::File::open(&incsv)
                .with_context(|| format!("opening {}", incsv.display()))?;
            let report = render_report(summary, &labels)
                .with_context(|| format!("rendering {}", incsv.display()))?;
            match out {
                Some(path) => {
                    fs::write(&path, report)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "wrote report");
                }
                None => print!("{report}"),
            }
        }
        Commands::Upload {
            eprime_txt,
            project,
            archive,
            overwrite,
        } => {
            let archive = DirectoryArchive::new(archive);
            let outcome = upload_log(&archive, &eprime_txt, &project, overwrite)
                .with_context(|| format!("uploading {}", eprime_txt.display()))?;
            match outcome {
                UploadOutcome::Uploaded { scan } => {
                    println!("uploaded to {}/{}/{}", scan.project, scan.session, scan.label)
                }
                UploadOutcome::Skipped(reason) => println!("skipped: {reason:?}"),
            }
        }
    }
    Ok(())
}

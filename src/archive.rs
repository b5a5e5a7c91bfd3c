//! Routing of raw E-Prime `.txt` logs to the matching scan in a research data
//! archive. The routing key comes from the file name alone:
//!
//! ```text
//! Oddball-123456-1-run 1.txt  ->  session 123456, scan oddball1*
//! SPT-123456-1.txt            ->  session 123456, scan spt1*
//! WM-123456-2-run3.txt        ->  session 123456, scan wm2*
//! ```
//!
//! Nothing is uploaded when no scan or several scans match, or when the scan
//! already holds the resource and overwriting was not requested. Those cases
//! are reported back for manual handling rather than treated as failures.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

pub const RESOURCE: &str = "EPRIME_TXT";

static LOG_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<task>.*?)-(?P<session>.*?)-(?P<run>\d).*\.txt$").expect("valid pattern")
});

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("file name {0:?} is not of the form <task>-<session>-<run>...txt")]
    UnrecognizedFileName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogFileName {
    pub task: String,
    pub session: String,
    pub run: u32,
}

impl LogFileName {
    pub fn parse(path: &Path) -> Result<Self, ArchiveError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let captures = LOG_FILE_NAME
            .captures(&name)
            .ok_or_else(|| ArchiveError::UnrecognizedFileName(name.clone()))?;
        let run = captures["run"]
            .parse()
            .map_err(|_| ArchiveError::UnrecognizedFileName(name.clone()))?;
        Ok(LogFileName {
            task: captures["task"].to_string(),
            session: captures["session"].to_string(),
            run,
        })
    }

    pub fn scan_prefix(&self) -> String {
        format!("{}{}", self.task.to_lowercase(), self.run)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanRef {
    pub project: String,
    pub session: String,
    pub label: String,
}

pub trait ScanArchive {
    fn scans(&self, project: &str, session: &str) -> Result<Vec<ScanRef>, ArchiveError>;

    fn has_resource(&self, scan: &ScanRef, resource: &str) -> Result<bool, ArchiveError>;

    /// Replaces any existing resource of the same name.
    fn put_resource(&self, scan: &ScanRef, resource: &str, file: &Path)
        -> Result<(), ArchiveError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoMatchingScan { prefix: String },
    AmbiguousScan { prefix: String, matches: Vec<String> },
    ResourceExists { scan: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Uploaded { scan: ScanRef },
    Skipped(SkipReason),
}

pub fn upload_log<A: ScanArchive>(
    archive: &A,
    file: &Path,
    project: &str,
    overwrite: bool,
) -> Result<UploadOutcome, ArchiveError> {
    let name = LogFileName::parse(file)?;
    let prefix = name.scan_prefix();
    info!(
        project,
        session = %name.session,
        task = %name.task,
        run = name.run,
        "looking for scans matching {prefix}*"
    );

    let mut matches = archive
        .scans(project, &name.session)?
        .into_iter()
        .filter(|scan| scan.label.to_lowercase().starts_with(&prefix))
        .collect::<Vec<_>>();
    let scan = match matches.len() {
        0 => {
            warn!(session = %name.session, "no scan matches {prefix}*, not uploading");
            return Ok(UploadOutcome::Skipped(SkipReason::NoMatchingScan { prefix }));
        }
        1 => matches.remove(0),
        _ => {
            let labels = matches.into_iter().map(|s| s.label).collect::<Vec<_>>();
            warn!(
                session = %name.session,
                "{} scans match {prefix}*, not uploading: {labels:?}",
                labels.len()
            );
            return Ok(UploadOutcome::Skipped(SkipReason::AmbiguousScan {
                prefix,
                matches: labels,
            }));
        }
    };

    if !overwrite && archive.has_resource(&scan, RESOURCE)? {
        warn!(
            scan = %scan.label,
            "{RESOURCE} already present and overwrite not requested, not uploading"
        );
        return Ok(UploadOutcome::Skipped(SkipReason::ResourceExists {
            scan: scan.label,
        }));
    }

    archive.put_resource(&scan, RESOURCE, file)?;
    info!(scan = %scan.label, file = %file.display(), "uploaded {RESOURCE}");
    Ok(UploadOutcome::Uploaded { scan })
}

/// An archive mirrored on disk as `<root>/<project>/<session>/<scan>/<resource>/<file>`.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryArchive { root: root.into() }
    }

    fn resource_dir(&self, scan: &ScanRef, resource: &str) -> PathBuf {
        self.root
            .join(&scan.project)
            .join(&scan.session)
            .join(&scan.label)
            .join(resource)
    }
}

impl ScanArchive for DirectoryArchive {
    fn scans(&self, project: &str, session: &str) -> Result<Vec<ScanRef>, ArchiveError> {
        let session_dir = self.root.join(project).join(session);
        if !session_dir.is_dir() {
            return Ok(vec![]);
        }
        let mut scans = vec![];
        for entry in fs::read_dir(&session_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                scans.push(ScanRef {
                    project: project.to_string(),
                    session: session.to_string(),
                    label: entry.file_name().to_string_lossy().into_owned(),
                });
            }
        }
        scans.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(scans)
    }

    fn has_resource(&self, scan: &ScanRef, resource: &str) -> Result<bool, ArchiveError> {
        Ok(self.resource_dir(scan, resource).is_dir())
    }

    fn put_resource(
        &self,
        scan: &ScanRef,
        resource: &str,
        file: &Path,
    ) -> Result<(), ArchiveError> {
        let dir = self.resource_dir(scan, resource);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        let name = file
            .file_name()
            .ok_or_else(|| ArchiveError::UnrecognizedFileName(file.display().to_string()))?;
        fs::copy(file, dir.join(name))?;
        Ok(())
    }
}

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use colored::Colorize;

use crate::actions::Action;
use crate::hasher::ContentSignature;

/// One executed action, as handed to the audit logger.
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub action: Action,
    pub duplicate: &'a Path,
    pub master: &'a Path,
    pub size: u64,
    pub signature: &'a ContentSignature,
    pub success: bool,
    pub error: &'a str,
}

/// Called once per executed action. File format and rotation live outside
/// the core; this trait only delivers the facts.
pub trait AuditLogger {
    fn record(&mut self, record: &AuditRecord);
}

/// Logger that discards everything, used when no audit log is configured.
pub struct NullAuditLogger;

impl AuditLogger for NullAuditLogger {
    fn record(&mut self, _record: &AuditRecord) {}
}

/// Appends one timestamped tab-separated line per action to a log file.
pub struct FileAuditLogger {
    path: PathBuf,
    writer: BufWriter<std::fs::File>,
}

impl FileAuditLogger {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }
}

impl AuditLogger for FileAuditLogger {
    fn record(&mut self, record: &AuditRecord) {
        let line = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            Local::now().to_rfc3339(),
            record.action.name(),
            record.duplicate.display(),
            record.master.display(),
            record.size,
            record.signature,
            if record.success { "ok" } else { "failed" },
            record.error,
        );
        if let Err(e) = writeln!(self.writer, "{}", line).and_then(|_| self.writer.flush()) {
            eprintln!(
                "{} cannot write audit log {}: {}",
                "warning:".yellow().bold(),
                self.path.display(),
                e
            );
        }
    }
}

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use crate::actions::{Action, ExecSummary};
use crate::grouping::DuplicateGroup;
use crate::interactive::Decision;
use crate::linkstate;
use crate::util::{format_bytes, format_number};

/// One duplicate group prepared for output
#[derive(Debug, Clone, Serialize)]
pub struct GroupEntry {
    pub signature: String,
    /// Size of each file in the group
    pub size: u64,
    pub master: PathBuf,
    pub duplicates: Vec<PathBuf>,
    /// Bytes freed by deduplicating this group, excluding pairs that
    /// already share storage with the master
    pub reclaimable_bytes: u64,
    /// Duplicates already hard-linked to the master
    pub already_linked: usize,
}

/// Aggregate numbers for the report header
#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    pub total_files: usize,
    pub group_count: usize,
    pub duplicate_files: usize,
    pub reclaimable_bytes: u64,
    pub already_linked: usize,
}

/// Complete description of what a comparison run found
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub stats: ReportStats,
    pub groups: Vec<GroupEntry>,
}

impl DuplicateReport {
    /// Build a report, checking each duplicate's link state so space that is
    /// already shared with the master is not counted as reclaimable.
    pub fn from_groups(groups: &[DuplicateGroup], total_files: usize) -> Self {
        let mut entries = Vec::with_capacity(groups.len());
        let mut duplicate_files = 0;
        let mut reclaimable_total = 0u64;
        let mut already_linked_total = 0;

        for group in groups {
            let mut reclaimable = 0u64;
            let mut already_linked = 0;
            for duplicate in &group.duplicates {
                if linkstate::is_hardlink_to(&duplicate.path, &group.master.path) {
                    already_linked += 1;
                } else {
                    reclaimable += group.size;
                }
            }

            duplicate_files += group.duplicates.len();
            reclaimable_total += reclaimable;
            already_linked_total += already_linked;

            entries.push(GroupEntry {
                signature: group.signature.to_string(),
                size: group.size,
                master: group.master.path.clone(),
                duplicates: group.duplicates.iter().map(|d| d.path.clone()).collect(),
                reclaimable_bytes: reclaimable,
                already_linked,
            });
        }

        Self {
            stats: ReportStats {
                total_files,
                group_count: groups.len(),
                duplicate_files,
                reclaimable_bytes: reclaimable_total,
                already_linked: already_linked_total,
            },
            groups: entries,
        }
    }
}

/// Rendering seam between the core and the terminal.
///
/// One implementation is chosen at startup and passed by reference; the core
/// never branches on output mode itself.
pub trait Formatter {
    fn render_group(&self, index: usize, total: usize, group: &DuplicateGroup) -> String;
    fn render_prompt(&self, action: Action) -> String;
    fn render_status(&self, group: &DuplicateGroup, decision: Decision) -> String;
    fn render_remaining(&self, action: Action, remaining: usize) -> String;
    fn render_report(&self, report: &DuplicateReport) -> String;
    fn render_summary(&self, summary: &ExecSummary) -> String;
}

/// Colored, human-readable rendering
pub struct HumanFormatter;

impl Formatter for HumanFormatter {
    fn render_group(&self, index: usize, total: usize, group: &DuplicateGroup) -> String {
        let mut out = format!(
            "\n{} {} ({} each)\n  {} {}\n",
            format!("Group {}/{}:", format_number(index + 1), format_number(total)).bold(),
            format!("{} duplicates", format_number(group.duplicates.len())).cyan(),
            format_bytes(group.size).yellow(),
            "master".green(),
            group.master.path.display()
        );
        for duplicate in &group.duplicates {
            out.push_str(&format!("  dup    {}\n", duplicate.path.display()));
        }
        out
    }

    fn render_prompt(&self, action: Action) -> String {
        format!(
            "Apply {} to this group? [y]es / [n]o / [a]ll / [q]uit: ",
            action.name().bold()
        )
    }

    fn render_status(&self, group: &DuplicateGroup, decision: Decision) -> String {
        let tag = match decision {
            Decision::Yes => "[confirmed]".green(),
            Decision::No => "[skipped]".blue(),
            Decision::All => "[confirmed all]".green(),
            Decision::Quit => "[quit]".yellow(),
        };
        format!("{} {}", tag, group.master.path.display())
    }

    fn render_remaining(&self, action: Action, remaining: usize) -> String {
        format!(
            "Applying {} to {} remaining group(s) without prompting.",
            action.name().bold(),
            format_number(remaining)
        )
    }

    fn render_report(&self, report: &DuplicateReport) -> String {
        let mut out = format!("\n{}\n", "Duplicate Report".bold().underline());
        out.push_str(&format!(
            "  Scanned: {} files\n",
            format_number(report.stats.total_files).cyan()
        ));
        out.push_str(&format!(
            "  Duplicate groups: {}\n",
            format_number(report.stats.group_count).cyan()
        ));
        out.push_str(&format!(
            "  Duplicate files: {}\n",
            format_number(report.stats.duplicate_files).cyan()
        ));
        out.push_str(&format!(
            "  Already linked: {}\n",
            format_number(report.stats.already_linked).blue()
        ));
        out.push_str(&format!(
            "  Reclaimable space: {}\n",
            format_bytes(report.stats.reclaimable_bytes).yellow()
        ));

        if report.groups.is_empty() {
            out.push_str(&format!("\n{}\n", "No duplicates found.".green()));
            return out;
        }

        for (i, group) in report.groups.iter().enumerate() {
            out.push_str(&format!(
                "\n{} {} ({} each, {} reclaimable)\n",
                format!("Group {}:", format_number(i + 1)).bold(),
                format!("{} duplicates", format_number(group.duplicates.len())).cyan(),
                format_bytes(group.size).yellow(),
                format_bytes(group.reclaimable_bytes).yellow()
            ));
            out.push_str(&format!("  master {}\n", group.master.display()));
            for path in &group.duplicates {
                out.push_str(&format!("  dup    {}\n", path.display()));
            }
        }
        out
    }

    fn render_summary(&self, summary: &ExecSummary) -> String {
        let mut out = format!("\n{}\n", "Action Summary".bold().underline());
        out.push_str(&format!(
            "  Succeeded: {}\n",
            format_number(summary.succeeded).green()
        ));
        out.push_str(&format!(
            "  Skipped (already linked): {}\n",
            format_number(summary.skipped).blue()
        ));
        out.push_str(&format!(
            "  Failed: {}\n",
            format_number(summary.failed).red()
        ));
        out.push_str(&format!(
            "  Space saved: {}\n",
            format_bytes(summary.bytes_saved).yellow()
        ));

        if !summary.failures.is_empty() {
            out.push_str(&format!("\n{}\n", "Failures".bold()));
            for failure in &summary.failures {
                out.push_str(&format!(
                    "  {}: {}\n",
                    failure.path.display(),
                    failure.reason
                ));
            }
        }
        out
    }
}

/// Machine-readable JSON rendering
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn render_group(&self, index: usize, total: usize, group: &DuplicateGroup) -> String {
        json!({
            "group": index + 1,
            "of": total,
            "signature": group.signature.to_string(),
            "size": group.size,
            "master": group.master.path,
            "duplicates": group.duplicates.iter().map(|d| d.path.clone()).collect::<Vec<_>>(),
        })
        .to_string()
    }

    fn render_prompt(&self, action: Action) -> String {
        format!(
            "Apply {} to this group? [y]es / [n]o / [a]ll / [q]uit: ",
            action.name()
        )
    }

    fn render_status(&self, group: &DuplicateGroup, decision: Decision) -> String {
        json!({
            "master": group.master.path,
            "decision": decision.name(),
        })
        .to_string()
    }

    fn render_remaining(&self, action: Action, remaining: usize) -> String {
        json!({
            "auto_confirm": true,
            "action": action.name(),
            "remaining": remaining,
        })
        .to_string()
    }

    fn render_report(&self, report: &DuplicateReport) -> String {
        serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }

    fn render_summary(&self, summary: &ExecSummary) -> String {
        json!({
            "succeeded": summary.succeeded,
            "skipped": summary.skipped,
            "failed": summary.failed,
            "bytes_saved": summary.bytes_saved,
            "failures": summary.failures.iter().map(|f| json!({
                "path": f.path,
                "reason": f.reason,
            })).collect::<Vec<_>>(),
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{ContentSignature, HashAlgorithm};
    use crate::scanner::FileRecord;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    fn record(path: PathBuf, size: u64) -> FileRecord {
        FileRecord {
            path,
            root: PathBuf::from("/"),
            size,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    fn group_of(master: PathBuf, duplicates: Vec<PathBuf>, size: u64) -> DuplicateGroup {
        DuplicateGroup {
            signature: ContentSignature {
                algorithm: HashAlgorithm::Blake3,
                digest: "cafe".to_string(),
            },
            size,
            master: record(master, size),
            duplicates: duplicates.into_iter().map(|p| record(p, size)).collect(),
        }
    }

    #[test]
    fn test_report_counts_reclaimable_space() {
        let temp = TempDir::new().unwrap();
        let content = b"duplicate content";
        let master = create_file(temp.path(), "master.txt", content);
        let dup = create_file(temp.path(), "dup.txt", content);

        let groups = vec![group_of(master, vec![dup], content.len() as u64)];
        let report = DuplicateReport::from_groups(&groups, 2);

        assert_eq!(report.stats.duplicate_files, 1);
        assert_eq!(report.stats.reclaimable_bytes, content.len() as u64);
        assert_eq!(report.stats.already_linked, 0);
    }

    #[test]
    fn test_report_excludes_already_hardlinked_pairs() {
        let temp = TempDir::new().unwrap();
        let content = b"duplicate content";
        let master = create_file(temp.path(), "master.txt", content);
        let dup = temp.path().join("dup.txt");
        fs::hard_link(&master, &dup).unwrap();

        let groups = vec![group_of(master, vec![dup], content.len() as u64)];
        let report = DuplicateReport::from_groups(&groups, 2);

        assert_eq!(report.stats.reclaimable_bytes, 0);
        assert_eq!(report.stats.already_linked, 1);
        assert_eq!(report.groups[0].reclaimable_bytes, 0);
    }

    #[test]
    fn test_json_report_is_valid_json() {
        let temp = TempDir::new().unwrap();
        let content = b"duplicate content";
        let master = create_file(temp.path(), "master.txt", content);
        let dup = create_file(temp.path(), "dup.txt", content);

        let groups = vec![group_of(master, vec![dup], content.len() as u64)];
        let report = DuplicateReport::from_groups(&groups, 2);

        let rendered = JsonFormatter.render_report(&report);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(value["stats"]["total_files"].is_number());
        assert_eq!(value["groups"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_human_report_mentions_counts() {
        let report = DuplicateReport {
            stats: ReportStats {
                total_files: 10,
                group_count: 0,
                duplicate_files: 0,
                reclaimable_bytes: 0,
                already_linked: 0,
            },
            groups: vec![],
        };

        let rendered = HumanFormatter.render_report(&report);
        assert!(rendered.contains("Duplicate Report"));
        assert!(rendered.contains("No duplicates found."));
    }

    #[test]
    fn test_remaining_rendering_stays_machine_readable_in_json() {
        let human = HumanFormatter.render_remaining(Action::Delete, 3);
        assert!(human.contains("3 remaining group(s)"));

        let machine = JsonFormatter.render_remaining(Action::Delete, 3);
        let value: serde_json::Value = serde_json::from_str(&machine).unwrap();
        assert_eq!(value["auto_confirm"], true);
        assert_eq!(value["action"], "delete");
        assert_eq!(value["remaining"], 3);
    }

    #[test]
    fn test_group_rendering_lists_master_and_duplicates() {
        let group = group_of(
            PathBuf::from("/data/master.txt"),
            vec![PathBuf::from("/data/dup.txt")],
            17,
        );

        let human = HumanFormatter.render_group(0, 1, &group);
        assert!(human.contains("/data/master.txt"));
        assert!(human.contains("/data/dup.txt"));

        let machine = JsonFormatter.render_group(0, 1, &group);
        let value: serde_json::Value = serde_json::from_str(&machine).unwrap();
        assert_eq!(value["master"], "/data/master.txt");
    }
}

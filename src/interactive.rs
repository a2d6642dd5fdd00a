use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::actions::{self, Action, ExecOptions, ExecSummary};
use crate::audit::AuditLogger;
use crate::grouping::DuplicateGroup;
use crate::output::Formatter;
use crate::progress::ProgressReporter;

/// Per-group answer in the confirmation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
    All,
    Quit,
}

impl Decision {
    pub fn name(&self) -> &'static str {
        match self {
            Decision::Yes => "yes",
            Decision::No => "no",
            Decision::All => "all",
            Decision::Quit => "quit",
        }
    }
}

/// Parse a user response. Case-insensitive, accepts short and long forms;
/// anything else (including empty input) is rejected.
pub fn parse_decision(input: &str) -> Option<Decision> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(Decision::Yes),
        "n" | "no" => Some(Decision::No),
        "a" | "all" => Some(Decision::All),
        "q" | "quit" => Some(Decision::Quit),
        _ => None,
    }
}

/// Outcome of an interactive run, tracked separately from per-file results
#[derive(Debug, Default)]
pub struct InteractiveSummary {
    pub confirmed_groups: usize,
    pub skipped_groups: usize,
    pub quit_early: bool,
    /// Groups left unprocessed when the user quit
    pub remaining_groups: usize,
    pub exec: ExecSummary,
}

/// Drive per-group confirmations, executing each confirmed group immediately.
///
/// `y` executes the group and moves on, `n` skips it, `a` executes it and
/// every remaining group without further prompts or display, `q` stops with
/// already-executed groups left as they are. Invalid input is re-prompted
/// inline without re-rendering the group; end of input behaves like `q`, so
/// an interrupted stdin never confirms anything.
pub fn run_confirmation<R: BufRead>(
    groups: &[DuplicateGroup],
    action: Action,
    opts: &ExecOptions,
    input: &mut R,
    formatter: &dyn Formatter,
    audit: &mut dyn AuditLogger,
    progress: &dyn ProgressReporter,
) -> InteractiveSummary {
    let total = groups.len();
    let mut summary = InteractiveSummary::default();
    let mut auto_confirm = false;

    for (i, group) in groups.iter().enumerate() {
        if auto_confirm {
            let exec =
                actions::execute_all(std::slice::from_ref(group), action, opts, audit, progress);
            summary.exec.merge(exec);
            summary.confirmed_groups += 1;
            continue;
        }

        print!("{}", formatter.render_group(i, total, group));

        let decision = loop {
            print!("{}", formatter.render_prompt(action));
            let _ = io::stdout().flush();

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => break Decision::Quit,
                Ok(_) => match parse_decision(&line) {
                    Some(decision) => break decision,
                    None => {
                        eprintln!("{} answer y(es), n(o), a(ll) or q(uit)", "invalid:".red());
                    }
                },
                Err(_) => break Decision::Quit,
            }
        };

        println!("{}", formatter.render_status(group, decision));

        match decision {
            Decision::Yes => {
                let exec = actions::execute_all(
                    std::slice::from_ref(group),
                    action,
                    opts,
                    audit,
                    progress,
                );
                summary.exec.merge(exec);
                summary.confirmed_groups += 1;
            }
            Decision::No => {
                summary.skipped_groups += 1;
            }
            Decision::All => {
                let exec = actions::execute_all(
                    std::slice::from_ref(group),
                    action,
                    opts,
                    audit,
                    progress,
                );
                summary.exec.merge(exec);
                summary.confirmed_groups += 1;
                auto_confirm = true;

                let remaining = total - i - 1;
                if remaining > 0 {
                    println!("{}", formatter.render_remaining(action, remaining));
                }
            }
            Decision::Quit => {
                summary.quit_early = true;
                summary.remaining_groups = total - i;
                break;
            }
        }
    }

    summary
}

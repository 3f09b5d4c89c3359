use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;

use mdt_diff::{
    diff_lines, hunks, render_patch, render_unified, split_lines, CancellationToken,
    CommentSyntax, DiffHunk, DiffOptions, IgnoreOptions, JsonDiff, LineKind,
};
use mdt_sync::{
    compare_trees, compare_trees_three_way, plan_sync, SyncOp, SyncPolicy, TreeVerdict,
    VerdictStatus,
};

use crate::cli::*;
use crate::content::{load_file, scan_tree, FileContent};

/// Exit codes: 0 no differences, 1 differences or conflicts, 2 error.
pub fn run_command(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Diff(args) => cmd_diff(args),
        Command::Merge(args) => cmd_merge(args),
        Command::Sync(args) => cmd_sync(args),
    }
}

fn diff_options(flags: &IgnoreFlags, path: &Path, max_units: Option<usize>) -> DiffOptions {
    let comments = if flags.ignore_comments {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(CommentSyntax::for_extension)
    } else {
        None
    };
    DiffOptions {
        ignore: IgnoreOptions {
            whitespace: flags.ignore_whitespace,
            case: flags.ignore_case,
            blank_lines: flags.ignore_blank_lines,
            comments,
        },
        max_units: max_units.unwrap_or(mdt_diff::DEFAULT_MAX_UNITS),
    }
}

fn cmd_diff(args: DiffArgs) -> anyhow::Result<i32> {
    let left_meta = fs::metadata(&args.left)
        .with_context(|| format!("cannot open {}", args.left.display()))?;
    let right_meta = fs::metadata(&args.right)
        .with_context(|| format!("cannot open {}", args.right.display()))?;
    match (left_meta.is_dir(), right_meta.is_dir()) {
        (true, true) => diff_dirs(&args),
        (false, false) => diff_files(&args.left, &args.right, &args),
        _ => bail!(
            "cannot compare a file with a directory: {} and {}",
            args.left.display(),
            args.right.display()
        ),
    }
}

fn diff_files(left: &Path, right: &Path, args: &DiffArgs) -> anyhow::Result<i32> {
    let left_content = load_file(left)?;
    let right_content = load_file(right)?;
    let (left_text, right_text) = match (&left_content, &right_content) {
        (FileContent::Binary { hash: lh }, FileContent::Binary { hash: rh }) => {
            if lh == rh {
                return Ok(0);
            }
            println!("Binary files {} and {} differ", left.display(), right.display());
            return Ok(1);
        }
        (FileContent::Binary { .. }, _) | (_, FileContent::Binary { .. }) => {
            println!("Binary files {} and {} differ", left.display(), right.display());
            return Ok(1);
        }
        (FileContent::Text { text: lt, .. }, FileContent::Text { text: rt, .. }) => (lt, rt),
    };

    let options = diff_options(&args.ignore, left, args.max_units);
    let token = CancellationToken::new();
    let diff = diff_lines(left_text, right_text, &options, &token)?;
    if diff.is_identity() {
        return Ok(0);
    }

    let old = split_lines(left_text);
    let new = split_lines(right_text);
    let hunk_list = hunks(&diff, &old, &new, args.context);
    let left_label = left.display().to_string();
    let right_label = right.display().to_string();
    match args.format {
        DiffFormat::Text => {
            println!("{} {} {}", "---".bold(), left_label.red().bold(), "(old)".dimmed());
            println!("{} {} {}", "+++".bold(), right_label.green().bold(), "(new)".dimmed());
            print_text_hunks(&hunk_list);
        }
        DiffFormat::Patch => print!("{}", render_patch(&hunk_list, &left_label, &right_label)),
        DiffFormat::Unified => print!("{}", render_unified(&hunk_list)),
        DiffFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&JsonDiff { hunks: hunk_list })?)
        }
    }
    Ok(1)
}

fn print_text_hunks(hunk_list: &[DiffHunk]) {
    for hunk in hunk_list {
        let header = format!(
            "@@ -{},{} +{},{} @@",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        );
        println!("{}", header.cyan());
        for line in &hunk.lines {
            match line.kind {
                LineKind::Equal => println!(" {}", line.text),
                LineKind::Insert => println!("{}", format!("+{}", line.text).green()),
                LineKind::Delete => println!("{}", format!("-{}", line.text).red()),
                LineKind::Replace => {
                    // Replace emits the old side first, then the new side.
                    if line.old_line.is_some() {
                        println!("{}", format!("-{}", line.text).red());
                    } else {
                        println!("{}", format!("+{}", line.text).green());
                    }
                }
            }
        }
    }
}

fn diff_dirs(args: &DiffArgs) -> anyhow::Result<i32> {
    let left_entries = scan_tree(&args.left, &args.ignore_patterns)?;
    let right_entries = scan_tree(&args.right, &args.ignore_patterns)?;
    let verdicts = compare_trees(&left_entries, &right_entries);

    if matches!(args.format, DiffFormat::Json) {
        let changed: Vec<&TreeVerdict> =
            verdicts.iter().filter(|v| v.status != VerdictStatus::Identical).collect();
        println!("{}", serde_json::to_string_pretty(&changed)?);
        return Ok(if changed.is_empty() { 0 } else { 1 });
    }

    let mut differences = 0;
    for verdict in &verdicts {
        match &verdict.status {
            VerdictStatus::Identical => continue,
            VerdictStatus::LeftOnly => {
                println!("{} {}", "only in left: ".yellow(), verdict.path.bold());
            }
            VerdictStatus::RightOnly => {
                println!("{} {}", "only in right:".yellow(), verdict.path.bold());
            }
            VerdictStatus::Modified { type_mismatch: true } => {
                println!("{} {}", "type mismatch:".red(), verdict.path.bold());
            }
            VerdictStatus::Modified { type_mismatch: false } => {
                println!("{} {}", "modified:     ".red(), verdict.path.bold());
                let left_path = args.left.join(&verdict.path);
                let right_path = args.right.join(&verdict.path);
                // A per-file failure is reported but does not abort the
                // remaining comparisons.
                if let Err(err) = diff_files(&left_path, &right_path, args) {
                    eprintln!("warning: {}: {err:#}", verdict.path);
                }
            }
            VerdictStatus::BaseOnly => continue,
        }
        differences += 1;
    }
    Ok(if differences == 0 { 0 } else { 1 })
}

fn load_text(path: &Path) -> anyhow::Result<String> {
    match load_file(path)? {
        FileContent::Text { text, .. } => Ok(text),
        FileContent::Binary { .. } => bail!("cannot merge binary file {}", path.display()),
    }
}

fn cmd_merge(args: MergeArgs) -> anyhow::Result<i32> {
    let base = load_text(&args.base)?;
    let left = load_text(&args.left)?;
    let right = load_text(&args.right)?;

    let options = diff_options(&args.ignore, &args.base, None);
    let token = CancellationToken::new();
    let merged = mdt_merge::merge(&base, &left, &right, &options, &token)?;

    if merged.is_clean() {
        let text = merged.materialize()?;
        write_output(args.output.as_deref(), &text)?;
        eprintln!("{} merged cleanly", "✓".green().bold());
        return Ok(0);
    }

    let count = merged.conflict_count();
    if args.marked {
        let left_label = args.left.display().to_string();
        let right_label = args.right.display().to_string();
        let text = merged.render_marked(&left_label, &right_label);
        write_output(args.output.as_deref(), &text)?;
        eprintln!("{} {count} conflict(s), markers emitted", "✗".red().bold());
        return Ok(1);
    }

    eprintln!("{} {count} conflict(s):", "✗".red().bold());
    for conflict in merged.conflicts() {
        eprintln!(
            "  base lines {}..{}:",
            conflict.base.start + 1,
            conflict.base.end.max(conflict.base.start + 1)
        );
        for line in merged.left_text(conflict) {
            eprintln!("    {} {}", "<".yellow(), line);
        }
        for line in merged.right_text(conflict) {
            eprintln!("    {} {}", ">".yellow(), line);
        }
    }
    Ok(1)
}

fn write_output(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

fn cmd_sync(args: SyncArgs) -> anyhow::Result<i32> {
    let left_entries = scan_tree(&args.left, &args.ignore_patterns)?;
    let right_entries = scan_tree(&args.right, &args.ignore_patterns)?;
    let verdicts = match &args.base {
        Some(base) => {
            let base_entries = scan_tree(base, &args.ignore_patterns)?;
            compare_trees_three_way(&base_entries, &left_entries, &right_entries)
        }
        None => compare_trees(&left_entries, &right_entries),
    };

    let policy = match args.policy {
        PolicyArg::Newer => SyncPolicy::PreferNewer,
        PolicyArg::Left => SyncPolicy::PreferLeft,
        PolicyArg::Right => SyncPolicy::PreferRight,
        PolicyArg::Manual => SyncPolicy::Manual,
    };
    let token = CancellationToken::new();
    let plan = plan_sync(&verdicts, policy, &token)?;

    if plan.actions.is_empty() {
        println!("Trees are in sync.");
        return Ok(0);
    }
    for action in &plan.actions {
        let (tag, op) = match &action.op {
            SyncOp::CopyLeftToRight => ("copy →".green(), "left to right"),
            SyncOp::CopyRightToLeft => ("copy ←".green(), "right to left"),
            SyncOp::Delete { side: mdt_sync::Side::Left } => ("delete".red(), "on left"),
            SyncOp::Delete { side: mdt_sync::Side::Right } => ("delete".red(), "on right"),
            SyncOp::Skip => ("skip  ".dimmed(), ""),
            SyncOp::Conflict => ("conflict".red().bold(), ""),
        };
        println!("  {tag} {} {op}  ({})", action.path.bold(), action.reason.dimmed());
    }
    let conflicts = plan.conflict_count();
    if conflicts > 0 {
        eprintln!("{} {conflicts} conflict(s) need manual resolution", "✗".red().bold());
    }
    Ok(if plan.is_empty() { 0 } else { 1 })
}

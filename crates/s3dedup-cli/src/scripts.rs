use anyhow::{Context, Result};
use chrono::Utc;
use s3dedup_core::analysis::rename_plan::RenamePlan;
use s3dedup_core::model::RetentionDecision;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Where the generated commands act.
#[derive(Debug, Clone)]
pub struct ScriptTarget {
    pub bucket: String,
    pub endpoint_url: Option<String>,
}

/// Single-quote `value` for bash.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Script deleting every drop candidate. The kept key of each group is
/// listed in a comment above its deletions.
pub fn deletion_script(decisions: &[RetentionDecision], target: &ScriptTarget) -> String {
    let total: usize = decisions.iter().map(|d| d.drop.len()).sum();
    let mut script = header(
        target,
        &format!("Deletes {} duplicate objects in {} groups.", total, decisions.len()),
    );

    for (i, decision) in decisions.iter().enumerate() {
        let _ = writeln!(script, "\n# group {}: keep {}", i + 1, shell_quote(&decision.keep));
        for key in &decision.drop {
            let _ = writeln!(
                script,
                "run aws s3api delete-object ${{S3_ARGS[@]+\"${{S3_ARGS[@]}}\"}} --bucket \"$BUCKET\" --key {}",
                shell_quote(key)
            );
        }
    }
    script
}

/// Script applying every rename of `plan`. Renames moved to a suffixed
/// target and keys left in place are annotated.
pub fn rename_script(plan: &RenamePlan, target: &ScriptTarget) -> String {
    let mut script = header(
        target,
        &format!(
            "Renames {} of {} objects ({} conflicts resolved).",
            plan.rename_count(),
            plan.entries.len(),
            plan.conflicts_resolved
        ),
    );
    script.push('\n');

    for entry in plan.renames() {
        if entry.conflict_resolved() {
            let _ = writeln!(
                script,
                "# conflict resolved: {} is taken",
                shell_quote(&entry.proposed)
            );
        }
        let _ = writeln!(
            script,
            "run aws s3 mv ${{S3_ARGS[@]+\"${{S3_ARGS[@]}}\"}} \"s3://$BUCKET/\"{} \"s3://$BUCKET/\"{}",
            shell_quote(&entry.original),
            shell_quote(&entry.target)
        );
    }
    for failure in &plan.failures {
        let _ = writeln!(
            script,
            "# skipped {}: {}",
            shell_quote(&failure.key),
            failure.error
        );
    }
    script
}

/// Write `contents` to `path` and make it executable.
pub fn write_script(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("cannot write script {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("cannot make {} executable", path.display()))?;
    }
    Ok(())
}

fn header(target: &ScriptTarget, summary: &str) -> String {
    let s3_args = match &target.endpoint_url {
        Some(url) => format!("(--endpoint-url {})", shell_quote(url)),
        None => "()".to_string(),
    };
    format!(
        r#"#!/usr/bin/env bash
# Generated by s3dedup on {generated}
# {summary}
# Review before running. Nothing changes unless DRY_RUN=0.
set -euo pipefail

DRY_RUN="${{DRY_RUN:-1}}"
BUCKET={bucket}
S3_ARGS={s3_args}

run() {{
    if [ "$DRY_RUN" = "1" ]; then
        printf 'DRY RUN:'
        printf ' %q' "$@"
        printf '\n'
    else
        "$@"
    fi
}}
"#,
        generated = Utc::now().to_rfc3339(),
        summary = summary,
        bucket = shell_quote(&target.bucket),
        s3_args = s3_args,
    )
}

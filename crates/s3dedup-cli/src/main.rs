mod commands;
mod logging;
mod mirror;
mod progress;
mod report;
mod scripts;
mod snapshot;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, HashArgs, IndexArgs, ReportArgs, TargetArgs};
use dotenv::dotenv;
use progress::CliReporter;
use s3dedup_core::{AnalysisEngine, AppConfig, IndexSnapshot};
use scripts::ScriptTarget;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger(&logging::LogSettings::from_env());

    let config = match s3dedup_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Duplicates {
            index,
            hash,
            report,
        }) => run_duplicates(config, &index, &hash, &report),
        Some(Commands::Suspects {
            index,
            hash,
            report,
        }) => run_suspects(config, &index, &hash, &report),
        Some(Commands::Media {
            index,
            hash,
            tags,
            report,
        }) => run_media(config, &index, &hash, &tags, &report),
        Some(Commands::PlanDelete {
            index,
            hash,
            target,
            keep,
            output,
        }) => run_plan_delete(config, &index, &hash, &target, keep, &output),
        Some(Commands::Clean {
            index,
            target,
            rules,
            output,
        }) => run_clean(config, &index, &target, rules, &output),
        Some(Commands::Stats {
            index,
            hash,
            report,
        }) => run_stats(config, &index, &hash, &report),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn load(engine: &AnalysisEngine, index: &IndexArgs) -> Result<IndexSnapshot> {
    let snapshot = snapshot::load_index(&index.index)?;
    Ok(engine.prepare(&snapshot, index.prefix.as_deref())?)
}

fn with_hash_args(mut config: AppConfig, hash: &HashArgs) -> AppConfig {
    if let Some(workers) = hash.workers {
        config.hash_workers = workers;
    }
    if let Some(mirror) = &hash.mirror {
        config.mirror_root = Some(mirror.display().to_string());
    }
    config
}

fn mirror_root(config: &AppConfig) -> Option<PathBuf> {
    let root = config.mirror_root.as_ref().map(PathBuf::from);
    if root.is_none() {
        warn!("No mirror configured; ambiguous digests will be reported as unresolved");
    }
    root
}

fn resolve(
    engine: &AnalysisEngine,
    snapshot: &IndexSnapshot,
) -> s3dedup_core::analysis::duplicates::DuplicateReport {
    let hasher = mirror::hasher_for(mirror_root(engine.config()).as_deref());
    let reporter = CliReporter::new();
    let report = engine.duplicates(snapshot, &*hasher, &reporter);

    info!(
        "{} duplicate groups, {} bytes wasted, {} unresolved partitions",
        format!("{}", report.groups.len()).red(),
        format!("{}", report.wasted_bytes()).red(),
        format!("{}", report.unresolved.len()).yellow(),
    );
    report
}

fn run_duplicates(
    config: AppConfig,
    index: &IndexArgs,
    hash: &HashArgs,
    args: &ReportArgs,
) -> Result<()> {
    let engine = AnalysisEngine::new(with_hash_args(config, hash));
    let snapshot = load(&engine, index)?;
    let duplicates = resolve(&engine, &snapshot);
    report::emit(
        &report::render_duplicates(&duplicates, args.format)?,
        args.output.as_deref(),
    )
}

/// Fill in strong hashes for ambiguous candidates when a mirror is
/// available. Without one, ambiguous look-alikes stay unproven.
fn with_mirror_hashes(engine: &AnalysisEngine, snapshot: IndexSnapshot) -> IndexSnapshot {
    match mirror_root(engine.config()) {
        Some(root) => {
            let hasher = mirror::hasher_for(Some(&root));
            engine.with_resolved_hashes(&snapshot, &*hasher, &CliReporter::new())
        }
        None => snapshot,
    }
}

fn run_suspects(
    config: AppConfig,
    index: &IndexArgs,
    hash: &HashArgs,
    args: &ReportArgs,
) -> Result<()> {
    let engine = AnalysisEngine::new(with_hash_args(config, hash));
    let snapshot = with_mirror_hashes(&engine, load(&engine, index)?);
    let groups = engine.suspects(&snapshot);

    info!("{} suspect groups", format!("{}", groups.len()).yellow());
    report::emit(
        &report::render_suspects(&groups, args.format)?,
        args.output.as_deref(),
    )
}

fn run_media(
    config: AppConfig,
    index: &IndexArgs,
    hash: &HashArgs,
    tags: &Path,
    args: &ReportArgs,
) -> Result<()> {
    let engine = AnalysisEngine::new(with_hash_args(config, hash));
    let snapshot = with_mirror_hashes(&engine, load(&engine, index)?);
    let tags = snapshot::load_tags(tags)?;
    let media = engine.media(&snapshot, &tags);

    info!(
        "{} media groups, {} objects without usable tags",
        format!("{}", media.groups.len()).cyan(),
        format!("{}", media.excluded.len()).yellow(),
    );
    report::emit(
        &report::render_media(&media, args.format)?,
        args.output.as_deref(),
    )
}

fn run_plan_delete(
    mut config: AppConfig,
    index: &IndexArgs,
    hash: &HashArgs,
    target: &TargetArgs,
    keep: Option<String>,
    output: &Path,
) -> Result<()> {
    if let Some(keep) = keep {
        config.keep = keep;
    }
    let engine = AnalysisEngine::new(with_hash_args(config, hash));
    // Reject a bad policy before any hashing starts.
    let policy = engine.config().retention_policy()?;

    let snapshot = load(&engine, index)?;
    let duplicates = resolve(&engine, &snapshot);
    let decisions = engine.deletion_plan(&duplicates)?;

    let script = scripts::deletion_script(&decisions, &script_target(target));
    scripts::write_script(output, &script)?;
    info!(
        "Deletion script for {} groups written to {} (policy {})",
        format!("{}", decisions.len()).green(),
        output.display(),
        policy
    );
    if !duplicates.unresolved.is_empty() {
        warn!(
            "{} unresolved partitions were left out of the script",
            duplicates.unresolved.len()
        );
    }
    Ok(())
}

fn run_clean(
    mut config: AppConfig,
    index: &IndexArgs,
    target: &TargetArgs,
    rules: Vec<String>,
    output: &Path,
) -> Result<()> {
    if !rules.is_empty() {
        config.clean_rules = rules;
    }
    let engine = AnalysisEngine::new(config);
    let full = snapshot::load_index(&index.index)?;
    let scoped = engine.prepare(&full, index.prefix.as_deref())?;
    // Keys outside the scope still exist in the bucket and block targets.
    let plan = engine.rename_plan(&full, &scoped)?;

    let script = scripts::rename_script(&plan, &script_target(target));
    scripts::write_script(output, &script)?;
    info!(
        "Rename script for {} keys ({} conflicts resolved) written to {}",
        format!("{}", plan.rename_count()).green(),
        format!("{}", plan.conflicts_resolved).yellow(),
        output.display()
    );
    for (rule, changed) in &plan.per_rule {
        info!("  {}: {} keys", rule, changed);
    }
    for failure in &plan.failures {
        warn!("'{}' left in place: {}", failure.key, failure.error);
    }
    Ok(())
}

fn run_stats(
    config: AppConfig,
    index: &IndexArgs,
    hash: &HashArgs,
    args: &ReportArgs,
) -> Result<()> {
    let engine = AnalysisEngine::new(with_hash_args(config, hash));
    let snapshot = load(&engine, index)?;
    let duplicates = resolve(&engine, &snapshot);
    let stats = snapshot.stats(&duplicates.groups);
    report::emit(
        &report::render_stats(&stats, args.format)?,
        args.output.as_deref(),
    )
}

fn script_target(target: &TargetArgs) -> ScriptTarget {
    ScriptTarget {
        bucket: target.bucket.clone(),
        endpoint_url: target.endpoint_url.clone(),
    }
}

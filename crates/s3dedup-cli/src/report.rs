use anyhow::{Context, Result};
use clap::ValueEnum;
use s3dedup_core::analysis::duplicates::DuplicateReport;
use s3dedup_core::analysis::media::MediaReport;
use s3dedup_core::model::{Evidence, SuspectGroup};
use s3dedup_core::IndexStats;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Flat CSV row for the duplicate report. Unresolved partitions are listed
/// with `status = unresolved` and never carry a fingerprint.
#[derive(Debug, Serialize)]
struct DuplicateRow<'a> {
    status: &'static str,
    group: usize,
    fingerprint: &'a str,
    evidence: &'static str,
    size: u64,
    key: &'a str,
    error: String,
}

#[derive(Debug, Serialize)]
struct SuspectRow<'a> {
    normalized_name: &'a str,
    key: &'a str,
    size: u64,
    digest: &'a str,
    quality_score: u32,
}

#[derive(Debug, Serialize)]
struct MediaRow<'a> {
    status: &'static str,
    artist: &'a str,
    title: &'a str,
    key: &'a str,
    size: Option<u64>,
    codec: Option<&'a str>,
    bitrate: Option<u32>,
    error: String,
}

pub fn render_duplicates(report: &DuplicateReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Csv => {
            let mut rows = Vec::new();
            for (i, group) in report.groups.iter().enumerate() {
                let evidence = match group.evidence {
                    Evidence::Digest => "digest",
                    Evidence::ContentHash => "content_hash",
                };
                for member in &group.members {
                    rows.push(DuplicateRow {
                        status: "duplicate",
                        group: i + 1,
                        fingerprint: &group.fingerprint,
                        evidence,
                        size: group.size,
                        key: &member.key,
                        error: String::new(),
                    });
                }
            }
            for (i, partition) in report.unresolved.iter().enumerate() {
                for key in &partition.keys {
                    let error = partition
                        .failures
                        .iter()
                        .find(|f| &f.key == key)
                        .map(|f| f.error.to_string())
                        .unwrap_or_default();
                    rows.push(DuplicateRow {
                        status: "unresolved",
                        group: report.groups.len() + i + 1,
                        fingerprint: "",
                        evidence: "",
                        size: partition.size,
                        key,
                        error,
                    });
                }
            }
            to_csv(rows)
        }
    }
}

pub fn render_suspects(groups: &[SuspectGroup], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(groups),
        OutputFormat::Csv => to_csv(groups.iter().flat_map(|group| {
            group.members.iter().map(move |member| SuspectRow {
                normalized_name: &group.normalized_name,
                key: &member.record.key,
                size: member.record.size,
                digest: &member.record.digest,
                quality_score: member.quality_score,
            })
        })),
    }
}

pub fn render_media(report: &MediaReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Csv => {
            let grouped = report.groups.iter().flat_map(|group| {
                group.members.iter().map(move |member| MediaRow {
                    status: "grouped",
                    artist: &group.artist,
                    title: &group.title,
                    key: &member.record.key,
                    size: Some(member.record.size),
                    codec: member.codec.as_deref(),
                    bitrate: member.bitrate,
                    error: String::new(),
                })
            });
            let excluded = report.excluded.iter().map(|exclusion| MediaRow {
                status: "excluded",
                artist: "",
                title: "",
                key: &exclusion.key,
                size: None,
                codec: None,
                bitrate: None,
                error: exclusion.error.to_string(),
            });
            to_csv(grouped.chain(excluded))
        }
    }
}

pub fn render_stats(stats: &IndexStats, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(stats),
        OutputFormat::Csv => to_csv([stats]),
    }
}

/// Write to `output`, or stdout when none is given.
pub fn emit(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, contents)
            .with_context(|| format!("cannot write report to {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

fn to_csv<R, I>(rows: I) -> Result<String>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().context("cannot flush CSV output")?;
    Ok(String::from_utf8(bytes)?)
}

use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;

use s3dedup_core::analysis::rename_plan::{plan_renames, CleanRule, StripSpaces};
use s3dedup_core::hasher::HashError;
use s3dedup_core::model::{MediaTags, TagError};
use s3dedup_core::{AnalysisEngine, AppConfig, IndexSnapshot, ObjectRecord, SilentReporter};

fn make_record(key: &str, size: u64, digest: &str, modified_secs: i64) -> ObjectRecord {
    ObjectRecord {
        key: key.to_string(),
        size,
        digest: digest.to_string(),
        digest_ambiguous: s3dedup_core::index::is_composite_digest(digest),
        content_hash: None,
        last_modified: Utc.timestamp_opt(modified_secs, 0).unwrap(),
        observed_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

fn hash_by_size(record: &ObjectRecord) -> Result<String, HashError> {
    Ok(format!("b3-{}", record.size))
}

/// Layout:
///   photos/beach.jpg          d1
///   photos/beach (1).jpg      d1      duplicate of beach.jpg
///   backup/ beach.jpg         d1      duplicate, leading space
///   videos/clip.mp4           abc-3   ambiguous
///   videos/ clip.mp4          abc-3   ambiguous, same content, leading space
///   music/song.flac
///   music/song.mp3
///   tmp/.DS_Store             ignored
///   empty/marker              zero-size
fn build_snapshot() -> IndexSnapshot {
    IndexSnapshot::from_records(vec![
        make_record("photos/beach.jpg", 2048, "d1", 1_600_000_000),
        make_record("photos/beach (1).jpg", 2048, "d1", 1_500_000_000),
        make_record("backup/ beach.jpg", 2048, "d1", 1_400_000_000),
        make_record("videos/clip.mp4", 9000, "abc-3", 1_600_000_000),
        make_record("videos/ clip.mp4", 9000, "abc-3", 1_600_000_100),
        make_record("music/song.flac", 30_000, "f1", 1_600_000_000),
        make_record("music/song.mp3", 5_000, "m1", 1_600_000_000),
        make_record("tmp/.DS_Store", 2048, "d1", 1_600_000_000),
        make_record("empty/marker", 0, "e0", 1_600_000_000),
    ])
}

fn engine() -> AnalysisEngine {
    AnalysisEngine::new(AppConfig {
        ignore_patterns: vec!["*/.DS_Store".to_string()],
        ..AppConfig::default()
    })
}

#[test]
fn test_full_duplicate_pipeline() {
    let engine = engine();
    let snapshot = engine.prepare(&build_snapshot(), None).unwrap();
    assert!(!snapshot.contains_key("tmp/.DS_Store"));

    let report = engine.duplicates(&snapshot, &hash_by_size, &SilentReporter);
    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.groups[0].wasted_bytes, 9000);
    assert_eq!(report.groups[1].wasted_bytes, 4096);
    assert_eq!(report.computed_hashes.len(), 2);

    let decisions = engine.deletion_plan(&report).unwrap();
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].keep, "videos/clip.mp4");
    assert_eq!(decisions[1].keep, "photos/beach.jpg");
    assert_eq!(
        decisions[1].drop,
        vec!["backup/ beach.jpg".to_string(), "photos/beach (1).jpg".to_string()]
    );

    let stats = snapshot.stats(&report.groups);
    assert_eq!(stats.total_objects, 8);
    assert_eq!(stats.duplicate_objects, 3);
    assert_eq!(stats.wasted_bytes, 13_096);
}

#[test]
fn test_computed_hashes_feed_the_next_run() {
    let engine = engine();
    let snapshot = engine.prepare(&build_snapshot(), None).unwrap();
    let report = engine.duplicates(&snapshot, &hash_by_size, &SilentReporter);

    let refreshed = snapshot.with_content_hashes(&report.computed_hashes);
    assert_eq!(
        refreshed.get("videos/clip.mp4").unwrap().content_hash.as_deref(),
        Some("b3-9000")
    );

    let never = |record: &ObjectRecord| -> Result<String, HashError> {
        Err(HashError::Unavailable(format!("unexpected request for {}", record.key)))
    };
    let second = engine.duplicates(&refreshed, &never, &SilentReporter);
    assert_eq!(second.groups.len(), 2);
    assert!(second.unresolved.is_empty());
}

#[test]
fn test_prefix_scopes_the_analysis() {
    let engine = engine();
    let snapshot = engine.prepare(&build_snapshot(), Some("photos/")).unwrap();
    assert_eq!(snapshot.len(), 2);
    let report = engine.duplicates(&snapshot, &hash_by_size, &SilentReporter);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].members.len(), 2);
}

#[test]
fn test_media_pipeline_excludes_untagged() {
    let engine = engine();
    let snapshot = engine.prepare(&build_snapshot(), None).unwrap();

    let mut tags: BTreeMap<String, Result<MediaTags, TagError>> = BTreeMap::new();
    for (key, codec) in [("music/song.flac", "flac"), ("music/song.mp3", "mp3")] {
        tags.insert(
            key.to_string(),
            Ok(MediaTags {
                artist: Some("Artist".to_string()),
                album: Some("Album".to_string()),
                title: Some("Song".to_string()),
                codec: Some(codec.to_string()),
                bitrate: None,
            }),
        );
    }
    let report = engine.media(&snapshot, &tags);

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].members.len(), 2);
    // both clip.mp4 keys are media but have no tags
    let excluded: Vec<&str> = report.excluded.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(excluded, vec!["videos/ clip.mp4", "videos/clip.mp4"]);
}

#[test]
fn test_rename_pipeline_resolves_conflicts() {
    let engine = engine();
    let index = build_snapshot();
    let snapshot = engine.prepare(&index, None).unwrap();
    let plan = engine.rename_plan(&index, &snapshot).unwrap();

    assert_eq!(plan.entries.len(), snapshot.len());
    assert_eq!(plan.target_of("backup/ beach.jpg"), Some("backup/beach.jpg"));
    assert_eq!(plan.target_of("videos/ clip.mp4"), Some("videos/clip_2.mp4"));
    assert_eq!(plan.target_of("videos/clip.mp4"), Some("videos/clip.mp4"));
    assert_eq!(plan.conflicts_resolved, 1);
    assert_eq!(plan.rename_count(), 2);
}

#[test]
fn test_unknown_rule_is_rejected() {
    let engine = AnalysisEngine::new(AppConfig {
        clean_rules: vec!["upper-case".to_string()],
        ..AppConfig::default()
    });
    let index = build_snapshot();
    assert!(engine.rename_plan(&index, &index).is_err());
}

#[test]
fn test_rename_targets_are_unique() {
    let snapshot = build_snapshot();
    let rules: Vec<Box<dyn CleanRule>> = vec![Box::new(StripSpaces)];
    let plan = plan_renames(snapshot.records(), snapshot.records(), &rules, 100);

    let mut targets: Vec<&str> = plan.entries.iter().map(|e| e.target.as_str()).collect();
    targets.sort();
    targets.dedup();
    assert_eq!(targets.len(), snapshot.len());
}

#[test]
fn test_unresolved_partitions_are_distinct_in_json() {
    let engine = engine();
    let snapshot = engine.prepare(&build_snapshot(), None).unwrap();
    let failing = |_: &ObjectRecord| -> Result<String, HashError> {
        Err(HashError::Unavailable("timeout".to_string()))
    };
    let report = engine.duplicates(&snapshot, &failing, &SilentReporter);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["groups"].as_array().unwrap().len(), 1);
    assert_eq!(json["groups"][0]["evidence"], "digest");
    let unresolved = &json["unresolved"][0];
    assert_eq!(unresolved["size"], 9000);
    assert_eq!(unresolved["failures"][0]["error"]["kind"], "unavailable");
    assert_eq!(unresolved["failures"][0]["error"]["detail"], "timeout");
}

#[test]
fn test_ignored_keys_still_block_rename_targets() {
    let engine = AnalysisEngine::new(AppConfig {
        ignore_patterns: vec!["backup/*".to_string()],
        ..AppConfig::default()
    });
    let index = IndexSnapshot::from_records(vec![
        make_record("backup/a.jpg", 10, "d1", 1_600_000_000),
        make_record("backup /a.jpg", 20, "d2", 1_600_000_000),
    ]);
    let scoped = engine.prepare(&index, None).unwrap();
    assert!(!scoped.contains_key("backup/a.jpg"));

    let plan = engine.rename_plan(&index, &scoped).unwrap();
    assert_eq!(plan.entries.len(), 1);
    assert_eq!(plan.target_of("backup /a.jpg"), Some("backup/a_2.jpg"));
}

#[test]
fn test_rename_out_of_prefix_respects_the_index() {
    let engine = engine();
    let index = IndexSnapshot::from_records(vec![
        make_record("docs/report.pdf", 10, "d1", 1_600_000_000),
        make_record("docs /report.pdf", 20, "d2", 1_600_000_000),
    ]);
    let scoped = engine.prepare(&index, Some("docs /")).unwrap();
    assert_eq!(scoped.len(), 1);

    let plan = engine.rename_plan(&index, &scoped).unwrap();
    assert_eq!(plan.target_of("docs /report.pdf"), Some("docs/report_2.pdf"));
}

#[test]
fn test_ambiguous_look_alikes_stay_suspect_until_hashed() {
    let engine = engine();
    let snapshot = IndexSnapshot::from_records(vec![
        make_record("videos/clip.mp4", 9000, "abc-2", 1_600_000_000),
        make_record("videos/clip (1).mp4", 9000, "abc-2", 1_600_000_000),
    ]);

    // Without hashes the matching composite digest proves nothing.
    let suspects = engine.suspects(&snapshot);
    assert_eq!(suspects.len(), 1);
    assert_eq!(suspects[0].normalized_name, "clip.mp4");

    let by_key = |record: &ObjectRecord| -> Result<String, HashError> { Ok(record.key.clone()) };
    let report = engine.duplicates(&snapshot, &by_key, &SilentReporter);
    assert!(report.groups.is_empty());
    let hashed = engine.with_resolved_hashes(&snapshot, &by_key, &SilentReporter);
    assert_eq!(engine.suspects(&hashed).len(), 1);

    let same = |_: &ObjectRecord| -> Result<String, HashError> { Ok("b3-same".to_string()) };
    let hashed = engine.with_resolved_hashes(&snapshot, &same, &SilentReporter);
    assert!(engine.suspects(&hashed).is_empty());
    assert_eq!(engine.duplicates(&hashed, &same, &SilentReporter).groups.len(), 1);
}

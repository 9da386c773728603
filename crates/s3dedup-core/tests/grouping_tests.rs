use chrono::{TimeZone, Utc};

use s3dedup_core::analysis::duplicates::{compute_duplicate_groups, ResolveOptions};
use s3dedup_core::analysis::media::compute_media_groups;
use s3dedup_core::analysis::retention::{rank, RetentionPolicy};
use s3dedup_core::analysis::suspects::compute_suspect_groups;
use s3dedup_core::hasher::HashError;
use s3dedup_core::model::{MediaTags, TagError, TaggedRecord};
use s3dedup_core::{ObjectRecord, SilentReporter};

fn make_record(key: &str, size: u64, digest: &str) -> ObjectRecord {
    ObjectRecord {
        key: key.to_string(),
        size,
        digest: digest.to_string(),
        digest_ambiguous: false,
        content_hash: None,
        last_modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        observed_at: Utc.timestamp_opt(1_700_000_500, 0).unwrap(),
    }
}

fn make_tags(artist: &str, title: &str, codec: &str, bitrate: u32) -> MediaTags {
    MediaTags {
        artist: Some(artist.to_string()),
        album: None,
        title: Some(title.to_string()),
        codec: Some(codec.to_string()),
        bitrate: Some(bitrate),
    }
}

fn tagged(record: ObjectRecord, tags: Result<MediaTags, TagError>) -> TaggedRecord {
    TaggedRecord { record, tags }
}

fn no_hash(record: &ObjectRecord) -> Result<String, HashError> {
    Err(HashError::Unavailable(format!("no mirror for {}", record.key)))
}

#[test]
fn test_copy_suffix_with_different_content_is_suspect() {
    let records = vec![
        make_record("photo.jpg", 120, "e1"),
        make_record("photo (1).jpg", 130, "e2"),
    ];
    let groups = compute_suspect_groups(&records);

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.normalized_name, "photo.jpg");
    let scores: Vec<(&str, u32)> = group
        .members
        .iter()
        .map(|m| (m.record.key.as_str(), m.quality_score))
        .collect();
    assert_eq!(scores, vec![("photo (1).jpg", 5), ("photo.jpg", 0)]);
}

#[test]
fn test_suspects_match_across_directories_and_accents() {
    let records = vec![
        make_record("2023/Été Vacances.JPG", 120, "e1"),
        make_record("backup/ete vacances_copy.jpg", 99, "e2"),
        make_record("other/unrelated.jpg", 120, "e3"),
    ];
    let groups = compute_suspect_groups(&records);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].normalized_name, "ete vacances.jpg");
    assert_eq!(groups[0].members.len(), 2);
}

#[test]
fn test_identical_content_is_not_suspect() {
    let records = vec![
        make_record("photo.jpg", 120, "e1"),
        make_record("photo (1).jpg", 120, "e1"),
    ];
    assert!(compute_suspect_groups(&records).is_empty());
}

#[test]
fn test_matching_ambiguous_digests_stay_suspect() {
    let mut records = vec![
        make_record("video.mp4", 9_000_000, "abc-3"),
        make_record("video (1).mp4", 9_000_000, "abc-3"),
    ];
    for r in &mut records {
        r.digest_ambiguous = true;
    }
    let groups = compute_suspect_groups(&records);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members.len(), 2);

    for r in &mut records {
        r.content_hash = Some("h1".to_string());
    }
    assert!(compute_suspect_groups(&records).is_empty());
}

#[test]
fn test_duplicate_and_suspect_reports_are_exclusive() {
    let records = vec![
        make_record("a/report.pdf", 500, "d1"),
        make_record("b/report (1).pdf", 500, "d1"),
        make_record("c/notes.txt", 80, "n1"),
        make_record("d/notes_copy.txt", 81, "n2"),
    ];
    let duplicates =
        compute_duplicate_groups(&records, &no_hash, &ResolveOptions::default(), &SilentReporter);
    let suspects = compute_suspect_groups(&records);

    assert_eq!(duplicates.groups.len(), 1);
    assert_eq!(suspects.len(), 1);
    assert_eq!(suspects[0].normalized_name, "notes.txt");
    for suspect in &suspects {
        for member in &suspect.members {
            assert!(!duplicates.groups[0].keys().any(|k| k == member.record.key));
        }
    }
}

#[test]
fn test_zero_size_objects_are_not_suspects() {
    let records = vec![make_record("a/x.txt", 0, "z"), make_record("b/x.txt", 10, "y")];
    assert!(compute_suspect_groups(&records).is_empty());
}

#[test]
fn test_media_groups_encodings_of_same_work() {
    let records = vec![
        tagged(
            make_record("music/song.flac", 30_000_000, "f1"),
            Ok(make_tags("Beyoncé", "Halo", "flac", 900)),
        ),
        tagged(
            make_record("music/song.mp3", 5_000_000, "m1"),
            Ok(make_tags("  beyonce ", "HALO", "mp3", 320)),
        ),
        tagged(
            make_record("music/other.mp3", 4_000_000, "o1"),
            Ok(make_tags("Beyoncé", "Single Ladies", "mp3", 320)),
        ),
    ];
    let report = compute_media_groups(&records);

    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.artist, "beyonce");
    assert_eq!(group.title, "halo");
    let keys: Vec<&str> = group.members.iter().map(|m| m.record.key.as_str()).collect();
    assert_eq!(keys, vec!["music/song.flac", "music/song.mp3"]);
    assert_eq!(group.members[0].codec.as_deref(), Some("flac"));
    assert_eq!(group.members[1].bitrate, Some(320));
    assert!(report.excluded.is_empty());
}

#[test]
fn test_media_without_tags_is_excluded() {
    let records = vec![
        tagged(
            make_record("a.mp3", 100, "a"),
            Err(TagError::Unavailable("corrupt header".to_string())),
        ),
        tagged(
            make_record("b.mp3", 100, "b"),
            Ok(MediaTags {
                artist: Some("Someone".to_string()),
                ..MediaTags::default()
            }),
        ),
        tagged(make_record("c.mp3", 100, "c"), Ok(make_tags("Someone", "Song", "mp3", 128))),
    ];
    let report = compute_media_groups(&records);

    assert!(report.groups.is_empty());
    assert_eq!(report.excluded.len(), 2);
    assert_eq!(report.excluded[0].key, "a.mp3");
    assert_eq!(report.excluded[1].key, "b.mp3");
    assert_eq!(report.excluded[1].error, TagError::Incomplete);
}

#[test]
fn test_identical_media_files_are_left_to_duplicates() {
    let records = vec![
        tagged(make_record("x/song.mp3", 100, "same"), Ok(make_tags("A", "T", "mp3", 320))),
        tagged(make_record("y/song.mp3", 100, "same"), Ok(make_tags("A", "T", "mp3", 320))),
    ];
    assert!(compute_media_groups(&records).groups.is_empty());
}

#[test]
fn test_rank_applies_to_every_group_kind() {
    let records = vec![
        make_record("img.png", 100, "p1"),
        make_record("img_1.png", 101, "p2"),
    ];
    let suspects = compute_suspect_groups(&records);
    assert_eq!(suspects.len(), 1);

    let decision = rank(&suspects[0], &RetentionPolicy::default()).unwrap();
    assert_eq!(decision.keep, "img.png");
    assert_eq!(decision.drop, vec!["img_1.png".to_string()]);

    let media = compute_media_groups(&[
        tagged(make_record("w/a.flac", 900, "f"), Ok(make_tags("A", "T", "flac", 900))),
        tagged(make_record("w/a (1).mp3", 300, "m"), Ok(make_tags("A", "T", "mp3", 320))),
    ]);
    let decision = rank(&media.groups[0], &RetentionPolicy::default()).unwrap();
    assert_eq!(decision.keep, "w/a.flac");
    assert_eq!(media.groups[0].members.len(), 2);
}

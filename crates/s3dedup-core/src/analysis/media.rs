use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::model::{
    all_same_content, MediaExclusion, MediaGroup, MediaMember, ObjectRecord, TagError, TaggedRecord,
};
use crate::names::{canonicalize_text, split_ext};

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MediaReport {
    /// Ordered by (artist, title).
    pub groups: Vec<MediaGroup>,
    /// Records without usable tags; they never take part in grouping.
    pub excluded: Vec<MediaExclusion>,
}

/// True when the key's extension is one of `extensions` (case-insensitive,
/// without the leading dot).
pub fn is_media_key(key: &str, extensions: &[String]) -> bool {
    let (_, ext) = split_ext(crate::model::file_name(key));
    let ext = ext.trim_start_matches('.');
    !ext.is_empty() && extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Group tagged objects by canonical (artist, title), keeping only the
/// partitions that are not entirely the same content.
pub fn compute_media_groups(records: &[TaggedRecord]) -> MediaReport {
    let mut by_work: BTreeMap<(String, String), Vec<(&ObjectRecord, Option<&str>, Option<u32>)>> =
        BTreeMap::new();
    let mut excluded: Vec<MediaExclusion> = Vec::new();

    for tagged in records.iter().filter(|t| !t.record.is_placeholder()) {
        let tags = match &tagged.tags {
            Ok(tags) => tags,
            Err(error) => {
                trace!("Excluding '{}' from media grouping: {}", tagged.record.key, error);
                excluded.push(MediaExclusion {
                    key: tagged.record.key.clone(),
                    error: error.clone(),
                });
                continue;
            }
        };

        let artist = tags.artist.as_deref().map(canonicalize_text).unwrap_or_default();
        let title = tags.title.as_deref().map(canonicalize_text).unwrap_or_default();
        if artist.is_empty() || title.is_empty() {
            excluded.push(MediaExclusion {
                key: tagged.record.key.clone(),
                error: TagError::Incomplete,
            });
            continue;
        }

        by_work.entry((artist, title)).or_default().push((
            &tagged.record,
            tags.codec.as_deref(),
            tags.bitrate,
        ));
    }

    let groups: Vec<MediaGroup> = by_work
        .into_iter()
        .filter(|(_, members)| {
            let records: Vec<&ObjectRecord> = members.iter().map(|(r, _, _)| *r).collect();
            members.len() > 1 && !all_same_content(&records)
        })
        .map(|((artist, title), mut members)| {
            members.sort_by(|a, b| a.0.key.cmp(&b.0.key));
            MediaGroup {
                artist,
                title,
                members: members
                    .into_iter()
                    .map(|(record, codec, bitrate)| MediaMember {
                        record: record.clone(),
                        codec: codec.map(str::to_string),
                        bitrate,
                    })
                    .collect(),
            }
        })
        .collect();

    excluded.sort_by(|a, b| a.key.cmp(&b.key));
    debug!(
        "{} media groups, {} records without usable tags",
        groups.len(),
        excluded.len()
    );

    MediaReport { groups, excluded }
}

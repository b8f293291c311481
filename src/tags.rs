use std::borrow::Cow;
use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;

/// Tag fields the catalog indexes. Empty strings are normalized to `None`.
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub track: Option<u32>,
}

fn non_empty(value: Option<Cow<str>>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v.into_owned()),
        _ => None,
    }
}

/// Read the tag fields of a media file. Unreadable files, unrecognized
/// formats and untagged files all yield `None`; the caller skips them.
pub fn extract(path: &Path) -> Option<TagSet> {
    let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(f) => f,
        Err(e) => {
            debug!("no tags in '{}': {}", path.to_string_lossy(), e);
            return None;
        }
    };

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag())?;

    Some(TagSet {
        title: non_empty(tag.title()),
        artist: non_empty(tag.artist()),
        album: non_empty(tag.album()),
        genre: non_empty(tag.genre()),
        year: tag.year(),
        track: tag.track(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn non_media_files_yield_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "not audio").unwrap();

        assert!(extract(&path).is_none());
    }

    #[test]
    fn missing_files_yield_nothing() {
        assert!(extract(Path::new("/nonexistent/file.mp3")).is_none());
    }

    #[test]
    fn empty_tag_values_normalize_to_none() {
        assert_eq!(non_empty(Some(Cow::from(""))), None);
        assert_eq!(non_empty(Some(Cow::from("Abba"))), Some("Abba".to_string()));
        assert_eq!(non_empty(None), None);
    }
}

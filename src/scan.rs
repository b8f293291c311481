use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::store::Catalog;
use crate::tags;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    DatabaseError(rusqlite::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Error {
        Error::DatabaseError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "{}", e),
            Error::DatabaseError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Default)]
pub struct ScanStat {
    pub artists: i32,
    pub genres: i32,
    pub songs: i32,
}

impl ScanStat {
    pub fn add(&mut self, other: &ScanStat) {
        self.artists += other.artists;
        self.genres += other.genres;
        self.songs += other.songs;
    }

    pub fn changed(&self) -> bool {
        self.artists > 0 || self.genres > 0 || self.songs > 0
    }
}

pub struct Scan<'a> {
    catalog: &'a Catalog<'a>,
}

impl<'a> Scan<'a> {
    pub fn new(catalog: &'a Catalog<'a>) -> Scan<'a> {
        Scan { catalog }
    }

    /// Walk a watched directory depth-first and index every regular file
    /// with a usable tag set.
    pub fn run(&self, dir: &Path) -> ScanStat {
        info!("scanning '{}'", dir.to_string_lossy());

        let start_instant = Instant::now();

        let mut stat = ScanStat {
            ..Default::default()
        };

        self.scan_directory(dir, &mut stat);

        info!("done in {}s: {:?}", start_instant.elapsed().as_secs(), stat);

        stat
    }

    fn scan_directory(&self, dir: &Path, stat: &mut ScanStat) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("can't read directory '{}': {}", dir.to_string_lossy(), e);
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    error!("can't read entry in '{}': {}", dir.to_string_lossy(), e);
                    continue;
                }
            };

            let path = entry.path();

            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    error!("can't stat '{}': {}", path.to_string_lossy(), e);
                    continue;
                }
            };

            if metadata.is_dir() {
                self.scan_directory(&path, stat);
            } else if metadata.is_file() {
                if let Err(e) = self.scan_file(&path, &metadata, stat) {
                    error!("can't index '{}': {}", path.to_string_lossy(), e);
                }
            }
        }
    }

    fn scan_file(&self, path: &Path, metadata: &fs::Metadata, stat: &mut ScanStat) -> Result<()> {
        let tags = match tags::extract(path) {
            Some(tags) => tags,
            None => return Ok(()),
        };

        if let Some(artist) = &tags.artist {
            if self.catalog.insert_artist_if_new(artist)? {
                stat.artists += 1;
            }
        }

        if let Some(genre) = &tags.genre {
            if self.catalog.insert_genre_if_new(genre)? {
                stat.genres += 1;
            }
        }

        if tags.title.is_none() || tags.artist.is_none() || tags.album.is_none() {
            debug!("incomplete tags in '{}', not indexing", path.to_string_lossy());
            return Ok(());
        }

        let mtime = metadata
            .modified()?
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let filepath = path.to_string_lossy();

        if self.catalog.insert_song_if_new(&tags, &filepath, mtime)? {
            debug!("indexed '{}'", filepath);
            stat.songs += 1;
        }

        Ok(())
    }
}

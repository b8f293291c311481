use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Result, NO_PARAMS};

use crate::db_meta;
use crate::schema;
use crate::tags::TagSet;

/// Owner of the on-disk catalog. Access goes through `get`, which takes the
/// serializing lock and opens a connection for the duration of one logical
/// operation.
pub struct CatalogSource {
    db_path: PathBuf,
    lock: Mutex<()>,
}

pub struct Catalog<'a> {
    conn: Connection,
    _guard: MutexGuard<'a, ()>,
}

impl CatalogSource {
    pub fn create(db_path: PathBuf) -> Result<Option<CatalogSource>> {
        info!("using '{}'", db_path.to_string_lossy());

        let source = CatalogSource {
            db_path,
            lock: Mutex::new(()),
        };

        let mut catalog = source.get()?;
        if !db_meta::ensure_schema(&mut catalog.conn, schema::CATALOG_SCHEMA)? {
            return Ok(None);
        }
        drop(catalog);

        Ok(Some(source))
    }

    pub fn get(&self) -> Result<Catalog> {
        let guard = self.lock.lock().unwrap();

        let conn = match Connection::open(&self.db_path) {
            Ok(c) => c,
            Err(e) => {
                error!(
                    "can't open sqlite database '{}': {}",
                    self.db_path.to_string_lossy(),
                    e
                );
                return Err(e);
            }
        };

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;",
        )?;

        Ok(Catalog {
            conn,
            _guard: guard,
        })
    }
}

impl Catalog<'_> {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")
    }

    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")
    }

    pub fn upsert_path(&self, path: &str) -> Result<()> {
        let known: Option<String> = self
            .conn
            .query_row("SELECT path FROM Path WHERE path = ?", &[path], |row| {
                row.get(0)
            })
            .optional()?;

        if known.is_some() {
            trace!("reactivating path '{}'", path);
            self.conn
                .execute("UPDATE Path SET active = 1 WHERE path = ?", &[path])?;
        } else {
            debug!("inserting path '{}'", path);
            self.conn
                .execute("INSERT INTO Path (path, active) VALUES (?, 1)", &[path])?;
        }

        Ok(())
    }

    pub fn deactivate_all_paths(&self) -> Result<()> {
        self.conn.execute("UPDATE Path SET active = 0", NO_PARAMS)?;
        Ok(())
    }

    pub fn active_paths(&self) -> Result<Vec<String>> {
        let mut st = self
            .conn
            .prepare("SELECT path FROM Path WHERE active = 1")?;

        let mut rows = st.query(NO_PARAMS)?;

        let mut result = Vec::new();

        while let Some(row) = rows.next()? {
            result.push(row.get(0)?);
        }

        Ok(result)
    }

    /// Drop every song indexed under a deactivated path, then the path rows
    /// themselves.
    pub fn delete_inactive_paths_and_contents(&self) -> Result<()> {
        let stale: Vec<String> = {
            let mut st = self
                .conn
                .prepare("SELECT path FROM Path WHERE active = 0")?;

            let mut rows = st.query(NO_PARAMS)?;
            let mut stale = Vec::new();

            while let Some(row) = rows.next()? {
                stale.push(row.get(0)?);
            }

            stale
        };

        for path in &stale {
            debug!("removing songs under '{}'", path);
            self.conn.execute(
                "DELETE FROM Song WHERE filepath LIKE ?||'%'",
                &[path.as_str()],
            )?;
        }

        self.conn
            .execute("DELETE FROM Path WHERE active = 0", NO_PARAMS)?;

        Ok(())
    }

    pub fn purge_orphan_artists(&self) -> Result<()> {
        let purged = self.conn.execute(
            "DELETE FROM Artist WHERE name IN (
                SELECT Artist.name
                FROM Artist
                LEFT JOIN Song ON Song.artist_name = Artist.name
                GROUP BY Artist.name
                HAVING COUNT(Song.song_id) = 0)",
            NO_PARAMS,
        )?;

        if purged > 0 {
            debug!("purged {} orphan artists", purged);
        }

        Ok(())
    }

    pub fn purge_orphan_genres(&self) -> Result<()> {
        let purged = self.conn.execute(
            "DELETE FROM Genre WHERE name IN (
                SELECT Genre.name
                FROM Genre
                LEFT JOIN Song ON Song.genre_name = Genre.name
                GROUP BY Genre.name
                HAVING COUNT(Song.song_id) = 0)",
            NO_PARAMS,
        )?;

        if purged > 0 {
            debug!("purged {} orphan genres", purged);
        }

        Ok(())
    }

    pub fn insert_artist_if_new(&self, name: &str) -> Result<bool> {
        let known: Option<String> = self
            .conn
            .query_row("SELECT name FROM Artist WHERE name = ?", &[name], |row| {
                row.get(0)
            })
            .optional()?;

        if known.is_some() {
            return Ok(false);
        }

        self.conn
            .execute("INSERT INTO Artist (name) VALUES (?)", &[name])?;

        Ok(true)
    }

    pub fn insert_genre_if_new(&self, name: &str) -> Result<bool> {
        let known: Option<String> = self
            .conn
            .query_row("SELECT name FROM Genre WHERE name = ?", &[name], |row| {
                row.get(0)
            })
            .optional()?;

        if known.is_some() {
            return Ok(false);
        }

        self.conn
            .execute("INSERT INTO Genre (name) VALUES (?)", &[name])?;

        Ok(true)
    }

    /// Insert a song row unless one with the same (title, artist, album,
    /// year) key exists. Rescanning an already-indexed file is a no-op; a
    /// changed mtime does not update the existing row.
    pub fn insert_song_if_new(&self, tags: &TagSet, filepath: &str, mtime: i64) -> Result<bool> {
        let (title, artist, album) = match (&tags.title, &tags.artist, &tags.album) {
            (Some(title), Some(artist), Some(album)) => (title, artist, album),
            _ => return Ok(false),
        };

        // Untagged years are stored as 0: a NULL would never equal itself
        // and the dedup key would stop matching on rescan.
        let year = i64::from(tags.year.unwrap_or(0));

        let known: Option<i64> = self
            .conn
            .query_row(
                "SELECT song_id FROM Song
                WHERE title = ? AND artist_name = ? AND album = ? AND year = ?",
                params![title, artist, album, year],
                |row| row.get(0),
            )
            .optional()?;

        if known.is_some() {
            trace!("'{}' already indexed", filepath);
            return Ok(false);
        }

        let track = match tags.track {
            Some(n) if n > 0 => format!("{:02}", n),
            _ => String::new(),
        };

        let extension = Path::new(filepath)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        self.conn.execute(
            "INSERT INTO Song (title, artist_name, album, genre_name, year, track, filepath, mtime, extension)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![title, artist, album, tags.genre, year, track, filepath, mtime, extension],
        )?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_catalog() -> (CatalogSource, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let source = CatalogSource::create(temp_dir.path().join("catalog.db"))
            .unwrap()
            .unwrap();
        (source, temp_dir)
    }

    fn tag_set(title: &str, artist: &str, album: &str, genre: Option<&str>) -> TagSet {
        TagSet {
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            genre: genre.map(|g| g.to_string()),
            year: Some(1975),
            track: Some(1),
        }
    }

    fn count(catalog: &Catalog, sql: &str) -> i64 {
        catalog
            .connection()
            .query_row(sql, NO_PARAMS, |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn upsert_path_is_idempotent() {
        let (source, _tmp) = create_tmp_catalog();
        let catalog = source.get().unwrap();

        catalog.upsert_path("/music/a").unwrap();
        catalog.upsert_path("/music/a").unwrap();

        assert_eq!(catalog.active_paths().unwrap(), vec!["/music/a".to_string()]);
        assert_eq!(count(&catalog, "SELECT COUNT(*) FROM Path"), 1);
    }

    #[test]
    fn deactivated_paths_lose_their_songs() {
        let (source, _tmp) = create_tmp_catalog();
        let catalog = source.get().unwrap();

        catalog.upsert_path("/music/a").unwrap();
        catalog.upsert_path("/music/b").unwrap();
        catalog
            .insert_song_if_new(&tag_set("SOS", "Abba", "Arrival", None), "/music/a/sos.mp3", 1)
            .unwrap();
        catalog
            .insert_song_if_new(
                &tag_set("Motorbreath", "Metallica", "Kill 'Em All", None),
                "/music/b/motorbreath.mp3",
                1,
            )
            .unwrap();

        catalog.deactivate_all_paths().unwrap();
        catalog.upsert_path("/music/a").unwrap();
        catalog.delete_inactive_paths_and_contents().unwrap();

        assert_eq!(catalog.active_paths().unwrap(), vec!["/music/a".to_string()]);
        assert_eq!(count(&catalog, "SELECT COUNT(*) FROM Path"), 1);
        assert_eq!(count(&catalog, "SELECT COUNT(*) FROM Song"), 1);
    }

    #[test]
    fn insert_song_if_new_deduplicates() {
        let (source, _tmp) = create_tmp_catalog();
        let catalog = source.get().unwrap();

        let tags = tag_set("SOS", "Abba", "Arrival", Some("Pop"));

        assert!(catalog
            .insert_song_if_new(&tags, "/music/a/sos.mp3", 1)
            .unwrap());
        assert!(!catalog
            .insert_song_if_new(&tags, "/music/a/sos.mp3", 2)
            .unwrap());

        assert_eq!(count(&catalog, "SELECT COUNT(*) FROM Song"), 1);
    }

    #[test]
    fn incomplete_tags_are_not_inserted() {
        let (source, _tmp) = create_tmp_catalog();
        let catalog = source.get().unwrap();

        let mut tags = tag_set("SOS", "Abba", "Arrival", None);
        tags.album = None;

        assert!(!catalog
            .insert_song_if_new(&tags, "/music/a/sos.mp3", 1)
            .unwrap());
        assert_eq!(count(&catalog, "SELECT COUNT(*) FROM Song"), 0);
    }

    #[test]
    fn orphan_artists_and_genres_are_purged() {
        let (source, _tmp) = create_tmp_catalog();
        let catalog = source.get().unwrap();

        catalog.insert_artist_if_new("Abba").unwrap();
        catalog.insert_artist_if_new("Nobody").unwrap();
        catalog.insert_genre_if_new("Pop").unwrap();
        catalog.insert_genre_if_new("Silence").unwrap();
        catalog
            .insert_song_if_new(
                &tag_set("SOS", "Abba", "Arrival", Some("Pop")),
                "/music/a/sos.mp3",
                1,
            )
            .unwrap();

        catalog.purge_orphan_artists().unwrap();
        catalog.purge_orphan_genres().unwrap();

        assert_eq!(count(&catalog, "SELECT COUNT(*) FROM Artist"), 1);
        assert_eq!(count(&catalog, "SELECT COUNT(*) FROM Genre"), 1);
    }

    #[test]
    fn track_numbers_are_zero_padded() {
        let (source, _tmp) = create_tmp_catalog();
        let catalog = source.get().unwrap();

        catalog
            .insert_song_if_new(&tag_set("SOS", "Abba", "Arrival", None), "/music/a/sos.mp3", 1)
            .unwrap();

        let mut untracked = tag_set("Fernando", "Abba", "Arrival", None);
        untracked.track = None;
        catalog
            .insert_song_if_new(&untracked, "/music/a/fernando.mp3", 1)
            .unwrap();

        let padded: String = catalog
            .connection()
            .query_row(
                "SELECT track FROM Song WHERE title = 'SOS'",
                NO_PARAMS,
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(padded, "01");

        let empty: String = catalog
            .connection()
            .query_row(
                "SELECT track FROM Song WHERE title = 'Fernando'",
                NO_PARAMS,
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(empty, "");
    }
}

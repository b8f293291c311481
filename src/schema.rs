pub const SCHEMA_VERSION: u32 = 1;

pub const META_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS Musicfs (
    key TEXT PRIMARY KEY,
    value);
";

pub const CATALOG_SCHEMA: &str = "
CREATE TABLE Path (
    path TEXT PRIMARY KEY,
    active INTEGER NOT NULL);

CREATE TABLE Artist (
    name TEXT PRIMARY KEY);

CREATE TABLE Genre (
    name TEXT PRIMARY KEY);

CREATE TABLE Song (
    song_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    artist_name TEXT NOT NULL,
    album TEXT NOT NULL,
    genre_name TEXT,
    year INTEGER NOT NULL,
    track TEXT NOT NULL,
    filepath TEXT NOT NULL,
    mtime INTEGER NOT NULL,
    extension TEXT NOT NULL);

CREATE INDEX Song_artist_name ON Song (artist_name);
CREATE INDEX Song_genre_name ON Song (genre_name);
CREATE INDEX Song_album ON Song (album);
CREATE INDEX Song_filepath ON Song (filepath);
";

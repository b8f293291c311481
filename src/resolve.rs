use std::fs;
use std::path::PathBuf;

use crate::lookup::Lookup;
use crate::store::Catalog;

#[derive(Debug)]
pub enum Error {
    NotFound,
    DatabaseError(rusqlite::Error),
    IoError(std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Error {
        Error::DatabaseError(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::NotFound => write!(f, "not found"),
            Error::DatabaseError(e) => write!(f, "{}", e),
            Error::IoError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FileType {
    NotFound,
    Directory,
    File,
}

/// One query template plus the path tokens it binds, in bind order.
struct Level {
    query: &'static str,
    tokens: &'static [usize],
}

/// A virtual namespace: directory listings for depths 1..=directories.len(),
/// a single-file lookup at the depth after that.
struct Namespace {
    name: &'static str,
    directories: &'static [Level],
    file: Level,
}

/// Entries of the virtual root, in listing order.
pub const ROOT_ENTRIES: &[&str] = &["Artists", "Genres", "Tracks", "Albums"];

const NAMESPACES: &[Namespace] = &[
    Namespace {
        name: "Artists",
        directories: &[
            Level {
                query: "SELECT name FROM Artist",
                tokens: &[],
            },
            Level {
                query: "SELECT DISTINCT album FROM Song, Artist
                    WHERE Song.artist_name = Artist.name AND Artist.name LIKE ?",
                tokens: &[2],
            },
            Level {
                query: "SELECT LTRIM(track||' ')||title||'.'||extension FROM Song, Artist
                    WHERE Song.artist_name = Artist.name AND Artist.name LIKE ?
                    AND Song.album LIKE ?",
                tokens: &[2, 3],
            },
        ],
        file: Level {
            query: "SELECT filepath FROM Song
                WHERE artist_name LIKE ? AND album LIKE ?
                AND (LTRIM(track||' ')||title||'.'||extension) LIKE ?",
            tokens: &[2, 3, 4],
        },
    },
    Namespace {
        name: "Genres",
        directories: &[
            Level {
                query: "SELECT name FROM Genre",
                tokens: &[],
            },
            Level {
                query: "SELECT DISTINCT album FROM Song, Genre
                    WHERE Song.genre_name = Genre.name AND Genre.name LIKE ?",
                tokens: &[2],
            },
            Level {
                query: "SELECT LTRIM(track||' ')||title||'.'||extension FROM Song, Genre
                    WHERE Song.genre_name = Genre.name AND Genre.name LIKE ?
                    AND Song.album LIKE ?",
                tokens: &[2, 3],
            },
        ],
        file: Level {
            query: "SELECT filepath FROM Song
                WHERE genre_name LIKE ? AND album LIKE ?
                AND (LTRIM(track||' ')||title||'.'||extension) LIKE ?",
            tokens: &[2, 3, 4],
        },
    },
    Namespace {
        name: "Albums",
        directories: &[
            Level {
                query: "SELECT DISTINCT album FROM Song",
                tokens: &[],
            },
            Level {
                query: "SELECT DISTINCT LTRIM(track||' ')||title||'.'||extension FROM Song
                    WHERE album LIKE ?",
                tokens: &[2],
            },
        ],
        // Rendered title binds first, album second.
        file: Level {
            query: "SELECT filepath FROM Song
                WHERE (LTRIM(track||' ')||title||'.'||extension) LIKE ? AND album LIKE ?",
            tokens: &[3, 2],
        },
    },
    Namespace {
        name: "Tracks",
        directories: &[Level {
            query: "SELECT DISTINCT artist_name||' - '||title||'.'||extension FROM Song",
            tokens: &[],
        }],
        file: Level {
            query: "SELECT filepath FROM Song
                WHERE (artist_name||' - '||title||'.'||extension) LIKE ?",
            tokens: &[2],
        },
    },
];

/// Collapse literal \' sequences to bare quotes. The protocol layer may
/// deliver quote characters pre-escaped by its own argument parsing.
pub fn unescape_quotes(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek() == Some(&'\'') {
            continue;
        }
        result.push(ch);
    }

    result
}

/// Count the slash-delimited segments of a virtual path. A trailing slash
/// does not introduce an extra segment.
pub fn token_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// The n-th slash-delimited segment (1-indexed, ignoring a leading slash),
/// with embedded quotes unescaped. None if the path is too shallow.
pub fn token(path: &str, n: usize) -> Option<String> {
    if n == 0 {
        return None;
    }

    path.split('/')
        .filter(|s| !s.is_empty())
        .nth(n - 1)
        .map(unescape_quotes)
}

fn namespace(path: &str) -> Option<&'static Namespace> {
    let first = token(path, 1)?;
    NAMESPACES.iter().find(|ns| ns.name == first)
}

/// Classify a virtual path from its namespace prefix and depth alone. The
/// root and the reserved configuration entries are the protocol layer's
/// concern and classify as NotFound here.
pub fn classify(path: &str) -> FileType {
    let ns = match namespace(path) {
        Some(ns) => ns,
        None => return FileType::NotFound,
    };

    let depth = token_count(path);

    if depth <= ns.directories.len() {
        FileType::Directory
    } else if depth == ns.directories.len() + 1 {
        FileType::File
    } else {
        FileType::NotFound
    }
}

fn start_level<'a>(catalog: &'a Catalog, path: &str, level: &Level) -> Result<Lookup<'a>> {
    let mut lookup = Lookup::start(catalog, 0, level.query)?;

    for &n in level.tokens {
        let value = token(path, n).ok_or(Error::NotFound)?;
        lookup.bind_text(&value);
    }

    Ok(lookup)
}

/// Feed the entries of a virtual directory into `sink`.
pub fn list<F>(catalog: &Catalog, path: &str, mut sink: F) -> Result<()>
where
    F: FnMut(&str),
{
    trace!("list '{}'", path);

    let ns = namespace(path).ok_or(Error::NotFound)?;
    let depth = token_count(path);

    let level = ns.directories.get(depth - 1).ok_or(Error::NotFound)?;

    start_level(catalog, path, level)?.finish(|value| {
        sink(value);
        false
    })?;

    Ok(())
}

/// Resolve a File-classified virtual path to the real path of the first
/// matching song. Zero matches is NotFound, never an empty success.
pub fn real_path(catalog: &Catalog, path: &str) -> Result<PathBuf> {
    trace!("resolve '{}'", path);

    let ns = namespace(path).ok_or(Error::NotFound)?;

    if token_count(path) != ns.directories.len() + 1 {
        return Err(Error::NotFound);
    }

    let mut found: Option<PathBuf> = None;

    start_level(catalog, path, &ns.file)?.finish(|value| {
        found = Some(PathBuf::from(value));
        true
    })?;

    found.ok_or(Error::NotFound)
}

/// Open the real file behind a virtual path.
pub fn open(catalog: &Catalog, path: &str) -> Result<fs::File> {
    let real = real_path(catalog, path)?;
    Ok(fs::File::open(real)?)
}

/// Stat the real file behind a virtual path.
pub fn stat(catalog: &Catalog, path: &str) -> Result<fs::Metadata> {
    let real = real_path(catalog, path)?;
    Ok(fs::metadata(real)?)
}

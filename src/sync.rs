use std::fs;
use std::path::Path;

use crate::scan::{Scan, ScanStat};
use crate::store::CatalogSource;

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

/// Reconcile the catalog against the watch list, then rescan every active
/// path. The catalog lock is held for the whole sequence: concurrent
/// lookups observe either the old catalog or the fully reloaded one.
///
/// Paths present in the watch list are activated (inserted if new), paths
/// absent from it are deactivated and their songs removed, and artists and
/// genres left without songs are purged. The reconciliation runs inside one
/// transaction; scanning happens after commit, one atomic insert at a time,
/// so a single bad file cannot poison the batch.
pub fn reload(source: &CatalogSource, config_path: &Path) -> Result<ScanStat> {
    info!("reloading watch list '{}'", config_path.to_string_lossy());

    let config = match fs::read_to_string(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "can't read watch list '{}': {}",
                config_path.to_string_lossy(),
                e
            );
            return Err(Error::IoError(e));
        }
    };

    let catalog = source.get()?;

    catalog.begin()?;

    let reconciled = (|| -> Result<()> {
        catalog.deactivate_all_paths()?;

        for line in config.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            catalog.upsert_path(line)?;
        }

        catalog.delete_inactive_paths_and_contents()?;
        catalog.purge_orphan_artists()?;
        catalog.purge_orphan_genres()?;

        Ok(())
    })();

    match reconciled {
        Ok(()) => catalog.commit()?,
        Err(e) => {
            let _ = catalog.rollback();
            return Err(e);
        }
    }

    let scan = Scan::new(&catalog);
    let mut stat = ScanStat::default();

    for path in catalog.active_paths()? {
        stat.add(&scan.run(Path::new(&path)));
    }

    Ok(stat)
}

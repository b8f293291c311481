#[macro_use]
extern crate log;

mod db_meta;
mod logger;
mod lookup;
mod resolve;
mod scan;
mod schema;
mod store;
mod sync;
mod tags;

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{App, Arg};

use crate::resolve::FileType;
use crate::store::CatalogSource;

/// The surface the filesystem-protocol binding drives: path classification,
/// listing, real-path resolution and reload.
pub struct Musicfs {
    catalog: CatalogSource,
    config_path: PathBuf,
}

impl Musicfs {
    pub fn classify(&self, path: &str) -> FileType {
        resolve::classify(path)
    }

    pub fn list<F>(&self, path: &str, sink: F) -> resolve::Result<()>
    where
        F: FnMut(&str),
    {
        let catalog = self.catalog.get()?;
        resolve::list(&catalog, path, sink)
    }

    pub fn real_path(&self, path: &str) -> resolve::Result<PathBuf> {
        let catalog = self.catalog.get()?;
        resolve::real_path(&catalog, path)
    }

    pub fn open(&self, path: &str) -> resolve::Result<fs::File> {
        let catalog = self.catalog.get()?;
        resolve::open(&catalog, path)
    }

    pub fn stat(&self, path: &str) -> resolve::Result<fs::Metadata> {
        let catalog = self.catalog.get()?;
        resolve::stat(&catalog, path)
    }

    pub fn reload(&self) -> sync::Result<scan::ScanStat> {
        sync::reload(&self.catalog, &self.config_path)
    }
}

fn main() {
    let matches = App::new("musicfs2")
        .version(env!("CARGO_PKG_VERSION"))
        .about("virtual filesystem namespace over a tagged music collection")
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Enables verbose output (repeat for trace output)"),
        )
        .arg(
            Arg::with_name("db-file")
                .long("db-file")
                .takes_value(true)
                .default_value("~/.musicfs2.db")
                .help("Catalog database file"),
        )
        .arg(
            Arg::with_name("watch-list")
                .short("c")
                .long("watch-list")
                .takes_value(true)
                .default_value("~/.musicfs2rc")
                .help("Watched directory list, one path per line"),
        )
        .arg(
            Arg::with_name("reload")
                .long("reload")
                .help("Reconciles watched paths and rescans them"),
        )
        .arg(
            Arg::with_name("PATH")
                .index(1)
                .help("Virtual path to list or resolve"),
        )
        .get_matches();

    logger::init(matches.occurrences_of("verbose"));

    let db_path = PathBuf::from(shellexpand::tilde(matches.value_of("db-file").unwrap()).as_ref());
    let config_path =
        PathBuf::from(shellexpand::tilde(matches.value_of("watch-list").unwrap()).as_ref());

    let catalog = match CatalogSource::create(db_path) {
        Ok(Some(catalog)) => catalog,
        Ok(None) => {
            eprintln!("unsupported catalog database, remove it and rescan");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("can't open catalog database: {}", e);
            process::exit(1);
        }
    };

    let musicfs = Musicfs {
        catalog,
        config_path,
    };

    if matches.is_present("reload") {
        match musicfs.reload() {
            Ok(stat) => info!("reload finished: {:?}", stat),
            Err(e) => {
                eprintln!("reload failed: {}", e);
                process::exit(1);
            }
        }
    }

    if let Some(vpath) = matches.value_of("PATH") {
        run_path(&musicfs, vpath);
    }
}


fn run_path(musicfs: &Musicfs, vpath: &str) {
    if vpath == "/" {
        for name in resolve::ROOT_ENTRIES {
            println!("{}", name);
        }
        return;
    }

    match musicfs.classify(vpath) {
        FileType::Directory => {
            let mut entries = Vec::new();

            if let Err(e) = musicfs.list(vpath, |entry| entries.push(entry.to_string())) {
                eprintln!("can't list '{}': {}", vpath, e);
                process::exit(1);
            }

            for entry in entries {
                println!("{}", entry);
            }
        }
        FileType::File => match musicfs.real_path(vpath) {
            Ok(real) => println!("{}", real.display()),
            Err(e) => {
                eprintln!("can't resolve '{}': {}", vpath, e);
                process::exit(1);
            }
        },
        FileType::NotFound => {
            eprintln!("no such virtual path: {}", vpath);
            process::exit(1);
        }
    }
}

use chrono::prelude::*;
use log::{LevelFilter, Metadata, Record};

pub struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("musicfs2")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut target = record.target();
        if target.starts_with("musicfs2::") {
            target = &target["musicfs2::".len()..];
        }

        eprintln!(
            "{} {:<5} [{}] {}",
            Local::now().format("%H:%M:%S"),
            record.level(),
            target,
            record.args()
        );
    }

    fn flush(&self) {}
}

pub fn init(verbose: u64) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

//! Logging setup. Grounded on `common::logger::setup_logging` — the same
//! stderr-plus-scheme-log-file shape every daemon in this workspace uses.

use redox_log::{OutputBuilder, RedoxLogger};

pub fn output_level() -> log::LevelFilter {
    log::LevelFilter::Info
}

pub fn file_level() -> log::LevelFilter {
    log::LevelFilter::Info
}

#[cfg_attr(not(target_os = "redox"), allow(unused_variables, unused_mut))]
pub fn setup_logging(logfile_base: &str, output_level: log::LevelFilter, file_level: log::LevelFilter) {
    let mut logger = RedoxLogger::new().with_output(
        OutputBuilder::stderr()
            .with_filter(output_level)
            .with_ansi_escape_codes()
            .flush_on_newline(true)
            .build(),
    );

    #[cfg(target_os = "redox")]
    match OutputBuilder::in_redox_logging_scheme("disk", "volume", format!("{logfile_base}.log")) {
        Ok(b) => logger = logger.with_output(b.with_filter(file_level).flush_on_newline(true).build()),
        Err(error) => eprintln!("volumed: failed to create {logfile_base}.log: {error}"),
    }

    logger.enable().expect("volumed: failed to set default logger");
}

//! Daemon entry point. Bootstrap grounded on `ahcid`/`acpid`'s
//! `redox_daemon::Daemon::new` + `RedoxLogger` setup; the scheme socket's
//! blocking read/handle/write loop is grounded on `pcspkrd::main` — the
//! simplest form of that loop in the corpus, appropriate here since the
//! control file has no interrupt source of its own to multiplex against.

mod brick;
mod config;
mod logger;
mod opcode;
mod persist;
mod scheme;
mod volume;

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use fsx32::{BucketVec, DistCtx};
use log::{error, info};
use syscall::data::Packet;
use syscall::scheme::SchemeMut;

use brick::Brick;
use config::Config;
use scheme::VolumeScheme;
use volume::Volume;

const DEFAULT_CONFIG_PATH: &str = "/etc/volumed.conf";
const HEADER_SUFFIX: &str = ".volumed-header";

fn main() {
    redox_daemon::Daemon::new(daemon).expect("volumed: failed to daemonize");
}

fn daemon(daemon: redox_daemon::Daemon) -> ! {
    logger::setup_logging("volumed", logger::output_level(), logger::file_level());

    match run(daemon) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("volumed: fatal error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(daemon: redox_daemon::Daemon) -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::read(&config_path).context("failed to load volume config")?;

    let mut bricks = Vec::with_capacity(config.bricks.len());
    for (i, brick_cfg) in config.bricks.iter().enumerate() {
        let brick = Brick::open(i as u64, &brick_cfg.path, brick_cfg.capacity)
            .with_context(|| format!("failed to open brick {}", brick_cfg.path))?;
        bricks.push(brick);
    }

    let header_path = PathBuf::from(format!("{config_path}{HEADER_SUFFIX}"));
    let mut bucket_vec = BucketVec::new(bricks);

    let volume = if header_path.exists() {
        let header = persist::load(&header_path).context("failed to load persisted volume header")?;
        let dcx = DistCtx::from_packed(header.numb, header.nums_bits, header.weights, &header.table)
            .map_err(|e| anyhow::anyhow!("failed to restore distribution table: {e}"))?;
        info!("volumed: restored persisted table (numb={}, nums_bits={})", header.numb, header.nums_bits);
        let mut volume = Volume::new(dcx, bucket_vec, header_path);
        if header.incomplete_removal.is_some() {
            info!("volumed: resuming an interrupted brick removal on mount");
            volume.balance().map_err(|e| anyhow::anyhow!("failed to resume removal: {e}"))?;
        }
        volume
    } else {
        let dcx = DistCtx::init(&mut bucket_vec, config.nums_bits)
            .map_err(|e| anyhow::anyhow!("failed to build initial distribution table: {e}"))?;
        info!("volumed: built initial table over {} bricks", config.bricks.len());
        Volume::new(dcx, bucket_vec, header_path)
    };

    let mut socket = File::create(":volume").context("failed to create volume scheme")?;
    let mut scheme = VolumeScheme::new(volume);

    libredox::call::setrens(0, 0).context("failed to enter null namespace")?;
    daemon.ready().context("failed to notify parent")?;

    let mut packet = Packet::default();
    loop {
        let bytes_read = socket
            .read(&mut packet)
            .context("failed to read from volume scheme socket")?;
        if bytes_read == 0 {
            info!("volumed: scheme socket closed, shutting down");
            break;
        }
        scheme.handle(&mut packet);
        socket
            .write(&packet)
            .context("failed to write to volume scheme socket")?;
    }

    Ok(())
}

#![doc(
    html_logo_url = "https://raw.githubusercontent.com/nav-solutions/.github/master/logos/logo2.jpg"
)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

/*
 * WX2RINEX is part of the nav-solutions framework.
 * Authors: Guillaume W. Bres <guillaume.bressaix@gmail.com> et al,
 * (cf. https://github.com/nav-solutions/rinex/graphs/contributors)
 * (cf. https://github.com/nav-solutions/wx2rinex/graphs/contributors)
 * This framework is shipped under Mozilla Public V2 license.
 *
 * Documentation: https://github.com/nav-solutions/wx2rinex
 */

use env_logger::{Builder, Env, Target};

use log::{error, info};

use hifitime::prelude::Epoch;

mod acquisition;
mod cli;
mod collecter;
mod device;
mod error;
mod nmea;
mod record;
mod runtime;
mod utils;

use error::Error;

use crate::{
    acquisition::Acquisition,
    cli::Cli,
    collecter::{Collecter, archive::Archive, header::Header},
    device::Device,
    nmea::Decoder,
};

/// Pause after each failed fix attempt
const ACQUISITION_PAUSE: std::time::Duration = std::time::Duration::from_secs(10);

fn run() -> Result<(), Error> {
    let cli = Cli::new();

    let settings = cli.settings();
    settings.validate()?;

    info!(
        "station: {} | session: {} | sampling: {} | output: {}",
        settings.marker_name(),
        settings.period_label(),
        settings.frequency_label(),
        settings.output_dir().display()
    );

    if settings.checksum {
        info!("NMEA checksum verification enabled");
    }

    std::fs::create_dir_all(settings.output_dir())
        .map_err(|e| Error::file(settings.output_dir(), e))?;

    // Input interface
    let mut device = if let Some(serial) = cli.serial_port() {
        // active mode (weather station)
        Device::open_serial_port(serial, cli.baud_rate())?
    } else {
        // passive mode (input files)
        Device::open_files(&cli.filepaths())?
    };

    if device.is_read_only() {
        info!("passive mode: replaying {} file(s)", cli.filepaths().len());
    }

    let mut acquisition = Acquisition::new(Decoder::new(settings.checksum), ACQUISITION_PAUSE);
    let fix = acquisition.run(&mut device)?;

    let date = Epoch::now().unwrap_or(fix.epoch);
    let header = Header::new(&settings, &fix, date);

    let mut content = Vec::<u8>::new();
    if header.format(&mut content).is_ok() {
        info!("header:\n{}", String::from_utf8_lossy(&content));
    }

    // recover from previous deployments
    let archive = Archive::sweep(settings.output_dir())?;

    info!("{} - application deployed", fix.epoch);

    let mut collecter = Collecter::new(settings, header, archive, &fix);
    collecter.run(&mut device)
}

pub fn main() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder
        .target(Target::Stdout)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

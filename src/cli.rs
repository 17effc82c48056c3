use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command, value_parser};

use std::path::PathBuf;

use crate::collecter::settings::Settings;

/// Default baud rate of NMEA-0183 sensors
const DEFAULT_BAUD_RATE: u32 = 4800;

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self {
            matches: Self::command().get_matches(),
        }
    }

    fn command() -> Command {
        Command::new("wx2rinex")
            .author("Guillaume W. Bres, <guillaume.bressaix@gmail.com>")
            .version(env!("CARGO_PKG_VERSION"))
            .about("NMEA weather station to RINEX Meteo collecter")
            .color(ColorChoice::Always)
            .arg_required_else_help(true)
            .next_help_heading("Serial port (Active device, weather station)")
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .required_unless_present_any(["file"])
                    .help("Define serial port. Example /dev/ttyS0 on Linux"),
            )
            .arg(
                Arg::new("baudrate")
                    .short('b')
                    .long("baud")
                    .required(false)
                    .value_name("Baudrate (u32)")
                    .value_parser(value_parser!(u32))
                    .help("Define serial port baud rate. By default we use 4800, which is the NMEA-0183 standard rate"),
            )
            .next_help_heading("File interface (Passive mode)")
            .arg(
                Arg::new("file")
                    .long("file")
                    .short('f')
                    .value_name("FILENAME")
                    .action(ArgAction::Append)
                    .required_unless_present_any(["port"])
                    .help("Replay a captured NMEA stream. Use as many as needed.
Files are consumed one after the other, so they should be loaded in chronological order.
Gzip compressed captures are supported but they must be terminated with '.gz'"),
            )
            .arg(
                Arg::new("checksum")
                    .long("checksum")
                    .action(ArgAction::SetTrue)
                    .help("Reject NMEA sentences with missing or invalid checksum. Disabled by default."),
            )
            .next_help_heading("RINEX Collection")
            .arg(
                Arg::new("interval")
                    .short('i')
                    .long("interval")
                    .value_name("SECONDS")
                    .value_parser(value_parser!(u32))
                    .default_value("60")
                    .help("Sampling interval, in seconds. One record is released per interval."),
            )
            .arg(
                Arg::new("session")
                    .short('s')
                    .long("session")
                    .value_name("MINUTES")
                    .value_parser(value_parser!(u32))
                    .default_value("1440")
                    .help("Session (=file) length, in minutes. Must be a multiple of 5 minutes.
Files are aligned to session boundaries. Default is one file per day."),
            )
            .arg(
                Arg::new("name")
                    .long("name")
                    .short('n')
                    .action(ArgAction::Set)
                    .default_value("STNM")
                    .help("Define a custom name. To respect standard naming conventions,
this should be a 4 letter code, usually named after your geodetic marker."),
            )
            .arg(
                Arg::new("country")
                    .short('c')
                    .long("country")
                    .action(ArgAction::Set)
                    .default_value("UNK")
                    .help("Specify country code (3 letter) used in file names and marker name."),
            )
            .arg(
                Arg::new("prefix")
                    .short('d')
                    .long("prefix")
                    .value_name("DIRECTORY")
                    .default_value("./")
                    .help("Output directory. Created when it does not exist."),
            )
            .next_help_heading("Header")
            .arg(
                Arg::new("serial")
                    .long("serial")
                    .action(ArgAction::Set)
                    .default_value("UNKNOWN")
                    .help("Sensor serial number"),
            )
            .arg(
                Arg::new("agency")
                    .long("agency")
                    .action(ArgAction::Set)
                    .default_value("OSU")
                    .help("Define name of your Agency, to be used in all Headers"),
            )
            .arg(
                Arg::new("model")
                    .long("model")
                    .action(ArgAction::Set)
                    .default_value("AIRMAR")
                    .help("Sensor model"),
            )
            .arg(
                Arg::new("sensor-type")
                    .long("sensor-type")
                    .action(ArgAction::Set)
                    .default_value("150WXS")
                    .help("Sensor type"),
            )
    }

    #[cfg(test)]
    fn from_args(args: &[&str]) -> Self {
        Self {
            matches: Self::command().get_matches_from(args),
        }
    }

    /// Returns User serial port specification
    pub fn serial_port(&self) -> Option<&String> {
        self.matches.get_one::<String>("port")
    }

    /// Input file paths
    pub fn filepaths(&self) -> Vec<&String> {
        if let Some(fp) = self.matches.get_many::<String>("file") {
            fp.collect()
        } else {
            Vec::new()
        }
    }

    /// Returns User baud rate specification
    pub fn baud_rate(&self) -> u32 {
        self.matches
            .get_one::<u32>("baudrate")
            .copied()
            .unwrap_or(DEFAULT_BAUD_RATE)
    }

    fn string(&self, key: &str) -> String {
        self.matches
            .get_one::<String>(key)
            .cloned()
            .unwrap_or_default()
    }

    fn integer(&self, key: &str) -> u32 {
        self.matches.get_one::<u32>(key).copied().unwrap_or_default()
    }

    /// Collection [Settings], not validated yet
    pub fn settings(&self) -> Settings {
        Settings {
            name: self.string("name"),
            country: self.string("country"),
            serial_number: self.string("serial"),
            session_minutes: self.integer("session"),
            interval_s: self.integer("interval"),
            prefix: PathBuf::from(self.string("prefix")),
            agency: self.string("agency"),
            model: self.string("model"),
            sensor_type: self.string("sensor-type"),
            checksum: self.matches.get_flag("checksum"),
        }
    }
}

use std::path::{Path, PathBuf};

use hifitime::prelude::Epoch;

use crate::{Error, utils::year_doy_hhmm};

/// Minutes per day
const DAY_MINUTES: u32 = 1440;

/// Collection [Settings]. Validated once, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Station name (up to 6 characters)
    pub name: String,

    /// Country code (3 letters)
    pub country: String,

    /// Sensor serial number
    pub serial_number: String,

    /// Session (=file) length, in minutes
    pub session_minutes: u32,

    /// Sampling interval, in seconds
    pub interval_s: u32,

    /// Output directory
    pub prefix: PathBuf,

    /// Run by (header)
    pub agency: String,

    /// Sensor model (header)
    pub model: String,

    /// Sensor type (header)
    pub sensor_type: String,

    /// Rejects sentences with invalid checksum
    pub checksum: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "STNM".to_string(),
            country: "UNK".to_string(),
            serial_number: "UNKNOWN".to_string(),
            session_minutes: DAY_MINUTES,
            interval_s: 60,
            prefix: PathBuf::from("./"),
            agency: "OSU".to_string(),
            model: "AIRMAR".to_string(),
            sensor_type: "150WXS".to_string(),
            checksum: false,
        }
    }
}

impl Settings {
    /// Verifies these [Settings] may be deployed
    pub fn validate(&self) -> Result<(), Error> {
        if self.session_minutes < 5 || self.session_minutes % 5 > 0 {
            return Err(Error::Configuration(format!(
                "session length should be a multiple of 5 minutes (got {})",
                self.session_minutes
            )));
        }

        if self.interval_s == 0 {
            return Err(Error::Configuration(
                "sampling interval should be positive".to_string(),
            ));
        }

        if self.name.is_empty() || self.name.len() > 6 {
            return Err(Error::Configuration(format!(
                "station name should be 1 to 6 characters (got \"{}\")",
                self.name
            )));
        }

        if self.country.len() > 3 {
            return Err(Error::Configuration(format!(
                "country code should be 3 letters (got \"{}\")",
                self.country
            )));
        }

        Ok(())
    }

    /// File period label (01D, 01H, 15M..)
    pub fn period_label(&self) -> String {
        let minutes = self.session_minutes as f64;
        if self.session_minutes >= DAY_MINUTES {
            format!("{:02.0}D", minutes / DAY_MINUTES as f64)
        } else if self.session_minutes >= 60 {
            format!("{:02.0}H", minutes / 60.0)
        } else {
            format!("{:02.0}M", minutes)
        }
    }

    /// Sampling frequency label (01H, 01M, 30S..)
    pub fn frequency_label(&self) -> String {
        let seconds = self.interval_s as f64;
        if self.interval_s >= 3600 {
            format!("{:02.0}H", seconds / 3600.0)
        } else if self.interval_s >= 60 {
            format!("{:02.0}M", seconds / 60.0)
        } else {
            format!("{:02.0}S", seconds)
        }
    }

    /// Marker name, as described in the header
    pub fn marker_name(&self) -> String {
        format!("{}00{}", self.name, self.country.to_uppercase())
    }

    /// File name for a session starting at this [Epoch]
    pub fn filename(&self, t: Epoch) -> String {
        format!(
            "{:0<6}{:0<3}_R_{}_{}_{}_MM.rnx",
            self.name,
            self.country.to_uppercase(),
            year_doy_hhmm(t),
            self.period_label(),
            self.frequency_label(),
        )
    }

    /// Full path of the file for a session starting at this [Epoch]
    pub fn filepath(&self, t: Epoch) -> PathBuf {
        self.prefix.join(self.filename(t))
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.prefix
    }
}

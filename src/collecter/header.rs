use std::io::Write;

use hifitime::prelude::Epoch;

use crate::{acquisition::Fix, collecter::settings::Settings};

/// RINEX revision we produce
const RINEX_VERSION: f64 = 3.05;

/// Observables, in order of appearance in each record
const OBSERVABLES: [&str; 5] = ["PR", "TD", "HR", "WD", "WS"];

/// Sensor accuracy, for each observable
const ACCURACIES: [f64; 5] = [0.5, 1.1, 5.1, 3.1, 0.5];

/// Meteo RINEX [Header], redacted once after the station fix was obtained,
/// and then released at the beginning of each file.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Program that produced this file
    pub program: String,
    /// Run by
    pub agency: String,
    /// Date of production
    pub date: Epoch,
    /// Marker name
    pub marker: String,
    /// Sensor model
    pub model: String,
    /// Sensor type
    pub sensor_type: String,
    /// Sensor serial number
    pub serial_number: String,
    /// ECEF coordinates (m)
    pub ecef: (f64, f64, f64),
    /// Altitude (m)
    pub altitude_m: f64,
}

impl Header {
    pub fn new(settings: &Settings, fix: &Fix, date: Epoch) -> Self {
        Self {
            date,
            program: env!("CARGO_PKG_NAME").to_string(),
            agency: settings.agency.clone(),
            marker: settings.marker_name(),
            model: settings.model.clone(),
            sensor_type: settings.sensor_type.clone(),
            serial_number: settings.serial_number.clone(),
            ecef: fix.ecef,
            altitude_m: fix.position.altitude_m,
        }
    }

    fn production_date(&self) -> String {
        let (y, m, d, hh, mm, ss, _) = self.date.to_gregorian_utc();
        format!(
            "{:04}{:02}{:02} {:02}{:02}{:02} UTC",
            y, m, d, hh, mm, ss
        )
    }

    /// Formats this [Header]
    pub fn format<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(
            w,
            "{:>9.2}{:11}{:<20}{:20}RINEX VERSION / TYPE",
            RINEX_VERSION, "", "METEOROLOGICAL DATA", ""
        )?;

        writeln!(
            w,
            "{:<20}{:<20}{:<20}PGM / RUN BY / DATE",
            self.program,
            self.agency,
            self.production_date()
        )?;

        writeln!(w, "{:<60}MARKER NAME", self.marker)?;

        let observables = OBSERVABLES
            .iter()
            .map(|obs| format!("{:>6}", obs))
            .collect::<String>();

        writeln!(
            w,
            "{:>6}{:<54}# / TYPES OF OBSERV",
            OBSERVABLES.len(),
            observables
        )?;

        for (observable, accuracy) in OBSERVABLES.iter().zip(ACCURACIES.iter()) {
            writeln!(
                w,
                "{:<20}{:<26}{:>7.1}{:4}{} SENSOR MOD/TYPE/ACC",
                self.model, self.sensor_type, accuracy, "", observable
            )?;
        }

        writeln!(
            w,
            "{:<60}COMMENT",
            format!("SERIAL NUMBER: {}", self.serial_number)
        )?;

        writeln!(w, "{:<60}COMMENT", "Wind speed accuracy 5% @ 10 m/s")?;

        let (x, y, z) = self.ecef;

        writeln!(
            w,
            "{:>14.4}{:>14.4}{:>14.4}{:>14.4} PR SENSOR POS XYZ/H",
            x, y, z, self.altitude_m
        )?;

        writeln!(w, "{:60}END OF HEADER", "")
    }
}

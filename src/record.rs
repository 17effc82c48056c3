use hifitime::prelude::Epoch;

use crate::utils::second_of_day;

/// Value of any physics that was not observed yet
pub const NO_VALUE: f64 = 9999.9;

/// Second of day prior any time reference
pub const NO_SECOND: u32 = 9999;

/// Date label of an unresolved time reference
pub const NO_DATE: &str = " 9999 99 99 99 99 99";

/// [SensorRecord] latches the latest value of each physics.
/// Fields are not reset between two ticks: any physics that was not
/// refreshed carries its last known value.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    /// Pressure (mbar)
    pub pressure: f64,
    /// Dry temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// True wind direction (°)
    pub wind_direction: f64,
    /// Wind speed (m/s)
    pub wind_speed: f64,
    /// Latest time reference
    pub epoch: Epoch,
    /// Second of day of the latest time reference
    pub second_of_day: u32,
    /// Fixed width date label
    pub date: String,
}

impl Default for SensorRecord {
    fn default() -> Self {
        Self {
            pressure: NO_VALUE,
            temperature: NO_VALUE,
            humidity: NO_VALUE,
            wind_direction: NO_VALUE,
            wind_speed: NO_VALUE,
            epoch: Epoch::from_gregorian_utc_at_midnight(9999, 12, 31),
            second_of_day: NO_SECOND,
            date: NO_DATE.to_string(),
        }
    }
}

/// Formats a single physics, right aligned on 7 characters.
/// Positive values are preceded by at least one blank.
fn format_value(value: f64) -> String {
    let value = if value.is_sign_negative() {
        format!("{:.1}", value)
    } else {
        format!(" {:.1}", value)
    };
    format!("{:>7}", value)
}

impl std::fmt::Display for SensorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}",
            self.date,
            format_value(self.pressure),
            format_value(self.temperature),
            format_value(self.humidity),
            format_value(self.wind_direction),
            format_value(self.wind_speed),
        )
    }
}

impl SensorRecord {
    /// Latch a new time reference
    pub fn set_epoch(&mut self, epoch: Epoch) {
        let (y, m, d, hh, mm, ss, _) = epoch.to_gregorian_utc();
        self.epoch = epoch;
        self.second_of_day = second_of_day(epoch);
        self.date = format!(
            " {:04} {:02} {:02} {:02} {:02} {:02}",
            y, m, d, hh, mm, ss
        );
    }

    /// Flags the time reference as corrupt. Previous epoch and
    /// second of day are preserved.
    pub fn invalidate_date(&mut self) {
        self.date = NO_DATE.to_string();
    }

    /// Formats this record as a RINEX data line, terminated by '\n'
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

use std::str::FromStr;

use hifitime::{
    efmt::Format,
    prelude::{Epoch, Formatter},
};

use map_3d::{Ellipsoid, deg2rad, geodetic2ecef};

/// Converts geodetic coordinates (decimal degrees, meters)
/// to WGS84 ECEF coordinates (meters).
pub fn geodetic_to_ecef(lat_ddeg: f64, long_ddeg: f64, alt_m: f64) -> (f64, f64, f64) {
    geodetic2ecef(deg2rad(lat_ddeg), deg2rad(long_ddeg), alt_m, Ellipsoid::WGS84)
}

/// Minute of day (0..1440) of this UTC [Epoch]
pub fn minute_of_day(t: Epoch) -> u32 {
    let (_, _, _, hh, mm, _, _) = t.to_gregorian_utc();
    hh as u32 * 60 + mm as u32
}

/// Second of day (0..86400) of this UTC [Epoch]
pub fn second_of_day(t: Epoch) -> u32 {
    let (_, _, _, hh, mm, ss, _) = t.to_gregorian_utc();
    hh as u32 * 3600 + mm as u32 * 60 + ss as u32
}

/// Formats this UTC [Epoch] as YYYYDDDHHMM, used in file names.
pub fn year_doy_hhmm(t: Epoch) -> String {
    match Format::from_str("%Y%j%H%M") {
        Ok(fmt) => Formatter::new(t, fmt).to_string(),
        Err(_) => {
            let (y, _, _, hh, mm, _, _) = t.to_gregorian_utc();
            let doy = t.day_of_year().floor() as u16;
            format!("{:04}{:03}{:02}{:02}", y, doy, hh, mm)
        },
    }
}

/// Returns true if both UTC [Epoch]s fall within the same minute
pub fn same_minute(t0: Epoch, t1: Epoch) -> bool {
    let (y0, m0, d0, hh0, mm0, _, _) = t0.to_gregorian_utc();
    let (y1, m1, d1, hh1, mm1, _, _) = t1.to_gregorian_utc();
    (y0, m0, d0, hh0, mm0) == (y1, m1, d1, hh1, mm1)
}

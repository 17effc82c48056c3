//! NMEA sentences decoding.
//!
//! Only a handful of sentences are of interest to us:
//! - MDA: meteorological composite
//! - XDR: transducer measurements, from which we pick the station pressure
//! - ZDA: time reference
//! - GGA: position fix
use thiserror::Error;

use hifitime::prelude::Epoch;

use crate::{
    record::{NO_VALUE, SensorRecord},
    utils::geodetic_to_ecef,
};

/// Minimal number of fields of a valid MDA sentence
const MDA_MIN_FIELDS: usize = 20;

/// Pressure channel tag, in XDR sentences
const XDR_PRESSURE_TAG: &str = "STNP";

/// XDR field that holds the station pressure
const XDR_PRESSURE_FIELD: usize = 14;

/// Bars to millibars
const BAR_TO_MBAR: f64 = 1.0E3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("malformed {0} sentence: {1} fields")]
    MalformedSentence(&'static str, usize),
    #[error("invalid number \"{0}\"")]
    InvalidNumber(String),
    #[error("invalid time reference")]
    TimeParsing,
    #[error("invalid position")]
    PositionParsing,
    #[error("latitude out of range: {0}°")]
    LatitudeOutOfRange(f64),
    #[error("checksum mismatch")]
    ChecksumMismatch,
}

/// Sentences we know how to interpret
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SentenceType {
    /// Meteorological composite
    Mda,
    /// Transducer measurements
    Xdr,
    /// Time reference
    Zda,
    /// Position fix
    Gga,
    /// Any other sentence
    Other,
}

impl SentenceType {
    fn from_key(key: &str) -> Self {
        if key.ends_with("WIMDA") {
            Self::Mda
        } else if key.ends_with("YXXDR") {
            Self::Xdr
        } else if key.ends_with("GPZDA") {
            Self::Zda
        } else if key.ends_with("GPGGA") {
            Self::Gga
        } else {
            Self::Other
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Mda => "MDA",
            Self::Xdr => "XDR",
            Self::Zda => "ZDA",
            Self::Gga => "GGA",
            Self::Other => "unknown",
        }
    }
}

/// Geodetic position, as resolved by the GNSS receiver
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Position {
    /// Latitude (decimal degrees)
    pub latitude_ddeg: f64,
    /// Longitude (decimal degrees)
    pub longitude_ddeg: f64,
    /// Altitude (m)
    pub altitude_m: f64,
}

impl Position {
    /// ECEF coordinates (m)
    pub fn ecef(&self) -> (f64, f64, f64) {
        geodetic_to_ecef(self.latitude_ddeg, self.longitude_ddeg, self.altitude_m)
    }
}

/// Outcome of a decoded sentence
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Meteorological record was updated
    Meteo,
    /// Pressure was updated
    Pressure,
    /// New time reference
    Time(Epoch),
    /// Position fix
    Position(Position),
    /// Sentence of no interest
    Ignored,
}

/// Splitted sentence
#[derive(Debug, Clone)]
pub struct Sentence<'a> {
    pub sentence_type: SentenceType,
    pub fields: Vec<&'a str>,
}

/// Replaces empty fields with [NO_VALUE]
fn parse_value(field: &str) -> Result<f64, Error> {
    let field = field.trim();

    if field.is_empty() {
        return Ok(NO_VALUE);
    }

    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::InvalidNumber(field.to_string())),
    }
}

fn parse_integer<T: std::str::FromStr>(field: &str) -> Result<T, Error> {
    field.trim().parse::<T>().map_err(|_| Error::TimeParsing)
}

/// Converts (D)DDMM.MMMM angle to decimal degrees
fn parse_angle(field: &str, degrees_width: usize, hemisphere: &str) -> Result<f64, Error> {
    if field.len() <= degrees_width || !field.is_char_boundary(degrees_width) {
        return Err(Error::PositionParsing);
    }

    let degrees = field[..degrees_width]
        .parse::<f64>()
        .map_err(|_| Error::PositionParsing)?;

    let minutes = field[degrees_width..]
        .parse::<f64>()
        .map_err(|_| Error::PositionParsing)?;

    let angle = degrees + minutes / 60.0;

    match hemisphere {
        "S" | "W" => Ok(-angle),
        _ => Ok(angle),
    }
}

/// XOR of all bytes in between '$' and '*'
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |cs, b| cs ^ b)
}

impl<'a> Sentence<'a> {
    /// Splits a raw line into [Sentence]. Trailing checksum is discarded,
    /// and verified only if `verify` is set.
    pub fn parse(line: &'a str, verify: bool) -> Result<Self, Error> {
        let line = line.trim();

        let (body, cs) = match line.rsplit_once('*') {
            Some((body, cs)) => (body, Some(cs)),
            None => (line, None),
        };

        if verify {
            let start = body.find('$').map(|i| i + 1).unwrap_or(0);
            let cs = cs.ok_or(Error::ChecksumMismatch)?;
            let expected = u8::from_str_radix(cs.trim(), 16).map_err(|_| Error::ChecksumMismatch)?;

            if checksum(&body[start..]) != expected {
                return Err(Error::ChecksumMismatch);
            }
        }

        let fields = body.split(',').collect::<Vec<_>>();

        let key = fields[0].trim_start_matches('$');

        Ok(Self {
            sentence_type: SentenceType::from_key(key),
            fields,
        })
    }

    fn field(&self, index: usize) -> Result<&'a str, Error> {
        self.fields
            .get(index)
            .copied()
            .ok_or(Error::MalformedSentence(
                self.sentence_type.name(),
                self.fields.len(),
            ))
    }

    /// Interprets ZDA sentence: HHMMSS.SS,DD,MM,YYYY
    pub fn time(&self) -> Result<Epoch, Error> {
        if self.fields.len() < 5 {
            return Err(Error::TimeParsing);
        }

        let hhmmss = self.fields[1].trim();
        let hhmmss = hhmmss.split('.').next().unwrap_or_default();

        if hhmmss.len() != 6 || !hhmmss.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::TimeParsing);
        }

        let hh = parse_integer::<u8>(&hhmmss[0..2])?;
        let mm = parse_integer::<u8>(&hhmmss[2..4])?;
        let ss = parse_integer::<u8>(&hhmmss[4..6])?;

        let day = parse_integer::<u8>(self.fields[2])?;
        let month = parse_integer::<u8>(self.fields[3])?;
        let year = parse_integer::<i32>(self.fields[4])?;

        // 24:00:00 is a valid gregorian instant, but not a valid ZDA time
        if hh > 23 || !(1900..=9998).contains(&year) {
            return Err(Error::TimeParsing);
        }

        Epoch::maybe_from_gregorian_utc(year, month, day, hh, mm, ss, 0)
            .map_err(|_| Error::TimeParsing)
    }

    /// Interprets GGA sentence
    pub fn position(&self) -> Result<Position, Error> {
        if self.fields.len() < 10 {
            return Err(Error::PositionParsing);
        }

        let latitude_ddeg = parse_angle(self.fields[2].trim(), 2, self.fields[3].trim())?;
        let longitude_ddeg = parse_angle(self.fields[4].trim(), 3, self.fields[5].trim())?;

        let altitude_m = self.fields[9]
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::PositionParsing)?;

        if !latitude_ddeg.is_finite() || !longitude_ddeg.is_finite() || !altitude_m.is_finite() {
            return Err(Error::PositionParsing);
        }

        if latitude_ddeg.abs() > 90.0 {
            return Err(Error::LatitudeOutOfRange(latitude_ddeg));
        }

        Ok(Position {
            latitude_ddeg,
            longitude_ddeg,
            altitude_m,
        })
    }
}

/// [Decoder] updates a [SensorRecord] from a sentence stream.
#[derive(Debug, Default, Copy, Clone)]
pub struct Decoder {
    /// Rejects sentences with invalid checksum
    pub verify_checksum: bool,
}

impl Decoder {
    pub fn new(verify_checksum: bool) -> Self {
        Self { verify_checksum }
    }

    /// Splits this line into a [Sentence]
    pub fn sentence<'a>(&self, line: &'a str) -> Result<Sentence<'a>, Error> {
        Sentence::parse(line, self.verify_checksum)
    }

    /// Decodes a single line and updates the [SensorRecord].
    /// On any error, the record is left untouched, except for the date
    /// label which is invalidated by a corrupt time reference.
    pub fn decode(&self, line: &str, record: &mut SensorRecord) -> Result<Decoded, Error> {
        let sentence = self.sentence(line)?;

        match sentence.sentence_type {
            SentenceType::Mda => {
                if sentence.fields.len() < MDA_MIN_FIELDS {
                    return Err(Error::MalformedSentence("MDA", sentence.fields.len()));
                }

                let temperature = parse_value(sentence.fields[5])?;
                let humidity = parse_value(sentence.fields[9])?;
                let wind_direction = parse_value(sentence.fields[13])?;
                let wind_speed = parse_value(sentence.fields[19])?;

                record.temperature = temperature;
                record.humidity = humidity;
                record.wind_direction = wind_direction;
                record.wind_speed = wind_speed;

                Ok(Decoded::Meteo)
            },
            SentenceType::Xdr => {
                if !sentence.fields.contains(&XDR_PRESSURE_TAG) {
                    return Ok(Decoded::Ignored);
                }

                let pressure = parse_value(sentence.field(XDR_PRESSURE_FIELD)?)?;

                record.pressure = if pressure == NO_VALUE {
                    pressure
                } else {
                    pressure * BAR_TO_MBAR
                };

                Ok(Decoded::Pressure)
            },
            SentenceType::Zda => match sentence.time() {
                Ok(epoch) => {
                    record.set_epoch(epoch);
                    Ok(Decoded::Time(epoch))
                },
                Err(e) => {
                    record.invalidate_date();
                    Err(e)
                },
            },
            SentenceType::Gga => Ok(Decoded::Position(sentence.position()?)),
            SentenceType::Other => Ok(Decoded::Ignored),
        }
    }
}

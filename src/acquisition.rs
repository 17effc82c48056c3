//! Station fix acquisition.
//!
//! We first lock to the GNSS time reference, then wait for a valid
//! position fix. No timeout applies: we wait until both are obtained.
use std::time::{Duration, Instant};

use hifitime::prelude::Epoch;
use log::{debug, info, warn};

use crate::{
    Error,
    device::Device,
    nmea::{Decoder, Error as DecodingError, Position, SentenceType},
};

/// Station [Fix], frozen once obtained
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fix {
    /// Time reference when acquisition started
    pub epoch: Epoch,
    /// Geodetic position
    pub position: Position,
    /// ECEF coordinates (m)
    pub ecef: (f64, f64, f64),
}

impl Fix {
    pub fn new(epoch: Epoch, position: Position) -> Self {
        Self {
            epoch,
            position,
            ecef: position.ecef(),
        }
    }
}

/// Acquisition [State]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum State {
    /// Waiting for a time reference
    WaitTime,
    /// Time locked, waiting for a position fix
    WaitPosition(Epoch),
    /// Ready to collect
    Ready(Fix),
}

pub struct Acquisition {
    decoder: Decoder,
    /// Pause after each failed attempt
    pause: Duration,
    state: State,
}

impl Acquisition {
    pub fn new(decoder: Decoder, pause: Duration) -> Self {
        Self {
            decoder,
            pause,
            state: State::WaitTime,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Latches a new line. Sentences that do not concern current [State]
    /// are discarded. Returns an error when a sentence of interest
    /// could not be interpreted.
    pub fn latch(&mut self, line: &str) -> Result<(), DecodingError> {
        let sentence = self.decoder.sentence(line)?;

        match (self.state, sentence.sentence_type) {
            (State::WaitTime, SentenceType::Zda) => {
                let epoch = sentence.time()?;
                info!("{} - locked to GNSS time", epoch);
                info!("{} - acquiring station coordinates", epoch);
                self.state = State::WaitPosition(epoch);
            },
            (State::WaitPosition(epoch), SentenceType::Gga) => {
                let position = sentence.position()?;
                let fix = Fix::new(epoch, position);

                debug!(
                    "{} - lat={:.6}° long={:.6}° alt={:.3}m",
                    epoch, position.latitude_ddeg, position.longitude_ddeg, position.altitude_m
                );

                let (x, y, z) = fix.ecef;
                info!("{} - station fix: x={:.4}m y={:.4}m z={:.4}m", epoch, x, y, z);

                self.state = State::Ready(fix);
            },
            _ => {},
        }

        Ok(())
    }

    /// Consumes the [Device] until the station [Fix] is obtained.
    pub fn run(&mut self, device: &mut Device) -> Result<Fix, Error> {
        let t0 = Instant::now();

        info!("locking to GNSS time");

        loop {
            if let State::Ready(fix) = self.state {
                info!("{} - time to fix: {:?}", fix.epoch, t0.elapsed());
                return Ok(fix);
            }

            let line = match device.read_line() {
                Ok(line) => line,
                Err(Error::Transport(e)) => {
                    warn!("transport error during acquisition: {}", e);
                    device.recover()?;
                    continue;
                },
                Err(e) => return Err(e),
            };

            match self.latch(&line) {
                Ok(()) => {},
                Err(DecodingError::ChecksumMismatch) => {
                    debug!("checksum mismatch: \"{}\"", line.trim_end());
                },
                Err(e) => {
                    info!("{}: waiting {:?} for a valid fix", e, self.pause);
                    std::thread::sleep(self.pause);
                },
            }
        }
    }
}

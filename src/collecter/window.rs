//! Session window management.
//!
//! Restart safety relies on file existence only: a single collecter
//! instance is assumed per output directory.
use std::path::PathBuf;

use log::warn;

use hifitime::prelude::{Duration, Epoch};

use crate::{
    collecter::{archive::Archive, settings::Settings},
    utils::{minute_of_day, same_minute},
};

/// Returns the most recent session boundary prior this [Epoch],
/// with seconds and sub-seconds zeroed.
pub fn aligned_start(t: Epoch, session_minutes: u32) -> Epoch {
    let (y, m, d, hh, mm, _, _) = t.to_gregorian_utc();
    let minute = Epoch::from_gregorian_utc(y, m, d, hh, mm, 0, 0);
    let offset = minute_of_day(t) % session_minutes;
    minute - Duration::from_seconds(offset as f64 * 60.0)
}

/// Active session [Window]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Window {
    /// Session length (minutes)
    session_minutes: u32,
    /// [Epoch] of the latest record when this [Window] was opened
    pub opened: Epoch,
}

impl Window {
    /// Opens a new [Window] at this [Epoch].
    pub fn new(opened: Epoch, session_minutes: u32) -> Self {
        Self {
            opened,
            session_minutes,
        }
    }

    /// Returns true if this [Epoch] terminates the [Window].
    /// A record that lies within the very minute this [Window]
    /// was opened never terminates it.
    pub fn is_terminated_by(&self, t: Epoch) -> bool {
        if minute_of_day(t) % self.session_minutes > 0 {
            return false;
        }
        !same_minute(self.opened, t)
    }

    /// Selects the file path of a session observed at this [Epoch].
    /// The aligned file name is preferred. When it was already produced,
    /// we fall back to a name that follows this [Epoch], so that previous
    /// content is never overwritten.
    pub fn filepath(settings: &Settings, t: Epoch, archive: &Archive) -> PathBuf {
        let start = aligned_start(t, settings.session_minutes);
        let candidate = settings.filepath(start);

        if !archive.is_known(&candidate) {
            return candidate;
        }

        let mut t = t;

        loop {
            let fallback = settings.filepath(t);

            if !archive.is_known(&fallback) {
                warn!(
                    "{} already exists: falling back to {}",
                    candidate.display(),
                    fallback.display()
                );
                return fallback;
            }

            t = t + Duration::from_seconds(60.0);
        }
    }
}

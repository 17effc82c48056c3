use hifitime::prelude::{Duration, Epoch};

use log::info;

#[derive(Debug)]
pub struct Runtime {
    /// Current [Epoch]
    pub epoch: Epoch,

    /// Epoch of deployment
    deploy_time: Epoch,

    /// Uptime as [Duration]
    pub uptime: Duration,

    /// Total number of sentences read
    pub sentences: usize,

    /// Sentences that could not be interpreted
    pub rejections: usize,

    /// Total number of records released
    pub records: usize,

    /// Total number of files produced
    pub files: usize,
}

impl Runtime {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            deploy_time: epoch,
            uptime: Default::default(),
            sentences: 0,
            rejections: 0,
            records: 0,
            files: 0,
        }
    }

    /// Update latest epoch
    pub fn new_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch;
        self.uptime = epoch - self.deploy_time;
    }

    /// Ratio of rejected sentences (%)
    pub fn rejection_rate(&self) -> f64 {
        if self.sentences == 0 {
            0.0
        } else {
            self.rejections as f64 * 100.0 / self.sentences as f64
        }
    }

    /// Logs a summary of this session
    pub fn summary(&self) {
        info!(
            "{} - uptime: {} | sentences: {} ({:.1}% rejected) | records: {} | files: {}",
            self.epoch,
            self.uptime,
            self.sentences,
            self.rejection_rate(),
            self.records,
            self.files
        );
    }
}

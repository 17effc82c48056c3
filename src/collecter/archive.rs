use std::{
    collections::HashSet,
    ffi::OsString,
    fs::File,
    path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use itertools::Itertools;
use log::{debug, error, info};

use crate::Error;

/// Gzip compression level of archived files
const COMPRESSION_LEVEL: u32 = 5;

/// Returns the path of the compressed copy of this file
pub fn gz_path(path: &Path) -> PathBuf {
    let mut gz = OsString::from(path.as_os_str());
    gz.push(".gz");
    PathBuf::from(gz)
}

/// [Archive] compresses terminated files and keeps track of
/// every file name that was already produced.
#[derive(Debug, Default, Clone)]
pub struct Archive {
    /// Logical (uncompressed) names
    known: HashSet<PathBuf>,
}

impl Archive {
    /// Sweeps the output directory for leftovers of a previous run.
    /// Uncompressed files are archived, compressed files are registered,
    /// so none of them gets produced twice.
    pub fn sweep(dir: &Path) -> Result<Self, Error> {
        let mut archive = Self::default();

        let entries = std::fs::read_dir(dir).map_err(|e| Error::file(dir, e))?;

        let paths = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .sorted()
            .collect::<Vec<_>>();

        for path in paths.iter() {
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("rnx") => {
                    info!("compressing previously uncompressed {}", path.display());

                    if let Err(e) = archive.compress(path) {
                        error!("failed to archive {}: {}", path.display(), e);
                    }
                },
                Some("gz") => {
                    let logical = path.with_extension("");
                    debug!("{} was previously archived", logical.display());
                    archive.known.insert(logical);
                },
                _ => {},
            }
        }

        Ok(archive)
    }

    /// Compresses this file, removes the uncompressed copy
    /// and returns the path of the compressed file.
    pub fn compress(&mut self, path: &Path) -> Result<PathBuf, Error> {
        let gz = gz_path(path);

        let mut input = File::open(path).map_err(|e| Error::file(path, e))?;
        let output = File::create(&gz).map_err(|e| Error::file(&gz, e))?;

        let mut encoder = GzEncoder::new(output, Compression::new(COMPRESSION_LEVEL));

        std::io::copy(&mut input, &mut encoder).map_err(|e| Error::file(&gz, e))?;
        encoder.finish().map_err(|e| Error::file(&gz, e))?;

        std::fs::remove_file(path).map_err(|e| Error::file(path, e))?;

        self.known.insert(path.to_path_buf());
        Ok(gz)
    }

    /// Returns true if this file was already produced, in either form.
    pub fn is_known(&self, path: &Path) -> bool {
        self.known.contains(path) || path.exists() || gz_path(path).exists()
    }
}

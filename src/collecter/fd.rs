use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{Error, collecter::header::Header};

/// [OutputFile] is the RINEX file of the active session.
pub struct OutputFile {
    path: PathBuf,
    fd: BufWriter<File>,
    records: usize,
}

impl OutputFile {
    /// Creates a new file and releases the [Header] right away
    pub fn create(path: &Path, header: &Header) -> Result<Self, Error> {
        let fd = File::create(path).map_err(|e| Error::file(path, e))?;

        let mut fd = BufWriter::new(fd);

        header.format(&mut fd).map_err(|e| Error::file(path, e))?;
        fd.flush().map_err(|e| Error::file(path, e))?;

        Ok(Self {
            fd,
            records: 0,
            path: path.to_path_buf(),
        })
    }

    /// Appends a data line. Content is flushed immediately,
    /// so the file remains exploitable at all times.
    pub fn append(&mut self, line: &str) -> Result<(), Error> {
        self.fd
            .write_all(line.as_bytes())
            .and_then(|_| self.fd.flush())
            .map_err(|e| Error::file(&self.path, e))?;

        self.records += 1;
        Ok(())
    }

    /// Number of data lines written so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Closes this file
    pub fn close(mut self) -> Result<PathBuf, Error> {
        self.fd.flush().map_err(|e| Error::file(&self.path, e))?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod test {
    use super::OutputFile;
    use crate::{
        acquisition::Fix, collecter::header::Header, collecter::settings::Settings,
        nmea::Position,
    };
    use hifitime::prelude::Epoch;

    #[test]
    fn header_then_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("STNM00UNK_R_20233111200_01H_01M_MM.rnx");

        let t = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 0, 0);

        let fix = Fix::new(
            t,
            Position {
                latitude_ddeg: 48.1173,
                longitude_ddeg: 11.516667,
                altitude_m: 545.4,
            },
        );

        let header = Header::new(&Settings::default(), &fix, t);

        let mut fd = OutputFile::create(&path, &header).unwrap();

        // header is available as soon as the file exists
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 13);
        assert!(content.ends_with("END OF HEADER\n"));

        let line = " 2023 11 07 12 00 00 1013.7   23.4   55.1  180.0    3.2\n";

        fd.append(line).unwrap();
        fd.append(line).unwrap();
        assert_eq!(fd.records(), 2);

        let closed = fd.close().unwrap();
        assert_eq!(closed, path);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines = content.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 15);
        assert_eq!(lines[13], line.trim_end());
        assert_eq!(lines[14], line.trim_end());
    }

    #[test]
    fn creation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("file.rnx");

        let t = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 0, 0);

        let fix = Fix::new(
            t,
            Position {
                latitude_ddeg: 0.0,
                longitude_ddeg: 0.0,
                altitude_m: 0.0,
            },
        );

        let header = Header::new(&Settings::default(), &fix, t);
        assert!(OutputFile::create(&path, &header).is_err());
    }
}

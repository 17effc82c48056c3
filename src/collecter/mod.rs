use hifitime::prelude::Epoch;
use log::{debug, error, info, trace, warn};

pub mod archive;
pub mod fd;
pub mod header;
pub mod settings;
pub mod window;

use crate::{
    Error,
    acquisition::Fix,
    device::Device,
    nmea::{Decoded, Decoder},
    record::SensorRecord,
    runtime::Runtime,
};

use archive::Archive;
use fd::OutputFile;
use header::Header;
use settings::Settings;
use window::Window;

#[derive(Debug, Default, Copy, Clone, PartialEq)]
enum State {
    /// Opens a new file
    #[default]
    OpenWindow,
    /// Collects records into current file
    Accumulate,
    /// Terminates current file
    Rotate,
}

/// Meteo RINEX [Collecter]
pub struct Collecter {
    settings: Settings,
    decoder: Decoder,
    header: Header,
    archive: Archive,
    /// Latest values of each physics
    record: SensorRecord,
    /// Record that was due when the previous window ended
    pending: Option<String>,
    window: Option<Window>,
    fd: Option<OutputFile>,
    /// Reference [Epoch] of the next window
    t_ref: Epoch,
    runtime: Runtime,
    state: State,
}

impl Collecter {
    /// Builds new [Collecter], ready to produce files
    /// from the station [Fix]
    pub fn new(settings: Settings, header: Header, archive: Archive, fix: &Fix) -> Self {
        let record = SensorRecord {
            epoch: fix.epoch,
            ..Default::default()
        };

        Self {
            decoder: Decoder::new(settings.checksum),
            settings,
            header,
            archive,
            record,
            pending: None,
            window: None,
            fd: None,
            t_ref: fix.epoch,
            runtime: Runtime::new(fix.epoch),
            state: Default::default(),
        }
    }

    /// Collects the stream until it ends. Only passive (read-only)
    /// streams come to an end, in which case the current file is archived.
    pub fn run(&mut self, device: &mut Device) -> Result<(), Error> {
        loop {
            match self.state {
                State::OpenWindow => {
                    self.open_window()?;
                    self.state = State::Accumulate;
                },
                State::Accumulate => {
                    match self.next_tick(device) {
                        Ok(()) => {},
                        Err(Error::EndOfStream) => {
                            info!("{} - consumed all content", self.runtime.epoch);
                            self.close_window();
                            self.runtime.summary();
                            return Ok(());
                        },
                        Err(e) => return Err(e),
                    }

                    let line = self.record.to_line();
                    let due = self.record.second_of_day % self.settings.interval_s == 0;

                    let terminated = self
                        .window
                        .is_some_and(|window| window.is_terminated_by(self.record.epoch));

                    self.t_ref = self.record.epoch;

                    if terminated {
                        if due {
                            self.pending = Some(line);
                        }
                        self.state = State::Rotate;
                    } else if due {
                        self.release(&line);
                    }
                },
                State::Rotate => {
                    self.close_window();
                    self.runtime.summary();
                    self.state = State::OpenWindow;
                },
            }
        }
    }

    /// Consumes the stream until the time reference moves forward
    fn next_tick(&mut self, device: &mut Device) -> Result<(), Error> {
        let last = self.record.second_of_day;

        while self.record.second_of_day == last {
            let line = match device.read_line() {
                Ok(line) => line,
                Err(Error::Transport(e)) => {
                    warn!("{} - transport error: {}", self.runtime.epoch, e);
                    device.recover()?;
                    continue;
                },
                Err(e) => return Err(e),
            };

            self.runtime.sentences += 1;

            match self.decoder.decode(&line, &mut self.record) {
                Ok(Decoded::Ignored) => {},
                Ok(decoded) => trace!("{} - {:?}", self.runtime.epoch, decoded),
                Err(e) => {
                    self.runtime.rejections += 1;
                    debug!("{} - rejected \"{}\": {}", self.runtime.epoch, line.trim_end(), e);
                },
            }
        }

        self.runtime.new_epoch(self.record.epoch);
        Ok(())
    }

    fn open_window(&mut self) -> Result<(), Error> {
        let path = Window::filepath(&self.settings, self.t_ref, &self.archive);

        let mut fd = OutputFile::create(&path, &self.header)?;
        info!("{} - starting new file: {}", self.t_ref, path.display());

        if let Some(line) = self.pending.take() {
            match fd.append(&line) {
                Ok(()) => {
                    self.runtime.records += 1;
                    trace!("{}", line.trim_end());
                },
                Err(e) => error!("{} - failed to release record: {}", self.t_ref, e),
            }
        }

        self.window = Some(Window::new(
            self.record.epoch,
            self.settings.session_minutes,
        ));

        self.fd = Some(fd);
        Ok(())
    }

    fn release(&mut self, line: &str) {
        if let Some(fd) = &mut self.fd {
            match fd.append(line) {
                Ok(()) => {
                    self.runtime.records += 1;
                    trace!("{}", line.trim_end());
                },
                Err(e) => error!("{} - failed to release record: {}", self.record.epoch, e),
            }
        }
    }

    /// Closes and archives the current file
    fn close_window(&mut self) {
        self.window = None;

        let Some(fd) = self.fd.take() else {
            return;
        };

        let records = fd.records();

        match fd.close() {
            Ok(path) => {
                info!(
                    "{} - closed {} ({} records)",
                    self.runtime.epoch,
                    path.display(),
                    records
                );

                self.runtime.files += 1;

                match self.archive.compress(&path) {
                    Ok(gz) => info!("{} - archived {}", self.runtime.epoch, gz.display()),
                    Err(e) => error!("{} - archiving failure: {}", self.runtime.epoch, e),
                }
            },
            Err(e) => error!("{} - failed to close file: {}", self.runtime.epoch, e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Collecter, archive::Archive, header::Header, settings::Settings};
    use crate::{acquisition::Fix, device::Device, nmea::Position};

    use flate2::{Compression, read::GzDecoder, write::GzEncoder};
    use hifitime::prelude::{Duration, Epoch};
    use itertools::Itertools;

    use std::{
        io::{Cursor, Read, Write},
        path::Path,
    };

    const MDA: &str =
        "$WIMDA,29.9350,I,1.0137,B,23.4,C,,C,55.1,,12.5,C,180.0,T,178.2,M,6.2,N,3.2,M*2A";

    const XDR: &str = "$YXXDR,C,,C,WCHR,C,,C,TEMP,C,12.5,C,DEWP,P,1.0137,B,STNP*4B";

    fn zda(t: Epoch) -> String {
        let (y, m, d, hh, mm, ss, _) = t.to_gregorian_utc();
        format!(
            "$GPZDA,{:02}{:02}{:02}.00,{:02},{:02},{:04},,\r\n",
            hh, mm, ss, d, m, y
        )
    }

    /// One time reference per second, in between t0 (included) and t1 (excluded),
    /// each followed by meteo sentences.
    fn stream(t0: Epoch, t1: Epoch) -> String {
        let mut content = String::new();
        let mut t = t0;

        while t < t1 {
            content.push_str(&zda(t));
            content.push_str(MDA);
            content.push_str("\r\n");
            content.push_str(XDR);
            content.push_str("\r\n");
            t = t + Duration::from_seconds(1.0);
        }

        content
    }

    fn fix(t: Epoch) -> Fix {
        Fix::new(
            t,
            Position {
                latitude_ddeg: 48.1173,
                longitude_ddeg: 11.516667,
                altitude_m: 545.4,
            },
        )
    }

    fn collecter(settings: &Settings, t: Epoch) -> Collecter {
        let fix = fix(t);
        let header = Header::new(settings, &fix, t);
        let archive = Archive::sweep(settings.output_dir()).unwrap();
        Collecter::new(settings.clone(), header, archive, &fix)
    }

    fn decompress(path: &Path) -> String {
        let fd = std::fs::File::open(path).unwrap();
        let mut content = String::new();
        GzDecoder::new(fd).read_to_string(&mut content).unwrap();
        content
    }

    /// Data lines of this archived file
    fn data_lines(path: &Path) -> Vec<String> {
        decompress(path)
            .lines()
            .skip_while(|line| !line.ends_with("END OF HEADER"))
            .skip(1)
            .map(|line| line.to_string())
            .collect()
    }

    fn output_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .sorted()
            .collect()
    }

    #[test]
    fn hourly_rotation() {
        let dir = tempfile::tempdir().unwrap();

        let settings = Settings {
            prefix: dir.path().to_path_buf(),
            session_minutes: 60,
            interval_s: 60,
            ..Default::default()
        };

        let t0 = Epoch::from_gregorian_utc(2023, 11, 7, 2, 58, 30, 0);
        let t1 = Epoch::from_gregorian_utc(2023, 11, 7, 3, 1, 1, 0);

        let mut device = Device::from_reader(Cursor::new(stream(t0, t1).into_bytes()));

        let mut collecter = collecter(&settings, t0);
        collecter.run(&mut device).unwrap();

        assert_eq!(
            output_files(dir.path()),
            vec![
                "STNM00UNK_R_20233110200_01H_01M_MM.rnx.gz",
                "STNM00UNK_R_20233110300_01H_01M_MM.rnx.gz",
            ]
        );

        let first = data_lines(&dir.path().join("STNM00UNK_R_20233110200_01H_01M_MM.rnx.gz"));
        assert_eq!(
            first,
            vec![" 2023 11 07 02 59 00 1013.7   23.4   55.1  180.0    3.2"]
        );

        let second = data_lines(&dir.path().join("STNM00UNK_R_20233110300_01H_01M_MM.rnx.gz"));
        assert_eq!(
            second,
            vec![
                " 2023 11 07 03 00 00 1013.7   23.4   55.1  180.0    3.2",
                " 2023 11 07 03 01 00 1013.7   23.4   55.1  180.0    3.2",
            ]
        );

        // header precedes the boundary record
        let content = decompress(&dir.path().join("STNM00UNK_R_20233110300_01H_01M_MM.rnx.gz"));
        assert!(content.starts_with("     3.05           METEOROLOGICAL DATA"));
        assert_eq!(content.lines().count(), 15);

        assert_eq!(collecter.runtime.files, 2);
        assert_eq!(collecter.runtime.records, 3);
        assert_eq!(collecter.runtime.rejections, 0);
    }

    #[test]
    fn decimation() {
        let dir = tempfile::tempdir().unwrap();

        let settings = Settings {
            prefix: dir.path().to_path_buf(),
            session_minutes: 60,
            interval_s: 10,
            ..Default::default()
        };

        let t0 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 5, 0);
        let t1 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 41, 0);

        let mut device = Device::from_reader(Cursor::new(stream(t0, t1).into_bytes()));

        let mut collecter = collecter(&settings, t0);
        collecter.run(&mut device).unwrap();

        let lines = data_lines(&dir.path().join("STNM00UNK_R_20233111200_01H_10S_MM.rnx.gz"));

        let seconds = lines
            .iter()
            .map(|line| line[18..20].to_string())
            .collect::<Vec<_>>();

        assert_eq!(seconds, vec!["10", "20", "30", "40"]);
    }

    #[test]
    fn last_known_values() {
        let dir = tempfile::tempdir().unwrap();

        let settings = Settings {
            prefix: dir.path().to_path_buf(),
            session_minutes: 60,
            interval_s: 1,
            ..Default::default()
        };

        let t0 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 10, 0, 0);

        let content = format!(
            "{}{}{}\r\n{}garbage\r\n$WIMDA,1,2,3\r\n$YXXDR,C,,C,WCHR,C,,C,TEMP,C,12.5,C,DEWP,P,abc,B,STNP\r\n{}",
            zda(t0),
            zda(t0 + Duration::from_seconds(1.0)),
            XDR,
            zda(t0 + Duration::from_seconds(2.0)),
            zda(t0 + Duration::from_seconds(3.0)),
        );

        let mut device = Device::from_reader(Cursor::new(content.into_bytes()));

        let mut collecter = collecter(&settings, t0);
        collecter.run(&mut device).unwrap();

        let lines = data_lines(&dir.path().join("STNM00UNK_R_20233111200_01H_01S_MM.rnx.gz"));

        assert_eq!(
            lines,
            vec![
                " 2023 11 07 12 10 00 9999.9 9999.9 9999.9 9999.9 9999.9",
                " 2023 11 07 12 10 01 9999.9 9999.9 9999.9 9999.9 9999.9",
                " 2023 11 07 12 10 02 1013.7 9999.9 9999.9 9999.9 9999.9",
                " 2023 11 07 12 10 03 1013.7 9999.9 9999.9 9999.9 9999.9",
            ]
        );

        assert_eq!(collecter.runtime.rejections, 2);
    }

    #[test]
    fn restart_fallback() {
        let dir = tempfile::tempdir().unwrap();

        let settings = Settings {
            prefix: dir.path().to_path_buf(),
            session_minutes: 60,
            interval_s: 60,
            ..Default::default()
        };

        // interrupted session
        let previous = dir.path().join("STNM00UNK_R_20233111200_01H_01M_MM.rnx");
        std::fs::write(&previous, "interrupted session\n").unwrap();

        let t0 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 35, 19, 0);
        let t1 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 36, 1, 0);

        let mut device = Device::from_reader(Cursor::new(stream(t0, t1).into_bytes()));

        let mut collecter = collecter(&settings, t0);
        collecter.run(&mut device).unwrap();

        assert_eq!(
            output_files(dir.path()),
            vec![
                "STNM00UNK_R_20233111200_01H_01M_MM.rnx.gz",
                "STNM00UNK_R_20233111235_01H_01M_MM.rnx.gz",
            ]
        );

        // previous content preserved
        assert_eq!(
            decompress(&dir.path().join("STNM00UNK_R_20233111200_01H_01M_MM.rnx.gz")),
            "interrupted session\n"
        );

        let lines = data_lines(&dir.path().join("STNM00UNK_R_20233111235_01H_01M_MM.rnx.gz"));
        assert_eq!(
            lines,
            vec![" 2023 11 07 12 36 00 1013.7   23.4   55.1  180.0    3.2"]
        );
    }

    #[test]
    fn interrupted_capture() {
        let dir = tempfile::tempdir().unwrap();
        let captures = tempfile::tempdir().unwrap();

        let settings = Settings {
            prefix: dir.path().to_path_buf(),
            session_minutes: 60,
            interval_s: 10,
            ..Default::default()
        };

        let t0 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 5, 0);
        let t1 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 21, 0);
        let t2 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 41, 0);

        // gzip trailer is missing
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(5));
        encoder.write_all(stream(t0, t1).as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let first = captures.path().join("day1.txt.gz");
        std::fs::write(&first, &compressed[..compressed.len() - 4]).unwrap();

        let second = captures.path().join("day2.txt");
        std::fs::write(&second, stream(t1, t2)).unwrap();

        let first = first.to_string_lossy().to_string();
        let second = second.to_string_lossy().to_string();

        let mut device = Device::open_files(&[&first, &second]).unwrap();

        let mut collecter = collecter(&settings, t0);
        collecter.run(&mut device).unwrap();

        assert_eq!(
            output_files(dir.path()),
            vec!["STNM00UNK_R_20233111200_01H_10S_MM.rnx.gz"]
        );

        let lines = data_lines(&dir.path().join("STNM00UNK_R_20233111200_01H_10S_MM.rnx.gz"));

        let seconds = lines
            .iter()
            .map(|line| line[18..20].to_string())
            .collect::<Vec<_>>();

        assert_eq!(seconds, vec!["10", "20", "30", "40"]);
        assert_eq!(collecter.runtime.files, 1);
    }

    #[test]
    fn reconnection() {
        let dir = tempfile::tempdir().unwrap();

        let settings = Settings {
            prefix: dir.path().to_path_buf(),
            session_minutes: 60,
            interval_s: 10,
            ..Default::default()
        };

        let t0 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 5, 0);
        let t1 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 16, 0);
        let t2 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 25, 0);
        let t3 = Epoch::from_gregorian_utc(2023, 11, 7, 12, 0, 31, 0);

        // link drops in the middle of a sentence
        let mut first = stream(t0, t1);
        first.push_str("$WIMDA,29.93");

        // time references only, for a while
        let mut second = String::new();
        let mut t = t1;
        while t < t2 {
            second.push_str(&zda(t));
            t = t + Duration::from_seconds(1.0);
        }
        second.push_str(&stream(t2, t3));

        let mut device = Device::replay(vec![first.into_bytes(), second.into_bytes()]);

        let mut collecter = collecter(&settings, t0);
        collecter.run(&mut device).unwrap();

        // same window
        assert_eq!(
            output_files(dir.path()),
            vec!["STNM00UNK_R_20233111200_01H_10S_MM.rnx.gz"]
        );

        let lines = data_lines(&dir.path().join("STNM00UNK_R_20233111200_01H_10S_MM.rnx.gz"));

        assert_eq!(
            lines,
            vec![
                " 2023 11 07 12 00 10 1013.7   23.4   55.1  180.0    3.2",
                " 2023 11 07 12 00 20 1013.7   23.4   55.1  180.0    3.2",
                " 2023 11 07 12 00 30 1013.7   23.4   55.1  180.0    3.2",
            ]
        );

        assert_eq!(collecter.runtime.files, 1);
        assert_eq!(collecter.runtime.rejections, 0);
    }
}

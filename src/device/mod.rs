use log::{debug, error, info, trace, warn};

mod interface;

use interface::Interface;

use std::{
    fs::File,
    io::{BufRead, BufReader, ErrorKind, Read},
    path::Path,
    time::Duration,
};

#[cfg(test)]
use std::{collections::VecDeque, io::Cursor};

use crate::Error;

/// Serial port read timeout. Timeouts are not considered errors.
const SERIAL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Pause in between two reopening attempts
const REOPEN_PERIOD: Duration = Duration::from_secs(5);

/// Longest line we accept. NMEA sentences are much shorter than that.
const MAX_LINE_LENGTH: usize = 1024;

/// Where the [Device] stream comes from
#[derive(Debug, Clone, PartialEq)]
enum Origin {
    /// Physical serial port, that may be reopened
    SerialPort { port: String, baud: u32 },

    /// Read-only content (captured files)
    ReadOnly,

    /// Link that disconnects after each capture. Reopening delivers the next one.
    #[cfg(test)]
    Replay(VecDeque<Vec<u8>>),
}

/// Interrupts a [Origin::Replay] capture
#[cfg(test)]
struct Disconnected;

#[cfg(test)]
impl Read for Disconnected {
    fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(ErrorKind::BrokenPipe, "disconnected"))
    }
}

/// [Device] delivers the NMEA stream, line by line.
pub struct Device {
    origin: Origin,
    reader: BufReader<Interface>,
    /// Incomplete line, kept across read timeouts
    pending: Vec<u8>,
    /// Set while discarding an overlong line
    overflow: bool,
}

impl Device {
    fn new(origin: Origin, interface: Interface) -> Self {
        Self {
            origin,
            reader: BufReader::new(interface),
            pending: Vec::with_capacity(128),
            overflow: false,
        }
    }

    fn serial_interface(port_str: &str, baud: u32) -> Result<Interface, Error> {
        let port = serialport::new(port_str, baud)
            .timeout(SERIAL_TIMEOUT)
            .open()?;

        Ok(Interface::from_serial_port(port))
    }

    /// Opens physical port
    pub fn open_serial_port(port_str: &str, baud: u32) -> Result<Self, Error> {
        let interface = Self::serial_interface(port_str, baud)?;
        info!("opened {} ({} bauds)", port_str, baud);

        Ok(Self::new(
            Origin::SerialPort {
                port: port_str.to_string(),
                baud,
            },
            interface,
        ))
    }

    /// Opens captured files, consumed one after the other.
    /// Gzip compressed files must be terminated by '.gz'.
    pub fn open_files(fullpaths: &[&String]) -> Result<Self, Error> {
        let mut interface = Option::<Interface>::None;

        for fullpath in fullpaths.iter() {
            let path = Path::new(fullpath.as_str());
            let handle = File::open(path).map_err(|e| Error::file(path, e))?;
            let gzip = fullpath.ends_with(".gz");

            match &mut interface {
                Some(interface) => {
                    if gzip {
                        interface.stack_gzip_file_handle(handle);
                    } else {
                        interface.stack_file_handle(handle);
                    }
                },
                None => {
                    interface = Some(if gzip {
                        Interface::from_gzip_file_handle(handle)
                    } else {
                        Interface::from_file_handle(handle)
                    });
                },
            }

            debug!("loaded {}", fullpath);
        }

        let interface = interface.ok_or(Error::Configuration(
            "requires either serial port or at least, one input file".to_string(),
        ))?;

        Ok(Self::new(Origin::ReadOnly, interface))
    }

    /// Creates a read-only [Device] from any [Read]able
    #[cfg(test)]
    pub fn from_reader<R: std::io::Read + 'static>(reader: R) -> Self {
        Self::new(Origin::ReadOnly, Interface::from_reader(reader))
    }

    /// Creates a [Device] that disconnects at the end of each capture
    /// but the last one, and delivers the next capture on reopening.
    #[cfg(test)]
    pub fn replay(captures: Vec<Vec<u8>>) -> Self {
        let mut captures = VecDeque::from(captures);
        let interface = Self::replay_interface(&mut captures);
        Self::new(Origin::Replay(captures), interface)
    }

    #[cfg(test)]
    fn replay_interface(captures: &mut VecDeque<Vec<u8>>) -> Interface {
        let capture = Cursor::new(captures.pop_front().unwrap_or_default());
        if captures.is_empty() {
            Interface::from_reader(capture)
        } else {
            Interface::from_reader(capture.chain(Disconnected))
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.reader.get_ref().is_read_only()
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }

    fn discard(&mut self) {
        self.pending.clear();
        self.overflow = false;
    }

    /// Reads next line. Non UTF-8 content is not an error here:
    /// it simply results in a sentence we will not be able to decode.
    /// Lines longer than [MAX_LINE_LENGTH] are discarded.
    /// A corrupt capture is skipped and we move on to the next one.
    /// Returns [Error::EndOfStream] once read-only content was fully consumed.
    pub fn read_line(&mut self) -> Result<String, Error> {
        loop {
            let budget = (MAX_LINE_LENGTH + 1).saturating_sub(self.pending.len()) as u64;

            match (&mut self.reader)
                .take(budget)
                .read_until(b'\n', &mut self.pending)
            {
                Ok(0) => {
                    if self.overflow {
                        self.discard();
                    }

                    if !self.pending.is_empty() {
                        // unterminated last line
                        return Ok(self.take_line());
                    }

                    return match self.origin {
                        Origin::SerialPort { .. } => Err(Error::Transport(
                            std::io::Error::new(ErrorKind::UnexpectedEof, "device disconnected"),
                        )),
                        Origin::ReadOnly => Err(Error::EndOfStream),
                        #[cfg(test)]
                        Origin::Replay(_) => Err(Error::EndOfStream),
                    };
                },
                Ok(_) => {
                    if self.pending.ends_with(b"\n") {
                        if self.overflow {
                            // tail of a discarded line
                            self.discard();
                            continue;
                        }

                        let line = self.take_line();
                        trace!("{}", line.trim_end());
                        return Ok(line);
                    }

                    if self.pending.len() > MAX_LINE_LENGTH {
                        debug!(
                            "discarding {} bytes with no line termination",
                            self.pending.len()
                        );
                        self.pending.clear();
                        self.overflow = true;
                    }
                },
                Err(e) => match e.kind() {
                    ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {},
                    _ => match self.origin {
                        Origin::ReadOnly => {
                            warn!("skipping corrupt input: {}", e);
                            self.discard();
                        },
                        _ => return Err(Error::Transport(e)),
                    },
                },
            }
        }
    }

    /// Reopens the stream, after an I/O error.
    pub fn reopen(&mut self) -> Result<(), Error> {
        let interface = match &mut self.origin {
            Origin::ReadOnly => return Err(Error::NotReopenable),
            Origin::SerialPort { port, baud } => {
                let interface = Self::serial_interface(port, *baud).inspect_err(|e| {
                    error!("failed to reopen {}: {}", port, e);
                })?;

                info!("reopened {}", port);
                interface
            },
            #[cfg(test)]
            Origin::Replay(captures) => Self::replay_interface(captures),
        };

        self.reader = BufReader::new(interface);
        self.discard();
        Ok(())
    }

    /// Reopens the stream after an I/O error, retrying until it succeeds.
    /// Read-only interfaces are not recoverable.
    pub fn recover(&mut self) -> Result<(), Error> {
        loop {
            match self.reopen() {
                Ok(()) => return Ok(()),
                Err(Error::NotReopenable) => return Err(Error::NotReopenable),
                Err(_) => {
                    warn!("retrying in {:?}", REOPEN_PERIOD);
                    std::thread::sleep(REOPEN_PERIOD);
                },
            }
        }
    }
}

use flate2::read::GzDecoder;
use serialport::SerialPort;

use std::{
    collections::VecDeque,
    fs::File,
    io::{ErrorKind, Read},
};

/// [Interface] to the NMEA stream
pub enum Interface {
    /// [Interface::ReadOnly] is dedicated to read only input, mainly File inputs.
    /// Several handles may be stacked, they are consumed one after the other.
    ReadOnly(VecDeque<Box<dyn Read>>),

    /// [Interface::Port] is used to connect to a physical port.
    Port(Box<dyn SerialPort>),
}

impl Interface {
    /// Creates a new [SerialPort] interface
    pub fn from_serial_port(port: Box<dyn SerialPort>) -> Self {
        Self::Port(port)
    }

    /// Creates a new Read-Only interface
    pub fn from_file_handle(handle: File) -> Self {
        Self::from_reader(handle)
    }

    /// Creates a new Read-Only interface from a gzip compressed file
    pub fn from_gzip_file_handle(handle: File) -> Self {
        Self::from_reader(GzDecoder::new(handle))
    }

    /// Creates a new Read-Only interface from any [Read]able
    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        let mut handles = VecDeque::<Box<dyn Read>>::with_capacity(1);
        handles.push_back(Box::new(reader));
        Self::ReadOnly(handles)
    }

    /// Stacks a new file handle, to be consumed once all previous
    /// handles were consumed.
    pub fn stack_file_handle(&mut self, handle: File) {
        if let Self::ReadOnly(handles) = self {
            handles.push_back(Box::new(handle));
        }
    }

    /// Stacks a new gzip compressed file handle.
    pub fn stack_gzip_file_handle(&mut self, handle: File) {
        if let Self::ReadOnly(handles) = self {
            handles.push_back(Box::new(GzDecoder::new(handle)));
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly(_))
    }
}

impl std::io::Read for Interface {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::ReadOnly(handles) => {
                while let Some(handle) = handles.front_mut() {
                    match handle.read(buf) {
                        Ok(0) => {
                            // consumed: move on to next one
                            handles.pop_front();
                        },
                        Ok(size) => return Ok(size),
                        Err(e) => {
                            if !matches!(
                                e.kind(),
                                ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                            ) {
                                // corrupt handle: following reads move on to next one
                                handles.pop_front();
                            }
                            return Err(e);
                        },
                    }
                }
                Ok(0)
            },
            Self::Port(port) => port.read(buf),
        }
    }
}

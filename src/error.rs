use thiserror::Error;

/// Application level errors
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user setup: the collecter must not be deployed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error on the input stream
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Serial port could not be (re)opened
    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// Read-only interfaces may not be reopened
    #[error("read-only interface may not be reopened")]
    NotReopenable,

    /// Input stream does not deliver any more content
    #[error("end of stream")]
    EndOfStream,

    /// File production error (header, records, archiving)
    #[error("file error ({0}): {1}")]
    File(String, std::io::Error),
}

impl Error {
    /// Wraps an [std::io::Error] that occurred while handling given file
    pub fn file(path: &std::path::Path, e: std::io::Error) -> Self {
        Self::File(path.display().to_string(), e)
    }
}

use std::{
    io::{self, BufRead, BufReader, Write},
    time::Duration,
};

use log::{debug, info};
use serialport::SerialPort;

use super::{DriverError, Gps};
use crate::config::GpsConfig;

pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// NMEA allows 82 characters per sentence, `$` and CRLF included.
pub const MAX_SENTENCE_LEN: usize = 128;

/// GPS receiver on a serial port.
///
/// On Unix the TTY is opened in exclusive mode. The port is closed on drop, so
/// a restarted process can open it again.
pub struct SerialGps {
    port_name: String,
    reader: BufReader<Box<dyn SerialPort>>,
    partial: Vec<u8>,
}

impl SerialGps {
    pub fn open(config: &GpsConfig) -> Result<Self, DriverError> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;

        info!(
            "Started serial connection on port {} with baudrate of {}",
            config.port, config.baud_rate
        );

        Ok(SerialGps {
            port_name: config.port.clone(),
            reader: BufReader::new(port),
            partial: Vec::with_capacity(MAX_SENTENCE_LEN),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Gps for SerialGps {
    fn write_commands(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        let port = self.reader.get_mut();
        port.write_all(bytes)?;
        port.flush()?;

        debug!("Wrote {} command bytes to {}", bytes.len(), self.port_name);
        Ok(())
    }

    fn read_sentence(&mut self) -> Result<Option<String>, DriverError> {
        Ok(read_nmea_line(&mut self.reader, &mut self.partial)?)
    }
}

/// Reads the next complete NMEA sentence from `reader`.
///
/// Bytes before a `$` (UBX acknowledgements, line noise) are discarded, and a
/// sentence longer than [`MAX_SENTENCE_LEN`] is dropped. An unfinished
/// sentence stays in `partial` for the next call. Returns `None` on timeout
/// or end of input.
pub fn read_nmea_line<R: BufRead>(
    reader: &mut R,
    partial: &mut Vec<u8>,
) -> io::Result<Option<String>> {
    loop {
        let available = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(err) if err.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        if available.is_empty() {
            return Ok(None);
        }

        let (chunk, complete) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..=i], true),
            None => (available, false),
        };
        let used = chunk.len();

        for &byte in chunk {
            if byte == b'$' {
                partial.clear();
            } else if partial.is_empty() {
                continue;
            }

            partial.push(byte);

            if partial.len() > MAX_SENTENCE_LEN {
                debug!("Dropping NMEA sentence longer than {MAX_SENTENCE_LEN} bytes");
                partial.clear();
            }
        }

        reader.consume(used);

        if complete && !partial.is_empty() {
            let line = String::from_utf8_lossy(partial).trim_end().to_string();
            partial.clear();
            return Ok(Some(line));
        }
    }
}

//! UBX command frames for u-blox receivers.
//!
//! Frame layout: `[0xB5, 0x62, class, id, len_lo, len_hi, payload.., ck_a, ck_b]`.
//! The checksum is the 8-bit Fletcher pair over class, id, length and payload
//! and is always computed here, never supplied by the caller.

use std::{fmt, str::FromStr};

use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

pub const SYNC_CHAR_1: u8 = 0xB5;
pub const SYNC_CHAR_2: u8 = 0x62;

pub const HEADER_LEN: usize = 6;
pub const CHECKSUM_LEN: usize = 2;

pub const CLASS_CFG: u8 = 0x06;
pub const ID_CFG_MSG: u8 = 0x01;
pub const ID_CFG_RATE: u8 = 0x08;

/// Message class of the standard NMEA sentences.
pub const CLASS_NMEA: u8 = 0xF0;

/// Number of receiver I/O targets covered by a CFG-MSG rate payload
/// (DDC, UART1, UART2, USB, SPI, reserved).
const CFG_MSG_PORTS: usize = 6;

/// CFG-RATE time reference: GPS time.
const TIME_REF_GPS: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UbxError {
    #[error("Unsupported NMEA sentence '{0}'")]
    UnsupportedSentence(String),

    #[error("Unsupported refresh rate '{0}', expected one of 1, 5, 10 Hz")]
    UnsupportedRate(String),

    #[error("Payload of {0} bytes does not fit a UBX frame")]
    PayloadTooLong(usize),

    #[error("Missing UBX sync characters")]
    BadSync,

    #[error("Frame truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Bad checksum: expected {expected:02X?}, got {actual:02X?}")]
    BadChecksum { expected: [u8; 2], actual: [u8; 2] },
}

/// NMEA sentence types that can be switched off on the receiver.
///
/// Declaration order is the order in which disable commands are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum NmeaSentence {
    Gga,
    Gll,
    Gsa,
    Gsv,
    Rmc,
    Vtg,
}

impl NmeaSentence {
    /// Message id within the NMEA class (0xF0).
    pub fn msg_id(&self) -> u8 {
        match self {
            NmeaSentence::Gga => 0x00,
            NmeaSentence::Gll => 0x01,
            NmeaSentence::Gsa => 0x02,
            NmeaSentence::Gsv => 0x03,
            NmeaSentence::Rmc => 0x04,
            NmeaSentence::Vtg => 0x05,
        }
    }
}

impl FromStr for NmeaSentence {
    type Err = UbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NmeaSentence::iter()
            .find(|sentence| sentence.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UbxError::UnsupportedSentence(s.to_string()))
    }
}

/// Navigation solution rate supported by the receiver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter)]
pub enum RefreshRate {
    #[default]
    Hz1,
    Hz5,
    Hz10,
}

impl RefreshRate {
    pub fn hz(&self) -> u16 {
        match self {
            RefreshRate::Hz1 => 1,
            RefreshRate::Hz5 => 5,
            RefreshRate::Hz10 => 10,
        }
    }

    pub fn measurement_period_ms(&self) -> u16 {
        1000 / self.hz()
    }

    pub fn from_hz(hz: u16) -> Result<Self, UbxError> {
        match hz {
            1 => Ok(RefreshRate::Hz1),
            5 => Ok(RefreshRate::Hz5),
            10 => Ok(RefreshRate::Hz10),
            hz => Err(UbxError::UnsupportedRate(hz.to_string())),
        }
    }
}

impl FromStr for RefreshRate {
    type Err = UbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(RefreshRate::Hz1),
            "5" => Ok(RefreshRate::Hz5),
            "10" => Ok(RefreshRate::Hz10),
            _ => Err(UbxError::UnsupportedRate(s.to_string())),
        }
    }
}

impl fmt::Display for RefreshRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// A complete, checksummed UBX frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UbxFrame {
    bytes: Vec<u8>,
}

impl UbxFrame {
    /// Frame for a payload of arbitrary size.
    pub fn try_new(class: u8, id: u8, payload: &[u8]) -> Result<Self, UbxError> {
        let len =
            u16::try_from(payload.len()).map_err(|_| UbxError::PayloadTooLong(payload.len()))?;

        Ok(Self::assemble(class, id, len, payload))
    }

    /// Frame for the fixed-size payloads built in this module.
    pub(crate) fn new(class: u8, id: u8, payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= u16::MAX as usize);

        Self::assemble(class, id, payload.len() as u16, payload)
    }

    fn assemble(class: u8, id: u8, len: u16, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
        bytes.extend_from_slice(&[SYNC_CHAR_1, SYNC_CHAR_2, class, id]);
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(payload);

        let (ck_a, ck_b) = checksum(&bytes[2..]);
        bytes.push(ck_a);
        bytes.push(ck_b);

        UbxFrame { bytes }
    }

    /// Validates sync characters, length and checksum of a single frame.
    pub fn parse(bytes: &[u8]) -> Result<Self, UbxError> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(UbxError::Truncated {
                expected: HEADER_LEN + CHECKSUM_LEN,
                actual: bytes.len(),
            });
        }

        if bytes[0] != SYNC_CHAR_1 || bytes[1] != SYNC_CHAR_2 {
            return Err(UbxError::BadSync);
        }

        let len = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
        let expected = HEADER_LEN + len + CHECKSUM_LEN;
        if bytes.len() != expected {
            return Err(UbxError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }

        let (ck_a, ck_b) = checksum(&bytes[2..HEADER_LEN + len]);
        let actual = [bytes[expected - 2], bytes[expected - 1]];
        if actual != [ck_a, ck_b] {
            return Err(UbxError::BadChecksum {
                expected: [ck_a, ck_b],
                actual,
            });
        }

        Ok(UbxFrame {
            bytes: bytes.to_vec(),
        })
    }

    pub fn class(&self) -> u8 {
        self.bytes[2]
    }

    pub fn id(&self) -> u8 {
        self.bytes[3]
    }

    pub fn payload_len(&self) -> u16 {
        u16::from_le_bytes([self.bytes[4], self.bytes[5]])
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..self.bytes.len() - CHECKSUM_LEN]
    }

    pub fn checksum(&self) -> [u8; 2] {
        let n = self.bytes.len();
        [self.bytes[n - 2], self.bytes[n - 1]]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for UbxFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for UbxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// 8-bit Fletcher checksum used by UBX: `ck_a` sums the bytes, `ck_b` sums
/// the running values of `ck_a`.
pub fn checksum(data: &[u8]) -> (u8, u8) {
    let mut ck_a: u8 = 0;
    let mut ck_b: u8 = 0;

    for &byte in data {
        ck_a = ck_a.wrapping_add(byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }

    (ck_a, ck_b)
}

/// UBX-CFG-MSG with a zero rate on every I/O target for the given sentence.
pub fn disable_sentence(sentence: NmeaSentence) -> UbxFrame {
    let mut payload = [0u8; 2 + CFG_MSG_PORTS];
    payload[0] = CLASS_NMEA;
    payload[1] = sentence.msg_id();

    UbxFrame::new(CLASS_CFG, ID_CFG_MSG, &payload)
}

/// Same as [`disable_sentence`], for a sentence given by name (e.g. `"GSV"`).
pub fn disable_sentence_named(name: &str) -> Result<UbxFrame, UbxError> {
    Ok(disable_sentence(name.parse()?))
}

/// UBX-CFG-RATE: one navigation solution per measurement, GPS time reference.
pub fn set_refresh_rate(rate: RefreshRate) -> UbxFrame {
    let mut payload = Vec::with_capacity(6);
    payload.extend_from_slice(&rate.measurement_period_ms().to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&TIME_REF_GPS.to_le_bytes());

    UbxFrame::new(CLASS_CFG, ID_CFG_RATE, &payload)
}

/// Same as [`set_refresh_rate`], for a rate in Hz.
pub fn set_refresh_rate_hz(hz: u16) -> Result<UbxFrame, UbxError> {
    Ok(set_refresh_rate(RefreshRate::from_hz(hz)?))
}

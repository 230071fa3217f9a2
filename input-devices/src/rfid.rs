//! Serial RFID tag reader
//!
//! The reader sends one frame per tag read at 9600 baud:
//!
//! ```text
//! STX | DATA (10 ASCII hex) | CHECKSUM (2 ASCII hex) | CR | LF | ETX
//! ```
//!
//! The checksum is the XOR of the five bytes encoded by DATA. A valid frame
//! yields the decimal value of DATA, which is how page sets are keyed.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const STX: u8 = 0x02;
const ETX: u8 = 0x03;
const CR: u8 = b'\r';
const LF: u8 = b'\n';

const DATA_LEN: usize = 10;
const CHECKSUM_LEN: usize = 2;
/// Bytes between STX and ETX
const BODY_LEN: usize = DATA_LEN + CHECKSUM_LEN + 2;

/// Errors raised while reading tag frames
#[derive(Error, Debug)]
pub enum RfidError {
    #[error("Checksum mismatch: frame says {expected:02X}, data folds to {actual:02X}")]
    Checksum { expected: u8, actual: u8 },

    #[error("Frame contains non-hex character {0:#04x}")]
    MalformedHex(u8),

    #[error("Frame body has {0} bytes, expected 14")]
    BadLength(usize),

    #[error("Frame missing CR LF terminator")]
    MissingTerminator,

    #[error("Serial read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A tag read off a valid frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTag(u64);

impl PageTag {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Page-set key: the decimal value, zero padded to ten digits
    pub fn payload(&self) -> String {
        format!("{:010}", self.0)
    }

    /// Wire frame the reader sends for this tag; only the low 40 bits fit
    pub fn to_frame(&self) -> Vec<u8> {
        let data = format!("{:010X}", self.0 & 0xFF_FFFF_FFFF);
        let checksum = (0..5)
            .map(|i| (self.0 >> (8 * i)) as u8)
            .fold(0u8, |acc, b| acc ^ b);

        let mut frame = Vec::with_capacity(BODY_LEN + 2);
        frame.push(STX);
        frame.extend_from_slice(data.as_bytes());
        frame.extend_from_slice(format!("{:02X}", checksum).as_bytes());
        frame.extend_from_slice(&[CR, LF, ETX]);
        frame
    }
}

impl std::fmt::Display for PageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

/// Byte-at-a-time frame decoder
///
/// An STX always starts a fresh frame, so the decoder resynchronizes after
/// line noise or a frame cut short. Any invalid frame is discarded along
/// with everything buffered.
#[derive(Debug, Default)]
pub struct RfidFrameDecoder {
    body: Option<Vec<u8>>,
}

impl RfidFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; a finished frame yields its tag or the reason it failed
    pub fn push(&mut self, byte: u8) -> Option<Result<PageTag, RfidError>> {
        if byte == STX {
            if self.body.as_ref().is_some_and(|b| !b.is_empty()) {
                debug!("RFID frame restarted before ETX, dropping partial frame");
            }
            self.body = Some(Vec::with_capacity(BODY_LEN));
            return None;
        }

        let body = self.body.as_mut()?;

        if byte == ETX {
            let frame = std::mem::take(body);
            self.body = None;
            return Some(parse_body(&frame));
        }

        body.push(byte);
        if body.len() > BODY_LEN {
            let len = body.len();
            self.body = None;
            return Some(Err(RfidError::BadLength(len)));
        }
        None
    }

    /// Drop any partial frame
    pub fn flush(&mut self) {
        self.body = None;
    }

    pub fn is_idle(&self) -> bool {
        self.body.is_none()
    }
}

fn parse_body(body: &[u8]) -> Result<PageTag, RfidError> {
    if body.len() != BODY_LEN {
        return Err(RfidError::BadLength(body.len()));
    }
    if body[BODY_LEN - 2..] != [CR, LF] {
        return Err(RfidError::MissingTerminator);
    }

    let mut bytes = [0u8; DATA_LEN / 2 + 1];
    for (i, pair) in body[..DATA_LEN + CHECKSUM_LEN].chunks(2).enumerate() {
        bytes[i] = (hex_digit(pair[0])? << 4) | hex_digit(pair[1])?;
    }

    let (data, checksum) = bytes.split_at(DATA_LEN / 2);
    let actual = data.iter().fold(0u8, |acc, b| acc ^ b);
    if actual != checksum[0] {
        return Err(RfidError::Checksum {
            expected: checksum[0],
            actual,
        });
    }

    let value = data.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
    Ok(PageTag(value))
}

fn hex_digit(c: u8) -> Result<u8, RfidError> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or(RfidError::MalformedHex(c))
}

/// Reader task settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfidConfig {
    /// Repeat reads of the same tag inside this window are dropped
    ///
    /// Default: 3s
    pub hold_off: Duration,
}

impl Default for RfidConfig {
    fn default() -> Self {
        Self {
            hold_off: Duration::from_secs(3),
        }
    }
}

/// Read frames from `reader` until end of input, forwarding each new tag
///
/// Invalid frames are logged and dropped. Returns early without error if
/// the event receiver goes away.
pub async fn run_rfid_reader<R, E>(
    mut reader: R,
    config: RfidConfig,
    events: mpsc::Sender<E>,
) -> Result<(), RfidError>
where
    R: AsyncRead + Unpin,
    E: From<PageTag> + Send + 'static,
{
    let mut decoder = RfidFrameDecoder::new();
    let mut last: Option<(PageTag, Instant)> = None;
    let mut buf = [0u8; 64];

    info!("RFID reader started");

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            info!("RFID reader input closed");
            return Ok(());
        }

        for &byte in &buf[..n] {
            match decoder.push(byte) {
                None => {}
                Some(Err(e)) => {
                    warn!("Dropped RFID frame: {}", e);
                    decoder.flush();
                }
                Some(Ok(tag)) => {
                    let now = tokio::time::Instant::now().into_std();
                    let repeat = matches!(
                        last,
                        Some((prev, at)) if prev == tag && now.saturating_duration_since(at) < config.hold_off
                    );
                    if repeat {
                        debug!("Ignoring repeat read of tag {}", tag);
                        continue;
                    }

                    last = Some((tag, now));
                    info!("Read tag {}", tag);
                    if events.send(E::from(tag)).await.is_err() {
                        debug!("Tag receiver dropped, stopping RFID reader");
                        return Ok(());
                    }
                }
            }
        }
    }
}

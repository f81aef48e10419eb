//! Event payload codecs
//!
//! Payloads use a fixed little-endian layout. Encoding writes into a slice the
//! caller already owns (a claimed ring buffer region), so producers never
//! allocate; decoding borrows strings straight out of the frame.
//!
//! Strings are encoded as a `u32` byte length followed by UTF-8 bytes.

use std::fmt;

use crate::error::CodecError;
use crate::event::{EventCode, PayloadKind};

/// A payload that can be written into, and read back out of, a frame
pub trait EventPayload<'a>: Sized {
    /// Exact number of bytes [`encode`](Self::encode) will write
    fn encoded_length(&self) -> usize;

    /// Encode into `dst`, returning the number of bytes written
    fn encode(&self, dst: &mut [u8]) -> Result<usize, CodecError>;

    /// Decode from a complete payload, rejecting short input and trailing bytes
    fn decode(src: &'a [u8]) -> Result<Self, CodecError>;
}

struct Writer<'b> {
    dst: &'b mut [u8],
    pos: usize,
}

impl<'b> Writer<'b> {
    fn new(dst: &'b mut [u8], needed: usize) -> Result<Self, CodecError> {
        if dst.len() < needed {
            return Err(CodecError::BufferTooSmall {
                needed,
                available: dst.len(),
            });
        }
        Ok(Self { dst, pos: 0 })
    }

    fn put(&mut self, bytes: &[u8]) {
        self.dst[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn i64(&mut self, value: i64) {
        self.put(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    fn u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    fn str(&mut self, value: &str) {
        self.put(&(value.len() as u32).to_le_bytes());
        self.put(value.as_bytes());
    }
}

struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos + len;
        if end > self.src.len() {
            return Err(CodecError::InsufficientData {
                needed: end,
                available: self.src.len(),
            });
        }
        let bytes = &self.src[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(buf))
    }

    fn i32(&mut self) -> Result<i32, CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(buf))
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn str(&mut self, field: &'static str) -> Result<&'a str, CodecError> {
        let mut len = [0u8; 4];
        len.copy_from_slice(self.take(4)?);
        let bytes = self.take(u32::from_le_bytes(len) as usize)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8(field))
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.src.len() - self.pos {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}

/// A control request carrying only session and correlation ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub control_session_id: i64,
    pub correlation_id: i64,
}

impl ControlRequest {
    pub const ENCODED_LENGTH: usize = 16;

    pub fn new(control_session_id: i64, correlation_id: i64) -> Self {
        Self {
            control_session_id,
            correlation_id,
        }
    }
}

impl<'a> EventPayload<'a> for ControlRequest {
    fn encoded_length(&self) -> usize {
        Self::ENCODED_LENGTH
    }

    fn encode(&self, dst: &mut [u8]) -> Result<usize, CodecError> {
        let mut w = Writer::new(dst, Self::ENCODED_LENGTH)?;
        w.i64(self.control_session_id);
        w.i64(self.correlation_id);
        Ok(w.pos)
    }

    fn decode(src: &'a [u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(src);
        let request = Self {
            control_session_id: r.i64()?,
            correlation_id: r.i64()?,
        };
        r.finish()?;
        Ok(request)
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "controlSessionId={} correlationId={}",
            self.control_session_id, self.correlation_id
        )
    }
}

/// A connect (or authenticated connect) request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest<'a> {
    pub correlation_id: i64,
    pub response_stream_id: i32,
    pub version: i32,
    pub response_channel: &'a str,
}

impl<'a> EventPayload<'a> for ConnectRequest<'a> {
    fn encoded_length(&self) -> usize {
        8 + 4 + 4 + 4 + self.response_channel.len()
    }

    fn encode(&self, dst: &mut [u8]) -> Result<usize, CodecError> {
        let mut w = Writer::new(dst, self.encoded_length())?;
        w.i64(self.correlation_id);
        w.i32(self.response_stream_id);
        w.i32(self.version);
        w.str(self.response_channel);
        Ok(w.pos)
    }

    fn decode(src: &'a [u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(src);
        let request = Self {
            correlation_id: r.i64()?,
            response_stream_id: r.i32()?,
            version: r.i32()?,
            response_channel: r.str("response_channel")?,
        };
        r.finish()?;
        Ok(request)
    }
}

impl fmt::Display for ConnectRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "correlationId={} responseStreamId={} version={} responseChannel={}",
            self.correlation_id, self.response_stream_id, self.version, self.response_channel
        )
    }
}

/// Outcome code carried in a control response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Ok,
    Error,
    RecordingUnknown,
    SubscriptionUnknown,
}

impl ResponseCode {
    fn to_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::RecordingUnknown => 2,
            Self::SubscriptionUnknown => 3,
        }
    }

    fn from_i32(value: i32) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Error),
            2 => Ok(Self::RecordingUnknown),
            3 => Ok(Self::SubscriptionUnknown),
            other => Err(CodecError::InvalidValue {
                field: "code",
                value: other as i64,
            }),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::RecordingUnknown => "RECORDING_UNKNOWN",
            Self::SubscriptionUnknown => "SUBSCRIPTION_UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A response sent back on a control session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlResponse<'a> {
    pub control_session_id: i64,
    pub correlation_id: i64,
    pub relevant_id: i64,
    pub code: ResponseCode,
    pub error_message: &'a str,
}

impl<'a> EventPayload<'a> for ControlResponse<'a> {
    fn encoded_length(&self) -> usize {
        8 + 8 + 8 + 4 + 4 + self.error_message.len()
    }

    fn encode(&self, dst: &mut [u8]) -> Result<usize, CodecError> {
        let mut w = Writer::new(dst, self.encoded_length())?;
        w.i64(self.control_session_id);
        w.i64(self.correlation_id);
        w.i64(self.relevant_id);
        w.i32(self.code.to_i32());
        w.str(self.error_message);
        Ok(w.pos)
    }

    fn decode(src: &'a [u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(src);
        let response = Self {
            control_session_id: r.i64()?,
            correlation_id: r.i64()?,
            relevant_id: r.i64()?,
            code: ResponseCode::from_i32(r.i32()?)?,
            error_message: r.str("error_message")?,
        };
        r.finish()?;
        Ok(response)
    }
}

impl fmt::Display for ControlResponse<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "controlSessionId={} correlationId={} relevantId={} code={}",
            self.control_session_id, self.correlation_id, self.relevant_id, self.code
        )?;
        if !self.error_message.is_empty() {
            write!(f, " errorMessage={}", self.error_message)?;
        }
        Ok(())
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Init,
    Connected,
    Authenticated,
    Active,
    Inactive,
    Rejected,
    Done,
}

impl SessionState {
    fn to_u8(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::Connected => 1,
            Self::Authenticated => 2,
            Self::Active => 3,
            Self::Inactive => 4,
            Self::Rejected => 5,
            Self::Done => 6,
        }
    }

    fn from_u8(value: u8) -> Result<Self, CodecError> {
        Ok(match value {
            0 => Self::Init,
            1 => Self::Connected,
            2 => Self::Authenticated,
            3 => Self::Active,
            4 => Self::Inactive,
            5 => Self::Rejected,
            6 => Self::Done,
            other => {
                return Err(CodecError::InvalidValue {
                    field: "session_state",
                    value: other as i64,
                });
            }
        })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Connected => "CONNECTED",
            Self::Authenticated => "AUTHENTICATED",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Rejected => "REJECTED",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// A session moving from one state to another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStateChange {
    pub session_id: i64,
    pub from: SessionState,
    pub to: SessionState,
}

impl SessionStateChange {
    pub const ENCODED_LENGTH: usize = 10;

    pub fn new(session_id: i64, from: SessionState, to: SessionState) -> Self {
        Self {
            session_id,
            from,
            to,
        }
    }
}

impl<'a> EventPayload<'a> for SessionStateChange {
    fn encoded_length(&self) -> usize {
        Self::ENCODED_LENGTH
    }

    fn encode(&self, dst: &mut [u8]) -> Result<usize, CodecError> {
        let mut w = Writer::new(dst, Self::ENCODED_LENGTH)?;
        w.i64(self.session_id);
        w.u8(self.from.to_u8());
        w.u8(self.to.to_u8());
        Ok(w.pos)
    }

    fn decode(src: &'a [u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(src);
        let change = Self {
            session_id: r.i64()?,
            from: SessionState::from_u8(r.u8()?)?,
            to: SessionState::from_u8(r.u8()?)?,
        };
        r.finish()?;
        Ok(change)
    }
}

impl fmt::Display for SessionStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sessionId={} {} -> {}", self.session_id, self.from, self.to)
    }
}

/// Render a payload as a single human-readable line, prefixed by the code name
pub fn dissect(code: &EventCode, payload: &[u8]) -> Result<String, CodecError> {
    let body = match code.payload {
        PayloadKind::ControlRequest => ControlRequest::decode(payload)?.to_string(),
        PayloadKind::ConnectRequest => ConnectRequest::decode(payload)?.to_string(),
        PayloadKind::ControlResponse => ControlResponse::decode(payload)?.to_string(),
        PayloadKind::SessionStateChange => SessionStateChange::decode(payload)?.to_string(),
        PayloadKind::Raw => {
            let hex: String = payload.iter().map(|b| format!("{:02x}", b)).collect();
            format!("length={} bytes={}", payload.len(), hex)
        }
    };
    Ok(format!("{}: {}", code.name, body))
}

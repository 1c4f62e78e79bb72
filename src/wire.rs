//! Wire-format definitions for datagram payloads.
//!
//! Every datagram exchanged between the two endpoints is one of:
//! - a **data segment**: `"<seq>:<payload bytes>"` — the sequence number in
//!   decimal ASCII, a single `:` delimiter, then the opaque payload;
//! - an **acknowledgment**: the decimal ASCII cumulative ACK value, with no
//!   other framing. `-1` means "nothing delivered in order yet" and maps to
//!   `None` in memory.
//!
//! There is deliberately no length prefix, checksum, or magic number: the
//! channel layer simulates corruption by discarding whole datagrams, so a
//! datagram that reaches the parser is assumed structurally intact. Input
//! that still fails to parse is reported as [`WireError`] and the receiving
//! side drops it without acknowledging (see [`crate::transfer`]).
//!
//! No I/O happens here — this is pure data transformation.

/// A data segment: sequence number plus opaque payload bytes.
///
/// Segment identity is its sequence number; numbers are assigned densely
/// starting at 0 for a transfer of N segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub seq: u64,
    pub payload: Vec<u8>,
}

impl Segment {
    /// Serialise this segment into a newly allocated datagram payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = self.seq.to_string().into_bytes();
        buf.push(b':');
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Segment`] from a raw datagram payload.
    ///
    /// Returns [`Err`] if there is no `:` delimiter or the bytes before it
    /// are not a decimal non-negative integer. The payload after the first
    /// delimiter is taken verbatim (it may itself contain `:`).
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let colon = buf
            .iter()
            .position(|&b| b == b':')
            .ok_or(WireError::MissingDelimiter)?;
        let seq = std::str::from_utf8(&buf[..colon])
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or(WireError::BadSequenceNumber)?;
        Ok(Segment {
            seq,
            payload: buf[colon + 1..].to_vec(),
        })
    }
}

/// Serialise a cumulative ACK (`None` = nothing delivered yet) for the wire.
pub fn encode_ack(ack: Option<u64>) -> Vec<u8> {
    match ack {
        Some(n) => n.to_string().into_bytes(),
        None => b"-1".to_vec(),
    }
}

/// Parse a cumulative ACK datagram.
///
/// Accepts a decimal non-negative integer or the literal `-1` ("nothing
/// delivered yet"). Anything else is malformed.
pub fn decode_ack(buf: &[u8]) -> Result<Option<u64>, WireError> {
    let s = std::str::from_utf8(buf).map_err(|_| WireError::BadAck)?;
    if s == "-1" {
        return Ok(None);
    }
    s.parse::<u64>().map(Some).map_err(|_| WireError::BadAck)
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, PartialEq, Eq)]
pub enum WireError {
    /// A data segment had no `:` between sequence number and payload.
    MissingDelimiter,
    /// The bytes before the delimiter are not a decimal sequence number.
    BadSequenceNumber,
    /// An ACK datagram is not a valid cumulative ACK integer.
    BadAck,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::MissingDelimiter => write!(f, "segment has no ':' delimiter"),
            WireError::BadSequenceNumber => write!(f, "sequence number is not a decimal integer"),
            WireError::BadAck => write!(f, "ACK payload is not a valid integer"),
        }
    }
}

impl std::error::Error for WireError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_roundtrip() {
        let seg = Segment {
            seq: 7,
            payload: b"Hello Receiver!".to_vec(),
        };
        let decoded = Segment::decode(&seg.encode()).unwrap();
        assert_eq!(decoded, seg);
    }

    #[test]
    fn segment_encodes_seq_in_ascii() {
        let seg = Segment {
            seq: 12,
            payload: b"x".to_vec(),
        };
        assert_eq!(seg.encode(), b"12:x");
    }

    #[test]
    fn payload_may_contain_delimiter() {
        let decoded = Segment::decode(b"3:a:b:c").unwrap();
        assert_eq!(decoded.seq, 3);
        assert_eq!(decoded.payload, b"a:b:c");
    }

    #[test]
    fn empty_payload_is_valid() {
        let decoded = Segment::decode(b"0:").unwrap();
        assert_eq!(decoded.seq, 0);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn missing_delimiter_rejected() {
        assert_eq!(Segment::decode(b"42"), Err(WireError::MissingDelimiter));
        assert_eq!(Segment::decode(b""), Err(WireError::MissingDelimiter));
    }

    #[test]
    fn non_numeric_seq_rejected() {
        assert_eq!(
            Segment::decode(b"abc:payload"),
            Err(WireError::BadSequenceNumber)
        );
        assert_eq!(Segment::decode(b":payload"), Err(WireError::BadSequenceNumber));
        assert_eq!(
            Segment::decode(b"-4:payload"),
            Err(WireError::BadSequenceNumber)
        );
    }

    #[test]
    fn ack_roundtrip() {
        assert_eq!(decode_ack(&encode_ack(Some(19))).unwrap(), Some(19));
        assert_eq!(decode_ack(&encode_ack(None)).unwrap(), None);
    }

    #[test]
    fn none_ack_encodes_as_minus_one() {
        assert_eq!(encode_ack(None), b"-1");
    }

    #[test]
    fn malformed_ack_rejected() {
        assert_eq!(decode_ack(b"not a number"), Err(WireError::BadAck));
        assert_eq!(decode_ack(b""), Err(WireError::BadAck));
        assert_eq!(decode_ack(b"-2"), Err(WireError::BadAck));
        assert_eq!(decode_ack(b"3:payload"), Err(WireError::BadAck));
    }
}

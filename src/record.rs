//! Wire schema for the ITCH 5.0 Market Participant Position message.
//!
//! The record is a fixed 26-byte block. All integers are big-endian and the
//! timestamp only has 48 bits of room, so anything past ~78 hours wraps.
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::registry::PositionRegistry;

/// Message type tag carried in byte 0.
pub const MESSAGE_PARTICIPANT_POSITION: u8 = b'L';
/// Total wire length of one record, tag included.
pub const PARTICIPANT_POSITION_SIZE: usize = 26;

const TIMESTAMP_MASK: u64 = (1 << 48) - 1;

const LOCATE: std::ops::Range<usize> = 1..3;
const TRACKING: std::ops::Range<usize> = 3..5;
const TIMESTAMP: std::ops::Range<usize> = 5..11;
const MPID: std::ops::Range<usize> = 11..15;
const STOCK: std::ops::Range<usize> = 15..23;
const PRIMARY: usize = 23;
const MODE: usize = 24;
const STATE: usize = 25;

/// Classification of an open tag byte against its set of known values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag<T> {
    Known(T),
    Unrecognized(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownMmMode {
    Normal,
    Passive,
    Syndicate,
    PreSyndicate,
    Penalty,
}

impl KnownMmMode {
    pub const fn name(self) -> &'static str {
        match self {
            KnownMmMode::Normal => "Normal",
            KnownMmMode::Passive => "Passive",
            KnownMmMode::Syndicate => "Syndicate",
            KnownMmMode::PreSyndicate => "Pre-Syndicate",
            KnownMmMode::Penalty => "Penalty",
        }
    }
}

/// Market maker mode as it appears on the wire.
///
/// Holds the raw byte so tags added by later protocol revisions survive a
/// decode/encode cycle untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MmMode(pub u8);

impl MmMode {
    pub const NORMAL: MmMode = MmMode(b'N');
    pub const PASSIVE: MmMode = MmMode(b'P');
    pub const SYNDICATE: MmMode = MmMode(b'S');
    pub const PRE_SYNDICATE: MmMode = MmMode(b'R');
    pub const PENALTY: MmMode = MmMode(b'L');

    pub const fn classify(self) -> Tag<KnownMmMode> {
        match self.0 {
            b'N' => Tag::Known(KnownMmMode::Normal),
            b'P' => Tag::Known(KnownMmMode::Passive),
            b'S' => Tag::Known(KnownMmMode::Syndicate),
            b'R' => Tag::Known(KnownMmMode::PreSyndicate),
            b'L' => Tag::Known(KnownMmMode::Penalty),
            other => Tag::Unrecognized(other),
        }
    }
}

impl From<KnownMmMode> for MmMode {
    fn from(mode: KnownMmMode) -> Self {
        match mode {
            KnownMmMode::Normal => MmMode::NORMAL,
            KnownMmMode::Passive => MmMode::PASSIVE,
            KnownMmMode::Syndicate => MmMode::SYNDICATE,
            KnownMmMode::PreSyndicate => MmMode::PRE_SYNDICATE,
            KnownMmMode::Penalty => MmMode::PENALTY,
        }
    }
}

impl fmt::Display for MmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            Tag::Known(mode) => f.write_str(mode.name()),
            Tag::Unrecognized(_) => f.write_str("Unknown MMMode"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownMmState {
    Active,
    Excused,
    Withdrawn,
    Suspended,
    Deleted,
}

impl KnownMmState {
    pub const fn name(self) -> &'static str {
        match self {
            KnownMmState::Active => "Active",
            KnownMmState::Excused => "Excused/Withdrawn",
            KnownMmState::Withdrawn => "Withdrawn",
            KnownMmState::Suspended => "Suspended",
            KnownMmState::Deleted => "Deleted",
        }
    }
}

/// Market maker registration state as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MmState(pub u8);

impl MmState {
    pub const ACTIVE: MmState = MmState(b'A');
    pub const EXCUSED: MmState = MmState(b'E');
    pub const WITHDRAWN: MmState = MmState(b'W');
    pub const SUSPENDED: MmState = MmState(b'S');
    pub const DELETED: MmState = MmState(b'D');

    pub const fn classify(self) -> Tag<KnownMmState> {
        match self.0 {
            b'A' => Tag::Known(KnownMmState::Active),
            b'E' => Tag::Known(KnownMmState::Excused),
            b'W' => Tag::Known(KnownMmState::Withdrawn),
            b'S' => Tag::Known(KnownMmState::Suspended),
            b'D' => Tag::Known(KnownMmState::Deleted),
            other => Tag::Unrecognized(other),
        }
    }
}

impl From<KnownMmState> for MmState {
    fn from(state: KnownMmState) -> Self {
        match state {
            KnownMmState::Active => MmState::ACTIVE,
            KnownMmState::Excused => MmState::EXCUSED,
            KnownMmState::Withdrawn => MmState::WITHDRAWN,
            KnownMmState::Suspended => MmState::SUSPENDED,
            KnownMmState::Deleted => MmState::DELETED,
        }
    }
}

impl fmt::Display for MmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            Tag::Known(state) => f.write_str(state.name()),
            Tag::Unrecognized(_) => f.write_str("Unknown MMState"),
        }
    }
}

/// A market maker's position in one security.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantPosition {
    /// Time since midnight. Only the low 48 bits of nanoseconds go on the wire.
    pub timestamp: Duration,
    /// Market participant id, at most 4 characters.
    pub mpid: String,
    /// Ticker, at most 8 characters.
    pub stock: String,
    pub stock_locate: u16,
    pub tracking_number: u16,
    /// Whether this participant is the primary market maker for the stock.
    pub primary_mm: bool,
    pub mode: MmMode,
    pub state: MmState,
}

impl ParticipantPosition {
    pub const fn message_type(&self) -> u8 {
        MESSAGE_PARTICIPANT_POSITION
    }

    /// Serialize into the canonical 26-byte wire form.
    ///
    /// Timestamps wider than 48 bits lose their high bits; text fields longer
    /// than their slot are cut.
    pub fn encode(&self) -> [u8; PARTICIPANT_POSITION_SIZE] {
        let mut buf = [0u8; PARTICIPANT_POSITION_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Same as [`encode`](Self::encode) but writes into a caller-owned buffer.
    pub fn encode_into(&self, buf: &mut [u8; PARTICIPANT_POSITION_SIZE]) {
        buf[0] = MESSAGE_PARTICIPANT_POSITION;
        buf[LOCATE].copy_from_slice(&self.stock_locate.to_be_bytes());
        buf[TRACKING].copy_from_slice(&self.tracking_number.to_be_bytes());
        let ns = (self.timestamp.as_nanos() as u64) & TIMESTAMP_MASK;
        buf[TIMESTAMP].copy_from_slice(&ns.to_be_bytes()[2..]);
        put_padded(&mut buf[MPID], &self.mpid);
        put_padded(&mut buf[STOCK], &self.stock);
        buf[PRIMARY] = if self.primary_mm { b'Y' } else { b'N' };
        buf[MODE] = self.mode.0;
        buf[STATE] = self.state.0;
    }

    /// Parse a 26-byte record and append it to `registry` under its MPID.
    ///
    /// Only the length is validated. The tag in byte 0 is assumed to have been
    /// checked by whoever dispatched the buffer here; mode and state bytes are
    /// kept as-is and any primary flag other than `'Y'` reads as `false`.
    pub fn decode<G>(data: &[u8], registry: &G) -> Result<Self>
    where
        G: PositionRegistry + ?Sized,
    {
        let position = Self::parse(data)?;
        registry.record(&position.mpid, position.clone());
        Ok(position)
    }

    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != PARTICIPANT_POSITION_SIZE {
            return Err(Error::InvalidPacketSize {
                expected: PARTICIPANT_POSITION_SIZE,
                actual: data.len(),
            });
        }
        let mut ts = [0u8; 8];
        ts[2..].copy_from_slice(&data[TIMESTAMP]);
        Ok(Self {
            timestamp: Duration::from_nanos(u64::from_be_bytes(ts)),
            mpid: trimmed(&data[MPID]),
            stock: trimmed(&data[STOCK]),
            stock_locate: u16::from_be_bytes([data[LOCATE.start], data[LOCATE.start + 1]]),
            tracking_number: u16::from_be_bytes([data[TRACKING.start], data[TRACKING.start + 1]]),
            primary_mm: data[PRIMARY] == b'Y',
            mode: MmMode(data[MODE]),
            state: MmState(data[STATE]),
        })
    }
}

impl fmt::Display for ParticipantPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Market Participant Position]")?;
        writeln!(f, "Stock Locate: {}", self.stock_locate)?;
        writeln!(f, "Tracking Number: {}", self.tracking_number)?;
        writeln!(f, "Timestamp: {}", Elapsed(self.timestamp))?;
        writeln!(f, "MPID: {}", self.mpid)?;
        writeln!(f, "Stock: {}", self.stock)?;
        writeln!(f, "Primary: {}", self.primary_mm)?;
        writeln!(f, "Mode: {}", self.mode)?;
        writeln!(f, "State: {}", self.state)
    }
}

/// Duration rendered as `9h30m0s`, `1.5s`, `123.456789ms`, `0s`.
struct Elapsed(Duration);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.0.as_nanos();
        match ns {
            0 => f.write_str("0s"),
            1..1_000 => write!(f, "{ns}ns"),
            1_000..1_000_000 => write!(f, "{}µs", Fraction(ns, 3)),
            1_000_000..1_000_000_000 => write!(f, "{}ms", Fraction(ns, 6)),
            _ => {
                let hours = ns / 3_600_000_000_000;
                let minutes = ns / 60_000_000_000 % 60;
                let secs = Fraction(ns % 60_000_000_000, 9);
                if hours > 0 {
                    write!(f, "{hours}h{minutes}m{secs}s")
                } else if minutes > 0 {
                    write!(f, "{minutes}m{secs}s")
                } else {
                    write!(f, "{secs}s")
                }
            }
        }
    }
}

/// `value / 10^scale` as a decimal with trailing zeros dropped.
struct Fraction(u128, u32);

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Fraction(value, scale) = *self;
        let unit = 10u128.pow(scale);
        let (whole, frac) = (value / unit, value % unit);
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:0width$}", width = scale as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

/// Left-justify `s` in `dst`, one byte per character, padding with spaces.
///
/// Text is Latin-1 so every wire byte maps to exactly one char and back.
/// Characters past U+00FF have no byte and are written as `?`; anything
/// longer than the slot is cut.
fn put_padded(dst: &mut [u8], s: &str) {
    dst.fill(b' ');
    for (slot, c) in dst.iter_mut().zip(s.chars()) {
        *slot = u8::try_from(c).unwrap_or(b'?');
    }
}

/// Latin-1 decode with only ASCII whitespace trimmed, so distinct wire ids
/// stay distinct.
fn trimmed(field: &[u8]) -> String {
    let text: String = field.iter().map(|&b| char::from(b)).collect();
    text.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParticipantRegistry;

    fn sample() -> ParticipantPosition {
        ParticipantPosition {
            timestamp: Duration::from_nanos(123_456_789),
            mpid: "ABC".into(),
            stock: "ZVZZT".into(),
            stock_locate: 7,
            tracking_number: 3,
            primary_mm: true,
            mode: MmMode::NORMAL,
            state: MmState::ACTIVE,
        }
    }

    #[test]
    fn encode_layout_matches_wire_table() {
        let buf = sample().encode();
        assert_eq!(buf.len(), PARTICIPANT_POSITION_SIZE);
        assert_eq!(buf[0], b'L');
        assert_eq!(&buf[1..3], &[0x00, 0x07]);
        assert_eq!(&buf[3..5], &[0x00, 0x03]);
        let ts = 123_456_789u64.to_be_bytes();
        assert_eq!(&buf[5..11], &ts[2..]);
        assert_eq!(&buf[11..15], b"ABC ");
        assert_eq!(&buf[15..23], b"ZVZZT   ");
        assert_eq!(buf[23], b'Y');
        assert_eq!(buf[24], b'N');
        assert_eq!(buf[25], b'A');
    }

    #[test]
    fn decode_reproduces_encoded_record() {
        let reg = ParticipantRegistry::new();
        let p = sample();
        let back = ParticipantPosition::decode(&p.encode(), &reg).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn roundtrip_at_timestamp_edges() {
        let reg = ParticipantRegistry::new();
        for ns in [0u64, 1, (1 << 32) + 5, TIMESTAMP_MASK] {
            let p = ParticipantPosition { timestamp: Duration::from_nanos(ns), ..sample() };
            let back = ParticipantPosition::decode(&p.encode(), &reg).unwrap();
            assert_eq!(back.timestamp, p.timestamp);
        }
    }

    #[test]
    fn oversized_timestamp_wraps_to_48_bits() {
        // Intended: the wire only has 48 bits and encode never fails.
        let reg = ParticipantRegistry::new();
        let ns = (1u64 << 48) + 42;
        let p = ParticipantPosition { timestamp: Duration::from_nanos(ns), ..sample() };
        let buf = p.encode();
        assert_eq!(&buf[3..5], &[0x00, 0x03], "tracking number must survive the timestamp write");
        let back = ParticipantPosition::decode(&buf, &reg).unwrap();
        assert_eq!(back.timestamp, Duration::from_nanos(42));

        let ns = u64::MAX;
        let p = ParticipantPosition { timestamp: Duration::from_nanos(ns), ..sample() };
        let back = ParticipantPosition::decode(&p.encode(), &reg).unwrap();
        assert_eq!(back.timestamp.as_nanos() as u64, ns % (1 << 48));
    }

    #[test]
    fn wrong_sizes_are_rejected() {
        let reg = ParticipantRegistry::new();
        for len in [0usize, 25, 27, 1000] {
            let buf = vec![b' '; len];
            match ParticipantPosition::decode(&buf, &reg) {
                Err(Error::InvalidPacketSize { expected, actual }) => {
                    assert_eq!(expected, 26);
                    assert_eq!(actual, len);
                }
                other => panic!("len {len}: unexpected {other:?}"),
            }
        }
        assert!(reg.is_empty(), "failed decodes must not register anything");
        assert!(ParticipantPosition::decode(&[b' '; 26], &reg).is_ok());
    }

    #[test]
    fn decode_leaves_input_untouched() {
        let reg = ParticipantRegistry::new();
        let buf = sample().encode();
        let copy = buf;
        ParticipantPosition::decode(&buf, &reg).unwrap();
        assert_eq!(buf, copy);
    }

    #[test]
    fn unknown_mode_is_preserved() {
        let reg = ParticipantRegistry::new();
        let mut buf = sample().encode();
        buf[24] = b'Z';
        let p = ParticipantPosition::decode(&buf, &reg).unwrap();
        assert_eq!(p.mode, MmMode(b'Z'));
        assert_eq!(p.mode.classify(), Tag::Unrecognized(b'Z'));
        assert_eq!(p.mode.to_string(), "Unknown MMMode");
        assert_eq!(p.encode()[24], b'Z');
    }

    #[test]
    fn unknown_state_is_preserved() {
        let reg = ParticipantRegistry::new();
        let mut buf = sample().encode();
        buf[25] = b'?';
        let p = ParticipantPosition::decode(&buf, &reg).unwrap();
        assert_eq!(p.state.classify(), Tag::Unrecognized(b'?'));
        assert_eq!(p.state.to_string(), "Unknown MMState");
    }

    #[test]
    fn primary_flag_is_lenient() {
        // Intended: anything but 'Y' means not primary, no validation.
        let reg = ParticipantRegistry::new();
        let mut buf = sample().encode();
        for b in [b'N', b'y', b'X', 0u8] {
            buf[23] = b;
            assert!(!ParticipantPosition::decode(&buf, &reg).unwrap().primary_mm);
        }
        buf[23] = b'Y';
        assert!(ParticipantPosition::decode(&buf, &reg).unwrap().primary_mm);
    }

    #[test]
    fn message_type_byte_is_not_checked() {
        let reg = ParticipantRegistry::new();
        let mut buf = sample().encode();
        buf[0] = b'A';
        assert_eq!(ParticipantPosition::decode(&buf, &reg).unwrap(), sample());
    }

    #[test]
    fn text_fields_pad_and_cut() {
        let p = ParticipantPosition { mpid: "LONGID".into(), stock: "".into(), ..sample() };
        let buf = p.encode();
        assert_eq!(&buf[11..15], b"LONG");
        assert_eq!(&buf[15..23], b"        ");

        let reg = ParticipantRegistry::new();
        let mut buf = sample().encode();
        buf[11..15].copy_from_slice(b" AB ");
        let back = ParticipantPosition::decode(&buf, &reg).unwrap();
        assert_eq!(back.mpid, "AB");
    }

    #[test]
    fn high_bytes_in_mpid_keep_participants_apart() {
        let reg = ParticipantRegistry::new();
        let mut a = sample().encode();
        a[11..15].copy_from_slice(&[0xFF, b'A', b' ', b' ']);
        let mut b = a;
        b[11] = 0xFE;

        let pa = ParticipantPosition::decode(&a, &reg).unwrap();
        let pb = ParticipantPosition::decode(&b, &reg).unwrap();
        assert_ne!(pa.mpid, pb.mpid);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.history(&pa.mpid).len(), 1);
        assert_eq!(pa.encode(), a);
        assert_eq!(pb.encode(), b);
    }

    #[test]
    fn only_ascii_whitespace_is_trimmed() {
        let reg = ParticipantRegistry::new();
        let mut buf = sample().encode();
        buf[11..15].copy_from_slice(&[b'A', 0xA0, b'\t', b' ']);
        let p = ParticipantPosition::decode(&buf, &reg).unwrap();
        assert_eq!(p.mpid, "A\u{a0}");
        assert_eq!(&p.encode()[11..15], &[b'A', 0xA0, b' ', b' ']);
    }

    #[test]
    fn text_is_one_byte_per_char() {
        // Intended: chars past U+00FF have no wire byte and become '?'.
        let p = ParticipantPosition { mpid: "é€AB".into(), stock: "ÅÄÖÜÉÈÊËX".into(), ..sample() };
        let buf = p.encode();
        assert_eq!(&buf[11..15], &[0xE9, b'?', b'A', b'B']);
        assert_eq!(&buf[15..23], &[0xC5, 0xC4, 0xD6, 0xDC, 0xC9, 0xC8, 0xCA, 0xCB]);
    }

    #[test]
    fn timestamp_renders_as_clock_duration() {
        let show = |ns: u64| Elapsed(Duration::from_nanos(ns)).to_string();
        assert_eq!(show(0), "0s");
        assert_eq!(show(999), "999ns");
        assert_eq!(show(1_500), "1.5µs");
        assert_eq!(show(123_456_789), "123.456789ms");
        assert_eq!(show(1_000_000_000), "1s");
        assert_eq!(show(61_500_000_000), "1m1.5s");
        assert_eq!(show(34_200_000_000_000), "9h30m0s");
        assert_eq!(show(34_200_000_000_007), "9h30m0.000000007s");
    }

    #[test]
    fn tags_classify_and_convert() {
        assert_eq!(MmMode::PENALTY.classify(), Tag::Known(KnownMmMode::Penalty));
        assert_eq!(MmMode::from(KnownMmMode::PreSyndicate), MmMode(b'R'));
        assert_eq!(MmState::from(KnownMmState::Excused), MmState(b'E'));
        assert_eq!(MmMode::PRE_SYNDICATE.to_string(), "Pre-Syndicate");
        assert_eq!(MmState::EXCUSED.to_string(), "Excused/Withdrawn");
        // 'S' means different things in the two tag sets.
        assert_eq!(MmMode(b'S').to_string(), "Syndicate");
        assert_eq!(MmState(b'S').to_string(), "Suspended");
    }

    #[test]
    fn display_lists_every_field() {
        let text = sample().to_string();
        let expected = "[Market Participant Position]\n\
            Stock Locate: 7\n\
            Tracking Number: 3\n\
            Timestamp: 123.456789ms\n\
            MPID: ABC\n\
            Stock: ZVZZT\n\
            Primary: true\n\
            Mode: Normal\n\
            State: Active\n";
        assert_eq!(text, expected);
        assert_eq!(sample().message_type(), b'L');
    }
}

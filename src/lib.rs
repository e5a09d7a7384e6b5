//! ITCH 5.0 Market Participant Position codec.
//!
//! This crate provides the types and logic used by the `mpp_feed` encoder
//! binary and the `player` tool:
//!
//! - `record`: the 26-byte wire schema, the open market-maker mode/state tags
//!   and the encode/decode pair
//! - `registry`: per-MPID history that every successful decode reports into,
//!   with an unbounded and a bounded-retention implementation
//! - `stream`: helpers to read and write runs of back-to-back records
//!
//! Decoding validates only the record length; see [`Error`].
pub mod error;
pub mod record;
pub mod registry;
pub mod stream;

pub use error::{Error, Result};
pub use record::{
    KnownMmMode, KnownMmState, MESSAGE_PARTICIPANT_POSITION, MmMode, MmState,
    PARTICIPANT_POSITION_SIZE, ParticipantPosition, Tag,
};
pub use registry::{BoundedRegistry, ParticipantRegistry, PositionRegistry};
pub use stream::{PositionReader, PositionWriter};

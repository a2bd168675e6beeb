//! Packet and acknowledgement commitments.
//!
//! Both chains of a channel must derive byte-identical digests, so these
//! functions are part of the wire contract: SHA-256 over the raw bytes.

use crate::{types::Acknowledgement, Config};
use sp_core::H256;
use sp_io::hashing::sha2_256;

/// Commitment stored for a payload-less acknowledgement.
///
/// Not a SHA-256 output of any known preimage, so it cannot collide with the
/// commitment of an acknowledgement carrying bytes (including zero bytes).
pub const EMPTY_ACK_COMMITMENT: H256 = H256([0x01; 32]);

/// Digest of packet data.
pub fn commit_packet(data: &[u8]) -> H256 {
    H256::from(sha2_256(data))
}

/// Digest of an acknowledgement.
pub fn commit_acknowledgement<T: Config>(ack: &Acknowledgement<T>) -> H256 {
    match ack {
        Acknowledgement::Empty => EMPTY_ACK_COMMITMENT,
        Acknowledgement::Data(bytes) => H256::from(sha2_256(bytes)),
    }
}

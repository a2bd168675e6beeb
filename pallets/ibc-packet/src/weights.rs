//! IBC packet weight stubs.
//!
//! These are placeholder weights. Real weights should be determined through
//! benchmarking once the proof verifier used by the runtime is fixed, since
//! verification dominates every relayer call.
//!
//! The stubs are flat and report no proof size, although every call carries a
//! packet of up to `MaxPacketDataLen` bytes and a proof of up to `MaxProofLen`
//! bytes. Benchmarked weights must be linear in both lengths and account for
//! the channel, connection and commitment reads before these calls are
//! exposed to untrusted relayers.

use frame_support::weights::Weight;

pub trait WeightInfo {
    fn deliver_packet() -> Weight;
    fn deliver_acknowledgement() -> Weight;
    fn deliver_cleanup() -> Weight;
}

// Reads: channel, connection, commitment/sequence. Writes: at most two keys.
impl WeightInfo for () {
    fn deliver_packet() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn deliver_acknowledgement() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn deliver_cleanup() -> Weight {
        Weight::from_parts(10_000, 0)
    }
}

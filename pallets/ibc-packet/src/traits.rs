//! IBC packet traits and interfaces.
//!
//! The pallet owns sequences and commitments only. Channel and connection
//! records, light-client state, proof checking and application logic are
//! supplied by the runtime through these traits.

use crate::types::{
    Acknowledgement, ChannelEnd, ChannelId, ClientId, ClientState, ConnectionEnd, ConnectionId,
    Height, Packet, PortId, Sequence,
};
use crate::Config;
use frame_support::pallet_prelude::*;
use sp_core::H256;

// =========================================================
// Channel / Connection Registry
// =========================================================

/// Read-only access to established channels and connections.
pub trait ChannelRegistry<T: Config> {
    /// Get the channel end bound to `(port_id, channel_id)`.
    fn channel(port_id: &PortId<T>, channel_id: &ChannelId<T>) -> Option<ChannelEnd<T>>;

    /// Get a connection end.
    fn connection(connection_id: &ConnectionId<T>) -> Option<ConnectionEnd<T>>;
}

// =========================================================
// Light Clients
// =========================================================

/// Read-only access to counterparty light clients.
pub trait ClientRegistry<T: Config> {
    fn client_state(client_id: &ClientId<T>) -> Option<ClientState>;
}

// =========================================================
// Proof Verifier
// =========================================================

/// Checks a claimed counterparty store value against the counterparty's
/// committed state at `proof_height`, as seen by the connection's client.
pub trait ProofVerifier<T: Config> {
    fn verify_packet_commitment(
        connection: &ConnectionEnd<T>,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
        commitment: H256,
    ) -> DispatchResult;

    /// `ack_commitment` is the digest produced by
    /// [`commit_acknowledgement`](crate::commitment::commit_acknowledgement).
    fn verify_packet_acknowledgement(
        connection: &ConnectionEnd<T>,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
        ack_commitment: H256,
    ) -> DispatchResult;

    fn verify_next_sequence_recv(
        connection: &ConnectionEnd<T>,
        proof_height: Height,
        proof: &[u8],
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        next_sequence_recv: Sequence,
    ) -> DispatchResult;
}

// =========================================================
// Port Authentication
// =========================================================

/// Decides whether the caller may act on behalf of a port.
///
/// Capability-based port ownership is not enforced by this pallet yet; the
/// unit implementation admits every port.
pub trait PortAuthenticator<T: Config> {
    fn authenticate(port_id: &PortId<T>) -> bool;
}

impl<T: Config> PortAuthenticator<T> for () {
    fn authenticate(_port_id: &PortId<T>) -> bool {
        true
    }
}

// =========================================================
// Application Callbacks
// =========================================================

/// Application logic driven by the relayer extrinsics.
pub trait PacketModule<T: Config> {
    /// Execute a verified incoming packet and produce its acknowledgement.
    fn on_recv_packet(packet: &Packet<T>) -> Result<Acknowledgement<T>, DispatchError>;

    /// React to a verified acknowledgement of a packet sent by this chain.
    fn on_acknowledgement_packet(
        packet: &Packet<T>,
        acknowledgement: &Acknowledgement<T>,
    ) -> DispatchResult;

    /// React to a sent packet whose commitment was cleaned up.
    fn on_cleanup_packet(packet: &Packet<T>) -> DispatchResult;
}

impl<T: Config> PacketModule<T> for () {
    fn on_recv_packet(_packet: &Packet<T>) -> Result<Acknowledgement<T>, DispatchError> {
        Ok(Acknowledgement::Empty)
    }

    fn on_acknowledgement_packet(
        _packet: &Packet<T>,
        _acknowledgement: &Acknowledgement<T>,
    ) -> DispatchResult {
        Ok(())
    }

    fn on_cleanup_packet(_packet: &Packet<T>) -> DispatchResult {
        Ok(())
    }
}

// =========================================================
// Packet Lifecycle
// =========================================================

/// The packet lifecycle as seen by application pallets.
pub trait PacketLifecycle<T: Config> {
    fn send_packet(packet: Packet<T>) -> DispatchResult;

    fn recv_packet(
        packet: Packet<T>,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<Packet<T>, DispatchError>;

    fn packet_executed(packet: &Packet<T>, acknowledgement: &Acknowledgement<T>) -> DispatchResult;

    fn acknowledge_packet(
        packet: Packet<T>,
        acknowledgement: &Acknowledgement<T>,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<Packet<T>, DispatchError>;

    fn acknowledgement_executed(packet: &Packet<T>);

    fn cleanup_packet(
        packet: Packet<T>,
        proof: &[u8],
        proof_height: Height,
        next_sequence_recv: Sequence,
        acknowledgement: &Acknowledgement<T>,
    ) -> Result<Packet<T>, DispatchError>;
}

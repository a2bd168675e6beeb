//! IBC packet types and data structures.

use super::Config;
use alloc::vec::Vec;
use codec::{Decode, Encode, MaxEncodedLen};
use frame_support::pallet_prelude::*;
use frame_support::{CloneNoBound, EqNoBound, PartialEqNoBound, RuntimeDebugNoBound};

// =========================================================
// Type Aliases
// =========================================================

pub type Sequence = u64;
pub type Height = u64;
pub type Identifier<T> = BoundedVec<u8, <T as Config>::MaxIdentifierLen>;
pub type PortId<T> = Identifier<T>;
pub type ChannelId<T> = Identifier<T>;
pub type ConnectionId<T> = Identifier<T>;
pub type ClientId<T> = Identifier<T>;
pub type PacketData<T> = BoundedVec<u8, <T as Config>::MaxPacketDataLen>;
pub type AckData<T> = BoundedVec<u8, <T as Config>::MaxAckLen>;
pub type Proof<T> = BoundedVec<u8, <T as Config>::MaxProofLen>;

// =========================================================
// Channel End
// =========================================================

/// Channel handshake state.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub enum ChannelState {
    Init,
    TryOpen,
    Open,
    Closed,
}

/// Delivery ordering of a channel.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub enum Order {
    /// Packets are executed strictly in sequence order.
    Ordered,
    /// Packets may be executed in any order; replay protection comes from
    /// the per-sequence acknowledgement record.
    Unordered,
}

/// The other end of a channel.
#[derive(
    CloneNoBound,
    Encode,
    Decode,
    EqNoBound,
    PartialEqNoBound,
    RuntimeDebugNoBound,
    TypeInfo,
)]
#[scale_info(skip_type_params(T))]
pub struct Counterparty<T: Config> {
    pub port_id: PortId<T>,
    pub channel_id: ChannelId<T>,
}

/// Channel record as supplied by the channel registry.
#[derive(
    CloneNoBound,
    Encode,
    Decode,
    EqNoBound,
    PartialEqNoBound,
    RuntimeDebugNoBound,
    TypeInfo,
)]
#[scale_info(skip_type_params(T))]
pub struct ChannelEnd<T: Config> {
    pub state: ChannelState,
    pub ordering: Order,
    pub counterparty: Counterparty<T>,
    /// Only the first hop is used; multi-hop forwarding is not supported.
    pub connection_hops: Vec<ConnectionId<T>>,
}

impl<T: Config> ChannelEnd<T> {
    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    pub fn first_hop(&self) -> Option<&ConnectionId<T>> {
        self.connection_hops.first()
    }

    /// Whether `(port_id, channel_id)` names this channel's counterparty.
    pub fn counterparty_matches(&self, port_id: &PortId<T>, channel_id: &ChannelId<T>) -> bool {
        self.counterparty.port_id == *port_id && self.counterparty.channel_id == *channel_id
    }
}

// =========================================================
// Connection End
// =========================================================

/// Connection handshake state.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub enum ConnectionState {
    /// Treated as closed for the purpose of sending.
    Uninitialized,
    Init,
    TryOpen,
    Open,
}

/// Connection record as supplied by the channel registry.
#[derive(
    CloneNoBound,
    Encode,
    Decode,
    EqNoBound,
    PartialEqNoBound,
    RuntimeDebugNoBound,
    TypeInfo,
)]
#[scale_info(skip_type_params(T))]
pub struct ConnectionEnd<T: Config> {
    pub state: ConnectionState,
    pub client_id: ClientId<T>,
}

impl<T: Config> ConnectionEnd<T> {
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }
}

// =========================================================
// Client State
// =========================================================

/// Light-client view of the counterparty chain.
#[derive(Clone, Copy, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct ClientState {
    pub latest_height: Height,
}

impl ClientState {
    pub fn latest_height(&self) -> Height {
        self.latest_height
    }
}

// =========================================================
// Packet
// =========================================================

/// A cross-chain packet. Immutable once sent.
#[derive(
    CloneNoBound,
    Encode,
    Decode,
    EqNoBound,
    PartialEqNoBound,
    RuntimeDebugNoBound,
    TypeInfo,
)]
#[scale_info(skip_type_params(T))]
pub struct Packet<T: Config> {
    pub source_port: PortId<T>,
    pub source_channel: ChannelId<T>,
    pub destination_port: PortId<T>,
    pub destination_channel: ChannelId<T>,
    /// Assigned by the sender, contiguous per channel direction.
    pub sequence: Sequence,
    pub data: PacketData<T>,
    /// Counterparty block height at and after which the packet can no longer
    /// be received.
    pub timeout_height: Height,
}

impl<T: Config> codec::DecodeWithMemTracking for Packet<T> {}

impl<T: Config> Packet<T> {
    /// Structural checks that need no chain state.
    pub fn validate_basic(&self) -> bool {
        !self.source_port.is_empty()
            && !self.source_channel.is_empty()
            && !self.destination_port.is_empty()
            && !self.destination_channel.is_empty()
            && self.sequence > 0
            && !self.data.is_empty()
    }
}

// =========================================================
// Acknowledgement
// =========================================================

/// Result of executing a received packet.
///
/// `Empty` is the payload-less success receipt written on unordered
/// channels. It is distinct from `Data` holding zero bytes.
#[derive(
    CloneNoBound,
    Encode,
    Decode,
    EqNoBound,
    PartialEqNoBound,
    RuntimeDebugNoBound,
    TypeInfo,
)]
#[scale_info(skip_type_params(T))]
pub enum Acknowledgement<T: Config> {
    Empty,
    Data(AckData<T>),
}

impl<T: Config> codec::DecodeWithMemTracking for Acknowledgement<T> {}

impl<T: Config> Acknowledgement<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Acknowledgement::Empty)
    }
}

//! # IBC Packet Pallet
//!
//! Packet lifecycle for ClawChain cross-chain channels.
//!
//! ## Overview
//!
//! This pallet owns the packet half of an IBC-style channel: per-channel
//! send/receive sequence counters, packet commitments on the sending side and
//! acknowledgement commitments on the receiving side. Channel and connection
//! handshakes, light clients and proof checking live elsewhere and are
//! reached through the traits in [`traits`].
//!
//! Each packet moves through `Unsent -> Sent -> Received -> Acknowledged ->
//! Cleaned`. The state is never stored directly; every entry point derives it
//! from the presence of commitment and acknowledgement entries.
//!
//! ## Application API
//!
//! Application pallets drive the lifecycle through [`traits::PacketLifecycle`]:
//! - `send_packet` - commit an outgoing packet
//! - `recv_packet` - verify an incoming packet against the counterparty
//! - `packet_executed` - record the acknowledgement of an executed packet
//! - `acknowledge_packet` - verify the counterparty acknowledgement
//! - `acknowledgement_executed` - drop the commitment of an acknowledged packet
//! - `cleanup_packet` - drop the commitment of a packet the counterparty
//!   has provably processed
//!
//! ## Dispatchable Functions
//!
//! Permissionless relayer entry points that chain the steps above with the
//! configured [`traits::PacketModule`]:
//! - `deliver_packet`
//! - `deliver_acknowledgement`
//! - `deliver_cleanup`

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(deprecated, clippy::let_unit_value)]

extern crate alloc;

pub use pallet::*;

pub mod commitment;
mod handler;
mod store;
pub mod traits;
pub mod types;
pub mod weights;

#[cfg(test)]
mod mock;

use alloc::vec::Vec;
use frame_support::pallet_prelude::*;
use frame_system::pallet_prelude::*;
use sp_core::H256;

pub(crate) const LOG_TARGET: &str = "runtime::ibc-packet";

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use traits::{ChannelRegistry, ClientRegistry, PacketModule, PortAuthenticator, ProofVerifier};

    pub use crate::types::{
        Acknowledgement, ChannelId, Height, Packet, PortId, Proof, Sequence,
    };
    pub use crate::weights::WeightInfo;

    // =========================================================
    // Config
    // =========================================================

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;
        type WeightInfo: WeightInfo;

        /// Source of established channel and connection records.
        type ChannelRegistry: ChannelRegistry<Self>;

        /// Source of counterparty light-client state.
        type ClientRegistry: ClientRegistry<Self>;

        /// Verifies counterparty state proofs.
        type ProofVerifier: ProofVerifier<Self>;

        /// Port ownership check for outgoing operations.
        type PortAuthenticator: PortAuthenticator<Self>;

        /// Application logic invoked by the relayer extrinsics.
        type PacketModule: PacketModule<Self>;

        /// Maximum byte length of a port, channel, connection or client identifier.
        #[pallet::constant]
        type MaxIdentifierLen: Get<u32>;

        /// Maximum byte length of packet data.
        #[pallet::constant]
        type MaxPacketDataLen: Get<u32>;

        /// Maximum byte length of acknowledgement data.
        #[pallet::constant]
        type MaxAckLen: Get<u32>;

        /// Maximum byte length of a relayer-supplied proof.
        #[pallet::constant]
        type MaxProofLen: Get<u32>;
    }

    // =========================================================
    // Pallet
    // =========================================================

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    /// Next sequence to be sent on a channel.
    #[pallet::storage]
    pub type NextSequenceSend<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        PortId<T>,
        Blake2_128Concat,
        ChannelId<T>,
        Sequence,
        OptionQuery,
    >;

    /// Next sequence expected on an ordered channel.
    #[pallet::storage]
    pub type NextSequenceRecv<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        PortId<T>,
        Blake2_128Concat,
        ChannelId<T>,
        Sequence,
        OptionQuery,
    >;

    /// Commitments of sent packets, kept until acknowledged or cleaned up.
    #[pallet::storage]
    pub type PacketCommitments<T: Config> = StorageNMap<
        _,
        (
            NMapKey<Blake2_128Concat, PortId<T>>,
            NMapKey<Blake2_128Concat, ChannelId<T>>,
            NMapKey<Blake2_128Concat, Sequence>,
        ),
        H256,
        OptionQuery,
    >;

    /// Commitments of acknowledgements for executed packets. Never pruned.
    #[pallet::storage]
    pub type PacketAcknowledgements<T: Config> = StorageNMap<
        _,
        (
            NMapKey<Blake2_128Concat, PortId<T>>,
            NMapKey<Blake2_128Concat, ChannelId<T>>,
            NMapKey<Blake2_128Concat, Sequence>,
        ),
        H256,
        OptionQuery,
    >;

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        PacketSent {
            source_port: Vec<u8>,
            source_channel: Vec<u8>,
            sequence: Sequence,
            commitment: H256,
            timeout_height: Height,
        },
        /// `ack_commitment` is `None` on ordered channels executed without an
        /// acknowledgement.
        PacketExecuted {
            destination_port: Vec<u8>,
            destination_channel: Vec<u8>,
            sequence: Sequence,
            ack_commitment: Option<H256>,
        },
        PacketAcknowledged {
            source_port: Vec<u8>,
            source_channel: Vec<u8>,
            sequence: Sequence,
        },
        PacketCleanedUp {
            source_port: Vec<u8>,
            source_channel: Vec<u8>,
            sequence: Sequence,
        },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        ChannelNotFound,
        ConnectionNotFound,
        ConsensusStateNotFound,
        SequenceSendNotFound,
        SequenceReceiveNotFound,
        InvalidChannelState,
        InvalidConnectionState,
        InvalidPacket,
        PacketTimeout,
        CommitmentVerificationFailed,
        Unauthorized,
    }

    // =========================================================
    // Extrinsics
    // =========================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Deliver a packet from the counterparty, execute it and record its
        /// acknowledgement.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::deliver_packet())]
        pub fn deliver_packet(
            origin: OriginFor<T>,
            packet: Packet<T>,
            proof: Proof<T>,
            proof_height: Height,
        ) -> DispatchResult {
            let _relayer = ensure_signed(origin)?;

            let packet = Self::recv_packet(packet, &proof, proof_height)?;
            let acknowledgement = T::PacketModule::on_recv_packet(&packet)?;
            Self::packet_executed(&packet, &acknowledgement)
        }

        /// Deliver the counterparty acknowledgement of a packet sent by this
        /// chain and release its commitment.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::deliver_acknowledgement())]
        pub fn deliver_acknowledgement(
            origin: OriginFor<T>,
            packet: Packet<T>,
            acknowledgement: Acknowledgement<T>,
            proof: Proof<T>,
            proof_height: Height,
        ) -> DispatchResult {
            let _relayer = ensure_signed(origin)?;

            let packet = Self::acknowledge_packet(packet, &acknowledgement, &proof, proof_height)?;
            T::PacketModule::on_acknowledgement_packet(&packet, &acknowledgement)?;
            Self::acknowledgement_executed(&packet);
            Ok(())
        }

        /// Release the commitment of a packet the counterparty has provably
        /// processed.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::deliver_cleanup())]
        pub fn deliver_cleanup(
            origin: OriginFor<T>,
            packet: Packet<T>,
            proof: Proof<T>,
            proof_height: Height,
            next_sequence_recv: Sequence,
            acknowledgement: Acknowledgement<T>,
        ) -> DispatchResult {
            let _relayer = ensure_signed(origin)?;

            let packet = Self::cleanup_packet(
                packet,
                &proof,
                proof_height,
                next_sequence_recv,
                &acknowledgement,
            )?;
            T::PacketModule::on_cleanup_packet(&packet)
        }
    }
}

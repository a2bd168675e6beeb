//! Sequence and commitment store.
//!
//! Thin accessors over the pallet's storage items. Each keyspace is its own
//! storage item, so keys of different kinds can never collide.

use crate::{
    pallet::{
        Config, NextSequenceRecv, NextSequenceSend, Pallet, PacketAcknowledgements,
        PacketCommitments,
    },
    types::{ChannelId, PortId, Sequence},
};
use sp_core::H256;

impl<T: Config> Pallet<T> {
    /// Initialise both counters of a freshly opened channel.
    ///
    /// Called by the channel handshake once the channel reaches `Open`.
    pub fn init_channel_sequences(port_id: &PortId<T>, channel_id: &ChannelId<T>) {
        NextSequenceSend::<T>::insert(port_id, channel_id, 1);
        NextSequenceRecv::<T>::insert(port_id, channel_id, 1);
    }

    /// `None` if the channel was never opened.
    pub fn next_sequence_send(port_id: &PortId<T>, channel_id: &ChannelId<T>) -> Option<Sequence> {
        NextSequenceSend::<T>::get(port_id, channel_id)
    }

    pub fn set_next_sequence_send(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
    ) {
        NextSequenceSend::<T>::insert(port_id, channel_id, sequence);
    }

    /// `None` if the channel was never opened.
    pub fn next_sequence_recv(port_id: &PortId<T>, channel_id: &ChannelId<T>) -> Option<Sequence> {
        NextSequenceRecv::<T>::get(port_id, channel_id)
    }

    pub fn set_next_sequence_recv(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
    ) {
        NextSequenceRecv::<T>::insert(port_id, channel_id, sequence);
    }

    pub fn packet_commitment(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
    ) -> Option<H256> {
        PacketCommitments::<T>::get((port_id, channel_id, sequence))
    }

    pub fn set_packet_commitment(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
        commitment: H256,
    ) {
        PacketCommitments::<T>::insert((port_id, channel_id, sequence), commitment);
    }

    /// Returns whether a commitment was present.
    pub fn delete_packet_commitment(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
    ) -> bool {
        PacketCommitments::<T>::take((port_id, channel_id, sequence)).is_some()
    }

    pub fn packet_acknowledgement(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
    ) -> Option<H256> {
        PacketAcknowledgements::<T>::get((port_id, channel_id, sequence))
    }

    pub fn set_packet_acknowledgement(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
        sequence: Sequence,
        ack_commitment: H256,
    ) {
        PacketAcknowledgements::<T>::insert((port_id, channel_id, sequence), ack_commitment);
    }
}

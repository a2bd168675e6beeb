//! Packet lifecycle controller.
//!
//! Every operation re-reads channel, connection and store state instead of
//! trusting the caller, performs all checks before its first write, and runs
//! inside its own storage layer so a rejected call leaves storage untouched.

use crate::{
    commitment::{commit_acknowledgement, commit_packet},
    pallet::{Config, Error, Event, Pallet},
    traits::{
        ChannelRegistry, ClientRegistry, PacketLifecycle, PortAuthenticator, ProofVerifier,
    },
    types::{
        Acknowledgement, ChannelEnd, ChannelId, ChannelState, ConnectionEnd, ConnectionState,
        Height, Order, Packet, PortId, Sequence,
    },
    LOG_TARGET,
};
use frame_support::{pallet_prelude::*, storage::with_storage_layer};
use sp_runtime::{ArithmeticError, SaturatedConversion};

/// Render an identifier for log output.
fn ident(id: &[u8]) -> &str {
    core::str::from_utf8(id).unwrap_or("<non-utf8>")
}

impl<T: Config> Pallet<T> {
    // =========================================================
    // Sending side
    // =========================================================

    /// Commit an outgoing packet on its source channel.
    ///
    /// `packet.sequence` must be exactly the channel's next send sequence.
    pub fn send_packet(packet: Packet<T>) -> DispatchResult {
        with_storage_layer(|| -> DispatchResult {
            if !packet.validate_basic() {
                log::debug!(
                    target: LOG_TARGET,
                    "malformed packet {}/{} #{}",
                    ident(&packet.source_port),
                    ident(&packet.source_channel),
                    packet.sequence,
                );
                return Err(Error::<T>::InvalidPacket.into());
            }

            let channel = Self::channel_end(&packet.source_port, &packet.source_channel)?;
            if channel.state == ChannelState::Closed {
                log::debug!(
                    target: LOG_TARGET,
                    "channel {}/{} is closed",
                    ident(&packet.source_port),
                    ident(&packet.source_channel),
                );
                return Err(Error::<T>::InvalidChannelState.into());
            }

            Self::ensure_port_authenticated(&packet.source_port)?;
            Self::ensure_counterparty(
                &channel,
                &packet.destination_port,
                &packet.destination_channel,
            )?;

            // Uninitialized is treated as a closed connection.
            let connection = Self::connection_end(&channel)?;
            if connection.state == ConnectionState::Uninitialized {
                log::debug!(target: LOG_TARGET, "connection is uninitialized");
                return Err(Error::<T>::InvalidConnectionState.into());
            }

            let client = T::ClientRegistry::client_state(&connection.client_id).ok_or_else(|| {
                log::debug!(
                    target: LOG_TARGET,
                    "no client state for {}",
                    ident(&connection.client_id),
                );
                Error::<T>::ConsensusStateNotFound
            })?;

            // Already timed out from the counterparty's point of view.
            if client.latest_height() >= packet.timeout_height {
                log::debug!(
                    target: LOG_TARGET,
                    "timeout height {} already reached by counterparty (latest {})",
                    packet.timeout_height,
                    client.latest_height(),
                );
                return Err(Error::<T>::PacketTimeout.into());
            }

            let next_sequence_send =
                Self::next_sequence_send(&packet.source_port, &packet.source_channel)
                    .ok_or(Error::<T>::SequenceSendNotFound)?;
            if packet.sequence != next_sequence_send {
                log::debug!(
                    target: LOG_TARGET,
                    "packet sequence != next send sequence ({} != {})",
                    packet.sequence,
                    next_sequence_send,
                );
                return Err(Error::<T>::InvalidPacket.into());
            }

            let next = next_sequence_send.checked_add(1).ok_or(ArithmeticError::Overflow)?;
            let commitment = commit_packet(&packet.data);
            Self::set_next_sequence_send(&packet.source_port, &packet.source_channel, next);
            Self::set_packet_commitment(
                &packet.source_port,
                &packet.source_channel,
                packet.sequence,
                commitment,
            );

            log::info!(
                target: LOG_TARGET,
                "packet sent {}/{} #{}",
                ident(&packet.source_port),
                ident(&packet.source_channel),
                packet.sequence,
            );
            Self::deposit_event(Event::PacketSent {
                source_port: packet.source_port.to_vec(),
                source_channel: packet.source_channel.to_vec(),
                sequence: packet.sequence,
                commitment,
                timeout_height: packet.timeout_height,
            });

            Ok(())
        })
    }

    /// Verify the counterparty acknowledgement of a packet this chain sent.
    ///
    /// Does not mutate state; follow up with [`Self::acknowledgement_executed`].
    pub fn acknowledge_packet(
        packet: Packet<T>,
        acknowledgement: &Acknowledgement<T>,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<Packet<T>, DispatchError> {
        let channel = Self::open_channel_end(&packet.source_port, &packet.source_channel)?;
        Self::ensure_counterparty(&channel, &packet.destination_port, &packet.destination_channel)?;
        let connection = Self::open_connection_end(&channel)?;

        Self::ensure_commitment_matches(&packet)?;

        T::ProofVerifier::verify_packet_acknowledgement(
            &connection,
            proof_height,
            proof,
            &packet.destination_port,
            &packet.destination_channel,
            packet.sequence,
            commit_acknowledgement(acknowledgement),
        )
        .map_err(|e| Self::verification_failed("acknowledgement", e))?;

        Ok(packet)
    }

    /// Drop the commitment of an acknowledged packet. Idempotent.
    pub fn acknowledgement_executed(packet: &Packet<T>) {
        let removed = Self::delete_packet_commitment(
            &packet.source_port,
            &packet.source_channel,
            packet.sequence,
        );

        if removed {
            log::info!(
                target: LOG_TARGET,
                "packet acknowledged {}/{} #{}",
                ident(&packet.source_port),
                ident(&packet.source_channel),
                packet.sequence,
            );
            Self::deposit_event(Event::PacketAcknowledged {
                source_port: packet.source_port.to_vec(),
                source_channel: packet.source_channel.to_vec(),
                sequence: packet.sequence,
            });
        }
    }

    /// Drop the commitment of a packet the counterparty has provably
    /// processed, without an acknowledgement round-trip.
    ///
    /// Ordered channels prove the counterparty's receive sequence moved past
    /// the packet; unordered channels prove its acknowledgement was written.
    pub fn cleanup_packet(
        packet: Packet<T>,
        proof: &[u8],
        proof_height: Height,
        next_sequence_recv: Sequence,
        acknowledgement: &Acknowledgement<T>,
    ) -> Result<Packet<T>, DispatchError> {
        with_storage_layer(|| -> Result<Packet<T>, DispatchError> {
            let channel = Self::open_channel_end(&packet.source_port, &packet.source_channel)?;
            Self::ensure_port_authenticated(&packet.source_port)?;
            Self::ensure_counterparty(
                &channel,
                &packet.destination_port,
                &packet.destination_channel,
            )?;
            let connection = Self::connection_end(&channel)?;

            if next_sequence_recv <= packet.sequence {
                log::debug!(
                    target: LOG_TARGET,
                    "packet not yet received by counterparty (next recv {} <= sequence {})",
                    next_sequence_recv,
                    packet.sequence,
                );
                return Err(Error::<T>::InvalidPacket.into());
            }

            Self::ensure_commitment_matches(&packet)?;

            match channel.ordering {
                Order::Ordered => T::ProofVerifier::verify_next_sequence_recv(
                    &connection,
                    proof_height,
                    proof,
                    &packet.destination_port,
                    &packet.destination_channel,
                    next_sequence_recv,
                )
                .map_err(|e| Self::verification_failed("next sequence recv", e))?,
                Order::Unordered => T::ProofVerifier::verify_packet_acknowledgement(
                    &connection,
                    proof_height,
                    proof,
                    &packet.destination_port,
                    &packet.destination_channel,
                    packet.sequence,
                    commit_acknowledgement(acknowledgement),
                )
                .map_err(|e| Self::verification_failed("acknowledgement", e))?,
            }

            Self::delete_packet_commitment(
                &packet.source_port,
                &packet.source_channel,
                packet.sequence,
            );

            log::info!(
                target: LOG_TARGET,
                "packet cleaned up {}/{} #{}",
                ident(&packet.source_port),
                ident(&packet.source_channel),
                packet.sequence,
            );
            Self::deposit_event(Event::PacketCleanedUp {
                source_port: packet.source_port.to_vec(),
                source_channel: packet.source_channel.to_vec(),
                sequence: packet.sequence,
            });

            Ok(packet)
        })
    }

    // =========================================================
    // Receiving side
    // =========================================================

    /// Verify an incoming packet against the counterparty's commitment.
    ///
    /// Does not mutate state; the application executes the packet and then
    /// calls [`Self::packet_executed`].
    pub fn recv_packet(
        packet: Packet<T>,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<Packet<T>, DispatchError> {
        let channel =
            Self::open_channel_end(&packet.destination_port, &packet.destination_channel)?;
        // Capability authentication is left to whoever routed the packet here.
        Self::ensure_counterparty(&channel, &packet.source_port, &packet.source_channel)?;
        let connection = Self::open_connection_end(&channel)?;

        let host_height = Self::host_height();
        if host_height >= packet.timeout_height {
            log::debug!(
                target: LOG_TARGET,
                "packet timed out (height {} >= timeout {})",
                host_height,
                packet.timeout_height,
            );
            return Err(Error::<T>::PacketTimeout.into());
        }

        Self::ensure_not_received(&channel, &packet)?;

        T::ProofVerifier::verify_packet_commitment(
            &connection,
            proof_height,
            proof,
            &packet.source_port,
            &packet.source_channel,
            packet.sequence,
            commit_packet(&packet.data),
        )
        .map_err(|e| Self::verification_failed("packet commitment", e))?;

        Ok(packet)
    }

    /// Record the outcome of executing a received packet.
    ///
    /// Unordered channels always write an acknowledgement commitment, using
    /// the empty-acknowledgement sentinel when there is no payload. Ordered
    /// channels write one only for `Acknowledgement::Data` and advance the
    /// receive sequence.
    ///
    /// A packet already recorded on an unordered channel is rejected with
    /// `InvalidPacket` rather than overwriting its acknowledgement, so a
    /// retried delivery fails instead of succeeding twice.
    pub fn packet_executed(
        packet: &Packet<T>,
        acknowledgement: &Acknowledgement<T>,
    ) -> DispatchResult {
        with_storage_layer(|| -> DispatchResult {
            let channel =
                Self::open_channel_end(&packet.destination_port, &packet.destination_channel)?;

            let next_sequence_recv = match channel.ordering {
                Order::Ordered => {
                    let next = Self::next_sequence_recv(
                        &packet.destination_port,
                        &packet.destination_channel,
                    )
                    .ok_or(Error::<T>::SequenceReceiveNotFound)?;
                    if packet.sequence != next {
                        log::debug!(
                            target: LOG_TARGET,
                            "packet sequence != next receive sequence ({} != {})",
                            packet.sequence,
                            next,
                        );
                        return Err(Error::<T>::InvalidPacket.into());
                    }
                    Some(next.checked_add(1).ok_or(ArithmeticError::Overflow)?)
                }
                Order::Unordered => {
                    Self::ensure_not_received(&channel, packet)?;
                    None
                }
            };

            let ack_commitment = match (channel.ordering, acknowledgement) {
                (Order::Ordered, Acknowledgement::Empty) => None,
                _ => Some(commit_acknowledgement(acknowledgement)),
            };

            if let Some(ack_commitment) = ack_commitment {
                Self::set_packet_acknowledgement(
                    &packet.destination_port,
                    &packet.destination_channel,
                    packet.sequence,
                    ack_commitment,
                );
            }
            if let Some(next) = next_sequence_recv {
                Self::set_next_sequence_recv(
                    &packet.destination_port,
                    &packet.destination_channel,
                    next,
                );
            }

            log::info!(
                target: LOG_TARGET,
                "packet received {}/{} #{}",
                ident(&packet.destination_port),
                ident(&packet.destination_channel),
                packet.sequence,
            );
            Self::deposit_event(Event::PacketExecuted {
                destination_port: packet.destination_port.to_vec(),
                destination_channel: packet.destination_channel.to_vec(),
                sequence: packet.sequence,
                ack_commitment,
            });

            Ok(())
        })
    }

    // =========================================================
    // Checks
    // =========================================================

    fn host_height() -> Height {
        frame_system::Pallet::<T>::block_number().saturated_into::<Height>()
    }

    fn channel_end(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
    ) -> Result<ChannelEnd<T>, DispatchError> {
        T::ChannelRegistry::channel(port_id, channel_id).ok_or_else(|| {
            log::debug!(
                target: LOG_TARGET,
                "channel {}/{} not found",
                ident(port_id),
                ident(channel_id),
            );
            Error::<T>::ChannelNotFound.into()
        })
    }

    fn open_channel_end(
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
    ) -> Result<ChannelEnd<T>, DispatchError> {
        let channel = Self::channel_end(port_id, channel_id)?;
        if !channel.is_open() {
            log::debug!(
                target: LOG_TARGET,
                "channel {}/{} is not open (got {:?})",
                ident(port_id),
                ident(channel_id),
                channel.state,
            );
            return Err(Error::<T>::InvalidChannelState.into());
        }
        Ok(channel)
    }

    /// Connection behind the channel's first hop.
    fn connection_end(channel: &ChannelEnd<T>) -> Result<ConnectionEnd<T>, DispatchError> {
        let hop = channel.first_hop().ok_or_else(|| {
            log::debug!(target: LOG_TARGET, "channel has no connection hops");
            Error::<T>::ConnectionNotFound
        })?;

        T::ChannelRegistry::connection(hop).ok_or_else(|| {
            log::debug!(target: LOG_TARGET, "connection {} not found", ident(hop));
            Error::<T>::ConnectionNotFound.into()
        })
    }

    fn open_connection_end(channel: &ChannelEnd<T>) -> Result<ConnectionEnd<T>, DispatchError> {
        let connection = Self::connection_end(channel)?;
        if !connection.is_open() {
            log::debug!(
                target: LOG_TARGET,
                "connection is not open (got {:?})",
                connection.state,
            );
            return Err(Error::<T>::InvalidConnectionState.into());
        }
        Ok(connection)
    }

    fn ensure_counterparty(
        channel: &ChannelEnd<T>,
        port_id: &PortId<T>,
        channel_id: &ChannelId<T>,
    ) -> DispatchResult {
        if !channel.counterparty_matches(port_id, channel_id) {
            log::debug!(
                target: LOG_TARGET,
                "packet counterparty doesn't match the channel's ({}/{} != {}/{})",
                ident(port_id),
                ident(channel_id),
                ident(&channel.counterparty.port_id),
                ident(&channel.counterparty.channel_id),
            );
            return Err(Error::<T>::InvalidPacket.into());
        }
        Ok(())
    }

    fn ensure_port_authenticated(port_id: &PortId<T>) -> DispatchResult {
        ensure!(T::PortAuthenticator::authenticate(port_id), Error::<T>::Unauthorized);
        Ok(())
    }

    /// The packet was sent by this chain and not yet resolved.
    fn ensure_commitment_matches(packet: &Packet<T>) -> DispatchResult {
        let stored =
            Self::packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence);
        if stored != Some(commit_packet(&packet.data)) {
            log::debug!(
                target: LOG_TARGET,
                "packet {}/{} #{} hasn't been sent",
                ident(&packet.source_port),
                ident(&packet.source_channel),
                packet.sequence,
            );
            return Err(Error::<T>::InvalidPacket.into());
        }
        Ok(())
    }

    /// Replay protection on the receiving side.
    fn ensure_not_received(channel: &ChannelEnd<T>, packet: &Packet<T>) -> DispatchResult {
        let received = match channel.ordering {
            Order::Ordered => {
                Self::next_sequence_recv(&packet.destination_port, &packet.destination_channel)
                    .is_some_and(|next| packet.sequence < next)
            }
            Order::Unordered => Self::packet_acknowledgement(
                &packet.destination_port,
                &packet.destination_channel,
                packet.sequence,
            )
            .is_some(),
        };

        if received {
            log::debug!(
                target: LOG_TARGET,
                "packet {}/{} #{} already received",
                ident(&packet.destination_port),
                ident(&packet.destination_channel),
                packet.sequence,
            );
            return Err(Error::<T>::InvalidPacket.into());
        }
        Ok(())
    }

    fn verification_failed(what: &str, err: DispatchError) -> DispatchError {
        log::debug!(target: LOG_TARGET, "{} proof verification failed: {:?}", what, err);
        Error::<T>::CommitmentVerificationFailed.into()
    }
}

impl<T: Config> PacketLifecycle<T> for Pallet<T> {
    fn send_packet(packet: Packet<T>) -> DispatchResult {
        Pallet::<T>::send_packet(packet)
    }

    fn recv_packet(
        packet: Packet<T>,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<Packet<T>, DispatchError> {
        Pallet::<T>::recv_packet(packet, proof, proof_height)
    }

    fn packet_executed(packet: &Packet<T>, acknowledgement: &Acknowledgement<T>) -> DispatchResult {
        Pallet::<T>::packet_executed(packet, acknowledgement)
    }

    fn acknowledge_packet(
        packet: Packet<T>,
        acknowledgement: &Acknowledgement<T>,
        proof: &[u8],
        proof_height: Height,
    ) -> Result<Packet<T>, DispatchError> {
        Pallet::<T>::acknowledge_packet(packet, acknowledgement, proof, proof_height)
    }

    fn acknowledgement_executed(packet: &Packet<T>) {
        Pallet::<T>::acknowledgement_executed(packet)
    }

    fn cleanup_packet(
        packet: Packet<T>,
        proof: &[u8],
        proof_height: Height,
        next_sequence_recv: Sequence,
        acknowledgement: &Acknowledgement<T>,
    ) -> Result<Packet<T>, DispatchError> {
        Pallet::<T>::cleanup_packet(packet, proof, proof_height, next_sequence_recv, acknowledgement)
    }
}

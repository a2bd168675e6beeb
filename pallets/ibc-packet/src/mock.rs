//! Mock runtime for IBC packet pallet tests.

#![cfg(test)]

use super::*;
use crate::commitment::{commit_acknowledgement, commit_packet};
use crate::traits::{
    ChannelRegistry, ClientRegistry, PacketModule, PortAuthenticator, ProofVerifier,
};
use crate::types::{
    ChannelEnd, ChannelState, ClientId, ClientState, ConnectionEnd, ConnectionId,
    ConnectionState, Counterparty, Order,
};
use frame_support::{derive_impl, parameter_types, traits::Get};
use sp_runtime::BuildStorage;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

// =========================================================
// Fixtures
// =========================================================

pub const PORT: &[u8] = b"transfer";
pub const CHANNEL: &[u8] = b"channel-0";
pub const COUNTERPARTY_PORT: &[u8] = b"transfer";
pub const COUNTERPARTY_CHANNEL: &[u8] = b"channel-7";
pub const CONNECTION: &[u8] = b"connection-0";
pub const CLIENT: &[u8] = b"07-tendermint-0";
pub const PROOF: &[u8] = b"proof";
pub const RELAYER: u64 = 1;
pub const TIMEOUT_HEIGHT: Height = 100;

pub fn bounded<S: Get<u32>>(bytes: &[u8]) -> BoundedVec<u8, S> {
    bytes.to_vec().try_into().expect("fixture fits bound")
}

pub fn proof() -> Proof<Runtime> {
    bounded(PROOF)
}

/// A packet this chain sends on `PORT/CHANNEL`.
pub fn outgoing_packet(sequence: Sequence) -> Packet<Runtime> {
    Packet {
        source_port: bounded(PORT),
        source_channel: bounded(CHANNEL),
        destination_port: bounded(COUNTERPARTY_PORT),
        destination_channel: bounded(COUNTERPARTY_CHANNEL),
        sequence,
        data: bounded(format!("packet-{}", sequence).as_bytes()),
        timeout_height: TIMEOUT_HEIGHT,
    }
}

/// A packet the counterparty sends to `PORT/CHANNEL`.
pub fn incoming_packet(sequence: Sequence) -> Packet<Runtime> {
    Packet {
        source_port: bounded(COUNTERPARTY_PORT),
        source_channel: bounded(COUNTERPARTY_CHANNEL),
        destination_port: bounded(PORT),
        destination_channel: bounded(CHANNEL),
        sequence,
        data: bounded(format!("incoming-{}", sequence).as_bytes()),
        timeout_height: TIMEOUT_HEIGHT,
    }
}

pub fn ack_data(bytes: &[u8]) -> Acknowledgement<Runtime> {
    Acknowledgement::Data(bounded(bytes))
}

// =========================================================
// Mock Channel Registry & Light Clients
// =========================================================

type ChannelKey = (Vec<u8>, Vec<u8>);

thread_local! {
    static CHANNELS: RefCell<BTreeMap<ChannelKey, ChannelEnd<Runtime>>> =
        RefCell::new(BTreeMap::new());
    static CONNECTIONS: RefCell<BTreeMap<Vec<u8>, ConnectionEnd<Runtime>>> =
        RefCell::new(BTreeMap::new());
    static CLIENTS: RefCell<BTreeMap<Vec<u8>, ClientState>> = RefCell::new(BTreeMap::new());
    static DENIED_PORTS: RefCell<BTreeSet<Vec<u8>>> = RefCell::new(BTreeSet::new());
}

pub struct MockRegistry;

impl ChannelRegistry<Runtime> for MockRegistry {
    fn channel(
        port_id: &PortId<Runtime>,
        channel_id: &ChannelId<Runtime>,
    ) -> Option<ChannelEnd<Runtime>> {
        CHANNELS.with(|c| c.borrow().get(&(port_id.to_vec(), channel_id.to_vec())).cloned())
    }

    fn connection(connection_id: &ConnectionId<Runtime>) -> Option<ConnectionEnd<Runtime>> {
        CONNECTIONS.with(|c| c.borrow().get(&connection_id.to_vec()).cloned())
    }
}

impl ClientRegistry<Runtime> for MockRegistry {
    fn client_state(client_id: &ClientId<Runtime>) -> Option<ClientState> {
        CLIENTS.with(|c| c.borrow().get(&client_id.to_vec()).copied())
    }
}

pub struct MockPortAuthenticator;

impl PortAuthenticator<Runtime> for MockPortAuthenticator {
    fn authenticate(port_id: &PortId<Runtime>) -> bool {
        DENIED_PORTS.with(|d| !d.borrow().contains(&port_id.to_vec()))
    }
}

pub fn deny_port(port: &[u8]) {
    DENIED_PORTS.with(|d| {
        d.borrow_mut().insert(port.to_vec());
    });
}

/// Register a local channel whose counterparty is `counterparty_channel`.
pub fn set_channel_with(
    channel: &[u8],
    counterparty_channel: &[u8],
    state: ChannelState,
    ordering: Order,
) {
    let end = ChannelEnd {
        state,
        ordering,
        counterparty: Counterparty {
            port_id: bounded(COUNTERPARTY_PORT),
            channel_id: bounded(counterparty_channel),
        },
        connection_hops: vec![bounded(CONNECTION)],
    };
    CHANNELS.with(|c| {
        c.borrow_mut().insert((PORT.to_vec(), channel.to_vec()), end);
    });
}

pub fn set_channel(state: ChannelState, ordering: Order) {
    set_channel_with(CHANNEL, COUNTERPARTY_CHANNEL, state, ordering);
}

/// Strip every connection hop from `PORT/CHANNEL`.
pub fn clear_connection_hops() {
    CHANNELS.with(|c| {
        if let Some(end) = c.borrow_mut().get_mut(&(PORT.to_vec(), CHANNEL.to_vec())) {
            end.connection_hops.clear();
        }
    });
}

pub fn set_connection(state: ConnectionState) {
    let end = ConnectionEnd { state, client_id: bounded(CLIENT) };
    CONNECTIONS.with(|c| {
        c.borrow_mut().insert(CONNECTION.to_vec(), end);
    });
}

pub fn remove_connection() {
    CONNECTIONS.with(|c| {
        c.borrow_mut().remove(CONNECTION);
    });
}

pub fn set_client_height(latest_height: Height) {
    CLIENTS.with(|c| {
        c.borrow_mut().insert(CLIENT.to_vec(), ClientState { latest_height });
    });
}

pub fn remove_client() {
    CLIENTS.with(|c| {
        c.borrow_mut().remove(CLIENT);
    });
}

/// Open `PORT/CHANNEL` over an open connection and initialise its sequences.
pub fn open_channel(ordering: Order) {
    set_channel(ChannelState::Open, ordering);
    set_connection(ConnectionState::Open);
    set_client_height(10);
    IbcPacket::init_channel_sequences(&bounded(PORT), &bounded(CHANNEL));
}

// =========================================================
// Mock Proof Verifier
// =========================================================

/// Counterparty chain state that proofs are checked against.
#[derive(Default)]
struct CounterpartyStore {
    commitments: BTreeMap<(Vec<u8>, Vec<u8>, Sequence), H256>,
    acknowledgements: BTreeMap<(Vec<u8>, Vec<u8>, Sequence), H256>,
    next_sequence_recv: BTreeMap<ChannelKey, Sequence>,
}

thread_local! {
    static COUNTERPARTY: RefCell<CounterpartyStore> = RefCell::new(CounterpartyStore::default());
    static VERIFIER_CALLS: RefCell<u32> = const { RefCell::new(0) };
}

/// The counterparty committed `packet`.
pub fn counterparty_commit_packet(packet: &Packet<Runtime>) {
    let key = (packet.source_port.to_vec(), packet.source_channel.to_vec(), packet.sequence);
    COUNTERPARTY.with(|c| {
        c.borrow_mut().commitments.insert(key, commit_packet(&packet.data));
    });
}

/// The counterparty executed `packet` and wrote `ack`.
pub fn counterparty_write_ack(packet: &Packet<Runtime>, ack: &Acknowledgement<Runtime>) {
    let key = (
        packet.destination_port.to_vec(),
        packet.destination_channel.to_vec(),
        packet.sequence,
    );
    COUNTERPARTY.with(|c| {
        c.borrow_mut().acknowledgements.insert(key, commit_acknowledgement(ack));
    });
}

pub fn counterparty_set_next_sequence_recv(next: Sequence) {
    let key = (COUNTERPARTY_PORT.to_vec(), COUNTERPARTY_CHANNEL.to_vec());
    COUNTERPARTY.with(|c| {
        c.borrow_mut().next_sequence_recv.insert(key, next);
    });
}

pub fn verifier_calls() -> u32 {
    VERIFIER_CALLS.with(|v| *v.borrow())
}

pub struct MockVerifier;

impl MockVerifier {
    fn check(proof: &[u8], holds: bool) -> DispatchResult {
        VERIFIER_CALLS.with(|v| *v.borrow_mut() += 1);
        if proof.is_empty() || !holds {
            return Err(DispatchError::Other("invalid proof"));
        }
        Ok(())
    }
}

impl ProofVerifier<Runtime> for MockVerifier {
    fn verify_packet_commitment(
        _connection: &ConnectionEnd<Runtime>,
        _proof_height: Height,
        proof: &[u8],
        port_id: &PortId<Runtime>,
        channel_id: &ChannelId<Runtime>,
        sequence: Sequence,
        commitment: H256,
    ) -> DispatchResult {
        let key = (port_id.to_vec(), channel_id.to_vec(), sequence);
        let holds = COUNTERPARTY.with(|c| c.borrow().commitments.get(&key) == Some(&commitment));
        Self::check(proof, holds)
    }

    fn verify_packet_acknowledgement(
        _connection: &ConnectionEnd<Runtime>,
        _proof_height: Height,
        proof: &[u8],
        port_id: &PortId<Runtime>,
        channel_id: &ChannelId<Runtime>,
        sequence: Sequence,
        ack_commitment: H256,
    ) -> DispatchResult {
        let key = (port_id.to_vec(), channel_id.to_vec(), sequence);
        let holds = COUNTERPARTY
            .with(|c| c.borrow().acknowledgements.get(&key) == Some(&ack_commitment));
        Self::check(proof, holds)
    }

    fn verify_next_sequence_recv(
        _connection: &ConnectionEnd<Runtime>,
        _proof_height: Height,
        proof: &[u8],
        port_id: &PortId<Runtime>,
        channel_id: &ChannelId<Runtime>,
        next_sequence_recv: Sequence,
    ) -> DispatchResult {
        let key = (port_id.to_vec(), channel_id.to_vec());
        let holds = COUNTERPARTY
            .with(|c| c.borrow().next_sequence_recv.get(&key) == Some(&next_sequence_recv));
        Self::check(proof, holds)
    }
}

// =========================================================
// Mock Application
// =========================================================

#[derive(Default)]
pub struct AppLog {
    pub received: Vec<Sequence>,
    pub acknowledged: Vec<Sequence>,
    pub cleaned: Vec<Sequence>,
}

thread_local! {
    static APP_LOG: RefCell<AppLog> = RefCell::new(AppLog::default());
    static APP_ACK: RefCell<Option<Acknowledgement<Runtime>>> = const { RefCell::new(None) };
    static APP_FAILS: RefCell<bool> = const { RefCell::new(false) };
}

/// Acknowledgement the application returns; `Empty` when unset.
pub fn set_app_ack(ack: Acknowledgement<Runtime>) {
    APP_ACK.with(|a| *a.borrow_mut() = Some(ack));
}

pub fn set_app_fails(fails: bool) {
    APP_FAILS.with(|f| *f.borrow_mut() = fails);
}

pub fn app_log<R>(f: impl FnOnce(&AppLog) -> R) -> R {
    APP_LOG.with(|l| f(&l.borrow()))
}

pub struct MockApp;

impl PacketModule<Runtime> for MockApp {
    fn on_recv_packet(
        packet: &Packet<Runtime>,
    ) -> Result<Acknowledgement<Runtime>, DispatchError> {
        if APP_FAILS.with(|f| *f.borrow()) {
            return Err(DispatchError::Other("application rejected packet"));
        }
        APP_LOG.with(|l| l.borrow_mut().received.push(packet.sequence));
        Ok(APP_ACK.with(|a| a.borrow().clone()).unwrap_or(Acknowledgement::Empty))
    }

    fn on_acknowledgement_packet(
        packet: &Packet<Runtime>,
        _acknowledgement: &Acknowledgement<Runtime>,
    ) -> DispatchResult {
        APP_LOG.with(|l| l.borrow_mut().acknowledged.push(packet.sequence));
        Ok(())
    }

    fn on_cleanup_packet(packet: &Packet<Runtime>) -> DispatchResult {
        APP_LOG.with(|l| l.borrow_mut().cleaned.push(packet.sequence));
        Ok(())
    }
}

// =========================================================
// Mock Runtime
// =========================================================

frame_support::construct_runtime!(
    pub enum Runtime {
        System: frame_system,
        IbcPacket: crate,
    }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Runtime {
    type Block = frame_system::mocking::MockBlockU32<Runtime>;
    type AccountData = ();
}

parameter_types! {
    pub const MaxIdentifierLen: u32 = 64;
    pub const MaxPacketDataLen: u32 = 1024;
    pub const MaxAckLen: u32 = 256;
    pub const MaxProofLen: u32 = 1024;
}

impl Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type ChannelRegistry = MockRegistry;
    type ClientRegistry = MockRegistry;
    type ProofVerifier = MockVerifier;
    type PortAuthenticator = MockPortAuthenticator;
    type PacketModule = MockApp;
    type MaxIdentifierLen = MaxIdentifierLen;
    type MaxPacketDataLen = MaxPacketDataLen;
    type MaxAckLen = MaxAckLen;
    type MaxProofLen = MaxProofLen;
}

// =========================================================
// Test Externalities
// =========================================================

pub fn new_test_ext() -> sp_io::TestExternalities {
    let storage = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .unwrap();

    let mut ext = sp_io::TestExternalities::new(storage);
    ext.execute_with(|| System::set_block_number(1));
    ext
}

//! Lockstep sessions: bootstrap, latency compensation, and cross-peer
//! delivery agreement.

use ticksync::{
    PeerId, Protocol, RpcId, SessionConfig, SimulationConfig, SimulationEvent, SimulationSystem,
    Tick, Timestamp,
};
use ticksync_test::{app_broadcast, control_incoming, TestSession};

fn lockstep() -> SimulationConfig {
    SimulationConfig {
        system: SimulationSystem::Lockstep,
        ..Default::default()
    }
}

#[test]
fn clients_adopt_the_authority_clock() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut session = TestSession::new(lockstep(), 0, 2);
    session.run_frames(6);

    // the authority seeds its local tick 5 ahead of the start; the client
    // adopts that value through the bootstrap exchange
    let client = &session.peers[1];
    assert!(client.buffer.local_tick() >= Tick::new(105));
    assert!(client.buffer.present_tick() >= Tick::new(105));
}

#[test]
fn bootstrap_compensates_for_measured_latency() {
    let authority = PeerId::new(1);
    let mut buffer = lockstep().build();
    buffer.init_buffer(&SessionConfig {
        tick_rate: 50,
        latency: 0,
        start_tick: Tick::ZERO,
        local_id: PeerId::new(2),
        authority_id: authority,
    });
    buffer.add_tick_source(authority);

    // the bootstrap arrives 120ms after it was stamped; at 50ms per tick
    // the local clock lands 2 ticks past the authority's value
    let sent_at = Timestamp::try_now_millis().unwrap() - 120;
    buffer.add_incoming(control_incoming(
        RpcId::CUR_TICK,
        authority,
        Tick::new(500),
        sent_at,
        Protocol::Reliable,
    ));

    assert_eq!(buffer.present_tick(), Tick::new(500));
    assert_eq!(buffer.local_tick(), Tick::new(502));
}

#[test]
fn messages_queued_before_bootstrap_are_retagged() {
    let authority = PeerId::new(1);
    let local = PeerId::new(2);
    let mut buffer = lockstep().build();
    buffer.init_buffer(&SessionConfig {
        tick_rate: 50,
        latency: 0,
        start_tick: Tick::ZERO,
        local_id: local,
        authority_id: authority,
    });
    buffer.add_tick_source(authority);

    buffer.add_outgoing(app_broadcast(local, vec![1, 2, 3]));
    assert!(buffer.has_outgoing());
    // nothing leaves until the session clock is known
    assert!(buffer.try_get_next_outgoing().is_none());

    let sent_at = Timestamp::try_now_millis().unwrap();
    buffer.add_incoming(control_incoming(
        RpcId::CUR_TICK,
        authority,
        Tick::new(500),
        sent_at,
        Protocol::Reliable,
    ));

    let mut app_ticks = Vec::new();
    while let Some(message) = buffer.try_get_next_outgoing() {
        if message.rpc_id == RpcId::new(RpcId::FIRST_APP_ID) {
            app_ticks.push(message.tick);
        }
    }
    assert_eq!(app_ticks, vec![buffer.local_tick()]);
}

#[test]
fn peers_agree_on_delivery_order_and_ticks() {
    let mut session = TestSession::new(lockstep(), 0, 3);
    session.run_frames(4);

    let a = session.peers[0].id;
    let b = session.peers[1].id;
    for round in 0u8..5 {
        session
            .peer_mut(a)
            .buffer
            .add_outgoing(app_broadcast(a, vec![0, round]));
        session
            .peer_mut(b)
            .buffer
            .add_outgoing(app_broadcast(b, vec![1, round]));
        session.run_frame();
    }
    session.run_frames(15);

    // both non-senders observe the authority's messages identically
    let view = |peer: usize| -> Vec<(Tick, Vec<u8>)> {
        session.peers[peer]
            .delivered
            .iter()
            .filter(|m| m.caller == a)
            .map(|m| (m.tick, m.payload.clone()))
            .collect()
    };
    let on_b = view(1);
    let on_c = view(2);
    assert_eq!(on_b.len(), 5);
    assert_eq!(on_b, on_c);
}

#[test]
fn completed_ticks_are_reported_in_order() {
    let mut session = TestSession::new(lockstep(), 0, 2);
    session.run_frames(10);

    let mut completed = Vec::new();
    while let Some(event) = session.peers[0].buffer.poll_event() {
        if let SimulationEvent::TickComplete { tick } = event {
            completed.push(tick);
        }
    }
    assert!(!completed.is_empty());
    for window in completed.windows(2) {
        assert!(window[0] < window[1]);
    }
}

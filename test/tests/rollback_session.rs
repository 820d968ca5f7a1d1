//! Rollback sessions: optimistic delivery and the rewind/resimulation
//! lifecycle.

use ticksync::{
    PeerId, Protocol, RpcId, SessionConfig, SimulationBuffer, SimulationConfig, SimulationEvent,
    SimulationSystem, Tick,
};
use ticksync_test::{app_broadcast, control_incoming, to_incoming, TestSession};

fn rollback() -> SimulationConfig {
    SimulationConfig {
        system: SimulationSystem::Rollback,
        ..Default::default()
    }
}

#[test]
fn delivery_does_not_wait_for_agreement() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut session = TestSession::new(rollback(), 0, 2);
    session.run_frames(2);

    let a = session.peers[0].id;
    session
        .peer_mut(a)
        .buffer
        .add_outgoing(app_broadcast(a, vec![7]));
    session.run_frames(3);

    let client = &session.peers[1];
    assert!(client.delivered.iter().any(|m| m.payload == vec![7]));
}

/// Drives a rollback buffer one frame: advance the clock, then drain
/// everything it will surface.
fn drain_frame(buffer: &mut Box<dyn SimulationBuffer>) -> Vec<Vec<u8>> {
    buffer.next_tick();
    let mut payloads = Vec::new();
    while let Some(message) = buffer.try_get_next_incoming() {
        payloads.push(message.payload);
    }
    payloads
}

#[test]
fn late_cross_channel_message_resimulates() {
    let local = PeerId::new(1);
    let peer = PeerId::new(2);
    let mut buffer = rollback().build();
    buffer.init_buffer(&SessionConfig {
        tick_rate: 50,
        latency: 0,
        start_tick: Tick::new(10),
        local_id: local,
        authority_id: local,
    });
    buffer.add_tick_source(peer);
    while buffer.try_get_next_outgoing().is_some() {}

    // the peer reports tick 20 on the reliable channel only, so its
    // reliable traffic lands at 20 while unreliable traffic stays behind
    buffer.add_incoming(control_incoming(
        RpcId::NEXT_TICK,
        peer,
        Tick::new(20),
        0,
        Protocol::Reliable,
    ));
    buffer.add_incoming(to_incoming(&app_broadcast(peer, vec![1])));

    let mut delivered = Vec::new();
    for _ in 0..12 {
        delivered.extend(drain_frame(&mut buffer));
    }
    assert_eq!(delivered, vec![vec![1]]);
    assert!(buffer.present_tick() > Tick::new(20));

    // an unreliable message now lands on an already-simulated tick
    let mut late = to_incoming(&app_broadcast(peer, vec![2]));
    late.protocol = Protocol::Unreliable;
    buffer.add_incoming(late);

    assert_eq!(
        buffer.poll_event(),
        Some(SimulationEvent::ResimulationRequired {
            from: Tick::new(11)
        })
    );

    // the retained tick-20 message replays after the late one
    let replayed = drain_frame(&mut buffer);
    assert_eq!(replayed, vec![vec![2], vec![1]]);
    assert!(matches!(
        buffer.poll_event(),
        Some(SimulationEvent::ResimulationComplete {
            from,
            to
        }) if from == Tick::new(11) && to >= Tick::new(20)
    ));
}

#[test]
fn messages_outside_the_retained_window_are_not_replayed() {
    let local = PeerId::new(1);
    let peer = PeerId::new(2);
    let mut buffer = rollback().build();
    buffer.init_buffer(&SessionConfig {
        tick_rate: 50,
        latency: 0,
        start_tick: Tick::new(10),
        local_id: local,
        authority_id: local,
    });
    buffer.add_tick_source(peer);
    while buffer.try_get_next_outgoing().is_some() {}

    // deliver more ticks of traffic than the window (5 at zero latency)
    // retains, one message per tick
    for offset in 1u8..=8 {
        buffer.add_incoming(control_incoming(
            RpcId::NEXT_TICK,
            peer,
            Tick::new(11 + u32::from(offset)),
            0,
            Protocol::Reliable,
        ));
        buffer.add_incoming(to_incoming(&app_broadcast(peer, vec![offset])));
    }
    let mut delivered = Vec::new();
    for _ in 0..20 {
        delivered.extend(drain_frame(&mut buffer));
    }
    assert_eq!(delivered.len(), 8);

    // rewinding to before the window replays only what was retained
    let mut late = to_incoming(&app_broadcast(peer, vec![99]));
    late.protocol = Protocol::Unreliable;
    buffer.add_incoming(late);

    let replayed = drain_frame(&mut buffer);
    assert!(replayed.len() < 9);
    assert_eq!(replayed[0], vec![99]);
    // the oldest delivered messages fell out of history
    assert!(!replayed.contains(&vec![1]));
}

//! Snapshot sessions: following the authority's clock and the two
//! catch-up pacing policies.

use ticksync::{
    CatchupPolicy, PeerId, Protocol, RpcId, SessionConfig, SimulationBuffer, SimulationConfig,
    SimulationEvent, SimulationSystem, Tick, Timestamp,
};
use ticksync_test::{app_broadcast, control_incoming, to_incoming, TestSession};

fn snapshot(catchup: CatchupPolicy) -> SimulationConfig {
    SimulationConfig {
        system: SimulationSystem::Snapshot,
        catchup,
    }
}

#[test]
fn followers_track_the_authority_clock() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut session = TestSession::new(snapshot(CatchupPolicy::OneTickPerFrame), 0, 2);
    session.run_frames(6);

    let authority_tick = session.peers[0].buffer.local_tick();
    let follower_tick = session.peers[1].buffer.local_tick();
    assert!(follower_tick > Tick::new(100));
    // the follower only ever lags by in-flight broadcasts
    assert!(authority_tick.since(follower_tick) <= 2);
}

/// Bootstraps a follower and buffers `ticks` ticks of authority traffic,
/// one app message per tick, without consuming any of it.
fn follower_behind(catchup: CatchupPolicy, ticks: u8) -> Box<dyn SimulationBuffer> {
    let authority = PeerId::new(1);
    let mut buffer = snapshot(catchup).build();
    buffer.init_buffer(&SessionConfig {
        tick_rate: 50,
        latency: 0,
        start_tick: Tick::new(100),
        local_id: PeerId::new(2),
        authority_id: authority,
    });
    buffer.add_tick_source(authority);

    let now = Timestamp::now_millis_or_zero();
    buffer.add_incoming(control_incoming(
        RpcId::CUR_TICK,
        authority,
        Tick::new(100),
        now,
        Protocol::Reliable,
    ));

    for offset in 1..=ticks {
        buffer.add_incoming(to_incoming(&app_broadcast(authority, vec![offset])));
        let tick = Tick::new(100 + u32::from(offset));
        for protocol in [Protocol::Reliable, Protocol::Unreliable] {
            buffer.add_incoming(control_incoming(RpcId::NEXT_TICK, authority, tick, now, protocol));
        }
    }
    buffer
}

fn drain_frame(buffer: &mut Box<dyn SimulationBuffer>) -> Vec<u8> {
    buffer.next_tick();
    let mut payloads = Vec::new();
    while let Some(message) = buffer.try_get_next_incoming() {
        payloads.push(message.payload[0]);
    }
    payloads
}

#[test]
fn delivery_stops_at_one_boundary_per_frame_inside_the_window() {
    let mut buffer = follower_behind(CatchupPolicy::OneTickPerFrame, 3);

    assert_eq!(drain_frame(&mut buffer), vec![1]);
    assert_eq!(drain_frame(&mut buffer), vec![2]);
    assert_eq!(drain_frame(&mut buffer), vec![3]);
}

#[test]
fn catchup_consumes_an_extra_tick_per_frame() {
    // window is 5 at zero latency; 8 buffered ticks engage catch-up
    let mut buffer = follower_behind(CatchupPolicy::OneTickPerFrame, 8);

    let mut started = false;
    while let Some(event) = buffer.poll_event() {
        if matches!(event, SimulationEvent::CatchupStarted { .. }) {
            started = true;
        }
    }
    assert!(started);

    assert_eq!(drain_frame(&mut buffer), vec![1, 2]);
    assert_eq!(buffer.present_tick(), Tick::new(102));
}

#[test]
fn drain_policy_catches_up_in_a_single_frame() {
    let mut buffer = follower_behind(CatchupPolicy::DrainToPresent, 8);

    assert_eq!(drain_frame(&mut buffer), vec![1, 2, 3, 4, 5, 6, 7, 8]);

    let mut ended = false;
    while let Some(event) = buffer.poll_event() {
        if event == SimulationEvent::CatchupEnded {
            ended = true;
        }
    }
    assert!(ended);
}

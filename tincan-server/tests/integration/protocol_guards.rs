//! State-machine guards and tie-breaks, driven through the socketless rig
//! for determinism: malformed input, wrong-state verbs, duplicate joins,
//! racing offers, early candidates and outbox overflow.

use tincan_server::{spawn_coordinator, ServerConfig};

use crate::utils::{init_tracing, open_peer};

#[tokio::test]
async fn malformed_lines_are_dropped_and_the_connection_survives() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut peer = open_peer(&state).await;
    for line in [
        "FOO bar",
        "",
        "   ",
        "CONNECTION",
        "CONNECTION not-a-code",
        "OFFER",
    ] {
        peer.say(line).await;
    }
    peer.expect_silence().await;

    // Still alive and roomless.
    peer.say("STATE").await;
    peer.expect_line("STATE Impossible").await;
}

#[tokio::test]
async fn state_query_reports_the_room_state() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut alice = open_peer(&state).await;
    alice.say("STATE").await;
    alice.expect_line("STATE Impossible").await;

    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    let mut bob = open_peer(&state).await;
    bob.say("CONNECTION ABCD23").await;
    bob.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    bob.expect_line("STATE Ready").await;
    alice.expect_line("STATE Ready").await;

    bob.say("STATE").await;
    bob.expect_line("STATE Ready").await;
}

#[tokio::test]
async fn duplicate_connection_to_the_same_room_is_idempotent() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut alice = open_peer(&state).await;
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    // Membership did not duplicate: a second peer still fits.
    let mut bob = open_peer(&state).await;
    bob.say("CONNECTION ABCD23").await;
    bob.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    bob.expect_line("STATE Ready").await;
    alice.expect_line("STATE Ready").await;
}

#[tokio::test]
async fn connection_to_a_second_room_is_refused_but_not_fatal() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut alice = open_peer(&state).await;
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    alice.say("CONNECTION XYZ234").await;
    alice.expect_line("CONNECTION_RESPONSE ROOM_FULL").await;

    // The stray join created nothing and Alice keeps her seat.
    let stats = state.coordinator.snapshot().await.unwrap();
    assert_eq!(stats.active_rooms, 1);
    alice.say("STATE").await;
    alice.expect_line("STATE Impossible").await;
}

#[tokio::test]
async fn offers_outside_ready_are_dropped() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    // Roomless offer.
    let mut alice = open_peer(&state).await;
    alice.say("OFFER v=0").await;
    alice.expect_silence().await;

    // Solo offer: the room is still Impossible.
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;
    alice.say("OFFER v=0").await;
    alice.expect_silence().await;
}

#[tokio::test]
async fn a_racing_second_offer_is_dropped() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut alice = open_peer(&state).await;
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    let mut bob = open_peer(&state).await;
    bob.say("CONNECTION ABCD23").await;
    bob.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    bob.expect_line("STATE Ready").await;
    alice.expect_line("STATE Ready").await;

    alice.say("OFFER v=0 from-alice").await;
    alice.expect_line("STATE Creating").await;
    bob.expect_line("STATE Creating").await;
    bob.expect_line("OFFER v=0 from-alice").await;

    // Bob raced his own offer; the room is already Creating.
    bob.say("OFFER v=0 from-bob").await;
    alice.expect_silence().await;
    bob.expect_silence().await;
    bob.say("STATE").await;
    bob.expect_line("STATE Creating").await;
}

#[tokio::test]
async fn answers_outside_creating_are_dropped() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut alice = open_peer(&state).await;
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    let mut bob = open_peer(&state).await;
    bob.say("CONNECTION ABCD23").await;
    bob.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    bob.expect_line("STATE Ready").await;
    alice.expect_line("STATE Ready").await;

    // Answer with no offer in flight.
    bob.say("ANSWER v=0").await;
    alice.expect_silence().await;
    bob.say("STATE").await;
    bob.expect_line("STATE Ready").await;
}

#[tokio::test]
async fn early_ice_between_paired_members_relays_verbatim() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut alice = open_peer(&state).await;
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    // No second member yet: candidates go nowhere.
    alice.say("ICE candidate:early").await;
    alice.expect_silence().await;

    let mut bob = open_peer(&state).await;
    bob.say("CONNECTION ABCD23").await;
    bob.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    bob.expect_line("STATE Ready").await;
    alice.expect_line("STATE Ready").await;

    // Candidates ahead of either SDP still relay; WebRTC tolerates them.
    alice.say("ICE candidate:before-offer").await;
    bob.expect_line("ICE candidate:before-offer").await;
}

#[tokio::test]
async fn solo_start_call_moves_nothing() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    // Roomless: ignored outright.
    let mut alice = open_peer(&state).await;
    alice.say("START_CALL").await;
    alice.expect_silence().await;

    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    // Solo: no second member means no Active and nobody to relay to.
    alice.say("START_CALL").await;
    alice.expect_silence().await;
    alice.say("STATE").await;
    alice.expect_line("STATE Impossible").await;
}

#[tokio::test]
async fn start_call_with_a_pair_broadcasts_active_then_relays() {
    init_tracing();
    let state = spawn_coordinator(ServerConfig::default());

    let mut alice = open_peer(&state).await;
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    let mut bob = open_peer(&state).await;
    bob.say("CONNECTION ABCD23").await;
    bob.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    bob.expect_line("STATE Ready").await;
    alice.expect_line("STATE Ready").await;

    bob.say("START_CALL").await;
    bob.expect_line("STATE Active").await;
    alice.expect_line("STATE Active").await;
    alice.expect_line("START_CALL").await;
    bob.expect_silence().await;
}

#[tokio::test]
async fn an_overflowing_outbox_drops_the_peer() {
    init_tracing();
    let config = ServerConfig {
        outbox_capacity: 2,
        ..ServerConfig::default()
    };
    let state = spawn_coordinator(config);

    let mut alice = open_peer(&state).await;
    alice.say("CONNECTION ABCD23").await;
    alice.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    alice.expect_line("STATE Impossible").await;

    let mut bob = open_peer(&state).await;
    bob.say("CONNECTION ABCD23").await;
    bob.expect_line("CONNECTION_RESPONSE CONNECTED ABCD23").await;
    bob.expect_line("STATE Ready").await;
    alice.expect_line("STATE Ready").await;

    // Alice stops draining; three relays against a two-slot outbox tip her
    // over and the coordinator drops her like a closed connection.
    bob.say("ICE candidate:1").await;
    bob.say("ICE candidate:2").await;
    bob.say("ICE candidate:3").await;

    bob.expect_line("STATE Impossible").await;
    let backlog = alice.expect_dropped().await;
    assert_eq!(backlog, vec!["ICE candidate:1", "ICE candidate:2"]);

    let stats = state.coordinator.snapshot().await.unwrap();
    assert_eq!(stats.active_sessions, 1);
}

//! Actor-level room tests.
//!
//! These run real room actors on a paused tokio clock. Timer-driven
//! phase changes resolve through auto-advance: when every task is idle
//! the runtime jumps to the next pending sleep, so a full 300-second
//! discussion passes instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use wordspy_game::MemoryCatalog;
use wordspy_protocol::{
    ClientAction, Phase, PlayerId, RoomUpdate, ServerNotification, Verdict, Winner,
};
use wordspy_room::{
    ActionError, PhaseSchedule, RegistryConfig, RoomOptions, RoomRegistry,
};

type NotifyRx = mpsc::UnboundedReceiver<ServerNotification>;

fn registry() -> (RoomRegistry<MemoryCatalog>, mpsc::UnboundedReceiver<RoomUpdate>) {
    let catalog = Arc::new(MemoryCatalog::new().with_category("nature", ["volcano", "river"]));
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let registry = RoomRegistry::new(
        RegistryConfig::default(),
        PhaseSchedule::default(),
        catalog,
        updates_tx,
    );
    (registry, updates_rx)
}

fn player_channel() -> (mpsc::UnboundedSender<ServerNotification>, NotifyRx) {
    mpsc::unbounded_channel()
}

async fn wait_for(
    rx: &mut NotifyRx,
    mut pred: impl FnMut(&ServerNotification) -> bool,
) -> ServerNotification {
    loop {
        let notification = rx.recv().await.expect("notification stream ended");
        if pred(&notification) {
            return notification;
        }
    }
}

async fn wait_for_phase(rx: &mut NotifyRx, phase: Phase) -> ServerNotification {
    wait_for(rx, |n| {
        matches!(n, ServerNotification::PhaseChange { phase: p, .. } if *p == phase)
    })
    .await
}

/// Opens a 3-player room with everyone ready, returning the handle's
/// registry plus each player's notification stream.
async fn ready_room(
) -> (RoomRegistry<MemoryCatalog>, wordspy_protocol::RoomCode, Vec<NotifyRx>) {
    let (mut registry, updates_rx) = registry();
    // Keep the sync side alive for the whole test.
    std::mem::forget(updates_rx);

    let (tx1, rx1) = player_channel();
    let code = registry
        .create_room(PlayerId(1), "ana".into(), tx1, RoomOptions::default())
        .unwrap();

    let (tx2, rx2) = player_channel();
    registry.join_room(&code, PlayerId(2), "bo".into(), tx2).await.unwrap();
    let (tx3, rx3) = player_channel();
    registry.join_room(&code, PlayerId(3), "cy".into(), tx3).await.unwrap();

    let handle = registry.get(&code).unwrap().clone();
    for player in [PlayerId(1), PlayerId(2), PlayerId(3)] {
        handle.act(player, ClientAction::Ready, None).await.unwrap();
    }
    (registry, code, vec![rx1, rx2, rx3])
}

#[tokio::test(start_paused = true)]
async fn test_full_round_reaches_results_and_returns_to_waiting() {
    let (registry, code, mut rxs) = ready_room().await;
    let handle = registry.get(&code).unwrap().clone();

    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap();

    let rx = &mut rxs[2];
    wait_for(rx, |n| matches!(n, ServerNotification::GameStarted { round: 1 })).await;
    wait_for_phase(rx, Phase::RoleReveal).await;
    wait_for_phase(rx, Phase::Playing).await;
    wait_for_phase(rx, Phase::Voting).await;

    // Nobody votes; the voting timer expires into an empty tie.
    let result = wait_for(rx, |n| matches!(n, ServerNotification::GameResult { .. })).await;
    match result {
        ServerNotification::GameResult { verdict, revealed_role, winner } => {
            assert_eq!(verdict, Verdict::Tie { candidates: vec![] });
            assert_eq!(revealed_role, None);
            assert_eq!(winner, Winner::Impostor);
        }
        other => panic!("unexpected notification: {other:?}"),
    }
    wait_for_phase(rx, Phase::Results).await;
    wait_for_phase(rx, Phase::Waiting).await;

    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, Phase::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_quorum_then_unanimous_votes_finish_round_early() {
    let (registry, code, mut rxs) = ready_room().await;
    let handle = registry.get(&code).unwrap().clone();

    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap();
    wait_for_phase(&mut rxs[0], Phase::Playing).await;

    // 2 of 3 requesting is a strict majority.
    handle.act(PlayerId(1), ClientAction::RequestVoting, None).await.unwrap();
    handle.act(PlayerId(2), ClientAction::RequestVoting, None).await.unwrap();
    wait_for_phase(&mut rxs[0], Phase::Voting).await;

    handle.act(PlayerId(1), ClientAction::Vote { target: PlayerId(2) }, None).await.unwrap();
    handle.act(PlayerId(2), ClientAction::Vote { target: PlayerId(3) }, None).await.unwrap();
    handle.act(PlayerId(3), ClientAction::Vote { target: PlayerId(2) }, None).await.unwrap();

    let result =
        wait_for(&mut rxs[0], |n| matches!(n, ServerNotification::GameResult { .. })).await;
    match result {
        ServerNotification::GameResult { verdict, revealed_role, .. } => {
            assert_eq!(verdict, Verdict::Eliminated { player: PlayerId(2) });
            assert!(revealed_role.is_some(), "elimination reveals the role");
        }
        other => panic!("unexpected notification: {other:?}"),
    }

    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, Phase::Results);
}

#[tokio::test(start_paused = true)]
async fn test_role_redaction_in_pushed_snapshots() {
    let (registry, code, mut rxs) = ready_room().await;
    let handle = registry.get(&code).unwrap().clone();
    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap();

    // Each player's first in-round snapshot carries their own role and
    // the word only when their role holds it.
    for rx in rxs.iter_mut() {
        let state = wait_for(rx, |n| {
            matches!(
                n,
                ServerNotification::RoomState { snapshot } if snapshot.you.is_some()
            )
        })
        .await;
        let ServerNotification::RoomState { snapshot } = state else { unreachable!() };
        let you = snapshot.you.unwrap();
        assert_eq!(you.word.is_some(), you.role.holds_word());
        assert_eq!(you.category, "nature");
    }
}

#[tokio::test(start_paused = true)]
async fn test_vote_rejections_leave_state_untouched() {
    let (registry, code, mut rxs) = ready_room().await;
    let handle = registry.get(&code).unwrap().clone();

    // Voting before any round exists.
    let err = handle
        .act(PlayerId(1), ClientAction::Vote { target: PlayerId(2) }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::InvalidPhase { .. }));

    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap();
    wait_for_phase(&mut rxs[0], Phase::Voting).await;

    handle.act(PlayerId(1), ClientAction::Vote { target: PlayerId(2) }, None).await.unwrap();
    let err = handle
        .act(PlayerId(1), ClientAction::Vote { target: PlayerId(3) }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::AlreadyVoted(PlayerId(1))));

    let err = handle
        .act(PlayerId(2), ClientAction::Vote { target: PlayerId(2) }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::InvalidVoteTarget(PlayerId(2))));
}

#[tokio::test(start_paused = true)]
async fn test_stale_observed_version_still_applies() {
    let (registry, code, _rxs) = ready_room().await;
    let handle = registry.get(&code).unwrap().clone();

    // Wildly stale version: informational only, the action lands.
    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, Some(999))
        .await
        .unwrap();
    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, Phase::RoleReveal);
}

#[tokio::test(start_paused = true)]
async fn test_updates_stream_carries_monotonic_versions_and_close() {
    let (mut registry, mut updates_rx) = registry();

    let (tx1, _rx1) = player_channel();
    let code = registry
        .create_room(PlayerId(1), "ana".into(), tx1, RoomOptions::default())
        .unwrap();
    let (tx2, _rx2) = player_channel();
    registry.join_room(&code, PlayerId(2), "bo".into(), tx2).await.unwrap();

    let handle = registry.get(&code).unwrap().clone();
    handle.act(PlayerId(1), ClientAction::Ready, None).await.unwrap();
    handle.act(PlayerId(2), ClientAction::LeaveRoom, None).await.unwrap();
    handle.act(PlayerId(1), ClientAction::LeaveRoom, None).await.unwrap();

    let mut last_version = 0;
    let mut saw_close = false;
    while let Some(update) = updates_rx.recv().await {
        match update {
            RoomUpdate::Changed(snapshot) => {
                assert!(snapshot.version > last_version, "versions must increase");
                last_version = snapshot.version;
            }
            RoomUpdate::Closed(closed) => {
                assert_eq!(closed, code);
                saw_close = true;
                break;
            }
        }
    }
    assert!(saw_close);

    // The actor stopped; the registry reaps the dead handle.
    tokio::task::yield_now().await;
    registry.reap_closed();
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_draining_registry_rejects_creates_and_joins() {
    let (mut registry, _updates_rx) = registry();

    let (tx1, _rx1) = player_channel();
    let code = registry
        .create_room(PlayerId(1), "ana".into(), tx1, RoomOptions::default())
        .unwrap();

    registry.begin_drain();

    let (tx2, _rx2) = player_channel();
    let err = registry
        .create_room(PlayerId(2), "bo".into(), tx2, RoomOptions::default())
        .unwrap_err();
    assert!(matches!(err, ActionError::Draining));

    let (tx3, _rx3) = player_channel();
    let err = registry
        .join_room(&code, PlayerId(3), "cy".into(), tx3)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Draining));

    // Existing rooms keep working while draining.
    let handle = registry.get(&code).unwrap().clone();
    handle.act(PlayerId(1), ClientAction::Ready, None).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unknown_room_is_not_found() {
    let (mut registry, _updates_rx) = registry();
    let (tx, _rx) = player_channel();
    let err = registry
        .join_room(&wordspy_protocol::RoomCode::new("ZZZZ"), PlayerId(1), "ana".into(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::RoomNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn test_play_again_requires_fresh_ready_round() {
    let (registry, code, mut rxs) = ready_room().await;
    let handle = registry.get(&code).unwrap().clone();

    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap();
    wait_for_phase(&mut rxs[0], Phase::Voting).await;
    wait_for_phase(&mut rxs[0], Phase::Results).await;

    handle.act(PlayerId(1), ClientAction::PlayAgain, None).await.unwrap();
    wait_for_phase(&mut rxs[0], Phase::Waiting).await;

    // Everyone must ready up again before the next round.
    let err = handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::MembersNotReady));

    for player in [PlayerId(1), PlayerId(2), PlayerId(3)] {
        handle.act(player, ClientAction::Ready, None).await.unwrap();
    }
    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap();
    let started = wait_for(&mut rxs[0], |n| {
        matches!(n, ServerNotification::GameStarted { .. })
    })
    .await;
    assert!(matches!(started, ServerNotification::GameStarted { round: 2 }));
}

#[tokio::test(start_paused = true)]
async fn test_results_timer_expires_after_schedule() {
    // Sanity-check the Results duration specifically: the phase holds
    // for its full window before the lobby reset.
    let (registry, code, mut rxs) = ready_room().await;
    let handle = registry.get(&code).unwrap().clone();
    handle
        .act(PlayerId(1), ClientAction::StartGame { options: None }, None)
        .await
        .unwrap();
    wait_for_phase(&mut rxs[0], Phase::Results).await;

    tokio::time::advance(Duration::from_secs(14)).await;
    tokio::task::yield_now().await;
    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, Phase::Results);

    wait_for_phase(&mut rxs[0], Phase::Waiting).await;
}

use std::sync::Arc;
use std::time::Duration;

use one_night_engine::models::config::GameConfig;
use one_night_engine::models::role::{Faction, RoleName, NIGHT_CALL_ORDER};
use one_night_engine::services::assignment::AssignmentError;
use one_night_engine::services::night::{NightError, RoleActionSet};
use one_night_engine::services::session::{GamePhase, GameSession, SessionError};
use one_night_engine::utils::test_setup::{
    setup_test_env, test_players, CountingRegistry, FailingAction, FakeAmbience, NoopAction,
    RecordingTransport, ScriptedDm,
};

fn fast_config() -> GameConfig {
    GameConfig {
        min_players: 3,
        max_players: 10,
        table_cards: 3,
        cover_delay: Duration::from_millis(2),
        day_duration: Duration::from_millis(40),
        warning_offset: Duration::from_millis(10),
    }
}

fn noop_actions() -> RoleActionSet {
    let mut actions = RoleActionSet::new();
    for role in NIGHT_CALL_ORDER {
        actions.register(role, Arc::new(NoopAction));
    }
    actions
}

/// Three players, no werewolf in the deck, everyone votes for somebody
/// different: nobody dies and the villagers take the win.
#[tokio::test]
async fn a_full_session_runs_to_resolution() {
    setup_test_env();
    let players = test_players(3);
    let chosen = vec![
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Tanner,
        RoleName::Hunter,
        RoleName::Mason,
    ];

    let transport = Arc::new(RecordingTransport::new());
    let dm = ScriptedDm::new();
    for (player, vote) in [("1", "2"), ("2", "3"), ("3", "1")] {
        dm.script_reply(player, "ok").await; // role notification
        dm.script_reply(player, vote).await;
    }
    let registry = Arc::new(CountingRegistry::new());
    let ambience = Arc::new(FakeAmbience::default());

    let mut session = GameSession::new(
        "channel-1".to_string(),
        players,
        chosen,
        noop_actions(),
        transport.clone(),
        Arc::new(dm),
        Some(ambience.clone()),
        registry.clone(),
        Some(fast_config()),
    )
    .unwrap();

    let result = session.run().await.unwrap();

    assert_eq!(session.phase(), GamePhase::Ended);
    assert!(result.deaths.is_empty());
    assert_eq!(result.winner, Faction::Villagers);
    assert_eq!(result.votes.len(), 3);

    assert!(transport.contains("Starting new game").await);
    assert!(transport.contains("The night is over!").await);
    assert!(transport.contains("Wakeup order:").await);
    assert!(transport.contains("seconds remaining!").await);
    assert!(transport.contains("Voting overview:").await);
    assert!(transport.contains("Nobody dies!").await);
    assert!(transport.contains("team villagers").await);
    assert!(transport.contains("Roles before the night").await);
    assert_eq!(transport.structured.lock().await.len(), 1);

    assert_eq!(*ambience.starts.lock().await, 1);
    assert_eq!(*ambience.stops.lock().await, 1);
    assert_eq!(*registry.deregistered.lock().await, vec!["channel-1"]);
}

#[tokio::test]
async fn too_few_players_never_build_a_session() {
    setup_test_env();
    let err = GameSession::new(
        "channel-1".to_string(),
        test_players(2),
        vec![RoleName::Villager; 5],
        noop_actions(),
        Arc::new(RecordingTransport::new()),
        Arc::new(ScriptedDm::new()),
        None,
        Arc::new(CountingRegistry::new()),
        Some(fast_config()),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        SessionError::InvalidPlayerCount { got: 2, min: 3, .. }
    ));
}

#[tokio::test]
async fn a_bad_distribution_aborts_before_the_night() {
    setup_test_env();
    let chosen = vec![
        RoleName::Werewolf,
        RoleName::Werewolf,
        RoleName::Werewolf,
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Villager,
    ];
    let transport = Arc::new(RecordingTransport::new());
    let registry = Arc::new(CountingRegistry::new());

    let mut session = GameSession::new(
        "channel-2".to_string(),
        test_players(3),
        chosen,
        noop_actions(),
        transport.clone(),
        Arc::new(ScriptedDm::new()),
        None,
        registry.clone(),
        Some(fast_config()),
    )
    .unwrap();

    let err = session.run().await.unwrap_err();

    match err {
        SessionError::Assignment(AssignmentError::InvalidDistribution { role, count, max }) => {
            assert_eq!(role, RoleName::Werewolf);
            assert_eq!(count, 3);
            assert_eq!(max, 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(session.phase(), GamePhase::Ended);
    assert!(transport.contains("ended early").await);
    assert_eq!(registry.deregistered.lock().await.len(), 1);
}

#[tokio::test]
async fn an_unreachable_player_aborts_the_whole_session() {
    setup_test_env();
    let chosen = vec![
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Tanner,
        RoleName::Hunter,
        RoleName::Mason,
    ];
    let transport = Arc::new(RecordingTransport::new());
    let registry = Arc::new(CountingRegistry::new());

    let mut session = GameSession::new(
        "channel-3".to_string(),
        test_players(3),
        chosen,
        noop_actions(),
        transport.clone(),
        Arc::new(ScriptedDm::unreachable(&["2"])),
        None,
        registry.clone(),
        Some(fast_config()),
    )
    .unwrap();

    let err = session.run().await.unwrap_err();

    match err {
        SessionError::Night(NightError::UnreachablePlayers(tags)) => {
            assert!(tags.contains("<@2>"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(session.phase(), GamePhase::Ended);
    assert_eq!(registry.deregistered.lock().await.len(), 1);
}

#[tokio::test]
async fn a_failing_role_action_ends_the_session() {
    setup_test_env();
    // No table cards, so every chosen role is guaranteed a holder.
    let mut config = fast_config();
    config.table_cards = 0;
    let chosen = vec![RoleName::Werewolf, RoleName::Seer, RoleName::Robber];

    let mut actions = noop_actions();
    actions.register(RoleName::Werewolf, Arc::new(FailingAction));

    let transport = Arc::new(RecordingTransport::new());
    let registry = Arc::new(CountingRegistry::new());

    let mut session = GameSession::new(
        "channel-4".to_string(),
        test_players(3),
        chosen,
        actions,
        transport.clone(),
        Arc::new(ScriptedDm::new()),
        None,
        registry.clone(),
        Some(config),
    )
    .unwrap();

    let err = session.run().await.unwrap_err();

    match err {
        SessionError::Night(NightError::TurnFailed { role, .. }) => {
            assert_eq!(role, RoleName::Werewolf);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(session.phase(), GamePhase::Ended);
    assert!(transport.contains("ended early").await);
    assert_eq!(registry.deregistered.lock().await.len(), 1);
}

#[tokio::test]
async fn an_unparseable_vote_ends_the_session() {
    setup_test_env();
    let chosen = vec![
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Tanner,
        RoleName::Hunter,
        RoleName::Mason,
    ];
    let dm = ScriptedDm::new();
    for (player, vote) in [("1", "2"), ("2", "not a player"), ("3", "1")] {
        dm.script_reply(player, "ok").await;
        dm.script_reply(player, vote).await;
    }
    let registry = Arc::new(CountingRegistry::new());

    let mut session = GameSession::new(
        "channel-5".to_string(),
        test_players(3),
        chosen,
        noop_actions(),
        Arc::new(RecordingTransport::new()),
        Arc::new(dm),
        None,
        registry.clone(),
        Some(fast_config()),
    )
    .unwrap();

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidVote { .. }));
    assert_eq!(session.phase(), GamePhase::Ended);
    assert_eq!(registry.deregistered.lock().await.len(), 1);
}

#[tokio::test]
async fn a_session_cannot_run_twice() {
    setup_test_env();
    let chosen = vec![
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Villager,
        RoleName::Tanner,
        RoleName::Hunter,
        RoleName::Mason,
    ];
    let dm = ScriptedDm::new();
    for (player, vote) in [("1", "2"), ("2", "3"), ("3", "1")] {
        dm.script_reply(player, "ok").await;
        dm.script_reply(player, vote).await;
    }
    let registry = Arc::new(CountingRegistry::new());

    let mut session = GameSession::new(
        "channel-6".to_string(),
        test_players(3),
        chosen,
        noop_actions(),
        Arc::new(RecordingTransport::new()),
        Arc::new(dm),
        None,
        registry.clone(),
        Some(fast_config()),
    )
    .unwrap();

    session.run().await.unwrap();
    let err = session.run().await.unwrap_err();

    assert!(matches!(err, SessionError::AlreadyStarted));
    // The slot was freed by the first run only.
    assert_eq!(registry.deregistered.lock().await.len(), 1);
}

mod common;

use wallet_session_adapters::{DeterministicFaults, SinkNotification};
use wallet_session_core::{
    BalanceFigure, ConnectOutcome, SessionError, SessionState, StatusKind,
};

use common::{fund_primary, harness, live_block_subscriptions, primary_account};

#[tokio::test]
async fn connect_on_mainnet_binds_token_and_subscribes_once() {
    let mut h = harness();
    fund_primary(&h.wallet);

    let outcome = h.controller.connect().await;
    let ConnectOutcome::Connected(session) = outcome else {
        panic!("expected connected outcome, got {outcome:?}");
    };
    assert_eq!(session.account, primary_account());
    assert_eq!(session.chain_id, 1);
    assert!(session.is_connected);
    assert_eq!(h.controller.state(), SessionState::Connected);

    let binding = h.controller.token_binding().expect("token bound");
    assert_eq!(binding.decimals, 6);

    assert_eq!(
        h.sink.last_balances(),
        Some((
            BalanceFigure::Amount("1.2345".to_owned()),
            BalanceFigure::Amount("123.46".to_owned())
        ))
    );
    let statuses = h.sink.statuses();
    assert_eq!(
        statuses.first(),
        Some(&("Connecting...".to_owned(), StatusKind::Pending))
    );
    assert_eq!(h.sink.last_status(), Some(("Connected".to_owned(), StatusKind::Success)));
    assert_eq!(h.sink.count(|n| *n == SinkNotification::Network(1)), 1);

    let stats = h.wallet.stats().expect("stats");
    assert_eq!(stats.account_requests, 1);
    assert_eq!(stats.switch_requests, 0);
    assert_eq!(stats.decimals_calls, 1);
    assert_eq!(stats.block_subscribes, 1);
    assert_eq!(stats.block_unsubscribes, 0);
    assert_eq!(live_block_subscriptions(&h.wallet), 1);

    let path: Vec<_> = h
        .controller
        .transition_log()
        .iter()
        .map(|t| (t.from, t.to))
        .collect();
    assert_eq!(
        path,
        vec![
            (SessionState::Disconnected, SessionState::Connecting),
            (SessionState::Connecting, SessionState::ChainChecking),
            (SessionState::ChainChecking, SessionState::Connected),
        ]
    );
}

#[tokio::test]
async fn wrong_chain_is_switched_before_connecting() {
    let mut h = harness();
    h.wallet.debug_set_chain_id(137).expect("set chain");

    let outcome = h.controller.connect().await;
    assert!(outcome.is_connected(), "unexpected outcome {outcome:?}");
    assert_eq!(h.controller.session().expect("session").chain_id, 1);

    let stats = h.wallet.stats().expect("stats");
    assert_eq!(stats.switch_requests, 1);
    assert_eq!(stats.chain_id_reads, 2);
    assert!(h
        .controller
        .transition_log()
        .iter()
        .any(|t| t.to == SessionState::ChainSwitchPending));
}

#[tokio::test]
async fn chain_notification_raised_during_switch_is_applied_after_connect() {
    let mut h = harness();
    h.wallet.debug_set_chain_id(137).expect("set chain");
    assert!(h.controller.connect().await.is_connected());

    // The wallet announced the switch while the handshake was suspended.
    let tasks = h.controller.pump().await.expect("pump");
    assert!(tasks.is_empty());
    assert_eq!(h.controller.state(), SessionState::Connected);

    let stats = h.wallet.stats().expect("stats");
    assert_eq!(stats.decimals_calls, 2);
    assert_eq!(stats.block_subscribes, 2);
    assert_eq!(stats.block_unsubscribes, 1);
    assert_eq!(stats.peak_live_block_subscriptions, 1);
    assert_eq!(live_block_subscriptions(&h.wallet), 1);
}

#[tokio::test]
async fn declined_switch_reports_wrong_network() {
    let mut h = harness();
    h.wallet.debug_set_chain_id(137).expect("set chain");
    h.wallet
        .debug_set_faults(DeterministicFaults {
            reject_switch: true,
            ..DeterministicFaults::default()
        })
        .expect("set faults");

    let outcome = h.controller.connect().await;
    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(SessionError::WrongNetwork)
    ));
    assert_eq!(h.controller.state(), SessionState::Disconnected);
    assert!(h.controller.session().is_none());
    assert_eq!(
        h.sink.last_status(),
        Some(("Please switch to Ethereum Mainnet".to_owned(), StatusKind::Warning))
    );
    assert!(h.sink.last_balances().is_none());
    assert_eq!(h.wallet.stats().expect("stats").block_subscribes, 0);
}

#[tokio::test]
async fn switch_that_leaves_the_chain_unchanged_is_tried_once() {
    let mut h = harness();
    h.wallet.debug_set_chain_id(137).expect("set chain");
    h.wallet
        .debug_set_faults(DeterministicFaults {
            ignore_switch: true,
            ..DeterministicFaults::default()
        })
        .expect("set faults");

    let outcome = h.controller.connect().await;
    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(SessionError::WrongNetwork)
    ));
    let stats = h.wallet.stats().expect("stats");
    assert_eq!(stats.switch_requests, 1);
    assert_eq!(stats.block_subscribes, 0);
}

#[tokio::test]
async fn rejected_account_request_leaves_session_disconnected() {
    let mut h = harness();
    h.wallet
        .debug_set_faults(DeterministicFaults {
            reject_accounts: true,
            ..DeterministicFaults::default()
        })
        .expect("set faults");

    let outcome = h.controller.connect().await;
    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(SessionError::UserRejected)
    ));
    assert_eq!(h.controller.state(), SessionState::Disconnected);
    assert_eq!(
        h.sink.last_status(),
        Some(("Connection request rejected".to_owned(), StatusKind::Warning))
    );
    let last = h.controller.transition_log().last().expect("transition");
    assert_eq!(last.from, SessionState::Connecting);
    assert_eq!(last.to, SessionState::Disconnected);
}

#[tokio::test]
async fn empty_account_grant_counts_as_rejection() {
    let mut h = harness();
    h.wallet.debug_set_accounts(Vec::new()).expect("set accounts");

    let outcome = h.controller.connect().await;
    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(SessionError::UserRejected)
    ));
    assert_eq!(h.wallet.stats().expect("stats").chain_id_reads, 0);
}

#[tokio::test]
async fn missing_extension_fails_without_touching_the_wallet() {
    let mut h = harness();
    h.wallet.debug_set_available(false).expect("set availability");

    let outcome = h.controller.connect().await;
    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(SessionError::ExtensionMissing)
    ));
    assert_eq!(
        h.sink.last_status(),
        Some(("No wallet extension detected".to_owned(), StatusKind::Error))
    );
    assert!(h.controller.transition_log().is_empty());
    assert_eq!(h.wallet.stats().expect("stats").account_requests, 0);
}

#[tokio::test]
async fn chain_read_failure_is_reported_as_connection_failure() {
    let mut h = harness();
    h.wallet
        .debug_set_faults(DeterministicFaults {
            fail_chain_id: true,
            ..DeterministicFaults::default()
        })
        .expect("set faults");

    let outcome = h.controller.connect().await;
    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(SessionError::RpcFailure(_))
    ));
    assert_eq!(
        h.sink.last_status(),
        Some(("Connection failed".to_owned(), StatusKind::Error))
    );
    assert_eq!(h.controller.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn reconnecting_replaces_the_block_subscription() {
    let mut h = harness();
    assert!(h.controller.connect().await.is_connected());
    let first = h.controller.block_subscription().expect("first subscription");

    assert!(h.controller.connect().await.is_connected());
    let second = h.controller.block_subscription().expect("second subscription");
    assert_ne!(first, second);

    let stats = h.wallet.stats().expect("stats");
    assert_eq!(stats.block_subscribes, 2);
    assert_eq!(stats.block_unsubscribes, 1);
    assert_eq!(stats.peak_live_block_subscriptions, 1);
    // Two watchers plus the block subscription.
    assert_eq!(h.wallet.live_subscriptions().expect("live").len(), 3);
}

#[tokio::test]
async fn resume_reuses_prior_authorization_without_prompting() {
    let mut h = harness();
    fund_primary(&h.wallet);
    h.wallet.debug_authorize().expect("authorize");

    let outcome = h.controller.resume().await;
    assert!(outcome.is_connected(), "unexpected outcome {outcome:?}");
    assert_eq!(h.wallet.stats().expect("stats").account_requests, 0);
    assert_eq!(live_block_subscriptions(&h.wallet), 1);

    // Resuming an established session is a no-op.
    assert!(h.controller.resume().await.is_connected());
    assert_eq!(h.wallet.stats().expect("stats").block_subscribes, 1);
}

#[tokio::test]
async fn resume_without_authorization_is_skipped() {
    let mut h = harness();

    let outcome = h.controller.resume().await;
    assert!(matches!(outcome, ConnectOutcome::Skipped));
    assert_eq!(h.controller.state(), SessionState::Disconnected);
    assert!(h.sink.statuses().is_empty());
    assert!(h.wallet.live_subscriptions().expect("live").is_empty());
}

#[tokio::test]
async fn disconnect_releases_subscription_and_resets_presentation() {
    let mut h = harness();
    assert!(h.controller.connect().await.is_connected());

    h.controller.disconnect();
    assert_eq!(h.controller.state(), SessionState::Disconnected);
    assert!(h.controller.session().is_none());
    assert!(h.controller.token_binding().is_none());
    assert_eq!(live_block_subscriptions(&h.wallet), 0);
    assert_eq!(h.sink.count(|n| *n == SinkNotification::Reset), 1);
    assert_eq!(
        h.sink.last_status(),
        Some(("Wallet disconnected".to_owned(), StatusKind::Warning))
    );

    // A second disconnect has nothing left to release.
    h.controller.disconnect();
    assert_eq!(h.wallet.stats().expect("stats").block_unsubscribes, 1);
    assert_eq!(h.sink.count(|n| *n == SinkNotification::Reset), 1);
}

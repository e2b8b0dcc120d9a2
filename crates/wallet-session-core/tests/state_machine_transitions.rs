use wallet_session_core::{session_transition, SessionAction, SessionState};

#[test]
fn happy_path_on_required_chain() {
    let (s1, _) =
        session_transition(SessionState::Disconnected, SessionAction::Connect).expect("connect");
    assert_eq!(s1, SessionState::Connecting);
    let (s2, _) = session_transition(s1, SessionAction::AccountsGranted).expect("granted");
    assert_eq!(s2, SessionState::ChainChecking);
    let (s3, reason) = session_transition(s2, SessionAction::ChainMatched).expect("matched");
    assert_eq!(s3, SessionState::Connected);
    assert_eq!(reason, "required chain active");
}

#[test]
fn switch_path_goes_back_through_chain_checking() {
    let (s1, _) = session_transition(SessionState::ChainChecking, SessionAction::ChainMismatched)
        .expect("mismatch");
    assert_eq!(s1, SessionState::ChainSwitchPending);
    let (s2, _) = session_transition(s1, SessionAction::SwitchConfirmed).expect("confirmed");
    assert_eq!(s2, SessionState::ChainChecking);
}

#[test]
fn switch_pending_cannot_jump_to_connected() {
    let err = session_transition(SessionState::ChainSwitchPending, SessionAction::ChainMatched)
        .expect_err("must re-verify first");
    assert!(err.to_string().contains("illegal session transition"));
}

#[test]
fn connected_reacts_to_chain_and_account_changes() {
    let (s1, _) = session_transition(SessionState::Connected, SessionAction::ChainChanged)
        .expect("chain changed");
    assert_eq!(s1, SessionState::ChainChecking);
    let (s2, _) = session_transition(SessionState::Connected, SessionAction::AccountsEmptied)
        .expect("accounts emptied");
    assert_eq!(s2, SessionState::Disconnected);
}

#[test]
fn reconnect_is_allowed_from_connected() {
    let (s1, _) =
        session_transition(SessionState::Connected, SessionAction::Connect).expect("reconnect");
    assert_eq!(s1, SessionState::Connecting);
}

#[test]
fn failures_return_to_disconnected() {
    for from in [
        SessionState::Connecting,
        SessionState::ChainChecking,
        SessionState::ChainSwitchPending,
    ] {
        let (to, _) = session_transition(from, SessionAction::Fail).expect("fail");
        assert_eq!(to, SessionState::Disconnected);
    }
    session_transition(SessionState::Disconnected, SessionAction::Fail)
        .expect_err("nothing to fail from disconnected");
}

#[test]
fn disconnect_is_accepted_everywhere() {
    for from in [
        SessionState::Disconnected,
        SessionState::Connecting,
        SessionState::ChainChecking,
        SessionState::ChainSwitchPending,
        SessionState::Connected,
    ] {
        let (to, _) = session_transition(from, SessionAction::Disconnect).expect("disconnect");
        assert_eq!(to, SessionState::Disconnected);
    }
}

#[test]
fn events_only_apply_to_connected_sessions() {
    session_transition(SessionState::Disconnected, SessionAction::ChainChanged)
        .expect_err("no chain change without a session");
    session_transition(SessionState::ChainChecking, SessionAction::AccountsEmptied)
        .expect_err("no accounts emptied mid-handshake");
}

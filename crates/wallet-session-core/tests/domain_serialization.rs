use alloy::primitives::Address;
use wallet_session_core::token::{balance_of_selector, decimals_selector};
use wallet_session_core::{
    network_name, short_address, BalanceFigure, BalanceReport, PortError, ProviderEvent,
    ProviderEventKind, ProviderTopic, SessionError, SubscriptionId,
};

fn account() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid account")
}

#[test]
fn provider_event_roundtrip_serialization() {
    let event = ProviderEvent {
        sequence: 7,
        subscription: SubscriptionId(3),
        kind: ProviderEventKind::AccountsChanged(vec![account()]),
    };
    let json = serde_json::to_string(&event).expect("serialize event");
    let back: ProviderEvent = serde_json::from_str(&json).expect("deserialize event");
    assert_eq!(back, event);
    assert_eq!(back.kind.topic(), ProviderTopic::AccountsChanged);
}

#[test]
fn balance_report_serializes_unavailable_marker() {
    let report = BalanceReport {
        account: account(),
        native: BalanceFigure::Amount("1.2345".to_owned()),
        token: BalanceFigure::Unavailable,
    };
    let json = serde_json::to_string(&report).expect("serialize report");
    assert!(json.contains("1.2345"));
    assert!(json.contains("Unavailable"));
}

#[test]
fn short_address_keeps_prefix_and_suffix() {
    assert_eq!(short_address(&account()), "0x1000...0001");
}

#[test]
fn mainnet_has_a_display_name() {
    assert_eq!(network_name(1), "mainnet");
    assert_eq!(network_name(424242), "unknown");
}

#[test]
fn erc20_selectors_match_known_values() {
    assert_eq!(balance_of_selector(), [0x70, 0xa0, 0x82, 0x31]);
    assert_eq!(decimals_selector(), [0x31, 0x3c, 0xe5, 0x67]);
}

#[test]
fn provider_codes_map_to_port_errors() {
    assert!(PortError::from_provider_code(4001, "denied").is_user_rejection());
    assert!(matches!(
        PortError::from_provider_code(4902, "unknown chain"),
        PortError::Unsupported(_)
    ));
    assert!(matches!(
        PortError::from_provider_code(-32603, "internal"),
        PortError::Rpc { code: -32603, .. }
    ));
}

#[test]
fn session_errors_have_distinct_status_messages() {
    let messages = [
        SessionError::ExtensionMissing.status_message(),
        SessionError::UserRejected.status_message(),
        SessionError::WrongNetwork.status_message(),
        SessionError::RpcFailure(PortError::Transport("down".to_owned())).status_message(),
    ];
    for (i, a) in messages.iter().enumerate() {
        for b in &messages[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use serde::Serialize;

use wallet_session_core::domain::{NATIVE_SYMBOL, TOKEN_SYMBOL};
use wallet_session_core::{network_name, short_address, BalanceFigure, SessionSink, StatusKind};

/// Writes every notification to the log. Used by the headless shell.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl SessionSink for TracingSink {
    fn status_changed(&self, message: &str, kind: StatusKind) {
        match kind {
            StatusKind::Error => tracing::error!(status = message),
            StatusKind::Warning => tracing::warn!(status = message),
            StatusKind::Pending | StatusKind::Success => tracing::info!(status = message),
        }
    }

    fn connected_account_changed(&self, account: Address) {
        tracing::info!(account = %short_address(&account), "wallet account");
    }

    fn balances_updated(&self, native: &BalanceFigure, token: &BalanceFigure) {
        tracing::info!("balances: {native} {NATIVE_SYMBOL} | {token} {TOKEN_SYMBOL}");
    }

    fn extension_availability(&self, available: bool) {
        if available {
            tracing::info!("wallet extension detected");
        } else {
            tracing::warn!("wallet extension not found");
        }
    }

    fn network_changed(&self, chain_id: u64) {
        tracing::info!(chain_id, network = network_name(chain_id), "network");
    }

    fn session_reset(&self) {
        tracing::info!("session reset");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SinkNotification {
    Status { message: String, kind: StatusKind },
    Account(Address),
    Balances { native: BalanceFigure, token: BalanceFigure },
    Extension(bool),
    Network(u64),
    Reset,
}

/// Keeps every notification in order, for embedding shells that render from
/// a snapshot and for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<SinkNotification>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<SinkNotification> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.log.lock() {
            g.clear();
        }
    }

    pub fn last_balances(&self) -> Option<(BalanceFigure, BalanceFigure)> {
        self.notifications().into_iter().rev().find_map(|n| match n {
            SinkNotification::Balances { native, token } => Some((native, token)),
            _ => None,
        })
    }

    pub fn statuses(&self) -> Vec<(String, StatusKind)> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                SinkNotification::Status { message, kind } => Some((message, kind)),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<(String, StatusKind)> {
        self.statuses().pop()
    }

    pub fn count(&self, pred: impl Fn(&SinkNotification) -> bool) -> usize {
        self.notifications().iter().filter(|n| pred(n)).count()
    }

    fn push(&self, notification: SinkNotification) {
        if let Ok(mut g) = self.log.lock() {
            g.push(notification);
        }
    }
}

impl SessionSink for RecordingSink {
    fn status_changed(&self, message: &str, kind: StatusKind) {
        self.push(SinkNotification::Status {
            message: message.to_owned(),
            kind,
        });
    }

    fn connected_account_changed(&self, account: Address) {
        self.push(SinkNotification::Account(account));
    }

    fn balances_updated(&self, native: &BalanceFigure, token: &BalanceFigure) {
        self.push(SinkNotification::Balances {
            native: native.clone(),
            token: token.clone(),
        });
    }

    fn extension_availability(&self, available: bool) {
        self.push(SinkNotification::Extension(available));
    }

    fn network_changed(&self, chain_id: u64) {
        self.push(SinkNotification::Network(chain_id));
    }

    fn session_reset(&self) {
        self.push(SinkNotification::Reset);
    }
}

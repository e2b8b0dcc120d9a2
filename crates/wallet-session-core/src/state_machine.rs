use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TimestampMs;
use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    ChainChecking,
    ChainSwitchPending,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    Connect,
    AccountsGranted,
    ChainMatched,
    ChainMismatched,
    SwitchConfirmed,
    ChainChanged,
    AccountsEmptied,
    Fail,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub reason: &'static str,
    pub at_ms: TimestampMs,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal session transition: {from:?} --{action:?}-->")]
pub struct TransitionError {
    pub from: SessionState,
    pub action: SessionAction,
}

/// Why a connect attempt did not reach `Connected`.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("no wallet extension detected")]
    ExtensionMissing,
    #[error("request rejected in wallet")]
    UserRejected,
    #[error("wallet is not on Ethereum Mainnet")]
    WrongNetwork,
    #[error("wallet rpc failed: {0}")]
    RpcFailure(PortError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl SessionError {
    /// Text shown to the user for a failed attempt.
    pub fn status_message(&self) -> &'static str {
        match self {
            Self::ExtensionMissing => "No wallet extension detected",
            Self::UserRejected => "Connection request rejected",
            Self::WrongNetwork => "Please switch to Ethereum Mainnet",
            Self::RpcFailure(_) | Self::Transition(_) => "Connection failed",
        }
    }
}

pub fn session_transition(
    from: SessionState,
    action: SessionAction,
) -> Result<(SessionState, &'static str), TransitionError> {
    use SessionAction as A;
    use SessionState as S;

    let next = match (from, action) {
        (S::Disconnected | S::Connected, A::Connect) => (S::Connecting, "connect requested"),
        (S::Connecting, A::AccountsGranted) => (S::ChainChecking, "accounts granted"),
        (S::ChainChecking, A::ChainMatched) => (S::Connected, "required chain active"),
        (S::ChainChecking, A::ChainMismatched) => (S::ChainSwitchPending, "chain switch requested"),
        (S::ChainSwitchPending, A::SwitchConfirmed) => (S::ChainChecking, "chain switch confirmed"),
        (S::Connected, A::ChainChanged) => (S::ChainChecking, "chain changed"),
        (S::Connected, A::AccountsEmptied) => (S::Disconnected, "accounts emptied"),
        (S::Connecting | S::ChainChecking | S::ChainSwitchPending, A::Fail) => {
            (S::Disconnected, "connect attempt failed")
        }
        (_, A::Disconnect) => (S::Disconnected, "disconnected"),
        _ => return Err(TransitionError { from, action }),
    };
    Ok(next)
}

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BalanceFigure, ProviderEvent, ProviderTopic, StatusKind, SubscriptionId};

#[derive(Debug, Clone, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("user rejected request: {0}")]
    UserRejected(String),
    #[error("unsupported request: {0}")]
    Unsupported(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
}

impl PortError {
    /// Maps an EIP-1193 provider error object onto the port taxonomy.
    pub fn from_provider_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            4001 => Self::UserRejected(message),
            4100 => Self::Unavailable(format!("unauthorized: {message}")),
            4200 | 4902 => Self::Unsupported(message),
            4900 | 4901 => Self::Unavailable(format!("disconnected: {message}")),
            _ => Self::Rpc { code, message },
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected(_))
    }
}

/// The injected wallet transport.
#[async_trait(?Send)]
pub trait ProviderPort {
    fn is_available(&self) -> bool;
    async fn request_accounts(&self) -> Result<Vec<Address>, PortError>;
    async fn accounts(&self) -> Result<Vec<Address>, PortError>;
    async fn chain_id(&self) -> Result<u64, PortError>;
    async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError>;
    async fn get_balance(&self, account: Address) -> Result<U256, PortError>;
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, PortError>;
    fn subscribe(&self, topic: ProviderTopic) -> Result<SubscriptionId, PortError>;
    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), PortError>;
    /// Drains queued notifications. Polling transports also check for new
    /// blocks here.
    async fn poll_events(&self) -> Result<Vec<ProviderEvent>, PortError>;
}

#[async_trait(?Send)]
pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
    async fn sleep_ms(&self, ms: u64);
}

/// Presentation collaborator. Never read from.
pub trait SessionSink {
    fn status_changed(&self, message: &str, kind: StatusKind);
    fn connected_account_changed(&self, account: Address);
    fn balances_updated(&self, native: &BalanceFigure, token: &BalanceFigure);
    fn extension_availability(&self, available: bool);
    fn network_changed(&self, chain_id: u64);
    fn session_reset(&self);
}

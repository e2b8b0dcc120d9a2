use std::fmt;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// The only chain a session is allowed to run on (Ethereum mainnet).
pub const REQUIRED_CHAIN_ID: u64 = 1;

/// Tether USD on mainnet. Decimals are still read from the contract on every
/// session establishment.
pub const TOKEN_ADDRESS: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
pub const TOKEN_SYMBOL: &str = "USDT";

pub const NATIVE_SYMBOL: &str = "ETH";
pub const NATIVE_DECIMALS: u8 = 18;
pub const NATIVE_DISPLAY_PLACES: usize = 4;
pub const TOKEN_DISPLAY_PLACES: usize = 2;

/// Extensions may inject themselves after page load; presence is polled this long.
pub const PRESENCE_TIMEOUT_MS: u64 = 1_000;
pub const PRESENCE_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account: Address,
    pub chain_id: u64,
    pub is_connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBinding {
    pub contract: Address,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderTopic {
    NewBlocks,
    AccountsChanged,
    ChainChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEventKind {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    NewBlock(u64),
}

impl ProviderEventKind {
    pub fn topic(&self) -> ProviderTopic {
        match self {
            Self::AccountsChanged(_) => ProviderTopic::AccountsChanged,
            Self::ChainChanged(_) => ProviderTopic::ChainChanged,
            Self::NewBlock(_) => ProviderTopic::NewBlocks,
        }
    }
}

/// A notification delivered on a live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub sequence: u64,
    pub subscription: SubscriptionId,
    pub kind: ProviderEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Pending,
    Success,
    Warning,
    Error,
}

/// One displayed balance. A failed read shows as `Unavailable` until a later
/// refresh succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceFigure {
    Amount(String),
    Unavailable,
}

impl BalanceFigure {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Amount(_))
    }
}

impl fmt::Display for BalanceFigure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount(amount) => f.write_str(amount),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub account: Address,
    pub native: BalanceFigure,
    pub token: BalanceFigure,
}

/// `0x1234...abcd` form of an address. Presentation only.
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub fn network_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "mainnet",
        11155111 => "sepolia",
        17000 => "holesky",
        _ => "unknown",
    }
}

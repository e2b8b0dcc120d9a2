//! Wallet session core: the connection state machine, balance refresh and the
//! ports it drives.

pub mod balance;
pub mod controller;
pub mod domain;
pub mod ports;
pub mod state_machine;
pub mod token;

pub use balance::{format_units_rounded, BalanceRefresher, RefreshTask, SessionEpoch};
pub use controller::{ConnectOutcome, SessionController};
pub use domain::{
    network_name, short_address, BalanceFigure, BalanceReport, ProviderEvent, ProviderEventKind,
    ProviderTopic, Session, StatusKind, SubscriptionId, TimestampMs, TokenBinding,
    REQUIRED_CHAIN_ID, TOKEN_ADDRESS,
};
pub use ports::{ClockPort, PortError, ProviderPort, SessionSink};
pub use state_machine::{
    session_transition, SessionAction, SessionError, SessionState, StateTransition,
    TransitionError,
};
pub use token::TokenContractView;

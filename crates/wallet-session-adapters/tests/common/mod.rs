#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use wallet_session_adapters::{Eip1193Adapter, RecordingSink};
use wallet_session_core::{ClockPort, PortError, ProviderTopic, SessionController};

const EPOCH_MS: u64 = 1_739_750_400_000;

/// Virtual clock: sleeping advances time instantly.
#[derive(Debug, Clone, Default)]
pub struct TestClock {
    elapsed: Arc<AtomicU64>,
}

impl TestClock {
    pub fn slept_ms(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(EPOCH_MS + self.elapsed.load(Ordering::SeqCst))
    }

    async fn sleep_ms(&self, ms: u64) {
        self.elapsed.fetch_add(ms, Ordering::SeqCst);
    }
}

pub type TestController = SessionController<Eip1193Adapter, RecordingSink, TestClock>;

pub struct Harness {
    pub controller: TestController,
    pub wallet: Eip1193Adapter,
    pub sink: RecordingSink,
    pub clock: TestClock,
}

pub fn harness() -> Harness {
    harness_with(Eip1193Adapter::deterministic())
}

pub fn harness_with(wallet: Eip1193Adapter) -> Harness {
    let sink = RecordingSink::new();
    let clock = TestClock::default();
    let controller = SessionController::new(wallet.clone(), sink.clone(), clock.clone());
    Harness {
        controller,
        wallet,
        sink,
        clock,
    }
}

pub fn primary_account() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid primary account")
}

pub fn second_account() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid second account")
}

pub fn units(raw: &str) -> U256 {
    U256::from_str_radix(raw, 10).expect("valid decimal amount")
}

/// 1.2345 ETH and 123.456789 USDT (6 decimals).
pub fn fund_primary(wallet: &Eip1193Adapter) {
    wallet
        .debug_set_native_balance(primary_account(), units("1234500000000000000"))
        .expect("set native balance");
    wallet
        .debug_set_token_balance(primary_account(), units("123456789"))
        .expect("set token balance");
}

pub fn live_block_subscriptions(wallet: &Eip1193Adapter) -> usize {
    wallet
        .live_subscriptions()
        .expect("live subscriptions")
        .iter()
        .filter(|(_, topic)| *topic == ProviderTopic::NewBlocks)
        .count()
}

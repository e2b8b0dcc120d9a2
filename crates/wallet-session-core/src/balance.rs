use std::cell::Cell;
use std::rc::Rc;

use alloy::primitives::{Address, U256};

use crate::domain::{
    BalanceFigure, BalanceReport, TokenBinding, NATIVE_DECIMALS, NATIVE_DISPLAY_PLACES,
    TOKEN_DISPLAY_PLACES,
};
use crate::ports::{ProviderPort, SessionSink};
use crate::token::TokenContractView;

/// Renders `raw / 10^decimals` rounded half-up to `places` fractional digits.
///
/// Works on the decimal digits of `raw`, so no precision is lost for any
/// `U256` amount or any `decimals` value.
pub fn format_units_rounded(raw: U256, decimals: u8, places: usize) -> String {
    let decimals = usize::from(decimals);
    let mut digits = raw.to_string();
    if digits.len() <= decimals {
        digits = format!("{}{digits}", "0".repeat(decimals + 1 - digits.len()));
    }
    let (int_part, frac_part) = digits.split_at(digits.len() - decimals);
    let frac: Vec<u8> = frac_part.bytes().map(|b| b - b'0').collect();

    let mut kept: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    kept.extend((0..places).map(|i| frac.get(i).copied().unwrap_or(0)));

    if frac.get(places).is_some_and(|d| *d >= 5) {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, 1);
                break;
            }
            i -= 1;
            if kept[i] == 9 {
                kept[i] = 0;
            } else {
                kept[i] += 1;
                break;
            }
        }
    }

    let int_len = kept.len() - places;
    let render = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    if places == 0 {
        render(&kept)
    } else {
        format!("{}.{}", render(&kept[..int_len]), render(&kept[int_len..]))
    }
}

pub fn format_native(raw: U256) -> String {
    format_units_rounded(raw, NATIVE_DECIMALS, NATIVE_DISPLAY_PLACES)
}

pub fn format_token(raw: U256, binding: &TokenBinding) -> String {
    format_units_rounded(raw, binding.decimals, TOKEN_DISPLAY_PLACES)
}

/// Pulls both balances for an account and pushes them to the sink.
///
/// The two reads are independent: a failure in one shows up as
/// [`BalanceFigure::Unavailable`] for that figure only. Nothing is retried
/// here; the next block's refresh is the retry.
#[derive(Debug, Clone)]
pub struct BalanceRefresher<P, S> {
    provider: P,
    sink: S,
}

impl<P, S> BalanceRefresher<P, S>
where
    P: ProviderPort + Clone,
    S: SessionSink,
{
    pub fn new(provider: P, sink: S) -> Self {
        Self { provider, sink }
    }

    pub async fn native_figure(&self, account: Address) -> BalanceFigure {
        match self.provider.get_balance(account).await {
            Ok(raw) => BalanceFigure::Amount(format_native(raw)),
            Err(e) => {
                tracing::warn!(%account, error = %e, "native balance read failed");
                BalanceFigure::Unavailable
            }
        }
    }

    pub async fn token_figure(
        &self,
        account: Address,
        binding: Option<&TokenBinding>,
    ) -> BalanceFigure {
        let Some(binding) = binding else {
            tracing::debug!(%account, "token not bound; token figure unavailable");
            return BalanceFigure::Unavailable;
        };
        let view = TokenContractView::new(self.provider.clone(), binding.contract);
        match view.balance_of(account).await {
            Ok(raw) => BalanceFigure::Amount(format_token(raw, binding)),
            Err(e) => {
                tracing::warn!(%account, contract = %binding.contract, error = %e, "token balance read failed");
                BalanceFigure::Unavailable
            }
        }
    }

    /// Reads both figures without touching the sink.
    pub async fn fetch(&self, account: Address, binding: Option<&TokenBinding>) -> BalanceReport {
        let native = self.native_figure(account).await;
        let token = self.token_figure(account, binding).await;
        BalanceReport {
            account,
            native,
            token,
        }
    }

    pub fn publish(&self, report: &BalanceReport) {
        self.sink.balances_updated(&report.native, &report.token);
    }

    pub async fn refresh(&self, account: Address, binding: Option<&TokenBinding>) -> BalanceReport {
        let report = self.fetch(account, binding).await;
        self.publish(&report);
        report
    }
}

/// Generation counter shared between the controller and its refresh tasks.
/// Advanced whenever the session's account, chain or existence changes; a
/// task stamped with an older generation must not publish.
#[derive(Debug, Clone, Default)]
pub struct SessionEpoch(Rc<Cell<u64>>);

impl SessionEpoch {
    pub fn current(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self) {
        self.0.set(self.0.get().wrapping_add(1));
    }
}

/// A detached per-block refresh. Holds everything it needs by value so the
/// driver can spawn it without borrowing the controller. Overlapping tasks of
/// one session are allowed and the sink keeps whichever finishes last; a task
/// that outlives its session publishes nothing.
#[derive(Debug, Clone)]
pub struct RefreshTask<P, S> {
    refresher: BalanceRefresher<P, S>,
    account: Address,
    binding: Option<TokenBinding>,
    block: Option<u64>,
    epoch: SessionEpoch,
    issued: u64,
}

impl<P, S> RefreshTask<P, S>
where
    P: ProviderPort + Clone,
    S: SessionSink,
{
    pub fn new(
        refresher: BalanceRefresher<P, S>,
        account: Address,
        binding: Option<TokenBinding>,
        block: Option<u64>,
        epoch: SessionEpoch,
    ) -> Self {
        let issued = epoch.current();
        Self {
            refresher,
            account,
            binding,
            block,
            epoch,
            issued,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn block(&self) -> Option<u64> {
        self.block
    }

    /// `None` when the session moved on while the reads were in flight.
    pub async fn run(self) -> Option<BalanceReport> {
        tracing::debug!(account = %self.account, block = ?self.block, "refreshing balances");
        let report = self
            .refresher
            .fetch(self.account, self.binding.as_ref())
            .await;
        if self.epoch.current() != self.issued {
            tracing::debug!(
                account = %self.account,
                block = ?self.block,
                issued = self.issued,
                current = self.epoch.current(),
                "discarding refresh from a superseded session"
            );
            return None;
        }
        self.refresher.publish(&report);
        Some(report)
    }
}

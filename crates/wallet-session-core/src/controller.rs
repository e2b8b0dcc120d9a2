use alloy::primitives::Address;

use crate::balance::{BalanceRefresher, RefreshTask, SessionEpoch};
use crate::domain::{
    short_address, ProviderEvent, ProviderEventKind, ProviderTopic, Session, StatusKind,
    SubscriptionId, TimestampMs, TokenBinding, PRESENCE_POLL_INTERVAL_MS, PRESENCE_TIMEOUT_MS,
    REQUIRED_CHAIN_ID, TOKEN_ADDRESS,
};
use crate::ports::{ClockPort, PortError, ProviderPort, SessionSink};
use crate::state_machine::{
    session_transition, SessionAction, SessionError, SessionState, StateTransition,
    TransitionError,
};
use crate::token::TokenContractView;

const TRANSITION_LOG_LIMIT: usize = 256;

#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Connected(Session),
    /// Resume found no prior authorization; nothing was attempted.
    Skipped,
    Failed(SessionError),
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// Owns the wallet session and everything hanging off it: the token binding,
/// the single block subscription and the account/chain watchers.
///
/// Every operation takes `&mut self`, so a notification can never be handled
/// while a connect is suspended on an RPC. Notifications that arrive in the
/// meantime stay queued in the provider and are applied by the next
/// [`SessionController::pump`], against whatever state the connect left.
pub struct SessionController<P, S, C> {
    provider: P,
    sink: S,
    clock: C,
    state: SessionState,
    session: Option<Session>,
    token: Option<TokenBinding>,
    block_subscription: Option<SubscriptionId>,
    watchers: Vec<SubscriptionId>,
    transitions: Vec<StateTransition>,
    epoch: SessionEpoch,
}

impl<P, S, C> SessionController<P, S, C>
where
    P: ProviderPort + Clone,
    S: SessionSink + Clone,
    C: ClockPort,
{
    pub fn new(provider: P, sink: S, clock: C) -> Self {
        Self {
            provider,
            sink,
            clock,
            state: SessionState::Disconnected,
            session: None,
            token: None,
            block_subscription: None,
            watchers: Vec::new(),
            transitions: Vec::new(),
            epoch: SessionEpoch::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<Session> {
        self.session
    }

    pub fn token_binding(&self) -> Option<TokenBinding> {
        self.token
    }

    pub fn block_subscription(&self) -> Option<SubscriptionId> {
        self.block_subscription
    }

    pub fn transition_log(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Waits up to [`PRESENCE_TIMEOUT_MS`] for the extension to show up.
    pub async fn detect_extension(&self) -> bool {
        let mut waited = 0;
        let available = loop {
            if self.provider.is_available() {
                break true;
            }
            if waited >= PRESENCE_TIMEOUT_MS {
                break false;
            }
            self.clock.sleep_ms(PRESENCE_POLL_INTERVAL_MS).await;
            waited += PRESENCE_POLL_INTERVAL_MS;
        };
        tracing::info!(available, waited_ms = waited, "wallet extension presence checked");
        self.sink.extension_availability(available);
        available
    }

    /// Runs the full handshake. Failures come back in the outcome and leave the
    /// controller `Disconnected`.
    pub async fn connect(&mut self) -> ConnectOutcome {
        match self.try_connect().await {
            Ok(session) => ConnectOutcome::Connected(session),
            Err(e) => self.abort(e),
        }
    }

    /// Re-establishes a session the wallet already authorized, without
    /// prompting.
    pub async fn resume(&mut self) -> ConnectOutcome {
        if let (SessionState::Connected, Some(session)) = (self.state, self.session) {
            return ConnectOutcome::Connected(session);
        }
        if !self.provider.is_available() {
            return self.abort(SessionError::ExtensionMissing);
        }
        let accounts = match self.provider.accounts().await {
            Ok(accounts) => accounts,
            Err(e) => return self.abort(SessionError::RpcFailure(e)),
        };
        let Some(account) = accounts.first().copied() else {
            tracing::debug!("no previously authorized account; staying disconnected");
            return ConnectOutcome::Skipped;
        };
        tracing::info!(account = %account, "resuming authorized session");
        match self.resume_with(account).await {
            Ok(session) => ConnectOutcome::Connected(session),
            Err(e) => self.abort(e),
        }
    }

    pub fn disconnect(&mut self) {
        self.epoch.advance();
        self.release_block_subscription();
        if self.state == SessionState::Disconnected && self.session.is_none() {
            return;
        }
        self.session = None;
        self.token = None;
        self.advance_or_log(SessionAction::Disconnect);
        self.sink.session_reset();
        self.sink.status_changed("Wallet disconnected", StatusKind::Warning);
    }

    /// Disconnects and detaches the account/chain watchers.
    pub fn teardown(&mut self) {
        self.disconnect();
        for id in self.watchers.drain(..) {
            if let Err(e) = self.provider.unsubscribe(id) {
                tracing::warn!(subscription = %id, error = %e, "failed to release watcher");
            }
        }
        tracing::info!("session controller torn down");
    }

    /// Applies queued provider notifications in order. Block notifications
    /// become refresh tasks for the caller to spawn.
    pub async fn pump(&mut self) -> Result<Vec<RefreshTask<P, S>>, PortError> {
        let mut events = self.provider.poll_events().await?;
        events.sort_by_key(|event| event.sequence);
        let mut tasks = Vec::new();
        for event in events {
            if let Some(task) = self.handle_event(event).await {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    pub async fn handle_event(&mut self, event: ProviderEvent) -> Option<RefreshTask<P, S>> {
        let topic = event.kind.topic();
        let live = match topic {
            ProviderTopic::NewBlocks => self.block_subscription == Some(event.subscription),
            ProviderTopic::AccountsChanged | ProviderTopic::ChainChanged => {
                self.watchers.contains(&event.subscription)
            }
        };
        if !live {
            tracing::debug!(
                subscription = %event.subscription,
                sequence = event.sequence,
                "dropping event from released subscription"
            );
            return None;
        }

        match event.kind {
            ProviderEventKind::NewBlock(number) => self.on_new_block(number).await,
            ProviderEventKind::AccountsChanged(accounts) => {
                self.on_accounts_changed(&accounts).await;
                None
            }
            ProviderEventKind::ChainChanged(chain_id) => {
                self.on_chain_changed(chain_id).await;
                None
            }
        }
    }

    async fn on_new_block(&mut self, number: u64) -> Option<RefreshTask<P, S>> {
        let session = self.session.filter(|_| self.state == SessionState::Connected)?;
        if self.token.is_none() {
            // The bind failed at connect time; each block retries it.
            self.token = self.bind_token().await;
        }
        Some(RefreshTask::new(
            self.refresher(),
            session.account,
            self.token,
            Some(number),
            self.epoch.clone(),
        ))
    }

    async fn on_accounts_changed(&mut self, accounts: &[Address]) {
        if self.state != SessionState::Connected {
            tracing::debug!(state = ?self.state, "ignoring accounts change without a session");
            return;
        }
        self.epoch.advance();
        match accounts.first().copied() {
            None => {
                tracing::info!("wallet revoked all accounts; tearing session down");
                self.release_block_subscription();
                self.session = None;
                self.token = None;
                self.advance_or_log(SessionAction::AccountsEmptied);
                self.sink.session_reset();
                self.sink.status_changed("Wallet disconnected", StatusKind::Warning);
            }
            Some(account) => {
                if let Some(session) = self.session.as_mut() {
                    session.account = account;
                }
                tracing::info!(account = %short_address(&account), "active account changed");
                self.sink.connected_account_changed(account);
                self.refresher().refresh(account, self.token.as_ref()).await;
            }
        }
    }

    async fn on_chain_changed(&mut self, chain_id: u64) {
        let Some(session) = self.session.filter(|_| self.state == SessionState::Connected) else {
            tracing::debug!(chain_id, state = ?self.state, "ignoring chain change without a session");
            return;
        };
        tracing::info!(from = session.chain_id, to = chain_id, "chain changed; re-establishing session");
        self.epoch.advance();
        self.release_block_subscription();
        self.token = None;

        if let Err(e) = self.reestablish(session.account).await {
            self.abort(e);
        }
    }

    async fn reestablish(&mut self, account: Address) -> Result<Session, SessionError> {
        self.advance(SessionAction::ChainChanged)?;
        self.establish(account).await
    }

    async fn resume_with(&mut self, account: Address) -> Result<Session, SessionError> {
        self.install_watchers();
        self.advance(SessionAction::Connect)?;
        self.advance(SessionAction::AccountsGranted)?;
        self.establish(account).await
    }

    async fn try_connect(&mut self) -> Result<Session, SessionError> {
        if !self.provider.is_available() {
            return Err(SessionError::ExtensionMissing);
        }
        self.install_watchers();
        self.advance(SessionAction::Connect)?;
        self.sink.status_changed("Connecting...", StatusKind::Pending);

        let accounts = self.provider.request_accounts().await.map_err(|e| {
            if e.is_user_rejection() {
                tracing::info!(error = %e, "account access rejected");
                SessionError::UserRejected
            } else {
                SessionError::RpcFailure(e)
            }
        })?;
        let account = accounts
            .first()
            .copied()
            .ok_or(SessionError::UserRejected)?;
        self.advance(SessionAction::AccountsGranted)?;
        self.establish(account).await
    }

    /// Chain check, optional switch, then entry into `Connected`. Expects to
    /// be called in `ChainChecking`.
    async fn establish(&mut self, account: Address) -> Result<Session, SessionError> {
        let mut switch_attempted = false;
        loop {
            let chain_id = self
                .provider
                .chain_id()
                .await
                .map_err(SessionError::RpcFailure)?;
            if chain_id == REQUIRED_CHAIN_ID {
                self.advance(SessionAction::ChainMatched)?;
                return Ok(self.enter_connected(account, chain_id).await);
            }
            if switch_attempted {
                tracing::warn!(chain_id, "wallet confirmed the switch but is still on another chain");
                return Err(SessionError::WrongNetwork);
            }

            self.advance(SessionAction::ChainMismatched)?;
            tracing::info!(chain_id, required = REQUIRED_CHAIN_ID, "requesting chain switch");
            self.provider
                .switch_chain(REQUIRED_CHAIN_ID)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, "chain switch failed");
                    SessionError::WrongNetwork
                })?;
            self.advance(SessionAction::SwitchConfirmed)?;
            switch_attempted = true;
        }
    }

    async fn enter_connected(&mut self, account: Address, chain_id: u64) -> Session {
        self.epoch.advance();
        self.release_block_subscription();
        self.token = self.bind_token().await;

        let session = Session {
            account,
            chain_id,
            is_connected: true,
        };
        self.session = Some(session);
        tracing::info!(account = %short_address(&account), chain_id, "wallet session established");
        self.sink.network_changed(chain_id);
        self.sink.connected_account_changed(account);
        self.sink.status_changed("Connected", StatusKind::Success);

        self.refresher().refresh(account, self.token.as_ref()).await;

        match self.provider.subscribe(ProviderTopic::NewBlocks) {
            Ok(id) => {
                tracing::debug!(subscription = %id, "block subscription installed");
                self.block_subscription = Some(id);
            }
            Err(e) => {
                tracing::warn!(error = %e, "block subscription failed; balances will not auto-refresh");
                self.sink
                    .status_changed("Live balance updates unavailable", StatusKind::Warning);
            }
        }
        session
    }

    async fn bind_token(&self) -> Option<TokenBinding> {
        let view = TokenContractView::new(self.provider.clone(), TOKEN_ADDRESS);
        match view.bind().await {
            Ok(binding) => {
                tracing::debug!(contract = %binding.contract, decimals = binding.decimals, "token bound");
                Some(binding)
            }
            Err(e) => {
                tracing::warn!(contract = %TOKEN_ADDRESS, error = %e, "token decimals read failed");
                None
            }
        }
    }

    fn abort(&mut self, err: SessionError) -> ConnectOutcome {
        match &err {
            SessionError::RpcFailure(cause) => {
                tracing::warn!(error = %cause, state = ?self.state, "connect aborted on rpc failure")
            }
            other => tracing::info!(reason = %other, state = ?self.state, "connect aborted"),
        }
        let had_session = self.session.take().is_some();
        self.epoch.advance();
        self.release_block_subscription();
        self.token = None;
        match self.state {
            SessionState::Disconnected => {}
            SessionState::Connected => self.advance_or_log(SessionAction::Disconnect),
            _ => self.advance_or_log(SessionAction::Fail),
        }
        if had_session {
            self.sink.session_reset();
        }
        let kind = match err {
            SessionError::UserRejected | SessionError::WrongNetwork => StatusKind::Warning,
            _ => StatusKind::Error,
        };
        self.sink.status_changed(err.status_message(), kind);
        ConnectOutcome::Failed(err)
    }

    fn install_watchers(&mut self) {
        if !self.watchers.is_empty() {
            return;
        }
        for topic in [ProviderTopic::AccountsChanged, ProviderTopic::ChainChanged] {
            match self.provider.subscribe(topic) {
                Ok(id) => self.watchers.push(id),
                Err(e) => tracing::warn!(?topic, error = %e, "failed to watch wallet notifications"),
            }
        }
    }

    fn release_block_subscription(&mut self) {
        if let Some(id) = self.block_subscription.take() {
            tracing::debug!(subscription = %id, "releasing block subscription");
            if let Err(e) = self.provider.unsubscribe(id) {
                tracing::warn!(subscription = %id, error = %e, "block unsubscribe failed");
            }
        }
    }

    fn refresher(&self) -> BalanceRefresher<P, S> {
        BalanceRefresher::new(self.provider.clone(), self.sink.clone())
    }

    fn advance(&mut self, action: SessionAction) -> Result<(), TransitionError> {
        let (to, reason) = session_transition(self.state, action)?;
        let at_ms = TimestampMs(self.clock.now_ms().unwrap_or_default());
        tracing::debug!(from = ?self.state, ?to, reason, "session transition");
        if self.transitions.len() == TRANSITION_LOG_LIMIT {
            self.transitions.remove(0);
        }
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            reason,
            at_ms,
        });
        self.state = to;
        Ok(())
    }

    fn advance_or_log(&mut self, action: SessionAction) {
        if let Err(e) = self.advance(action) {
            tracing::error!(error = %e, "unexpected session transition");
        }
    }
}

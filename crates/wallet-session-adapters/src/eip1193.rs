use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use alloy::primitives::{address, Address, Bytes, U256};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use wallet_session_core::token::{balance_of_selector, decimals_selector, decode_balance_of_owner};
use wallet_session_core::{
    PortError, ProviderEvent, ProviderEventKind, ProviderPort, ProviderTopic, SubscriptionId,
    TOKEN_ADDRESS,
};

use crate::SessionConfig;

#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
    #[cfg(target_arch = "wasm32")]
    hooks: Arc<Mutex<BrowserHooks>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

/// Call counters kept in every mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub account_requests: u64,
    pub chain_id_reads: u64,
    pub switch_requests: u64,
    pub native_balance_reads: u64,
    pub decimals_calls: u64,
    pub balance_of_calls: u64,
    pub block_subscribes: u64,
    pub block_unsubscribes: u64,
    pub peak_live_block_subscriptions: usize,
}

/// Failure switches for the deterministic wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeterministicFaults {
    pub reject_accounts: bool,
    pub reject_switch: bool,
    /// Report a successful switch without actually changing chain.
    pub ignore_switch: bool,
    pub fail_chain_id: bool,
    pub fail_native_balance: bool,
    pub fail_token_balance: bool,
    pub fail_decimals: bool,
}

/// In-memory wallet used when no real transport is configured.
#[derive(Debug, Clone)]
struct DeterministicWallet {
    available: bool,
    presence_delay_probes: u32,
    authorized: bool,
    accounts: Vec<Address>,
    chain_id: u64,
    block_number: u64,
    token_contract: Address,
    token_decimals: u8,
    native_balances: HashMap<Address, U256>,
    token_balances: HashMap<Address, U256>,
    faults: DeterministicFaults,
}

impl Default for DeterministicWallet {
    fn default() -> Self {
        Self {
            available: true,
            presence_delay_probes: 0,
            authorized: false,
            accounts: vec![address!("1000000000000000000000000000000000000001")],
            chain_id: 1,
            block_number: 0,
            token_contract: TOKEN_ADDRESS,
            token_decimals: 6,
            native_balances: HashMap::new(),
            token_balances: HashMap::new(),
            faults: DeterministicFaults::default(),
        }
    }
}

impl DeterministicWallet {
    fn probe_presence(&mut self) -> bool {
        if !self.available {
            return false;
        }
        if self.presence_delay_probes > 0 {
            self.presence_delay_probes -= 1;
            return false;
        }
        true
    }

    fn answer_call(&self, to: Address, data: &[u8]) -> Result<Bytes, PortError> {
        if to != self.token_contract {
            return Err(PortError::Rpc {
                code: -32000,
                message: "execution reverted".to_owned(),
            });
        }
        match selector_of(data) {
            Some(sel) if sel == decimals_selector() => {
                if self.faults.fail_decimals {
                    return Err(PortError::Transport("simulated decimals failure".to_owned()));
                }
                Ok(abi_word(U256::from(self.token_decimals)))
            }
            Some(sel) if sel == balance_of_selector() => {
                if self.faults.fail_token_balance {
                    return Err(PortError::Transport(
                        "simulated token balance failure".to_owned(),
                    ));
                }
                let owner = decode_balance_of_owner(data)?;
                let balance = self.token_balances.get(&owner).copied().unwrap_or_default();
                Ok(abi_word(balance))
            }
            _ => Err(PortError::Rpc {
                code: -32000,
                message: "execution reverted: unknown selector".to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ProviderState {
    next_subscription: u64,
    subscriptions: BTreeMap<SubscriptionId, ProviderTopic>,
    event_seq: u64,
    events: Vec<ProviderEvent>,
    last_block: Option<u64>,
    observed_accounts: Option<Vec<Address>>,
    observed_chain: Option<u64>,
    stats: ProviderStats,
    wallet: DeterministicWallet,
}

impl ProviderState {
    fn push_event(&mut self, subscription: SubscriptionId, kind: ProviderEventKind) {
        self.event_seq = self.event_seq.saturating_add(1);
        let sequence = self.event_seq;
        self.events.push(ProviderEvent {
            sequence,
            subscription,
            kind,
        });
    }

    /// Delivers one event per live subscription on the event's topic.
    fn emit(&mut self, kind: ProviderEventKind) {
        let topic = kind.topic();
        let targets: Vec<SubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, t)| **t == topic)
            .map(|(id, _)| *id)
            .collect();
        for subscription in targets {
            self.push_event(subscription, kind.clone());
        }
    }

    fn has_topic(&self, topic: ProviderTopic) -> bool {
        self.subscriptions.values().any(|t| *t == topic)
    }

    fn live_block_subscriptions(&self) -> usize {
        self.subscriptions
            .values()
            .filter(|t| **t == ProviderTopic::NewBlocks)
            .count()
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug)]
struct BrowserHook {
    event: &'static str,
    callback: wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>,
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
struct BrowserHooks {
    hooks: HashMap<SubscriptionId, BrowserHook>,
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(SessionConfig::from_env())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: SessionConfig) -> Self {
        // In the browser the extension may inject itself late, so presence is
        // checked per call rather than fixed here.
        #[cfg(target_arch = "wasm32")]
        let mode = {
            let _ = &config;
            ProviderMode::Browser
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.eip1193_proxy_url {
            let timeout = std::time::Duration::from_millis(config.rpc_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) => {
                    if config.strict_runtime_required() {
                        ProviderMode::Disabled(format!(
                            "failed to initialize EIP-1193 proxy client in production profile: {e}"
                        ))
                    } else {
                        tracing::warn!(error = %e, "proxy client init failed; using deterministic wallet");
                        ProviderMode::Deterministic
                    }
                }
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 proxy URL not configured in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic
        };

        Self::from_mode(mode)
    }

    /// In-memory wallet regardless of configuration.
    pub fn deterministic() -> Self {
        Self::from_mode(ProviderMode::Deterministic)
    }

    fn from_mode(mode: ProviderMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
            #[cfg(target_arch = "wasm32")]
            hooks: Arc::new(Mutex::new(BrowserHooks::default())),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            ProviderMode::Disabled(_) => "disabled",
            ProviderMode::Deterministic => "deterministic",
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => "proxy",
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => "browser",
        }
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Unavailable(reason.clone()));
        }
        Ok(())
    }

    fn is_deterministic(&self) -> bool {
        matches!(self.mode, ProviderMode::Deterministic)
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut ProviderState) -> Result<T, PortError>,
    ) -> Result<T, PortError> {
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))?;
        f(&mut g)
    }

    pub fn stats(&self) -> Result<ProviderStats, PortError> {
        self.with_state(|s| Ok(s.stats.clone()))
    }

    pub fn live_subscriptions(&self) -> Result<Vec<(SubscriptionId, ProviderTopic)>, PortError> {
        self.with_state(|s| Ok(s.subscriptions.iter().map(|(id, t)| (*id, *t)).collect()))
    }

    pub fn debug_set_available(&self, available: bool) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.available = available;
            Ok(())
        })
    }

    /// The next `probes` presence checks report the extension as missing.
    pub fn debug_delay_presence(&self, probes: u32) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.presence_delay_probes = probes;
            Ok(())
        })
    }

    /// Marks the wallet as having already granted account access.
    pub fn debug_authorize(&self) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.authorized = true;
            Ok(())
        })
    }

    pub fn debug_set_accounts(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.accounts = accounts;
            Ok(())
        })
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.accounts = accounts.clone();
            s.emit(ProviderEventKind::AccountsChanged(accounts));
            Ok(())
        })
    }

    pub fn debug_set_chain_id(&self, chain_id: u64) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.chain_id = chain_id;
            Ok(())
        })
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.chain_id = chain_id;
            s.emit(ProviderEventKind::ChainChanged(chain_id));
            Ok(())
        })
    }

    pub fn debug_set_native_balance(&self, account: Address, raw: U256) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.native_balances.insert(account, raw);
            Ok(())
        })
    }

    pub fn debug_set_token_balance(&self, account: Address, raw: U256) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.token_balances.insert(account, raw);
            Ok(())
        })
    }

    pub fn debug_set_token_decimals(&self, decimals: u8) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.token_decimals = decimals;
            Ok(())
        })
    }

    pub fn debug_set_faults(&self, faults: DeterministicFaults) -> Result<(), PortError> {
        self.with_state(|s| {
            s.wallet.faults = faults;
            Ok(())
        })
    }

    /// Advances the chain by one block and notifies block subscribers.
    pub fn debug_mine_block(&self) -> Result<u64, PortError> {
        self.with_state(|s| {
            s.wallet.block_number = s.wallet.block_number.saturating_add(1);
            let number = s.wallet.block_number;
            s.emit(ProviderEventKind::NewBlock(number));
            Ok(number)
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        match &self.mode {
            ProviderMode::Disabled(reason) => Err(PortError::Unavailable(reason.clone())),
            ProviderMode::Deterministic => Err(PortError::NotImplemented(
                "deterministic wallet has no rpc transport",
            )),
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => proxy_call(proxy, method, params).await,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => wasm_request(method, params).await,
        }
    }

    async fn poll_block_number(&self) -> Result<(), PortError> {
        if !self.with_state(|s| Ok(s.has_topic(ProviderTopic::NewBlocks)))? {
            return Ok(());
        }
        let number = json_quantity_to_u64(&self.request("eth_blockNumber", Value::Array(vec![])).await?)?;
        self.with_state(|s| {
            match s.last_block {
                Some(last) if number > last => {
                    s.last_block = Some(number);
                    s.emit(ProviderEventKind::NewBlock(number));
                }
                Some(_) => {}
                None => s.last_block = Some(number),
            }
            Ok(())
        })
    }

    /// The proxy transport cannot push, so account and chain changes are
    /// detected by comparing against the last values seen.
    #[cfg(not(target_arch = "wasm32"))]
    async fn poll_proxy_notifications(&self) -> Result<(), PortError> {
        self.poll_block_number().await?;
        let (watch_accounts, watch_chain) = self.with_state(|s| {
            Ok((
                s.has_topic(ProviderTopic::AccountsChanged),
                s.has_topic(ProviderTopic::ChainChanged),
            ))
        })?;

        if watch_accounts {
            let accounts = parse_accounts(&self.request("eth_accounts", Value::Array(vec![])).await?)?;
            self.with_state(|s| {
                if s.observed_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                    s.emit(ProviderEventKind::AccountsChanged(accounts.clone()));
                }
                s.observed_accounts = Some(accounts);
                Ok(())
            })?;
        }
        if watch_chain {
            let chain_id = json_quantity_to_u64(&self.request("eth_chainId", Value::Array(vec![])).await?)?;
            self.with_state(|s| {
                if s.observed_chain.is_some_and(|prev| prev != chain_id) {
                    s.emit(ProviderEventKind::ChainChanged(chain_id));
                }
                s.observed_chain = Some(chain_id);
                Ok(())
            })?;
        }
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn register_browser_hook(
        &self,
        id: SubscriptionId,
        topic: ProviderTopic,
    ) -> Result<(), PortError> {
        use wasm_bindgen::{closure::Closure, JsCast, JsValue};

        let event = match topic {
            ProviderTopic::AccountsChanged => "accountsChanged",
            ProviderTopic::ChainChanged => "chainChanged",
            ProviderTopic::NewBlocks => return Ok(()),
        };
        let provider = browser_provider()?;
        let on_fn = get_function(&provider, "on").or_else(|_| get_function(&provider, "addListener"))?;

        let state = Arc::clone(&self.state);
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let kind = match topic {
                ProviderTopic::AccountsChanged => ProviderEventKind::AccountsChanged(js_accounts(&value)),
                ProviderTopic::ChainChanged => match js_chain_id_to_u64(value) {
                    Ok(chain_id) => ProviderEventKind::ChainChanged(chain_id),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping chainChanged with unreadable chain id");
                        return;
                    }
                },
                ProviderTopic::NewBlocks => return,
            };
            match state.lock() {
                Ok(mut g) => g.push_event(id, kind),
                Err(e) => tracing::warn!(?topic, error = %e, "provider state poisoned; wallet notification lost"),
            }
        });

        on_fn
            .call2(&provider, &JsValue::from_str(event), callback.as_ref().unchecked_ref())
            .map_err(|e| PortError::Transport(format!("register {event} failed: {e:?}")))?;

        let mut hooks = self
            .hooks
            .lock()
            .map_err(|e| PortError::Transport(format!("provider hooks lock poisoned: {e}")))?;
        hooks.hooks.insert(id, BrowserHook { event, callback });
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn remove_browser_hook(&self, id: SubscriptionId) -> Result<(), PortError> {
        use wasm_bindgen::{JsCast, JsValue};

        let hook = {
            let mut hooks = self
                .hooks
                .lock()
                .map_err(|e| PortError::Transport(format!("provider hooks lock poisoned: {e}")))?;
            hooks.hooks.remove(&id)
        };
        let Some(hook) = hook else {
            return Ok(());
        };
        let provider = browser_provider()?;
        let off_fn = get_function(&provider, "removeListener")?;
        off_fn
            .call2(
                &provider,
                &JsValue::from_str(hook.event),
                hook.callback.as_ref().unchecked_ref(),
            )
            .map_err(|e| PortError::Transport(format!("remove {} listener failed: {e:?}", hook.event)))?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl ProviderPort for Eip1193Adapter {
    fn is_available(&self) -> bool {
        match &self.mode {
            ProviderMode::Disabled(_) => false,
            ProviderMode::Deterministic => self
                .with_state(|s| Ok(s.wallet.probe_presence()))
                .unwrap_or(false),
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => true,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser_provider().is_ok(),
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        self.with_state(|s| {
            s.stats.account_requests += 1;
            Ok(())
        })?;

        if self.is_deterministic() {
            return self.with_state(|s| {
                if s.wallet.faults.reject_accounts {
                    return Err(PortError::UserRejected(
                        "user rejected account access".to_owned(),
                    ));
                }
                s.wallet.authorized = true;
                Ok(s.wallet.accounts.clone())
            });
        }

        let result = self
            .request("eth_requestAccounts", Value::Array(vec![]))
            .await?;
        let accounts = parse_accounts(&result)?;
        self.with_state(|s| {
            s.observed_accounts = Some(accounts.clone());
            Ok(())
        })?;
        Ok(accounts)
    }

    async fn accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        if self.is_deterministic() {
            return self.with_state(|s| {
                Ok(if s.wallet.authorized {
                    s.wallet.accounts.clone()
                } else {
                    Vec::new()
                })
            });
        }

        let accounts = parse_accounts(&self.request("eth_accounts", Value::Array(vec![])).await?)?;
        self.with_state(|s| {
            s.observed_accounts = Some(accounts.clone());
            Ok(())
        })?;
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        self.check_mode()?;
        self.with_state(|s| {
            s.stats.chain_id_reads += 1;
            Ok(())
        })?;

        if self.is_deterministic() {
            return self.with_state(|s| {
                if s.wallet.faults.fail_chain_id {
                    return Err(PortError::Transport("simulated chain id failure".to_owned()));
                }
                Ok(s.wallet.chain_id)
            });
        }

        let chain_id = json_quantity_to_u64(&self.request("eth_chainId", Value::Array(vec![])).await?)?;
        self.with_state(|s| {
            s.observed_chain = Some(chain_id);
            Ok(())
        })?;
        Ok(chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError> {
        self.check_mode()?;
        self.with_state(|s| {
            s.stats.switch_requests += 1;
            Ok(())
        })?;

        if self.is_deterministic() {
            return self.with_state(|s| {
                if s.wallet.faults.reject_switch {
                    return Err(PortError::UserRejected(
                        "user rejected chain switch".to_owned(),
                    ));
                }
                if s.wallet.faults.ignore_switch {
                    return Ok(());
                }
                if s.wallet.chain_id != chain_id {
                    s.wallet.chain_id = chain_id;
                    s.emit(ProviderEventKind::ChainChanged(chain_id));
                }
                Ok(())
            });
        }

        let params = serde_json::json!([{ "chainId": format!("0x{chain_id:x}") }]);
        self.request("wallet_switchEthereumChain", params).await?;
        Ok(())
    }

    async fn get_balance(&self, account: Address) -> Result<U256, PortError> {
        self.check_mode()?;
        self.with_state(|s| {
            s.stats.native_balance_reads += 1;
            Ok(())
        })?;

        if self.is_deterministic() {
            return self.with_state(|s| {
                if s.wallet.faults.fail_native_balance {
                    return Err(PortError::Transport(
                        "simulated native balance failure".to_owned(),
                    ));
                }
                Ok(s.wallet
                    .native_balances
                    .get(&account)
                    .copied()
                    .unwrap_or_default())
            });
        }

        let params = serde_json::json!([account.to_string(), "latest"]);
        parse_quantity(&self.request("eth_getBalance", params).await?)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, PortError> {
        self.check_mode()?;
        let selector = selector_of(&data);
        self.with_state(|s| {
            match selector {
                Some(sel) if sel == decimals_selector() => s.stats.decimals_calls += 1,
                Some(sel) if sel == balance_of_selector() => s.stats.balance_of_calls += 1,
                _ => {}
            }
            Ok(())
        })?;

        if self.is_deterministic() {
            return self.with_state(|s| s.wallet.answer_call(to, &data));
        }

        let params = serde_json::json!([
            {
                "to": to.to_string(),
                "data": format!("0x{}", alloy::hex::encode(&data)),
            },
            "latest"
        ]);
        let result = self.request("eth_call", params).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| PortError::Validation("eth_call result must be hex string".to_owned()))?;
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid eth_call result: {e}")))
    }

    fn subscribe(&self, topic: ProviderTopic) -> Result<SubscriptionId, PortError> {
        self.check_mode()?;
        let id = self.with_state(|s| {
            s.next_subscription = s.next_subscription.saturating_add(1);
            let id = SubscriptionId(s.next_subscription);
            s.subscriptions.insert(id, topic);
            if topic == ProviderTopic::NewBlocks {
                s.stats.block_subscribes += 1;
                s.stats.peak_live_block_subscriptions = s
                    .stats
                    .peak_live_block_subscriptions
                    .max(s.live_block_subscriptions());
                s.last_block = None;
            }
            Ok(id)
        })?;

        #[cfg(target_arch = "wasm32")]
        if let Err(e) = self.register_browser_hook(id, topic) {
            self.with_state(|s| {
                s.subscriptions.remove(&id);
                Ok(())
            })?;
            return Err(e);
        }

        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), PortError> {
        self.with_state(|s| {
            let topic = s
                .subscriptions
                .remove(&id)
                .ok_or_else(|| PortError::Validation(format!("unknown subscription {id}")))?;
            if topic == ProviderTopic::NewBlocks {
                s.stats.block_unsubscribes += 1;
            }
            s.events.retain(|event| event.subscription != id);
            Ok(())
        })?;

        #[cfg(target_arch = "wasm32")]
        self.remove_browser_hook(id)?;

        Ok(())
    }

    async fn poll_events(&self) -> Result<Vec<ProviderEvent>, PortError> {
        self.check_mode()?;

        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ProviderMode::Proxy(_)) {
            self.poll_proxy_notifications().await?;
        }

        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            self.poll_block_number().await?;
        }

        self.with_state(|s| Ok(std::mem::take(&mut s.events)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn proxy_call(proxy: &ProxyRuntime, method: &str, params: Value) -> Result<Value, PortError> {
    let payload = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });
    let response = proxy
        .client
        .post(&proxy.base_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| PortError::Transport(format!("eip1193 proxy request failed: {e}")))?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| PortError::Transport(format!("eip1193 proxy json decode failed: {e}")))?;
    if let Some(err) = body.get("error") {
        return Err(provider_error(err));
    }
    if !status.is_success() {
        return Err(PortError::Transport(format!(
            "eip1193 proxy status {}: {}",
            status, body
        )));
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| PortError::Transport("eip1193 proxy missing result".to_owned()))
}

fn provider_error(err: &Value) -> PortError {
    let code = err.get("code").and_then(Value::as_i64).unwrap_or(-32603);
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown provider error");
    PortError::from_provider_code(code, message)
}

fn selector_of(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4).and_then(|s| s.try_into().ok())
}

fn abi_word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

fn parse_accounts(value: &Value) -> Result<Vec<Address>, PortError> {
    let arr = value
        .as_array()
        .ok_or_else(|| PortError::Transport("accounts result must be array".to_owned()))?;
    let mut accounts = Vec::with_capacity(arr.len());
    for item in arr {
        let raw = item
            .as_str()
            .ok_or_else(|| PortError::Transport("account item must be string".to_owned()))?;
        let parsed: Address = raw
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))?;
        accounts.push(parsed);
    }
    Ok(accounts)
}

fn parse_quantity(value: &Value) -> Result<U256, PortError> {
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Validation("quantity must be hex string".to_owned()))?;
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| PortError::Validation(format!("quantity missing 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| PortError::Validation(format!("invalid quantity {raw}: {e}")))
}

fn json_quantity_to_u64(value: &Value) -> Result<u64, PortError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| PortError::Validation("quantity must be string or number".to_owned()))?;
    parse_u64_str(s)
}

fn parse_u64_str(raw: &str) -> Result<u64, PortError> {
    if raw.starts_with("0x") || raw.starts_with("0X") {
        u64::from_str_radix(raw.trim_start_matches("0x").trim_start_matches("0X"), 16)
            .map_err(|e| PortError::Validation(format!("invalid hex quantity: {e}")))
    } else {
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid quantity: {e}")))
    }
}

/// JS hands chain ids over as doubles; only exact non-negative integers count.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn chain_id_from_f64(num: f64) -> Result<u64, PortError> {
    if !num.is_finite() || num < 0.0 || num.fract() != 0.0 || num >= u64::MAX as f64 {
        return Err(PortError::Validation(format!("invalid chain id: {num}")));
    }
    Ok(num as u64)
}

#[cfg(target_arch = "wasm32")]
async fn wasm_request(method: &str, params: Value) -> Result<Value, PortError> {
    use wasm_bindgen::JsCast;

    let provider = browser_provider()?;
    let request_fn = get_function(&provider, "request")?;

    let request = serde_json::json!({
        "method": method,
        "params": params,
    });
    let request_js = serde_wasm_bindgen::to_value(&request)
        .map_err(|e| PortError::Transport(format!("failed to encode wasm request: {e}")))?;
    let promise_js = request_fn
        .call1(&provider, &request_js)
        .map_err(|e| PortError::Transport(format!("provider request dispatch failed: {e:?}")))?;
    let promise = promise_js
        .dyn_into::<js_sys::Promise>()
        .map_err(|_| PortError::Transport("provider request did not return Promise".to_owned()))?;
    let result_js = wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(js_provider_error)?;
    if result_js.is_null() || result_js.is_undefined() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(result_js)
        .map_err(|e| PortError::Transport(format!("failed to decode wasm response: {e}")))
}

#[cfg(target_arch = "wasm32")]
fn js_provider_error(err: wasm_bindgen::JsValue) -> PortError {
    let code = get_prop(&err, "code").ok().and_then(|v| v.as_f64());
    let message = get_prop(&err, "message")
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    match code {
        Some(code) => PortError::from_provider_code(code as i64, message),
        None => PortError::Transport(format!("provider request rejected: {message}")),
    }
}

#[cfg(target_arch = "wasm32")]
fn browser_provider() -> Result<wasm_bindgen::JsValue, PortError> {
    let window =
        web_sys::window().ok_or_else(|| PortError::Unavailable("missing window".to_owned()))?;
    let provider = get_prop(&window.into(), "ethereum")?;
    if provider.is_null() || provider.is_undefined() {
        return Err(PortError::Unavailable("window.ethereum missing".to_owned()));
    }
    Ok(provider)
}

#[cfg(target_arch = "wasm32")]
fn get_prop(target: &wasm_bindgen::JsValue, key: &str) -> Result<wasm_bindgen::JsValue, PortError> {
    js_sys::Reflect::get(target, &wasm_bindgen::JsValue::from_str(key))
        .map_err(|e| PortError::Transport(format!("read provider property {key} failed: {e:?}")))
}

#[cfg(target_arch = "wasm32")]
fn get_function(target: &wasm_bindgen::JsValue, key: &str) -> Result<js_sys::Function, PortError> {
    use wasm_bindgen::JsCast;

    get_prop(target, key)?
        .dyn_into::<js_sys::Function>()
        .map_err(|_| PortError::Unsupported(format!("provider does not expose {key}")))
}

#[cfg(target_arch = "wasm32")]
fn js_accounts(value: &wasm_bindgen::JsValue) -> Vec<Address> {
    if !js_sys::Array::is_array(value) {
        return Vec::new();
    }
    js_sys::Array::from(value)
        .iter()
        .filter_map(|item| item.as_string())
        .filter_map(|raw| raw.parse::<Address>().ok())
        .collect()
}

#[cfg(target_arch = "wasm32")]
fn js_chain_id_to_u64(value: wasm_bindgen::JsValue) -> Result<u64, PortError> {
    if let Some(s) = value.as_string() {
        return parse_u64_str(&s);
    }
    if let Some(num) = value.as_f64() {
        return chain_id_from_f64(num);
    }
    Err(PortError::Validation("invalid JS chain id".to_owned()))
}

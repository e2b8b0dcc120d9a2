#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProfile {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub profile: RuntimeProfile,
    pub eip1193_proxy_url: Option<String>,
    pub rpc_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile: RuntimeProfile::Development,
            eip1193_proxy_url: None,
            rpc_timeout_ms: 15_000,
            poll_interval_ms: 4_000,
        }
    }
}

impl SessionConfig {
    /// Reads `WALLET_SESSION_*` overrides. Unset or unparsable values keep
    /// their defaults; in the browser nothing is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(profile) = std::env::var("WALLET_SESSION_PROFILE") {
            config.profile = match profile.trim().to_ascii_lowercase().as_str() {
                "production" | "prod" => RuntimeProfile::Production,
                _ => RuntimeProfile::Development,
            };
        }
        if let Ok(url) = std::env::var("WALLET_SESSION_PROXY_URL") {
            let url = url.trim();
            if !url.is_empty() {
                config.eip1193_proxy_url = Some(url.to_owned());
            }
        }
        if let Some(ms) = env_u64("WALLET_SESSION_RPC_TIMEOUT_MS") {
            config.rpc_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("WALLET_SESSION_POLL_INTERVAL_MS") {
            config.poll_interval_ms = ms.max(1);
        }
        config
    }

    /// Production refuses to fall back to the deterministic wallet.
    pub fn strict_runtime_required(&self) -> bool {
        self.profile == RuntimeProfile::Production
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring malformed config value");
            None
        }
    }
}

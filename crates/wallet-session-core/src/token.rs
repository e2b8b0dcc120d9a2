//! Read-only view over the tracked ERC-20 contract.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::TokenBinding;
use crate::ports::{PortError, ProviderPort};

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

#[derive(Debug, Clone)]
pub struct TokenContractView<P> {
    provider: P,
    contract: Address,
}

impl<P: ProviderPort> TokenContractView<P> {
    pub fn new(provider: P, contract: Address) -> Self {
        Self { provider, contract }
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, PortError> {
        let data = IERC20::balanceOfCall { owner }.abi_encode();
        let raw = self.provider.call(self.contract, Bytes::from(data)).await?;
        let decoded = IERC20::balanceOfCall::abi_decode_returns(&raw, true)
            .map_err(|e| PortError::Validation(format!("balanceOf returned malformed data: {e}")))?;
        Ok(decoded._0)
    }

    pub async fn decimals(&self) -> Result<u8, PortError> {
        let data = IERC20::decimalsCall {}.abi_encode();
        let raw = self.provider.call(self.contract, Bytes::from(data)).await?;
        let decoded = IERC20::decimalsCall::abi_decode_returns(&raw, true)
            .map_err(|e| PortError::Validation(format!("decimals returned malformed data: {e}")))?;
        Ok(decoded._0)
    }

    /// Reads `decimals()` once and freezes it into a binding for the session.
    pub async fn bind(&self) -> Result<TokenBinding, PortError> {
        let decimals = self.decimals().await?;
        Ok(TokenBinding {
            contract: self.contract,
            decimals,
        })
    }
}

/// Selector of `balanceOf(address)`; transports that answer `eth_call`
/// locally dispatch on it.
pub fn balance_of_selector() -> [u8; 4] {
    IERC20::balanceOfCall::SELECTOR
}

pub fn decimals_selector() -> [u8; 4] {
    IERC20::decimalsCall::SELECTOR
}

/// Decodes the `owner` argument of an encoded `balanceOf` call.
pub fn decode_balance_of_owner(data: &[u8]) -> Result<Address, PortError> {
    IERC20::balanceOfCall::abi_decode(data, true)
        .map(|call| call.owner)
        .map_err(|e| PortError::Validation(format!("malformed balanceOf call: {e}")))
}

//! Follow-on bridge transfer.
//!
//! Once the widget has funded the source wallet, the wallet forwards the
//! funds through the bridge service: create a swap, make sure the bridge may
//! pull the token, then send the bridge's deposit transaction.

use std::sync::Arc;
use std::time::Duration;

use chain_eth::chains::{get_chain_by_routing_id, EvmChain};
use chain_eth::erc20::{decode_uint256, encode_allowance, encode_approve};
use chain_eth::{parse_address, to_checksum_address, EthError};
use router_api::{RouterError, SwapRequest, SwapService};
use tracing::{debug, info, warn};

use crate::amount::Amount;
use crate::config::{DepositConfig, ForwardSettings};
use crate::error::DepositError;
use crate::signer::{EvmCall, EvmSender, SignerError};

/// Transactions sent for one follow-on transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardReceipt {
    /// Bridge contract the funds were sent to.
    pub deposit_address: String,
    /// Present when the allowance had to be raised first.
    pub approval_tx: Option<String>,
    pub tx_hash: String,
}

pub struct Forwarder {
    swaps: Arc<dyn SwapService>,
    sender: Arc<dyn EvmSender>,
    settings: ForwardSettings,
    chain: &'static EvmChain,
    token: String,
    decimals: u8,
    timeout: Duration,
}

impl Forwarder {
    /// Forwards the configured source asset, which must be a token on a
    /// known EVM chain.
    pub fn new(
        swaps: Arc<dyn SwapService>,
        sender: Arc<dyn EvmSender>,
        config: &DepositConfig,
    ) -> Result<Self, DepositError> {
        let source = &config.source_asset;
        let chain = get_chain_by_routing_id(&source.chain_id).ok_or_else(|| {
            DepositError::Config(format!("source chain {} is not an EVM chain", source.chain_id))
        })?;
        let token = parse_address(&source.denom)
            .map(|bytes| to_checksum_address(&bytes))
            .map_err(|e| DepositError::Config(format!("source token {}: {e}", source.denom)))?;

        Ok(Self {
            swaps,
            sender,
            settings: config.forward.clone(),
            chain,
            token,
            decimals: config.source_decimals,
            timeout: Duration::from_millis(config.forward.swap_api.request_timeout_ms),
        })
    }

    /// The wallet that receives the deposit and sends it on.
    pub fn wallet(&self) -> String {
        self.sender.address()
    }

    pub async fn forward(
        &self,
        amount: Amount,
        destination: &str,
    ) -> Result<ForwardReceipt, DepositError> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(DepositError::MissingDestinationAddress);
        }

        let owner = self.sender.address();
        let human = amount.to_decimal_string(self.decimals);
        let request = SwapRequest {
            source_network: self.settings.source_network.clone(),
            destination_network: self.settings.destination_network.clone(),
            amount: human
                .parse()
                .map_err(|e| DepositError::InvalidAmount(format!("{human}: {e}")))?,
            source_token: self.settings.source_token.clone(),
            destination_token: self.settings.destination_token.clone(),
            source_address: owner.clone(),
            destination_address: destination.to_string(),
        };
        info!(
            network = %request.destination_network,
            amount = %human,
            "creating bridge swap"
        );

        let response = match tokio::time::timeout(self.timeout, self.swaps.create_swap(&request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(swap_error(e)),
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, "swap request timed out");
                return Err(DepositError::FollowOnTransfer(format!(
                    "bridge service gave no answer within {timeout_ms}ms"
                )));
            }
        };

        let action = response.first_action().map_err(swap_error)?;
        let target = parse_address(&action.to_address)
            .map(|bytes| to_checksum_address(&bytes))
            .map_err(|e| DepositError::FollowOnTransfer(format!("bridge deposit address: {e}")))?;
        let call_data = decode_call_data(&action.call_data)?;

        let units = amount.base_units();
        let allowance = self.allowance(&owner, &target).await?;
        let approval_tx = if allowance < units {
            debug!(%allowance, needed = %units, "raising bridge allowance");
            let data = encode_approve(&target, units).map_err(eth_error)?;
            let hash = self.send(self.call_to(&self.token, data, None)).await?;
            info!(tx = %hash, "bridge allowance approved");
            Some(hash)
        } else {
            debug!(%allowance, "allowance already covers the amount");
            None
        };

        let tx_hash = self
            .send(self.call_to(&target, call_data, Some(self.settings.gas_limit)))
            .await?;
        info!(chain = self.chain.name, tx = %tx_hash, "bridge deposit sent");

        Ok(ForwardReceipt {
            deposit_address: target,
            approval_tx,
            tx_hash,
        })
    }

    async fn allowance(&self, owner: &str, spender: &str) -> Result<u128, DepositError> {
        let data = encode_allowance(owner, spender).map_err(eth_error)?;
        let raw = self
            .sender
            .call(&self.call_to(&self.token, data, None))
            .await
            .map_err(sender_error)?;
        decode_uint256(&raw).map_err(eth_error)
    }

    async fn send(&self, call: EvmCall) -> Result<String, DepositError> {
        self.sender.send_transaction(&call).await.map_err(sender_error)
    }

    fn call_to(&self, to: &str, data: Vec<u8>, gas_limit: Option<u64>) -> EvmCall {
        EvmCall {
            chain_id: self.chain.chain_id,
            to: to.to_string(),
            data,
            gas_limit,
        }
    }
}

fn decode_call_data(text: &str) -> Result<Vec<u8>, DepositError> {
    let body = text.trim().trim_start_matches("0x");
    let data = hex::decode(body)
        .map_err(|e| DepositError::FollowOnTransfer(format!("bridge call data: {e}")))?;
    if data.is_empty() {
        return Err(DepositError::FollowOnTransfer("bridge returned empty call data".into()));
    }
    Ok(data)
}

fn swap_error(err: RouterError) -> DepositError {
    match err {
        RouterError::Transport(e) => DepositError::NetworkError(e.to_string()),
        RouterError::Config(message) => DepositError::Config(message),
        other => DepositError::FollowOnTransfer(other.to_string()),
    }
}

fn sender_error(err: SignerError) -> DepositError {
    match err {
        SignerError::Rejected => DepositError::SignatureDenied("user rejected the transaction".into()),
        other => DepositError::FollowOnTransfer(other.to_string()),
    }
}

fn eth_error(err: EthError) -> DepositError {
    DepositError::FollowOnTransfer(err.to_string())
}

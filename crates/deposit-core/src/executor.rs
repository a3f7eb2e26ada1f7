use std::sync::Arc;
use std::time::Duration;

use router_api::{ExecutableMessage, MsgsRequest, RoutePlan, RouterError, RoutingService};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::config::ContractSettings;
use crate::error::DepositError;
use crate::types::DestinationPayload;

/// Turns a resolved route into executable messages.
pub struct RouteExecutor {
    service: Arc<dyn RoutingService>,
    timeout: Duration,
}

impl RouteExecutor {
    pub fn new(service: Arc<dyn RoutingService>, timeout_ms: u64) -> Self {
        Self {
            service,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Requests the messages for `plan`, with one address per entry of
    /// `plan.required_chain_addresses`, in the same order.
    pub async fn build_execution(
        &self,
        plan: &RoutePlan,
        address_list: &[Address],
        slippage_bps: u32,
    ) -> Result<Vec<ExecutableMessage>, DepositError> {
        if address_list.len() != plan.required_chain_addresses.len() {
            return Err(DepositError::InvalidAddressList(format!(
                "route needs {} addresses, got {}",
                plan.required_chain_addresses.len(),
                address_list.len()
            )));
        }

        let addresses = address_list.iter().map(Address::to_string).collect();
        let request = MsgsRequest::from_plan(plan, addresses, slippage_bps);
        info!(
            operations = request.operations.len(),
            slippage = %request.slippage_tolerance_percent,
            "requesting execution messages"
        );

        let response = match tokio::time::timeout(self.timeout, self.service.msgs(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(execution_error(e)),
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, "msgs request timed out");
                return Err(DepositError::ExecutionTimeout(timeout_ms));
            }
        };

        let has_payload = response
            .msgs
            .first()
            .and_then(|msg| msg.evm_tx.as_ref())
            .and_then(|tx| tx.call_data())
            .is_some();
        if !has_payload {
            warn!(messages = response.msgs.len(), "first message carries no EVM call data");
            return Err(DepositError::EmptyExecutionPayload);
        }

        debug!(messages = response.msgs.len(), "execution messages ready");
        Ok(response.msgs)
    }
}

fn execution_error(err: RouterError) -> DepositError {
    match err {
        RouterError::Transport(e) => DepositError::NetworkError(e.to_string()),
        RouterError::Timeout { timeout_ms } => DepositError::ExecutionTimeout(timeout_ms),
        RouterError::Status { message, .. } => DepositError::RoutingService(message),
        RouterError::InvalidResponse(message) => DepositError::RoutingService(message),
        RouterError::Config(message) => DepositError::Config(message),
    }
}

/// What the widget needs from the first message.
pub fn destination_payload(
    messages: &[ExecutableMessage],
    contract: &ContractSettings,
) -> Result<DestinationPayload, DepositError> {
    let tx = messages
        .first()
        .and_then(|msg| msg.evm_tx.as_ref())
        .ok_or(DepositError::EmptyExecutionPayload)?;
    let data = tx.call_data().ok_or(DepositError::EmptyExecutionPayload)?;

    let address = match contract.address.as_deref().map(str::trim) {
        Some(address) if !address.is_empty() => address.to_string(),
        _ => tx.to.clone(),
    };

    Ok(DestinationPayload {
        address,
        name: contract.name.clone(),
        gas_limit: contract.gas_limit,
        payload: data.to_string(),
        logo_uri: contract.logo_uri.clone(),
    })
}

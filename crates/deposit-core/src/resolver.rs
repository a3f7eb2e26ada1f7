use std::sync::Arc;
use std::time::Duration;

use router_api::{RouteOptions, RoutePlan, RouteRequest, RouterError, RoutingService};
use tracing::{debug, info, warn};

use crate::amount::Amount;
use crate::error::DepositError;
use crate::types::ChainAsset;

/// Finds a route between two assets with one routing-service call.
pub struct RouteResolver {
    service: Arc<dyn RoutingService>,
    options: RouteOptions,
    timeout: Duration,
}

impl RouteResolver {
    pub fn new(service: Arc<dyn RoutingService>, options: RouteOptions, timeout_ms: u64) -> Self {
        Self {
            service,
            options,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub async fn resolve_route(
        &self,
        amount_in: Amount,
        source: &ChainAsset,
        dest: &ChainAsset,
    ) -> Result<RoutePlan, DepositError> {
        let request = RouteRequest {
            amount_in: amount_in.to_string(),
            source_asset_chain_id: source.chain_id.clone(),
            source_asset_denom: source.denom.clone(),
            dest_asset_chain_id: dest.chain_id.clone(),
            dest_asset_denom: dest.denom.clone(),
            options: self.options.clone(),
        };

        info!(
            amount_in = %request.amount_in,
            source = %source,
            dest = %dest,
            "resolving route"
        );

        let plan = match tokio::time::timeout(self.timeout, self.service.route(&request)).await {
            Ok(Ok(plan)) => plan,
            Ok(Err(e)) => return Err(route_error(e)),
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "route request timed out");
                return Err(DepositError::RouteNotFound(format!(
                    "no answer within {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        if plan.operations.is_empty() {
            warn!("routing service returned a route without operations");
            return Err(DepositError::RouteNotFound("route has no operations".into()));
        }

        debug!(
            operations = plan.operations.len(),
            amount_out = %plan.amount_out,
            required_addresses = plan.required_chain_addresses.len(),
            "route resolved"
        );
        Ok(plan)
    }
}

fn route_error(err: RouterError) -> DepositError {
    match err {
        RouterError::Transport(e) => DepositError::NetworkError(e.to_string()),
        RouterError::Config(message) => DepositError::Config(message),
        other => DepositError::RouteNotFound(other.to_string()),
    }
}

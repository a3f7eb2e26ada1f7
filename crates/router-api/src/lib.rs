//! Client for the cross-chain routing service.
//!
//! [`RoutingService`] is the seam the deposit core depends on;
//! [`RouterClient`] implements it over HTTPS with `reqwest`. The [`swap`]
//! module talks to the bridge service used for follow-on transfers.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod swap;

pub use client::{RouterClient, RoutingService, MSGS_PATH, ROUTE_PATH};
pub use config::RouterConfig;
pub use error::{RouterError, RouterResult};
pub use models::{
    bps_to_percent, Asset, Erc20Approval, EstimatedFee, EvmTx, ExecutableMessage, MsgsRequest,
    MsgsResponse, Operation, RouteOptions, RoutePlan, RouteRequest, SmartSwapOptions, Tx,
};
pub use swap::{
    DepositAction, SwapClient, SwapConfig, SwapData, SwapRequest, SwapResponse, SwapService,
    SWAPS_PATH,
};

use std::fmt;

use chain_cosmos::CosmosError;
use thiserror::Error;

/// Everything that can stop a deposit from being prepared.
#[derive(Debug, Error)]
pub enum DepositError {
    #[error("invalid address encoding: {0}")]
    InvalidAddressEncoding(String),

    #[error("signature request denied: {0}")]
    SignatureDenied(String),

    #[error("account derivation failed: {0}")]
    DerivationError(String),

    #[error("no route found: {0}")]
    RouteNotFound(String),

    #[error("invalid address list: {0}")]
    InvalidAddressList(String),

    #[error("route has no executable payload")]
    EmptyExecutionPayload,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("funding widget error: {0}")]
    ExternalWidgetError(String),

    #[error("no destination address")]
    MissingDestinationAddress,

    #[error("amount is missing or zero")]
    MissingAmount,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("execution request timed out after {0}ms")]
    ExecutionTimeout(u64),

    #[error("routing service error: {0}")]
    RoutingService(String),

    #[error("follow-on transfer failed: {0}")]
    FollowOnTransfer(String),

    #[error("a deposit is already in progress")]
    AttemptInProgress,

    #[error("deposit cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<CosmosError> for DepositError {
    fn from(e: CosmosError) -> Self {
        DepositError::InvalidAddressEncoding(e.to_string())
    }
}

impl From<toml::de::Error> for DepositError {
    fn from(e: toml::de::Error) -> Self {
        DepositError::Config(e.to_string())
    }
}

/// Stage of a deposit attempt an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Input,
    Address,
    Route,
    Payload,
    Widget,
    Execution,
    FollowOn,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Input => "input",
            Step::Address => "address",
            Step::Route => "route",
            Step::Payload => "payload",
            Step::Widget => "widget",
            Step::Execution => "execution",
            Step::FollowOn => "follow-on",
        })
    }
}

/// A failed attempt, tagged with where it failed.
#[derive(Debug, Error)]
#[error("could not prepare deposit ({step}): {error}")]
pub struct DepositFailure {
    pub attempt: u64,
    pub step: Step,
    #[source]
    pub error: DepositError,
}

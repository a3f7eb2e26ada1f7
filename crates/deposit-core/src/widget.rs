//! The external funding widget.
//!
//! The widget executes the deposit transaction itself. The core only fills
//! it in, opens it once, and waits for the single event it reports back.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::address::Address;
use crate::types::DestinationPayload;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct WidgetError(pub String);

/// Where the widget sends funds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetDestination {
    /// Call a contract with prepared call data.
    Contract(DestinationPayload),
    /// Plain transfer to an account.
    Wallet(Address),
}

/// Final report of an opened widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    TransactionSuccess { tx_hash: Option<String> },
    TransactionError { message: String },
    WidgetClosed,
}

pub trait FundingWidget: Send + Sync {
    /// Amount shown to the user, as a decimal string in whole tokens.
    fn set_requested_amount(&self, amount: &str) -> Result<(), WidgetError>;

    fn set_destination(&self, destination: WidgetDestination) -> Result<(), WidgetError>;

    /// Shows the widget. The receiver yields exactly one event.
    fn open(&self) -> Result<oneshot::Receiver<WidgetEvent>, WidgetError>;

    fn close(&self);
}

//! Cross-chain deposit orchestration.
//!
//! Takes a source wallet on an EVM chain and a destination account on a
//! Cosmos chain, asks the routing service for a path between them, turns the
//! path into an executable transaction and hands it to the funding widget.
//!
//! ```text
//! amount + destination
//!   → address codec / account deriver
//!   → route resolver  (POST /v2/fungible/route)
//!   → route executor  (POST /v2/fungible/msgs)
//!   → funding widget
//! ```
//!
//! The forward flow instead has the widget fund the source wallet, then
//! bridges the funds on from that wallet (`POST /api/v2/swaps`, ERC-20
//! allowance check, deposit transaction).

pub mod address;
pub mod amount;
pub mod config;
pub mod deriver;
pub mod error;
pub mod executor;
pub mod forwarder;
pub mod hd_derivation;
pub mod mnemonic;
pub mod mocks;
pub mod orchestrator;
pub mod resolver;
pub mod signer;
pub mod types;
pub mod widget;

pub use address::{reencode, Address, AddressEncoding};
pub use amount::Amount;
pub use config::{ContractSettings, DepositConfig, ForwardSettings};
pub use deriver::{account_from_signature, derive_account, onboarding_typed_data};
pub use error::{DepositError, DepositFailure, Step};
pub use executor::{destination_payload, RouteExecutor};
pub use forwarder::{ForwardReceipt, Forwarder};
pub use orchestrator::{
    DepositOrchestrator, DepositOutcome, DepositRequest, DepositState, DestinationSource,
    ForwardOutcome, ForwardRequest, StateChange,
};
pub use resolver::RouteResolver;
pub use signer::{EvmCall, EvmSender, LocalSigner, SignerError, TypedDataSigner};
pub use types::{ChainAsset, DestinationPayload};
pub use widget::{FundingWidget, WidgetDestination, WidgetError, WidgetEvent};

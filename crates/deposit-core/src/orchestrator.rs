//! The per-attempt deposit state machine.
//!
//! ```text
//! deposit: Idle → AddressPrepared → RouteResolved → PayloadReady
//!               → AwaitingExternalExecution → Completed | Failed
//! forward: Idle → AddressPrepared → AwaitingExternalExecution
//!               → ForwardingFunds → Completed | Failed
//! ```
//!
//! A forward attempt has the widget fund the source wallet itself, then
//! bridges the funds on with a follow-on transfer from that wallet.
//!
//! One attempt runs at a time. Every await point is raced against the
//! attempt's cancel flag, and every state change checks that the attempt is
//! still the active one, so a late answer for a cancelled attempt is dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use router_api::{RoutePlan, RouterClient, RoutingService, SwapClient, SwapService};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::address::{Address, AddressEncoding};
use crate::amount::Amount;
use crate::config::DepositConfig;
use crate::deriver::derive_account;
use crate::error::{DepositError, DepositFailure, Step};
use crate::executor::{destination_payload, RouteExecutor};
use crate::forwarder::{ForwardReceipt, Forwarder};
use crate::resolver::RouteResolver;
use crate::signer::{EvmSender, TypedDataSigner};
use crate::types::DestinationPayload;
use crate::widget::{FundingWidget, WidgetDestination, WidgetError, WidgetEvent};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepositState {
    Idle,
    AddressPrepared,
    RouteResolved,
    PayloadReady,
    AwaitingExternalExecution,
    ForwardingFunds,
    Completed,
    Failed,
}

/// Published on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub attempt: u64,
    pub state: DepositState,
}

/// Where the destination account comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationSource {
    /// A bech32 account the user typed, under any prefix.
    Entered(String),
    /// Derived from the source wallet's onboarding signature.
    DeriveFromSigner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest {
    /// Decimal amount in whole tokens of the source asset.
    pub amount: String,
    pub destination: Option<DestinationSource>,
}

impl DepositRequest {
    pub fn derived(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            destination: Some(DestinationSource::DeriveFromSigner),
        }
    }

    pub fn to_address(amount: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            destination: Some(DestinationSource::Entered(address.into())),
        }
    }
}

/// A deposit the widget reported as executed.
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub attempt: u64,
    pub amount: Amount,
    pub destination: Address,
    pub plan: RoutePlan,
    pub payload: DestinationPayload,
    pub tx_hash: Option<String>,
}

/// Funds the source wallet through the widget, then bridges them on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
    /// Decimal amount in whole tokens of the source asset.
    pub amount: String,
    /// Account on the bridge's destination network, passed through as is.
    pub destination: String,
}

impl ForwardRequest {
    pub fn new(amount: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            destination: destination.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForwardOutcome {
    pub attempt: u64,
    pub amount: Amount,
    /// Source wallet the widget funded.
    pub wallet: Address,
    pub destination: String,
    /// Hash the widget reported for the funding transaction.
    pub funding_tx: Option<String>,
    pub receipt: ForwardReceipt,
}

struct ActiveAttempt {
    id: u64,
    cancel: watch::Sender<bool>,
}

struct Inner {
    state: DepositState,
    next_attempt: u64,
    active: Option<ActiveAttempt>,
}

impl Inner {
    fn owns(&self, attempt: u64) -> bool {
        self.active.as_ref().map(|a| a.id) == Some(attempt)
    }
}

type StepResult<T> = Result<T, (Step, DepositError)>;

fn at<T>(step: Step, result: Result<T, DepositError>) -> StepResult<T> {
    result.map_err(|e| (step, e))
}

pub struct DepositOrchestrator {
    config: DepositConfig,
    resolver: RouteResolver,
    executor: RouteExecutor,
    signer: Arc<dyn TypedDataSigner>,
    widget: Arc<dyn FundingWidget>,
    forwarder: Option<Forwarder>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<StateChange>,
}

impl DepositOrchestrator {
    pub fn new(
        config: DepositConfig,
        service: Arc<dyn RoutingService>,
        signer: Arc<dyn TypedDataSigner>,
        widget: Arc<dyn FundingWidget>,
    ) -> Result<Self, DepositError> {
        config.validate()?;

        let timeout_ms = config.router.request_timeout_ms;
        let resolver = RouteResolver::new(service.clone(), config.route_options.clone(), timeout_ms);
        let executor = RouteExecutor::new(service, timeout_ms);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config,
            resolver,
            executor,
            signer,
            widget,
            forwarder: None,
            inner: Mutex::new(Inner {
                state: DepositState::Idle,
                next_attempt: 0,
                active: None,
            }),
            events,
        })
    }

    /// Builds an orchestrator that reaches the routing service over HTTP.
    pub fn with_router_client(
        config: DepositConfig,
        signer: Arc<dyn TypedDataSigner>,
        widget: Arc<dyn FundingWidget>,
    ) -> Result<Self, DepositError> {
        let client =
            RouterClient::new(&config.router).map_err(|e| DepositError::Config(e.to_string()))?;
        Self::new(config, Arc::new(client), signer, widget)
    }

    /// Enables [`DepositOrchestrator::forward`], bridging through `swaps`
    /// from the wallet behind `sender`.
    pub fn with_forwarding(
        mut self,
        swaps: Arc<dyn SwapService>,
        sender: Arc<dyn EvmSender>,
    ) -> Result<Self, DepositError> {
        self.forwarder = Some(Forwarder::new(swaps, sender, &self.config)?);
        Ok(self)
    }

    /// Enables forwarding through the bridge service over HTTP.
    pub fn with_swap_client(self, sender: Arc<dyn EvmSender>) -> Result<Self, DepositError> {
        let client = SwapClient::new(&self.config.forward.swap_api)
            .map_err(|e| DepositError::Config(e.to_string()))?;
        self.with_forwarding(Arc::new(client), sender)
    }

    pub fn config(&self) -> &DepositConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    pub fn state(&self) -> DepositState {
        self.lock().state
    }

    /// Id of the attempt in flight, if any.
    pub fn active_attempt(&self) -> Option<u64> {
        self.lock().active.as_ref().map(|a| a.id)
    }

    /// Runs one deposit attempt to completion.
    ///
    /// Fails with [`DepositError::AttemptInProgress`] without touching the
    /// running attempt when another one is in flight.
    pub async fn deposit(&self, request: DepositRequest) -> Result<DepositOutcome, DepositFailure> {
        let outcome = self
            .attempt(|attempt, mut cancel| async move {
                info!(attempt, amount = %request.amount.trim(), "deposit attempt started");
                self.run(attempt, &request, &mut cancel).await
            })
            .await?;
        info!(
            attempt = outcome.attempt,
            destination = %outcome.destination,
            "deposit completed"
        );
        Ok(outcome)
    }

    /// Has the widget fund the source wallet, then bridges the funds to
    /// `request.destination` with a follow-on transfer.
    ///
    /// Needs [`DepositOrchestrator::with_forwarding`]; shares the one
    /// attempt slot with [`DepositOrchestrator::deposit`].
    pub async fn forward(&self, request: ForwardRequest) -> Result<ForwardOutcome, DepositFailure> {
        let outcome = self
            .attempt(|attempt, mut cancel| async move {
                info!(attempt, amount = %request.amount.trim(), "forward attempt started");
                self.run_forward(attempt, &request, &mut cancel).await
            })
            .await?;
        info!(
            attempt = outcome.attempt,
            tx = %outcome.receipt.tx_hash,
            "follow-on transfer completed"
        );
        Ok(outcome)
    }

    /// Aborts the attempt in flight. Returns `false` when there is none.
    pub fn cancel(&self) -> bool {
        {
            let mut inner = self.lock();
            let Some(active) = inner.active.as_ref() else {
                return false;
            };
            let attempt = active.id;
            let _ = active.cancel.send(true);
            info!(attempt, "deposit attempt cancelled");
            self.reset_after_failure(&mut inner, attempt);
        }
        self.widget.close();
        true
    }

    /// Claims the attempt slot, runs `body` and settles the attempt with its
    /// result.
    async fn attempt<T, F, Fut>(&self, body: F) -> Result<T, DepositFailure>
    where
        F: FnOnce(u64, watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = StepResult<T>>,
    {
        let (attempt, cancel) = self.begin()?;
        let mut guard = AttemptGuard {
            orchestrator: self,
            attempt,
            settled: false,
        };

        let result = body(attempt, cancel).await;
        guard.settled = true;

        match result {
            Ok(value) if self.complete(attempt) => Ok(value),
            Ok(_) => Err(self.fail(attempt, Step::Execution, DepositError::Cancelled)),
            Err((step, error)) => Err(self.fail(attempt, step, error)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, attempt: u64, state: DepositState) {
        debug!(attempt, ?state, "deposit state changed");
        // No subscribers is fine.
        let _ = self.events.send(StateChange { attempt, state });
    }

    fn begin(&self) -> Result<(u64, watch::Receiver<bool>), DepositFailure> {
        let mut inner = self.lock();
        if let Some(active) = &inner.active {
            warn!(running = active.id, "deposit requested while another attempt is running");
            return Err(DepositFailure {
                attempt: active.id,
                step: Step::Input,
                error: DepositError::AttemptInProgress,
            });
        }

        inner.next_attempt += 1;
        let attempt = inner.next_attempt;
        let (cancel, cancelled) = watch::channel(false);
        inner.active = Some(ActiveAttempt { id: attempt, cancel });
        if inner.state != DepositState::Idle {
            inner.state = DepositState::Idle;
            self.publish(attempt, DepositState::Idle);
        }
        Ok((attempt, cancelled))
    }

    /// Moves the active attempt to `state`; a superseded attempt gets
    /// [`DepositError::Cancelled`] instead.
    fn transition(&self, attempt: u64, state: DepositState) -> Result<(), DepositError> {
        let mut inner = self.lock();
        if !inner.owns(attempt) {
            return Err(DepositError::Cancelled);
        }
        inner.state = state;
        self.publish(attempt, state);
        Ok(())
    }

    fn complete(&self, attempt: u64) -> bool {
        let mut inner = self.lock();
        if !inner.owns(attempt) {
            return false;
        }
        inner.active = None;
        inner.state = DepositState::Completed;
        self.publish(attempt, DepositState::Completed);
        true
    }

    fn fail(&self, attempt: u64, step: Step, error: DepositError) -> DepositFailure {
        let failure = DepositFailure {
            attempt,
            step,
            error,
        };

        let owned = {
            let mut inner = self.lock();
            let owned = inner.owns(attempt);
            if owned {
                error!(attempt, step = %step, error = %failure.error, "could not prepare deposit");
                self.reset_after_failure(&mut inner, attempt);
            } else {
                warn!(attempt, step = %step, error = %failure.error, "superseded attempt finished");
            }
            owned
        };
        if owned {
            self.widget.close();
        }
        failure
    }

    /// Drops the attempt and publishes `Failed` then `Idle`.
    ///
    /// Runs under the state lock, so it must not call out to the widget;
    /// callers close the widget once the lock is released.
    fn reset_after_failure(&self, inner: &mut Inner, attempt: u64) {
        inner.active = None;
        inner.state = DepositState::Failed;
        self.publish(attempt, DepositState::Failed);
        inner.state = DepositState::Idle;
        self.publish(attempt, DepositState::Idle);
    }

    async fn run(
        &self,
        attempt: u64,
        request: &DepositRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> StepResult<DepositOutcome> {
        let amount = at(
            Step::Input,
            Amount::parse(&request.amount, self.config.source_decimals),
        )?;
        if amount.is_zero() {
            return Err((Step::Input, DepositError::MissingAmount));
        }

        // Idle → AddressPrepared
        let source = at(
            Step::Address,
            Address::parse(&self.signer.address(), &AddressEncoding::Hex),
        )?;
        let destination = at(
            Step::Address,
            self.prepare_destination(request.destination.as_ref(), cancel)
                .await,
        )?;
        at(Step::Address, self.transition(attempt, DepositState::AddressPrepared))?;
        debug!(attempt, %source, %destination, "addresses prepared");

        // AddressPrepared → RouteResolved
        let plan = at(
            Step::Route,
            race(
                cancel,
                self.resolver.resolve_route(
                    amount,
                    &self.config.source_asset,
                    &self.config.destination_asset,
                ),
            )
            .await,
        )?;
        at(Step::Route, self.transition(attempt, DepositState::RouteResolved))?;

        // RouteResolved → PayloadReady
        let address_list = at(Step::Payload, self.address_list(&plan, &source, &destination))?;
        let messages = at(
            Step::Payload,
            race(
                cancel,
                self.executor
                    .build_execution(&plan, &address_list, self.config.slippage_bps),
            )
            .await,
        )?;
        let payload = at(
            Step::Payload,
            destination_payload(&messages, &self.config.contract),
        )?;
        at(Step::Payload, self.transition(attempt, DepositState::PayloadReady))?;

        // PayloadReady → AwaitingExternalExecution
        let events = at(
            Step::Widget,
            self.open_widget(amount, WidgetDestination::Contract(payload.clone())),
        )?;
        at(
            Step::Widget,
            self.transition(attempt, DepositState::AwaitingExternalExecution),
        )?;
        let tx_hash = self.widget_result(events, cancel).await?;

        Ok(DepositOutcome {
            attempt,
            amount,
            destination,
            plan,
            payload,
            tx_hash,
        })
    }

    async fn run_forward(
        &self,
        attempt: u64,
        request: &ForwardRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> StepResult<ForwardOutcome> {
        let forwarder = self.forwarder.as_ref().ok_or_else(|| {
            (
                Step::Input,
                DepositError::Config("follow-on transfers are not configured".into()),
            )
        })?;
        let amount = at(
            Step::Input,
            Amount::parse(&request.amount, self.config.source_decimals),
        )?;
        if amount.is_zero() {
            return Err((Step::Input, DepositError::MissingAmount));
        }

        // Idle → AddressPrepared
        let destination = request.destination.trim();
        if destination.is_empty() {
            return Err((Step::Address, DepositError::MissingDestinationAddress));
        }
        let wallet = at(
            Step::Address,
            Address::parse(&forwarder.wallet(), &AddressEncoding::Hex),
        )?;
        at(Step::Address, self.transition(attempt, DepositState::AddressPrepared))?;
        debug!(attempt, %wallet, destination, "forward addresses prepared");

        // AddressPrepared → AwaitingExternalExecution
        let events = at(
            Step::Widget,
            self.open_widget(amount, WidgetDestination::Wallet(wallet.clone())),
        )?;
        at(
            Step::Widget,
            self.transition(attempt, DepositState::AwaitingExternalExecution),
        )?;
        let funding_tx = self.widget_result(events, cancel).await?;
        self.widget.close();

        // AwaitingExternalExecution → ForwardingFunds
        at(Step::FollowOn, self.transition(attempt, DepositState::ForwardingFunds))?;
        let receipt = at(
            Step::FollowOn,
            race(cancel, forwarder.forward(amount, destination)).await,
        )?;

        Ok(ForwardOutcome {
            attempt,
            amount,
            wallet,
            destination: destination.to_string(),
            funding_tx,
            receipt,
        })
    }

    /// Waits for the widget's single report; only a success carries on.
    async fn widget_result(
        &self,
        events: oneshot::Receiver<WidgetEvent>,
        cancel: &mut watch::Receiver<bool>,
    ) -> StepResult<Option<String>> {
        let event = at(
            Step::Execution,
            race(cancel, async {
                events.await.map_err(|_| {
                    DepositError::ExternalWidgetError("widget dropped its result channel".into())
                })
            })
            .await,
        )?;

        match event {
            WidgetEvent::TransactionSuccess { tx_hash } => Ok(tx_hash),
            WidgetEvent::TransactionError { message } => {
                Err((Step::Execution, DepositError::ExternalWidgetError(message)))
            }
            WidgetEvent::WidgetClosed => Err((
                Step::Execution,
                DepositError::ExternalWidgetError(
                    "widget closed before the deposit completed".into(),
                ),
            )),
        }
    }

    async fn prepare_destination(
        &self,
        source: Option<&DestinationSource>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Address, DepositError> {
        let account = match source {
            Some(DestinationSource::Entered(text)) if !text.trim().is_empty() => {
                Address::parse_bech32(text)?
            }
            Some(DestinationSource::DeriveFromSigner) => {
                race(
                    cancel,
                    derive_account(self.signer.as_ref(), &self.config.account_prefix),
                )
                .await?
            }
            _ => return Err(DepositError::MissingDestinationAddress),
        };

        account.reencode(&AddressEncoding::bech32(&self.config.destination_prefix))
    }

    /// One address per chain the route names, in route order.
    fn address_list(
        &self,
        plan: &RoutePlan,
        source: &Address,
        destination: &Address,
    ) -> Result<Vec<Address>, DepositError> {
        plan.required_chain_addresses
            .iter()
            .map(|chain_id| self.address_for_chain(chain_id, source, destination))
            .collect()
    }

    fn address_for_chain(
        &self,
        chain_id: &str,
        source: &Address,
        destination: &Address,
    ) -> Result<Address, DepositError> {
        if chain_id == self.config.source_asset.chain_id {
            return Ok(source.clone());
        }
        if chain_id == self.config.destination_asset.chain_id {
            return Ok(destination.clone());
        }
        // The signer's account is the same on every EVM chain.
        if chain_eth::chains::get_chain_by_routing_id(chain_id).is_some() {
            return Ok(source.clone());
        }
        if let Some(relay) = self.config.relay_addresses.get(chain_id) {
            return Address::detect(relay).map_err(|e| {
                DepositError::InvalidAddressList(format!("relay address for {chain_id}: {e}"))
            });
        }
        if let Some(prefix) = self.config.prefix_for_chain(chain_id) {
            return destination.reencode(&AddressEncoding::bech32(prefix));
        }
        Err(DepositError::InvalidAddressList(format!(
            "no address known for chain {chain_id}"
        )))
    }

    fn open_widget(
        &self,
        amount: Amount,
        destination: WidgetDestination,
    ) -> Result<oneshot::Receiver<WidgetEvent>, DepositError> {
        let widget_error = |e: WidgetError| DepositError::ExternalWidgetError(e.to_string());

        self.widget
            .set_requested_amount(&amount.to_decimal_string(self.config.source_decimals))
            .map_err(widget_error)?;
        self.widget
            .set_destination(destination)
            .map_err(widget_error)?;
        self.widget.open().map_err(widget_error)
    }
}

/// Releases the attempt if the `deposit` future is dropped before it settles.
struct AttemptGuard<'a> {
    orchestrator: &'a DepositOrchestrator,
    attempt: u64,
    settled: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let owned = {
            let mut inner = self.orchestrator.lock();
            let owned = inner.owns(self.attempt);
            if owned {
                warn!(attempt = self.attempt, "deposit future dropped mid-attempt");
                self.orchestrator.reset_after_failure(&mut inner, self.attempt);
            }
            owned
        };
        if owned {
            self.orchestrator.widget.close();
        }
    }
}

/// Runs `fut` unless the attempt is cancelled first.
async fn race<T, F>(cancel: &mut watch::Receiver<bool>, fut: F) -> Result<T, DepositError>
where
    F: Future<Output = Result<T, DepositError>>,
{
    tokio::select! {
        biased;
        _ = cancelled(cancel) => Err(DepositError::Cancelled),
        result = fut => result,
    }
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|flag| *flag).await.is_err();
    if closed {
        // Attempt settled elsewhere; nothing left to cancel.
        std::future::pending::<()>().await;
    }
}

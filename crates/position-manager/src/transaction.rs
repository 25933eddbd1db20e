//! # Transaction Step Machine
//!
//! Sequences token approvals, the optional permit signature and the deposit.
//! The plan is derived from the approval provider and every step is
//! re-validated against fresh approval state right before it runs. Only one
//! step may be in progress at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use range_core::TokenSide;
use tracing::{debug, error, info, warn};

use crate::config::ManagerConfig;
use crate::error::{PositionError, PositionResult};
use crate::ports::{ApprovalProvider, PortError, PortResult, Signer};
use crate::types::{ApprovalState, PermitPayload, PermitSignature, PositionAction, TxReceipt};

const APPROVALS: &str = "approval state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepKind {
    ApproveToken0,
    ApproveToken1,
    SignPermit,
    Deposit,
}

impl StepKind {
    fn approval_side(self) -> Option<TokenSide> {
        match self {
            StepKind::ApproveToken0 => Some(TokenSide::Token0),
            StepKind::ApproveToken1 => Some(TokenSide::Token1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Idle,
    InProgress,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStep {
    pub kind: StepKind,
    pub status: StepStatus,
}

impl TransactionStep {
    fn idle(kind: StepKind) -> Self {
        Self {
            kind,
            status: StepStatus::Idle,
        }
    }
}

/// Result of one [`TransactionStepMachine::advance`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Another step is already in progress; nothing was started
    Busy,
    StepSucceeded(StepKind),
    /// Re-validation found the step no longer necessary
    StepSkipped(StepKind),
    /// The user declined; the step is idle again and may be retried
    Rejected(StepKind),
    Failed(StepKind, PositionError),
    /// The deposit landed and the machine was reset
    Completed(TxReceipt),
    /// The plan was reset while the step ran; its result was dropped
    Cancelled(StepKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub steps: Vec<TransactionStep>,
    /// Index of the next step to run
    pub cursor: usize,
    pub has_permit_signature: bool,
}

impl MachineSnapshot {
    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    pub fn current(&self) -> Option<&TransactionStep> {
        self.steps.get(self.cursor)
    }
}

/// Steps required by an approval state, in execution order
pub fn build_plan(approvals: &ApprovalState) -> Vec<StepKind> {
    let mut plan = Vec::with_capacity(4);
    if approvals.token0_needs_approval {
        plan.push(StepKind::ApproveToken0);
    }
    if approvals.token1_needs_approval {
        plan.push(StepKind::ApproveToken1);
    }
    if approvals.permit.is_some() {
        plan.push(StepKind::SignPermit);
    }
    plan.push(StepKind::Deposit);
    plan
}

#[derive(Default)]
struct MachineState {
    action: Option<PositionAction>,
    steps: Vec<TransactionStep>,
    cursor: usize,
    permit: Option<PermitPayload>,
    signature: Option<PermitSignature>,
    /// Bumped by every prepare and reset
    epoch: u64,
    /// Step whose external call has not returned yet. Survives `clear`.
    running: Option<StepKind>,
}

impl MachineState {
    fn in_progress(&self) -> bool {
        self.running.is_some()
    }

    fn clear(&mut self) {
        self.action = None;
        self.steps.clear();
        self.cursor = 0;
        self.permit = None;
        self.signature = None;
        self.epoch += 1;
    }

    /// Replace everything after the cursor with what `fresh` still requires
    fn rebuild_tail(&mut self, after: StepKind, fresh: &ApprovalState) {
        self.steps.truncate(self.cursor);
        self.steps.extend(
            build_plan(fresh)
                .into_iter()
                .filter(|kind| *kind > after)
                .map(TransactionStep::idle),
        );
        self.permit = fresh.permit.clone();
    }
}

/// Marks a step as running until its call returns or the advancing future is dropped
struct InFlight<'a> {
    state: &'a Mutex<MachineState>,
}

impl InFlight<'_> {
    fn finish(self, state: &mut MachineState) {
        state.running = None;
        std::mem::forget(self);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.running = None;
        for step in state.steps.iter_mut().filter(|s| s.status == StepStatus::InProgress) {
            step.status = StepStatus::Idle;
        }
    }
}

/// What a finished step hands back to the machine
enum StepEffect {
    Approved(ApprovalState),
    ApprovalUnneeded(ApprovalState),
    Signed(PermitSignature),
    PermitUnneeded,
    Deposited(TxReceipt),
}

pub struct TransactionStepMachine {
    approvals: Arc<dyn ApprovalProvider>,
    signer: Arc<dyn Signer>,
    timeout: Duration,
    state: Mutex<MachineState>,
}

impl TransactionStepMachine {
    pub fn new(approvals: Arc<dyn ApprovalProvider>, signer: Arc<dyn Signer>, timeout: Duration) -> Self {
        Self {
            approvals,
            signer,
            timeout,
            state: Mutex::new(MachineState::default()),
        }
    }

    pub fn from_config(approvals: Arc<dyn ApprovalProvider>, signer: Arc<dyn Signer>, config: &ManagerConfig) -> Self {
        Self::new(approvals, signer, config.service_timeout())
    }

    fn lock(&self) -> MutexGuard<'_, MachineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Query approval state and lay out the plan for `action`
    pub async fn prepare(&self, action: PositionAction) -> PositionResult<Vec<StepKind>> {
        if self.lock().in_progress() {
            return Err(PositionError::StepInProgress);
        }

        let approvals = self.query_approvals(&action).await?;
        let plan = build_plan(&approvals);

        let mut state = self.lock();
        if state.in_progress() {
            return Err(PositionError::StepInProgress);
        }
        state.clear();
        state.steps = plan.iter().copied().map(TransactionStep::idle).collect();
        state.permit = approvals.permit;
        state.action = Some(action);
        info!(steps = ?plan, "Prepared transaction plan");
        Ok(plan)
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        let state = self.lock();
        MachineSnapshot {
            steps: state.steps.clone(),
            cursor: state.cursor,
            has_permit_signature: state.signature.is_some(),
        }
    }

    /// True while a step's external call is outstanding, even after a reset
    pub fn is_busy(&self) -> bool {
        self.lock().in_progress()
    }

    /// Drop the plan, the held signature and any in-flight result. A step that
    /// is already running keeps the machine busy until its call returns.
    pub fn reset(&self) {
        let mut state = self.lock();
        if !state.steps.is_empty() {
            debug!(cursor = state.cursor, "Resetting transaction plan");
        }
        state.clear();
    }

    /// Run the current step
    pub async fn advance(&self) -> PositionResult<AdvanceOutcome> {
        let (kind, epoch, action, signature) = {
            let mut state = self.lock();
            if state.in_progress() {
                return Ok(AdvanceOutcome::Busy);
            }
            let action = state.action.clone().ok_or(PositionError::NoPlan)?;
            let (epoch, signature) = (state.epoch, state.signature.clone());
            let cursor = state.cursor;
            let step = state.steps.get_mut(cursor).ok_or(PositionError::NoPlan)?;
            step.status = StepStatus::InProgress;
            let kind = step.kind;
            state.running = Some(kind);
            (kind, epoch, action, signature)
        };
        let in_flight = InFlight { state: &self.state };

        debug!(step = ?kind, "Advancing transaction step");
        let result = self.execute(kind, &action, signature.as_ref()).await;

        let mut state = self.lock();
        in_flight.finish(&mut state);
        if state.epoch != epoch {
            debug!(step = ?kind, "Plan reset while step was running");
            // A landed deposit is reported even though its plan is gone
            if let Ok(StepEffect::Deposited(receipt)) = result {
                info!(tx = %receipt.hash, "Deposit confirmed after reset");
                return Ok(AdvanceOutcome::Completed(receipt));
            }
            return Ok(AdvanceOutcome::Cancelled(kind));
        }

        let cursor = state.cursor;
        let effect = match result {
            Ok(effect) => effect,
            Err(PositionError::UserRejection) => {
                debug!(step = ?kind, "User rejected step");
                state.steps[cursor].status = StepStatus::Idle;
                return Ok(AdvanceOutcome::Rejected(kind));
            }
            Err(err) => {
                error!(step = ?kind, "Transaction step failed: {}", err);
                state.steps[cursor].status = StepStatus::Failed(err.to_string());
                return Ok(AdvanceOutcome::Failed(kind, err));
            }
        };

        state.steps[cursor].status = StepStatus::Succeeded;
        state.cursor += 1;

        let outcome = match effect {
            StepEffect::Approved(fresh) => {
                state.rebuild_tail(kind, &fresh);
                AdvanceOutcome::StepSucceeded(kind)
            }
            StepEffect::ApprovalUnneeded(fresh) => {
                state.rebuild_tail(kind, &fresh);
                AdvanceOutcome::StepSkipped(kind)
            }
            StepEffect::Signed(signature) => {
                state.signature = Some(signature);
                AdvanceOutcome::StepSucceeded(kind)
            }
            StepEffect::PermitUnneeded => {
                state.signature = None;
                AdvanceOutcome::StepSkipped(kind)
            }
            StepEffect::Deposited(receipt) => {
                info!(tx = %receipt.hash, "Deposit confirmed");
                state.clear();
                AdvanceOutcome::Completed(receipt)
            }
        };

        Ok(outcome)
    }

    async fn execute(
        &self,
        kind: StepKind,
        action: &PositionAction,
        signature: Option<&PermitSignature>,
    ) -> PositionResult<StepEffect> {
        match kind {
            StepKind::ApproveToken0 | StepKind::ApproveToken1 => {
                let side = match kind.approval_side() {
                    Some(side) => side,
                    None => return Err(PositionError::TransactionFailure(format!("{kind:?} is not an approval"))),
                };
                let before = self.query_approvals(action).await?;
                if !before.needs_approval(side) {
                    debug!(step = ?kind, "Approval already in place");
                    return Ok(StepEffect::ApprovalUnneeded(before));
                }

                let token = action.token(side);
                let receipt = self
                    .bounded(self.signer.send_approval_tx(token))
                    .await
                    .map_err(PositionError::from_submission)?;
                info!(token = %token.symbol, tx = %receipt.hash, "Approval sent");

                let after = self.query_approvals(action).await?;
                if after.needs_approval(side) {
                    warn!(token = %token.symbol, "Approval not reflected in allowance yet");
                    return Err(PositionError::TransactionFailure(format!(
                        "{} approval not yet confirmed",
                        token.symbol
                    )));
                }
                Ok(StepEffect::Approved(after))
            }
            StepKind::SignPermit => {
                let fresh = self.query_approvals(action).await?;
                let permit = match fresh.permit {
                    Some(permit) => permit,
                    None => return Ok(StepEffect::PermitUnneeded),
                };
                let signature = self
                    .bounded(self.signer.sign_typed_data(&permit.domain, &permit.types, &permit.values))
                    .await
                    .map_err(PositionError::from_submission)?;
                Ok(StepEffect::Signed(signature))
            }
            StepKind::Deposit => {
                let receipt = self
                    .bounded(self.signer.send_deposit_tx(&action.deposit, signature))
                    .await
                    .map_err(PositionError::from_submission)?;
                Ok(StepEffect::Deposited(receipt))
            }
        }
    }

    async fn query_approvals(&self, action: &PositionAction) -> PositionResult<ApprovalState> {
        let request = action.approval_request();
        self.bounded(self.approvals.check_approvals(&request))
            .await
            .map_err(|e| PositionError::from_query(APPROVALS, e))
    }

    async fn bounded<T>(&self, call: impl std::future::Future<Output = PortResult<T>>) -> PortResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Timeout),
        }
    }
}

//! In-memory port fakes for unit tests

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use range_core::{PoolKind, PoolState, TokenMetadata, TokenSide};
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::ports::*;
use crate::types::*;

pub fn usdc() -> TokenMetadata {
    TokenMetadata::new("USDC", 6, 2, "0xa0b8")
}

pub fn weth() -> TokenMetadata {
    TokenMetadata::new("WETH", 18, 6, "0xc02a")
}

pub fn pool_key() -> PoolKey {
    PoolKey {
        pool_id: "weth-usdc-3000".to_string(),
        chain_id: 1,
        token0: weth(),
        token1: usdc(),
        tick_spacing: 60,
        kind: PoolKind::Volatile,
    }
}

pub fn pool_state(tick: i32) -> PoolState {
    PoolState {
        tick,
        sqrt_price_x96: "79228162514264337593543950336".to_string(),
        liquidity: "1000000".to_string(),
        price_token1_per_token0: format!("{}", 1.0001f64.powi(tick)),
    }
}

/// Pairs every input with twice as much of the other token
#[derive(Default)]
pub struct FakeMath {
    pub delay: Duration,
    /// Pool tick reported alongside each result
    pub pool_tick: AtomicI32,
    pub failure: Mutex<Option<PortError>>,
    pub calls: Mutex<Vec<CalculationRequest>>,
}

impl FakeMath {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn fail_with(&self, err: PortError) {
        *self.failure.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl LiquidityMathService for FakeMath {
    async fn calculate(&self, request: &CalculationRequest) -> PortResult<DependentAmountResult> {
        self.calls.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let pool_tick = self.pool_tick.load(Ordering::SeqCst);
        let input: u128 = request.input_amount.parse().unwrap();
        let other = (input * 2).to_string();
        let (amount0, amount1) = match request.input_token {
            TokenSide::Token0 => (request.input_amount.clone(), other),
            TokenSide::Token1 => (other, request.input_amount.clone()),
        };
        Ok(DependentAmountResult {
            liquidity: "1000".to_string(),
            final_tick_lower: request.tick_lower,
            final_tick_upper: request.tick_upper,
            amount0,
            amount1,
            pool_tick_at_calc: pool_tick,
            pool_price_at_calc: format!("{}", 1.0001f64.powi(pool_tick)),
        })
    }
}

/// Pool reader returning whatever the test last set
#[derive(Default)]
pub struct FakePools {
    pub state: Mutex<Option<PoolState>>,
    pub failure: Mutex<Option<PortError>>,
    pub calls: AtomicUsize,
}

impl FakePools {
    pub fn with_state(state: PoolState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    pub fn set(&self, state: Option<PoolState>) {
        *self.state.lock().unwrap() = state;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolStateProvider for FakePools {
    async fn get_pool_state(&self, _pool_id: &str) -> PortResult<Option<PoolState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.state.lock().unwrap().clone())
    }
}

#[derive(Debug, Default)]
pub struct WalletState {
    pub token0_needs_approval: bool,
    pub token1_needs_approval: bool,
    pub permit_required: bool,
    /// Approvals only take effect when set
    pub approvals_confirm: bool,
    pub approval_failures: Vec<PortError>,
    pub signature_failures: Vec<PortError>,
    pub deposit_failures: Vec<PortError>,
    pub log: Vec<String>,
    pub approval_checks: usize,
}

/// Wallet plus allowance reader sharing one state
#[derive(Default)]
pub struct FakeWallet {
    pub state: Mutex<WalletState>,
    /// When set, approval and deposit transactions wait for a notification
    pub gate: Option<Arc<Notify>>,
}

impl FakeWallet {
    pub fn new(token0: bool, token1: bool, permit: bool) -> Self {
        Self {
            state: Mutex::new(WalletState {
                token0_needs_approval: token0,
                token1_needs_approval: token1,
                permit_required: permit,
                approvals_confirm: true,
                ..WalletState::default()
            }),
            gate: None,
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn permit_payload() -> PermitPayload {
        PermitPayload {
            domain: json!({ "name": "Permit2", "chainId": 1 }),
            types: json!({ "PermitBatch": [] }),
            values: json!({ "nonce": 7 }),
        }
    }
}

#[async_trait]
impl ApprovalProvider for FakeWallet {
    async fn check_approvals(&self, _request: &ApprovalRequest) -> PortResult<ApprovalState> {
        let mut state = self.state.lock().unwrap();
        state.approval_checks += 1;
        Ok(ApprovalState {
            token0_needs_approval: state.token0_needs_approval,
            token1_needs_approval: state.token1_needs_approval,
            permit: state.permit_required.then(Self::permit_payload),
        })
    }
}

#[async_trait]
impl Signer for FakeWallet {
    async fn sign_typed_data(&self, _domain: &Value, _types: &Value, values: &Value) -> PortResult<PermitSignature> {
        let mut state = self.state.lock().unwrap();
        if !state.signature_failures.is_empty() {
            return Err(state.signature_failures.remove(0));
        }
        state.log.push("sign".to_string());
        state.permit_required = false;
        Ok(PermitSignature(format!("sig:{}", values["nonce"])))
    }

    async fn send_approval_tx(&self, token: &TokenMetadata) -> PortResult<TxReceipt> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let mut state = self.state.lock().unwrap();
        if !state.approval_failures.is_empty() {
            return Err(state.approval_failures.remove(0));
        }
        state.log.push(format!("approve:{}", token.symbol));
        if state.approvals_confirm {
            if token.address == weth().address {
                state.token0_needs_approval = false;
            } else {
                state.token1_needs_approval = false;
            }
        }
        Ok(TxReceipt {
            hash: format!("0xapprove{}", token.symbol),
        })
    }

    async fn send_deposit_tx(
        &self,
        _params: &DepositParams,
        permit_signature: Option<&PermitSignature>,
    ) -> PortResult<TxReceipt> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let mut state = self.state.lock().unwrap();
        if !state.deposit_failures.is_empty() {
            return Err(state.deposit_failures.remove(0));
        }
        let entry = match permit_signature {
            Some(sig) => format!("deposit:{}", sig.0),
            None => "deposit".to_string(),
        };
        state.log.push(entry);
        Ok(TxReceipt {
            hash: "0xdeposit".to_string(),
        })
    }
}

pub fn action(owner: &str) -> PositionAction {
    let pool = pool_key();
    PositionAction {
        token0: pool.token0.clone(),
        token1: pool.token1.clone(),
        deposit: DepositParams {
            pool_id: pool.pool_id,
            chain_id: pool.chain_id,
            tick_lower: -600,
            tick_upper: 600,
            liquidity: "1000".to_string(),
            amount0: "1000000000000000000".to_string(),
            amount1: "2000000".to_string(),
            owner: owner.to_string(),
        },
    }
}

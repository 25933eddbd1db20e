#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use position_manager::range_core::{PoolKind, PoolState, TokenMetadata, TokenSide};
use position_manager::*;
use serde_json::{json, Value};
use tokio::sync::Notify;

pub fn dai() -> TokenMetadata {
    TokenMetadata::new("DAI", 18, 2, "0x6b17")
}

pub fn uni() -> TokenMetadata {
    TokenMetadata::new("UNI", 18, 4, "0x1f98")
}

pub fn pool() -> PoolKey {
    PoolKey {
        pool_id: "dai-uni-3000".to_string(),
        chain_id: 1,
        token0: dai(),
        token1: uni(),
        tick_spacing: 60,
        kind: PoolKind::Volatile,
    }
}

pub fn snapshot(tick: i32) -> PoolState {
    PoolState {
        tick,
        sqrt_price_x96: "79228162514264337593543950336".to_string(),
        liquidity: "5000000000".to_string(),
        price_token1_per_token0: format!("{}", 1.0001f64.powi(tick)),
    }
}

/// Records requests; answers with a fixed 3:1 ratio after `delay`
pub struct RecordingMath {
    pub delay: Duration,
    pub requests: Mutex<Vec<CalculationRequest>>,
}

impl RecordingMath {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.input_amount.clone())
            .collect()
    }
}

#[async_trait]
impl LiquidityMathService for RecordingMath {
    async fn calculate(&self, request: &CalculationRequest) -> PortResult<DependentAmountResult> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;

        let input: u128 = request.input_amount.parse().unwrap();
        let (amount0, amount1) = match request.input_token {
            TokenSide::Token0 => (input, input * 3),
            TokenSide::Token1 => (input / 3, input),
        };
        Ok(DependentAmountResult {
            liquidity: "42".to_string(),
            final_tick_lower: request.tick_lower,
            final_tick_upper: request.tick_upper,
            amount0: amount0.to_string(),
            amount1: amount1.to_string(),
            pool_tick_at_calc: 120,
            pool_price_at_calc: "1.012".to_string(),
        })
    }
}

pub struct StaticPools(pub PoolState);

#[async_trait]
impl PoolStateProvider for StaticPools {
    async fn get_pool_state(&self, _pool_id: &str) -> PortResult<Option<PoolState>> {
        Ok(Some(self.0.clone()))
    }
}

#[derive(Default)]
pub struct Ledger {
    pub needs: [bool; 2],
    pub permit: bool,
    pub approval_results: Vec<PortResult<()>>,
    pub calls: Vec<String>,
}

/// Wallet whose allowances flip when an approval succeeds
#[derive(Default)]
pub struct ScriptedWallet {
    pub ledger: Mutex<Ledger>,
    pub gate: Option<Arc<Notify>>,
}

impl ScriptedWallet {
    pub fn new(token0: bool, token1: bool, permit: bool) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                needs: [token0, token1],
                permit,
                ..Ledger::default()
            }),
            gate: None,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.ledger.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl ApprovalProvider for ScriptedWallet {
    async fn check_approvals(&self, _request: &ApprovalRequest) -> PortResult<ApprovalState> {
        let ledger = self.ledger.lock().unwrap();
        Ok(ApprovalState {
            token0_needs_approval: ledger.needs[0],
            token1_needs_approval: ledger.needs[1],
            permit: ledger.permit.then(|| PermitPayload {
                domain: json!({ "name": "Permit2" }),
                types: json!({}),
                values: json!({ "spender": "0xrouter" }),
            }),
        })
    }
}

#[async_trait]
impl Signer for ScriptedWallet {
    async fn sign_typed_data(&self, _domain: &Value, _types: &Value, _values: &Value) -> PortResult<PermitSignature> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.calls.push("sign".to_string());
        ledger.permit = false;
        Ok(PermitSignature("0xsigned".to_string()))
    }

    async fn send_approval_tx(&self, token: &TokenMetadata) -> PortResult<TxReceipt> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let mut ledger = self.ledger.lock().unwrap();
        ledger.calls.push(format!("approve:{}", token.symbol));
        if !ledger.approval_results.is_empty() {
            ledger.approval_results.remove(0)?;
        }
        let index = if token.address == dai().address { 0 } else { 1 };
        ledger.needs[index] = false;
        Ok(TxReceipt {
            hash: format!("0x{}", token.symbol.to_lowercase()),
        })
    }

    async fn send_deposit_tx(
        &self,
        params: &DepositParams,
        permit_signature: Option<&PermitSignature>,
    ) -> PortResult<TxReceipt> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.calls.push(format!(
            "deposit:{}:{}:{}",
            params.tick_lower,
            params.tick_upper,
            permit_signature.map(|s| s.0.as_str()).unwrap_or("none")
        ));
        Ok(TxReceipt {
            hash: "0xdeposit".to_string(),
        })
    }
}

pub fn services(math: Arc<RecordingMath>, wallet: Arc<ScriptedWallet>, tick: i32) -> ServiceSet {
    ServiceSet {
        pools: Arc::new(StaticPools(snapshot(tick))),
        math,
        approvals: wallet.clone(),
        signer: wallet,
    }
}

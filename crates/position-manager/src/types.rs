//! Request and response types exchanged with the external services.

use range_core::{PoolKind, TokenMetadata, TokenSide};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of the pool a position form is working on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKey {
    pub pool_id: String,
    pub chain_id: u64,
    pub token0: TokenMetadata,
    pub token1: TokenMetadata,
    pub tick_spacing: i32,
    #[serde(default)]
    pub kind: PoolKind,
}

impl PoolKey {
    pub fn token(&self, side: TokenSide) -> &TokenMetadata {
        match side {
            TokenSide::Token0 => &self.token0,
            TokenSide::Token1 => &self.token1,
        }
    }
}

/// Input to the liquidity math service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    pub token0: String,
    pub token1: String,
    /// Raw integer amount of `input_token`
    pub input_amount: String,
    pub input_token: TokenSide,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub chain_id: u64,
}

/// Liquidity math service answer. Amounts are raw integer strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentAmountResult {
    pub liquidity: String,
    pub final_tick_lower: i32,
    pub final_tick_upper: i32,
    pub amount0: String,
    pub amount1: String,
    /// Pool tick the service calculated against
    pub pool_tick_at_calc: i32,
    /// Pool price the service calculated against
    pub pool_price_at_calc: String,
}

impl DependentAmountResult {
    pub fn amount(&self, side: TokenSide) -> &str {
        match side {
            TokenSide::Token0 => &self.amount0,
            TokenSide::Token1 => &self.amount1,
        }
    }
}

/// Input to the approval-state provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub token0: TokenMetadata,
    pub token1: TokenMetadata,
    pub amount0: String,
    pub amount1: String,
    pub owner: String,
}

/// EIP-712 payload to sign for a batched permit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitPayload {
    pub domain: Value,
    pub types: Value,
    pub values: Value,
}

/// What the approval-state provider reports as still required
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApprovalState {
    pub token0_needs_approval: bool,
    pub token1_needs_approval: bool,
    pub permit: Option<PermitPayload>,
}

impl ApprovalState {
    pub fn needs_approval(&self, side: TokenSide) -> bool {
        match side {
            TokenSide::Token0 => self.token0_needs_approval,
            TokenSide::Token1 => self.token1_needs_approval,
        }
    }
}

/// Signature over a [`PermitPayload`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature(pub String);

/// Parameters of the deposit transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositParams {
    pub pool_id: String,
    pub chain_id: u64,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: String,
    pub amount0: String,
    pub amount1: String,
    pub owner: String,
}

/// Confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
}

/// Everything the step machine needs for one position action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionAction {
    pub token0: TokenMetadata,
    pub token1: TokenMetadata,
    pub deposit: DepositParams,
}

impl PositionAction {
    pub fn token(&self, side: TokenSide) -> &TokenMetadata {
        match side {
            TokenSide::Token0 => &self.token0,
            TokenSide::Token1 => &self.token1,
        }
    }

    pub fn approval_request(&self) -> ApprovalRequest {
        ApprovalRequest {
            token0: self.token0.clone(),
            token1: self.token1.clone(),
            amount0: self.deposit.amount0.clone(),
            amount1: self.deposit.amount1.clone(),
            owner: self.deposit.owner.clone(),
        }
    }
}

//! Service contracts consumed by the calculators (ports).
//!
//! Implementations live outside this crate: a wallet, an RPC-backed pool
//! reader, a remote quote endpoint. Every method may suspend and may fail
//! with a [`PortError`], which callers convert before it reaches any
//! published state.

use async_trait::async_trait;
use range_core::{PoolState, TokenMetadata};
use serde_json::Value;
use thiserror::Error;

use crate::types::{
    ApprovalRequest, ApprovalState, CalculationRequest, DependentAmountResult, DepositParams,
    PermitSignature, TxReceipt,
};

/// Failure reported by an external service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The user declined in their wallet
    #[error("Rejected by user")]
    UserRejected,

    #[error("Timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

pub type PortResult<T> = Result<T, PortError>;

/// Chain-state reader for pool snapshots
#[async_trait]
pub trait PoolStateProvider: Send + Sync {
    /// `None` while the pool is still loading
    async fn get_pool_state(&self, pool_id: &str) -> PortResult<Option<PoolState>>;
}

/// Exact liquidity math, remote or in-process
#[async_trait]
pub trait LiquidityMathService: Send + Sync {
    async fn calculate(&self, request: &CalculationRequest) -> PortResult<DependentAmountResult>;
}

/// Allowance and permit requirements for a deposit
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    async fn check_approvals(&self, request: &ApprovalRequest) -> PortResult<ApprovalState>;
}

/// Wallet signing and transaction submission
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_typed_data(&self, domain: &Value, types: &Value, values: &Value) -> PortResult<PermitSignature>;

    async fn send_approval_tx(&self, token: &TokenMetadata) -> PortResult<TxReceipt>;

    async fn send_deposit_tx(
        &self,
        params: &DepositParams,
        permit_signature: Option<&PermitSignature>,
    ) -> PortResult<TxReceipt>;
}

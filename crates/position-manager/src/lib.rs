//! # Position Manager
//!
//! Async side of the position form: dependent-amount calculation against a
//! liquidity math service, pool snapshot refresh, and the approval, permit
//! and deposit sequence. External systems are reached only through the traits
//! in [`ports`].

pub mod amount;
pub mod config;
pub mod error;
pub mod local_math;
pub mod pool_state;
pub mod ports;
pub mod session;
pub mod telemetry;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod testing;

pub use amount::{AmountInput, CalculationOutcome, DependentAmountCalculator, DependentAmountState};
pub use config::{FormattingConfig, LoggingConfig, ManagerConfig, TokenRegistry};
pub use error::{PositionError, PositionResult};
pub use local_math::LocalLiquidityMath;
pub use pool_state::PoolStateWatcher;
pub use ports::{ApprovalProvider, LiquidityMathService, PoolStateProvider, PortError, PortResult, Signer};
pub use session::{PositionSession, ServiceSet};
pub use transaction::{
    build_plan, AdvanceOutcome, MachineSnapshot, StepKind, StepStatus, TransactionStep, TransactionStepMachine,
};
pub use types::*;

// Range logic is part of this crate's API surface
pub use range_core;

//! Funds transfer seam for withdrawals
//!
//! The ledger holds proceeds in custody until the owner withdraws them. The
//! actual movement of value to the owner happens outside the ledger, so it
//! is modeled as a trait: production wires in a real payment rail, tests
//! wire in doubles that record or fail on demand.

use crate::error::Result;
use crate::types::AccountId;
use rust_decimal::Decimal;

/// Destination for withdrawn funds
///
/// A transfer either fully completes or fails; on failure the caller must
/// leave the retained balance unchanged.
pub trait Payout: Send + Sync {
    /// Transfer `amount` to `to`
    fn transfer(&self, to: &AccountId, amount: Decimal) -> Result<()>;
}

/// Default payout that records the transfer in the log
///
/// Stands in for an external settlement rail in deployments where the
/// ledger runs standalone.
#[derive(Debug, Default)]
pub struct LoggingPayout;

impl Payout for LoggingPayout {
    fn transfer(&self, to: &AccountId, amount: Decimal) -> Result<()> {
        tracing::info!(to = %to, amount = %amount, "Payout transfer");
        Ok(())
    }
}

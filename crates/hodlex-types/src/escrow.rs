//! Escrow and beneficial-ownership records.
//!
//! Every open order owns exactly one [`EscrowRecord`] for the asset it
//! commits. Funds move from the owner to the escrow module account on
//! lock, out to counterparties on settle, and back to the owner on
//! release. `locked - settled - released` is always the amount the
//! escrow account holds for the order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, CompanyId, OrderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub order_id: OrderId,
    pub owner: AccountId,
    pub asset: Asset,
    /// Total ever moved into escrow for this order.
    pub locked: Decimal,
    /// Total paid out of escrow to counterparties and the fee collector.
    pub settled: Decimal,
    /// Total returned to the owner.
    pub released: Decimal,
}

impl EscrowRecord {
    #[must_use]
    pub fn new(order_id: OrderId, owner: AccountId, asset: Asset) -> Self {
        Self {
            order_id,
            owner,
            asset,
            locked: Decimal::ZERO,
            settled: Decimal::ZERO,
            released: Decimal::ZERO,
        }
    }

    /// Amount currently held in escrow for this order.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.locked - self.settled - self.released
    }
}

/// Records that the economic owner of escrowed shares is still the
/// account that placed the order, so dividends keep flowing to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficialOwnership {
    /// Legal custodian (the escrow module account).
    pub escrow_holder: AccountId,
    pub company_id: CompanyId,
    pub share_class: String,
    pub true_owner: AccountId,
    pub quantity: Decimal,
    /// The order ID rendered as a string.
    pub reference_id: String,
    pub reference_kind: String,
}

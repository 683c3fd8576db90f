//! In-memory equity registry.

use std::collections::BTreeMap;

use hodlex_types::{BeneficialOwnership, CompanyId, HodlexError, Result};
use rust_decimal::Decimal;

use crate::keepers::EquityRegistry;

#[derive(Debug, Clone)]
struct Listing {
    company: CompanyId,
    outstanding: Decimal,
}

/// Reference [`EquityRegistry`]: listed companies plus the
/// beneficial-ownership entries keyed by reference ID.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEquityRegistry {
    listings: BTreeMap<String, Listing>,
    beneficial: BTreeMap<String, BeneficialOwnership>,
}

impl InMemoryEquityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `symbol` as the share token of `company`.
    pub fn list_company(&mut self, symbol: &str, company: CompanyId, outstanding: Decimal) {
        self.listings.insert(
            symbol.to_string(),
            Listing {
                company,
                outstanding,
            },
        );
    }

    #[must_use]
    pub fn beneficial_entry(&self, reference_id: &str) -> Option<&BeneficialOwnership> {
        self.beneficial.get(reference_id)
    }

    pub fn beneficial_entries(&self) -> impl Iterator<Item = &BeneficialOwnership> {
        self.beneficial.values()
    }
}

impl EquityRegistry for InMemoryEquityRegistry {
    fn symbol_to_company_id(&self, symbol: &str) -> Option<CompanyId> {
        self.listings.get(symbol).map(|l| l.company.clone())
    }

    fn outstanding_shares(&self, company: &CompanyId) -> Option<Decimal> {
        self.listings
            .values()
            .find(|l| &l.company == company)
            .map(|l| l.outstanding)
    }

    fn register_beneficial_owner(&mut self, entry: BeneficialOwnership) -> Result<()> {
        if entry.quantity <= Decimal::ZERO {
            return Err(HodlexError::EquityRegistry(format!(
                "non-positive beneficial quantity for {}",
                entry.reference_id
            )));
        }
        // Re-registration replaces the entry (partial fills shrink it).
        self.beneficial.insert(entry.reference_id.clone(), entry);
        Ok(())
    }

    fn deregister_beneficial_owner(&mut self, reference_id: &str) -> Result<()> {
        self.beneficial
            .remove(reference_id)
            .map(|_| ())
            .ok_or_else(|| HodlexError::EquityRegistry(format!("no beneficial entry {reference_id}")))
    }
}

#[cfg(test)]
mod tests {
    use hodlex_types::AccountId;

    use super::*;

    fn entry(reference: &str, qty: i64) -> BeneficialOwnership {
        BeneficialOwnership {
            escrow_holder: AccountId::new("module/trading-escrow"),
            company_id: CompanyId("apple-inc".into()),
            share_class: "common".into(),
            true_owner: AccountId::new("alice"),
            quantity: Decimal::new(qty, 0),
            reference_id: reference.into(),
            reference_kind: "trading_order".into(),
        }
    }

    #[test]
    fn company_lookup() {
        let mut reg = InMemoryEquityRegistry::new();
        reg.list_company("APPLE", CompanyId("apple-inc".into()), Decimal::new(1_000, 0));
        let id = reg.symbol_to_company_id("APPLE").unwrap();
        assert_eq!(reg.outstanding_shares(&id), Some(Decimal::new(1_000, 0)));
        assert!(reg.symbol_to_company_id("HODL").is_none());
    }

    #[test]
    fn register_replace_deregister() {
        let mut reg = InMemoryEquityRegistry::new();
        reg.register_beneficial_owner(entry("order:1", 100)).unwrap();
        reg.register_beneficial_owner(entry("order:1", 70)).unwrap();
        assert_eq!(reg.beneficial_entry("order:1").unwrap().quantity, Decimal::new(70, 0));
        reg.deregister_beneficial_owner("order:1").unwrap();
        assert!(reg.beneficial_entry("order:1").is_none());
        assert!(reg.deregister_beneficial_owner("order:1").is_err());
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut reg = InMemoryEquityRegistry::new();
        assert!(reg.register_beneficial_owner(entry("order:2", 0)).is_err());
    }
}

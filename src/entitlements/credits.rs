// ABOUTME: Purchased credit store supplementing plan quotas with top-up packs
// ABOUTME: Credits never expire, never reset, and are disjoint from the usage ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Credit Store
//!
//! Append-only top-up mechanism independent of plan cycles. Payment
//! validation belongs to the external billing collaborator; by the time
//! [`CreditStore::add_pack`] runs, the purchase is already settled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entitlements::catalog::FeatureKey;

/// Remaining purchased uses per feature
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CreditStore {
    balances: BTreeMap<FeatureKey, u32>,
}

impl CreditStore {
    /// Remaining purchased credits for a feature
    #[must_use]
    pub fn balance(&self, key: FeatureKey) -> u32 {
        self.balances.get(&key).copied().unwrap_or(0)
    }

    /// Credit a purchased pack. No upper bound on accumulated credits.
    pub fn add_pack(&mut self, key: FeatureKey, pack_size: u32) {
        *self.balances.entry(key).or_insert(0) += pack_size;
    }

    /// Consume exactly `amount` credits if the balance covers it.
    ///
    /// Returns `true` on success; the balance never goes below zero.
    pub fn consume(&mut self, key: FeatureKey, amount: u32) -> bool {
        match self.balances.get_mut(&key) {
            Some(balance) if *balance >= amount => {
                *balance -= amount;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_requires_full_amount() {
        let mut store = CreditStore::default();
        store.add_pack(FeatureKey::ChatInteractions, 2);
        assert!(!store.consume(FeatureKey::ChatInteractions, 3));
        assert_eq!(store.balance(FeatureKey::ChatInteractions), 2);
        assert!(store.consume(FeatureKey::ChatInteractions, 2));
        assert_eq!(store.balance(FeatureKey::ChatInteractions), 0);
    }

    #[test]
    fn test_packs_accumulate() {
        let mut store = CreditStore::default();
        store.add_pack(FeatureKey::ShoppingLists, 5);
        store.add_pack(FeatureKey::ShoppingLists, 5);
        assert_eq!(store.balance(FeatureKey::ShoppingLists), 10);
    }

    #[test]
    fn test_consume_on_empty_balance_fails() {
        let mut store = CreditStore::default();
        assert!(!store.consume(FeatureKey::ImageGenerations, 1));
    }
}

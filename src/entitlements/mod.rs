// ABOUTME: Entitlement subsystem: catalog, usage ledger, purchased credits, and the gate
// ABOUTME: Everything that decides whether a metered feature action may proceed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Entitlements
//!
//! The usage-metering half of the core: a static plan catalog, the
//! daily/weekly usage ledger, the purchased-credit store, and the gate that
//! combines them into a single check-and-consume decision.

/// Static plans, features, limits, and periods
pub mod catalog;
/// Purchasable top-up credit packs
pub mod credits;
/// The check-and-consume decision function
pub mod gate;
/// Daily and weekly consumption counters
pub mod ledger;

pub use catalog::{FeatureDescriptor, FeatureKey, FeatureLimit, LimitPeriod, Plan, PlanCatalog};
pub use credits::CreditStore;
pub use gate::{DenialReason, EntitlementGate, GateDecision, GateDenial, QuotaSource, UpsellSignal};
pub use ledger::{monday_of, DailyUsage, UsageLedger, WeeklyUsage};

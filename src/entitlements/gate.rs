// ABOUTME: Entitlement gate deciding whether a user may perform a metered feature action
// ABOUTME: Three-tier fallback (plan quota, purchased credits, denial) with a first-use exemption
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Entitlement Gate
//!
//! Single decision point answering "can this user perform feature F right
//! now, for `amount` units, and if not, why". Approval consumes quota
//! synchronously, before any AI suspension begins, so two concurrent
//! invocations of the same feature can never both observe unconsumed quota.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::entitlements::catalog::{FeatureKey, PlanCatalog};
use crate::errors::AppError;
use crate::models::user::UserProfile;

/// Which pool an approved request consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaSource {
    /// First plan generation is free and consumes nothing
    FirstUseExemption,
    /// Feature is uncapped on the effective plan
    Unlimited,
    /// Consumed from the plan's daily/weekly ledger
    PlanQuota,
    /// Consumed from purchased top-up credits
    PurchasedCredits,
}

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The effective plan does not include this feature
    FeatureUnavailable,
    /// Plan quota and purchased credits are both exhausted
    LimitReached {
        /// The plan limit, surfaced to the user
        limit: u32,
    },
}

/// Signal for the presentation layer to open an upsell prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsellSignal {
    /// The feature that triggered the prompt
    pub feature: FeatureKey,
    /// Its user-facing label
    pub label: String,
}

/// A denied request: reason plus the upsell signal.
///
/// Denials are pure: no state was mutated on this path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDenial {
    /// Why the request was denied
    pub reason: DenialReason,
    /// Upsell prompt to surface
    pub upsell: UpsellSignal,
}

impl GateDenial {
    /// Convert into the application error for this denial
    #[must_use]
    pub fn to_error(&self) -> AppError {
        match self.reason {
            DenialReason::FeatureUnavailable => {
                AppError::feature_unavailable(self.upsell.label.clone())
            }
            DenialReason::LimitReached { limit } => {
                AppError::limit_reached(self.upsell.label.clone(), limit)
            }
        }
    }
}

/// Outcome of an entitlement check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GateDecision {
    /// Request approved; quota already consumed from `source`
    Approved {
        /// Which pool the request consumed
        source: QuotaSource,
    },
    /// Request denied; nothing was consumed
    Denied(GateDenial),
}

impl GateDecision {
    /// Whether the request may proceed
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

/// The entitlement decision function over a static plan catalog
#[derive(Debug, Clone, Default)]
pub struct EntitlementGate {
    catalog: PlanCatalog,
}

impl EntitlementGate {
    /// Create a gate over the default catalog
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: PlanCatalog::new(),
        }
    }

    /// Create a gate over a custom catalog
    #[must_use]
    pub const fn with_catalog(catalog: PlanCatalog) -> Self {
        Self { catalog }
    }

    /// Decide whether `profile` may perform `key` for `amount` units now,
    /// consuming quota on approval.
    ///
    /// The check-and-consume is one synchronous step: callers must complete
    /// it before suspending for the AI invocation.
    pub fn authorize(
        &self,
        profile: &mut UserProfile,
        key: FeatureKey,
        amount: u32,
        now: DateTime<Utc>,
    ) -> GateDecision {
        // One-time convenience: the first plan generation is free and does
        // not touch the ledger. The exemption is consumed by the
        // has_generated_plan flag, set elsewhere on successful generation.
        if !profile.has_generated_plan && key.is_plan_generation() {
            debug!(feature = %key, "first plan generation exempt from metering");
            return GateDecision::Approved {
                source: QuotaSource::FirstUseExemption,
            };
        }

        let plan = self.catalog.plan(profile.effective_plan(now));

        let descriptor = match plan.feature(key) {
            Some(descriptor) if descriptor.available => descriptor,
            other => {
                let label = other.map_or("feature", |d| d.label).to_owned();
                return GateDecision::Denied(GateDenial {
                    reason: DenialReason::FeatureUnavailable,
                    upsell: UpsellSignal {
                        feature: key,
                        label,
                    },
                });
            }
        };

        let Some(limit) = descriptor.limit.bound() else {
            return GateDecision::Approved {
                source: QuotaSource::Unlimited,
            };
        };

        // Plan quota: counters are only trusted after reconciliation.
        profile.usage.reconcile(now);
        let current = profile.usage.count(key);
        if current + amount <= limit {
            profile.usage.increment(key, amount);
            if key == FeatureKey::RecipeSearches {
                profile.total_recipes_generated += amount;
            }
            return GateDecision::Approved {
                source: QuotaSource::PlanQuota,
            };
        }

        // Purchased credits are a disjoint pool; no ledger increment here.
        if profile.purchased_uses.consume(key, amount) {
            return GateDecision::Approved {
                source: QuotaSource::PurchasedCredits,
            };
        }

        debug!(feature = %key, limit, used = current, "feature exhausted");
        GateDecision::Denied(GateDenial {
            reason: DenialReason::LimitReached { limit },
            upsell: UpsellSignal {
                feature: key,
                label: descriptor.label.to_owned(),
            },
        })
    }
}

// ABOUTME: Usage ledger tracking per-feature daily and weekly consumption counters
// ABOUTME: Lazy idempotent reset on day and Monday-anchored week boundary crossings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Usage Ledger
//!
//! Two counter sets per user, each tagged with the period anchor it applies
//! to. Counters are only trusted after [`UsageLedger::reconcile`] has run for
//! the current instant; reconciliation is lazy (invoked before every read or
//! write) rather than scheduled.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entitlements::catalog::{FeatureKey, LimitPeriod};

/// Monday of the week containing `date`.
///
/// ISO semantics: the week starts on Monday, so a Sunday belongs to the
/// *previous* Monday's week and must not drift forward.
#[must_use]
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Counters for features with a daily reset period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyUsage {
    /// The day these counters apply to
    pub date: NaiveDate,
    /// Per-feature consumption counts
    #[serde(default)]
    counters: BTreeMap<FeatureKey, u32>,
}

/// Counters for features with a weekly reset period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyUsage {
    /// Monday of the week these counters apply to
    pub week_start: NaiveDate,
    /// Per-feature consumption counts
    #[serde(default)]
    counters: BTreeMap<FeatureKey, u32>,
}

/// The combined daily and weekly counter sets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageLedger {
    /// Day-period counters
    pub daily: DailyUsage,
    /// Week-period counters
    pub weekly: WeeklyUsage,
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl UsageLedger {
    /// Create an empty ledger anchored at `now`
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        Self {
            daily: DailyUsage {
                date: today,
                counters: BTreeMap::new(),
            },
            weekly: WeeklyUsage {
                week_start: monday_of(today),
                counters: BTreeMap::new(),
            },
        }
    }

    /// Reset any counter set whose anchor no longer matches `now`.
    ///
    /// Idempotent: reconciling twice within the same instant is a no-op the
    /// second time. Must run before counters are read or written.
    pub fn reconcile(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.daily.date != today {
            debug!(stale = %self.daily.date, current = %today, "resetting daily usage counters");
            self.daily.counters.clear();
            self.daily.date = today;
        }

        let week_start = monday_of(today);
        if self.weekly.week_start != week_start {
            debug!(stale = %self.weekly.week_start, current = %week_start, "resetting weekly usage counters");
            self.weekly.counters.clear();
            self.weekly.week_start = week_start;
        }
    }

    /// Current count for a feature in its period
    #[must_use]
    pub fn count(&self, key: FeatureKey) -> u32 {
        let counters = match key.period() {
            LimitPeriod::Day => &self.daily.counters,
            LimitPeriod::Week => &self.weekly.counters,
        };
        counters.get(&key).copied().unwrap_or(0)
    }

    /// Add `amount` to a feature's counter. Never decrements.
    pub fn increment(&mut self, key: FeatureKey, amount: u32) {
        let counters = match key.period() {
            LimitPeriod::Day => &mut self.daily.counters,
            LimitPeriod::Week => &mut self.weekly.counters,
        };
        *counters.entry(key).or_insert(0) += amount;
    }
}

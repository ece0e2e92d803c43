// ABOUTME: Integration tests for the usage ledger's temporal reset behavior
// ABOUTME: Reset idempotence, Monday week anchor, and Sunday boundary handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use nutribot_core::entitlements::{monday_of, FeatureKey, UsageLedger};

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

#[test]
fn test_reconcile_idempotence_within_one_day() {
    // For any two instants in the same calendar day,
    // reconcile(reconcile(ledger, t1), t2) == reconcile(ledger, t2).
    let mut seeded = UsageLedger::new(at(2024, 6, 1, 9));
    seeded.increment(FeatureKey::ChatInteractions, 4);
    seeded.increment(FeatureKey::ImageGenerations, 1);

    for (h1, h2) in [(0, 23), (8, 8), (13, 7)] {
        let t1 = at(2024, 6, 3, h1);
        let t2 = at(2024, 6, 3, h2);

        let mut twice = seeded.clone();
        twice.reconcile(t1);
        twice.reconcile(t2);

        let mut once = seeded.clone();
        once.reconcile(t2);

        assert_eq!(twice, once);
    }
}

#[test]
fn test_week_anchor_on_sunday() {
    // 2024-06-09 is a Sunday; its week anchor is Monday 2024-06-03, six
    // days earlier, never the following Monday.
    let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
    let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    assert_eq!(monday_of(sunday), monday);
    assert_eq!(monday_of(sunday), sunday - Duration::days(6));
}

#[test]
fn test_saturday_to_sunday_does_not_reset_weekly() {
    let mut ledger = UsageLedger::new(at(2024, 6, 8, 12)); // Saturday
    ledger.increment(FeatureKey::WeeklyPlanGenerations, 1);

    ledger.reconcile(at(2024, 6, 9, 12)); // Sunday, same ISO week
    assert_eq!(ledger.count(FeatureKey::WeeklyPlanGenerations), 1);

    ledger.reconcile(at(2024, 6, 10, 0)); // Monday
    assert_eq!(ledger.count(FeatureKey::WeeklyPlanGenerations), 0);
}

#[test]
fn test_midnight_crossing_resets_daily_only() {
    let mut ledger = UsageLedger::new(at(2024, 6, 4, 23)); // Tuesday evening
    ledger.increment(FeatureKey::ChatInteractions, 5);
    ledger.increment(FeatureKey::ShoppingLists, 1);

    ledger.reconcile(at(2024, 6, 5, 0)); // Wednesday midnight
    assert_eq!(ledger.count(FeatureKey::ChatInteractions), 0);
    assert_eq!(ledger.count(FeatureKey::ShoppingLists), 1);
    assert_eq!(ledger.daily.date, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
}

#[test]
fn test_long_gap_resets_both_periods() {
    let mut ledger = UsageLedger::new(at(2024, 6, 4, 12));
    ledger.increment(FeatureKey::ChatInteractions, 3);
    ledger.increment(FeatureKey::RecipeSearches, 2);

    ledger.reconcile(at(2024, 7, 20, 12));
    assert_eq!(ledger.count(FeatureKey::ChatInteractions), 0);
    assert_eq!(ledger.count(FeatureKey::RecipeSearches), 0);
    assert_eq!(
        ledger.weekly.week_start,
        monday_of(NaiveDate::from_ymd_opt(2024, 7, 20).unwrap())
    );
}

#[test]
fn test_ledger_survives_serde_roundtrip() {
    let mut ledger = UsageLedger::new(at(2024, 6, 4, 12));
    ledger.increment(FeatureKey::MealAnalysesText, 2);
    ledger.increment(FeatureKey::ImageGenerations, 1);

    let json = serde_json::to_string(&ledger).unwrap();
    let restored: UsageLedger = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, ledger);
    assert_eq!(restored.count(FeatureKey::MealAnalysesText), 2);
}

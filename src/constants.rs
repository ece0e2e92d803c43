// ABOUTME: Application constants organized by domain
// ABOUTME: XP awards, trial window, notification timing, and storage keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! Constants module
//!
//! Application constants grouped into logical domains rather than scattered
//! through handlers.

/// XP amounts awarded by the progression engine
pub mod xp_amounts {
    /// Completing the daily goal
    pub const DAY_COMPLETE: u32 = 50;
    /// One-time bonus when a streak reaches exactly 3 days
    pub const STREAK_BONUS_3: u32 = 100;
    /// One-time bonus when a streak reaches exactly 7 days
    pub const STREAK_BONUS_7: u32 = 250;
    /// Logging a meal against the macro tracker
    pub const LOG_MEAL: u32 = 15;
    /// Successful AI plan generation
    pub const PLAN_GENERATED: u32 = 40;
    /// Logging a physical activity
    pub const LOG_ACTIVITY: u32 = 20;

    /// XP multiplier applied to every award for subscribers
    pub const SUBSCRIBER_MULTIPLIER: f64 = 1.5;
}

/// Trial window configuration
pub mod trial {
    /// Days of full `pro` access granted at registration
    pub const TRIAL_DAYS: i64 = 7;

    /// Environment variable overriding the trial length
    pub const ENV_VAR: &str = "NUTRIBOT_TRIAL_DAYS";
}

/// Notification display windows and staggering, in milliseconds.
///
/// These delays are consumed by the presentation-side scheduler; engine code
/// only attaches them to intents.
pub mod notification_timing {
    /// XP gain toast
    pub const XP_TOAST_MS: u64 = 2_500;
    /// Success toast
    pub const SUCCESS_TOAST_MS: u64 = 3_000;
    /// Error toast
    pub const ERROR_TOAST_MS: u64 = 5_000;
    /// Level-up banner display window
    pub const LEVEL_UP_TOAST_MS: u64 = 4_000;
    /// Delay before the level-up banner, so it lands after the XP toast
    pub const LEVEL_UP_DELAY_MS: u64 = 2_600;
    /// Gap between consecutive achievement popups
    pub const ACHIEVEMENT_STAGGER_MS: u64 = 4_000;
}

/// Storage keys for the persistence collaborator
pub mod storage_keys {
    /// Key holding the map of all user sessions
    pub const USERS: &str = "nutribot_users";
    /// Key holding the currently signed-in email
    pub const CURRENT_USER: &str = "nutribot_current_user";
}

/// Reserved guest account
pub mod guest {
    /// Email key under which the guest session is stored
    pub const EMAIL: &str = "guest@nutribot.dev";
    /// Display name for the guest profile
    pub const NAME: &str = "Guest";
}

/// Service identity for logging
pub mod service_names {
    /// Canonical service name
    pub const NUTRIBOT_CORE: &str = "nutribot-core";
}

// ABOUTME: Library entry point for the NutriBot core
// ABOUTME: Usage metering, entitlements, and gamified progression behind the NutriBot assistant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

#![deny(unsafe_code)]

//! # NutriBot Core
//!
//! The state machine behind the NutriBot nutrition assistant: a tiered
//! subscription and trial model, per-feature daily/weekly quotas,
//! purchasable top-up credits, and an XP/leveling/streak/achievement engine,
//! all mutating a single shared profile document under asynchronous AI
//! operations.
//!
//! ## Architecture
//!
//! - **Entitlements**: static plan catalog, lazy-reset usage ledger,
//!   purchased credits, and the gate combining them into one
//!   check-and-consume decision.
//! - **Progression**: XP with a subscriber multiplier and pluggable level
//!   curve, streak continuity with milestone bonuses, perfect-day detection,
//!   and monotonic achievement unlocks.
//! - **Session**: the controller owning the profile exclusively, exposing
//!   every handler the UI shell renders against.
//! - **AI**: the external collaborator trait with a relay client
//!   implementation and structural output sanitization.
//! - **Storage**: full-document persistence keyed by account email.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nutribot_core::ai::RelayClient;
//! use nutribot_core::config::AppConfig;
//! use nutribot_core::session::SessionController;
//! use nutribot_core::storage::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     nutribot_core::logging::init_logging()?;
//!     let config = AppConfig::from_env()?;
//!
//!     let store = Arc::new(JsonFileStore::new(config.store_path.clone()));
//!     let ai = Arc::new(RelayClient::from_config(&config)?);
//!     let mut session = SessionController::new(store, ai, config);
//!
//!     if !session.resume().await? {
//!         session.register("Ana", "ana@example.com").await?;
//!     }
//!     session.complete_today().await?;
//!     Ok(())
//! }
//! ```

/// AI collaborator interface, relay client, and output sanitization
pub mod ai;
/// Macro goal derivation from physiology
pub mod calculations;
/// Environment-based configuration
pub mod config;
/// Application constants grouped by domain
pub mod constants;
/// Entitlement catalog, usage ledger, credits, and the gate
pub mod entitlements;
/// Unified error handling
pub mod errors;
/// Structured logging setup
pub mod logging;
/// Domain models
pub mod models;
/// Notification intents and the presentation scheduler
pub mod notifications;
/// XP, streaks, and achievements
pub mod progression;
/// The session controller and gated operations
pub mod session;
/// Session persistence
pub mod storage;

pub use errors::{AppError, AppResult, ErrorCode};

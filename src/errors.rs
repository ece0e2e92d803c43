// ABOUTME: Unified error handling for the NutriBot core state machine
// ABOUTME: Defines error codes, the AppError type, and convenience constructors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Unified Error Handling System
//!
//! This module provides a centralized error handling system for the NutriBot
//! core. It defines standard error types and error codes to ensure consistent
//! error handling across all modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Entitlements (2000-2999)
    #[serde(rename = "FEATURE_UNAVAILABLE")]
    FeatureUnavailable = 2000,
    #[serde(rename = "LIMIT_REACHED")]
    LimitReached = 2001,

    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // Session & persistence (4000-4999)
    #[serde(rename = "STALE_SESSION_DATA")]
    StaleSessionData = 4000,
    #[serde(rename = "CORRUPTED_SESSION")]
    CorruptedSession = 4001,
    #[serde(rename = "ACCOUNT_NOT_FOUND")]
    AccountNotFound = 4002,
    #[serde(rename = "ACCOUNT_ALREADY_EXISTS")]
    AccountAlreadyExists = 4003,

    // External AI service (5000-5999)
    #[serde(rename = "AI_INVOCATION_FAILED")]
    AiInvocationFailed = 5000,
    #[serde(rename = "MALFORMED_AI_OUTPUT")]
    MalformedAiOutput = 5001,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9001,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9002,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::FeatureUnavailable => "This feature is not available on your current plan",
            Self::LimitReached => "Usage limit reached for your current plan",
            Self::InvalidInput => "The provided input is invalid",
            Self::StaleSessionData => "Stored session data is missing expected fields",
            Self::CorruptedSession => "Stored session data could not be read",
            Self::AccountNotFound => "No account exists for this email",
            Self::AccountAlreadyExists => "An account already exists for this email",
            Self::AiInvocationFailed => "The AI service could not complete the request",
            Self::MalformedAiOutput => "The AI service returned an invalid response",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal error occurred",
            Self::StorageError => "Storage operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Whether this error is recovered locally (notification only) rather
    /// than propagated to the caller
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FeatureUnavailable | Self::LimitReached | Self::StaleSessionData
        )
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional key-value context
    pub details: serde_json::Value,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: serde_json::Value::Null,
            source: None,
        }
    }

    /// Add details to the error
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience functions for creating common errors
impl AppError {
    /// Feature not available on the effective plan
    pub fn feature_unavailable(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(
            ErrorCode::FeatureUnavailable,
            format!("\"{label}\" is not available on your plan"),
        )
        .with_details(serde_json::json!({ "feature": label }))
    }

    /// Plan quota and purchased credits are both exhausted
    pub fn limit_reached(label: impl Into<String>, limit: u32) -> Self {
        let label = label.into();
        Self::new(
            ErrorCode::LimitReached,
            format!("\"{label}\" limit ({limit}) reached"),
        )
        .with_details(serde_json::json!({ "feature": label, "limit": limit }))
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// The external AI collaborator failed or returned a non-success status
    pub fn ai_invocation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AiInvocationFailed, message)
    }

    /// The AI collaborator returned structurally invalid data
    pub fn malformed_ai_output(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedAiOutput, message)
    }

    /// Persistence document failed to parse entirely
    pub fn corrupted_session(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CorruptedSession, message)
    }

    /// No stored account for the given email
    pub fn account_not_found(email: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::AccountNotFound,
            format!("no account for {}", email.into()),
        )
    }

    /// An account already exists for the given email
    pub fn account_already_exists(email: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::AccountAlreadyExists,
            format!("account already exists for {}", email.into()),
        )
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }
}

/// Conversion from `anyhow::Error` for init-time boundaries
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorCode::StorageError, error.to_string()).with_source(error)
    }
}

//! Double-submission protection for Reinhardt forms
//!
//! A double-submission token is a single-use secret that authorizes exactly one
//! commit of a non-idempotent form submission. This crate provides:
//!
//! - Token generation through the [`TokenGenerator`] capability
//! - Per-scope-key persistence with [`TokenStore`] and the lock-per-key
//!   [`InMemoryTokenStore`]
//! - The `"<parameterName>=<tokenValue>"` hidden-field format
//! - Optional AES-256-GCM encryption of the hidden value
//! - [`DoubleSubmitGuard`], which issues, embeds and validates tokens
//!
//! ## Lifecycle
//!
//! ```text
//! NoToken --issue--> Issued --validate_and_consume--> Consumed
//!                      ^                                  |
//!                      +-------------issue----------------+
//! ```
//!
//! Issuing a new token for a scope key invalidates the previous one, so a
//! replayed page rendered before the latest issuance always fails validation.
//!
//! ## Example
//!
//! ```
//! use reinhardt_double_submit::DoubleSubmitGuard;
//!
//! let guard = DoubleSubmitGuard::in_memory();
//! let token = guard.issue("session-1").unwrap();
//! let hidden = guard.embed(&token).unwrap();
//!
//! assert!(guard.validate_and_consume("session-1", Some(&hidden)).is_ok());
//!
//! let err = guard.validate_and_consume("session-1", Some(&hidden)).unwrap_err();
//! assert!(err.is_double_submission());
//! assert!(!err.is_tampering());
//! ```

pub mod cipher;
pub mod guard;
pub mod store;
pub mod token;
pub mod wire;

pub use cipher::{CipherError, HiddenCipher};
pub use guard::{
	DEFAULT_HIDDEN_FIELD_NAME, DEFAULT_HIDDEN_FIELD_PARAM_NAME, DoubleSubmitConfig,
	DoubleSubmitError, DoubleSubmitGuard, DoubleSubmitGuardBuilder, MismatchReason, Result,
};
pub use store::{ConsumeOutcome, InMemoryTokenStore, StoreResult, TokenStore, TokenStoreError};
pub use token::{
	DEFAULT_TOKEN_LENGTH, RandomTokenGenerator, TOKEN_ALLOWED_CHARS, Token, TokenGenerator,
	TokenState,
};
pub use wire::EmbeddedToken;

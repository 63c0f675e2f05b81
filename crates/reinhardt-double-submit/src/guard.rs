//! Issuing, embedding and validating double-submission tokens
//!
//! [`DoubleSubmitGuard`] ties together the generator, the store and the
//! optional hidden-value cipher. Rendering calls [`DoubleSubmitGuard::issue`]
//! and [`DoubleSubmitGuard::embed`]; the next request calls
//! [`DoubleSubmitGuard::check_request`] before any business logic runs.

use crate::cipher::{CipherError, HiddenCipher};
use crate::store::{ConsumeOutcome, InMemoryTokenStore, TokenStore, TokenStoreError};
use crate::token::{DEFAULT_TOKEN_LENGTH, RandomTokenGenerator, Token, TokenGenerator, TokenState};
use crate::wire::EmbeddedToken;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default name of the hidden field carrying the token
pub const DEFAULT_HIDDEN_FIELD_NAME: &str = "_double_submit";

/// Default logical parameter name embedded in the hidden value
pub const DEFAULT_HIDDEN_FIELD_PARAM_NAME: &str = "_token";

/// Why a presented token was rejected as tampered or stale
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MismatchReason {
	#[error("hidden value could not be decoded")]
	Undecodable,
	#[error("expected parameter '{expected}', found '{found}'")]
	ParamName { expected: String, found: String },
	#[error("token value does not match the issued token")]
	ValueDiffers,
	#[error("issued token has expired")]
	Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum DoubleSubmitError {
	/// Expected runtime condition: double click, back button, replay
	#[error("Duplicate submission detected for scope '{scope_key}'")]
	Duplicate { scope_key: String },
	/// Tampered, stale or expired token
	#[error("Double-submission token mismatch for scope '{scope_key}': {reason}")]
	Mismatch {
		scope_key: String,
		reason: MismatchReason,
	},
	#[error(transparent)]
	Store(#[from] TokenStoreError),
	#[error(transparent)]
	Cipher(#[from] CipherError),
	#[error("Invalid double-submission configuration: {0}")]
	Configuration(String),
}

impl DoubleSubmitError {
	/// True for conditions that should show an "already performed" page
	/// rather than a generic error.
	pub fn is_double_submission(&self) -> bool {
		matches!(self, Self::Duplicate { .. } | Self::Mismatch { .. })
	}

	/// True when the token looked tampered or stale
	pub fn is_tampering(&self) -> bool {
		matches!(self, Self::Mismatch { .. })
	}
}

pub type Result<T> = std::result::Result<T, DoubleSubmitError>;

/// Double-submission token settings
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleSubmitConfig {
	/// Name attribute of the hidden field
	pub hidden_field_name: String,
	/// Logical parameter name carried inside the hidden value
	pub hidden_field_param_name: String,
	/// Encrypt the hidden value (requires a cipher on the guard)
	pub encrypt_hidden: bool,
	/// Length of generated token values
	pub token_length: usize,
	/// Lifetime of an issued token in seconds (None = until replaced)
	pub token_ttl_secs: Option<u64>,
}

impl Default for DoubleSubmitConfig {
	fn default() -> Self {
		Self {
			hidden_field_name: DEFAULT_HIDDEN_FIELD_NAME.to_string(),
			hidden_field_param_name: DEFAULT_HIDDEN_FIELD_PARAM_NAME.to_string(),
			encrypt_hidden: false,
			token_length: DEFAULT_TOKEN_LENGTH,
			token_ttl_secs: None,
		}
	}
}

impl DoubleSubmitConfig {
	pub fn with_hidden_field_name(mut self, name: impl Into<String>) -> Self {
		self.hidden_field_name = name.into();
		self
	}

	pub fn with_param_name(mut self, name: impl Into<String>) -> Self {
		self.hidden_field_param_name = name.into();
		self
	}

	pub fn with_encrypt_hidden(mut self, encrypt: bool) -> Self {
		self.encrypt_hidden = encrypt;
		self
	}

	pub fn with_token_length(mut self, length: usize) -> Self {
		self.token_length = length;
		self
	}

	pub fn with_token_ttl_secs(mut self, secs: u64) -> Self {
		self.token_ttl_secs = Some(secs);
		self
	}

	fn validate(&self) -> Result<()> {
		if self.hidden_field_name.is_empty() {
			return Err(DoubleSubmitError::Configuration(
				"hidden_field_name must not be empty".to_string(),
			));
		}
		if self.hidden_field_param_name.is_empty() || self.hidden_field_param_name.contains('=') {
			return Err(DoubleSubmitError::Configuration(format!(
				"hidden_field_param_name must be non-empty and must not contain '=': [{}]",
				self.hidden_field_param_name
			)));
		}
		Ok(())
	}
}

/// Builder for [`DoubleSubmitGuard`]
#[derive(Default)]
pub struct DoubleSubmitGuardBuilder {
	config: DoubleSubmitConfig,
	generator: Option<Box<dyn TokenGenerator>>,
	store: Option<Arc<dyn TokenStore>>,
	cipher: Option<HiddenCipher>,
}

impl DoubleSubmitGuardBuilder {
	pub fn config(mut self, config: DoubleSubmitConfig) -> Self {
		self.config = config;
		self
	}

	pub fn generator(mut self, generator: impl TokenGenerator + 'static) -> Self {
		self.generator = Some(Box::new(generator));
		self
	}

	pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn cipher(mut self, cipher: HiddenCipher) -> Self {
		self.cipher = Some(cipher);
		self
	}

	/// Validate the configuration and assemble the guard
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::{DoubleSubmitConfig, DoubleSubmitGuard};
	///
	/// let guard = DoubleSubmitGuard::builder()
	///     .config(DoubleSubmitConfig::default().with_param_name("p"))
	///     .build()
	///     .unwrap();
	/// assert_eq!(guard.config().hidden_field_param_name, "p");
	///
	/// // Encryption without a cipher is rejected
	/// let missing_cipher = DoubleSubmitGuard::builder()
	///     .config(DoubleSubmitConfig::default().with_encrypt_hidden(true))
	///     .build();
	/// assert!(missing_cipher.is_err());
	/// ```
	pub fn build(self) -> Result<DoubleSubmitGuard> {
		self.config.validate()?;
		if self.config.encrypt_hidden && self.cipher.is_none() {
			return Err(DoubleSubmitError::Configuration(
				"encrypt_hidden is enabled but no cipher was supplied".to_string(),
			));
		}

		let generator = self
			.generator
			.unwrap_or_else(|| Box::new(RandomTokenGenerator::new(self.config.token_length)));
		let store = self.store.unwrap_or_else(|| {
			let store = match self.config.token_ttl_secs {
				Some(secs) => InMemoryTokenStore::new().with_ttl(Duration::from_secs(secs)),
				None => InMemoryTokenStore::new(),
			};
			Arc::new(store)
		});

		Ok(DoubleSubmitGuard {
			config: self.config,
			generator,
			store,
			cipher: self.cipher,
		})
	}
}

/// Issues and validates single-use double-submission tokens
pub struct DoubleSubmitGuard {
	config: DoubleSubmitConfig,
	generator: Box<dyn TokenGenerator>,
	store: Arc<dyn TokenStore>,
	cipher: Option<HiddenCipher>,
}

impl DoubleSubmitGuard {
	pub fn builder() -> DoubleSubmitGuardBuilder {
		DoubleSubmitGuardBuilder::default()
	}

	/// Guard with default settings over an in-memory store
	pub fn in_memory() -> Self {
		Self {
			config: DoubleSubmitConfig::default(),
			generator: Box::new(RandomTokenGenerator::default()),
			store: Arc::new(InMemoryTokenStore::new()),
			cipher: None,
		}
	}

	pub fn config(&self) -> &DoubleSubmitConfig {
		&self.config
	}

	pub fn hidden_field_name(&self) -> &str {
		&self.config.hidden_field_name
	}

	/// Generate a fresh token for `scope_key`, invalidating any earlier one
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::DoubleSubmitGuard;
	///
	/// let guard = DoubleSubmitGuard::in_memory();
	/// let first = guard.issue("session-1").unwrap();
	/// let second = guard.issue("session-1").unwrap();
	///
	/// assert!(guard.validate_and_consume("session-1", Some(&guard.embed(&first).unwrap())).is_err());
	/// assert_ne!(first.value(), second.value());
	/// ```
	pub fn issue(&self, scope_key: &str) -> Result<Token> {
		let token = Token::new(self.generator.generate(), scope_key);
		if token.value().contains('=') {
			return Err(DoubleSubmitError::Configuration(
				"token generator produced a value containing '='".to_string(),
			));
		}
		let displaced = self.store.replace(token.clone())?;
		tracing::debug!(scope_key, displaced, "issued double-submission token");
		Ok(token)
	}

	/// Produce the hidden-field value for `token`
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::{DoubleSubmitConfig, DoubleSubmitGuard, Token};
	///
	/// let guard = DoubleSubmitGuard::builder()
	///     .config(DoubleSubmitConfig::default().with_param_name("p"))
	///     .build()
	///     .unwrap();
	/// let embedded = guard.embed(&Token::new("abc123", "session-1")).unwrap();
	/// assert_eq!(embedded, "p=abc123");
	/// ```
	pub fn embed(&self, token: &Token) -> Result<String> {
		let plain =
			EmbeddedToken::new(&self.config.hidden_field_param_name, token.value()).encode();
		match (&self.cipher, self.config.encrypt_hidden) {
			(Some(cipher), true) => Ok(cipher.encrypt(&plain)?),
			_ => Ok(plain),
		}
	}

	fn decode(&self, raw: &str) -> std::result::Result<EmbeddedToken, MismatchReason> {
		let plain = match (&self.cipher, self.config.encrypt_hidden) {
			(Some(cipher), true) => cipher
				.decrypt(raw)
				.map_err(|_| MismatchReason::Undecodable)?,
			_ => raw.to_string(),
		};
		let embedded = EmbeddedToken::parse(&plain).ok_or(MismatchReason::Undecodable)?;
		if embedded.param_name != self.config.hidden_field_param_name {
			return Err(MismatchReason::ParamName {
				expected: self.config.hidden_field_param_name.clone(),
				found: embedded.param_name,
			});
		}
		Ok(embedded)
	}

	/// Validate a presented hidden value and spend the token on success
	///
	/// `presented` is the raw hidden-field value, `None` when the field was
	/// absent from the request.
	pub fn validate_and_consume(&self, scope_key: &str, presented: Option<&str>) -> Result<()> {
		let presented = match presented {
			Some(raw) if !raw.is_empty() => raw,
			_ => {
				tracing::warn!(scope_key, "double-submission token missing from request");
				return Err(DoubleSubmitError::Duplicate {
					scope_key: scope_key.to_string(),
				});
			}
		};

		let embedded = match self.decode(presented) {
			Ok(embedded) => embedded,
			Err(reason) => {
				self.store.invalidate(scope_key)?;
				return Err(self.mismatch(scope_key, reason));
			}
		};

		match self.store.consume(scope_key, &embedded.value)? {
			ConsumeOutcome::Accepted => {
				tracing::debug!(scope_key, "consumed double-submission token");
				Ok(())
			}
			ConsumeOutcome::NothingIssued => {
				tracing::warn!(scope_key, "duplicate submission detected");
				Err(DoubleSubmitError::Duplicate {
					scope_key: scope_key.to_string(),
				})
			}
			ConsumeOutcome::Mismatch => Err(self.mismatch(scope_key, MismatchReason::ValueDiffers)),
			ConsumeOutcome::Expired => Err(self.mismatch(scope_key, MismatchReason::Expired)),
		}
	}

	/// Validate the token carried by decoded request parameters
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::DoubleSubmitGuard;
	/// use std::collections::HashMap;
	///
	/// let guard = DoubleSubmitGuard::in_memory();
	/// let token = guard.issue("session-1").unwrap();
	///
	/// let mut params = HashMap::new();
	/// params.insert(guard.hidden_field_name().to_string(), guard.embed(&token).unwrap());
	///
	/// assert!(guard.check_request("session-1", &params).is_ok());
	/// let replay = guard.check_request("session-1", &params).unwrap_err();
	/// assert!(replay.is_double_submission());
	/// ```
	pub fn check_request(&self, scope_key: &str, params: &HashMap<String, String>) -> Result<()> {
		let presented = params.get(&self.config.hidden_field_name).map(String::as_str);
		self.validate_and_consume(scope_key, presented)
	}

	pub fn state(&self, scope_key: &str) -> Result<TokenState> {
		Ok(self.store.state(scope_key)?)
	}

	/// Discard any outstanding token for `scope_key`
	pub fn invalidate(&self, scope_key: &str) -> Result<()> {
		self.store.invalidate(scope_key)?;
		tracing::debug!(scope_key, "invalidated double-submission token");
		Ok(())
	}

	/// Drop stored state for scope keys without a live token
	pub fn cleanup_idle(&self) -> Result<usize> {
		let removed = self.store.cleanup_idle()?;
		tracing::debug!(removed, "cleaned up idle double-submission slots");
		Ok(removed)
	}

	fn mismatch(&self, scope_key: &str, reason: MismatchReason) -> DoubleSubmitError {
		tracing::warn!(scope_key, %reason, "double-submission token mismatch");
		DoubleSubmitError::Mismatch {
			scope_key: scope_key.to_string(),
			reason,
		}
	}
}

impl std::fmt::Debug for DoubleSubmitGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DoubleSubmitGuard")
			.field("config", &self.config)
			.field("encrypting", &self.cipher.is_some())
			.finish_non_exhaustive()
	}
}

//! Token values and their generation

use rand::Rng;
use std::fmt;
use std::time::Instant;

/// Characters a generated token may contain (alphanumeric, never `=`)
pub const TOKEN_ALLOWED_CHARS: &[u8] =
	b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default generated token length
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// An opaque single-use token authorizing one commit for a scope key.
///
/// `Debug` hides the value so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	value: String,
	scope_key: String,
	issued_at: Instant,
}

impl Token {
	/// Create a token for the given conversation scope
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::Token;
	///
	/// let token = Token::new("abc123", "session-1");
	/// assert_eq!(token.value(), "abc123");
	/// assert_eq!(token.scope_key(), "session-1");
	/// ```
	pub fn new(value: impl Into<String>, scope_key: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			scope_key: scope_key.into(),
			issued_at: Instant::now(),
		}
	}

	pub fn value(&self) -> &str {
		&self.value
	}

	pub fn scope_key(&self) -> &str {
		&self.scope_key
	}

	pub fn issued_at(&self) -> Instant {
		self.issued_at
	}
}

impl fmt::Debug for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Token")
			.field("value", &"<redacted>")
			.field("scope_key", &self.scope_key)
			.finish()
	}
}

/// Lifecycle of the token slot for one scope key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
	/// Nothing has been issued yet (or it was explicitly invalidated)
	NoToken,
	/// A token is embedded in a rendered form and awaits its commit
	Issued,
	/// The last issued token has been validated and spent
	Consumed,
}

/// Capability producing unguessable token values
pub trait TokenGenerator: Send + Sync {
	/// Produce a fresh token value.
	///
	/// Implementations must never emit `=`; the embedded wire format splits on
	/// the first `=`.
	fn generate(&self) -> String;
}

/// Generator backed by the thread-local CSPRNG
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
	length: usize,
}

impl RandomTokenGenerator {
	/// Create a generator producing tokens of `length` characters
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::{RandomTokenGenerator, TokenGenerator};
	///
	/// let generator = RandomTokenGenerator::new(16);
	/// let value = generator.generate();
	/// assert_eq!(value.len(), 16);
	/// assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
	/// ```
	pub fn new(length: usize) -> Self {
		Self {
			length: length.max(1),
		}
	}

	pub fn length(&self) -> usize {
		self.length
	}
}

impl Default for RandomTokenGenerator {
	fn default() -> Self {
		Self::new(DEFAULT_TOKEN_LENGTH)
	}
}

impl TokenGenerator for RandomTokenGenerator {
	fn generate(&self) -> String {
		let mut rng = rand::thread_rng();
		(0..self.length)
			.map(|_| {
				let idx = rng.gen_range(0..TOKEN_ALLOWED_CHARS.len());
				TOKEN_ALLOWED_CHARS[idx] as char
			})
			.collect()
	}
}

impl<F> TokenGenerator for F
where
	F: Fn() -> String + Send + Sync,
{
	fn generate(&self) -> String {
		self()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_random_generator_length_and_alphabet() {
		let generator = RandomTokenGenerator::new(48);
		let value = generator.generate();

		assert_eq!(value.len(), 48);
		assert!(value.bytes().all(|b| TOKEN_ALLOWED_CHARS.contains(&b)));
		assert!(!value.contains('='));
	}

	#[test]
	fn test_random_generator_is_not_repeating() {
		let generator = RandomTokenGenerator::default();

		assert_ne!(generator.generate(), generator.generate());
	}

	#[test]
	fn test_zero_length_is_clamped() {
		let generator = RandomTokenGenerator::new(0);

		assert_eq!(generator.length(), 1);
		assert_eq!(generator.generate().len(), 1);
	}

	#[test]
	fn test_closure_generator() {
		let generator = || "fixed".to_string();

		assert_eq!(TokenGenerator::generate(&generator), "fixed");
	}

	#[test]
	fn test_debug_redacts_value() {
		let token = Token::new("secret-value", "session-1");
		let rendered = format!("{:?}", token);

		assert!(!rendered.contains("secret-value"));
		assert!(rendered.contains("session-1"));
	}
}

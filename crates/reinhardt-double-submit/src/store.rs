//! Persistence of the currently valid token per scope key
//!
//! A [`TokenStore`] holds at most one valid token per scope key. Replacing and
//! consuming must be serialized per key so a token can never be spent twice,
//! even when two requests of the same session race each other.
//!
//! [`InMemoryTokenStore`] keeps one mutex-guarded slot per key inside a
//! [`DashMap`], so unrelated sessions never contend on a shared lock.

use crate::token::{Token, TokenState};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;

/// Token store failures, reported separately from validation outcomes
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenStoreError {
	#[error("Token store unavailable: {0}")]
	Unavailable(String),
	#[error("Token store backend error: {0}")]
	Backend(String),
}

pub type StoreResult<T> = Result<T, TokenStoreError>;

/// What happened when a presented value was checked against the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
	/// The value matched the issued token, which is now spent
	Accepted,
	/// No token is outstanding: never issued, or already consumed
	NothingIssued,
	/// A token is outstanding but the value differs; the token was discarded
	Mismatch,
	/// The outstanding token outlived the store's TTL; it was discarded
	Expired,
}

/// Storage capability for double-submission tokens
pub trait TokenStore: Send + Sync {
	/// Store `token` as the only valid token of its scope key, returning
	/// whether a previously issued token was displaced.
	fn replace(&self, token: Token) -> StoreResult<bool>;

	/// Compare `presented` with the outstanding token and spend it on match.
	fn consume(&self, scope_key: &str, presented: &str) -> StoreResult<ConsumeOutcome>;

	/// Current lifecycle state for `scope_key`
	fn state(&self, scope_key: &str) -> StoreResult<TokenState>;

	/// Drop whatever is outstanding for `scope_key`
	fn invalidate(&self, scope_key: &str) -> StoreResult<()>;

	/// Reclaim storage held for keys with no live token, returning how many
	/// keys were dropped. Stores that expire entries on their own keep the
	/// default.
	fn cleanup_idle(&self) -> StoreResult<usize> {
		Ok(0)
	}
}

#[derive(Debug)]
struct Slot {
	state: TokenState,
	token: Option<Token>,
}

impl Slot {
	fn empty() -> Self {
		Self {
			state: TokenState::NoToken,
			token: None,
		}
	}

	fn discard(&mut self) {
		self.token = None;
		self.state = TokenState::NoToken;
	}

	fn is_idle(&self, ttl: Option<Duration>, now: Instant) -> bool {
		match (&self.token, ttl) {
			(None, _) => true,
			(Some(token), Some(ttl)) => now.duration_since(token.issued_at()) >= ttl,
			(Some(_), None) => false,
		}
	}
}

/// In-memory token store with per-key critical sections
///
/// # Examples
///
/// ```
/// use reinhardt_double_submit::{ConsumeOutcome, InMemoryTokenStore, Token, TokenStore};
///
/// let store = InMemoryTokenStore::new();
/// store.replace(Token::new("abc", "session-1")).unwrap();
///
/// assert_eq!(store.consume("session-1", "abc").unwrap(), ConsumeOutcome::Accepted);
/// assert_eq!(store.consume("session-1", "abc").unwrap(), ConsumeOutcome::NothingIssued);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
	slots: Arc<DashMap<String, Arc<Mutex<Slot>>>>,
	ttl: Option<Duration>,
}

impl InMemoryTokenStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Expire issued tokens after `ttl`
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::InMemoryTokenStore;
	/// use std::time::Duration;
	///
	/// let store = InMemoryTokenStore::new().with_ttl(Duration::from_secs(600));
	/// assert_eq!(store.ttl(), Some(Duration::from_secs(600)));
	/// ```
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);
		self
	}

	pub fn ttl(&self) -> Option<Duration> {
		self.ttl
	}

	/// Number of scope keys that currently have a slot
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	// The DashMap shard guard is released before the slot mutex is taken.
	fn slot(&self, scope_key: &str) -> Arc<Mutex<Slot>> {
		if let Some(slot) = self.slots.get(scope_key) {
			return Arc::clone(slot.value());
		}
		Arc::clone(
			self.slots
				.entry(scope_key.to_string())
				.or_insert_with(|| Arc::new(Mutex::new(Slot::empty())))
				.value(),
		)
	}

	// Only slots nobody else holds are dropped; a holder may be about to
	// issue into it.
	fn remove_if_unused(&self, scope_key: &str) {
		self.slots
			.remove_if(scope_key, |_, slot| Arc::strong_count(slot) == 1 && slot.lock().token.is_none());
	}

	fn is_expired(&self, token: &Token, now: Instant) -> bool {
		self.ttl
			.map(|ttl| now.duration_since(token.issued_at()) >= ttl)
			.unwrap_or(false)
	}
}

impl TokenStore for InMemoryTokenStore {
	fn replace(&self, token: Token) -> StoreResult<bool> {
		let slot = self.slot(token.scope_key());
		let mut slot = slot.lock();
		let displaced = slot.state == TokenState::Issued;
		slot.token = Some(token);
		slot.state = TokenState::Issued;
		Ok(displaced)
	}

	fn consume(&self, scope_key: &str, presented: &str) -> StoreResult<ConsumeOutcome> {
		let Some(slot) = self.slots.get(scope_key).map(|s| Arc::clone(s.value())) else {
			return Ok(ConsumeOutcome::NothingIssued);
		};
		let mut slot = slot.lock();

		let Some(issued) = slot.token.as_ref() else {
			return Ok(ConsumeOutcome::NothingIssued);
		};

		if self.is_expired(issued, Instant::now()) {
			slot.discard();
			return Ok(ConsumeOutcome::Expired);
		}

		let matches: bool = issued
			.value()
			.as_bytes()
			.ct_eq(presented.as_bytes())
			.into();

		if matches {
			slot.token = None;
			slot.state = TokenState::Consumed;
			Ok(ConsumeOutcome::Accepted)
		} else {
			slot.discard();
			Ok(ConsumeOutcome::Mismatch)
		}
	}

	fn state(&self, scope_key: &str) -> StoreResult<TokenState> {
		let Some(slot) = self.slots.get(scope_key).map(|s| Arc::clone(s.value())) else {
			return Ok(TokenState::NoToken);
		};
		let slot = slot.lock();
		Ok(slot.state)
	}

	fn invalidate(&self, scope_key: &str) -> StoreResult<()> {
		if let Some(slot) = self.slots.get(scope_key).map(|s| Arc::clone(s.value())) {
			slot.lock().discard();
		}
		self.remove_if_unused(scope_key);
		Ok(())
	}

	/// Drop slots whose token was spent, discarded or outlived the TTL
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::{InMemoryTokenStore, Token, TokenStore};
	///
	/// let store = InMemoryTokenStore::new();
	/// store.replace(Token::new("abc", "session-1")).unwrap();
	/// store.replace(Token::new("def", "session-2")).unwrap();
	/// store.consume("session-1", "abc").unwrap();
	///
	/// assert_eq!(store.cleanup_idle().unwrap(), 1);
	/// assert_eq!(store.len(), 1);
	/// ```
	fn cleanup_idle(&self) -> StoreResult<usize> {
		let now = Instant::now();
		let before = self.slots.len();
		self.slots
			.retain(|_, slot| Arc::strong_count(slot) > 1 || !slot.lock().is_idle(self.ttl, now));
		Ok(before.saturating_sub(self.slots.len()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_transitions() {
		let store = InMemoryTokenStore::new();
		assert_eq!(store.state("s").unwrap(), TokenState::NoToken);

		store.replace(Token::new("t1", "s")).unwrap();
		assert_eq!(store.state("s").unwrap(), TokenState::Issued);

		assert_eq!(store.consume("s", "t1").unwrap(), ConsumeOutcome::Accepted);
		assert_eq!(store.state("s").unwrap(), TokenState::Consumed);

		store.replace(Token::new("t2", "s")).unwrap();
		assert_eq!(store.state("s").unwrap(), TokenState::Issued);
	}

	#[test]
	fn test_replace_reports_displacement() {
		let store = InMemoryTokenStore::new();

		assert!(!store.replace(Token::new("t1", "s")).unwrap());
		assert!(store.replace(Token::new("t2", "s")).unwrap());
		assert_eq!(store.consume("s", "t1").unwrap(), ConsumeOutcome::Mismatch);
	}

	#[test]
	fn test_mismatch_discards_outstanding_token() {
		let store = InMemoryTokenStore::new();
		store.replace(Token::new("t1", "s")).unwrap();

		assert_eq!(store.consume("s", "forged").unwrap(), ConsumeOutcome::Mismatch);
		assert_eq!(store.consume("s", "t1").unwrap(), ConsumeOutcome::NothingIssued);
		assert_eq!(store.state("s").unwrap(), TokenState::NoToken);
	}

	#[test]
	fn test_unknown_scope_key() {
		let store = InMemoryTokenStore::new();

		assert_eq!(store.consume("missing", "x").unwrap(), ConsumeOutcome::NothingIssued);
		assert!(store.is_empty());
	}

	#[test]
	fn test_ttl_expiry() {
		let store = InMemoryTokenStore::new().with_ttl(Duration::ZERO);
		store.replace(Token::new("t1", "s")).unwrap();

		assert_eq!(store.consume("s", "t1").unwrap(), ConsumeOutcome::Expired);
		assert_eq!(store.state("s").unwrap(), TokenState::NoToken);
	}

	#[test]
	fn test_invalidate() {
		let store = InMemoryTokenStore::new();
		store.replace(Token::new("t1", "s")).unwrap();
		store.replace(Token::new("u1", "other")).unwrap();

		store.invalidate("s").unwrap();

		assert_eq!(store.state("s").unwrap(), TokenState::NoToken);
		assert_eq!(store.state("other").unwrap(), TokenState::Issued);
		assert_eq!(store.consume("s", "t1").unwrap(), ConsumeOutcome::NothingIssued);
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_invalidate_keeps_slot_in_use() {
		let store = InMemoryTokenStore::new();
		store.replace(Token::new("t1", "s")).unwrap();
		let held = store.slot("s");

		store.invalidate("s").unwrap();
		assert_eq!(store.len(), 1);

		drop(held);
		store.invalidate("s").unwrap();
		assert!(store.is_empty());
	}

	#[test]
	fn test_cleanup_idle_keeps_outstanding_tokens() {
		let store = InMemoryTokenStore::new();
		store.replace(Token::new("t1", "spent")).unwrap();
		store.replace(Token::new("t2", "live")).unwrap();
		store.consume("spent", "t1").unwrap();

		assert_eq!(store.cleanup_idle().unwrap(), 1);
		assert_eq!(store.state("spent").unwrap(), TokenState::NoToken);
		assert_eq!(store.state("live").unwrap(), TokenState::Issued);
	}

	#[test]
	fn test_cleanup_idle_drops_expired_tokens() {
		let store = InMemoryTokenStore::new().with_ttl(Duration::ZERO);
		store.replace(Token::new("t1", "s")).unwrap();

		assert_eq!(store.cleanup_idle().unwrap(), 1);
		assert!(store.is_empty());
	}
}

//! Optional encryption of hidden-field values
//!
//! Ciphertext layout is `nonce (12 bytes) || AES-256-GCM output`, encoded as
//! URL-safe base64 without padding so it survives form encoding untouched.

use aes_gcm::{
	Aes256Gcm, Nonce,
	aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

const NONCE_LENGTH: usize = 12;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CipherError {
	#[error("Encryption key must be at least 32 bytes, got {0}")]
	KeyTooShort(usize),
	#[error("Encryption failed: {0}")]
	Encrypt(String),
	#[error("Decryption failed: {0}")]
	Decrypt(String),
}

/// AES-256-GCM cipher for hidden values
#[derive(Clone)]
pub struct HiddenCipher {
	key: [u8; 32],
}

impl HiddenCipher {
	pub fn new(key: [u8; 32]) -> Self {
		Self { key }
	}

	/// Build from arbitrary key material, using the first 32 bytes
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::HiddenCipher;
	///
	/// assert!(HiddenCipher::from_key_bytes(&[7u8; 32]).is_ok());
	/// assert!(HiddenCipher::from_key_bytes(b"short").is_err());
	/// ```
	pub fn from_key_bytes(key: &[u8]) -> Result<Self, CipherError> {
		if key.len() < 32 {
			return Err(CipherError::KeyTooShort(key.len()));
		}
		let mut key_array = [0u8; 32];
		key_array.copy_from_slice(&key[..32]);
		Ok(Self::new(key_array))
	}

	/// Encrypt `plaintext` into a form-safe string
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::HiddenCipher;
	///
	/// let cipher = HiddenCipher::new([1u8; 32]);
	/// let sealed = cipher.encrypt("_token=abc").unwrap();
	/// assert_ne!(sealed, "_token=abc");
	/// assert_eq!(cipher.decrypt(&sealed).unwrap(), "_token=abc");
	/// ```
	pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
		let cipher = Aes256Gcm::new_from_slice(&self.key)
			.map_err(|e| CipherError::Encrypt(e.to_string()))?;

		let mut nonce_bytes = [0u8; NONCE_LENGTH];
		rand::thread_rng().fill_bytes(&mut nonce_bytes);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = cipher
			.encrypt(nonce, plaintext.as_bytes())
			.map_err(|e| CipherError::Encrypt(e.to_string()))?;

		let mut sealed = nonce_bytes.to_vec();
		sealed.extend_from_slice(&ciphertext);
		Ok(URL_SAFE_NO_PAD.encode(sealed))
	}

	pub fn decrypt(&self, sealed: &str) -> Result<String, CipherError> {
		let data = URL_SAFE_NO_PAD
			.decode(sealed)
			.map_err(|e| CipherError::Decrypt(e.to_string()))?;
		if data.len() < NONCE_LENGTH {
			return Err(CipherError::Decrypt(
				"Invalid encrypted data: too short".to_string(),
			));
		}

		let cipher = Aes256Gcm::new_from_slice(&self.key)
			.map_err(|e| CipherError::Decrypt(e.to_string()))?;
		let (nonce_bytes, ciphertext) = data.split_at(NONCE_LENGTH);
		let plaintext = cipher
			.decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
			.map_err(|e| CipherError::Decrypt(e.to_string()))?;

		String::from_utf8(plaintext).map_err(|e| CipherError::Decrypt(e.to_string()))
	}
}

impl std::fmt::Debug for HiddenCipher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HiddenCipher").finish_non_exhaustive()
	}
}

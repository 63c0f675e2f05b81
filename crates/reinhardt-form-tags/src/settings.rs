//! Form tag settings
//!
//! Loaded from the `[form_tags]` table of the project settings or built in
//! code. Every field has a default, so an empty table is valid.
//!
//! ```toml
//! submit_function_name = "app_submit"
//! popup_default_options = "width=400, height=300"
//! token_exempt_paths = ["/search"]
//!
//! [double_submit]
//! hidden_field_param_name = "nonce"
//! encrypt_hidden = true
//! ```

use crate::error::{FormTagError, Result};
use regex::Regex;
use reinhardt_double_submit::{DoubleSubmitConfig, DoubleSubmitGuard, HiddenCipher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// JavaScript identifier accepted for global names
const JS_IDENTIFIER_PATTERN: &str = r"^[A-Za-z_$][A-Za-z0-9_$]*$";

fn default_submit_function_name() -> String {
	"reinhardt_submit".to_string()
}

fn default_submission_registry_name() -> String {
	"__reinhardt_submissions".to_string()
}

fn default_submit_name_field() -> String {
	"_submit_name".to_string()
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTagSettings {
	/// Global client function invoked by every wired trigger
	#[serde(default = "default_submit_function_name")]
	pub submit_function_name: String,

	/// Global object holding per-form submission tables
	#[serde(default = "default_submission_registry_name")]
	pub submission_registry_name: String,

	/// Hidden field the client fills with the pressed trigger's name
	#[serde(default = "default_submit_name_field")]
	pub submit_name_field: String,

	/// Window options used when a popup trigger supplies none
	#[serde(default)]
	pub popup_default_options: Option<String>,

	/// Request paths on which no double-submission token is embedded
	#[serde(default)]
	pub token_exempt_paths: BTreeSet<String>,

	/// Token field naming and encryption
	#[serde(default)]
	pub double_submit: DoubleSubmitConfig,
}

impl Default for FormTagSettings {
	fn default() -> Self {
		Self {
			submit_function_name: default_submit_function_name(),
			submission_registry_name: default_submission_registry_name(),
			submit_name_field: default_submit_name_field(),
			popup_default_options: None,
			token_exempt_paths: BTreeSet::new(),
			double_submit: DoubleSubmitConfig::default(),
		}
	}
}

impl FormTagSettings {
	/// Parse settings from a TOML document
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::FormTagSettings;
	///
	/// let settings = FormTagSettings::from_toml(r#"
	/// popup_default_options = "width=400, height=300"
	///
	/// [double_submit]
	/// hidden_field_param_name = "nonce"
	/// "#).unwrap();
	///
	/// assert_eq!(settings.submit_function_name, "reinhardt_submit");
	/// assert_eq!(settings.popup_default_options.as_deref(), Some("width=400, height=300"));
	/// assert_eq!(settings.double_submit.hidden_field_param_name, "nonce");
	/// ```
	pub fn from_toml(content: &str) -> Result<Self> {
		let settings: Self =
			toml::from_str(content).map_err(|e| FormTagError::Settings(e.to_string()))?;
		settings.validate()?;
		Ok(settings)
	}

	pub fn with_popup_default_options(mut self, options: impl Into<String>) -> Self {
		self.popup_default_options = Some(options.into());
		self
	}

	pub fn with_submit_function_name(mut self, name: impl Into<String>) -> Self {
		self.submit_function_name = name.into();
		self
	}

	pub fn with_token_exempt_path(mut self, path: impl Into<String>) -> Self {
		self.token_exempt_paths.insert(path.into());
		self
	}

	pub fn with_double_submit(mut self, config: DoubleSubmitConfig) -> Self {
		self.double_submit = config;
		self
	}

	/// Check that generated script names are usable identifiers
	pub fn validate(&self) -> Result<()> {
		let identifier =
			Regex::new(JS_IDENTIFIER_PATTERN).map_err(|e| FormTagError::Settings(e.to_string()))?;
		for (field, value) in [
			("submit_function_name", &self.submit_function_name),
			("submission_registry_name", &self.submission_registry_name),
		] {
			if !identifier.is_match(value) {
				return Err(FormTagError::Settings(format!(
					"{} must be a JavaScript identifier: [{}]",
					field, value
				)));
			}
		}
		if self.submit_name_field.is_empty() {
			return Err(FormTagError::Settings(
				"submit_name_field must not be empty".to_string(),
			));
		}
		Ok(())
	}

	/// Build the token guard described by [`FormTagSettings::double_submit`]
	///
	/// `cipher` is required when `encrypt_hidden` is enabled.
	pub fn build_guard(&self, cipher: Option<HiddenCipher>) -> Result<DoubleSubmitGuard> {
		let builder = DoubleSubmitGuard::builder().config(self.double_submit.clone());
		let builder = match cipher {
			Some(cipher) => builder.cipher(cipher),
			None => builder,
		};
		Ok(builder.build()?)
	}

	pub(crate) fn is_token_exempt(&self, request_path: &str) -> bool {
		self.token_exempt_paths.contains(request_path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_toml_uses_defaults() {
		let settings = FormTagSettings::from_toml("").unwrap();

		assert_eq!(settings, FormTagSettings::default());
	}

	#[test]
	fn test_invalid_function_name() {
		let err = FormTagSettings::from_toml(r#"submit_function_name = "not valid""#).unwrap_err();

		assert!(matches!(err, FormTagError::Settings(_)));
	}

	#[test]
	fn test_malformed_toml() {
		assert!(FormTagSettings::from_toml("popup_default_options = ").is_err());
	}

	#[test]
	fn test_exempt_paths() {
		let settings = FormTagSettings::default().with_token_exempt_path("/search");

		assert!(settings.is_token_exempt("/search"));
		assert!(!settings.is_token_exempt("/commit"));
	}

	#[test]
	fn test_build_guard_requires_cipher_when_encrypting() {
		let settings = FormTagSettings::default()
			.with_double_submit(DoubleSubmitConfig::default().with_encrypt_hidden(true));

		assert!(settings.build_guard(None).is_err());
		assert!(settings.build_guard(Some(HiddenCipher::new([5u8; 32]))).is_ok());
	}
}

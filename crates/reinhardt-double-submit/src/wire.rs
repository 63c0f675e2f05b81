//! Hidden-field wire format
//!
//! One hidden field carries both the logical parameter name and the token as
//! `"<parameterName>=<tokenValue>"`, so deployments can rename the parameter
//! without touching the field's own name. Parsing splits on the first `=`.

/// A token as carried in the hidden field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedToken {
	pub param_name: String,
	pub value: String,
}

impl EmbeddedToken {
	pub fn new(param_name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			param_name: param_name.into(),
			value: value.into(),
		}
	}

	/// Format as `"<param_name>=<value>"`
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::EmbeddedToken;
	///
	/// assert_eq!(EmbeddedToken::new("p", "abc123").encode(), "p=abc123");
	/// ```
	pub fn encode(&self) -> String {
		format!("{}={}", self.param_name, self.value)
	}

	/// Split a wire value on its first `=`
	///
	/// Returns `None` when no `=` is present.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_double_submit::EmbeddedToken;
	///
	/// let parsed = EmbeddedToken::parse("p=abc123").unwrap();
	/// assert_eq!(parsed.param_name, "p");
	/// assert_eq!(parsed.value, "abc123");
	///
	/// assert!(EmbeddedToken::parse("no-separator").is_none());
	/// ```
	pub fn parse(raw: &str) -> Option<Self> {
		let (param_name, value) = raw.split_once('=')?;
		Some(Self::new(param_name, value))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_splits_on_first_separator_only() {
		let parsed = EmbeddedToken::parse("p=a=b").unwrap();

		assert_eq!(parsed.param_name, "p");
		assert_eq!(parsed.value, "a=b");
	}

	#[test]
	fn test_parse_empty_parts() {
		let parsed = EmbeddedToken::parse("=").unwrap();

		assert_eq!(parsed.param_name, "");
		assert_eq!(parsed.value, "");
	}
}

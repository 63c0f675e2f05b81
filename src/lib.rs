//! # Reinhardt Submission
//!
//! Form submission coordination and double-submission protection for
//! server-rendered pages.
//!
//! A single form may be submitted through many triggers: submit buttons,
//! links, popup windows and downloads. This crate collects those triggers
//! while the page renders, emits the hidden fields and client wiring the form
//! needs, and guarantees that a non-idempotent action is committed at most
//! once through a single-use token.
//!
//! ## Feature Flags
//!
//! - `tokens` - Double-submission tokens, stores and the validation guard
//! - `tags` - Form coordinator and trigger tags (implies `tokens`)
//! - `full` (default) - All features enabled
//!
//! ## Quick Example
//!
//! ```rust
//! use reinhardt_submission::prelude::*;
//! use std::collections::HashMap;
//!
//! // Render the confirmation page
//! let mut ctx = RenderContext::in_memory().with_token_scope("session-1");
//! ctx.declare_confirmation_page().unwrap();
//!
//! let form = FormTag::new("transfer");
//! form.open(&mut ctx).unwrap();
//! TriggerTag::new(TriggerKind::Submit, "commit")
//!     .with_target("/transfer/commit")
//!     .render(&mut ctx)
//!     .unwrap();
//! let page = form.close(&mut ctx).unwrap();
//!
//! // The browser posts the hidden token back on commit
//! let guard = ctx.guard();
//! let field = page.hidden_field(guard.hidden_field_name()).unwrap();
//! let mut params = HashMap::new();
//! params.insert(field.name.clone(), field.value.clone());
//!
//! assert!(guard.check_request("session-1", &params).is_ok());
//! assert!(guard.check_request("session-1", &params).unwrap_err().is_double_submission());
//! ```

#[cfg(feature = "tokens")]
pub mod tokens {
	//! Double-submission tokens
	pub use reinhardt_double_submit::*;
}

#[cfg(feature = "tags")]
pub mod forms {
	//! Form coordinator and tags
	pub use reinhardt_form_tags::*;
}

#[cfg(feature = "tokens")]
pub use reinhardt_double_submit::{
	DoubleSubmitConfig, DoubleSubmitError, DoubleSubmitGuard, HiddenCipher, InMemoryTokenStore,
	Token, TokenState, TokenStore,
};

#[cfg(feature = "tags")]
pub use reinhardt_form_tags::{
	FinalizationResult, FormScope, FormTag, FormTagError, FormTagSettings, RenderContext,
	SubmissionDescriptor, TriggerKind, TriggerTag,
};

/// Commonly used types
pub mod prelude {
	#[cfg(feature = "tokens")]
	pub use crate::{
		DoubleSubmitConfig, DoubleSubmitError, DoubleSubmitGuard, HiddenCipher, TokenState,
	};

	#[cfg(feature = "tags")]
	pub use crate::{
		FinalizationResult, FormTag, FormTagError, FormTagSettings, RenderContext,
		SubmissionDescriptor, TriggerKind, TriggerTag,
	};

	#[cfg(feature = "tags")]
	pub use reinhardt_form_tags::{
		CompositeKey, CompositeKeyTag, FieldNameRegistrar, InputTag, SubmissionRegistrar,
	};
}

//! # Reinhardt Form Tags
//!
//! Coordinates the submission triggers of server-rendered forms.
//!
//! One `<form>` element can be submitted in many ways: plain submit buttons,
//! links, popup windows, downloads. Each trigger is rendered independently,
//! yet the form needs one consistent picture of them to emit its hidden
//! fields, the client wiring, and the double-submission token.
//!
//! ## Features
//!
//! - **Explicit coordinator handle**: [`RenderContext`] is passed through the
//!   render call chain and owns at most one open [`FormScope`]
//! - **Capability traits**: tags depend on [`SubmissionRegistrar`] and
//!   [`FieldNameRegistrar`] only
//! - **Name collision checks**: triggers, inputs, remap targets and
//!   composite-key fields are validated as they are declared
//! - **CSP nonce mode**: inline handlers are replaced by binding statements
//!   in a nonce-tagged script block
//! - **Double-submission token**: issued once per request through
//!   [`reinhardt_double_submit`] and embedded where needed
//!
//! ## Example
//!
//! ```
//! use reinhardt_form_tags::{FormTag, InputTag, RenderContext, TriggerKind, TriggerTag};
//!
//! let mut ctx = RenderContext::in_memory().with_token_scope("session-1");
//! let form = FormTag::new("f1");
//!
//! form.open(&mut ctx).unwrap();
//! InputTag::text("amount").with_value("100").render(&mut ctx).unwrap();
//! TriggerTag::new(TriggerKind::Submit, "commit")
//!     .with_target("/transfer")
//!     .with_allow_double_submission(false)
//!     .render(&mut ctx)
//!     .unwrap();
//! let result = form.close(&mut ctx).unwrap();
//!
//! assert!(result.has_token());
//! assert_eq!(result.submissions[0].trigger_name(), "commit");
//! ```

pub mod context;
pub mod descriptor;
pub mod error;
pub mod finalize;
pub mod registrar;
pub mod scope;
pub mod script;
pub mod settings;
pub mod tags;

pub use context::{ConfirmationState, RenderContext};
pub use descriptor::{
	ActionKind, CompositeKey, ElementKind, ExtraParam, ParamRemap, PopupTarget,
	SubmissionDescriptor,
};
pub use error::{FormTagError, Result};
pub use finalize::{FinalizationResult, HiddenField, ScriptBlock};
pub use registrar::{FieldNameRegistrar, SubmissionRegistrar, TriggerWiring};
pub use scope::FormScope;
pub use settings::FormTagSettings;
pub use tags::{
	Attributes, CompositeKeyKind, CompositeKeyTag, FormTag, InputTag, TriggerKind, TriggerMarkup,
	TriggerTag,
};

//! Request-lifetime coordinator handle
//!
//! A [`RenderContext`] is built when a request starts rendering, passed by
//! `&mut` through every tag and dropped with the response. It owns the single
//! open [`FormScope`], the confirmation-page flag and the token issued for
//! the request, if any.
//!
//! ```text
//!   open_form("f1") ──▶ FormScope ──▶ triggers / inputs register
//!                                        │
//!   close_form() ◀───────────────────────┘
//!      ├─ collision checks against coordinator-owned names
//!      ├─ token decision (issue once per request, reuse after)
//!      └─ FinalizationResult { hidden_fields, script, ... }
//! ```

use crate::descriptor::SubmissionDescriptor;
use crate::error::{FormTagError, Result};
use crate::finalize::{self, EmbeddedField, FinalizationResult};
use crate::registrar::{FieldNameRegistrar, SubmissionRegistrar, TriggerWiring};
use crate::scope::FormScope;
use crate::script;
use crate::settings::FormTagSettings;
use reinhardt_double_submit::{DoubleSubmitGuard, HiddenCipher, Token};
use std::sync::Arc;

/// Whether the current render is the input step or the confirmation step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfirmationState {
	#[default]
	InputPage,
	ConfirmationPage,
}

impl ConfirmationState {
	pub fn is_confirmation_page(&self) -> bool {
		matches!(self, ConfirmationState::ConfirmationPage)
	}
}

/// Coordinator state for one request's render pass
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::{RenderContext, SubmissionRegistrar, SubmissionDescriptor};
///
/// let mut ctx = RenderContext::in_memory().with_token_scope("session-1");
/// ctx.open_form("f1").unwrap();
/// ctx.register_submission(
///     "submit",
///     SubmissionDescriptor::normal("commit", "/commit").with_allow_double_submission(false),
/// )
/// .unwrap();
///
/// let result = ctx.close_form().unwrap();
/// assert!(result.has_token());
/// assert!(result.hidden_field("_double_submit").unwrap().value.starts_with("_token="));
/// ```
#[derive(Debug)]
pub struct RenderContext {
	settings: Arc<FormTagSettings>,
	guard: Arc<DoubleSubmitGuard>,
	token_scope_key: Option<String>,
	request_path: String,
	csp_nonce: Option<String>,
	confirmation: ConfirmationState,
	open_form: Option<FormScope>,
	rendered_forms: Vec<String>,
	issued_token: Option<Token>,
}

impl RenderContext {
	pub fn new(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) -> Self {
		Self {
			settings,
			guard,
			token_scope_key: None,
			request_path: String::new(),
			csp_nonce: None,
			confirmation: ConfirmationState::default(),
			open_form: None,
			rendered_forms: Vec::new(),
			issued_token: None,
		}
	}

	/// Context whose guard is built from `settings.double_submit`
	///
	/// Use [`RenderContext::new`] instead to share one guard across requests.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::{FormTagSettings, RenderContext};
	///
	/// let settings = FormTagSettings::from_toml(
	///     "[double_submit]\nhidden_field_name = \"_once\"",
	/// )
	/// .unwrap();
	/// let ctx = RenderContext::from_settings(settings, None).unwrap();
	/// assert_eq!(ctx.guard().hidden_field_name(), "_once");
	/// ```
	pub fn from_settings(settings: FormTagSettings, cipher: Option<HiddenCipher>) -> Result<Self> {
		let guard = settings.build_guard(cipher)?;
		Ok(Self::new(Arc::new(settings), Arc::new(guard)))
	}

	/// Context with default settings and a private in-memory token store
	pub fn in_memory() -> Self {
		Self::new(
			Arc::new(FormTagSettings::default()),
			Arc::new(DoubleSubmitGuard::in_memory()),
		)
	}

	/// Conversation key tokens are issued under, usually the session id
	pub fn with_token_scope(mut self, scope_key: impl Into<String>) -> Self {
		self.token_scope_key = Some(scope_key.into());
		self
	}

	pub fn with_request_path(mut self, path: impl Into<String>) -> Self {
		self.request_path = path.into();
		self
	}

	/// Switch to nonce mode: no inline handlers, bindings go to a script block
	pub fn with_csp_nonce(mut self, nonce: impl Into<String>) -> Self {
		self.csp_nonce = Some(nonce.into());
		self
	}

	pub fn settings(&self) -> &FormTagSettings {
		&self.settings
	}

	pub fn guard(&self) -> &DoubleSubmitGuard {
		&self.guard
	}

	pub fn request_path(&self) -> &str {
		&self.request_path
	}

	pub fn csp_nonce(&self) -> Option<&str> {
		self.csp_nonce.as_deref()
	}

	/// Token issued during this request, shared by every form that embeds one
	pub fn issued_token(&self) -> Option<&Token> {
		self.issued_token.as_ref()
	}

	/// Names of the forms closed so far, in render order
	pub fn rendered_forms(&self) -> &[String] {
		&self.rendered_forms
	}

	/// Mark this render as the confirmation step
	///
	/// # Errors
	///
	/// [`FormTagError::ConfirmationAlreadyDeclared`] on a second call and
	/// [`FormTagError::ConfirmationAfterRender`] once any form has been opened.
	pub fn declare_confirmation_page(&mut self) -> Result<()> {
		if self.confirmation.is_confirmation_page() {
			return Err(FormTagError::ConfirmationAlreadyDeclared);
		}
		let started = self
			.open_form
			.as_ref()
			.map(|scope| scope.form_name().to_string())
			.or_else(|| self.rendered_forms.first().cloned());
		if let Some(form_name) = started {
			return Err(FormTagError::ConfirmationAfterRender { form_name });
		}
		self.confirmation = ConfirmationState::ConfirmationPage;
		Ok(())
	}

	pub fn confirmation_state(&self) -> ConfirmationState {
		self.confirmation
	}

	pub fn is_confirmation_page(&self) -> bool {
		self.confirmation.is_confirmation_page()
	}

	/// Open a form scope
	///
	/// # Errors
	///
	/// - [`FormTagError::MissingName`] for an empty name
	/// - [`FormTagError::InvalidNesting`] while another form is open
	/// - [`FormTagError::ConflictingName`] when a form of that name was
	///   already rendered on this page
	pub fn open_form(&mut self, form_name: &str) -> Result<&mut FormScope> {
		if form_name.is_empty() {
			return Err(FormTagError::MissingName { tag: "form" });
		}
		if let Some(open) = &self.open_form {
			return Err(FormTagError::InvalidNesting {
				open: open.form_name().to_string(),
				attempted: form_name.to_string(),
			});
		}
		if self.rendered_forms.iter().any(|name| name == form_name) {
			return Err(FormTagError::ConflictingName {
				form_name: form_name.to_string(),
				existing: form_name.to_string(),
				incoming: form_name.to_string(),
			});
		}
		Ok(self.open_form.insert(FormScope::new(form_name.to_string())))
	}

	pub fn form(&self) -> Option<&FormScope> {
		self.open_form.as_ref()
	}

	pub fn form_mut(&mut self) -> Option<&mut FormScope> {
		self.open_form.as_mut()
	}

	/// Discard the open scope without producing any output
	pub fn abort_form(&mut self) -> Option<FormScope> {
		let scope = self.open_form.take();
		if let Some(scope) = &scope {
			tracing::debug!(form_name = %scope.form_name(), "aborted form scope");
		}
		scope
	}

	/// Finalize the open form
	///
	/// The scope is consumed whether or not finalization succeeds.
	pub fn close_form(&mut self) -> Result<FinalizationResult> {
		let scope = self.open_form.take().ok_or(FormTagError::UnclosedScope)?;
		self.rendered_forms.push(scope.form_name().to_string());

		let embed_token = self.wants_token(&scope);
		self.check_owned_names(&scope, embed_token)?;

		let token_field = if embed_token {
			let token = self.request_token(scope.form_name())?;
			Some(EmbeddedField {
				name: self.guard.hidden_field_name().to_string(),
				value: self.guard.embed(&token)?,
				token,
			})
		} else {
			None
		};

		let result = finalize::assemble(
			scope,
			&self.settings,
			self.is_confirmation_page(),
			token_field,
			self.csp_nonce.as_deref(),
		);
		tracing::debug!(
			form_name = %result.form_name,
			submissions = result.submissions.len(),
			hidden_fields = result.hidden_fields.len(),
			token = result.has_token(),
			"closed form scope"
		);
		Ok(result)
	}

	fn wants_token(&self, scope: &FormScope) -> bool {
		match scope.use_token() {
			Some(forced) => forced,
			None => {
				let required = self.is_confirmation_page()
					|| scope
						.submissions()
						.iter()
						.any(|descriptor| !descriptor.allow_double_submission());
				required && !self.settings.is_token_exempt(&self.request_path)
			}
		}
	}

	fn check_owned_names(&self, scope: &FormScope, embed_token: bool) -> Result<()> {
		let mut owned = Vec::new();
		if scope
			.submissions()
			.iter()
			.any(SubmissionDescriptor::needs_client_wiring)
		{
			owned.push(self.settings.submit_name_field.as_str());
		}
		if embed_token {
			owned.push(self.guard.hidden_field_name());
		}
		if let Some(name) = owned.into_iter().find(|name| scope.is_registered(name)) {
			return Err(scope.conflict(name, name));
		}

		// Inputs declared after a trigger can still shadow its remap targets.
		for descriptor in scope.submissions() {
			if let Some(remap) = descriptor
				.param_name_remaps()
				.iter()
				.find(|remap| scope.is_registered(&remap.renamed))
			{
				return Err(scope.conflict(&remap.renamed, descriptor.trigger_name()));
			}
		}
		Ok(())
	}

	fn request_token(&mut self, form_name: &str) -> Result<Token> {
		if let Some(token) = &self.issued_token {
			return Ok(token.clone());
		}
		let scope_key =
			self.token_scope_key
				.as_deref()
				.ok_or_else(|| FormTagError::MissingTokenScope {
					form_name: form_name.to_string(),
				})?;
		let token = self.guard.issue(scope_key)?;
		self.issued_token = Some(token.clone());
		Ok(token)
	}

	fn wiring_for(&self, descriptor: &SubmissionDescriptor) -> TriggerWiring {
		if !descriptor.needs_client_wiring() {
			TriggerWiring::None
		} else if self.csp_nonce.is_some() {
			TriggerWiring::Deferred
		} else {
			TriggerWiring::Inline {
				onclick: script::inline_handler(&self.settings.submit_function_name),
			}
		}
	}
}

impl FieldNameRegistrar for RenderContext {
	fn register_field(&mut self, tag: &'static str, name: &str, value: Option<&str>) -> Result<()> {
		let scope = self
			.open_form
			.as_mut()
			.ok_or(FormTagError::InvalidLocation { tag })?;
		match value {
			Some(value) => scope.register_input_value(tag, name, value),
			None => scope.register_input(tag, name),
		}
	}

	fn register_composite_fields(
		&mut self,
		tag: &'static str,
		name_prefix: &str,
		key_names: &[String],
	) -> Result<()> {
		self.open_form
			.as_mut()
			.ok_or(FormTagError::InvalidLocation { tag })?
			.register_composite_fields(tag, name_prefix, key_names)
	}
}

impl SubmissionRegistrar for RenderContext {
	fn ensure_in_form(&self, tag: &'static str) -> Result<()> {
		match self.open_form {
			Some(_) => Ok(()),
			None => Err(FormTagError::InvalidLocation { tag }),
		}
	}

	fn form_name(&self) -> Option<&str> {
		self.open_form.as_ref().map(FormScope::form_name)
	}

	fn register_submission(
		&mut self,
		tag: &'static str,
		descriptor: SubmissionDescriptor,
	) -> Result<TriggerWiring> {
		let wiring = self.wiring_for(&descriptor);
		let binding = matches!(wiring, TriggerWiring::Deferred).then(|| {
			script::binding_statement(
				descriptor.element_kind(),
				descriptor.trigger_name(),
				&self.settings.submit_function_name,
			)
		});

		let scope = self
			.open_form
			.as_mut()
			.ok_or(FormTagError::InvalidLocation { tag })?;
		scope.register_submission(tag, descriptor)?;
		if let Some(statement) = binding {
			scope.push_inline_script(statement);
		}
		Ok(wiring)
	}

	fn popup_default_options(&self) -> Option<&str> {
		self.settings.popup_default_options.as_deref()
	}

	fn is_confirmation_page(&self) -> bool {
		self.confirmation.is_confirmation_page()
	}
}

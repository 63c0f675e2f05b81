use reinhardt_double_submit::DoubleSubmitError;

/// Errors raised while declaring or finalizing a form
///
/// Everything except [`FormTagError::Token`] is an authoring mistake in the
/// page: it aborts the current render pass and nothing else.
#[derive(Debug, thiserror::Error)]
pub enum FormTagError {
	#[error("The `{tag}` tag must be placed inside a form tag")]
	InvalidLocation { tag: &'static str },

	#[error("Form [{attempted}] cannot be nested inside form [{open}]")]
	InvalidNesting { open: String, attempted: String },

	#[error("The `{tag}` tag requires a non-empty name attribute")]
	MissingName { tag: &'static str },

	#[error("The `{tag}` tag requires the `{attribute}` attribute")]
	MissingAttribute {
		tag: &'static str,
		attribute: &'static str,
	},

	#[error("The `{tag}` tag name [{name}] contains {character:?}, which cannot appear in a trigger name")]
	UnsafeName {
		tag: &'static str,
		name: String,
		character: char,
	},

	#[error(
		"Name [{incoming}] conflicts with already declared name [{existing}] in form [{form_name}]"
	)]
	ConflictingName {
		form_name: String,
		existing: String,
		incoming: String,
	},

	#[error(
		"name attribute must differ from every composite key field name. name=[{name}], namePrefix=[{name_prefix}], keyNames=[{}]",
		.key_names.join(", ")
	)]
	NameRemapConflict {
		name: String,
		name_prefix: String,
		/// Sorted key names
		key_names: Vec<String>,
	},

	#[error("Form close was requested but no form is open")]
	UnclosedScope,

	#[error("This request has already been declared a confirmation page")]
	ConfirmationAlreadyDeclared,

	#[error("The confirmation page must be declared before form [{form_name}] is rendered")]
	ConfirmationAfterRender { form_name: String },

	#[error(
		"Form [{form_name}] requires a double-submission token but the request has no token scope key"
	)]
	MissingTokenScope { form_name: String },

	#[error("Invalid form tag settings: {0}")]
	Settings(String),

	#[error(transparent)]
	Token(#[from] DoubleSubmitError),
}

pub type Result<T> = std::result::Result<T, FormTagError>;

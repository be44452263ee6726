//! Declarative field constraints checked after a body deserializes.
//!
//! Field presence is serde's job: non-`Option` fields are required. [`Validate`] covers what
//! serde cannot express (emptiness, numeric ranges, formats).

// self
use crate::_prelude::*;

/// Types whose decoded values carry field constraints.
pub trait Validate {
	/// Records every violated constraint into `v`.
	fn validate(&self, v: &mut Violations);

	/// Runs [`Validate::validate`] and collapses the outcome.
	fn check(&self) -> Result<(), ValidationErrors> {
		let mut v = Violations::default();

		self.validate(&mut v);

		v.finish()
	}
}
impl<T> Validate for Vec<T>
where
	T: Validate,
{
	fn validate(&self, v: &mut Violations) {
		v.each("", self);
	}
}
impl<T> Validate for Option<T>
where
	T: Validate,
{
	fn validate(&self, v: &mut Violations) {
		if let Some(inner) = self {
			inner.validate(v);
		}
	}
}
impl Validate for serde_json::Value {
	fn validate(&self, _: &mut Violations) {}
}

/// A single violated constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
	/// Dotted path of the offending field (`items[1].age`).
	pub field: String,
	/// Human-readable constraint description.
	pub message: String,
}
impl Display for FieldViolation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.field, self.message)
	}
}

/// Every violation found in one value, rendered joined by `"; "`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<FieldViolation>);
impl ValidationErrors {
	/// Returns `true` when `field` has at least one violation.
	pub fn has_field(&self, field: &str) -> bool {
		self.0.iter().any(|violation| violation.field == field)
	}
}
impl Display for ValidationErrors {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for (idx, violation) in self.0.iter().enumerate() {
			if idx > 0 {
				f.write_str("; ")?;
			}

			Display::fmt(violation, f)?;
		}

		Ok(())
	}
}
impl StdError for ValidationErrors {}

/// Collector passed to [`Validate::validate`].
#[derive(Debug, Default)]
pub struct Violations {
	prefix: String,
	found: Vec<FieldViolation>,
}
impl Violations {
	/// Records a violation for `field` with a free-form message.
	pub fn push(&mut self, field: &str, message: impl Into<String>) {
		let field = self.path(field);

		self.found.push(FieldViolation { field, message: message.into() });
	}

	/// `value` must not be empty or whitespace only.
	pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
		if value.trim().is_empty() {
			self.push(field, "is required");
		}

		self
	}

	/// `value` must lie within `min..=max`.
	pub fn range<N>(&mut self, field: &str, value: N, min: N, max: N) -> &mut Self
	where
		N: PartialOrd + Display,
	{
		if value < min || value > max {
			self.push(field, format!("must be between {min} and {max}, got {value}"));
		}

		self
	}

	/// `value` must be at least `min`.
	pub fn min<N>(&mut self, field: &str, value: N, min: N) -> &mut Self
	where
		N: PartialOrd + Display,
	{
		if value < min {
			self.push(field, format!("must be at least {min}, got {value}"));
		}

		self
	}

	/// `value` must look like `local@domain.tld`; empty values are skipped.
	pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
		if !value.is_empty() && !looks_like_email(value) {
			self.push(field, "must be a valid email address");
		}

		self
	}

	/// Validates a nested value with its violations prefixed by `field`.
	pub fn nested<T>(&mut self, field: &str, value: &T) -> &mut Self
	where
		T: ?Sized + Validate,
	{
		let scoped = self.path(field);
		let saved = std::mem::replace(&mut self.prefix, scoped);

		value.validate(self);

		self.prefix = saved;

		self
	}

	/// Validates each element with violations prefixed by `field[idx]`.
	pub fn each<T>(&mut self, field: &str, values: &[T]) -> &mut Self
	where
		T: Validate,
	{
		for (idx, value) in values.iter().enumerate() {
			let scoped = format!("{}[{idx}]", self.path(field));
			let saved = std::mem::replace(&mut self.prefix, scoped);

			value.validate(self);

			self.prefix = saved;
		}

		self
	}

	/// Returns `Ok` when nothing was recorded.
	pub fn finish(self) -> Result<(), ValidationErrors> {
		if self.found.is_empty() { Ok(()) } else { Err(ValidationErrors(self.found)) }
	}

	fn path(&self, field: &str) -> String {
		match (self.prefix.is_empty(), field.is_empty()) {
			(true, _) => field.to_owned(),
			(false, true) => self.prefix.clone(),
			(false, false) => format!("{}.{field}", self.prefix),
		}
	}
}

fn looks_like_email(value: &str) -> bool {
	let Some((local, domain)) = value.split_once('@') else {
		return false;
	};

	!local.is_empty()
		&& !domain.contains('@')
		&& !value.chars().any(char::is_whitespace)
		&& domain.split('.').count() >= 2
		&& domain.split('.').all(|label| !label.is_empty())
}

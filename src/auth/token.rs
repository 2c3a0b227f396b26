//! Redacted session token wrapper used to look sessions up.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Opaque session credential that keeps its value out of logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);
impl SessionToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Stable base64 (no padding) SHA-256 digest, safe to record in spans.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.0.as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}
}
impl AsRef<str> for SessionToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SessionToken").field(&"<redacted>").finish()
	}
}
impl Display for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

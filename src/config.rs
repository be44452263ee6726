//! Startup configuration file.
//!
//! ```json
//! {
//!   "logger": { "max_body_length": 1000, "exclude_urls": ["/health"] },
//!   "token_clients": [{ "key": "partner-auth", "basepath": "https://auth.partner.com/token" }],
//!   "token_sources": [{
//!     "key": "partner-oauth", "client_key": "partner-auth",
//!     "client_id": "id", "client_secret": "secret", "scopes": ["read", "write"]
//!   }],
//!   "clients": [{
//!     "key": "partner-api", "basepath": "https://api.partner.com",
//!     "timeout": 10, "token_source_key": "partner-oauth"
//!   }]
//! }
//! ```

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	auth::TokenSourceConfig,
	client::ClientConfig,
	error::ConfigError,
	obs::LogConfig,
	registry::Registry,
};

/// Outbound HTTP section of the service configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
	/// Logging settings; defaults apply when absent.
	#[serde(default)]
	pub logger: Option<LogConfig>,
	/// Clients used only by token sources to reach token endpoints.
	#[serde(default)]
	pub token_clients: Vec<ClientConfig>,
	/// Token sources, each bound to one of `token_clients`.
	#[serde(default)]
	pub token_sources: Vec<TokenSourceConfig>,
	/// Application clients, optionally authenticated by one of `token_sources`.
	#[serde(default)]
	pub clients: Vec<ClientConfig>,
}
impl Config {
	/// Reads and parses a JSON configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = std::fs::read(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_slice(&raw)
	}

	/// Parses a JSON configuration document; errors carry the JSON path of the offending value.
	pub fn from_slice(raw: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(raw);

		Ok(serde_path_to_error::deserialize(&mut de)?)
	}

	/// Fails naming the first of `keys` that no configured client uses.
	pub fn require_clients<I, S>(&self, keys: I) -> Result<(), ConfigError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for key in keys {
			let key = key.as_ref();

			if !self.clients.iter().any(|client| client.key == key) {
				return Err(ConfigError::RequiredClient { key: key.to_owned() });
			}
		}

		Ok(())
	}

	/// Builds the registry: token clients, then token sources, then clients.
	///
	/// The first failure aborts startup.
	pub fn into_registry(self) -> Result<Registry> {
		let mut registry = Registry::new(self.logger.unwrap_or_default());

		registry.register_clients(self.token_clients)?;
		registry.register_token_sources(self.token_sources)?;
		registry.register_clients(self.clients)?;

		Ok(registry)
	}
}

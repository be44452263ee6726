//! Explicit registries of clients and token sources.
//!
//! Registration happens during single-threaded startup through `&mut` access; request traffic
//! only needs `&Registry`, so lookups are plain map reads with no locking.

// self
use crate::{
	_prelude::*,
	auth::{TokenSource, TokenSourceConfig},
	client::{Client, ClientConfig},
	error::ConfigError,
	obs::LogConfig,
};

/// Key → [`Client`] mapping.
#[derive(Debug, Default)]
pub struct ClientRegistry(HashMap<String, Arc<Client>>);
impl ClientRegistry {
	/// Inserts `client`, replacing any client previously registered under its key.
	pub fn insert(&mut self, client: Arc<Client>) {
		self.0.insert(client.key().to_owned(), client);
	}

	/// Returns the client registered under `key`.
	///
	/// Repeated lookups without an intervening registration return the same `Arc`.
	pub fn lookup(&self, key: &str) -> Result<Arc<Client>> {
		self.get(key).cloned().ok_or_else(|| Error::ClientNotRegistered { key: key.to_owned() })
	}

	/// Returns the client registered under `key`, if any.
	pub fn get(&self, key: &str) -> Option<&Arc<Client>> {
		self.0.get(key)
	}

	/// Number of registered clients.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Key → [`TokenSource`] mapping.
#[derive(Debug, Default)]
pub struct TokenSourceRegistry(HashMap<String, Arc<TokenSource>>);
impl TokenSourceRegistry {
	/// Inserts `source`, replacing any source previously registered under its key.
	pub fn insert(&mut self, source: Arc<TokenSource>) {
		self.0.insert(source.key().to_owned(), source);
	}

	/// Returns the token source registered under `key`, if any.
	pub fn get(&self, key: &str) -> Option<&Arc<TokenSource>> {
		self.0.get(key)
	}

	/// Number of registered token sources.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Process-wide outbound HTTP state, built once at startup and shared by reference.
#[derive(Debug, Default)]
pub struct Registry {
	log: Arc<LogConfig>,
	clients: ClientRegistry,
	token_sources: TokenSourceRegistry,
}
impl Registry {
	/// Creates an empty registry whose transport chains log with `log`.
	pub fn new(log: LogConfig) -> Self {
		Self { log: Arc::new(log), ..Default::default() }
	}

	/// Logging settings shared by every chain built from this registry.
	pub fn log_config(&self) -> &Arc<LogConfig> {
		&self.log
	}

	/// Registered clients.
	pub fn clients(&self) -> &ClientRegistry {
		&self.clients
	}

	/// Registered token sources.
	pub fn token_sources(&self) -> &TokenSourceRegistry {
		&self.token_sources
	}

	/// Builds a client from `config` and registers it, replacing any client with the same key.
	///
	/// A referenced token source must already be registered. The replaced client, if any, is
	/// dropped whole; nothing carries over from its configuration.
	pub fn register_client(&mut self, config: ClientConfig) -> Result<Arc<Client>> {
		let token_source = match &config.token_source_key {
			Some(key) => Some(
				self.token_sources
					.get(key)
					.cloned()
					.ok_or_else(|| ConfigError::MissingTokenSource { key: key.clone() })?,
			),
			None => None,
		};
		let client = Arc::new(Client::new(config, token_source, Arc::clone(&self.log))?);

		self.clients.insert(Arc::clone(&client));

		Ok(client)
	}

	/// Registers `configs` in order, stopping at the first failure.
	///
	/// Clients registered before the failure stay registered.
	pub fn register_clients<I>(&mut self, configs: I) -> Result<()>
	where
		I: IntoIterator<Item = ClientConfig>,
	{
		for config in configs {
			self.register_client(config)?;
		}

		Ok(())
	}

	/// Builds a token source bound to an already registered client and registers it.
	///
	/// The source keeps the client it was bound to, even if that key is re-registered later.
	pub fn register_token_source(&mut self, config: TokenSourceConfig) -> Result<Arc<TokenSource>> {
		let client = self
			.clients
			.get(&config.client_key)
			.cloned()
			.ok_or_else(|| ConfigError::MissingClient { key: config.client_key.clone() })?;
		let source = Arc::new(TokenSource::new(config, client));

		self.token_sources.insert(Arc::clone(&source));

		Ok(source)
	}

	/// Registers `configs` in order, stopping at the first failure.
	pub fn register_token_sources<I>(&mut self, configs: I) -> Result<()>
	where
		I: IntoIterator<Item = TokenSourceConfig>,
	{
		for config in configs {
			self.register_token_source(config)?;
		}

		Ok(())
	}

	/// Returns the client registered under `key`.
	pub fn client(&self, key: &str) -> Result<Arc<Client>> {
		self.clients.lookup(key)
	}

	/// Returns the token source registered under `key`, if any.
	pub fn token_source(&self, key: &str) -> Option<Arc<TokenSource>> {
		self.token_sources.get(key).cloned()
	}
}

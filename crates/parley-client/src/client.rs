use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parley_cache::StateCache;
use parley_common::ClientConfig;
use parley_core::{Channel, Guild, GuildMember, Message, Presence, Role, Snowflake, User};
use parley_gateway::dispatch::HandlerResult;
use parley_gateway::stream::{ConnectionState, EventStream, EventStreamHandle};
use parley_gateway::transport::{Connector, WsConnector};
use parley_gateway::{Dispatcher, Event, EventKind, GatewayError};
use parley_http::{EditChannel, RestClient};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::ClientError;

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Configures a [`Client`] beyond the plain config struct
///
/// The gateway url and connector overrides exist so a client can be pointed
/// at something other than the discovered production gateway.
pub struct ClientBuilder {
    config: ClientConfig,
    gateway_url: Option<String>,
    connector: Option<Arc<dyn Connector>>,
    ready_timeout: Duration,
}

impl ClientBuilder {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            gateway_url: None,
            connector: None,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    /// Connect to this url instead of asking the REST API for one
    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Use a custom transport connector
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// How long `start` waits for the first session snapshot
    #[must_use]
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Client, ClientError> {
        self.config.validate()?;
        let rest = RestClient::new(&self.config.http, &self.config.token)?;
        Ok(Client {
            config: self.config,
            gateway_url: self.gateway_url,
            connector: self.connector.unwrap_or_else(|| Arc::new(WsConnector)),
            ready_timeout: self.ready_timeout,
            cache: Arc::new(StateCache::new()),
            dispatcher: Arc::new(Dispatcher::new()),
            rest: Arc::new(rest),
            running: Mutex::new(None),
        })
    }
}

struct Running {
    handle: EventStreamHandle,
    supervisor: JoinHandle<Result<(), GatewayError>>,
}

/// The session manager: one live connection, its cache, and the REST surface
pub struct Client {
    config: ClientConfig,
    gateway_url: Option<String>,
    connector: Arc<dyn Connector>,
    ready_timeout: Duration,
    cache: Arc<StateCache>,
    dispatcher: Arc<Dispatcher>,
    rest: Arc<RestClient>,
    running: Mutex<Option<Running>>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        ClientBuilder::new(config).build()
    }

    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Connect and block until the first session snapshot is in the cache
    ///
    /// Credentials are validated up front with a REST call, so a bad token
    /// fails here instead of looping through gateway reconnects.
    pub async fn start(&self) -> Result<(), ClientError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(ClientError::AlreadyStarted);
        }

        let url = match &self.gateway_url {
            Some(url) => url.clone(),
            None => {
                let info = self.rest.get_gateway_bot().await?;
                tracing::debug!(
                    url = %info.url,
                    recommended_shards = info.shards,
                    "gateway discovered"
                );
                info.url
            }
        };

        let (stream, handle) = EventStream::new(
            self.config.clone(),
            url,
            Arc::clone(&self.connector),
            Arc::clone(&self.cache),
            Arc::clone(&self.dispatcher),
        );
        let supervisor = tokio::spawn(stream.connect());

        if !handle.wait_ready(self.ready_timeout).await {
            handle.close();
            // surface a fatal stream error over the bare timeout if there is one
            if supervisor.is_finished() {
                if let Ok(Err(e)) = supervisor.await {
                    return Err(e.into());
                }
            } else {
                supervisor.abort();
            }
            return Err(ClientError::ReadyTimeout(self.ready_timeout));
        }

        tracing::info!("client started");
        *running = Some(Running { handle, supervisor });
        Ok(())
    }

    /// Close the stream and wait for it to wind down; idempotent
    ///
    /// In-flight handler tasks are not awaited; they finish on their own.
    pub async fn stop(&self) -> Result<(), ClientError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        running.handle.close();
        match running.supervisor.await {
            Ok(result) => result?,
            Err(e) if e.is_panic() => {
                tracing::error!("event stream task panicked during shutdown");
            }
            Err(_) => {}
        }
        tracing::info!("client stopped");
        Ok(())
    }

    /// Current connection state, `Disconnected` when never started
    pub async fn state(&self) -> ConnectionState {
        match self.running.lock().await.as_ref() {
            Some(running) => running.handle.state(),
            None => ConnectionState::Disconnected,
        }
    }

    // === Handler registration ===

    pub fn on<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.dispatcher.on(kind, handler);
    }

    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&Event, &anyhow::Error) + Send + Sync + 'static,
    {
        self.dispatcher.set_error_hook(hook);
    }

    /// Wait for the first event matching `predicate`, up to `timeout`
    pub async fn wait_for<F>(&self, predicate: F, timeout: Duration) -> Option<Event>
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.dispatcher.wait_for(predicate, timeout).await
    }

    // === Cached reads ===

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.cache.current_user()
    }

    #[must_use]
    pub fn guild(&self, id: Snowflake) -> Option<Guild> {
        self.cache.guild(id)
    }

    #[must_use]
    pub fn channel(&self, id: Snowflake) -> Option<Channel> {
        self.cache.channel(id)
    }

    #[must_use]
    pub fn user(&self, id: Snowflake) -> Option<User> {
        self.cache.user(id)
    }

    #[must_use]
    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<GuildMember> {
        self.cache.member(guild_id, user_id)
    }

    #[must_use]
    pub fn role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        self.cache.role(guild_id, role_id)
    }

    #[must_use]
    pub fn presence(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Presence> {
        self.cache.presence(guild_id, user_id)
    }

    #[must_use]
    pub fn guilds(&self) -> Vec<Guild> {
        self.cache.guilds()
    }

    #[must_use]
    pub fn guild_channels(&self, guild_id: Snowflake) -> Vec<Channel> {
        self.cache.guild_channels(guild_id)
    }

    #[must_use]
    pub fn guild_roles(&self, guild_id: Snowflake) -> Vec<Role> {
        self.cache.guild_roles(guild_id)
    }

    // === Mutations (REST; the cache catches up via the stream) ===

    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        content: &str,
    ) -> Result<Message, ClientError> {
        Ok(self.rest.create_message(channel_id, content).await?)
    }

    pub async fn edit_channel(
        &self,
        channel_id: Snowflake,
        edit: &EditChannel,
    ) -> Result<Channel, ClientError> {
        Ok(self.rest.edit_channel(channel_id, edit).await?)
    }

    pub async fn delete_channel(&self, channel_id: Snowflake) -> Result<Channel, ClientError> {
        Ok(self.rest.delete_channel(channel_id).await?)
    }

    /// Fetch a channel from the API, bypassing the cache
    pub async fn fetch_channel(&self, channel_id: Snowflake) -> Result<Channel, ClientError> {
        Ok(self.rest.get_channel(channel_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Intents;

    fn client() -> Client {
        Client::new(ClientConfig::new("token", Intents::non_privileged())).unwrap()
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = ClientConfig::new("", Intents::non_privileged());
        assert!(matches!(
            Client::new(config),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let client = client();
        assert!(client.stop().await.is_ok());
        assert!(client.stop().await.is_ok());
        assert_eq!(client.state().await, ConnectionState::Disconnected);
    }

    #[test]
    fn test_reads_before_start_return_empty() {
        let client = client();
        assert!(client.current_user().is_none());
        assert!(client.guild(Snowflake::new(1)).is_none());
        assert!(client.guilds().is_empty());
    }
}

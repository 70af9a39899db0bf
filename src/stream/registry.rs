//! Stream connection registry.
//!
//! A registry owns zero or one live connection per [`ConnectionKey`]. Each
//! connection is a Tokio task that reads the transport, decodes messages and
//! forwards them over a bounded channel to the consumer. Opening a key that is
//! already live supersedes the old connection. The map only ever holds live
//! connections: explicit close and error termination both remove the entry.
//!
//! The registry is meant to be owned by a single view; dropping it closes
//! every connection it opened.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::backoff::ReconnectPolicy;
use super::decoder;
use super::transport::{EventTransport, MessageStream};
use super::{ConnectionKey, StreamEvent};

/// Buffered events per connection before the reader waits on the consumer.
const CHANNEL_CAPACITY: usize = 256;

/// Supplies the bearer credential for stream connections.
pub trait TokenSource: Send + Sync {
    /// Current token, if the user is signed in.
    fn token(&self) -> Option<String>;
}

/// A fixed token (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

struct Connection {
    generation: u64,
    task: JoinHandle<()>,
}

type ConnectionMap = Arc<Mutex<HashMap<ConnectionKey, Connection>>>;

fn lock(map: &ConnectionMap) -> MutexGuard<'_, HashMap<ConnectionKey, Connection>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of live stream connections.
pub struct StreamRegistry<T: EventTransport> {
    transport: Arc<T>,
    tokens: Arc<dyn TokenSource>,
    policy: ReconnectPolicy,
    connections: ConnectionMap,
    next_generation: AtomicU64,
}

impl<T: EventTransport> StreamRegistry<T> {
    pub fn new(transport: Arc<T>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            transport,
            tokens,
            policy: ReconnectPolicy::default(),
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Open (or supersede) the connection for `key`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AuthMissing` without touching the network when no token is
    /// available, and `InvalidArgument` for an unparseable source URL.
    pub fn open(&self, key: ConnectionKey, source_url: &str) -> Result<EventChannel> {
        self.close(&key);

        let token = self
            .tokens
            .token()
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::AuthMissing)?;
        let url = authorized_url(source_url, &token)?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        // Hold the map lock across spawn + insert so a task that fails
        // immediately cannot try to remove its entry before it exists.
        let mut connections = lock(&self.connections);
        let task = tokio::spawn(run_connection(ConnectionTask {
            key: key.clone(),
            url,
            generation,
            transport: Arc::clone(&self.transport),
            policy: self.policy,
            connections: Arc::clone(&self.connections),
            tx,
        }));
        connections.insert(key.clone(), Connection { generation, task });
        drop(connections);

        info!(%key, generation, "Opened event stream");
        Ok(EventChannel { key, rx })
    }

    /// Close the connection for `key`, if any. The consumer's channel ends.
    pub fn close(&self, key: &ConnectionKey) -> bool {
        let removed = lock(&self.connections).remove(key);
        match removed {
            Some(connection) => {
                connection.task.abort();
                info!(%key, "Closed event stream");
                true
            }
            None => false,
        }
    }

    /// Close every connection.
    pub fn close_all(&self) {
        let drained: Vec<_> = lock(&self.connections).drain().collect();
        for (key, connection) in drained {
            connection.task.abort();
            debug!(%key, "Closed event stream");
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn active_count(&self) -> usize {
        lock(&self.connections).len()
    }

    #[must_use]
    pub fn is_open(&self, key: &ConnectionKey) -> bool {
        lock(&self.connections).contains_key(key)
    }
}

impl<T: EventTransport> Drop for StreamRegistry<T> {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Append the credential as the `token` query parameter.
fn authorized_url(source_url: &str, token: &str) -> Result<Url> {
    let mut url = Url::parse(source_url)
        .map_err(|e| Error::InvalidArgument(format!("stream URL '{source_url}': {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

struct ConnectionTask<T> {
    key: ConnectionKey,
    url: Url,
    generation: u64,
    transport: Arc<T>,
    policy: ReconnectPolicy,
    connections: ConnectionMap,
    tx: mpsc::Sender<Result<StreamEvent>>,
}

impl<T> ConnectionTask<T> {
    /// Remove this connection's entry unless a newer one replaced it.
    fn release(&self) {
        let mut connections = lock(&self.connections);
        if connections
            .get(&self.key)
            .is_some_and(|c| c.generation == self.generation)
        {
            connections.remove(&self.key);
        }
    }
}

/// Why a single connect/read cycle stopped.
enum Outcome {
    /// The consumer dropped its channel.
    Abandoned,
    Failed(String),
}

async fn run_connection<T: EventTransport>(task: ConnectionTask<T>) {
    let mut attempt = 0;
    let mut server_hint = None;

    let reason = loop {
        let reason = match task.transport.connect(&task.url).await {
            Ok(mut stream) => {
                debug!(key = %task.key, "Event stream connected");
                let outcome = pump(&task, &mut stream, &mut attempt).await;
                server_hint = stream.retry_hint().or(server_hint);
                match outcome {
                    Outcome::Abandoned => {
                        task.release();
                        return;
                    }
                    Outcome::Failed(reason) => reason,
                }
            }
            Err(err) => err.to_string(),
        };

        match task.policy.delay_with_hint(attempt, server_hint) {
            Some(delay) => {
                attempt += 1;
                warn!(key = %task.key, %reason, attempt, ?delay, "Event stream failed, reconnecting");
                tokio::time::sleep(delay).await;
            }
            None => break reason,
        }
    };

    warn!(key = %task.key, %reason, "Event stream closed");
    task.release();
    let _ = task
        .tx
        .send(Err(Error::StreamClosed {
            key: task.key.to_string(),
            reason,
        }))
        .await;
}

/// Forward decoded events until the stream stops. The retry budget is
/// restored once an event gets through, so a server that accepts connections
/// and then hangs up at once still exhausts it.
async fn pump<T, S: MessageStream>(
    task: &ConnectionTask<T>,
    stream: &mut S,
    attempt: &mut u32,
) -> Outcome {
    loop {
        let message = match stream.next_message().await {
            Some(Ok(message)) => message,
            Some(Err(err)) => return Outcome::Failed(err.to_string()),
            None => return Outcome::Failed("stream ended by server".to_string()),
        };

        match decoder::decode(&message.event, &message.data) {
            Ok(event) => {
                if task.tx.send(Ok(event)).await.is_err() {
                    return Outcome::Abandoned;
                }
                *attempt = 0;
            }
            Err(err) => {
                warn!(key = %task.key, event = %message.event, error = %err, "Dropping undecodable event");
            }
        }
    }
}

/// Consumer side of one connection.
///
/// Yields decoded events until the connection is closed (`None`) or fails
/// (a final `Err(Error::StreamClosed)`).
#[derive(Debug)]
pub struct EventChannel {
    key: ConnectionKey,
    rx: mpsc::Receiver<Result<StreamEvent>>,
}

impl EventChannel {
    #[must_use]
    pub const fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Next event, terminal error, or `None` after close.
    pub async fn recv(&mut self) -> Option<Result<StreamEvent>> {
        self.rx.recv().await
    }

    /// Drive the channel to completion with an event handler and an error handler.
    pub async fn for_each<F, E>(mut self, mut on_event: F, on_error: E)
    where
        F: FnMut(StreamEvent),
        E: FnOnce(Error),
    {
        while let Some(item) = self.rx.recv().await {
            match item {
                Ok(event) => on_event(event),
                Err(err) => {
                    on_error(err);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::stream::SseMessage;
    use crate::testing::ScriptedTransport;

    const ISSUE: &str = r#"{"id":1,"projectId":9,"title":"Crash","status":"OPEN","priority":"HIGH"}"#;

    fn registry(transport: &Arc<ScriptedTransport>) -> StreamRegistry<ScriptedTransport> {
        StreamRegistry::new(Arc::clone(transport), Arc::new(StaticToken::new("secret tok")))
    }

    #[tokio::test]
    async fn test_open_appends_token_and_delivers_events() {
        let transport = Arc::new(ScriptedTransport::new());
        let feed = transport.push_stream();
        let registry = registry(&transport);

        let mut channel = registry
            .open(ConnectionKey::project("9"), "http://api.test/sse/issues?projectId=9")
            .unwrap();

        feed.send(Ok(SseMessage::new("connected", "hello"))).await.unwrap();
        feed.send(Ok(SseMessage::new("issue.created", ISSUE))).await.unwrap();

        assert_eq!(channel.recv().await.unwrap().unwrap(), StreamEvent::Connected("hello".to_string()));
        assert!(matches!(channel.recv().await, Some(Ok(StreamEvent::Issue(_)))));

        let urls = transport.connected_urls();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].query(), Some("projectId=9&token=secret+tok"));
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_connecting() {
        let transport = Arc::new(ScriptedTransport::new());
        let registry = StreamRegistry::new(Arc::clone(&transport), Arc::new(StaticToken::none()));

        let err = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap_err();
        assert!(matches!(err, Error::AuthMissing));
        assert_eq!(registry.active_count(), 0);

        tokio::task::yield_now().await;
        assert!(transport.connected_urls().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_supersedes() {
        let transport = Arc::new(ScriptedTransport::new());
        let first_feed = transport.push_stream();
        let second_feed = transport.push_stream();
        let registry = registry(&transport);

        let mut first = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();
        let mut second = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();

        assert_eq!(registry.active_count(), 1);
        assert!(first.recv().await.is_none());

        // Either script may back the surviving connection
        for feed in [&first_feed, &second_feed] {
            let _ = feed.send(Ok(SseMessage::new("connected", "again"))).await;
        }
        assert!(matches!(second.recv().await, Some(Ok(StreamEvent::Connected(_)))));
    }

    #[tokio::test]
    async fn test_error_removes_entry_then_reports() {
        let transport = Arc::new(ScriptedTransport::new());
        let feed = transport.push_stream();
        let registry = registry(&transport);

        let mut channel = registry
            .open(ConnectionKey::user_events(), "http://api.test/sse/user")
            .unwrap();
        drop(feed);

        match channel.recv().await {
            Some(Err(Error::StreamClosed { key, .. })) => assert_eq!(key, "user-events"),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert_eq!(registry.active_count(), 0);
        assert!(channel.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_message_keeps_stream_open() {
        let transport = Arc::new(ScriptedTransport::new());
        let feed = transport.push_stream();
        let registry = registry(&transport);
        let mut channel = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();

        feed.send(Ok(SseMessage::new("issue.updated", "{broken"))).await.unwrap();
        feed.send(Ok(SseMessage::new("issue.unknown", ISSUE))).await.unwrap();
        feed.send(Ok(SseMessage::new("issue.updated", ISSUE))).await.unwrap();

        assert!(matches!(
            channel.recv().await,
            Some(Ok(StreamEvent::Issue(crate::view::collection::Change::Updated(_))))
        ));
        assert!(registry.is_open(&ConnectionKey::all_issues()));
    }

    #[tokio::test]
    async fn test_close_all_and_drop() {
        let transport = Arc::new(ScriptedTransport::new());
        let _a = transport.push_stream();
        let _b = transport.push_stream();
        let registry = registry(&transport);

        let mut issues = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();
        let mut user = registry
            .open(ConnectionKey::user_events(), "http://api.test/sse/user")
            .unwrap();
        assert_eq!(registry.active_count(), 2);

        assert!(registry.close(&ConnectionKey::all_issues()));
        assert!(!registry.close(&ConnectionKey::all_issues()));
        assert!(issues.recv().await.is_none());

        drop(registry);
        assert!(user.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reconnects_when_enabled() {
        let transport = Arc::new(ScriptedTransport::new());
        let first = transport.push_stream();
        let second = transport.push_stream();
        let registry = registry(&transport).with_policy(fast_retries(1));
        let mut channel = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();

        first.send(Ok(SseMessage::new("connected", "one"))).await.unwrap();
        assert!(matches!(channel.recv().await, Some(Ok(StreamEvent::Connected(_)))));
        drop(first);

        second.send(Ok(SseMessage::new("connected", "two"))).await.unwrap();
        assert_eq!(
            channel.recv().await.unwrap().unwrap(),
            StreamEvent::Connected("two".to_string())
        );
        assert_eq!(registry.active_count(), 1);
        assert_eq!(transport.connected_urls().len(), 2);
    }

    fn fast_retries(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_silent_hangups_exhaust_retries() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..4 {
            drop(transport.push_stream());
        }
        let registry = registry(&transport).with_policy(fast_retries(2));
        let mut channel = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();

        assert!(matches!(channel.recv().await, Some(Err(Error::StreamClosed { .. }))));
        assert_eq!(transport.connected_urls().len(), 3);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_delivered_event_restores_retry_budget() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_refusal(Error::Other("connection refused".to_string()));
        let healthy = transport.push_stream();
        for _ in 0..3 {
            drop(transport.push_stream());
        }
        let registry = registry(&transport).with_policy(fast_retries(2));
        let mut channel = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();

        healthy.send(Ok(SseMessage::new("connected", "up"))).await.unwrap();
        assert!(matches!(channel.recv().await, Some(Ok(StreamEvent::Connected(_)))));
        drop(healthy);

        assert!(matches!(channel.recv().await, Some(Err(Error::StreamClosed { .. }))));
        // refusal, healthy stream, then two empty streams
        assert_eq!(transport.connected_urls().len(), 4);
    }

    #[tokio::test]
    async fn test_refused_connection_reports_reason() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_refusal(Error::Api {
            status: 401,
            message: None,
        });
        let registry = registry(&transport);
        let channel = registry
            .open(ConnectionKey::all_issues(), "http://api.test/sse/issues")
            .unwrap();

        let mut events = 0;
        let mut failure = None;
        channel
            .for_each(|_| events += 1, |err| failure = Some(err))
            .await;

        assert_eq!(events, 0);
        assert!(matches!(failure, Some(Error::StreamClosed { reason, .. }) if reason.contains("401")));
        assert_eq!(registry.active_count(), 0);
    }
}

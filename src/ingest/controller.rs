//! Connection lifecycle and the single-writer ingest loop
//!
//! [`IngestionController`] owns the upstream connection, the reconnect
//! [`Backoff`] and the [`StreamStats`] it feeds. It runs as one tokio task:
//! every inbound frame, command, watchdog tick and reconnect deadline is
//! handled by the same `select!` loop, so the statistics see exactly one
//! writer and records are applied in arrival order.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Connecting --ok--> Connected --close/idle--> ReconnectPending
//!                     ^  |                                          |
//!                     |  +--------------------err-------------------+
//!                     +--------------------backoff elapsed----------+
//! any --stop--> Stopped --start--> Connecting
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::IngestConfig;
use super::connection::{Connection, Connector};
use super::error::{ConnectionError, ControllerGone};
use super::protocol::{Command, Event};
use super::record::parse_quote;
use crate::backoff::Backoff;
use crate::error::ConfigError;
use crate::statistics::{Snapshot, StatsConfig, StreamStats};

/// Value used as the spread of a simulated outlier before any spread exists
const SIMULATED_FALLBACK_SPREAD: f64 = 1000.0;

/// Where the controller is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never started
    Idle,
    /// Waiting for the connector
    Connecting,
    /// Receiving records
    Connected,
    /// Waiting out the backoff delay before reconnecting
    ReconnectPending,
    /// Stopped by the caller
    Stopped,
}

type PendingConnect = BoxFuture<'static, Result<Box<dyn Connection>, ConnectionError>>;

/// Drives one upstream feed into a [`StreamStats`] instance
pub struct IngestionController {
    config: IngestConfig,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<Event>,
    stats: StreamStats,
    backoff: Backoff,
    state: ConnectionState,
    stopped_by_user: bool,
    connection: Option<Box<dyn Connection>>,
    pending_connect: Option<PendingConnect>,
    reconnect_at: Option<Instant>,
    watchdog: Option<Interval>,
    last_message_at: Instant,
}

fn stats_with_forwarding(config: &StatsConfig, events: &mpsc::UnboundedSender<Event>) -> StreamStats {
    let events = events.clone();
    StreamStats::with_sink(config.clone(), move |anomaly| {
        // A closed receiver only means nobody is listening any more.
        let _ = events.send(Event::Anomaly(anomaly));
    })
}

impl IngestionController {
    /// Create a controller that reports on `events`
    pub fn new(
        config: IngestConfig,
        connector: Arc<dyn Connector>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let stats = stats_with_forwarding(&config.stats, &events);
        let backoff = Backoff::new(config.backoff_base(), config.backoff_max());

        Ok(Self {
            config,
            connector,
            events,
            stats,
            backoff,
            state: ConnectionState::Idle,
            stopped_by_user: false,
            connection: None,
            pending_connect: None,
            reconnect_at: None,
            watchdog: None,
            last_message_at: Instant::now(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Begin ingesting with fresh statistics
    ///
    /// An open or opening connection is kept; a pending reconnect is replaced
    /// by an immediate attempt.
    pub fn start(&mut self) {
        self.stopped_by_user = false;
        self.stats = stats_with_forwarding(&self.config.stats, &self.events);

        match self.state {
            ConnectionState::Connected | ConnectionState::Connecting => {
                debug!(state = ?self.state, "start requested while already active");
            }
            _ => {
                info!(url = %self.config.url, "starting ingestion");
                self.reconnect_at = None;
                self.begin_connect();
            }
        }
    }

    /// Disconnect and cancel every pending timer and connect attempt
    ///
    /// Idempotent. Close failures are logged and swallowed.
    pub async fn stop(&mut self) {
        self.stopped_by_user = true;
        self.pending_connect = None;
        self.reconnect_at = None;
        self.watchdog = None;

        if let Some(mut connection) = self.connection.take() {
            if let Err(err) = connection.close().await {
                error!(error = %err, "closing connection on stop failed");
            }
        }

        if self.state != ConnectionState::Stopped {
            info!("ingestion stopped");
        }
        self.state = ConnectionState::Stopped;
    }

    /// Take a snapshot and publish it as a `stats` event
    pub fn get_stats(&self) -> Snapshot {
        let snapshot = self.stats.snapshot();
        let _ = self.events.send(Event::Stats(snapshot.clone()));
        snapshot
    }

    /// Clear the statistics and publish the empty snapshot
    pub fn reset_all(&mut self) -> Snapshot {
        self.stats.reset();
        self.get_stats()
    }

    /// Add an outlier ten spreads above the mean, right after the last id
    pub fn simulate_anomaly(&mut self) {
        let id = self.stats.prev_id().map_or(0, |prev| prev + 1);
        let spread = self
            .stats
            .std()
            .filter(|std| *std > 0.0)
            .unwrap_or(SIMULATED_FALLBACK_SPREAD);
        let value = self.stats.mean().unwrap_or(0.0) + 10.0 * spread;

        info!(id, value, "injecting simulated anomaly");
        self.stats.add(id, value);
    }

    pub async fn handle_command(&mut self, command: Command) {
        debug!(?command, "command received");
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop().await,
            Command::GetStats => {
                self.get_stats();
            }
            Command::Reset => {
                self.reset_all();
            }
            Command::SimulateAnomaly => self.simulate_anomaly(),
        }
    }

    /// Validate one inbound frame and fold it into the statistics
    pub fn handle_frame(&mut self, text: &str) {
        let quote = match parse_quote(text, self.config.max_value) {
            Ok(quote) => quote,
            Err(err) => {
                warn!(error = %err, "dropping malformed record");
                return;
            }
        };

        if let Some(prev_id) = self.stats.prev_id() {
            if quote.id <= prev_id {
                debug!(id = quote.id, prev_id, "dropping stale record");
                return;
            }
        }

        self.stats.add(quote.id, quote.value);
        self.last_message_at = Instant::now();
    }

    fn begin_connect(&mut self) {
        let connector = Arc::clone(&self.connector);
        self.pending_connect = Some(Box::pin(async move { connector.connect().await }));
        self.state = ConnectionState::Connecting;
        debug!(attempt = self.backoff.attempt(), "connecting");
    }

    async fn on_connect_result(&mut self, result: Result<Box<dyn Connection>, ConnectionError>) {
        let mut connection = match result {
            Ok(connection) => connection,
            Err(err) => {
                warn!(error = %err, "connect failed");
                self.on_close();
                return;
            }
        };

        if self.stopped_by_user {
            if let Err(err) = connection.close().await {
                error!(error = %err, "closing late connection failed");
            }
            return;
        }

        if let Some(message) = self.config.subscribe_message.clone() {
            if let Err(err) = connection.send(&message).await {
                warn!(error = %err, "subscribe failed");
                self.connection = Some(connection);
                self.close_connection().await;
                return;
            }
        }

        self.backoff.reset();
        let now = Instant::now();
        self.last_message_at = now;

        let period = self.config.idle_check_interval();
        let mut watchdog = interval_at(now + period, period);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.watchdog = Some(watchdog);

        self.connection = Some(connection);
        self.state = ConnectionState::Connected;
        info!(url = %self.config.url, "connected");
    }

    /// Close the current connection ourselves, then react as to any close
    async fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(err) = connection.close().await {
                error!(error = %err, "closing connection failed");
            }
        }
        self.on_close();
    }

    fn on_close(&mut self) {
        self.connection = None;
        self.watchdog = None;

        if self.stopped_by_user {
            self.state = ConnectionState::Stopped;
            return;
        }

        let delay = self.backoff.next();
        self.reconnect_at = Some(Instant::now() + delay);
        self.state = ConnectionState::ReconnectPending;
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = self.backoff.attempt(),
            "connection closed, reconnect scheduled"
        );
    }

    async fn check_idle(&mut self) {
        if self.stopped_by_user || self.connection.is_none() {
            return;
        }

        let idle = self.last_message_at.elapsed();
        if idle > self.config.idle_timeout() {
            warn!(idle_ms = idle.as_millis() as u64, "feed idle, closing connection");
            self.close_connection().await;
        }
    }

    fn fire_reconnect(&mut self) {
        self.reconnect_at = None;
        if self.stopped_by_user {
            return;
        }
        self.begin_connect();
    }

    /// Process commands and upstream traffic until every command sender is gone
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.stop().await;
                        break;
                    }
                },

                result = next_connect(&mut self.pending_connect) => {
                    self.pending_connect = None;
                    self.on_connect_result(result).await;
                }

                frame = next_frame(&mut self.connection) => match frame {
                    Some(Ok(text)) => self.handle_frame(&text),
                    Some(Err(err)) => {
                        warn!(error = %err, "upstream read failed");
                        self.close_connection().await;
                    }
                    None => {
                        debug!("upstream closed the connection");
                        self.on_close();
                    }
                },

                () = next_tick(&mut self.watchdog) => self.check_idle().await,

                () = sleep_opt(self.reconnect_at) => self.fire_reconnect(),
            }
        }
        debug!("ingestion controller exiting");
    }
}

async fn next_connect(
    slot: &mut Option<PendingConnect>,
) -> Result<Box<dyn Connection>, ConnectionError> {
    match slot {
        Some(connecting) => connecting.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(
    slot: &mut Option<Box<dyn Connection>>,
) -> Option<Result<String, ConnectionError>> {
    match slot {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(slot: &mut Option<Interval>) {
    match slot {
        Some(watchdog) => {
            watchdog.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Sends commands to a running controller
#[derive(Debug, Clone)]
pub struct IngestionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl IngestionHandle {
    pub fn send(&self, command: Command) -> Result<(), ControllerGone> {
        self.commands.send(command).map_err(|_| ControllerGone)
    }

    pub fn start(&self) -> Result<(), ControllerGone> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> Result<(), ControllerGone> {
        self.send(Command::Stop)
    }

    pub fn get_stats(&self) -> Result<(), ControllerGone> {
        self.send(Command::GetStats)
    }

    pub fn reset(&self) -> Result<(), ControllerGone> {
        self.send(Command::Reset)
    }

    pub fn simulate_anomaly(&self) -> Result<(), ControllerGone> {
        self.send(Command::SimulateAnomaly)
    }
}

/// A controller running on its own task
#[derive(Debug)]
pub struct Ingestion {
    pub handle: IngestionHandle,
    pub events: mpsc::UnboundedReceiver<Event>,
    /// Finishes once every handle clone is dropped
    pub task: JoinHandle<()>,
}

/// Spawn a controller on the current tokio runtime
///
/// The controller stays idle until it receives [`Command::Start`].
pub fn spawn(config: IngestConfig, connector: Arc<dyn Connector>) -> Result<Ingestion, ConfigError> {
    let (event_tx, events) = mpsc::unbounded_channel();
    let (commands, command_rx) = mpsc::unbounded_channel();

    let controller = IngestionController::new(config, connector, event_tx)?;
    let task = tokio::spawn(controller.run(command_rx));

    Ok(Ingestion {
        handle: IngestionHandle { commands },
        events,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl Connector for Unreachable {
        async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
            Err(ConnectionError::Connect("unreachable".into()))
        }
    }

    fn controller() -> (IngestionController, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller =
            IngestionController::new(IngestConfig::new("ws://test"), Arc::new(Unreachable), tx)
                .unwrap();
        (controller, rx)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = IngestionController::new(IngestConfig::default(), Arc::new(Unreachable), tx);
        assert!(matches!(result, Err(ConfigError::EmptyUrl)));
    }

    #[test]
    fn test_frames_validated_before_adding() {
        let (mut controller, _rx) = controller();

        controller.handle_frame("garbage");
        controller.handle_frame(r#"{"id":-3,"value":1}"#);
        controller.handle_frame(r#"{"id":1,"value":2000000}"#);
        assert_eq!(controller.stats().count(), 0);
        assert_eq!(controller.stats().prev_id(), None);

        controller.handle_frame(r#"{"id":10,"value":4}"#);
        controller.handle_frame(r#"{"id":10,"value":5}"#);
        controller.handle_frame(r#"{"id":8,"value":6}"#);
        controller.handle_frame(r#"{"id":13,"value":6}"#);

        let snapshot = controller.get_stats();
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.lost, 2);
        assert_eq!(snapshot.mean, Some(5.0));
    }

    #[test]
    fn test_get_stats_publishes_event() {
        let (mut controller, mut rx) = controller();
        controller.handle_frame(r#"{"id":1,"value":3}"#);

        let snapshot = controller.get_stats();
        match rx.try_recv().unwrap() {
            Event::Stats(published) => assert_eq!(published, snapshot),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_reset_publishes_empty_snapshot() {
        let (mut controller, mut rx) = controller();
        controller.handle_frame(r#"{"id":1,"value":3}"#);
        controller.handle_frame(r#"{"id":5,"value":3}"#);

        controller.reset_all();
        match rx.try_recv().unwrap() {
            Event::Stats(snapshot) => {
                assert_eq!(snapshot.count, 0);
                assert_eq!(snapshot.lost, 0);
                assert_eq!(snapshot.mean, None);
            }
            other => panic!("unexpected event {:?}", other),
        }

        // Ids restart after a reset
        controller.handle_frame(r#"{"id":1,"value":3}"#);
        assert_eq!(controller.stats().count(), 1);
    }

    #[test]
    fn test_simulated_anomaly_is_forwarded() {
        let (mut controller, mut rx) = controller();
        for id in 1..=20u64 {
            let value = if id % 2 == 0 { 10.0 } else { 11.0 };
            controller.handle_frame(&format!(r#"{{"id":{},"value":{}}}"#, id, value));
        }
        assert!(rx.try_recv().is_err());

        controller.simulate_anomaly();
        assert_eq!(controller.stats().prev_id(), Some(21));

        match rx.try_recv().unwrap() {
            Event::Anomaly(anomaly) => {
                assert_eq!(anomaly.sequence_index, 21);
                assert!(anomaly.z_score > 2.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (mut controller, _rx) = controller();
        controller.stop().await;
        controller.stop().await;
        assert_eq!(controller.state(), ConnectionState::Stopped);
    }

    #[test]
    fn test_start_moves_to_connecting() {
        let (mut controller, _rx) = controller();
        assert_eq!(controller.state(), ConnectionState::Idle);
        controller.start();
        assert_eq!(controller.state(), ConnectionState::Connecting);
    }
}

//! Fetch builder and the I/O driver around [`Session`].

use crate::backoff::{BackoffConfig, ConnectBackoff};
use crate::error::ClientError;
use crate::reconciler::{DEFAULT_MAX_GAP, SequenceReconciler};
use crate::session::{Session, SessionCommand, SessionEvent};
use crate::sink::{JsonFileSink, RecordSink};
use seqfeed_core::Record;
use seqfeed_transport::tcp::{TcpClientConfig, TcpTransport};
use seqfeed_transport::{Connection, Transport};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Session-level configuration shared by every transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Longest silence tolerated while a round is streaming.
    pub idle_timeout: Duration,
    /// Recovery rounds allowed after the bulk round.
    pub max_recovery_rounds: u32,
    /// Connect retry policy.
    pub backoff: BackoffConfig,
    /// Limit on outstanding placeholders across all gaps.
    pub max_gap: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            max_recovery_rounds: 3,
            backoff: BackoffConfig::default(),
            max_gap: DEFAULT_MAX_GAP,
        }
    }
}

/// Builder for configuring and creating a [`Fetcher`].
pub struct FetchBuilder {
    tcp: TcpClientConfig,
    config: FetchConfig,
    output: PathBuf,
}

impl FetchBuilder {
    /// Creates a new builder for the specified server address.
    #[must_use]
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            tcp: TcpClientConfig::new(server_addr),
            config: FetchConfig::default(),
            output: PathBuf::from(JsonFileSink::DEFAULT_PATH),
        }
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.tcp.connect_timeout = timeout;
        self
    }

    /// Sets the idle timeout for a streaming round.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets the number of recovery rounds allowed.
    #[must_use]
    pub fn max_recovery_rounds(mut self, rounds: u32) -> Self {
        self.config.max_recovery_rounds = rounds;
        self
    }

    /// Sets the initial connect retry delay.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.backoff.initial_delay = delay;
        self
    }

    /// Sets the connect attempts allowed per round.
    #[must_use]
    pub fn max_connect_attempts(mut self, attempts: usize) -> Self {
        self.config.backoff.max_attempts = attempts;
        self
    }

    /// Sets the limit on outstanding placeholders across all gaps.
    #[must_use]
    pub fn max_gap(mut self, max_gap: u32) -> Self {
        self.config.max_gap = max_gap;
        self
    }

    /// Sets the JSON output path.
    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    /// Returns the session configuration built so far.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Builds a fetcher over TCP writing a JSON file.
    #[must_use]
    pub fn build(self) -> Fetcher<TcpTransport, JsonFileSink> {
        Fetcher::new(
            TcpTransport::new(self.tcp),
            JsonFileSink::new(self.output),
            self.config,
        )
    }
}

/// Summary of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Records in sequence order, contiguous from 1.
    pub records: Vec<Record>,
    /// Recovery rounds run.
    pub rounds: u32,
    /// Sequences filled after a gap.
    pub recovered: usize,
    /// Sink the records were written to.
    pub sink: String,
}

/// Drives a [`Session`] over a transport and persists the result.
pub struct Fetcher<T: Transport, S: RecordSink> {
    transport: T,
    sink: S,
    session: Session,
    backoff: ConnectBackoff,
    idle_timeout: Duration,
}

impl<T: Transport, S: RecordSink> Fetcher<T, S> {
    /// Creates a fetcher from its parts.
    #[must_use]
    pub fn new(transport: T, sink: S, config: FetchConfig) -> Self {
        let reconciler = SequenceReconciler::with_max_gap(config.max_gap);
        Self {
            transport,
            sink,
            session: Session::with_reconciler(reconciler, config.max_recovery_rounds),
            backoff: ConnectBackoff::new(config.backoff),
            idle_timeout: config.idle_timeout,
        }
    }

    /// Runs the bulk round and any recovery rounds, then persists.
    ///
    /// # Errors
    /// Returns `ClientError` if a round fails, gaps remain when the session
    /// gives up, or persistence fails. The error is logged before returning.
    pub async fn run(&mut self) -> Result<FetchReport, ClientError> {
        match self.drive().await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!("Fetch failed: {}", e);
                Err(e)
            }
        }
    }

    /// Returns the sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn drive(&mut self) -> Result<FetchReport, ClientError> {
        let mut connection: Option<T::Connection> = None;
        let mut command = Some(self.session.start()?);

        loop {
            let event = match command.take() {
                Some(SessionCommand::Connect) => {
                    connection = Some(self.connect().await?);
                    SessionEvent::Connected
                }
                Some(SessionCommand::Send(request)) => {
                    let conn = connection.as_mut().ok_or(ClientError::InvalidState {
                        state: self.session.state(),
                        event: "send without connection",
                    })?;
                    tracing::debug!(?request, "sending request");
                    conn.send(request).await?;
                    next_event(conn, self.idle_timeout).await?
                }
                Some(SessionCommand::Close) => {
                    if let Some(conn) = connection.take() {
                        conn.close().await?;
                    }
                    SessionEvent::Closed
                }
                Some(SessionCommand::Persist) => return self.persist().await,
                None => match connection.as_mut() {
                    Some(conn) => next_event(conn, self.idle_timeout).await?,
                    None => SessionEvent::Closed,
                },
            };

            if event == SessionEvent::Closed {
                connection = None;
            }
            command = self.session.dispatch(event)?;
        }
    }

    async fn connect(&mut self) -> Result<T::Connection, ClientError> {
        loop {
            match self.transport.connect().await {
                Ok(conn) => {
                    self.backoff.on_success();
                    return Ok(conn);
                }
                Err(e) => {
                    tracing::warn!("Connection attempt failed: {}", e);
                    match self.backoff.on_failure() {
                        Some(delay) => {
                            tracing::info!("Reconnecting in {:?}...", delay);
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            return Err(ClientError::MaxConnectAttempts {
                                attempts: self.backoff.attempts(),
                                source: e,
                            });
                        }
                    }
                }
            }
        }
    }

    async fn persist(&mut self) -> Result<FetchReport, ClientError> {
        let reconciler = self.session.reconciler();
        self.sink.persist(reconciler.records()).await?;

        Ok(FetchReport {
            records: reconciler.records().iter().flatten().cloned().collect(),
            rounds: self.session.round(),
            recovered: reconciler.recovered(),
            sink: self.sink.name(),
        })
    }
}

async fn next_event<C: Connection>(
    conn: &mut C,
    idle_timeout: Duration,
) -> Result<SessionEvent, ClientError> {
    match tokio::time::timeout(idle_timeout, conn.recv()).await {
        Err(_) => Ok(SessionEvent::TimedOut),
        Ok(Ok(Some(record))) => Ok(SessionEvent::Record(record)),
        Ok(Ok(None)) => Ok(SessionEvent::Closed),
        Ok(Err(e)) => {
            if e.is_format() {
                tracing::error!("Malformed frame, aborting round: {}", e);
            }
            Err(e.into())
        }
    }
}

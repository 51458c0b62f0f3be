use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use storefront_core::channel::{
    Backoff, ChannelConnection, ChannelState, ChannelTransport, CloseReason, InboundFrame,
    ReconnectPolicy, TransportEvent, heartbeat_ack,
};
use storefront_core::session::Session;

use crate::notifications::SharedNotificationLog;

/// Drives the realtime notification channel.
///
/// `RealtimeChannelManager` is responsible for:
/// - Opening at most one connection at a time for the current session
/// - Echoing heartbeat probes and feeding notifications into the log
/// - Reconnecting after the backoff delay while the session is authenticated
/// - Tearing the connection down on `disconnect()` without reconnecting
///
/// The connection itself lives in a background task. Each `connect()` that
/// starts a task bumps a generation counter; a task only publishes state while
/// its generation is current, so a superseded task can never overwrite the
/// state of its successor.
pub struct RealtimeChannelManager {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn ChannelTransport>,
    session: watch::Receiver<Session>,
    log: SharedNotificationLog,
    policy: ReconnectPolicy,
    state: watch::Sender<ChannelState>,
    control: Mutex<Control>,
    reconnect_attempts: AtomicU32,
}

#[derive(Default)]
struct Control {
    generation: u64,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl Control {
    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl RealtimeChannelManager {
    /// Creates an idle manager.
    ///
    /// # Arguments
    ///
    /// * `transport` - Opens the duplex connection
    /// * `session` - Session signal; read at connect time and at every close
    /// * `log` - Destination for inbound notifications
    /// * `policy` - Reconnect delay policy
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        session: watch::Receiver<Session>,
        log: SharedNotificationLog,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ChannelState::Idle);
        Self {
            shared: Arc::new(Shared {
                transport,
                session,
                log,
                policy,
                state,
                control: Mutex::new(Control::default()),
                reconnect_attempts: AtomicU32::new(0),
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        self.shared.state.borrow().clone()
    }

    /// State signal. The receiver sees every transition the manager publishes.
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    /// Consecutive failed attempts since the channel was last open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub fn notifications(&self) -> &SharedNotificationLog {
        &self.shared.log
    }

    /// Whether a connection task is live (connecting, open, or waiting to reconnect).
    pub fn is_running(&self) -> bool {
        self.shared.control().is_running()
    }

    /// Starts the connection task.
    ///
    /// No-op while a task is already live, so repeated calls never open a
    /// second connection. Also a no-op for an anonymous session or outside a
    /// Tokio runtime. Returns `true` if a new task was started.
    pub fn connect(&self) -> bool {
        let mut control = self.shared.control();
        if control.is_running() {
            tracing::debug!(
                "[ChannelManager] connect() ignored, channel is {}",
                self.state()
            );
            return false;
        }
        if !self.shared.session.borrow().is_authenticated() {
            tracing::debug!("[ChannelManager] connect() ignored, session is anonymous");
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!("[ChannelManager] connect() outside a runtime: {}", e);
                return false;
            }
        };

        control.generation += 1;
        let generation = control.generation;
        let cancel = CancellationToken::new();
        self.shared.reconnect_attempts.store(0, Ordering::Relaxed);
        self.shared.state.send_replace(ChannelState::Connecting);

        let span = tracing::info_span!("channel", id = %Uuid::new_v4());
        let shared = Arc::clone(&self.shared);
        let task = runtime.spawn(supervise(shared, cancel.clone(), generation).instrument(span));
        control.cancel = Some(cancel);
        control.task = Some(task);
        true
    }

    /// Stops the channel. Safe from any state.
    ///
    /// The connection task is cancelled before the socket is closed, so a
    /// close event arriving afterwards is never observed and never leads to a
    /// reconnect. A pending reconnect timer is cancelled as well.
    pub fn disconnect(&self) {
        let mut control = self.shared.control();
        let running = control.is_running();
        control.task = None;
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }

        if running {
            tracing::info!("[ChannelManager] Disconnecting");
            self.shared.state.send_replace(ChannelState::Closing);
        } else if *self.shared.state.borrow() != ChannelState::Idle {
            self.shared
                .state
                .send_replace(ChannelState::closed(CloseReason::UserInitiated));
        }
    }

    /// Waits until the channel is neither connecting, open nor closing.
    pub async fn wait_until_closed(&self) {
        let mut state = self.subscribe_state();
        // The sender lives in `shared`, which outlives this borrow.
        let _ = state
            .wait_for(|s| matches!(s, ChannelState::Idle | ChannelState::Closed { .. }))
            .await;
    }
}

impl Drop for RealtimeChannelManager {
    fn drop(&mut self) {
        if let Some(cancel) = self.shared.control().cancel.take() {
            cancel.cancel();
        }
    }
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `state` if `generation` still owns the channel.
    fn publish(&self, generation: u64, state: ChannelState) -> bool {
        let control = self.control();
        if control.generation != generation {
            return false;
        }
        tracing::debug!("[ChannelManager] State -> {}", state);
        self.state.send_replace(state);
        true
    }

    /// Reads inbound events until the connection ends or the task is cancelled.
    ///
    /// Returns `None` on cancellation.
    async fn pump(
        &self,
        connection: &mut dyn ChannelConnection,
        cancel: &CancellationToken,
    ) -> Option<CloseReason> {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                event = connection.recv() => event,
            };

            let text = match event {
                Ok(TransportEvent::Text(text)) => text,
                Ok(TransportEvent::Closed { code, reason }) => {
                    return Some(CloseReason::ServerClosed { code, reason });
                }
                Err(e) => return Some(CloseReason::error(e.to_string())),
            };

            match InboundFrame::parse(&text) {
                Ok(InboundFrame::Heartbeat) => {
                    tracing::trace!("[ChannelManager] Heartbeat, echoing");
                    if let Err(e) = connection.send(heartbeat_ack()).await {
                        return Some(CloseReason::error(e.to_string()));
                    }
                }
                Ok(InboundFrame::Notification(notification)) => {
                    let id = notification.id.clone();
                    if self.log.append(notification) {
                        tracing::debug!("[ChannelManager] Notification {} received", id);
                    }
                }
                Err(e) => {
                    tracing::warn!("[ChannelManager] Dropping malformed frame: {}", e);
                }
            }
        }
    }
}

/// One connection task: connect, pump, and reconnect until told to stop.
async fn supervise(shared: Arc<Shared>, cancel: CancellationToken, generation: u64) {
    let mut backoff = Backoff::new(shared.policy.clone());

    loop {
        let credentials = shared.session.borrow().credentials().cloned();
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => {
                tracing::info!("[ChannelManager] Session ended before connecting");
                shared.publish(
                    generation,
                    ChannelState::closed(CloseReason::error("session is not authenticated")),
                );
                return;
            }
        };

        shared.publish(generation, ChannelState::Connecting);
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                shared.publish(generation, ChannelState::closed(CloseReason::UserInitiated));
                return;
            }
            connected = shared.transport.connect(&credentials) => connected,
        };

        let reason = match connected {
            Ok(mut connection) => {
                backoff.reset();
                shared.reconnect_attempts.store(0, Ordering::Relaxed);
                tracing::info!("[ChannelManager] Channel open");
                shared.publish(generation, ChannelState::Open);

                match shared.pump(connection.as_mut(), &cancel).await {
                    Some(reason) => reason,
                    None => {
                        if let Err(e) = connection.close().await {
                            tracing::debug!("[ChannelManager] Close handshake failed: {}", e);
                        }
                        tracing::info!("[ChannelManager] Channel closed by client");
                        shared.publish(generation, ChannelState::closed(CloseReason::UserInitiated));
                        return;
                    }
                }
            }
            Err(e) => CloseReason::error(e.to_string()),
        };

        tracing::info!("[ChannelManager] Channel closed: {}", reason);
        let reconnect = reason.allows_reconnect() && shared.session.borrow().is_authenticated();
        shared.publish(generation, ChannelState::closed(reason));
        if !reconnect {
            tracing::info!("[ChannelManager] Not reconnecting, session is anonymous");
            return;
        }

        let delay = backoff.next_delay();
        shared
            .reconnect_attempts
            .store(backoff.attempts(), Ordering::Relaxed);
        tracing::info!(
            "[ChannelManager] Reconnecting in {:?} (attempt {})",
            delay,
            backoff.attempts()
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                shared.publish(generation, ChannelState::closed(CloseReason::UserInitiated));
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

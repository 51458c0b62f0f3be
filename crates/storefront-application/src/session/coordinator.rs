use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};

use storefront_core::cart::{CartItem, CartReconciler, CartSyncApi, MutationReport};
use storefront_core::channel::{ChannelTransport, ReconnectPolicy};
use storefront_core::error::SyncError;
use storefront_core::session::{Credentials, Session, SessionTransition};

use crate::channel::RealtimeChannelManager;
use crate::notifications::SharedNotificationLog;

/// Result of one cart round trip with the server.
#[derive(Debug, Clone, PartialEq)]
pub enum CartSync {
    /// The server cart was adopted.
    Applied(MutationReport),
    /// The request or the response failed; the local cart is unchanged.
    Failed(SyncError),
    /// The user logged out or logged in again while the request was in
    /// flight. The response was discarded.
    Superseded,
}

impl CartSync {
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            CartSync::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, CartSync::Superseded)
    }
}

/// What a login did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginOutcome {
    /// Result of the merge-on-login cart sync; `None` when no sync ran.
    pub sync: Option<CartSync>,
    /// Whether this call started the channel.
    pub channel_started: bool,
}

impl LoginOutcome {
    /// The sync failure to surface to the user, if any.
    pub fn sync_error(&self) -> Option<&SyncError> {
        self.sync.as_ref().and_then(CartSync::error)
    }

    pub fn is_superseded(&self) -> bool {
        self.sync.as_ref().is_some_and(CartSync::is_superseded)
    }
}

/// Binds session transitions to the cart and the realtime channel.
///
/// This is the only component that connects or disconnects the channel and
/// the only one that exchanges the cart with the server:
///
/// - anonymous → authenticated: sync the cart snapshot, then connect
/// - authenticated → anonymous: disconnect, then clear notifications; the
///   cart is kept
/// - authenticated → authenticated: credentials are updated in place; the
///   channel picks them up on its next connect
///
/// Every login and logout starts a new login epoch. A server response is
/// adopted only if the epoch it was requested in is still current.
pub struct SessionCoordinator {
    session: watch::Sender<Session>,
    login_epoch: AtomicU64,
    cart: Arc<Mutex<CartReconciler>>,
    channel: RealtimeChannelManager,
    notifications: SharedNotificationLog,
    sync_api: Arc<dyn CartSyncApi>,
}

impl SessionCoordinator {
    /// Creates a coordinator with an anonymous session and an idle channel.
    pub fn new(
        cart: CartReconciler,
        sync_api: Arc<dyn CartSyncApi>,
        transport: Arc<dyn ChannelTransport>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (session, session_rx) = watch::channel(Session::anonymous());
        let notifications = SharedNotificationLog::new();
        let channel =
            RealtimeChannelManager::new(transport, session_rx, notifications.clone(), policy);
        Self {
            session,
            login_epoch: AtomicU64::new(0),
            cart: Arc::new(Mutex::new(cart)),
            channel,
            notifications,
            sync_api,
        }
    }

    /// Shared handle to the cart. Hold the lock only for local mutations.
    pub fn cart(&self) -> Arc<Mutex<CartReconciler>> {
        Arc::clone(&self.cart)
    }

    pub fn channel(&self) -> &RealtimeChannelManager {
        &self.channel
    }

    pub fn notifications(&self) -> &SharedNotificationLog {
        &self.notifications
    }

    /// The current session.
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Applies the session the application starts with.
    ///
    /// An authenticated start session runs the login path even when the same
    /// session is already current; running it twice syncs twice and still
    /// opens a single channel.
    pub async fn start(&self, session: Session) -> LoginOutcome {
        let (_, epoch) = self.replace_session(session.clone(), true);
        match session.credentials() {
            Some(credentials) => {
                tracing::info!("[SessionCoordinator] Starting with an authenticated session");
                self.login(credentials.clone(), epoch).await
            }
            None => {
                tracing::debug!("[SessionCoordinator] Starting anonymous");
                LoginOutcome::default()
            }
        }
    }

    /// Applies a session change from the authentication collaborator.
    pub async fn set_session(&self, next: Session) -> LoginOutcome {
        let (transition, epoch) = self.replace_session(next.clone(), false);
        match transition {
            SessionTransition::LoggedIn => match next.credentials() {
                Some(credentials) => {
                    tracing::info!("[SessionCoordinator] Logged in");
                    self.login(credentials.clone(), epoch).await
                }
                None => LoginOutcome::default(),
            },
            SessionTransition::LoggedOut => {
                self.logout();
                LoginOutcome::default()
            }
            SessionTransition::Refreshed => {
                tracing::debug!("[SessionCoordinator] Credentials refreshed");
                LoginOutcome::default()
            }
            SessionTransition::Unchanged => LoginOutcome::default(),
        }
    }

    /// Replaces local state with the server cart without uploading local
    /// lines. `None` when no user is logged in.
    pub async fn refresh_cart(&self) -> Option<CartSync> {
        let (credentials, epoch) = self.current_login()?;
        tracing::debug!("[SessionCoordinator] Fetching the server cart");
        let response = self.sync_api.fetch_cart(&credentials).await;
        Some(self.adopt(epoch, response).await)
    }

    /// Swaps in `next` and starts a new login epoch when the swap logs a user
    /// in or out, or when `new_epoch` is set.
    fn replace_session(&self, next: Session, new_epoch: bool) -> (SessionTransition, u64) {
        let mut result = (SessionTransition::Unchanged, 0);
        // Bumped under the session's write lock so readers see a matching epoch.
        self.session.send_modify(|current| {
            let transition = SessionTransition::between(current, &next);
            let bump = new_epoch
                || matches!(
                    transition,
                    SessionTransition::LoggedIn | SessionTransition::LoggedOut
                );
            let epoch = if bump {
                self.login_epoch.fetch_add(1, Ordering::SeqCst) + 1
            } else {
                self.login_epoch.load(Ordering::SeqCst)
            };
            *current = next;
            result = (transition, epoch);
        });
        result
    }

    fn current_login(&self) -> Option<(Credentials, u64)> {
        let session = self.session.borrow();
        let credentials = session.credentials()?.clone();
        Some((credentials, self.login_epoch.load(Ordering::SeqCst)))
    }

    /// Whether the user who started `epoch` is still logged in.
    fn is_current(&self, epoch: u64) -> bool {
        let session = self.session.borrow();
        session.is_authenticated() && self.login_epoch.load(Ordering::SeqCst) == epoch
    }

    /// Merge-on-login, then connect.
    ///
    /// The cart lock is released for the network round trip; a mutation made
    /// while the request is in flight is superseded by the server's cart.
    async fn login(&self, credentials: Credentials, epoch: u64) -> LoginOutcome {
        let snapshot = self.cart.lock().await.snapshot();
        tracing::debug!(
            "[SessionCoordinator] Syncing {} cart lines on login",
            snapshot.len()
        );
        let response = self.sync_api.sync_cart(&credentials, snapshot).await;
        let sync = self.adopt(epoch, response).await;

        let channel_started =
            !sync.is_superseded() && self.is_current(epoch) && self.channel.connect();
        LoginOutcome {
            sync: Some(sync),
            channel_started,
        }
    }

    /// Adopts a server response if `epoch` is still current.
    async fn adopt(&self, epoch: u64, response: Result<Vec<CartItem>, SyncError>) -> CartSync {
        let items = match response {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    "[SessionCoordinator] Cart sync failed, keeping local cart: {}",
                    e
                );
                return CartSync::Failed(e);
            }
        };

        let mut cart = self.cart.lock().await;
        if !self.is_current(epoch) {
            tracing::info!(
                "[SessionCoordinator] Session changed during cart sync, discarding response"
            );
            return CartSync::Superseded;
        }
        match cart.apply_server_cart(items) {
            Ok(report) => CartSync::Applied(report),
            Err(e) => {
                tracing::warn!("[SessionCoordinator] Server cart rejected: {}", e);
                CartSync::Failed(e)
            }
        }
    }

    fn logout(&self) {
        tracing::info!("[SessionCoordinator] Logged out");
        self.channel.disconnect();
        self.notifications.clear();
    }
}

use crate::config::Config;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: UserIdentity,
    pub access_token: String,
}

impl AuthSession {
    /// The bearer token, if it is usable.
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.access_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Identity provider as seen by the chat client. The sign-in handshake
/// itself happens elsewhere; this only hands out the current session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Option<AuthSession>;

    async fn sign_out(&self);

    /// Receives every session change, starting from the current value.
    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>>;
}

/// Provider over a session supplied up front (environment or flags).
pub struct StaticSessionProvider {
    session_tx: watch::Sender<Option<AuthSession>>,
}

impl StaticSessionProvider {
    pub fn new(session: Option<AuthSession>) -> Self {
        let (session_tx, _) = watch::channel(session);
        Self { session_tx }
    }

    pub fn from_config(config: &Config) -> Self {
        let session = config.access_token.as_ref().map(|token| AuthSession {
            user: UserIdentity {
                email: config.user_email.clone(),
            },
            access_token: token.clone(),
        });
        Self::new(session)
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_session(&self) -> Option<AuthSession> {
        self.session_tx.borrow().clone()
    }

    async fn sign_out(&self) {
        self.session_tx.send_replace(None);
        tracing::debug!("session signed out");
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session_tx.subscribe()
    }
}

/// Authentication snapshot used to gate the chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub user: Option<UserIdentity>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn from_session(session: Option<&AuthSession>) -> Self {
        Self {
            user: session.map(|session| session.user.clone()),
            loading: false,
        }
    }

    pub async fn resolve(provider: &dyn SessionProvider) -> Self {
        Self::from_session(provider.current_session().await.as_ref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

//! The session manager (§4.1): owns per-switch mutual exclusion, maps
//! opaque session identifiers to (driver instance, switch identity,
//! transaction state), and enforces inactivity expiry.

use crate::lock::SwitchLockTable;
use netman_drivers::{DriverRegistry, SwitchDriver, TransactionalDriver};
use netman_model::{NetmanError, NetmanResult, SwitchDescriptor};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit};
use tracing::warn;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = NetmanResult<T>> + Send + 'a>>;

/// Raised by [`SessionManager::open`]; distinct from [`NetmanError`] because
/// a duplicate client-chosen id is a usage error the closed taxonomy of §7
/// has no slot for.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("session '{0}' already exists")]
    DuplicateSessionId(String),
    #[error(transparent)]
    Netman(#[from] NetmanError),
}

struct SessionState {
    driver: TransactionalDriver,
    in_transaction: bool,
    last_touched: Instant,
    _lock: OwnedSemaphorePermit,
}

struct Session {
    id: String,
    state: Mutex<SessionState>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub inactivity_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(120),
        }
    }
}

/// Owns every open [`Session`], the per-switch lock table, and the
/// background inactivity sweep. Cheap to clone (it is always held behind an
/// `Arc`); the sweep task holds its own `Arc` so the manager outlives any
/// single handle.
pub struct SessionManager {
    registry: DriverRegistry,
    locks: SwitchLockTable,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    by_hostname: Mutex<HashMap<String, String>>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(registry: DriverRegistry, config: SessionConfig) -> Arc<Self> {
        let manager = Arc::new(Self {
            registry,
            locks: SwitchLockTable::default(),
            sessions: Mutex::new(HashMap::new()),
            by_hostname: Mutex::new(HashMap::new()),
            config,
        });
        manager.clone().spawn_expiry_sweep();
        manager
    }

    /// One background scheduler polling `last_touched`, per the design note
    /// in §9 ("avoids per-session timer churn").
    fn spawn_expiry_sweep(self: Arc<Self>) {
        let poll_interval = (self.config.inactivity_timeout / 4)
            .clamp(Duration::from_millis(250), Duration::from_secs(5));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                self.expire_stale_sessions().await;
            }
        });
    }

    async fn expire_stale_sessions(&self) {
        let now = Instant::now();
        let timeout = self.config.inactivity_timeout;
        let stale: Vec<Arc<Session>> = {
            let sessions = self.sessions.lock().await;
            let mut stale = Vec::new();
            for session in sessions.values() {
                let last_touched = session.state.lock().await.last_touched;
                if now.duration_since(last_touched) >= timeout {
                    stale.push(session.clone());
                }
            }
            stale
        };
        for session in stale {
            warn!(
                target: "engine::session",
                session = %session.id,
                "inactivity timeout expired, forcing close"
            );
            self.force_close(&session.id).await;
        }
    }

    /// Acquires the switch's exclusive lock (blocking other openers),
    /// instantiates and connects a driver, and registers the session under
    /// the client-chosen `id`.
    pub async fn open(&self, id: String, descriptor: SwitchDescriptor) -> Result<(), OpenError> {
        {
            let sessions = self.sessions.lock().await;
            if sessions.contains_key(&id) {
                return Err(OpenError::DuplicateSessionId(id));
            }
        }

        let permit = self.locks.acquire(descriptor.key()).await;

        let result = self.connect_driver(&descriptor).await;
        let mut driver = match result {
            Ok(driver) => driver,
            Err(err) => {
                drop(permit);
                return Err(err.into());
            }
        };
        if let Err(err) = driver.connect().await {
            driver.disconnect().await;
            drop(permit);
            return Err(err.into());
        }

        let session = Arc::new(Session {
            id: id.clone(),
            state: Mutex::new(SessionState {
                driver,
                in_transaction: false,
                last_touched: Instant::now(),
                _lock: permit,
            }),
        });

        self.sessions.lock().await.insert(id.clone(), session);
        self.by_hostname
            .lock()
            .await
            .insert(descriptor.hostname.clone(), id);
        Ok(())
    }

    async fn connect_driver(&self, descriptor: &SwitchDescriptor) -> NetmanResult<TransactionalDriver> {
        let driver = self.registry.build(descriptor).ok_or_else(|| {
            NetmanError::Unavailable(format!("no driver registered for model '{}'", descriptor.model))
        })?;
        Ok(TransactionalDriver::new(driver))
    }

    /// Releases the switch lock. Rolls back first if the session is still in
    /// a transaction (§4.1).
    pub async fn close(&self, session_id: &str) -> NetmanResult<()> {
        let session = self.remove_session(session_id).await?;
        self.teardown(session).await;
        Ok(())
    }

    async fn force_close(&self, session_id: &str) {
        if let Ok(session) = self.remove_session(session_id).await {
            self.teardown(session).await;
        }
    }

    async fn remove_session(&self, session_id: &str) -> NetmanResult<Arc<Session>> {
        let session = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(session_id)
        };
        match session {
            Some(session) => {
                let mut by_hostname = self.by_hostname.lock().await;
                by_hostname.retain(|_, v| v != session_id);
                Ok(session)
            }
            None => Err(NetmanError::SessionExpired(session_id.to_string())),
        }
    }

    /// Rollback-if-in-transaction, then `end_transaction` and disconnect.
    /// Failures are logged but never block removal of the session record,
    /// per §5's cancellation rules.
    async fn teardown(&self, session: Arc<Session>) {
        let mut state = session.state.lock().await;
        if state.in_transaction {
            if let Err(err) = state.driver.rollback_transaction().await {
                warn!(
                    target: "engine::session",
                    session = %session.id,
                    "rollback on close failed: {err}"
                );
            }
        }
        if let Err(err) = state.driver.end_transaction().await {
            warn!(
                target: "engine::session",
                session = %session.id,
                "end_transaction on close failed: {err}"
            );
        }
        state.driver.disconnect().await;
    }

    /// Force-closes every open session. Called on process shutdown (§5c).
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, v)| v).collect()
        };
        self.by_hostname.lock().await.clear();
        for session in sessions {
            self.teardown(session).await;
        }
    }

    async fn get_session(&self, session_id: &str) -> NetmanResult<Arc<Session>> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| NetmanError::SessionExpired(session_id.to_string()))
    }

    /// Resolves the id of whichever session currently holds the lock for
    /// `hostname`, for the hostname-addressed semantic routes of §6.
    pub async fn session_id_for_hostname(&self, hostname: &str) -> Option<String> {
        self.by_hostname.lock().await.get(hostname).cloned()
    }

    /// Resets the inactivity timer. Called on every action and semantic
    /// operation (§4.1); `with_driver` below calls this implicitly so every
    /// caller gets it for free.
    pub async fn touch(&self, session_id: &str) -> NetmanResult<()> {
        let session = self.get_session(session_id).await?;
        session.state.lock().await.last_touched = Instant::now();
        Ok(())
    }

    /// Runs `f` against the session's driver, touching the session first.
    /// This is `invoke(session_id, op, args)` of §4.1: the session's own
    /// mutex serialises concurrent calls on the same session (§5).
    pub async fn with_driver<F, T>(&self, session_id: &str, f: F) -> NetmanResult<T>
    where
        F: for<'a> FnOnce(&'a mut TransactionalDriver) -> BoxFuture<'a, T>,
    {
        let session = self.get_session(session_id).await?;
        let mut state = session.state.lock().await;
        state.last_touched = Instant::now();
        f(&mut state.driver).await
    }

    pub async fn start_transaction(&self, session_id: &str) -> NetmanResult<()> {
        let session = self.get_session(session_id).await?;
        let mut state = session.state.lock().await;
        state.last_touched = Instant::now();
        state.driver.start_transaction().await?;
        state.in_transaction = true;
        Ok(())
    }

    /// Commit is fatal to the batch but the session stays open (§7): the
    /// wrapper already discarded on failure, so `in_transaction` is left
    /// untouched either way.
    pub async fn commit(&self, session_id: &str) -> NetmanResult<()> {
        let session = self.get_session(session_id).await?;
        let mut state = session.state.lock().await;
        state.last_touched = Instant::now();
        state.driver.commit_transaction().await
    }

    pub async fn end_transaction(&self, session_id: &str) -> NetmanResult<()> {
        let session = self.get_session(session_id).await?;
        let mut state = session.state.lock().await;
        state.last_touched = Instant::now();
        let result = state.driver.end_transaction().await;
        state.in_transaction = false;
        result
    }

    pub async fn rollback(&self, session_id: &str) -> NetmanResult<()> {
        let session = self.get_session(session_id).await?;
        let mut state = session.state.lock().await;
        state.last_touched = Instant::now();
        state.driver.rollback_transaction().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use netman_drivers::{DriverFactory, SwitchDriver};
    use netman_model::{Bond, Interface, PortMode, SwitchingAttributes, Vlan};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;
    use tokio::time::{sleep, timeout};

    #[derive(Default)]
    struct StubDriver {
        connected: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SwitchDriver for StubDriver {
        async fn connect(&mut self) -> NetmanResult<()> {
            self.connected.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn disconnect(&mut self) {}
        async fn start_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn end_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn commit_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn rollback_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn get_vlans(&mut self) -> NetmanResult<Vec<Vlan>> {
            Ok(vec![])
        }
        async fn get_vlan(&mut self, number: u16) -> NetmanResult<Vlan> {
            Ok(Vlan::new(number))
        }
        async fn get_interfaces(&mut self) -> NetmanResult<Vec<Interface>> {
            Ok(vec![])
        }
        async fn get_interface(&mut self, name: &str) -> NetmanResult<Interface> {
            Ok(Interface::new(name))
        }
        async fn get_bonds(&mut self) -> NetmanResult<Vec<Bond>> {
            Ok(vec![])
        }
        async fn get_bond(&mut self, number: u32) -> NetmanResult<Bond> {
            Ok(Bond::new(number, format!("ae{number}")))
        }
        async fn add_vlan(&mut self, _number: u16, _name: Option<&str>) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_vlan(&mut self, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_access_mode(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_trunk_mode(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_access_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_access_vlan(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn configure_native_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_native_vlan(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn add_trunk_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_trunk_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_interface_description(&mut self, _interface: &str, _text: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_interface_description(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn edit_interface_spanning_tree(&mut self, _interface: &str, _edge: bool) -> NetmanResult<()> {
            Ok(())
        }
        async fn openup_interface(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn shutdown_interface(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn enable_lldp(&mut self, _interface: &str, _enabled: bool) -> NetmanResult<()> {
            Ok(())
        }
        async fn add_bond(&mut self, _number: u32) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_bond(&mut self, _number: u32) -> NetmanResult<()> {
            Ok(())
        }
        async fn add_interface_to_bond(&mut self, _interface: &str, _number: u32) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_interface_from_bond(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_bond_link_speed(&mut self, _number: u32, _speed: &str) -> NetmanResult<()> {
            Ok(())
        }
        fn bond_interface_name(&self, number: u32) -> String {
            format!("ae{number}")
        }
    }

    struct StubFactory;
    impl DriverFactory for StubFactory {
        fn build(&self, _descriptor: &SwitchDescriptor) -> Box<dyn SwitchDriver> {
            Box::new(StubDriver::default())
        }
    }

    fn registry() -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        registry.register("cisco_ios", Box::new(StubFactory));
        registry
    }

    fn descriptor(hostname: &str) -> SwitchDescriptor {
        SwitchDescriptor {
            model: "cisco_ios".into(),
            hostname: hostname.into(),
            username: "admin".into(),
            password: "secret".into(),
            port: None,
        }
    }

    #[tokio::test]
    async fn second_session_on_same_switch_blocks_until_first_closes() {
        let manager = SessionManager::new(
            registry(),
            SessionConfig {
                inactivity_timeout: Duration::from_secs(2),
            },
        );

        manager
            .open("a".into(), descriptor("c1"))
            .await
            .expect("first session opens");
        manager.start_transaction("a").await.unwrap();

        let manager2 = manager.clone();
        let opener = tokio::spawn(async move { manager2.open("b".into(), descriptor("c1")).await });

        sleep(StdDuration::from_millis(30)).await;
        assert!(!opener.is_finished(), "second opener must still be blocked");

        manager.commit("a").await.unwrap();
        manager.end_transaction("a").await.unwrap();
        manager.close("a").await.unwrap();

        let result = timeout(StdDuration::from_secs(1), opener)
            .await
            .expect("opener task completes")
            .expect("task did not panic");
        assert!(result.is_ok(), "second session must open once the first closes");
    }

    #[tokio::test]
    async fn duplicate_session_id_is_rejected() {
        let manager = SessionManager::new(registry(), SessionConfig::default());
        manager.open("dup".into(), descriptor("c1")).await.unwrap();
        let err = manager.open("dup".into(), descriptor("c2")).await.unwrap_err();
        assert!(matches!(err, OpenError::DuplicateSessionId(id) if id == "dup"));
    }

    #[tokio::test]
    async fn hostname_resolves_to_open_session() {
        let manager = SessionManager::new(registry(), SessionConfig::default());
        manager.open("s1".into(), descriptor("c1")).await.unwrap();
        assert_eq!(manager.session_id_for_hostname("c1").await, Some("s1".to_string()));
        manager.close("s1").await.unwrap();
        assert_eq!(manager.session_id_for_hostname("c1").await, None);
    }

    #[tokio::test]
    async fn inactivity_timeout_force_closes_and_releases_lock() {
        let manager = SessionManager::new(
            registry(),
            SessionConfig {
                inactivity_timeout: Duration::from_millis(100),
            },
        );
        manager.open("expiring".into(), descriptor("c1")).await.unwrap();

        sleep(StdDuration::from_millis(400)).await;

        let err = manager.touch("expiring").await.unwrap_err();
        assert_eq!(err, NetmanError::SessionExpired("expiring".to_string()));

        let reopened = timeout(StdDuration::from_secs(1), manager.open("again".into(), descriptor("c1"))).await;
        assert!(reopened.is_ok(), "lock must be released once the expired session is swept");
    }

    #[tokio::test]
    async fn with_driver_returns_semantic_result() {
        let manager = SessionManager::new(registry(), SessionConfig::default());
        manager.open("s1".into(), descriptor("c1")).await.unwrap();
        let vlan = manager
            .with_driver("s1", |d| Box::pin(async move { d.get_vlan(42).await }))
            .await
            .unwrap();
        assert_eq!(vlan.number, 42);
    }

    #[allow(dead_code)]
    fn assert_attrs_shape(_: SwitchingAttributes, _: PortMode) {}
}

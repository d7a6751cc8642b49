//! Persistent tunnel configuration store
//!
//! A [`ConfStore`] owns the tunnel index, the name of the active tunnel and
//! a one-time initialization. It is single threaded: handles are cheap
//! clones over shared state and every operation runs on the caller's task.

pub mod error;
pub mod index;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use log::{debug, error, info, warn};
use serde_json::Value;

pub use error::StoreError;
pub use index::{IndexError, TunnelIndex, TunnelIndexEntry};

use crate::models::{SystemConfig, TunnelDocument};
use crate::platform::Platform;
use crate::process::{query_status, NoProcess, ProcessControl};
use crate::settings::StoreSettings;
use crate::validator::{validate_document, SchemaId};
use crate::vfs::{BaseDir, FileAccess, LocalFs};

/// Change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The in-memory index was replaced with a freshly loaded one
    IndexChanged,
    /// The active tunnel was set or cleared
    ActiveChanged(Option<String>),
}

type Listener = Box<dyn Fn(&StoreEvent)>;
type InitFuture = Shared<LocalBoxFuture<'static, Result<(), StoreError>>>;

enum InitState {
    NotStarted,
    InProgress(InitFuture),
    Done,
}

struct StoreInner<F, P> {
    fs: F,
    process: P,
    platform: Platform,
    settings: StoreSettings,
    index: RefCell<TunnelIndex>,
    active: RefCell<Option<String>>,
    init: RefCell<InitState>,
    listeners: RefCell<Vec<Listener>>,
}

/// Handle to the configuration store
///
/// Clones share the same index and initialization state.
pub struct ConfStore<F, P = NoProcess> {
    inner: Rc<StoreInner<F, P>>,
}

impl<F, P> Clone for ConfStore<F, P> {
    fn clone(&self) -> Self {
        ConfStore {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Tunnel names become file names, so path separators and parent
/// references are refused.
fn check_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name.contains("..")
        || name.chars().any(char::is_control);
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Serialize a payload for storage, validating it first unless told not to
fn encode_payload(payload: &Value, skip_validation: bool) -> Result<String, StoreError> {
    if skip_validation {
        return Ok(serde_json::to_string_pretty(payload)?);
    }
    let document = validate_document(payload)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Decode a stored body; hand-edited bodies may use JSON5 comments and
/// trailing commas
fn parse_document(content: &str) -> Result<TunnelDocument, String> {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(_) => json5::from_str(content)
            .map(integral_numbers)
            .map_err(|e| e.to_string())?,
    };
    let document = match SchemaId::detect(&value) {
        SchemaId::Tunnel => serde_json::from_value(value).map(TunnelDocument::Legacy),
        SchemaId::SingBox => serde_json::from_value(value).map(TunnelDocument::SingBox),
    };
    document.map_err(|e| e.to_string())
}

// json5 may surface whole numbers as floats, which typed ports refuse
fn integral_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, integral_numbers(item)))
                .collect(),
        ),
        other => other,
    }
}

impl<F: FileAccess, P: ProcessControl> StoreInner<F, P> {
    fn base(&self) -> BaseDir {
        self.platform.base_dir()
    }

    fn notify(&self, event: &StoreEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(event);
        }
    }

    fn set_active(&self, name: Option<String>) {
        *self.active.borrow_mut() = name.clone();
        self.notify(&StoreEvent::ActiveChanged(name));
    }

    async fn run_initialization(&self) -> Result<(), StoreError> {
        debug!(
            "Initializing configuration store on {} ({:?})",
            self.platform.os(),
            self.base()
        );
        self.ensure_dir(&self.settings.user_dir).await?;
        self.ensure_dir(&self.settings.conf_dir).await?;
        self.load_index().await;
        if self.platform.is_desktop() {
            self.reconcile_process().await;
        }
        info!(
            "Configuration store ready with {} tunnel(s)",
            self.index.borrow().len()
        );
        Ok(())
    }

    async fn ensure_dir(&self, path: &str) -> Result<(), StoreError> {
        let base = self.base();
        let exists = self
            .fs
            .exists(path, base)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        if !exists {
            debug!("Creating directory {}", path);
            self.fs
                .mkdir(path, base)
                .await
                .map_err(|e| StoreError::io(path, e))?;
        }
        Ok(())
    }

    /// Replace the in-memory index with the stored one
    async fn load_index(&self) {
        let path = &self.settings.index_file;
        let index = match self.fs.read_text(path, self.base()).await {
            Ok(content) => TunnelIndex::deserialize(&content),
            Err(e) if e.is_not_found() => {
                debug!("No tunnel index at {}, starting empty", path);
                TunnelIndex::new()
            }
            Err(e) => {
                warn!("Failed to read tunnel index {}: {}", path, e);
                TunnelIndex::new()
            }
        };
        *self.index.borrow_mut() = index;
        self.notify(&StoreEvent::IndexChanged);
    }

    /// Persist the in-memory index, then reload it from storage
    ///
    /// A reload that cannot read or parse the file keeps the in-memory
    /// index, which is what was just written.
    async fn save_index(&self) -> Result<(), StoreError> {
        let path = &self.settings.index_file;
        let content = self.index.borrow().serialize()?;
        if let Err(e) = self.fs.write_text(path, self.base(), &content).await {
            error!("Failed to write tunnel index {}: {}", path, e);
            return Err(StoreError::io(path, e));
        }
        match self.fs.read_text(path, self.base()).await {
            Ok(stored) => match TunnelIndex::parse(&stored) {
                Ok(index) => *self.index.borrow_mut() = index,
                Err(e) => warn!("Keeping in-memory tunnel index, {} is unreadable: {}", path, e),
            },
            Err(e) => warn!("Keeping in-memory tunnel index, reload of {} failed: {}", path, e),
        }
        self.notify(&StoreEvent::IndexChanged);
        Ok(())
    }

    /// Adopt a tunnel the proxy process is already running, or stop a
    /// process whose tunnel is no longer indexed
    async fn reconcile_process(&self) {
        let status = query_status(&self.process).await;
        if !status.is_running {
            return;
        }
        let indexed = status
            .name
            .as_deref()
            .is_some_and(|name| self.index.borrow().contains(name));
        if indexed {
            info!("Adopting running tunnel {:?}", status.name);
            self.set_active(status.name);
        } else {
            warn!(
                "Proxy process runs unknown tunnel {:?}, stopping it",
                status.name
            );
            if let Err(e) = self.process.stop().await {
                warn!("Failed to stop orphaned proxy process: {}", e);
            }
        }
    }

    /// Write a body and index it
    async fn store_tunnel(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let path = self.settings.tunnel_path(name);
        self.fs
            .write_text(&path, self.base(), content)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        let snapshot = self.index.borrow().clone();
        self.index.borrow_mut().insert(name, &path)?;
        if let Err(e) = self.save_index().await {
            *self.index.borrow_mut() = snapshot;
            return Err(e);
        }
        info!("Saved tunnel {} to {}", name, path);
        Ok(())
    }
}

impl<P: ProcessControl + 'static> ConfStore<LocalFs, P> {
    /// Store on the local disk of the current platform
    pub fn from_env(process: P, settings: StoreSettings) -> Result<Self, StoreError> {
        let fs = LocalFs::from_env(&settings.app_identifier)
            .map_err(|e| StoreError::io(&settings.app_identifier, e))?;
        Ok(Self::with_platform(
            fs,
            process,
            Platform::current().clone(),
            settings,
        ))
    }
}

impl<F: FileAccess + 'static, P: ProcessControl + 'static> ConfStore<F, P> {
    /// Store for the current platform with the default layout
    pub fn new(fs: F, process: P) -> Self {
        Self::with_platform(
            fs,
            process,
            Platform::current().clone(),
            StoreSettings::default(),
        )
    }

    pub fn with_platform(fs: F, process: P, platform: Platform, settings: StoreSettings) -> Self {
        ConfStore {
            inner: Rc::new(StoreInner {
                fs,
                process,
                platform,
                settings,
                index: RefCell::new(TunnelIndex::new()),
                active: RefCell::new(None),
                init: RefCell::new(InitState::NotStarted),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.inner.settings
    }

    pub fn platform(&self) -> &Platform {
        &self.inner.platform
    }

    pub fn file_access(&self) -> &F {
        &self.inner.fs
    }

    pub fn process(&self) -> &P {
        &self.inner.process
    }

    /// Register a change listener
    ///
    /// Listeners run synchronously and must not subscribe from inside the
    /// callback.
    pub fn subscribe(&self, listener: impl Fn(&StoreEvent) + 'static) {
        self.inner.listeners.borrow_mut().push(Box::new(listener));
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.inner.init.borrow(), InitState::Done)
    }

    /// Snapshot of the index entries in insertion order
    pub fn tunnels(&self) -> Vec<TunnelIndexEntry> {
        self.inner.index.borrow().entries().to_vec()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.index.borrow().contains(name)
    }

    pub fn active_tunnel(&self) -> Option<String> {
        self.inner.active.borrow().clone()
    }

    /// Record that the proxy process now runs `name`
    pub fn mark_running(&self, name: &str) -> Result<(), StoreError> {
        if !self.contains(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        self.inner.set_active(Some(name.to_string()));
        Ok(())
    }

    pub fn mark_stopped(&self) {
        if self.inner.active.borrow().is_some() {
            self.inner.set_active(None);
        }
    }

    /// Prepare storage, load the index and reconcile with a running proxy
    ///
    /// Runs at most once. Callers arriving while it is in flight await the
    /// same attempt; once it has succeeded further calls return at once.
    /// A failed attempt leaves the store uninitialized so it can be retried.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let pending = {
            let mut state = self.inner.init.borrow_mut();
            let pending = match std::mem::replace(&mut *state, InitState::NotStarted) {
                InitState::Done => {
                    *state = InitState::Done;
                    return Ok(());
                }
                InitState::InProgress(pending) => pending,
                InitState::NotStarted => {
                    let inner = Rc::clone(&self.inner);
                    async move { inner.run_initialization().await }
                        .boxed_local()
                        .shared()
                }
            };
            *state = InitState::InProgress(pending.clone());
            pending
        };

        let result = pending.clone().await;

        let mut state = self.inner.init.borrow_mut();
        let current = matches!(&*state, InitState::InProgress(running) if running.ptr_eq(&pending));
        if current {
            *state = match &result {
                Ok(()) => InitState::Done,
                Err(e) => {
                    error!("Configuration store initialization failed: {}", e);
                    InitState::NotStarted
                }
            };
        }
        result
    }

    /// Store a new tunnel under `name`
    ///
    /// The payload is validated against the schema its shape selects unless
    /// `skip_validation` is set, in which case it is stored verbatim.
    pub async fn add_tunnel(
        &self,
        name: &str,
        payload: &Value,
        skip_validation: bool,
    ) -> Result<(), StoreError> {
        check_name(name)?;
        if self.contains(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        let content = encode_payload(payload, skip_validation)?;
        self.inner.store_tunnel(name, &content).await
    }

    /// Read and parse the body of `name`
    ///
    /// Absent, unreadable and unparsable bodies all give `None`.
    pub async fn load_tunnel(&self, name: &str) -> Option<TunnelDocument> {
        let path = self.inner.index.borrow().lookup(name)?.to_string();
        let content = match self.inner.fs.read_text(&path, self.inner.base()).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read tunnel {} from {}: {}", name, path, e);
                return None;
            }
        };
        match parse_document(&content) {
            Ok(document) => Some(document),
            Err(e) => {
                warn!("Tunnel {} at {} is not a valid document: {}", name, path, e);
                None
            }
        }
    }

    /// Replace the body of `name`
    ///
    /// The new payload is validated before anything is touched. The running
    /// tunnel keeps its index entry and has its body rewritten in place.
    /// Any other tunnel is deleted and added again, which is not atomic: a
    /// storage failure between the two steps leaves the tunnel absent.
    pub async fn update_tunnel(
        &self,
        name: &str,
        payload: &Value,
        skip_validation: bool,
    ) -> Result<(), StoreError> {
        check_name(name)?;
        let content = encode_payload(payload, skip_validation)?;

        let running = self.inner.active.borrow().as_deref() == Some(name);
        let in_place = if running {
            self.inner.index.borrow().lookup(name).map(str::to_string)
        } else {
            None
        };
        if let Some(path) = in_place {
            self.inner
                .fs
                .write_text(&path, self.inner.base(), &content)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
            info!("Rewrote running tunnel {} in place", name);
            return Ok(());
        }

        self.delete_tunnel(name).await?;
        self.inner.store_tunnel(name, &content).await
    }

    /// Remove `name` from the index and clear its body
    ///
    /// Removing a name that is not indexed succeeds. The running tunnel
    /// cannot be removed.
    pub async fn delete_tunnel(&self, name: &str) -> Result<(), StoreError> {
        if self.inner.active.borrow().as_deref() == Some(name) {
            return Err(StoreError::InUse(name.to_string()));
        }

        let snapshot = self.inner.index.borrow().clone();
        let removed = self.inner.index.borrow_mut().remove(name);
        let body = match removed {
            Some(entry) => {
                if let Err(e) = self.inner.save_index().await {
                    *self.inner.index.borrow_mut() = snapshot;
                    return Err(e);
                }
                Some(entry.path)
            }
            None if check_name(name).is_ok() => {
                let path = self.inner.settings.tunnel_path(name);
                let orphaned = self
                    .inner
                    .fs
                    .exists(&path, self.inner.base())
                    .await
                    .unwrap_or(false);
                orphaned.then_some(path)
            }
            None => None,
        };

        if let Some(path) = body {
            if let Err(e) = self.inner.fs.write_text(&path, self.inner.base(), "").await {
                warn!("Failed to clear tunnel body {}: {}", path, e);
            }
        }
        info!("Deleted tunnel {}", name);
        Ok(())
    }

    /// Absolute on-disk location of the body of `name`, for handing to the
    /// proxy process
    pub fn absolute_config_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.inner.index.borrow().lookup(name)?.to_string();
        self.inner.fs.resolve(&path, self.inner.base())
    }

    /// Read the application preferences, falling back to defaults
    pub async fn load_system_config(&self) -> SystemConfig {
        let path = &self.inner.settings.system_file;
        match self.inner.fs.read_text(path, self.inner.base()).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable system config {}: {}", path, e);
                SystemConfig::default()
            }),
            Err(e) => {
                debug!("No system config at {}: {}", path, e);
                SystemConfig::default()
            }
        }
    }

    pub async fn save_system_config(&self, config: &SystemConfig) -> Result<(), StoreError> {
        let path = &self.inner.settings.system_file;
        let content = serde_json::to_string_pretty(config)?;
        self.inner
            .fs
            .write_text(path, self.inner.base(), &content)
            .await
            .map_err(|e| StoreError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_name() {
        assert!(check_name("home").is_ok());
        assert!(check_name("my tunnel 2").is_ok());
        for bad in ["", "  ", "a/b", "a\\b", "..", "x..y", "tab\there"] {
            assert_eq!(
                check_name(bad),
                Err(StoreError::InvalidName(bad.to_string())),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_document_picks_schema_by_shape() {
        let legacy = r#"{
            "run_type": "client",
            "local_addr": "127.0.0.1",
            "local_port": 1080,
            "remote_addr": "example.com",
            "remote_port": 443,
            "password": ["secret"]
        }"#;
        let document = parse_document(legacy).unwrap();
        assert_eq!(document.local_port(), Some(1080));
        assert!(document.as_legacy().is_some());

        assert!(parse_document("").is_err());
        assert!(parse_document("{\"log\": 1}").is_err());
    }

    #[test]
    fn test_parse_document_accepts_json5() {
        let edited = r#"{
            // edited by hand
            run_type: "client",
            local_addr: "127.0.0.1",
            local_port: 1080,
            remote_addr: "example.com",
            remote_port: 443,
            password: ["secret",],
        }"#;
        let document = parse_document(edited).unwrap();
        assert_eq!(document.local_port(), Some(1080));
    }

    #[test]
    fn test_skip_validation_stores_payload_verbatim() {
        let payload = serde_json::json!({"anything": [1, 2, 3]});
        let content = encode_payload(&payload, true).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&content).unwrap(), payload);
        assert!(matches!(
            encode_payload(&payload, false),
            Err(StoreError::InvalidConfig(_))
        ));
    }
}

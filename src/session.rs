//! Session Store
//!
//! Holds the bearer token and the signed-in user's profile between runs.
//! Values are read from the store every time they are needed; the only
//! writers are the 401 path (token removal) and the operator CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Persisted session state
pub trait SessionStore: Send + Sync {
    /// Current bearer token, if any
    fn token(&self) -> Result<Option<String>, SessionError>;

    /// Stored user profile, if any
    fn user_profile(&self) -> Result<Option<UserProfile>, SessionError>;

    /// Remove the stored token
    fn clear_token(&self) -> Result<(), SessionError>;

    /// Replace the stored user profile
    fn save_profile(&self, profile: &UserProfile) -> Result<(), SessionError>;

    /// Node identifier of the signed-in user
    fn node_id(&self) -> Result<NodeId, SessionError> {
        self.user_profile()?
            .ok_or(SessionError::MissingProfile)?
            .node_id()
    }
}

/// User profile as returned by the backend's auth endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rol: Option<String>,
    /// Node the user is assigned to (number or string on the wire)
    #[serde(default)]
    pub nodo_id: Option<serde_json::Value>,
    /// Remaining profile fields, preserved on save
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Profile assigned to the given node
    pub fn for_node(node_id: impl Into<serde_json::Value>) -> Self {
        Self {
            nodo_id: Some(node_id.into()),
            ..Self::default()
        }
    }

    /// Extract the node identifier
    pub fn node_id(&self) -> Result<NodeId, SessionError> {
        match &self.nodo_id {
            Some(serde_json::Value::Number(n)) => Ok(NodeId(n.to_string())),
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                Ok(NodeId(s.trim().to_string()))
            }
            None | Some(serde_json::Value::Null) => Err(SessionError::MissingNodeId),
            Some(other) => Err(SessionError::MalformedProfile(format!(
                "unexpected nodo_id value: {}",
                other
            ))),
        }
    }
}

/// Identifier of a monitored node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for use as a URL path segment
    pub fn path_segment(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk layout of the session file
///
/// The profile is kept as raw JSON so a malformed profile does not make the
/// token unreadable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<serde_json::Value>,
}

impl SessionState {
    fn profile(&self) -> Result<Option<UserProfile>, SessionError> {
        match &self.user {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| SessionError::MalformedProfile(e.to_string())),
        }
    }

    fn set_profile(&mut self, profile: &UserProfile) -> Result<(), SessionError> {
        let value = serde_json::to_value(profile)
            .map_err(|e| SessionError::MalformedProfile(e.to_string()))?;
        self.user = Some(value);
        Ok(())
    }
}

// ============================================
// File-backed store
// ============================================

/// Session persisted as a JSON file
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a token obtained elsewhere
    pub fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.update(|state| {
            state.token = Some(token.to_string());
            Ok(())
        })
    }

    fn read(&self) -> Result<SessionState, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionState::default())
            }
            Err(e) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    error: e.to_string(),
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(SessionState::default());
        }

        serde_json::from_str(&content).map_err(|e| SessionError::Corrupt {
            path: self.path.clone(),
            error: e.to_string(),
        })
    }

    fn write(&self, state: &SessionState) -> Result<(), SessionError> {
        let io_err = |e: std::io::Error| SessionError::Io {
            path: self.path.clone(),
            error: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| SessionError::Corrupt {
            path: self.path.clone(),
            error: e.to_string(),
        })?;
        std::fs::write(&self.path, content).map_err(io_err)
    }

    fn update<F>(&self, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut SessionState) -> Result<(), SessionError>,
    {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        let mut state = self.read()?;
        f(&mut state)?;
        self.write(&state)
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Result<Option<String>, SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(self.read()?.token)
    }

    fn user_profile(&self) -> Result<Option<UserProfile>, SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        self.read()?.profile()
    }

    fn clear_token(&self) -> Result<(), SessionError> {
        let _guard = self.lock.lock().map_err(|_| SessionError::Poisoned)?;
        let mut state = self.read()?;
        if state.token.is_none() {
            return Ok(());
        }
        state.token = None;
        self.write(&state)
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<(), SessionError> {
        self.update(|state| state.set_profile(profile))
    }
}

// ============================================
// In-memory store
// ============================================

/// Session held in memory only
#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bearer token
    pub fn with_token(self, token: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.token = Some(token.into());
        }
        self
    }

    /// Set the raw stored user object
    pub fn with_user(self, user: serde_json::Value) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.user = Some(user);
        }
        self
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Result<Option<String>, SessionError> {
        let state = self.state.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(state.token.clone())
    }

    fn user_profile(&self) -> Result<Option<UserProfile>, SessionError> {
        let state = self.state.lock().map_err(|_| SessionError::Poisoned)?;
        state.profile()
    }

    fn clear_token(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().map_err(|_| SessionError::Poisoned)?;
        state.token = None;
        Ok(())
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<(), SessionError> {
        let mut state = self.state.lock().map_err(|_| SessionError::Poisoned)?;
        state.set_profile(profile)
    }
}

// ============================================
// Errors
// ============================================

/// Errors reading or writing the session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No user profile stored")]
    MissingProfile,

    #[error("Stored user profile is malformed: {0}")]
    MalformedProfile(String),

    #[error("Stored user profile has no node assigned")]
    MissingNodeId,

    #[error("Stored token is not a valid header value")]
    InvalidToken,

    #[error("Failed to access session file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Session file {path:?} is corrupt: {error}")]
    Corrupt { path: PathBuf, error: String },

    #[error("Session lock poisoned")]
    Poisoned,
}

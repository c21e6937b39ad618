//! Credential slot storage and the active-role marker.
//!
//! Tokens live in `<base>/credentials.json` with restricted permissions
//! (0600). Tokens are never logged in full. Reads fail open: a missing or
//! unreadable file yields an empty store and requests simply proceed
//! unauthenticated; the server still rejects them. This is a deliberate
//! policy, not silent data loss.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;
use crate::error::{ApiError, ApiResult};

/// Credential cache filename.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Named storage location holding at most one token for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSlot {
    Student,
    School,
    Parent,
    Admin,
    /// The shared "last logged in" token the backend accepts for student
    /// and admin endpoints.
    Generic,
}

impl CredentialSlot {
    /// Every slot, in clear-all order.
    pub const ALL: [CredentialSlot; 5] = [
        CredentialSlot::Student,
        CredentialSlot::School,
        CredentialSlot::Parent,
        CredentialSlot::Admin,
        CredentialSlot::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CredentialSlot::Student => "student",
            CredentialSlot::School => "school",
            CredentialSlot::Parent => "parent",
            CredentialSlot::Admin => "admin",
            CredentialSlot::Generic => "generic",
        }
    }
}

/// Role the caller currently presents as logged in.
///
/// Independent of which slots hold tokens; a stale student token may sit
/// next to an active school session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveRole {
    Student,
    School,
    Parent,
}

impl ActiveRole {
    /// Slot holding this role's login token.
    pub fn slot(self) -> CredentialSlot {
        match self {
            ActiveRole::Student => CredentialSlot::Student,
            ActiveRole::School => CredentialSlot::School,
            ActiveRole::Parent => CredentialSlot::Parent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActiveRole::Student => "student",
            ActiveRole::School => "school",
            ActiveRole::Parent => "parent",
        }
    }
}

/// On-disk credential file structure.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    tokens: HashMap<CredentialSlot, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_role: Option<ActiveRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    staff_kind: Option<String>,
}

/// Process-wide persisted token store.
///
/// Mutations persist to disk before the in-memory state changes, so a
/// failed write leaves the previous state visible. The write lock covers
/// mutate-plus-persist; readers never observe a half-applied clear.
pub struct CredentialStore {
    path: PathBuf,
    state: RwLock<CredentialFile>,
}

impl CredentialStore {
    /// Returns the default credential file path.
    pub fn default_path() -> PathBuf {
        paths::artha_home().join(CREDENTIALS_FILE)
    }

    /// Opens a store backed by the given file.
    ///
    /// A missing file starts empty. An unreadable or corrupt file also
    /// starts empty (fail open), with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match Self::read_file(&path) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "unreadable credential file, starting unauthenticated"
                );
                CredentialFile::default()
            }
        };
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    /// Opens the store at the default path.
    pub fn load_default() -> Self {
        Self::open(Self::default_path())
    }

    fn read_file(path: &Path) -> Result<CredentialFile> {
        if !path.exists() {
            return Ok(CredentialFile::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", path.display()))
    }

    /// Returns the token in a slot, or `None` if never set or cleared.
    /// Never fails.
    pub fn get(&self, slot: CredentialSlot) -> Option<String> {
        match self.state.read() {
            Ok(guard) => guard.tokens.get(&slot).cloned(),
            // Poisoned lock reads fail open too.
            Err(_) => None,
        }
    }

    /// Snapshot of every populated slot, taken under one lock.
    pub fn tokens(&self) -> HashMap<CredentialSlot, String> {
        match self.state.read() {
            Ok(guard) => guard.tokens.clone(),
            Err(_) => HashMap::new(),
        }
    }

    /// Returns the role currently presented as logged in.
    pub fn active_role(&self) -> Option<ActiveRole> {
        match self.state.read() {
            Ok(guard) => guard.active_role,
            Err(_) => None,
        }
    }

    /// Staff kind the school backend reported for the current session
    /// (teacher, counselor, principal, ...).
    pub fn staff_kind(&self) -> Option<String> {
        match self.state.read() {
            Ok(guard) => guard.staff_kind.clone(),
            Err(_) => None,
        }
    }

    /// Stores a token in a slot, overwriting any existing value.
    ///
    /// # Errors
    /// `InvalidCredential` for an empty or whitespace-only token;
    /// `StorageUnavailable` if persistence fails (state unchanged).
    pub fn set(&self, slot: CredentialSlot, token: &str) -> ApiResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::invalid_credential(format!(
                "refusing to store an empty token in the {} slot",
                slot.as_str()
            )));
        }

        let mut guard = self.write_lock()?;
        let mut next = guard.clone();
        next.tokens.insert(slot, token.to_string());
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Marks a role as the one the caller presents as logged in.
    ///
    /// # Errors
    /// `StorageUnavailable` if persistence fails.
    pub fn set_active_role(&self, role: ActiveRole) -> ApiResult<()> {
        let mut guard = self.write_lock()?;
        let mut next = guard.clone();
        next.active_role = Some(role);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Records the staff kind alongside the session so it survives
    /// process restarts.
    ///
    /// # Errors
    /// `StorageUnavailable` if persistence fails.
    pub fn set_staff_kind(&self, kind: &str) -> ApiResult<()> {
        let mut guard = self.write_lock()?;
        let mut next = guard.clone();
        next.staff_kind = Some(kind.to_string());
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Clears every listed slot in one step. If the active role's slot is
    /// among them, the role marker resets to none; clearing the school
    /// slot also drops the stored staff kind. All-or-nothing: no reader
    /// can observe a partially cleared set. Idempotent.
    ///
    /// # Errors
    /// `StorageUnavailable` if persistence fails (state unchanged).
    pub fn clear_all(&self, slots: &[CredentialSlot]) -> ApiResult<()> {
        let mut guard = self.write_lock()?;
        let mut next = guard.clone();
        for slot in slots {
            next.tokens.remove(slot);
        }
        if next.active_role.is_some_and(|role| slots.contains(&role.slot())) {
            next.active_role = None;
        }
        if slots.contains(&CredentialSlot::School) {
            next.staff_kind = None;
        }
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Clears every slot and the active-role marker. Used on logout.
    ///
    /// # Errors
    /// `StorageUnavailable` if persistence fails.
    pub fn clear_everything(&self) -> ApiResult<()> {
        self.clear_all(&CredentialSlot::ALL)
    }

    fn write_lock(&self) -> ApiResult<std::sync::RwLockWriteGuard<'_, CredentialFile>> {
        self.state
            .write()
            .map_err(|_| ApiError::storage("credential store lock poisoned"))
    }

    /// Writes the credential file with restricted permissions (0600).
    fn persist(&self, state: &CredentialFile) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ApiError::storage(format!(
                    "failed to create directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let contents = serde_json::to_string_pretty(state)
            .map_err(|err| ApiError::storage(format!("failed to serialize credentials: {err}")))?;

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|err| {
                    ApiError::storage(format!(
                        "failed to open {} for writing: {err}",
                        self.path.display()
                    ))
                })?;
            file.write_all(contents.as_bytes()).map_err(|err| {
                ApiError::storage(format!("failed to write {}: {err}", self.path.display()))
            })?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents).map_err(|err| {
                ApiError::storage(format!("failed to write {}: {err}", self.path.display()))
            })?;
        }

        Ok(())
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Directory Cursor
//!
//! Per-session view of the remote namespace: fixed home directory, mutable
//! current directory, relative path resolution. The cursor is driven by one
//! connection at a time, so `change_directory` takes `&mut self`.
//!
//! By default the home directory is advisory only: absolute paths elsewhere
//! in the namespace resolve normally. With confinement enabled, any path that
//! normalizes outside the home directory is rejected.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::identity::Identity;
use super::path_entry::PathEntry;
use super::remote_path::{RemotePath, SEPARATOR};
use super::session::{SessionContext, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("Path {path} is outside the home directory {home}")]
    OutsideHome { path: String, home: String },
}

pub struct DirectoryCursor {
    session: Arc<SessionContext>,
    /// Home directory with a trailing separator
    root: String,
    home: RemotePath,
    current: RemotePath,
    confine_to_home: bool,
}

impl DirectoryCursor {
    /// Cursor positioned at the session user's home directory
    pub fn new(session: Arc<SessionContext>, confine_to_home: bool) -> Self {
        let home = RemotePath::new(session.identity().home_directory());
        let root = if home.is_root() {
            home.to_string()
        } else {
            format!("{}{}", home, SEPARATOR)
        };

        debug!(session_id = %session.id(), home = %home, confine_to_home, "Directory cursor created");
        Self {
            session,
            root,
            current: home.clone(),
            home,
            confine_to_home,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    pub fn identity(&self) -> &Identity {
        self.session.identity()
    }

    /// Home directory as configured, always ending with `/`
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn current_path(&self) -> &RemotePath {
        &self.current
    }

    pub fn is_confined(&self) -> bool {
        self.confine_to_home
    }

    /// Absolute form of `input` relative to the current directory
    pub fn resolve_path(&self, input: &str) -> String {
        if input.starts_with(SEPARATOR) {
            input.to_string()
        } else if self.current.is_root() {
            format!("{}{}", SEPARATOR, input)
        } else {
            format!("{}{}{}", self.current, SEPARATOR, input)
        }
    }

    /// Move to `target` if it is a readable directory; the cursor is left
    /// untouched otherwise
    pub async fn change_directory(&mut self, target: &str) -> bool {
        let entry = match self.get_file_object(target) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(target, error = %e, "Change directory rejected");
                return false;
            }
        };

        if !entry.is_directory().await {
            debug!(path = %entry.path(), "Change directory failed: not a directory");
            return false;
        }
        if !entry.has_read_permission().await {
            debug!(path = %entry.path(), user = %self.identity(), "Change directory failed: not readable");
            return false;
        }

        info!(session_id = %self.session.id(), from = %self.current, to = %entry.path(), "Changed directory");
        self.current = entry.path().clone();
        true
    }

    /// Entry for `name`; existence is not checked
    pub fn get_file_object(&self, name: &str) -> Result<PathEntry, CursorError> {
        let path = RemotePath::new(&self.resolve_path(name));
        if self.confine_to_home && !path.starts_with(&self.home) {
            return Err(CursorError::OutsideHome {
                path: path.to_string(),
                home: self.home.to_string(),
            });
        }
        Ok(PathEntry::new(path, Arc::clone(&self.session)))
    }

    pub fn home_directory(&self) -> PathEntry {
        PathEntry::new(self.home.clone(), Arc::clone(&self.session))
    }

    pub fn current_directory(&self) -> PathEntry {
        PathEntry::new(self.current.clone(), Arc::clone(&self.session))
    }

    pub fn is_random_accessible(&self) -> bool {
        true
    }

    pub fn dispose(&mut self) {}
}

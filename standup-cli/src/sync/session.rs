//! A day of work items kept in sync with the server.
//!
//! Opening a session loads the day into a [`SyncHandle`]; edits go through
//! the handle and are committed in the background. Closing flushes whatever
//! is still pending before the runtime is dropped.

use chrono::NaiveDate;
use standup_core::sync::{
    CommitError, HttpCommitter, SyncClient, SyncHandle, SyncOutcome, SyncStatus,
};
use standup_core::{ParseError, SyncError, WorkItem};
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::Config;

/// Builds an HTTP client from the sync configuration.
pub fn client_from_config(config: &Config) -> Result<SyncClient, SessionError> {
    let (Some(server_url), Some(api_key)) = (&config.sync.server_url, &config.sync.api_key) else {
        return Err(SessionError::Sync(SyncError::NotConfigured));
    };

    Ok(SyncClient::with_timeout(
        server_url.clone(),
        api_key.clone(),
        config.sync.request_timeout(),
    )?)
}

/// Creates the runtime the CLI runs its async work on.
pub fn runtime() -> Result<Runtime, SessionError> {
    Runtime::new().map_err(|e| SessionError::RuntimeError(e.to_string()))
}

/// One day of the user's work items, synced in the background.
pub struct DaySession {
    runtime: Runtime,
    client: SyncClient,
    handle: SyncHandle<WorkItem>,
    date: NaiveDate,
}

impl DaySession {
    /// Loads `date` from the server and starts the sync scheduler.
    pub fn open(config: &Config, date: NaiveDate) -> Result<Self, SessionError> {
        let client = client_from_config(config)?;
        let runtime = runtime()?;

        let handle = {
            let _guard = runtime.enter();
            SyncHandle::spawn(
                HttpCommitter::new(client.clone()),
                config.sync.scheduler_options(),
            )
        };

        let session = Self {
            runtime,
            client,
            handle,
            date,
        };
        session.load(date)?;
        Ok(session)
    }

    fn load(&self, date: NaiveDate) -> Result<(), SessionError> {
        let items = self.runtime.block_on(self.client.fetch_day(date))?;
        tracing::debug!("Loaded {} work item(s) for {}", items.len(), date);
        self.handle.replace_all(items)?;
        Ok(())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Flushes pending edits, then replaces the session with another day.
    /// Refuses to leave a day whose edits did not all reach the server.
    pub fn switch_date(&mut self, date: NaiveDate) -> Result<(), SessionError> {
        if let SyncOutcome::Failed(e) = self.flush()? {
            return Err(SessionError::Commit(e));
        }
        let status = self.status();
        if status.obsolete {
            return Err(SessionError::Unsynced(status.pending));
        }

        self.load(date)?;
        self.date = date;
        Ok(())
    }

    /// Current local work items.
    pub fn items(&self) -> Arc<Vec<WorkItem>> {
        self.handle.local()
    }

    pub fn status(&self) -> SyncStatus<WorkItem> {
        self.handle.status()
    }

    /// Finds the one item matching a client id, server id or unique prefix.
    pub fn find(&self, reference: &str) -> Result<WorkItem, SessionError> {
        let items = self.items();
        let mut matches = items.iter().filter(|item| item.matches_ref(reference));

        match (matches.next(), matches.next()) {
            (Some(item), None) => Ok(item.clone()),
            (None, _) => Err(SessionError::NotFound(reference.to_string())),
            (Some(_), Some(_)) => Err(SessionError::Ambiguous(reference.to_string())),
        }
    }

    /// Adds a new item or replaces the one with the same client id.
    pub fn save(&self, item: WorkItem) -> Result<(), SessionError> {
        self.handle.add_or_update_state_data(vec![item])?;
        Ok(())
    }

    pub fn remove(&self, client_id: &str) -> Result<(), SessionError> {
        self.handle.remove_from_state_data(client_id)?;
        Ok(())
    }

    /// Commits pending edits now instead of waiting for the quiet period.
    pub fn flush(&self) -> Result<SyncOutcome, SessionError> {
        Ok(self.runtime.block_on(self.handle.flush())?)
    }

    /// Flushes and stops the scheduler. Fails if any edit did not reach
    /// the server.
    pub fn close(self) -> Result<(), SessionError> {
        let outcome = self.flush()?;
        let state = self.runtime.block_on(self.handle.shutdown())?;

        if let SyncOutcome::Failed(e) = outcome {
            return Err(SessionError::Commit(e));
        }
        if state.is_obsolete() {
            return Err(SessionError::Unsynced(state.pending_changes().len()));
        }
        Ok(())
    }
}

/// Errors from session operations
#[derive(Debug)]
pub enum SessionError {
    Sync(SyncError),
    RuntimeError(String),
    NotFound(String),
    Ambiguous(String),
    Parse(ParseError),
    Commit(CommitError),
    Unsynced(usize),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Sync(e) => write!(f, "{}", e),
            SessionError::RuntimeError(e) => write!(f, "Runtime error: {}", e),
            SessionError::NotFound(r) => write!(f, "No work item matches '{}'", r),
            SessionError::Ambiguous(r) => {
                write!(f, "'{}' matches more than one work item, use a longer id", r)
            }
            SessionError::Parse(e) => write!(f, "{}", e),
            SessionError::Commit(e) => write!(f, "Failed to sync: {}", e),
            SessionError::Unsynced(n) => {
                write!(f, "{} change(s) were not accepted by the server", n)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Sync(e) => Some(e),
            SessionError::Parse(e) => Some(e),
            SessionError::Commit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for SessionError {
    fn from(e: SyncError) -> Self {
        SessionError::Sync(e)
    }
}

impl From<ParseError> for SessionError {
    fn from(e: ParseError) -> Self {
        SessionError::Parse(e)
    }
}

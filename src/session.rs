//! Process-wide chat session identity
//!
//! The transport learns the bot's own account id only after the session is
//! ready, so the id is initialized lazily and may be refreshed when the
//! account is re-linked. Read-only for the rest of the process.

use std::sync::{OnceLock, RwLock};
use tracing::info;

fn cell() -> &'static RwLock<Option<String>> {
    static SELF_ID: OnceLock<RwLock<Option<String>>> = OnceLock::new();
    SELF_ID.get_or_init(|| RwLock::new(None))
}

/// Record the bot's own account id. Idempotent: repeating the same id is a
/// no-op, a different id (account re-link) replaces the stored one.
pub fn set_self_id(id: &str) {
    let mut guard = match cell().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if guard.as_deref() != Some(id) {
        info!(self_id = id, "Session identity updated");
        *guard = Some(id.to_string());
    }
}

pub fn self_id() -> Option<String> {
    match cell().read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// True when `sender` is the bot's own account.
pub fn is_self(sender: &str) -> bool {
    self_id().as_deref() == Some(sender)
}

#[cfg(test)]
mod tests {
    use super::*;

    // single test: the identity cell is process-global state
    #[test]
    fn test_initialize_and_refresh() {
        assert!(!is_self("someone"));

        set_self_id("bot@chat");
        assert_eq!(self_id().as_deref(), Some("bot@chat"));
        assert!(is_self("bot@chat"));
        assert!(!is_self("user@chat"));

        // idempotent
        set_self_id("bot@chat");
        assert_eq!(self_id().as_deref(), Some("bot@chat"));

        // refresh on re-link
        set_self_id("relinked@chat");
        assert!(is_self("relinked@chat"));
    }
}

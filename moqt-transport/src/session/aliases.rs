use std::collections::HashMap;

use crate::coding::FullTrackName;
use crate::watch::State;

use super::SessionError;

#[derive(Default)]
struct AliasState {
    by_alias: HashMap<u64, FullTrackName>,
    by_name: HashMap<FullTrackName, u64>,
}

/// The per-session track alias table: alias <-> full track name for active
/// subscriptions.
///
/// Data stream tasks block on [AliasTable::wait_for] until the subscription
/// activates, which is how early streams survive the SUBSCRIBE_OK race.
#[derive(Clone, Default)]
pub struct AliasTable {
    state: State<AliasState>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an alias. A second binding of the same alias is fatal to the
    /// session (DUPLICATE_TRACK_ALIAS).
    pub fn insert(&mut self, alias: u64, name: FullTrackName) -> Result<(), SessionError> {
        let mut state = self.state.lock_mut().ok_or(SessionError::Internal)?;
        if state.by_alias.contains_key(&alias) {
            return Err(SessionError::DuplicateTrackAlias(alias));
        }

        // A name may rebind (alias retry); drop its old alias first.
        if let Some(old) = state.by_name.insert(name.clone(), alias) {
            state.by_alias.remove(&old);
        }
        state.by_alias.insert(alias, name);

        Ok(())
    }

    /// Atomically replace an alias binding after a RETRY_TRACK_ALIAS.
    pub fn rebind(&mut self, old: u64, new: u64) -> Result<(), SessionError> {
        let mut state = self.state.lock_mut().ok_or(SessionError::Internal)?;
        if state.by_alias.contains_key(&new) {
            return Err(SessionError::DuplicateTrackAlias(new));
        }

        if let Some(name) = state.by_alias.remove(&old) {
            state.by_name.insert(name.clone(), new);
            state.by_alias.insert(new, name);
        }

        Ok(())
    }

    pub fn remove(&mut self, alias: u64) {
        if let Some(mut state) = self.state.lock_mut() {
            if let Some(name) = state.by_alias.remove(&alias) {
                state.by_name.remove(&name);
            }
        }
    }

    pub fn get(&self, alias: u64) -> Option<FullTrackName> {
        self.state.lock().by_alias.get(&alias).cloned()
    }

    pub fn alias_of(&self, name: &FullTrackName) -> Option<u64> {
        self.state.lock().by_name.get(name).copied()
    }

    /// Wait until the alias is bound. `None` when the session is gone.
    pub async fn wait_for(&self, alias: u64) -> Option<FullTrackName> {
        loop {
            {
                let state = self.state.lock();
                if let Some(name) = state.by_alias.get(&alias) {
                    return Some(name.clone());
                }
                state.modified()?
            }
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(track: &str) -> FullTrackName {
        FullTrackName::from_utf8_path("conf/room1", track)
    }

    #[test]
    fn duplicate_alias_is_fatal() {
        let mut table = AliasTable::new();
        table.insert(1, name("video")).unwrap();

        let duplicate = table.insert(1, name("audio"));
        assert!(matches!(
            duplicate.unwrap_err(),
            SessionError::DuplicateTrackAlias(1)
        ));
    }

    #[test]
    fn rebind_is_atomic() {
        let mut table = AliasTable::new();
        table.insert(1, name("video")).unwrap();
        table.rebind(1, 2).unwrap();

        assert_eq!(table.get(1), None);
        assert_eq!(table.get(2), Some(name("video")));
        assert_eq!(table.alias_of(&name("video")), Some(2));
    }

    #[tokio::test]
    async fn wait_for_blocks_until_bound() {
        let table = AliasTable::new();

        let waiter = table.clone();
        let task = tokio::spawn(async move { waiter.wait_for(7).await });

        let mut table2 = table.clone();
        table2.insert(7, name("video")).unwrap();

        assert_eq!(task.await.unwrap(), Some(name("video")));
    }
}

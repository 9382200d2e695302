//! Channel → session map with one exclusive guard per channel.
//!
//! The outer map lock is only held to look up, insert or detach a slot, never
//! while waiting on a slot's guard, so distinct channels never block each
//! other for the duration of a trigger.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, TryLockError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CombatError, Result};
use crate::session::{BattleSession, SessionView};

/// Opaque key that addresses at most one battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ChannelId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a session survives the operation that just ran on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Destroy,
}

/// `None` once the session has been destroyed but the slot not yet detached.
type Slot = Arc<Mutex<Option<BattleSession>>>;

#[derive(Default)]
pub struct SessionStore {
    slots: Mutex<HashMap<ChannelId, Slot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, session: BattleSession) -> Result<()> {
        let channel = session.channel().clone();
        let mut slots = self.slots.lock().map_err(|_| CombatError::LockPoisoned)?;
        if let Some(slot) = slots.get(&channel) {
            match slot.try_lock() {
                // Destroyed but not yet detached. The slot is replaced, never
                // refilled, so the pending detach no longer matches it.
                Ok(guard) if guard.is_none() => {}
                Ok(_) | Err(TryLockError::WouldBlock) => {
                    return Err(CombatError::SessionAlreadyActive);
                }
                Err(TryLockError::Poisoned(_)) => return Err(CombatError::LockPoisoned),
            }
        }
        slots.insert(channel.clone(), Arc::new(Mutex::new(Some(session))));
        debug!(target: "duel.store", channel = %channel, "session created");
        Ok(())
    }

    fn slot(&self, channel: &ChannelId) -> Result<Slot> {
        let slots = self.slots.lock().map_err(|_| CombatError::LockPoisoned)?;
        slots
            .get(channel)
            .cloned()
            .ok_or(CombatError::NoActiveSession)
    }

    fn detach(&self, channel: &ChannelId, slot: &Slot) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| CombatError::LockPoisoned)?;
        if slots
            .get(channel)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            slots.remove(channel);
            debug!(target: "duel.store", channel = %channel, "session removed");
        }
        Ok(())
    }

    /// Run `f` under the channel's guard; `Disposition::Destroy` drops the
    /// session before the guard is released.
    pub fn with_session<T>(
        &self,
        channel: &ChannelId,
        f: impl FnOnce(&mut BattleSession) -> Result<(T, Disposition)>,
    ) -> Result<T> {
        let slot = self.slot(channel)?;
        let value = {
            let mut guard = slot.lock().map_err(|_| CombatError::LockPoisoned)?;
            let session = guard.as_mut().ok_or(CombatError::NoActiveSession)?;
            let (value, disposition) = f(session)?;
            if disposition == Disposition::Keep {
                return Ok(value);
            }
            *guard = None;
            value
        };
        self.detach(channel, &slot)?;
        Ok(value)
    }

    pub fn get(&self, channel: &ChannelId) -> Option<SessionView> {
        let slot = self.slot(channel).ok()?;
        let guard = slot.lock().ok()?;
        guard.as_ref().map(BattleSession::view)
    }

    pub fn remove(&self, channel: &ChannelId) -> Result<BattleSession> {
        let slot = self.slot(channel)?;
        let session = {
            let mut guard = slot.lock().map_err(|_| CombatError::LockPoisoned)?;
            guard.take().ok_or(CombatError::NoActiveSession)?
        };
        self.detach(channel, &slot)?;
        Ok(session)
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.get(channel).is_some()
    }

    /// Channels with a live battle, sorted.
    pub fn active_channels(&self) -> Vec<ChannelId> {
        let slots: Vec<(ChannelId, Slot)> = match self.slots.lock() {
            Ok(slots) => slots
                .iter()
                .map(|(channel, slot)| (channel.clone(), Arc::clone(slot)))
                .collect(),
            Err(_) => return Vec::new(),
        };
        let mut live: Vec<ChannelId> = slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().map(|g| g.is_some()).unwrap_or(false))
            .map(|(channel, _)| channel)
            .collect();
        live.sort();
        live
    }
}

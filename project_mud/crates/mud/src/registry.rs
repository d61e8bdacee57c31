use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use persistence::Player;
use session::{SessionId, SessionOutput};
use space::{Area, GridError, Room};
use tokio::sync::mpsc;

/// Handle to a connected, logged-in session. Cloned into every event the
/// session submits so the world loop can reply.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub username: String,
    outbound: mpsc::UnboundedSender<SessionOutput>,
}

impl SessionHandle {
    pub fn new(
        id: SessionId,
        username: impl Into<String>,
        outbound: mpsc::UnboundedSender<SessionOutput>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            outbound,
        }
    }

    /// Queue a line for the session. Returns false if the worker is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.outbound
            .send(SessionOutput::new(self.id, text))
            .is_ok()
    }

    /// Queue a final line; the worker closes the connection after writing it.
    pub fn send_disconnect(&self, text: impl Into<String>) -> bool {
        self.outbound
            .send(SessionOutput::with_disconnect(self.id, text))
            .is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is already online")]
pub struct AlreadyOnline(pub String);

#[derive(Debug, Default)]
struct RegistryState {
    players: BTreeMap<String, Player>,
    areas: BTreeMap<String, Area>,
    online: BTreeMap<String, SessionHandle>,
}

/// Shared world state: loaded players, areas, and the online set.
///
/// Every access goes through a method that takes the lock for the duration
/// of the call only, so no guard ever crosses an `.await` and no I/O happens
/// under the lock.
///
/// Players stay loaded after they log out and are never evicted, so memory
/// grows with the number of distinct players seen since startup.
#[derive(Debug)]
pub struct WorldRegistry {
    state: RwLock<RegistryState>,
}

impl WorldRegistry {
    pub fn new(areas: Vec<Area>) -> Result<Self, GridError> {
        let mut by_name = BTreeMap::new();
        for area in areas {
            if by_name.contains_key(&area.name) {
                return Err(GridError::DuplicateArea(area.name));
            }
            by_name.insert(area.name.clone(), area);
        }
        Ok(Self {
            state: RwLock::new(RegistryState {
                areas: by_name,
                ..RegistryState::default()
            }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_player(&self, username: &str) -> Option<Player> {
        self.read().players.get(username).cloned()
    }

    /// Insert `player` unless a record for the username is already loaded.
    /// Returns true if inserted.
    pub fn insert_player_if_absent(&self, player: Player) -> bool {
        let mut state = self.write();
        if state.players.contains_key(&player.username) {
            return false;
        }
        state.players.insert(player.username.clone(), player);
        true
    }

    /// Mutate a loaded player in place. `None` if the player is not loaded.
    pub fn update_player<R>(&self, username: &str, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        self.write().players.get_mut(username).map(f)
    }

    pub fn player_count(&self) -> usize {
        self.read().players.len()
    }

    pub fn area_names(&self) -> BTreeSet<String> {
        self.read().areas.keys().cloned().collect()
    }

    pub fn room(&self, area: &str, room: &str) -> Option<Room> {
        self.read().areas.get(area)?.room(room).cloned()
    }

    pub fn login_session(&self, username: &str, session: SessionHandle) -> Result<(), AlreadyOnline> {
        let mut state = self.write();
        if state.online.contains_key(username) {
            return Err(AlreadyOnline(username.to_string()));
        }
        state.online.insert(username.to_string(), session);
        Ok(())
    }

    /// Take `session` out of the online set. A newer session under the same
    /// name is left alone. Returns true if something was removed.
    pub fn logout_session(&self, session: &SessionHandle) -> bool {
        let mut state = self.write();
        if !state.online.get(&session.username).is_some_and(|s| s.id == session.id) {
            return false;
        }
        state.online.remove(&session.username);
        true
    }

    /// Whether `session` is the one currently online under its username.
    pub fn holds_session(&self, session: &SessionHandle) -> bool {
        self.read()
            .online
            .get(&session.username)
            .is_some_and(|s| s.id == session.id)
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.read().online.contains_key(username)
    }

    pub fn online_count(&self) -> usize {
        self.read().online.len()
    }

    /// Online sessions whose player currently stands in `area`/`room`.
    pub fn sessions_in_room(&self, area: &str, room: &str) -> Vec<SessionHandle> {
        let state = self.read();
        state
            .online
            .values()
            .filter(|session| {
                state
                    .players
                    .get(&session.username)
                    .is_some_and(|p| p.area == area && p.room == room)
            })
            .cloned()
            .collect()
    }
}

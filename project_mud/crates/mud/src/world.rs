use std::sync::Arc;
use std::time::Instant;

use engine_core::EventKind;
use net::ShutdownRx;
use observability::EventMetrics;
use persistence::Player;
use space::{Direction, RoomAtlas};
use tokio::sync::{mpsc, oneshot};

use crate::registry::{SessionHandle, WorldRegistry};
use crate::view;

pub const BLOCKED_MESSAGE: &str = "You can't go that way.";
pub const QUIT_MESSAGE: &str = "See you";

/// Work queued for the world loop by a logged-in session.
#[derive(Debug)]
pub enum Event {
    Command { session: SessionHandle, kind: EventKind },
    /// The session is closing. Queued behind the session's earlier commands;
    /// `done` fires once it has left the online set.
    Leave {
        session: SessionHandle,
        done: oneshot::Sender<()>,
    },
}

/// Gameplay state owner. Only the world loop calls [`World::handle`], so
/// events are applied one at a time in queue order.
pub struct World {
    registry: Arc<WorldRegistry>,
    atlas: Arc<RoomAtlas>,
    seq: u64,
}

impl World {
    pub fn new(registry: Arc<WorldRegistry>, atlas: Arc<RoomAtlas>) -> Self {
        Self {
            registry,
            atlas,
            seq: 0,
        }
    }

    pub fn handle(&mut self, event: Event) {
        let started = Instant::now();
        self.seq += 1;

        let (session, kind) = match event {
            Event::Command { session, kind } => {
                self.command(&session, &kind);
                (session, kind.as_str())
            }
            Event::Leave { session, done } => {
                if self.registry.logout_session(&session) {
                    tracing::debug!(session_id = %session.id, username = %session.username, "Player left");
                }
                let _ = done.send(());
                (session, "leave")
            }
        };

        EventMetrics {
            seq: self.seq,
            kind,
            username: session.username,
            duration_us: started.elapsed().as_micros(),
            online: self.registry.online_count(),
        }
        .log();
    }

    fn command(&self, session: &SessionHandle, kind: &EventKind) {
        if !self.registry.holds_session(session) {
            tracing::debug!(session_id = %session.id, username = %session.username, "dropping command from offline session");
            return;
        }

        match kind {
            EventKind::Look => self.look(session),
            EventKind::MoveNorth | EventKind::MoveSouth | EventKind::MoveEast | EventKind::MoveWest => {
                if let Some(dir) = kind.direction() {
                    self.move_player(session, dir);
                }
            }
            EventKind::Quit => {
                session.send_disconnect(QUIT_MESSAGE);
            }
            EventKind::Unknown(raw) => {
                session.send(format!("Unrecognized command: {}", raw));
            }
        }
    }

    fn player(&self, session: &SessionHandle) -> Option<Player> {
        let player = self.registry.get_player(&session.username);
        if player.is_none() {
            tracing::warn!(session_id = %session.id, username = %session.username, "event for unloaded player");
        }
        player
    }

    fn look(&self, session: &SessionHandle) {
        if let Some(player) = self.player(session) {
            session.send(self.describe(&player));
        }
    }

    fn describe(&self, player: &Player) -> String {
        let room = self.registry.room(&player.area, &player.room);
        let exits = self
            .atlas
            .grid(&player.area, &player.room)
            .and_then(|grid| grid.locate(&player.position).map(|pos| grid.exits(pos)))
            .unwrap_or_default();
        let others: Vec<String> = self
            .registry
            .sessions_in_room(&player.area, &player.room)
            .into_iter()
            .filter(|s| s.username != player.username)
            .map(|s| s.username)
            .collect();
        view::render_room(player, room.as_ref(), &exits, &others)
    }

    fn move_player(&self, session: &SessionHandle, dir: Direction) {
        let Some(player) = self.player(session) else {
            return;
        };

        let target = self.atlas.grid(&player.area, &player.room).and_then(|grid| {
            let from = grid.locate(&player.position)?;
            grid.neighbor(from, dir).map(|(_, cube)| cube.id.clone())
        });
        let Some(target) = target else {
            session.send(BLOCKED_MESSAGE);
            return;
        };

        let Some(moved) = self.registry.update_player(&player.username, |p| {
            p.position = target;
            p.clone()
        }) else {
            return;
        };

        tracing::debug!(username = %moved.username, %dir, position = %moved.position, "Player moved");
        session.send(self.describe(&moved));

        let notice = format!("{} moves {}.", moved.username, dir);
        for other in self.registry.sessions_in_room(&moved.area, &moved.room) {
            if other.username != moved.username {
                other.send(notice.clone());
            }
        }
    }
}

/// Apply queued events until shutdown or until every sender is gone.
pub async fn run_world_loop(mut rx: mpsc::Receiver<Event>, mut world: World, mut shutdown: ShutdownRx) {
    tracing::info!("World loop started");
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            event = rx.recv() => match event {
                Some(event) => world.handle(event),
                None => break,
            },
        }
    }
    tracing::info!(events = world.seq, "World loop stopped");
}

//! Per-connection session worker.
//!
//! Drives a connection from the nick prompt through the registration
//! handshake into the active phase, where it forwards commands to the world
//! loop and relays the world's replies back to the socket.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use engine_core::{parse_line, EventKind};
use net::{LineReader, LineWriter, ShutdownRx};
use session::{is_valid_username, LoginAttempts, SessionId, SessionOutput, SessionState};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use crate::context::ServerContext;
use crate::error::HandshakeError;
use crate::handshake::CreateOutcome;
use crate::registry::SessionHandle;
use crate::world::Event;

pub const BANNER: &str = "Welcome to the MUD.";
pub const NICK_PROMPT: &str = "What's your nick? ";
pub const CREATE_PROMPT: &str = "Do you want to create that user? [y|n] ";
pub const FAREWELL: &str = "See you";
pub const SHUTDOWN_NOTICE: &str = "The server is shutting down.";

pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, session_id: SessionId, ctx: ServerContext) {
    let (reader, writer) = net::conn::split(stream);
    run_session(reader, writer, session_id, ctx).await;
    tracing::info!(%session_id, %peer, "Connection closed");
}

/// Run one session to completion over an already split connection.
pub async fn run_session<R, W>(reader: LineReader<R>, writer: LineWriter<W>, session_id: SessionId, ctx: ServerContext)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let shutdown = ctx.shutdown.clone();
    let mut worker = Worker {
        id: session_id,
        reader,
        writer,
        ctx,
        shutdown,
        state: SessionState::Prompting,
    };

    if let Err(e) = worker.run().await {
        tracing::debug!(%session_id, "connection error: {}", e);
    }
    worker.transition(SessionState::Closed);
    let _ = worker.writer.shutdown().await;
}

struct Worker<R, W> {
    id: SessionId,
    reader: LineReader<R>,
    writer: LineWriter<W>,
    ctx: ServerContext,
    shutdown: ShutdownRx,
    state: SessionState,
}

impl<R, W> Worker<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal session transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(
            session_id = %self.id,
            username = next.username().unwrap_or("-"),
            from = ?self.state,
            to = ?next,
            "session state"
        );
        self.state = next;
    }

    async fn run(&mut self) -> io::Result<()> {
        self.writer.send_line(BANNER).await?;
        let Some(username) = self.login().await? else {
            return Ok(());
        };
        self.play(username).await
    }

    /// Next input line; `None` on EOF or shutdown.
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        tokio::select! {
            _ = self.shutdown.wait() => Ok(None),
            line = self.reader.next_line() => line,
        }
    }

    /// Prompt until a username is authenticated or created. `None` when the
    /// attempt budget runs out or the connection goes away.
    async fn login(&mut self) -> io::Result<Option<String>> {
        let mut attempts = LoginAttempts::new(self.ctx.settings.max_attempts);

        while !attempts.exhausted() {
            self.transition(SessionState::Prompting);
            self.writer.send_raw(NICK_PROMPT).await?;
            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };
            let username = line.trim().to_string();
            if username.is_empty() {
                continue;
            }

            if !is_valid_username(&username) {
                self.writer
                    .send_line(&format!(
                        "Username {} is not valid (letters, digits, _ and -, at most {} characters).",
                        username,
                        session::MAX_USERNAME_LEN
                    ))
                    .await?;
                attempts.record_failure();
                continue;
            }

            self.transition(SessionState::AwaitingHandshakeReply {
                username: username.clone(),
            });
            let exists = match self.ctx.handshake.lookup(&username, &mut self.shutdown).await {
                Ok(exists) => exists,
                Err(HandshakeError::ShuttingDown) => return Ok(None),
                Err(e) => {
                    self.writer.send_line(&format!("Error: {}", e)).await?;
                    attempts.record_failure();
                    continue;
                }
            };

            if exists {
                self.transition(SessionState::Authenticated {
                    username: username.clone(),
                });
                return Ok(Some(username));
            }

            self.writer
                .send_line(&format!("Username {} does not exist.", username))
                .await?;
            attempts.record_failure();

            self.writer.send_raw(CREATE_PROMPT).await?;
            let Some(answer) = self.read_line().await? else {
                return Ok(None);
            };
            if !matches!(answer.trim(), "y" | "yes") {
                continue;
            }

            self.transition(SessionState::CreatingCharacter {
                username: username.clone(),
            });
            match self.ctx.handshake.create(&username, &mut self.shutdown).await {
                Ok(outcome) => {
                    if outcome == CreateOutcome::AlreadyExists {
                        tracing::info!(session_id = %self.id, %username, "created concurrently, logging in");
                    }
                    return Ok(Some(username));
                }
                Err(HandshakeError::ShuttingDown) => return Ok(None),
                Err(e) => {
                    self.writer.send_line(&format!("Error: {}", e)).await?;
                }
            }
        }

        tracing::info!(session_id = %self.id, attempts = attempts.used(), "login attempts exhausted");
        self.writer.send_line(FAREWELL).await?;
        Ok(None)
    }

    async fn play(&mut self, username: String) -> io::Result<()> {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(self.id, username.clone(), outbound_tx);

        if let Err(e) = self.ctx.registry.login_session(&username, handle.clone()) {
            self.transition(SessionState::Rejected {
                username: username.clone(),
            });
            tracing::info!(session_id = %self.id, %username, "login rejected: {}", e);
            return self.writer.send_line(&format!("{}.", e)).await;
        }

        self.transition(SessionState::Active {
            username: username.clone(),
        });
        tracing::info!(session_id = %self.id, %username, online = self.ctx.registry.online_count(), "Player logged in");

        let result = self.active(&handle, &mut outbound_rx).await;
        self.logout(&handle).await;
        result
    }

    async fn active(
        &mut self,
        handle: &SessionHandle,
        outbound_rx: &mut mpsc::UnboundedReceiver<SessionOutput>,
    ) -> io::Result<()> {
        if !self.dispatch(handle, EventKind::Look).await {
            return Ok(());
        }

        loop {
            tokio::select! {
                _ = self.shutdown.wait() => {
                    let _ = self.writer.send_line(SHUTDOWN_NOTICE).await;
                    return Ok(());
                }
                line = self.reader.next_line() => {
                    let Some(line) = line? else {
                        return Ok(());
                    };
                    if let Some(kind) = parse_line(&line) {
                        if !self.dispatch(handle, kind).await {
                            return Ok(());
                        }
                    }
                }
                out = outbound_rx.recv() => {
                    let Some(out) = out else {
                        return Ok(());
                    };
                    self.writer.send_line(&out.text).await?;
                    if out.disconnect {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Queue an event for the world loop. False if the session should end.
    async fn dispatch(&mut self, handle: &SessionHandle, kind: EventKind) -> bool {
        let event = Event::Command {
            session: handle.clone(),
            kind,
        };
        tokio::select! {
            biased;
            _ = self.shutdown.wait() => false,
            sent = self.ctx.events.send(event) => sent.is_ok(),
        }
    }

    /// Leave the online set and persist the player. Runs once per active
    /// session, whatever ended it.
    ///
    /// The leave goes through the event queue so every command this session
    /// already queued is applied before the save.
    async fn logout(&mut self, handle: &SessionHandle) {
        let username = handle.username.as_str();
        let (done_tx, done_rx) = oneshot::channel();
        let leave = Event::Leave {
            session: handle.clone(),
            done: done_tx,
        };
        if self.ctx.events.send(leave).await.is_ok() {
            // Dropped unanswered if the world loop stops first.
            let _ = done_rx.await;
        }
        self.ctx.registry.logout_session(handle);

        let Some(player) = self.ctx.registry.get_player(username) else {
            tracing::warn!(session_id = %self.id, %username, "no player to save on logout");
            return;
        };
        let store = Arc::clone(&self.ctx.store);
        match tokio::task::spawn_blocking(move || store.save_player(&player)).await {
            Ok(Ok(())) => tracing::info!(
                session_id = %self.id,
                %username,
                loaded = self.ctx.registry.player_count(),
                "Player saved on logout"
            ),
            Ok(Err(e)) => tracing::error!(session_id = %self.id, %username, "failed to save player: {}", e),
            Err(e) => tracing::error!(session_id = %self.id, %username, "save task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{start_services, Settings};
    use crate::handshake::HandshakeRequest;
    use crate::registry::WorldRegistry;
    use net::{shutdown_channel, ShutdownTx};
    use persistence::{MemoryStore, Player, PlayerStore, StartLocation};
    use space::{Area, Cube, Room, RoomAtlas};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    fn city() -> Area {
        Area {
            name: "City".into(),
            rooms: vec![Room {
                name: "Inn".into(),
                description: "A warm inn.".into(),
                cubes: vec![Cube::new("1", 0, 0), Cube::new("2", 1, 0)],
            }],
        }
    }

    struct Client {
        read: ReadHalf<DuplexStream>,
        write: WriteHalf<DuplexStream>,
        seen: String,
    }

    impl Client {
        async fn send(&mut self, line: &str) {
            self.write.write_all(format!("{}\r\n", line).as_bytes()).await.unwrap();
        }

        /// Read until `needle` has been seen; returns everything read so far.
        async fn expect(&mut self, needle: &str) -> String {
            let mut buf = [0u8; 1024];
            while !self.seen.contains(needle) {
                let n = tokio::time::timeout(std::time::Duration::from_secs(5), self.read.read(&mut buf))
                    .await
                    .expect("timed out")
                    .unwrap();
                assert!(n > 0, "closed before {:?}; got {:?}", needle, self.seen);
                self.seen.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
            let end = self.seen.find(needle).unwrap() + needle.len();
            let rest = self.seen.split_off(end);
            std::mem::replace(&mut self.seen, rest)
        }

        async fn expect_closed(&mut self) -> String {
            let mut rest = Vec::new();
            self.read.read_to_end(&mut rest).await.unwrap();
            self.seen.push_str(&String::from_utf8_lossy(&rest));
            std::mem::take(&mut self.seen)
        }
    }

    fn connect(ctx: ServerContext, id: u64) -> (Client, tokio::task::JoinHandle<()>) {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (read, write) = tokio::io::split(client);
        let task = tokio::spawn(run_session(
            LineReader::new(server_read),
            LineWriter::new(server_write),
            SessionId(id),
            ctx,
        ));
        (
            Client {
                read,
                write,
                seen: String::new(),
            },
            task,
        )
    }

    fn services(store: Arc<dyn PlayerStore>) -> (ServerContext, ShutdownTx) {
        let areas = vec![city()];
        let atlas = Arc::new(RoomAtlas::build(&areas).unwrap());
        let registry = Arc::new(WorldRegistry::new(areas).unwrap());
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let services = start_services(registry, atlas, store, Settings::default(), shutdown_rx);
        (services.context, shutdown_tx)
    }

    #[tokio::test]
    async fn create_then_look() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, shutdown_tx) = services(store.clone());
        let (mut client, task) = connect(ctx, 1);

        client.expect(NICK_PROMPT).await;
        client.send("bob").await;
        client.expect("Username bob does not exist.").await;
        client.expect(CREATE_PROMPT).await;
        client.send("y").await;
        client.expect("A warm inn.").await;
        client.send("look").await;
        client.expect("A warm inn.").await;
        client.send("quit").await;
        client.expect(crate::world::QUIT_MESSAGE).await;
        client.expect_closed().await;
        task.await.unwrap();

        assert_eq!(store.load_player("bob").unwrap().unwrap().area, "City");
        shutdown_tx.trigger();
    }

    #[tokio::test]
    async fn existing_player_moves_and_is_saved() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_player(&Player::new("alice", &StartLocation::default()))
            .unwrap();
        let (ctx, shutdown_tx) = services(store.clone());
        let (mut client, task) = connect(ctx, 1);

        client.expect(NICK_PROMPT).await;
        client.send("alice").await;
        client.expect("Exits: east").await;
        client.send("e").await;
        client.expect("Position: 2").await;
        client.send("exit").await;
        client.expect_closed().await;
        task.await.unwrap();

        assert_eq!(store.load_player("alice").unwrap().unwrap().position, "2");
        shutdown_tx.trigger();
    }

    #[tokio::test]
    async fn command_before_hangup_is_saved() {
        for _ in 0..20 {
            let store = Arc::new(MemoryStore::new());
            let (ctx, shutdown_tx) = services(store.clone());
            let registry = Arc::clone(&ctx.registry);
            let (mut client, task) = connect(ctx, 1);

            client.expect(NICK_PROMPT).await;
            client.send("bob").await;
            client.expect(CREATE_PROMPT).await;
            client.send("y").await;
            client.expect("A warm inn.").await;
            client.send("e").await;
            client.write.shutdown().await.unwrap();
            task.await.unwrap();

            assert_eq!(registry.get_player("bob").unwrap().position, "2");
            assert_eq!(store.load_player("bob").unwrap().unwrap().position, "2");
            assert!(!registry.is_online("bob"));
            shutdown_tx.trigger();
        }
    }

    #[tokio::test]
    async fn declined_creation_reprompts() {
        let (ctx, shutdown_tx) = services(Arc::new(MemoryStore::new()));
        let registry = Arc::clone(&ctx.registry);
        let (mut client, task) = connect(ctx, 1);

        client.expect(NICK_PROMPT).await;
        client.send("bob").await;
        client.expect(CREATE_PROMPT).await;
        client.send("n").await;
        client.expect(NICK_PROMPT).await;
        assert!(registry.get_player("bob").is_none());

        shutdown_tx.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_names_exhaust_attempts_without_handshake() {
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let (handshake_tx, mut handshake_rx) = mpsc::channel::<HandshakeRequest>(4);
        let (events_tx, _events_rx) = mpsc::channel(4);
        let ctx = ServerContext {
            registry: Arc::new(WorldRegistry::new(Vec::new()).unwrap()),
            handshake: crate::handshake::HandshakeClient::new(handshake_tx),
            events: events_tx,
            store: Arc::new(MemoryStore::new()),
            shutdown: shutdown_rx,
            settings: Arc::new(Settings::default()),
        };
        let (mut client, task) = connect(ctx, 1);

        client.expect(NICK_PROMPT).await;
        client.send("").await;
        client.expect(NICK_PROMPT).await;
        client.send("bad name").await;
        client.send("../etc").await;
        client.send(&"x".repeat(41)).await;
        let out = client.expect_closed().await;
        task.await.unwrap();

        assert_eq!(out.matches("is not valid").count(), 3);
        assert!(out.trim_end().ends_with(FAREWELL));
        assert!(handshake_rx.try_recv().is_err());
        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn second_login_is_rejected() {
        let (ctx, shutdown_tx) = services(Arc::new(MemoryStore::new()));
        let registry = Arc::clone(&ctx.registry);
        let (mut first, _first_task) = connect(ctx.clone(), 1);
        first.expect(NICK_PROMPT).await;
        first.send("bob").await;
        first.expect(CREATE_PROMPT).await;
        first.send("yes").await;
        first.expect("A warm inn.").await;

        let (mut second, second_task) = connect(ctx, 2);
        second.expect(NICK_PROMPT).await;
        second.send("bob").await;
        let out = second.expect_closed().await;
        second_task.await.unwrap();

        assert!(out.contains("bob is already online."));
        assert!(registry.is_online("bob"));
        shutdown_tx.trigger();
    }

    #[tokio::test]
    async fn shutdown_while_idle_saves_player() {
        let store = Arc::new(MemoryStore::new());
        let (ctx, shutdown_tx) = services(store.clone());
        let registry = Arc::clone(&ctx.registry);
        let (mut client, task) = connect(ctx, 1);

        client.expect(NICK_PROMPT).await;
        client.send("dave").await;
        client.expect(CREATE_PROMPT).await;
        client.send("y").await;
        client.expect("A warm inn.").await;
        registry.update_player("dave", |p| p.stats.health = 55);

        shutdown_tx.trigger();
        let out = client.expect_closed().await;
        task.await.unwrap();

        assert!(out.contains(SHUTDOWN_NOTICE));
        assert!(!registry.is_online("dave"));
        assert_eq!(store.load_player("dave").unwrap().unwrap().stats.health, 55);
    }
}

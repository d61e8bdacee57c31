#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mud::{start_services, Services, Settings, WorldRegistry};
use net::{shutdown_channel, ShutdownTx};
use persistence::{load_areas, PersistenceError, Player, PlayerStore};
use space::RoomAtlas;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const CITY: &str = r#"
name = "City"

[[rooms]]
name = "Inn"
description = "A warm inn with a crackling fire."

[[rooms.cubes]]
id = "1"
posx = "0"
posy = "0"

[[rooms.cubes]]
id = "2"
posx = "1"
posy = "0"
"#;

/// Write a static directory with one area file.
pub fn write_static_dir(root: &Path) {
    std::fs::create_dir_all(root.join("areas")).unwrap();
    std::fs::write(root.join("areas/city.toml"), CITY).unwrap();
}

/// Store wrapper counting saves.
pub struct CountingStore<S> {
    pub inner: S,
    saves: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl<S: PlayerStore> PlayerStore for CountingStore<S> {
    fn load_player(&self, username: &str) -> Result<Option<Player>, PersistenceError> {
        self.inner.load_player(username)
    }

    fn save_player(&self, player: &Player) -> Result<(), PersistenceError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_player(player)
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<WorldRegistry>,
    shutdown_tx: ShutdownTx,
    server: JoinHandle<std::io::Result<()>>,
    services: Services,
}

impl TestServer {
    pub async fn start(static_dir: &Path, store: Arc<dyn PlayerStore>) -> Self {
        let areas = load_areas(&static_dir.join("areas")).unwrap();
        let atlas = Arc::new(RoomAtlas::build(&areas).unwrap());
        let registry = Arc::new(WorldRegistry::new(areas).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let services = start_services(Arc::clone(&registry), atlas, store, Settings::default(), shutdown_rx);
        let server = tokio::spawn(mud::serve(listener, services.context.clone()));

        Self {
            addr,
            registry,
            shutdown_tx,
            server,
            services,
        }
    }

    pub async fn connect(&self) -> Client {
        Client {
            stream: TcpStream::connect(self.addr).await.unwrap(),
            seen: String::new(),
        }
    }

    /// Trigger shutdown and wait for every session to close.
    pub async fn stop(self) {
        self.shutdown_tx.trigger();
        self.server.await.unwrap().unwrap();
        self.services.join().await;
    }
}

pub struct Client {
    stream: TcpStream,
    seen: String,
}

impl Client {
    pub async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn fill(&mut self) -> usize {
        let mut buf = [0u8; 1024];
        let n = tokio::time::timeout(Duration::from_secs(5), self.stream.read(&mut buf))
            .await
            .expect("timed out waiting for server output")
            .unwrap();
        self.seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        n
    }

    /// Read until any of `needles` shows up. Returns the index of the first
    /// needle found and consumes output up to and including it.
    pub async fn expect_any(&mut self, needles: &[&str]) -> usize {
        loop {
            let hit = needles
                .iter()
                .enumerate()
                .filter_map(|(i, n)| self.seen.find(n).map(|pos| (pos, i, n.len())))
                .min();
            if let Some((pos, i, len)) = hit {
                self.seen.drain(..pos + len);
                return i;
            }
            let n = self.fill().await;
            assert!(n > 0, "connection closed before {:?}; got {:?}", needles, self.seen);
        }
    }

    pub async fn expect(&mut self, needle: &str) {
        self.expect_any(&[needle]).await;
    }

    /// Read everything until the server closes the connection.
    pub async fn read_to_close(&mut self) -> String {
        while self.fill().await > 0 {}
        std::mem::take(&mut self.seen)
    }

    /// Run the login dialogue for a new character.
    pub async fn create(&mut self, name: &str) {
        self.expect("What's your nick?").await;
        self.send(name).await;
        self.expect("does not exist").await;
        self.expect("[y|n]").await;
        self.send("y").await;
        self.expect("Position:").await;
    }
}

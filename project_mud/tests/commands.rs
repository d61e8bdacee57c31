mod common;

use std::sync::Arc;

use common::{write_static_dir, TestServer};
use engine_core::{parse_line, EventKind};
use persistence::MemoryStore;

#[test]
fn command_normalization() {
    assert_eq!(parse_line("n"), Some(EventKind::MoveNorth));
    assert_eq!(parse_line("north\r"), Some(EventKind::MoveNorth));
    assert_eq!(parse_line("xyz"), Some(EventKind::Unknown("xyz".into())));
    assert_eq!(parse_line("   "), None);
}

#[tokio::test]
async fn commands_from_one_session_are_handled_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_static_dir(dir.path());
    let server = TestServer::start(dir.path(), Arc::new(MemoryStore::new())).await;

    let mut client = server.connect().await;
    client.create("erin").await;

    client.send("dance\r\nsing\r\n\r\ne\r\nwhistle").await;
    client.expect("Unrecognized command: dance").await;
    client.expect("Unrecognized command: sing").await;
    client.expect("Position: 2").await;
    client.expect("Unrecognized command: whistle").await;
    server.stop().await;
}

#[tokio::test]
async fn blocked_moves_and_case_sensitivity() {
    let dir = tempfile::tempdir().unwrap();
    write_static_dir(dir.path());
    let server = TestServer::start(dir.path(), Arc::new(MemoryStore::new())).await;

    let mut client = server.connect().await;
    client.create("finn").await;

    client.send("north").await;
    client.expect("You can't go that way.").await;
    client.send("LOOK").await;
    client.expect("Unrecognized command: LOOK").await;
    client.send("look around").await;
    client.expect("Unrecognized command: look around").await;
    assert_eq!(server.registry.get_player("finn").unwrap().position, "1");
    server.stop().await;
}

#[tokio::test]
async fn players_in_the_same_room_see_each_other_move() {
    let dir = tempfile::tempdir().unwrap();
    write_static_dir(dir.path());
    let server = TestServer::start(dir.path(), Arc::new(MemoryStore::new())).await;

    let mut gail = server.connect().await;
    gail.create("gail").await;
    let mut hugo = server.connect().await;
    hugo.create("hugo").await;

    hugo.send("east").await;
    hugo.expect("Also here: gail").await;
    gail.expect("hugo moves east.").await;

    gail.send("l").await;
    gail.expect("Also here: hugo").await;
    server.stop().await;
}

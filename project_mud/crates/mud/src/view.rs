use persistence::Player;
use space::{Direction, Room};

/// Plain-text room view for `player`.
pub fn render_room(player: &Player, room: Option<&Room>, exits: &[Direction], others: &[String]) -> String {
    let mut lines = vec![format!("[{} / {}]", player.area, player.room)];

    match room {
        Some(room) if !room.description.is_empty() => lines.push(room.description.clone()),
        Some(_) => {}
        None => lines.push("You are nowhere.".to_string()),
    }

    lines.push(format!("Position: {}", player.position));

    if exits.is_empty() {
        lines.push("Exits: none".to_string());
    } else {
        let names: Vec<String> = exits.iter().map(|d| d.to_string()).collect();
        lines.push(format!("Exits: {}", names.join(", ")));
    }

    if !others.is_empty() {
        lines.push(format!("Also here: {}", others.join(", ")));
    }

    lines.join("\n")
}

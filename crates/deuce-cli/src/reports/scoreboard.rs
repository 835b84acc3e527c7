use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use deuce_core::history::PointTally;
use deuce_core::protocol::{MatchView, ScoreUpdate};
use deuce_core::types::{PlayerId, PointType, Side};
use strum::IntoEnumIterator;

/// Set-by-set grid with the game in progress. `*` marks the server.
pub fn scoreboard(view: &MatchView) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let score = &view.score;
    let mut header = vec![Cell::new("Player").add_attribute(Attribute::Bold)];
    for n in 1..=score.sets.len() {
        header.push(Cell::new(format!("Set {}", n)));
    }
    let game_title = if score.current_game.is_tiebreak() {
        "Tiebreak"
    } else {
        "Game"
    };
    header.push(Cell::new(game_title).fg(Color::Cyan));
    table.set_header(header);

    let (p1_game, p2_game) = score.current_game.display_pair();
    for (side, id, game) in [
        (Side::Player1, &view.player1_id, p1_game),
        (Side::Player2, &view.player2_id, p2_game),
    ] {
        let mut name = Cell::new(player_label(id, &score.server_id));
        if view.winner_id.as_ref() == Some(id) {
            name = name.fg(Color::Green).add_attribute(Attribute::Bold);
        }
        let mut row = vec![name];
        for set in &score.sets {
            row.push(Cell::new(set.games_for(side)));
        }
        row.push(Cell::new(game).fg(Color::Cyan));
        table.add_row(row);
    }

    for i in 1..=score.sets.len() + 1 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

/// Point-type counts per player.
pub fn tally(tally: &PointTally, player1: &PlayerId, player2: &PlayerId) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Player").add_attribute(Attribute::Bold)];
    header.extend(PointType::iter().map(|pt| Cell::new(pt.to_string())));
    header.push(Cell::new("Total").add_attribute(Attribute::Bold));
    table.set_header(header);

    for id in [player1, player2] {
        let mut row = vec![Cell::new(id)];
        row.extend(PointType::iter().map(|pt| Cell::new(tally.get(id, pt))));
        row.push(Cell::new(tally.total(id)).add_attribute(Attribute::Bold));
        table.add_row(row);
    }

    for i in 1..=PointType::iter().count() + 1 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

/// One line per accepted command: version, action, set games, game score.
pub fn summary_line(update: &ScoreUpdate) -> String {
    let score = &update.score;
    let games = score
        .sets
        .iter()
        .map(|s| format!("{}-{}", s.player1_games, s.player2_games))
        .collect::<Vec<_>>()
        .join(" ");
    let (p1, p2) = score.current_game.display_pair();

    let mut line = format!(
        "v{} {} [{}] sets {} | game {}-{} | {} serving",
        update.version, update.action, update.status, games, p1, p2, score.server_id
    );
    if let Some(w) = &update.winner_id {
        line.push_str(&format!(" | winner {}", w));
    }
    line
}

fn player_label(id: &PlayerId, server: &PlayerId) -> String {
    if id == server {
        format!("{} *", id)
    } else {
        id.to_string()
    }
}

use crate::chess::{AllowedMoves, Board, Piece, Square};
use crate::messages::GameEnd;
use crate::models::{Conclusion, Game, GameState, Notification, PieceType, Side, User, Winner};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;

/// Render the board with `perspective`'s first rank at the bottom
pub fn render_board(board: &Board, perspective: Side, unicode: bool) -> String {
    let (ranks, files): (Vec<u8>, Vec<u8>) = match perspective {
        Side::Home => ((0..8).rev().collect(), (0..8).collect()),
        Side::Away => ((0..8).collect(), (0..8).rev().collect()),
    };

    let mut out = String::new();
    out.push_str("  ┌─┬─┬─┬─┬─┬─┬─┬─┐\n");
    for (i, rank) in ranks.iter().enumerate() {
        let _ = write!(out, "{} │", rank + 1);
        for file in &files {
            let symbol = board
                .get_piece(Square {
                    rank: *rank,
                    file: *file,
                })
                .map(|piece| piece_symbol(piece, unicode))
                .unwrap_or(' ');
            let _ = write!(out, "{}│", symbol);
        }
        let _ = writeln!(out, " {}", rank + 1);
        if i < 7 {
            out.push_str("  ├─┼─┼─┼─┼─┼─┼─┼─┤\n");
        }
    }
    out.push_str("  └─┴─┴─┴─┴─┴─┴─┴─┘\n");
    out.push_str("   ");
    for file in &files {
        out.push((b'a' + file) as char);
        out.push(' ');
    }
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

fn piece_symbol(piece: Piece, unicode: bool) -> char {
    if !unicode {
        return piece.symbol();
    }
    match (piece.side, piece.piece_type) {
        (Side::Home, PieceType::King) => '♔',
        (Side::Home, PieceType::Queen) => '♕',
        (Side::Home, PieceType::Rook) => '♖',
        (Side::Home, PieceType::Bishop) => '♗',
        (Side::Home, PieceType::Knight) => '♘',
        (Side::Home, PieceType::Pawn) => '♙',
        (Side::Away, PieceType::King) => '♚',
        (Side::Away, PieceType::Queen) => '♛',
        (Side::Away, PieceType::Rook) => '♜',
        (Side::Away, PieceType::Bishop) => '♝',
        (Side::Away, PieceType::Knight) => '♞',
        (Side::Away, PieceType::Pawn) => '♟',
    }
}

/// Clock reading as `m:ss`, or `h:mm:ss` past an hour
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn username(user: Option<&User>) -> &str {
    user.map_or("-", |u| u.username.as_str())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Short status of a listed game
pub fn game_status(game: &Game) -> String {
    match game.outcome() {
        Some((Winner::Draw, conclusion)) => format!("draw ({})", conclusion),
        Some((Winner::Home, conclusion)) => format!("host won ({})", conclusion),
        Some((Winner::Away, conclusion)) => format!("away won ({})", conclusion),
        Some((Winner::GameNotComplete, _)) | None if game.has_started() => {
            format!("{} to move", game.current_turn)
        }
        _ if game.invited.is_some() => "invited".to_string(),
        _ => "open".to_string(),
    }
}

pub fn display_games_list(games: &[Game]) {
    if games.is_empty() {
        println!("No games found.");
        return;
    }

    println!(
        "{:<8} {:<16} {:<16} {:<10} {:<6} {}",
        "ID", "HOST", "AWAY", "TIME", "TURN", "STATUS"
    );
    println!("{}", "-".repeat(72));
    for game in games {
        let away = game.away.as_ref().or(game.invited.as_ref());
        println!(
            "{:<8} {:<16} {:<16} {:<10} {:<6} {}",
            game.id,
            truncate(username(game.host.as_ref()), 16),
            truncate(username(away), 16),
            game.time_control.short_form(),
            game.turn_number,
            game_status(game)
        );
    }
}

pub fn display_game(game: &Game) {
    println!("Game {} ({})", game.id, game.mode);
    println!("  Host:         {}", username(game.host.as_ref()));
    println!("  Away:         {}", username(game.away.as_ref()));
    if let Some(invited) = &game.invited {
        println!("  Invited:      {}", invited.username);
    }
    println!("  Time control: {}", game.time_control);
    println!(
        "  Clocks:       host {} / away {}",
        format_clock(game.host_time),
        format_clock(game.away_time)
    );
    println!("  Turn:         {} ({})", game.turn_number, game.current_turn);
    println!("  Status:       {}", game_status(game));
    for side in Side::ALL {
        if game.is_offering_draw(*side) {
            println!("  {} is offering a draw", side);
        }
    }
    if let Some(started) = game.started_at {
        println!("  Started:      {}", format_time(started));
    }
    if let Some(ended) = game.ended_at {
        println!("  Ended:        {}", format_time(ended));
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn display_users(users: &[User]) {
    if users.is_empty() {
        println!("No accounts found.");
        return;
    }
    println!("{:<8} {:<24} {:<6} {}", "ID", "USERNAME", "ELO", "JOINED");
    println!("{}", "-".repeat(56));
    for user in users {
        println!(
            "{:<8} {:<24} {:<6} {}",
            user.id,
            truncate(&user.username, 24),
            user.elo,
            user.created_at.format("%Y-%m-%d")
        );
    }
}

pub fn display_user(user: &User) {
    println!("{} (#{})", user.username, user.id);
    println!("  Elo:    {}", user.elo);
    println!("  Joined: {}", format_time(user.created_at));
    if let Some(private) = &user.private {
        let verified = if private.email_verified { "verified" } else { "unverified" };
        println!("  Email:  {} ({})", private.email, verified);
    }
}

pub fn display_notifications(notifications: &[Notification]) {
    if notifications.is_empty() {
        println!("No notifications.");
        return;
    }
    for notification in notifications {
        let marker = if notification.read { ' ' } else { '*' };
        let game = notification
            .game
            .as_ref()
            .map(|g| format!(" [game {}]", g.id))
            .unwrap_or_default();
        println!(
            "{} {} {}{}",
            marker,
            notification.sent_at.format("%Y-%m-%d %H:%M"),
            notification.message,
            game
        );
    }
}

pub fn display_game_state(state: &GameState, unicode: bool) {
    println!();
    print!("{}", render_board(&state.board, Side::Home, unicode));
    let now = Utc::now();
    println!(
        "Host {}  |  Away {}",
        format_clock(state.clocks.remaining(Side::Home, now)),
        format_clock(state.clocks.remaining(Side::Away, now))
    );
    println!("Turn {}: {} to move", state.turn_number, state.side_to_move());
}

pub fn display_allowed_moves(moves: &AllowedMoves) {
    if moves.moves.is_empty() {
        println!("No legal moves.");
    } else {
        let list: Vec<String> = moves.moves.iter().map(ToString::to_string).collect();
        println!("Legal moves ({}): {}", list.len(), list.join(" "));
    }
    if let Some(claim) = moves.draw_claim {
        println!("You may claim a draw by {}", claim);
    }
}

pub fn display_game_end(end: &GameEnd) {
    match end.conclusion {
        Conclusion::Checkmate => println!(
            "Game over: {} wins by checkmate",
            end.state.side_to_move().opposite()
        ),
        Conclusion::Stalemate
        | Conclusion::ThreefoldRepetition
        | Conclusion::FiftyMoveRule
        | Conclusion::AgreedDraw => println!("Game over: draw by {}", end.conclusion),
        other => println!("Game over: {}", other),
    }
}

/// Check whether the terminal can show chess glyphs
pub fn supports_unicode() -> bool {
    std::env::var("TERM")
        .map(|term| {
            term.contains("xterm")
                || term.contains("screen")
                || term.contains("tmux")
                || term == "alacritty"
                || term == "kitty"
        })
        .unwrap_or(false)
        || std::env::var("TERM_PROGRAM").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ascii_board() {
        let mut board = Board::empty();
        board.set_piece(Square { rank: 0, file: 4 }, Some(Piece::new(PieceType::King, Side::Home)));
        board.set_piece(Square { rank: 7, file: 4 }, Some(Piece::new(PieceType::King, Side::Away)));

        let rendered = render_board(&board, Side::Home, false);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[1], "8 │ │ │ │ │k│ │ │ │ 8");
        assert_eq!(lines[15], "1 │ │ │ │ │K│ │ │ │ 1");
        assert_eq!(lines[17], "   a b c d e f g h");

        let flipped = render_board(&board, Side::Away, false);
        let lines: Vec<&str> = flipped.lines().collect();
        assert_eq!(lines[1], "1 │ │ │ │K│ │ │ │ │ 1");
        assert_eq!(lines[17], "   h g f e d c b a");
    }

    #[test]
    fn test_unicode_symbols() {
        assert_eq!(piece_symbol(Piece::new(PieceType::Queen, Side::Home), true), '♕');
        assert_eq!(piece_symbol(Piece::new(PieceType::Queen, Side::Away), true), '♛');
        assert_eq!(piece_symbol(Piece::new(PieceType::Queen, Side::Away), false), 'q');
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_secs(65)), "1:05");
        assert_eq!(format_clock(Duration::from_secs(3725)), "1:02:05");
        assert_eq!(format_clock(Duration::ZERO), "0:00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("artemis", 16), "artemis");
        assert_eq!(truncate("a_very_long_username", 10), "a_very_...");
    }
}

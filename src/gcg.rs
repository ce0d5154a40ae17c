//! GCG game-transcript parsing.
//!
//! Supports the subset needed to reach a late-game position from a
//! literal transcript: player pragmas, tile-placement events, passes and
//! exchanges. Each event line names the mover's rack, which is drawn
//! from the bag before the move replays, so the final position's racks
//! and bag are exact whenever the transcript is complete.
//!
//! ```text
//! #player1 alice Alice
//! #player2 bob Bob
//! >alice: DGOS?EK 8D DOGS +14 14
//! >bob: QXJEEUU - +0 0
//! ```

use std::path::Path;
use std::sync::Arc;

use miette::{Context, IntoDiagnostic, miette};
use tracing::debug;

use crate::game::Game;
use crate::game::alphabet::{LetterDistribution, letter_from_char, letters_from_str};
use crate::moves::move_gen::Lexicon;
use crate::moves::{Move, MoveKind};

/// Parses coordinates like `8D` (row first: horizontal) or `D8`
/// (column first: vertical) into (row, col, vertical).
fn parse_coords(s: &str) -> miette::Result<(u8, u8, bool)> {
    let vertical = s
        .chars()
        .next()
        .ok_or_else(|| miette!("empty coordinates"))?
        .is_ascii_alphabetic();
    let (row_part, col_part): (String, String) = if vertical {
        (
            s.chars().skip(1).collect(),
            s.chars().take(1).collect(),
        )
    } else {
        (
            s.chars().take_while(|c| c.is_ascii_digit()).collect(),
            s.chars().skip_while(|c| c.is_ascii_digit()).collect(),
        )
    };
    let row: u8 = row_part
        .parse()
        .into_diagnostic()
        .with_context(|| format!("bad row in coordinates {s:?}"))?;
    miette::ensure!((1..=15).contains(&row), "row out of range in {s:?}");
    miette::ensure!(col_part.len() == 1, "bad column in coordinates {s:?}");
    let col_char = col_part.chars().next().unwrap_or('A').to_ascii_uppercase();
    miette::ensure!(col_char.is_ascii_uppercase(), "bad column in {s:?}");
    Ok((row - 1, col_char as u8 - b'A', vertical))
}

/// Parses a played word like `DO.S` or `(CON)TEST`: letters place tiles
/// (lowercase for blanks), dots and parenthesized letters mark squares
/// already on the board.
fn parse_word(s: &str) -> miette::Result<Vec<u8>> {
    let mut tiles = Vec::with_capacity(s.len());
    let mut in_parens = false;
    for c in s.chars() {
        match c {
            '(' => in_parens = true,
            ')' => in_parens = false,
            '.' => tiles.push(0),
            _ if in_parens => tiles.push(0),
            _ => tiles.push(letter_from_char(c)?),
        }
    }
    miette::ensure!(!tiles.is_empty(), "empty play word");
    Ok(tiles)
}

#[derive(Debug)]
enum Event {
    Place { coords: String, word: String },
    Pass,
    Exchange(String),
}

/// Replays a transcript into a [`Game`]. Returns the position with the
/// transcript's last-named racks in place and the rest of the tiles in
/// the bag.
pub fn load_game_from_str(
    text: &str,
    ld: Arc<LetterDistribution>,
    lexicon: Arc<Lexicon>,
) -> miette::Result<Game> {
    let mut game = Game::new(ld, lexicon);
    let mut nicknames: [Option<String>; 2] = [None, None];
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let err_ctx = || format!("transcript line {}", lineno + 1);
        if let Some(rest) = line.strip_prefix("#player1 ") {
            nicknames[0] = rest.split_whitespace().next().map(str::to_string);
            continue;
        }
        if let Some(rest) = line.strip_prefix("#player2 ") {
            nicknames[1] = rest.split_whitespace().next().map(str::to_string);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let Some(rest) = line.strip_prefix('>') else {
            continue;
        };
        let (nick, rest) = rest
            .split_once(':')
            .ok_or_else(|| miette!("malformed event line")).with_context(err_ctx)?;
        let player = nicknames
            .iter()
            .position(|n| n.as_deref() == Some(nick))
            .ok_or_else(|| miette!("unknown player {nick:?}"))
            .with_context(err_ctx)?;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // rack, then an event; trailing score fields are ignored since
        // scoring is recomputed
        miette::ensure!(fields.len() >= 2, "malformed event line {line:?}");
        let rack = fields[0];
        let event = match fields[1] {
            "-" => Event::Pass,
            f if f.starts_with('-') => Event::Exchange(f[1..].to_string()),
            f if f.starts_with('(') => continue, // end-of-game rack bonus line
            coords => {
                miette::ensure!(fields.len() >= 3, "placement missing word in {line:?}");
                Event::Place {
                    coords: coords.to_string(),
                    word: fields[2].to_string(),
                }
            }
        };
        replay_event(&mut game, player, rack, &event).with_context(err_ctx)?;
    }
    debug!(
        spread = game.current_spread(),
        bag = game.bag().tiles_remaining(),
        "transcript loaded"
    );
    Ok(game)
}

pub fn load_game_from_file(
    path: &Path,
    ld: Arc<LetterDistribution>,
    lexicon: Arc<Lexicon>,
) -> miette::Result<Game> {
    let text = std::fs::read_to_string(path)
        .into_diagnostic()
        .with_context(|| format!("reading transcript {}", path.display()))?;
    load_game_from_str(&text, ld, lexicon)
}

fn replay_event(game: &mut Game, player: usize, rack: &str, event: &Event) -> miette::Result<()> {
    miette::ensure!(
        game.player_on_turn() == player,
        "event is out of turn order"
    );
    let rack_tiles = letters_from_str(rack)?;
    game.set_known_rack(player, &rack_tiles)
        .map_err(|e| miette!("{e}"))?;
    match event {
        Event::Pass => game.play_move(&Move::pass()).map_err(|e| miette!("{e}")),
        Event::Exchange(tiles) => {
            let tiles = letters_from_str(tiles)?;
            game.exchange_tiles(player, &tiles).map_err(|e| miette!("{e}"))
        }
        Event::Place { coords, word } => {
            let (row, col, vertical) = parse_coords(coords)?;
            let tiles = parse_word(word)?;
            let tiles_played = tiles.iter().filter(|&&t| t != 0).count() as u8;
            let score = game
                .board()
                .score_placement(row as usize, col as usize, vertical, &tiles, game.ld());
            let m = Move {
                kind: MoveKind::TilePlacement,
                row,
                col,
                vertical,
                tiles,
                score,
                tiles_played,
            };
            game.play_move(&m).map_err(|e| miette!("{e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::alphabet::letter_to_char;

    fn load(text: &str) -> Game {
        let ld = Arc::new(LetterDistribution::english());
        let lexicon = Arc::new(Lexicon::from_words(["CAT", "CATS", "DOGS"]).unwrap());
        load_game_from_str(text, ld, lexicon).unwrap()
    }

    #[test]
    fn coordinates_parse_both_orientations() {
        assert_eq!(parse_coords("8D").unwrap(), (7, 3, false));
        assert_eq!(parse_coords("D8").unwrap(), (3, 7, true));
        assert_eq!(parse_coords("15O").unwrap(), (14, 14, false));
        assert!(parse_coords("16A").is_err());
        assert!(parse_coords("").is_err());
    }

    #[test]
    fn replays_a_short_transcript() {
        let game = load(
            "#player1 alice Alice\n\
             #player2 bob Bob\n\
             >alice: CATSDOG 8G CAT +10 10\n\
             >bob: QXJEEUU - +0 0\n\
             >alice: SDOGABC 8G (CAT)S +6 16\n",
        );
        assert_eq!(game.score_for(0), 16);
        assert_eq!(game.score_for(1), 0);
        assert_eq!(game.player_on_turn(), 1);
        let row: String = (5..10)
            .map(|c| {
                let t = game.board().letter_at(7, c);
                if t == 0 { '.' } else { letter_to_char(t) }
            })
            .collect();
        assert_eq!(row, ".CATS");
    }

    #[test]
    fn blanks_and_play_through_tiles_replay() {
        let game = load(
            "#player1 alice Alice\n\
             #player2 bob Bob\n\
             >alice: CATDOGS 8G CAT +10 10\n\
             >bob: ?QXJEEU 8G (CAT)s +5 5\n",
        );
        assert_eq!(game.board().letter_at(7, 9), letter_from_char('s').unwrap());
        assert_eq!(game.score_for(1), 5);
    }

    #[test]
    fn exchanges_swap_tiles_with_the_bag() {
        let game = load(
            "#player1 alice Alice\n\
             #player2 bob Bob\n\
             >alice: CATSDOG -CAT +0 0\n",
        );
        assert_eq!(game.player_on_turn(), 1);
        assert_eq!(game.rack_for(0).num_tiles(), 7);
        assert_eq!(game.score_for(0), 0);
        assert_eq!(game.scoreless_turns(), 1);
    }
}

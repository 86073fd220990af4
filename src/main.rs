use dama::*;
use std::collections::BTreeSet;
use std::error::Error;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut board = match std::env::args().nth(1) {
        Some(path) => {
            let source = std::fs::read_to_string(&path)?;
            Board::load_with_player(&source, Color::White).map_err(GameError::from)?
        }
        None => Board::new(),
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        println!("{}", board.dump());
        match read_move(&board, &mut input)? {
            Some(mv) => {
                board.execute(&mv)?;
            }
            None => break,
        }
    }

    if let Some(winner) = board.winner() {
        println!("{} has no moves left, {} wins", board.player(), winner);
    }
    Ok(())
}

/// Ask for squares until the move is complete. `None` when the player
/// has no legal move or input ran out.
fn read_move(
    board: &Board,
    input: &mut impl BufRead,
) -> Result<Option<Vec<Square>>, Box<dyn Error>> {
    let mut prefix = Vec::new();
    loop {
        let offered = board.possible_moves(&prefix)?;
        if offered.is_empty() {
            break;
        }
        let question = if prefix.is_empty() { "from where" } else { "to where" };
        let Some(square) = ask(board.player(), question, &offered, input)? else {
            return Ok(None);
        };
        prefix.push(square);
        print!("{}", format_move(&prefix));
        if board.move_finished(&prefix)? {
            println!();
            println!();
            break;
        }
        println!("-");
    }
    Ok((!prefix.is_empty()).then_some(prefix))
}

fn ask(
    player: Color,
    question: &str,
    offered: &BTreeSet<Square>,
    input: &mut impl BufRead,
) -> io::Result<Option<Square>> {
    let names: Vec<String> = offered.iter().map(Square::to_string).collect();
    loop {
        print!("{}, {} ({})? ", player, question, names.join(", "));
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if answer.is_empty() {
            return Ok(offered.first().copied());
        }
        match answer.parse::<Square>() {
            Ok(square) if offered.contains(&square) => return Ok(Some(square)),
            _ => println!("Not understood"),
        }
    }
}

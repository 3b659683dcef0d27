//! Interactive REPL for replaying RF modulation datasets through an SDR
//! transmitter. Reads commands line by line, matching the teacher's `shell`
//! crate's `main` in shape (logger init, then a read loop), but adapted to
//! a persistent stateful session rather than one-shot-per-process: the
//! `select` -> `tune` -> `transmit` sequence depends on HAL state that must
//! outlive a single command.

mod commands;
mod logging;
mod state;
mod worker;

use std::io::{self, BufRead, Write};

use clap::Parser;
use mt_logger::{mt_flush, mt_new, Level, OutputStream};

use commands::Line;
use state::App;

fn main() -> Result<(), String> {
    mt_new!(None, Level::Info, OutputStream::StdOut);

    let (_guard, log_path) = logging::configure_logger("rf-replay.log")?;
    ftlog::info!("rf-replay starting, logging to {log_path:?}");

    let mut app = App::new()?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print_prompt(&mut stdout);

    for line in stdin.lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        app.poll_parse();

        let trimmed = line.trim();
        if trimmed.is_empty() {
            print_prompt(&mut stdout);
            continue;
        }

        let tokens = match shell_words::split(trimmed) {
            Ok(tokens) => tokens,
            Err(e) => {
                println!("could not tokenize input: {e}");
                print_prompt(&mut stdout);
                continue;
            }
        };

        match Line::try_parse_from(tokens) {
            Ok(parsed) => {
                if !app.dispatch(parsed.command) {
                    break;
                }
            }
            Err(e) => println!("{e}"),
        }

        print_prompt(&mut stdout);
    }

    ftlog::info!("rf-replay exiting");
    mt_flush!().map_err(|e| e.to_string())?;
    Ok(())
}

fn print_prompt(stdout: &mut io::Stdout) {
    print!("rf-replay> ");
    let _ = stdout.flush();
}

//! Sono - desktop music player
//!
//! Headless front end: wires the playback core to the default audio
//! device and drives it from a line-oriented prompt. Window and widget
//! construction live elsewhere; everything here maps one command to one
//! player call.

use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::{select, tick, unbounded, Receiver};

use sono_player::{format_time, Player};
use sono_transport::AudioTransport;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let transport = AudioTransport::open().context("opening audio output")?;
    let mut player = Player::new(transport);

    if let Some(dir) = std::env::args().nth(1) {
        open_folder(&mut player, &dir);
    }

    print_help();

    let commands = spawn_stdin_reader();
    // Position poll for the seek display; the transport also pushes
    // position events while audio flows
    let poll = tick(Duration::from_secs(1));

    loop {
        select! {
            recv(commands) -> line => {
                let Ok(line) = line else { break };
                if !dispatch(&mut player, line.trim()) {
                    break;
                }
            }
            recv(poll) -> _ => {
                player.poll_position();
            }
            default(Duration::from_millis(10)) => {}
        }

        // Keep audio flowing through the equalizer and analyzer
        if let Err(e) = player.pump() {
            println!("! {e}");
        }
    }

    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Handle one command line; returns false to quit
fn dispatch(player: &mut Player<AudioTransport>, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    match command {
        "" => {}
        "q" | "quit" => return false,
        "open" => match args.first() {
            Some(dir) => open_folder(player, dir),
            None => println!("usage: open <folder>"),
        },
        "ls" | "list" => list_tracks(player),
        "play" => match args.first().and_then(|a| a.parse::<usize>().ok()) {
            Some(index) => report(player.select(index)),
            None => println!("usage: play <track number>"),
        },
        "p" | "pause" => match player.toggle_play() {
            Ok(state) => println!("{state:?}"),
            Err(e) => println!("! {e}"),
        },
        "n" | "next" => report(player.next()),
        "b" | "prev" => report(player.previous()),
        "shuffle" => match player.toggle_shuffle() {
            Ok(on) => println!("shuffle {}", if on { "on" } else { "off" }),
            Err(e) => println!("! {e}"),
        },
        "repeat" => match player.toggle_repeat() {
            Ok(on) => println!("repeat {}", if on { "on" } else { "off" }),
            Err(e) => println!("! {e}"),
        },
        "eq" => match parse_gains(&args) {
            Some((bass, mid, treble)) => {
                player.set_gains(bass, mid, treble);
                let gains = player.gains();
                println!(
                    "eq bass {:+} dB / mid {:+} dB / treble {:+} dB",
                    gains.bass_db(),
                    gains.mid_db(),
                    gains.treble_db()
                );
            }
            None => println!("usage: eq <bass> <mid> <treble>  (dB, -10..10)"),
        },
        "vol" => match args.first().and_then(|a| a.parse::<u8>().ok()) {
            Some(percent) => player.set_volume(percent),
            None => println!("usage: vol <0..100>"),
        },
        "seek" => match args.first().and_then(|a| a.parse::<u64>().ok()) {
            Some(secs) => {
                // The prompt has no drag gesture; press, drag once, release
                player.seek_pressed();
                player.seek_dragged(secs * 1000);
                player.seek_released();
            }
            None => println!("usage: seek <seconds>"),
        },
        "status" => print_status(player),
        _ => print_help(),
    }
    true
}

fn open_folder(player: &mut Player<AudioTransport>, dir: &str) {
    match player.open_folder(Path::new(dir)) {
        Ok(count) => {
            println!("{count} tracks loaded from {dir}");
            list_tracks(player);
        }
        Err(e) => println!("! {e}"),
    }
}

fn list_tracks(player: &Player<AudioTransport>) {
    for (index, entry) in player.playlist().entries().iter().enumerate() {
        let marker = if player.current() == Some(index) {
            ">"
        } else {
            " "
        };
        println!("{marker} {index:3}  {}", entry.title);
    }
}

fn print_status(player: &mut Player<AudioTransport>) {
    let title = player
        .current()
        .and_then(|i| player.playlist().entry(i))
        .map(|e| e.title.clone())
        .unwrap_or_else(|| "-".into());

    let position = player.position();
    let time = format!(
        "{} / {}",
        format_time(position.display_ms()),
        format_time(position.duration_ms())
    );

    let beat = match player.visual_frame() {
        Some(frame) if frame.intensity > 1.0 => format!("  beat {:.2}", frame.intensity),
        _ => String::new(),
    };

    let state = player.state();
    let modes = format!(
        "{}{}",
        if player.is_shuffled() { " [shuffle]" } else { "" },
        if player.repeat() { " [repeat]" } else { "" },
    );
    println!("{state:?}  {title}  {time}{modes}{beat}");
}

fn parse_gains(args: &[&str]) -> Option<(f32, f32, f32)> {
    let mut values = args.iter().filter_map(|a| a.parse::<f32>().ok());
    Some((values.next()?, values.next()?, values.next()?))
}

fn report(result: Result<(), sono_player::PlayerError>) {
    if let Err(e) = result {
        println!("! {e}");
    }
}

fn print_help() {
    println!(
        "commands: open <folder> | list | play <n> | p (play/pause) | n (next) | b (prev)\n          \
         shuffle | repeat | eq <bass> <mid> <treble> | vol <0..100> | seek <secs>\n          \
         status | quit"
    );
}

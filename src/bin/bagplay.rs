// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagplay CLI
//!
//! Command-line front end for the bagplay library.
//!
//! ## Usage
//!
//! ```sh
//! # Show file information
//! bagplay info drive.bag
//!
//! # List topics with message counts
//! bagplay topics drive.bag
//!
//! # Play the file, printing decoded messages
//! bagplay play drive.bag --speed 2.0 --no-loop
//! ```

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bagplay::playback::PlaybackOptionsUpdate;
use bagplay::{read_metadata, BagMetadata, BagPlayer, MmapSource};

/// Bagplay - ROS bag v2.0 playback toolkit
///
/// Inspect and replay recorded robotics logs from the command line.
#[derive(Parser)]
#[command(name = "bagplay")]
#[command(about = "Timeline playback for ROS bag v2.0 files", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show basic file information and chunk statistics
    Info {
        /// Input bag file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// List all topics in the file
    Topics {
        /// Input bag file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Play the file, printing decoded message batches
    Play {
        /// Input bag file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Playback speed multiplier
        #[arg(long, default_value_t = 1.0)]
        speed: f64,

        /// Prefetch window in bag seconds
        #[arg(long, default_value_t = 10.0)]
        prefetch: f64,

        /// Stop at the end of the bag instead of looping
        #[arg(long)]
        no_loop: bool,

        /// Print each message as one JSON line
        #[arg(long)]
        json: bool,
    },
}

fn load_metadata(input: &PathBuf) -> Result<BagMetadata> {
    let source = MmapSource::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    read_metadata(&source).with_context(|| format!("failed to read {}", input.display()))
}

fn run_info(input: PathBuf) -> Result<()> {
    let metadata = load_metadata(&input)?;

    println!("File:        {}", input.display());
    println!("Start:       {}", metadata.start_time);
    println!("End:         {}", metadata.end_time);
    println!("Duration:    {:.3}s", metadata.duration_seconds());
    println!("Connections: {}", metadata.connections.len());
    println!("Chunks:      {}", metadata.chunks_info.len());
    println!("Messages:    {}", metadata.message_count());

    let total_span: u64 = metadata.chunks_info.iter().map(|c| c.span_bytes()).sum();
    println!(
        "Chunk bytes: {:.2} MB",
        total_span as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}

fn run_topics(input: PathBuf) -> Result<()> {
    let metadata = load_metadata(&input)?;
    let counts = metadata.connection_message_counts();

    let mut connections: Vec<_> = metadata.connections.values().collect();
    connections.sort_by(|a, b| a.topic.cmp(&b.topic));

    for connection in connections {
        let count = counts.get(&connection.conn).copied().unwrap_or(0);
        println!(
            "{:<40} {:<30} {:>8} msgs",
            connection.topic, connection.message_type, count
        );
    }
    Ok(())
}

fn run_play(input: PathBuf, speed: f64, prefetch: f64, no_loop: bool, json: bool) -> Result<()> {
    let player = BagPlayer::new()?;
    let messages = player.messages_stream();

    let metadata = player
        .load_path(&input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    eprintln!(
        "Playing {} ({:.3}s, {} chunks) at {speed}x",
        input.display(),
        metadata.duration_seconds(),
        metadata.chunks_info.len()
    );

    player.update_options(PlaybackOptionsUpdate {
        playback_speed: Some(speed),
        prefetch_seconds: Some(prefetch),
        loop_playback: Some(!no_loop),
    });
    player.play();

    let mut printed = 0u64;
    loop {
        match messages.recv_timeout(Duration::from_millis(200)) {
            Ok(batch) => {
                for message in &batch {
                    if json {
                        println!("{}", serde_json::to_string(message)?);
                    } else {
                        println!("[{}] {}", message.time, message.topic);
                    }
                    printed += 1;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if !player.snapshot().is_playing {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    eprintln!("Printed {printed} messages");
    player.destroy();
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input } => run_info(input),
        Commands::Topics { input } => run_topics(input),
        Commands::Play {
            input,
            speed,
            prefetch,
            no_loop,
            json,
        } => run_play(input, speed, prefetch, no_loop, json),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

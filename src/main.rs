// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
mod command;
mod config;
mod device;
mod engine;
mod matrix;
mod player;
mod playsync;
mod show;

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::error;

use crate::device::Device;
use crate::engine::{Engine, Outcome};
use crate::player::Player;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A lightshow player for addressable LED matrices."
)]
struct Cli {
    /// The path to the player config.
    #[arg(short, long)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays a show file through the display device.
    Play {
        /// The path to the show file.
        show_path: String,
    },
    /// Lists and verifies all show files in the given directory.
    Shows {
        /// The path to the show repository on disk.
        path: String,
    },
    /// Prints the physical wire index of every matrix coordinate.
    Map {},
    /// Runs the ad-hoc pixel command channel over stdin/stdout.
    Driver {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::Player::deserialize(&PathBuf::from(path))?,
        None => config::Player::default(),
    };
    let dimensions = config.dimensions();

    match cli.command {
        Commands::Play { show_path } => {
            // Load-time validation happens before the device is touched, so
            // a bad show never creates a partial session.
            let show = Arc::new(config::parse_show(&PathBuf::from(&show_path), dimensions)?);
            let device = device::get_device(&config.device())?;
            let engine = Arc::new(Engine::new(
                device.clone(),
                dimensions,
                config.tick()?,
                config.commit_retry_limit(),
            ));
            let player = Arc::new(Player::new(engine));

            player.play(show).await?;

            {
                let player = player.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        player.stop().await;
                    }
                });
            }

            let result = player.wait().await;

            // Blank the display before releasing the device, whether
            // playback ended well or not.
            if let Err(e) = device.clear() {
                error!(err = e.to_string(), "Unable to blank the display.");
            }

            match result? {
                Some(Outcome::Completed) => println!("Playback completed."),
                Some(Outcome::Stopped) => println!("Playback stopped."),
                None => {}
            }
        }
        Commands::Shows { path } => {
            let shows = config::get_all_shows(&PathBuf::from(&path), dimensions)?;

            if shows.is_empty() {
                println!("No shows found in {}.", path.as_str());
                return Ok(());
            }

            println!("Shows (count: {}):", shows.len());
            for (path, result) in shows {
                match result {
                    Ok(show) => println!("- {}: {}", path.display(), show),
                    Err(e) => println!("- {}: INVALID: {}", path.display(), e),
                }
            }
        }
        Commands::Map {} => {
            println!(
                "Wire indices for a {}x{} serpentine matrix:",
                dimensions.width(),
                dimensions.height()
            );
            for y in 0..dimensions.height() {
                let row: Vec<String> = (0..dimensions.width())
                    .map(|x| format!("{:4}", dimensions.led_index(x, y)))
                    .collect();
                println!("{}", row.join(" "));
            }
        }
        Commands::Driver {} => {
            let device = device::get_device(&config.device())?;
            let stdin = io::stdin();
            let stdout = io::stdout();
            command::run(stdin.lock(), stdout.lock(), device, dimensions)?;
        }
    }

    Ok(())
}

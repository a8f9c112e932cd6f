/*
 * This file is part of autoz.
 *
 * Copyright (C) 2025 autoz contributors
 *
 * autoz is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * autoz is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with autoz. If not, see <https://www.gnu.org/licenses/>.
 */

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use az_core::JsonConfigStore;
use az_protocol::Command;
use tracing::info;

use autoz::config::{config_path, write_default_config};
use autoz::console::Console;
use autoz::logger;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    eprintln!("autoz {} - automatic Z-offset probing and calibration", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    autoz [OPTIONS]           Read commands from stdin");
    eprintln!("    autoz [OPTIONS] init      Write a default printer.json");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -c, --config <PATH>   Printer configuration (default: {})", config_path().display());
    eprintln!("    --json                Print responses as JSON lines");
    eprintln!("    --logging             Append events to {}", logger::default_log_path().display());
    eprintln!("    -h, --help            Show this help");
    eprintln!("    -V, --version         Show version");
    eprintln!();
    eprintln!("COMMANDS:");
    for command in Command::ALL {
        eprintln!("    {:<26} {}", command.name(), command.help());
    }
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    AUTOZ_CONFIG          Printer configuration path");
    eprintln!("    AUTOZ_LOG             Log level (trace, debug, info, warn, error)");
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut path: Option<PathBuf> = None;
    let mut json_output = false;
    let mut logging_enabled = false;
    let mut init = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-V" | "--version" => {
                println!("autoz {}", VERSION);
                return Ok(());
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                path = Some(PathBuf::from(&args[i]));
            }
            "--json" => json_output = true,
            "--logging" => logging_enabled = true,
            "init" => init = true,
            arg => {
                eprintln!("Unknown argument: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let log_level = std::env::var("AUTOZ_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(&log_level)
        .with_writer(io::stderr)
        .init();

    let path = path.unwrap_or_else(config_path);
    if init {
        write_default_config(&path).with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    if logging_enabled {
        logger::init_logging(&logger::default_log_path());
        logger::log_event("startup", serde_json::json!({ "config": path, "args": args }));
    }

    let store = JsonConfigStore::open(&path).with_context(|| format!("loading {}", path.display()))?;
    let (mut console, _sim) = Console::simulated(store).context("initialising auto_z_offset")?;
    info!("autoz {} ready, reading commands from stdin", VERSION);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if let Some(reply) = console.execute_line(&line) {
            if json_output {
                writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
            } else {
                writeln!(stdout, "{}", reply.response.render())?;
            }
            stdout.flush()?;
        }
    }

    logger::close_logging();
    Ok(())
}

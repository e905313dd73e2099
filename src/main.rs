//! Beatstack CLI
//!
//! Command-line front end for editing Beatstack project files.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use beatstack::cli::commands;
use beatstack::cli::{Cli, Commands};
use beatstack::{Config, Result};

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_filter.clone()
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    info!("Beatstack v{}", env!("CARGO_PKG_VERSION"));

    let Some(cmd) = cli.command else {
        println!("Beatstack v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for available commands");
        return ExitCode::SUCCESS;
    };

    match handle_command(cmd, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[{}] {}", e.error_code(), e);
            eprintln!("Error: {}", e);
            if let Some(hint) = e.recovery_suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn handle_command(cmd: Commands, config: &Config) -> Result<()> {
    match cmd {
        Commands::NewProject { path } => commands::new_project(&path, config),
        Commands::AddSong { project, wav, name } => {
            commands::add_song(&project, &wav, name.as_deref(), config)
        }
        Commands::SelectSong { project, name } => commands::select_song(&project, &name, config),
        Commands::AddLayer { project, name } => commands::add_layer(&project, &name, config),
        Commands::RemoveLayer { project, name } => commands::remove_layer(&project, &name, config),
        Commands::AddEvent {
            project,
            layer,
            frame,
            name,
            color,
        } => commands::add_event(&project, &layer, frame, name.as_deref(), color, config),
        Commands::AddSeries {
            project,
            layer,
            start,
            qty,
            spacing,
            name,
            color,
        } => commands::add_series(
            &project,
            &layer,
            start,
            qty,
            spacing,
            name.as_deref(),
            color,
            config,
        ),
        Commands::DeleteEvent {
            project,
            layer,
            frame,
        } => commands::delete_event(&project, &layer, frame, config),
        Commands::Nudge {
            project,
            layer,
            frame,
            delta,
        } => commands::nudge(&project, &layer, frame, delta, config),
        Commands::MoveEvent {
            project,
            layer,
            from,
            to,
        } => commands::move_event(&project, &layer, from, to, config),
        Commands::ChangeLayer {
            project,
            from_layer,
            to_layer,
            frame,
        } => commands::change_layer(&project, &from_layer, &to_layer, frame, config),
        Commands::PrintState { project } => commands::print_state(&project, config),
        Commands::Play {
            project,
            seconds,
            from,
        } => commands::play(&project, seconds, from, config),
        Commands::SavePreset {
            name,
            filter_type,
            cutoff,
        } => commands::save_preset(&name, filter_type, cutoff, config),
        Commands::ListPresets => commands::list_presets(config),
        Commands::DeletePreset { name } => commands::delete_preset(&name, config),
    }
}

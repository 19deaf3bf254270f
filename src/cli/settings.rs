//! The `settings` subcommands: locating, editing and checking the program settings file
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Edit the program settings file, then check it can be loaded
    Edit,
    /// Get the path to where the settings file is read from
    Path,
    /// Show the settings which will be used for the next run
    Show,
    /// Write the contents of a placeholder `settings.toml` to the console
    DumpDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Edit => handle_edit_command()?,
            Self::Path => println!("{}", get_settings_file_path().display()),
            Self::Show => handle_show_command()?,
            Self::DumpDefault => print!("{}", Settings::default_file_contents()),
        }

        Ok(())
    }
}

/// Create a placeholder settings file at `file_path` unless there is already one
fn ensure_settings_file_exists(file_path: &Path) -> Result<()> {
    if file_path.is_file() {
        return Ok(());
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }

    fs::write(file_path, Settings::default_file_contents())
        .with_context(|| format!("Failed to write settings file: {}", file_path.display()))
}

/// Summarise the settings in effect, one per line
fn describe_settings(settings: &Settings) -> String {
    let max_graph_depth = settings
        .max_graph_depth
        .map_or_else(|| "unlimited".to_string(), |depth| depth.to_string());

    format!(
        "log_level: {}\noverwrite: {}\nmax_graph_depth: {max_graph_depth}\n",
        settings.log_level, settings.overwrite
    )
}

/// Load the settings file at `file_path` and summarise it
fn describe_settings_file(file_path: &Path) -> Result<String> {
    let settings = Settings::load_from_path(file_path)?;
    Ok(describe_settings(&settings))
}

/// Handle the `edit` command
fn handle_edit_command() -> Result<()> {
    let file_path = get_settings_file_path();
    ensure_settings_file_exists(&file_path)?;

    println!("Opening settings file for editing: {}", file_path.display());
    edit::edit_file(&file_path)?;

    // Catch mistakes now rather than on the next run
    let description = describe_settings_file(&file_path)?;
    print!("Settings saved.\n{description}");

    Ok(())
}

/// Handle the `show` command
fn handle_show_command() -> Result<()> {
    let file_path = get_settings_file_path();
    if file_path.is_file() {
        println!("Settings file: {}", file_path.display());
    } else {
        println!(
            "No settings file at {}. Using default settings.",
            file_path.display()
        );
    }
    print!("{}", describe_settings_file(&file_path)?);

    Ok(())
}

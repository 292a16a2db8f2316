// UI layer: the terminal rendition of the upload form, built with
// `dialoguer` prompts. Each field is prefilled from the saved settings so
// a returning user only has to confirm values; the key prompts stay
// hidden and keep the saved value when left empty.

use crate::api::ApiClient;
use crate::batch::{self, Submission};
use crate::config::{Settings, CONFIG_FILE};
use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

/// Main interactive menu. Runs a select loop until the user chooses
/// "Exit". Arrow keys plus Enter drive the selection.
pub fn main_menu() -> Result<()> {
    loop {
        let items = vec!["Upload images", "Open config file", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_upload()?,
            1 => open_config_file(),
            2 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Collect the six fields, validate, persist, then run the upload batch.
/// Every service-side failure prints an error line and returns to the
/// menu; only local IO and prompt errors propagate.
fn handle_upload() -> Result<()> {
    let mut settings = Settings::load_from(CONFIG_FILE)?;
    prompt_fields(&mut settings)?;

    // All checks happen before a client exists, so a blank field or a bad
    // directory never reaches the network.
    let submission = match batch::validate(&settings) {
        Ok(s) => s,
        Err(e) => {
            println!("Error: {}", e);
            return Ok(());
        }
    };

    // Save before uploading so the values survive even if the batch dies.
    settings.save_to(CONFIG_FILE)?;

    run_submission(&settings, &submission)
}

/// Prompt for each field with the saved value as the starting point.
fn prompt_fields(settings: &mut Settings) -> Result<()> {
    settings.host = Input::new()
        .with_prompt("Host")
        .with_initial_text(settings.host.clone())
        .allow_empty(true)
        .interact_text()?;
    settings.upload_host = Input::new()
        .with_prompt("Upload host")
        .with_initial_text(settings.upload_host.clone())
        .allow_empty(true)
        .interact_text()?;

    let public_key: String = Password::new()
        .with_prompt(key_prompt("Public key", &settings.public_key))
        .allow_empty_password(true)
        .interact()?;
    if !public_key.trim().is_empty() {
        settings.public_key = public_key.trim().to_string();
    }
    let private_key: String = Password::new()
        .with_prompt(key_prompt("Private key", &settings.private_key))
        .allow_empty_password(true)
        .interact()?;
    if !private_key.trim().is_empty() {
        settings.private_key = private_key.trim().to_string();
    }

    settings.project_id = Input::new()
        .with_prompt("Project ID")
        .with_initial_text(settings.project_id.clone())
        .allow_empty(true)
        .interact_text()?;

    // Native folder picker stands in for the Browse button; declining it
    // falls back to a plain text prompt.
    let browse = Confirm::new()
        .with_prompt("Browse for the image directory?")
        .default(false)
        .interact()?;
    if browse {
        if let Some(folder) = rfd::FileDialog::new().pick_folder() {
            settings.directory_path = folder.to_string_lossy().into_owned();
        }
    }
    settings.directory_path = Input::new()
        .with_prompt("Image directory")
        .with_initial_text(settings.directory_path.clone())
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

fn key_prompt(label: &str, saved: &str) -> String {
    if saved.is_empty() {
        label.to_string()
    } else {
        format!("{} (empty keeps the saved value)", label)
    }
}

/// Connect, resolve project and storage, enumerate files, upload.
fn run_submission(settings: &Settings, submission: &Submission) -> Result<()> {
    println!("Connecting to {}...", settings.host);
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Authenticating...");

    let api = ApiClient::new(
        &settings.host,
        &settings.upload_host,
        &settings.public_key,
        &settings.private_key,
    )?;

    let user = match api.current_user() {
        Ok(u) => u,
        Err(e) => {
            spinner.finish_and_clear();
            println!("Authentication failed: {:#}", e);
            return Ok(());
        }
    };
    println!(
        "Authenticated as {} (id {})",
        user.username.as_deref().unwrap_or("-"),
        user.id
    );

    let project = match api.fetch_project(submission.project_id) {
        Ok(p) => p,
        Err(e) => {
            spinner.finish_and_clear();
            println!("Project not found. Please check the Project ID. ({:#})", e);
            return Ok(());
        }
    };
    println!(
        "Connected. Project: {} (id {})",
        project.name.as_deref().unwrap_or("-"),
        project.id
    );

    let storage = match api.my_storage() {
        Ok(Some(s)) => s,
        Ok(None) => {
            spinner.finish_and_clear();
            println!("No available storage found for this user.");
            return Ok(());
        }
        Err(e) => {
            spinner.finish_and_clear();
            println!("Storage lookup failed: {:#}", e);
            return Ok(());
        }
    };
    spinner.finish_and_clear();
    println!("Using storage id {}", storage.id);

    let files = batch::supported_images(&submission.directory)?;
    if files.is_empty() {
        println!("No valid image files found in the selected directory.");
        return Ok(());
    }
    println!("Found {} images to upload...", files.len());
    info!(count = files.len(), directory = %submission.directory.display(), "starting upload batch");

    let report = batch::run_batch(&api, &files, storage.id, project.id);
    println!(
        "Done: {} of {} uploaded, {} failed.",
        report.uploaded,
        report.attempted,
        report.failures.len()
    );
    Ok(())
}

/// Open the settings file in the platform editor so keys can be fixed by
/// hand, mirroring the old "Open Config File" button.
fn open_config_file() {
    if !Path::new(CONFIG_FILE).exists() {
        println!("Config file not found! Save settings first.");
        return;
    }
    let result = if cfg!(target_os = "windows") {
        std::process::Command::new("notepad.exe")
            .arg(CONFIG_FILE)
            .status()
    } else {
        std::process::Command::new("xdg-open").arg(CONFIG_FILE).status()
    };
    if let Err(e) = result {
        println!("Could not open {}: {}", CONFIG_FILE, e);
    }
}

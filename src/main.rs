//! bookmeter-export CLI - exports a Bookmeter account's shelves and profile.

use anyhow::{Context, Result};
use bookmeter_export::config::Config;
use bookmeter_export::console::Console;
use bookmeter_export::export::{Exporter, PROFILE_BASENAME};
use bookmeter_export::extract::extract_records;
use bookmeter_export::paginate::Paginator;
use bookmeter_export::profile::fetch_profile;
use bookmeter_export::session::{AccountId, PageFetcher, Session, authenticate};
use bookmeter_export::{Credentials, Shelf};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use url::Url;

/// Export your Bookmeter shelves and profile as JSON and CSV.
#[derive(Parser, Debug)]
#[command(name = "bookmeter-export")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Account email address.
    #[arg(long, env = "EMAIL", hide_env_values = true)]
    email: String,

    /// Account password.
    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    password: String,

    /// Directory for exported files (overrides the config file).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Only export the listed shelf. Allows multiple.
    #[arg(long, short, value_enum)]
    shelf: Vec<Shelf>,

    /// Skip the profile and icon export.
    #[arg(long)]
    skip_profile: bool,

    /// Path to the config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print request-level debug output.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let console = Console::new();

    console.section("Bookmeter Export");

    match run(&args, console.clone()).await {
        Ok(()) => {
            console.section("Done!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            console.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, console: Console) -> Result<()> {
    console.step("Loading configuration...");
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    if args.debug {
        config.scraping.debug = true;
    }
    if let Some(output) = &args.output {
        config.paths.output_directory = output.clone();
    }

    let console = console.with_debug(config.scraping.debug);
    let credentials = Credentials::new(args.email.as_str(), args.password.as_str())
        .context("Missing credentials")?;
    let site = config.site.url()?;
    console.success("Configuration loaded");

    let session = Session::new(config.scraping.clone(), console.clone())
        .context("Failed to create HTTP client")?;

    console.step("Signing in...");
    let account = authenticate(&session, &site, &credentials)
        .await
        .context("Failed to sign in")?;
    console.success(&format!("Signed in as user {}", account));

    let exporter = Exporter::new(&config.paths.output_directory);
    exporter
        .ensure_dir()
        .with_context(|| format!("Failed to create {}", exporter.dir().display()))?;
    console.info(&format!("Writing to {}", console.path(exporter.dir())));

    if !args.skip_profile {
        export_profile(&session, &site, &account, &exporter, &console).await?;
    }

    let shelves = if args.shelf.is_empty() {
        Shelf::ALL.to_vec()
    } else {
        args.shelf.clone()
    };

    let paginator = Paginator::new(&session, &config.scraping, &console);
    for shelf in shelves {
        console.step(&format!("Exporting the {} shelf...", shelf));

        let first_url = account.shelf_url(&site, shelf)?;
        let first = session
            .get(&first_url)
            .await
            .with_context(|| format!("Failed to open the {} shelf", shelf))?;

        let records = paginator
            .collect(&shelf.to_string(), first, |doc| extract_records(doc, shelf))
            .await
            .with_context(|| format!("Failed to read the {} shelf", shelf))?;

        if records.is_empty() {
            console.warning(&format!(
                "The {} shelf is empty; {}.csv has no header",
                shelf,
                shelf.export_basename()
            ));
        }

        let files = exporter
            .write_collection(shelf.export_basename(), &records)
            .with_context(|| format!("Failed to export the {} shelf", shelf))?;
        console.success(&format!(
            "{} books -> {}, {}",
            console.count(files.rows),
            console.path(&files.json),
            console.path(&files.csv)
        ));
    }

    Ok(())
}

async fn export_profile(
    session: &Session,
    site: &Url,
    account: &AccountId,
    exporter: &Exporter,
    console: &Console,
) -> Result<()> {
    console.step("Exporting profile...");

    let profile = fetch_profile(session, site, account)
        .await
        .context("Failed to read the profile")?;
    let files = exporter
        .write_profile(&profile)
        .context("Failed to export the profile")?;
    console.success(&format!(
        "Profile of {} -> {}, {}",
        profile.name,
        console.path(&files.json),
        console.path(&files.csv)
    ));

    let icon_url = Url::parse(&profile.icon_url)
        .with_context(|| format!("Invalid icon URL: {}", profile.icon_url))?;
    let icon = session
        .download(&icon_url, exporter.dir(), PROFILE_BASENAME)
        .await
        .context("Failed to download the profile icon")?;
    console.success(&format!("Icon -> {}", console.path(&icon)));

    Ok(())
}

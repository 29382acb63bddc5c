//! pom-gen command line
//!
//! Generates page objects from live pages, whole sites or stored DOM snapshots,
//! and saves or restores browser cookies.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use pom_gen::{
    BrowserSession, ConnectionOptions, Driver, GeneratorOptions, LaunchOptions, PageArtifact, PageParser,
    SnapshotDriver, browser::normalize_url, render_rust, write_source,
};
use std::{fs, path::PathBuf, time::Duration};

#[derive(Parser)]
#[command(name = "pom-gen")]
#[command(version)]
#[command(about = "Generate page objects from web pages", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H', global = true)]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH", global = true)]
    chrome: Option<PathBuf>,

    /// WebSocket endpoint of a running browser to use instead of launching one
    #[arg(long, value_name = "URL", global = true)]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR", global = true)]
    user_data_dir: Option<PathBuf>,

    /// Bound on every wait, in seconds
    #[arg(long, default_value = "10", global = true)]
    timeout_secs: u64,

    /// Print artifact JSON instead of Rust source
    #[arg(long, global = true)]
    json: bool,

    /// Do not record page titles for the identity check
    #[arg(long, global = true)]
    no_title_check: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the page object for a single page
    Page {
        url: String,

        /// Id of a popup to generate instead of the whole page
        #[arg(long, value_name = "ID")]
        popup: Option<String>,

        /// Write the source under this directory instead of printing it
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Crawl same-origin links and generate a page object per page
    Crawl {
        url: String,

        /// Pages are generated at depths below this bound
        #[arg(long, default_value = "2")]
        depth: usize,

        /// Write every source under this directory instead of printing
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Generate from a stored DOM snapshot, no browser needed
    Snapshot {
        /// JSON file with one snapshot page or an array of them
        file: PathBuf,

        /// URL of the snapshot page to generate
        #[arg(long)]
        url: String,

        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Save or restore the cookies of a site
    Cookies {
        #[command(subcommand)]
        action: CookieAction,
    },
}

#[derive(Subcommand)]
enum CookieAction {
    /// Open the URL and write its cookies to FILE
    Save { url: String, file: PathBuf },
    /// Open the URL and add the cookies from FILE
    Load { url: String, file: PathBuf },
}

impl Cli {
    fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions::new()
            .timeout(Duration::from_secs(self.timeout_secs))
            .verify_title(!self.no_title_check)
    }

    fn session(&self) -> anyhow::Result<BrowserSession> {
        if let Some(ref endpoint) = self.ws_endpoint {
            let options = ConnectionOptions::new(endpoint.clone()).timeout(self.timeout_secs * 1000);
            return BrowserSession::connect(options).context("Failed to connect to browser");
        }

        let mut options = LaunchOptions::new().headless(!self.headed);
        if let Some(ref path) = self.chrome {
            options = options.chrome_path(path.clone());
        }
        if let Some(ref dir) = self.user_data_dir {
            options = options.user_data_dir(dir.clone());
        }
        BrowserSession::launch(options).context("Failed to launch browser")
    }
}

fn emit(artifact: &PageArtifact, out: Option<&PathBuf>, json: bool) -> anyhow::Result<()> {
    match out {
        Some(dir) if json => {
            let path = dir.join(format!("{}.json", artifact.class_name()));
            fs::create_dir_all(dir)?;
            fs::write(&path, artifact.to_json()?).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", path.display());
        }
        Some(dir) => {
            let path = write_source(dir, artifact).context("Failed to write page object")?;
            println!("{}", path.display());
        }
        None if json => println!("{}", artifact.to_json()?),
        None => println!("{}", render_rust(artifact)?),
    }
    Ok(())
}

fn generate<D: Driver>(parser: &PageParser<'_, D>, popup: Option<&str>) -> anyhow::Result<PageArtifact> {
    let artifact = match popup {
        Some(id) => parser.handle_popup(id).with_context(|| format!("Failed to parse popup '{}'", id))?,
        None => parser.generate().context("Failed to generate page object")?,
    };
    Ok(artifact)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Page { url, popup, out } => {
            let session = cli.session()?;
            let url = normalize_url(url);
            session.navigate(&url).with_context(|| format!("Failed to open {}", url))?;

            let parser = PageParser::with_options(&session, cli.generator_options());
            let artifact = generate(&parser, popup.as_deref())?;
            emit(&artifact, out.as_ref(), cli.json)?;
        }
        Command::Crawl { url, depth, out } => {
            let session = cli.session()?;
            let parser = PageParser::with_options(&session, cli.generator_options());
            let url = normalize_url(url);

            match out {
                Some(dir) if !cli.json => {
                    let written = parser.save_all(dir, &url, *depth).context("Crawl failed")?;
                    for path in written {
                        println!("{}", path.display());
                    }
                }
                _ => {
                    let site = parser.generate_for_all_paths(&url, *depth).context("Crawl failed")?;
                    for skipped in &site.skipped {
                        eprintln!("Skipped {}: {}", skipped.url, skipped.error);
                    }
                    for artifact in site.artifacts.values() {
                        emit(artifact, out.as_ref(), cli.json)?;
                    }
                }
            }
        }
        Command::Snapshot { file, url, out } => {
            let json = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
            let driver = SnapshotDriver::from_json(&json).context("Invalid snapshot file")?;
            driver.navigate(url).with_context(|| format!("{} is not in the snapshot", url))?;

            let parser = PageParser::with_options(&driver, cli.generator_options());
            let artifact = generate(&parser, None)?;
            emit(&artifact, out.as_ref(), cli.json)?;
        }
        Command::Cookies { action } => {
            let session = cli.session()?;
            let parser = PageParser::with_options(&session, cli.generator_options());

            match action {
                CookieAction::Save { url, file } => {
                    session.navigate(&normalize_url(url))?;
                    let report = parser.save_cookies(file)?;
                    eprintln!("Saved {} cookies ({} skipped)", report.saved, report.skipped.len());
                }
                CookieAction::Load { url, file } => {
                    session.navigate(&normalize_url(url))?;
                    let report = parser.load_cookies(file)?;
                    for error in &report.errors {
                        eprintln!("{}", error);
                    }
                    if report.loaded == 0 && !report.errors.is_empty() {
                        bail!("No cookie in {} could be loaded", file.display());
                    }
                    eprintln!("Loaded {} cookies", report.loaded);
                }
            }
        }
    }

    Ok(())
}

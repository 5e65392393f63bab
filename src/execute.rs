use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use gvm::global::settings::Settings;
use gvm::process::SystemRunner;
use gvm::shell::{active_bin_dir, write_env_script};
use gvm::util::{format_megabytes, is_on_path};
use gvm::version::{is_release_candidate, normalize, validate_version};
use gvm::{
    read_active_slot, update_available_versions, CancelToken, FsInstaller, GoDevLister, GvmError,
    HttpFetcher, InstallManager, StateLock, VersionCatalog,
};
use crate::cli::{GvmCommand, ListAction, CLI};

/// Catalog format tag written into new catalogs.
const SCHEMA_VERSION: &str = env!("CARGO_PKG_VERSION");

const RULE_WIDTH: usize = 50;

pub fn execute(cli: CLI, settings: &Settings) -> Result<()> {
    match cli.command {
        GvmCommand::Configure => {
            execute_configure(settings)
        }
        GvmCommand::List { downloaded, current, action } => {
            match action {
                Some(ListAction::Update) => execute_list_update(settings),
                None if current => execute_list_current(settings),
                None if downloaded => execute_list_downloaded(settings),
                None => execute_list(settings),
            }
        }
        GvmCommand::Download { version } => {
            execute_download(settings, version)
        }
        GvmCommand::Use { version } => {
            execute_use(settings, &version)
        }
    }
}

pub fn execute_configure(settings: &Settings) -> Result<()> {
    let _lock = StateLock::acquire(&settings.config_dir)?;
    let store = settings.store();
    match store.load() {
        Ok(_) => {
            println!("{}", "gvm is already configured. Run 'gvm --help' to see available commands.".yellow());
            return Ok(());
        }
        Err(GvmError::NotFound(_)) => {
            println!("{}", "Setting up gvm configuration...".blue());
        }
        Err(GvmError::Corruption { path, reason }) => {
            tracing::warn!(path = %path.display(), %reason, "replacing corrupt catalog");
            println!("{}", format!("Catalog at {} is corrupt ({reason}). Rebuilding it...", path.display()).yellow());
        }
        Err(e) => return Err(e.into()),
    }

    let install_root = settings.create_install_root()?;
    let mut catalog = VersionCatalog::new(SCHEMA_VERSION, &install_root);
    let lister = GoDevLister::new(settings.releases_url.as_str());
    update_available_versions(&mut catalog, &lister)?;
    store.save(&catalog)?;

    let active_dir = settings.active_dir(&catalog);
    write_env_script(&settings.env_script_path(), &active_dir)?;

    println!("{}", "✓ gvm configured successfully!".green());
    println!("  config:    {}", store.path().display());
    println!("  downloads: {}", install_root.display());
    println!("  toolchain: {}", active_dir.display());
    println!("{}", "\nNext steps:".cyan());
    println!("{}", "  • Run 'gvm list' to see available Go versions".cyan());
    println!("{}", "  • Run 'gvm download --version <version>' to download a Go version".cyan());
    println!("{}", "  • Run 'gvm use <version>' to switch to a specific Go version".cyan());
    Ok(())
}

pub fn execute_list(settings: &Settings) -> Result<()> {
    let catalog = settings.store().load()?;
    if catalog.available_versions.is_empty() {
        println!("{}", "No Go versions available in cache.".yellow());
        println!("{}", "\nTry: gvm list update  # to update the versions list".cyan());
        return Ok(());
    }
    let slot = read_active_slot(&SystemRunner, &settings.active_dir(&catalog))
        .context("could not detect the current go version")?;
    let current = slot.version();
    let lts = catalog.latest_stable().map(|remote| remote.version.clone());

    println!();
    println!("{}", "Available Go Versions".cyan());
    println!("{}", "─".repeat(RULE_WIDTH));
    for remote in &catalog.available_versions {
        print_version_line(
            &remote.version,
            current,
            lts.as_deref(),
            catalog.is_downloaded(&remote.version),
        );
    }
    println!();
    println!("{}", "Legend: ▶ = Active | LTS = latest stable | ↓ = Downloaded".bright_black());
    println!();
    println!("{}", "Tips:".cyan());
    println!("{}", "  • Use 'gvm list -d' to see downloaded versions".cyan());
    println!("{}", "  • Use 'gvm list -c' to see current version only".cyan());
    println!("{}", "  • Use 'gvm list update' to refresh available versions".cyan());
    Ok(())
}

pub fn execute_list_downloaded(settings: &Settings) -> Result<()> {
    let catalog = settings.store().load()?;
    if catalog.downloaded_versions.is_empty() {
        println!("{}", "No downloaded Go versions found.".yellow());
        println!("{}", "\nTry: gvm list              # to see available versions".cyan());
        println!("{}", "     gvm download -g <ver>   # to download a version".cyan());
        return Ok(());
    }
    let slot = read_active_slot(&SystemRunner, &settings.active_dir(&catalog))
        .context("could not detect the current go version")?;

    println!();
    println!("{}", "Downloaded Go Versions".cyan());
    println!("{}", "─".repeat(RULE_WIDTH));
    for downloaded in catalog.downloaded_sorted().into_iter().rev() {
        print_version_line(&downloaded.version, slot.version(), None, false);
        println!("      {}", downloaded.tar_path.display().to_string().bright_black());
    }
    println!();
    println!("{}", "Legend: ▶ = Active | • = Downloaded".bright_black());
    Ok(())
}

pub fn execute_list_current(settings: &Settings) -> Result<()> {
    let catalog = settings.store().load()?;
    let slot = read_active_slot(&SystemRunner, &settings.active_dir(&catalog))?;
    let Some(current) = slot.version() else {
        bail!("no go toolchain is active. Run `gvm use <version>` to install one")
    };
    println!();
    println!("{}", "Current Go Version".cyan());
    println!("{}", "─".repeat(30));
    println!("  {}", format!("go{current}").green().bold());
    println!();
    Ok(())
}

pub fn execute_list_update(settings: &Settings) -> Result<()> {
    println!();
    println!("{}", "Updating Go versions list...".cyan());
    println!("{}", "─".repeat(30));
    let _lock = StateLock::acquire(&settings.config_dir)?;
    let store = settings.store();
    let mut catalog = store.load()?;

    println!("{}", "  Fetching latest versions from go.dev...".blue());
    let lister = GoDevLister::new(settings.releases_url.as_str());
    update_available_versions(&mut catalog, &lister)?;

    println!("{}", "  Saving updated list...".blue());
    store.save(&catalog)?;

    println!("{}", "✓ Successfully updated versions list!".green());
    println!(
        "{}",
        format!("\n{} Go versions available for download", catalog.available_versions.len()).cyan()
    );
    println!("{}", "Run 'gvm list' to see the updated list".cyan());
    println!();
    Ok(())
}

pub fn execute_download(settings: &Settings, version: Option<String>) -> Result<()> {
    let _lock = StateLock::acquire(&settings.config_dir)?;
    let store = settings.store();
    let mut catalog = store.load()?;
    let requested = match version {
        Some(version) => version.trim().to_string(),
        None => match catalog.latest_stable() {
            Some(remote) => normalize(&remote.version).to_string(),
            None => bail!("no stable version available. Run `gvm list update` first"),
        },
    };

    let cancel = install_interrupt_handler();
    let fetcher = HttpFetcher::new(cancel)?;
    let installer = FsInstaller;
    let manager = InstallManager::new(&store, &fetcher, &installer, settings.active_dir(&catalog));

    println!("{}", format!("Downloading {requested}").green());
    let mut bar = DownloadBar::new(&requested);
    let (record, fetched) = manager.download(&mut catalog, &requested, &mut |done, total| bar.update(done, total))?;
    bar.finish();

    if fetched {
        println!("{}", format!("✓ Downloaded {} to {}", record.version, record.tar_path.display()).green());
    } else {
        println!("{}", format!("Version {} is already downloaded", record.version).yellow());
    }
    Ok(())
}

pub fn execute_use(settings: &Settings, version: &str) -> Result<()> {
    validate_version(version)?;
    let _lock = StateLock::acquire(&settings.config_dir)?;
    let store = settings.store();
    let mut catalog = store.load()?;

    let cancel = install_interrupt_handler();
    let fetcher = HttpFetcher::new(cancel)?;
    let installer = FsInstaller;
    let active_dir = settings.active_dir(&catalog);
    let manager = InstallManager::new(&store, &fetcher, &installer, &active_dir);

    if catalog.find_downloaded(version).is_none() {
        println!("{}", format!("Version {version} not downloaded yet. Downloading now...").yellow());
    } else {
        println!("{}", format!("Version {version} is already downloaded").green());
    }
    let mut bar = DownloadBar::new(version);
    let activation = manager.activate(&mut catalog, version, &mut |done, total| bar.update(done, total))?;
    bar.finish();

    println!(
        "{}",
        format!("Now using go version {}. Run `go version` to confirm", activation.record.version).green()
    );
    let bin_dir = active_bin_dir(&active_dir);
    if !is_on_path(&bin_dir) {
        let script = settings.env_script_path();
        if !script.exists() {
            write_env_script(&script, &active_dir)?;
        }
        println!("{}", format!("{} is not on your PATH. Add this to your shell profile:", bin_dir.display()).yellow());
        println!("  . \"{}\"", script.display());
    }
    Ok(())
}

fn print_version_line(version: &str, current: Option<&str>, lts: Option<&str>, downloaded: bool) {
    let is_current = current.is_some_and(|current| normalize(current) == normalize(version));
    let is_lts = lts == Some(version);
    let is_rc = is_release_candidate(version);

    let mut line = version.to_string();
    if is_lts {
        line.push_str(" LTS");
    }
    if downloaded {
        line.push_str(" ↓");
    }
    let bullet = if is_current { "  ▶ " } else { "  • " };
    let line = format!("{bullet}{line}");
    let line = if is_current {
        line.green().bold()
    } else if is_lts {
        line.cyan().bold()
    } else if is_rc {
        line.yellow()
    } else {
        line.magenta()
    };
    println!("{line}");
}

/// Cancels downloads on the first Ctrl-C and exits on the second.
fn install_interrupt_handler() -> CancelToken {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        token.cancel();
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    cancel
}

/// Byte progress bar, drawn only once a download actually reports progress.
struct DownloadBar {
    label: String,
    bar: Option<ProgressBar>,
}

impl DownloadBar {
    fn new(label: &str) -> Self {
        Self { label: label.to_string(), bar: None }
    }

    fn update(&mut self, done: u64, total: Option<u64>) {
        let label = &self.label;
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::no_length();
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
            bar.set_style(style);
            bar.set_message(label.clone());
            bar
        });
        if let Some(total) = total {
            bar.set_length(total);
        }
        bar.set_position(done);
    }

    fn finish(self) {
        if let Some(bar) = self.bar {
            let done = bar.position();
            bar.finish_and_clear();
            tracing::info!(size = %format_megabytes(done), "transfer finished");
        }
    }
}

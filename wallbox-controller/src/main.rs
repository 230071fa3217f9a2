use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use page_sets::{MusicLibrary, PageEntry, PageSet, PageSetDocument, PageSetStore, StaticLibrary};
use serde::Serialize;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use zone_control::memory::MemoryDirectory;
use zone_control::ZoneController;

use wallbox_controller::{
    init_logging_from_env, BenchRig, ClockScreen, ConsoleDisplay, ControllerConfig, Dispatcher,
    DisplayRenderer,
};

/// Seeburg wallbox controller
///
/// Decodes wallbox selections and plays the assigned music on a zone player.
#[derive(Parser, Debug)]
#[command(name = "wallbox")]
#[command(about = "Seeburg wallbox to zone-player controller")]
#[command(version)]
struct Cli {
    /// Page-set configuration (JSON)
    #[arg(short, long, default_value = "page_sets.json", global = true)]
    page_sets: PathBuf,

    /// Page-set tag active at startup (default: first configured)
    #[arg(long, global = true)]
    default_tag: Option<String>,

    /// Zones the unit-select button cycles through, comma separated
    #[arg(long, value_delimiter = ',', global = true)]
    zones: Vec<String>,

    /// Zone controlled at startup (default: first zone)
    #[arg(long, global = true)]
    default_zone: Option<String>,

    /// Volume change per clockwise encoder step
    #[arg(long, default_value = "4", global = true)]
    volume_up: u8,

    /// Volume change per counter-clockwise encoder step
    #[arg(long, default_value = "5", global = true)]
    volume_down: u8,

    /// Display columns
    #[arg(long, default_value = "20", global = true)]
    display_width: usize,

    /// Display lines
    #[arg(long, default_value = "4", global = true)]
    display_lines: usize,

    /// Seconds of inactivity before the idle screen
    #[arg(long, default_value = "30", global = true)]
    display_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Materialize every page set against a library snapshot and print the slot table
    Check {
        /// Music library snapshot (JSON)
        #[arg(short, long)]
        library: PathBuf,

        /// Print the slot tables as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the controller, reading a bench script from stdin or a file
    Run {
        /// Music library snapshot (JSON); empty library when omitted
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Bench script to run instead of stdin
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
}

impl Cli {
    /// Apply `WALLBOX_*` environment overrides
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("WALLBOX_PAGE_SETS") {
            self.page_sets = PathBuf::from(path);
        }

        if let Ok(tag) = std::env::var("WALLBOX_DEFAULT_TAG") {
            self.default_tag = Some(tag);
        }

        if let Ok(zones) = std::env::var("WALLBOX_ZONES") {
            self.zones = zones
                .split(',')
                .map(|zone| zone.trim().to_string())
                .filter(|zone| !zone.is_empty())
                .collect();
        }

        if let Ok(zone) = std::env::var("WALLBOX_DEFAULT_ZONE") {
            self.default_zone = Some(zone);
        }

        if let Ok(step) = std::env::var("WALLBOX_VOLUME_UP") {
            self.volume_up = step
                .parse()
                .context("Invalid WALLBOX_VOLUME_UP environment variable")?;
        }

        if let Ok(step) = std::env::var("WALLBOX_VOLUME_DOWN") {
            self.volume_down = step
                .parse()
                .context("Invalid WALLBOX_VOLUME_DOWN environment variable")?;
        }

        if let Ok(width) = std::env::var("WALLBOX_DISPLAY_WIDTH") {
            self.display_width = width
                .parse()
                .context("Invalid WALLBOX_DISPLAY_WIDTH environment variable")?;
        }

        if let Ok(lines) = std::env::var("WALLBOX_DISPLAY_LINES") {
            self.display_lines = lines
                .parse()
                .context("Invalid WALLBOX_DISPLAY_LINES environment variable")?;
        }

        if let Ok(timeout) = std::env::var("WALLBOX_DISPLAY_TIMEOUT") {
            self.display_timeout = timeout
                .parse()
                .context("Invalid WALLBOX_DISPLAY_TIMEOUT environment variable")?;
        }

        Ok(())
    }

    fn controller_config(&self) -> Result<ControllerConfig> {
        let mut config = ControllerConfig::new()
            .with_page_sets_path(&self.page_sets)
            .with_volume_steps(self.volume_up, self.volume_down)
            .with_display(self.display_width, self.display_lines)
            .with_display_timeout(Duration::from_secs(self.display_timeout));

        if !self.zones.is_empty() {
            config = config.with_zones(self.zones.iter().cloned());
        }
        if let Some(zone) = &self.default_zone {
            config = config.with_default_zone(zone.clone());
        }
        if let Some(tag) = &self.default_tag {
            config = config.with_default_tag(tag.clone());
        }

        config.validate().context("Invalid controller configuration")?;
        Ok(config)
    }
}

fn load_library(path: Option<&Path>) -> Result<StaticLibrary> {
    let Some(path) = path else {
        warn!("No library snapshot given, favorites and playlists will be empty");
        return Ok(StaticLibrary::new());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read library snapshot {}", path.display()))?;
    StaticLibrary::from_json(&json)
        .with_context(|| format!("Failed to parse library snapshot {}", path.display()))
}

/// Slot table of one page set, as printed by `check --json`
#[derive(Serialize)]
struct SlotTable<'a> {
    tag: &'a str,
    name: &'a str,
    filled: usize,
    entries: Vec<&'a PageEntry>,
}

impl<'a> SlotTable<'a> {
    fn new(page_set: &'a PageSet) -> Self {
        Self {
            tag: page_set.id(),
            name: page_set.name(),
            filled: page_set.filled(),
            entries: page_set
                .entries()
                .iter()
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }

    fn print(&self) {
        println!(
            "{} '{}': {} of {} slots filled",
            self.tag,
            self.name,
            self.filled,
            page_sets::SLOTS
        );
        for entry in &self.entries {
            println!(
                "  {:>3}  {:<14} {} / {}",
                entry.label,
                entry.action.kind(),
                entry.title,
                entry.artist
            );
        }
    }
}

/// Materialize every configured page set and print its slot table
async fn check(config: &ControllerConfig, library: &Path, json: bool) -> Result<()> {
    let document = PageSetDocument::from_path(&config.page_sets_path).with_context(|| {
        format!(
            "Failed to load page sets from {}",
            config.page_sets_path.display()
        )
    })?;
    document.validate().context("Invalid page-set configuration")?;
    let library = load_library(Some(library))?;

    let mut materialized = Vec::with_capacity(document.len());
    for (tag, definition) in document.iter() {
        let page_set = PageSet::materialize(tag, definition, &library as &dyn MusicLibrary)
            .await
            .with_context(|| format!("Failed to materialize page set {}", tag))?;
        materialized.push(page_set);
    }

    let tables: Vec<SlotTable<'_>> = materialized.iter().map(SlotTable::new).collect();
    if json {
        let report = serde_json::to_string_pretty(&tables).context("Failed to encode report")?;
        println!("{}", report);
    } else {
        for table in &tables {
            table.print();
        }
        println!("{} page sets OK", tables.len());
    }
    Ok(())
}

/// Run the controller with simulated peripherals until the script ends or Ctrl-C
async fn run(config: ControllerConfig, library: Option<&Path>, script: Option<&Path>) -> Result<()> {
    let document = PageSetDocument::from_path(&config.page_sets_path).with_context(|| {
        format!(
            "Failed to load page sets from {}",
            config.page_sets_path.display()
        )
    })?;
    let library: Arc<dyn MusicLibrary> = Arc::new(load_library(library)?);
    let store = PageSetStore::open(document, library, config.default_tag.as_deref())
        .await
        .context("No loadable page set to start with")?;

    let directory = Arc::new(MemoryDirectory::with_names(config.zones.iter().cloned()));
    let zones = ZoneController::connect(directory, &config.default_zone, config.operation_timeout)
        .await
        .with_context(|| format!("Failed to connect to zone '{}'", config.default_zone))?;

    let display = Arc::new(ConsoleDisplay::new(config.display_width, config.display_lines));
    let renderer = Arc::new(DisplayRenderer::new(display, config.display_timeout));

    let (dispatcher, handle) = Dispatcher::new(
        &config,
        Arc::new(store),
        Arc::new(zones),
        renderer,
        Box::new(ClockScreen),
    );
    let dispatcher_task = tokio::spawn(dispatcher.run());
    let mut rig = BenchRig::start(&config, handle.clone());

    let script_result = tokio::select! {
        result = run_script(&mut rig, script) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };

    rig.finish().await;
    handle.shutdown().await;
    dispatcher_task.await.context("Dispatcher task panicked")?;
    script_result
}

async fn run_script(rig: &mut BenchRig, script: Option<&Path>) -> Result<()> {
    let executed = match script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open bench script {}", path.display()))?;
            rig.run_script(BufReader::new(file)).await
        }
        None => rig.run_script(BufReader::new(tokio::io::stdin())).await,
    }
    .context("Failed to read bench script")?;

    info!("Ran {} bench commands", executed);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.apply_env()?;
    init_logging_from_env().context("Failed to initialize logging")?;

    let config = cli.controller_config()?;

    let result = match &cli.command {
        Command::Check { library, json } => check(&config, library, *json).await,
        Command::Run { library, script } => {
            run(config, library.as_deref(), script.as_deref()).await
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

// build-sleuth-cli/src/main.rs
// ============================================================================
// Module: Build Sleuth CLI Entry Point
// Description: Command line driver for checksum-to-build resolution.
// Purpose: Wire configuration, catalogs, cache, and resolver together.
// Dependencies: build-sleuth-{core,cache,catalog,config}, clap, tracing-subscriber
// ============================================================================

//! ## Overview
//! The CLI consumes a checksum map produced by the external distribution
//! analyzer (`checksums-md5.json`), resolves every entry against the
//! configured build systems, and writes the resulting output map to
//! `builds.json`. An existing `builds.json` is reused rather than re-resolved
//! so interrupted audits can pick up where they left off.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use build_sleuth_cache::FileResolverCache;
use build_sleuth_catalog::KojiHubCatalog;
use build_sleuth_catalog::KojiHubConfig;
use build_sleuth_catalog::PncRestCatalog;
use build_sleuth_catalog::PncRestConfig;
use build_sleuth_config::ConfigError;
use build_sleuth_config::SleuthConfig;
use build_sleuth_core::AnalysisContext;
use build_sleuth_core::BUILDS_FILENAME;
use build_sleuth_core::BuildResolver;
use build_sleuth_core::CacheError;
use build_sleuth_core::CatalogError;
use build_sleuth_core::Checksum;
use build_sleuth_core::ChecksumType;
use build_sleuth_core::ResolveError;
use build_sleuth_core::builds_from_json;
use build_sleuth_core::builds_to_json;
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use url::Url;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Resolve the provenance of distribution content against build systems.
#[derive(Parser, Debug)]
#[command(name = "build-sleuth", version, about)]
struct Cli {
    /// Checksum map produced by the distribution analyzer.
    checksum_file: PathBuf,
    /// Configuration file to use.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
    /// Directory receiving output files.
    #[arg(short, long)]
    output_directory: Option<PathBuf>,
    /// Directory holding the persistent cache maps.
    #[arg(long)]
    cache_directory: Option<PathBuf>,
    /// Koji hub URL override.
    #[arg(long)]
    koji_hub_url: Option<String>,
    /// PNC URL override.
    #[arg(long)]
    pnc_url: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Top-level CLI errors.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Resolution failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Catalog construction failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// File I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed URL on the command line.
    #[error("malformed url for {key}: {value}")]
    MalformedUrl {
        /// The offending option.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("build-sleuth: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber.
fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Runs the resolution pipeline.
fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    let output_dir = &config.output_dir;
    fs::create_dir_all(output_dir)?;

    let builds_path = output_dir.join(BUILDS_FILENAME);
    if builds_path.exists() {
        info!(path = %builds_path.display(), "loading builds from existing file");
        let builds = builds_from_json(&fs::read_to_string(&builds_path)?)?;
        info!(builds = builds.len().saturating_sub(1), "builds previously resolved");
        return Ok(());
    }

    let checksums = load_checksum_file(&cli.checksum_file)?;
    if checksums.is_empty() {
        warn!(
            path = %cli.checksum_file.display(),
            "the list of checksums is empty; remove the checksum cache and retry if unexpected"
        );
    }

    let koji_url = parse_url("koji_hub_url", config.koji_hub_url.as_deref().unwrap_or_default())?;
    let mut koji_config = KojiHubConfig::new(koji_url);
    koji_config.multicall_size = config.koji_multicall_size;
    let koji = KojiHubCatalog::new(koji_config)?;

    let pnc = if config.pnc_enabled() {
        let pnc_url = parse_url("pnc_url", config.pnc_url.as_deref().unwrap_or_default())?;
        Some(PncRestCatalog::new(PncRestConfig::new(pnc_url))?)
    } else {
        None
    };

    let cache = match &config.cache_dir {
        Some(directory) => {
            Some(FileResolverCache::open(directory, &config.checksum_types)?)
        }
        None => None,
    };

    let analysis = analysis_from_checksums(&checksums);

    let mut resolver = BuildResolver::new(&koji, config.resolver_config());
    if let Some(pnc) = &pnc {
        resolver = resolver.with_pnc(pnc);
    }
    if let Some(cache) = &cache {
        resolver = resolver.with_cache(cache);
    }
    resolver = resolver.with_analysis(analysis);

    let (sender, receiver) = crossbeam_channel::bounded::<Checksum>(1024);
    let producer = thread::spawn(move || {
        for (value, filenames) in checksums {
            for filename in filenames {
                let checksum = Checksum::new(ChecksumType::Md5, value.clone(), filename);
                if sender.send(checksum).is_err() {
                    return;
                }
            }
        }
    });

    let outcome = resolver.resolve_queue(&receiver);
    let _ = producer.join();
    outcome?;

    let result = resolver.into_result();

    let json = builds_to_json(result.builds_map())?;
    fs::write(&builds_path, json)?;
    info!(path = %builds_path.display(), "wrote builds file");

    if let Some(cache) = &cache {
        cache.flush()?;
    }

    info!(
        found = result.builds_found().len(),
        not_found = result.not_found_checksums().len(),
        "resolution finished"
    );

    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration and applies command line overrides.
///
/// When no configuration file exists yet, the effective configuration is
/// written back so the next run starts from the same settings.
fn load_config(cli: &Cli) -> Result<SleuthConfig, CliError> {
    let mut config = SleuthConfig::load(cli.config.as_deref())?;

    if let Some(output_directory) = &cli.output_directory {
        config.output_dir = output_directory.clone();
    }
    if let Some(cache_directory) = &cli.cache_directory {
        config.cache_dir = Some(cache_directory.clone());
    }
    if let Some(koji_hub_url) = &cli.koji_hub_url {
        config.koji_hub_url = Some(koji_hub_url.clone());
    }
    if let Some(pnc_url) = &cli.pnc_url {
        config.pnc_url = Some(pnc_url.clone());
        if !config.build_systems.contains(&build_sleuth_core::BuildSystem::Pnc) {
            config.build_systems.push(build_sleuth_core::BuildSystem::Pnc);
        }
    }

    config.validate()?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(build_sleuth_config::DEFAULT_CONFIG_NAME));
    if !config_path.exists() {
        if let Some(parent) = config_path.parent().filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, config.to_toml_string()?)?;
        info!(path = %config_path.display(), "wrote configuration file");
    }

    Ok(config)
}

/// Loads the analyzer checksum map: hex digest to filenames.
fn load_checksum_file(
    path: &std::path::Path,
) -> Result<BTreeMap<String, BTreeSet<String>>, CliError> {
    info!(path = %path.display(), "loading checksums from file");
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Builds analyzer context from the checksum map.
fn analysis_from_checksums(
    checksums: &BTreeMap<String, BTreeSet<String>>,
) -> AnalysisContext {
    let mut files: BTreeMap<String, BTreeSet<Checksum>> = BTreeMap::new();

    for (value, filenames) in checksums {
        for filename in filenames {
            files
                .entry(filename.clone())
                .or_default()
                .insert(Checksum::new(ChecksumType::Md5, value.clone(), filename.clone()));
        }
    }

    AnalysisContext {
        files,
        files_in_error: Vec::new(),
    }
}

/// Parses a catalog URL from configuration or the command line.
fn parse_url(key: &'static str, value: &str) -> Result<Url, CliError> {
    Url::parse(value).map_err(|_| CliError::MalformedUrl {
        key,
        value: value.to_string(),
    })
}

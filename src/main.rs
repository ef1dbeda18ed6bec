//! Link-Resolver main entry point
//!
//! A command-line harness around the resolution engine: resolve one page
//! reference and print its ranked links.

use anyhow::Context;
use clap::Parser;
use link_resolver::config::{load_config_with_hash, ResolverConfig, StrategyKind};
use link_resolver::{LinkMode, RankedLinks, Resolver, SourceReference};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Link-Resolver: ranked media links from file-hosting pages
///
/// Dispatches the URL to the matching host profile from the configuration,
/// follows redirects, decodes payloads and delegations, and prints every
/// link found, best first.
#[derive(Parser, Debug)]
#[command(name = "link-resolver")]
#[command(version = "1.0.0")]
#[command(about = "Resolve media page references into ranked links", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Page URL to resolve
    #[arg(value_name = "URL", required_unless_present = "check")]
    url: Option<String>,

    /// Referer to send with the first request
    #[arg(long, value_name = "URL")]
    referer: Option<String>,

    /// Resolve through a specific host profile instead of matching the URL
    #[arg(long, value_name = "NAME")]
    host: Option<String>,

    /// Also return HLS/DASH manifests
    #[arg(long)]
    allow_streaming: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the host table without resolving anything
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.check {
        handle_check(&config);
        return Ok(());
    }

    let Some(url) = cli.url.clone() else {
        anyhow::bail!("a URL is required unless --check is given");
    };

    let mode = if cli.allow_streaming {
        LinkMode::AllowStreaming
    } else {
        LinkMode::from_download_only(config.resolver.download_only)
    };

    let mut reference = SourceReference::new(url);
    if let Some(referer) = cli.referer {
        reference = reference.with_referer(referer);
    }
    if let Some(host) = cli.host {
        reference = reference.with_host_hint(host);
    }

    let resolver = Resolver::from_config(config).context("failed to build resolver")?;
    let ranked = resolver.collect_ranked(reference, mode).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        print_table(&ranked);
    }

    if ranked.links.is_empty() {
        tracing::warn!("No links found");
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("link_resolver=warn,error"),
            1 => EnvFilter::new("link_resolver=info,warn"),
            2 => EnvFilter::new("link_resolver=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles --check: prints the validated configuration
fn handle_check(config: &ResolverConfig) {
    println!("=== Link-Resolver Configuration ===\n");

    println!("Engine:");
    println!("  Max hops: {}", config.resolver.max_hops);
    println!("  Per-hop timeout: {}ms", config.resolver.per_hop_timeout_ms);
    println!("  Branch timeout: {}ms", config.resolver.overall_timeout_ms);
    println!(
        "  Concurrent branches: {}",
        config.resolver.max_concurrent_branches
    );
    println!(
        "  Max delegation depth: {}",
        config.resolver.max_delegation_depth
    );
    println!("  Download only: {}", config.resolver.download_only);

    println!("\nAliases:");
    match &config.aliases.remote_url {
        Some(remote) => println!("  Remote table: {} ({}ms)", remote, config.aliases.timeout_ms),
        None => println!("  Remote table: none"),
    }
    for (key, base) in &config.aliases.static_entries {
        println!("  - {} -> {}", key, base);
    }

    println!("\nHosts ({}):", config.hosts.len());
    for host in &config.hosts {
        println!("  - {} [{}]", host.name, host.strategy.name());
        let matchers: Vec<&str> = host
            .domains
            .iter()
            .chain(&host.fragments)
            .chain(&host.path_markers)
            .map(String::as_str)
            .chain(host.pattern.as_deref())
            .collect();
        println!("    match: {}", matchers.join(", "));
        if let Some(alias) = &host.alias {
            println!("    alias: {}", alias);
        }
        if let StrategyKind::Cipher(spec) = &host.strategy {
            let chain: Vec<&str> = spec.decode.iter().map(|op| op.name()).collect();
            println!("    decode: {}", chain.join(" -> "));
        }
    }

    println!("\n✓ Configuration is valid");
}

fn print_table(ranked: &RankedLinks) {
    for (rank, scored) in ranked.links.iter().enumerate() {
        let link = &scored.link;
        println!(
            "{:>3}. [{:>6}] {:<14} {}",
            rank + 1,
            scored.score,
            link.source_tag,
            link.url
        );
        if !link.label.is_empty() {
            println!("       label: {}", link.label);
        }
        for (name, value) in &link.headers {
            println!("       header: {}: {}", name, value);
        }
    }

    if !ranked.subtitles.is_empty() {
        println!("\nSubtitles:");
        for track in &ranked.subtitles {
            println!("  - {}: {}", track.language, track.url);
        }
    }
}

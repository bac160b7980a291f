//! Lexistore CLI
//!
//! Command-line access to a tree-backed store:
//! - Expanding locale master documents into node files (`generate`)
//! - Looking up nodes (with pseudo-record fallback) and rules
//! - Editing node flags and rule bonds in place

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use lexistore_model::{Bond, Chain, NodeRecord};
use lexistore_storage::{default_node_cache, default_rule_cache, StoreConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lexistore")]
#[command(author, version, about = "Lexistore: locale-partitioned lexicon and grammar store")]
struct Cli {
    /// Root storage directory (overrides the config file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON config file (`root_dir`, `default_locale`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Locale to use (defaults to the configured default locale)
    #[arg(short, long, global = true, default_value = "")]
    locale: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand every locale's master document into node files and verify grammars.
    Generate,

    /// Print a node as JSON, falling back to the locale's pseudo record.
    Node {
        /// Symbol to look up
        symbol: String,
        /// Fail instead of using the pseudo record
        #[arg(long)]
        exact: bool,
    },

    /// Resolve a rule type path and print the chain in wire format.
    Rule {
        /// Type path (e.g. `NVsb`)
        kind: String,
    },

    /// Expand a morphological suffix.
    Suffix { suffix: String },

    /// Add a flag to a node and write it back.
    Flag {
        symbol: String,
        key: String,
        value: String,
    },

    /// Add a bond (`key=value` pairs) to a rule and write it back.
    Bind {
        /// Type path of the rule
        kind: String,
        /// Bond attributes, e.g. `with=N side=left`
        #[arg(required = true)]
        attributes: Vec<String>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root_dir = root.clone();
    }
    Ok(config)
}

fn parse_bond(attributes: &[String]) -> Result<Bond> {
    let mut bond = Bond::new();
    for pair in attributes {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got `{pair}`"))?;
        if key.is_empty() {
            return Err(anyhow!("empty attribute name in `{pair}`"));
        }
        bond.set_attribute(key, value);
    }
    Ok(bond)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(&cli)?;
    let locale = config.effective_locale(&cli.locale).to_string();

    match &cli.command {
        Commands::Generate => cmd_generate(&config),
        Commands::Node { symbol, exact } => cmd_node(&config, &locale, symbol, *exact),
        Commands::Rule { kind } => cmd_rule(&config, &locale, kind),
        Commands::Suffix { suffix } => cmd_suffix(&config, &locale, suffix),
        Commands::Flag { symbol, key, value } => cmd_flag(&config, &locale, symbol, key, value),
        Commands::Bind { kind, attributes } => cmd_bind(&config, &locale, kind, attributes),
    }
}

fn cmd_generate(config: &StoreConfig) -> Result<()> {
    let mut summaries = default_node_cache(config.clone()).generate();
    summaries.extend(default_rule_cache(config.clone()).generate());

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    if summaries.iter().any(|s| !s.failed_locales.is_empty()) {
        return Err(anyhow!("generation failed for some locales"));
    }
    Ok(())
}

fn cmd_node(config: &StoreConfig, locale: &str, symbol: &str, exact: bool) -> Result<()> {
    let cache = default_node_cache(config.clone());
    let mut record = NodeRecord::new(symbol, locale);

    if !cache.read(&mut record) {
        if exact || !cache.pseudo(&mut record) {
            return Err(anyhow!("no node for `{symbol}` in locale `{locale}`"));
        }
        tracing::info!(symbol, "using pseudo record");
    }

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_rule(config: &StoreConfig, locale: &str, kind: &str) -> Result<()> {
    let cache = default_rule_cache(config.clone());
    let mut chain = Chain::new(locale, kind);
    if !cache.read(&mut chain) {
        return Err(anyhow!("no rule matches `{kind}` in locale `{locale}`"));
    }
    println!("{}", chain.to_wire()?);
    Ok(())
}

fn cmd_suffix(config: &StoreConfig, locale: &str, suffix: &str) -> Result<()> {
    let full = default_node_cache(config.clone()).obtain_full_suffix(locale, suffix);
    if full.is_empty() {
        return Err(anyhow!("no mapping for suffix `{suffix}` in locale `{locale}`"));
    }
    println!("{full}");
    Ok(())
}

fn cmd_flag(config: &StoreConfig, locale: &str, symbol: &str, key: &str, value: &str) -> Result<()> {
    let cache = default_node_cache(config.clone());
    let mut record = NodeRecord::new(symbol, locale);
    cache.read(&mut record);
    record.flags_mut().insert(key, value);

    if !cache.write(&record) {
        return Err(anyhow!(
            "failed to write node `{symbol}` under {}",
            config.root_dir.display()
        ));
    }
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_bind(config: &StoreConfig, locale: &str, kind: &str, attributes: &[String]) -> Result<()> {
    let bond = parse_bond(attributes)?;
    let cache = default_rule_cache(config.clone());
    let mut chain = Chain::new(locale, kind);
    cache.read(&mut chain);
    chain.push_bond(bond);

    if !cache.write(&chain) {
        return Err(anyhow!(
            "failed to write rule `{kind}` under {}",
            config.root_dir.display()
        ));
    }
    println!("{}", chain.to_wire()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bond_pairs() {
        let bond = parse_bond(&["with=N".to_string(), "side=left".to_string()]).unwrap();
        assert_eq!(bond.with(), Some("N"));
        assert_eq!(bond.attribute("side"), Some("left"));
    }

    #[test]
    fn rejects_malformed_bond_pairs() {
        assert!(parse_bond(&["with".to_string()]).is_err());
        assert!(parse_bond(&["=N".to_string()]).is_err());
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lexistore", "rule", "NVsb", "--locale", "de", "-vv"]).unwrap();
        assert_eq!(cli.locale, "de");
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Rule { ref kind } if kind == "NVsb"));
    }
}

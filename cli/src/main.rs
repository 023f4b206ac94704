//! chaincall CLI — inspect endpoints and call contracts from the terminal.
//!
//! Usage:
//! ```bash
//! # List fallback endpoints
//! chaincall endpoints --chain 1
//!
//! # Find the first live endpoint for a chain
//! chaincall probe --chain 137
//!
//! # Call a view method
//! chaincall read --chain 1 --address 0xA0b8...eB48 --abi erc20.json \
//!     --method balanceOf --args '["0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"]'
//!
//! # Explain revert data
//! chaincall decode --abi vault.json --data 0x08c379a0...
//! ```

mod logging;

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use anyhow::{bail, Context};
use serde_json::Value;

use chaincall_core::{ChainId, EndpointConfig, EndpointPool, ProviderCache};
use chaincall_evm::{ContractClient, ContractDescriptor, RevertDecoder};
use chaincall_http::HttpConnector;

use logging::{init_tracing, LogConfig};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    init_tracing(&log_config(&args[2..]));
    tracing::debug!(command = %args[1], "starting");

    let result = match args[1].as_str() {
        "endpoints" => cmd_endpoints(&args[2..]),
        "probe" => cmd_probe(&args[2..]).await,
        "read" => cmd_read(&args[2..]).await,
        "decode" => cmd_decode(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("chaincall {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("chaincall {}", env!("CARGO_PKG_VERSION"));
    println!("Inspect RPC endpoints and call smart contracts\n");
    println!("USAGE:");
    println!("    chaincall <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    endpoints  List fallback endpoints per chain");
    println!("    probe      Connect to the first live endpoint of a chain");
    println!("    read       Call a view method and print the reply as JSON");
    println!("    decode     Decode revert data against an ABI");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --chain <ID>       Chain id (endpoints: optional filter)");
    println!("    --config <FILE>    Endpoint configuration JSON (default: public endpoints)");
    println!("    --address <ADDR>   Contract address                 [read]");
    println!("    --abi <FILE>       Contract ABI JSON                [read, decode]");
    println!("    --method <NAME>    Method name or full signature    [read]");
    println!("    --args <JSON>      Arguments as a JSON array        [read]");
    println!("    --data <HEX>       Revert data                      [decode]");
    println!("    --log-level <LVL>  trace | debug | info | warn | error");
    println!("    --log-component <CRATE=LVL>  Per-crate level, repeatable");
    println!("    --log-json         Structured JSON logs on stderr");
}

fn log_config(args: &[String]) -> LogConfig {
    let mut config = LogConfig::default();
    if let Some(level) = parse_flag(args, "--log-level") {
        config.level = level;
    }
    for pair in args.windows(2).filter(|w| w[0] == "--log-component") {
        match pair[1].split_once('=') {
            Some((component, level)) => {
                config.components.insert(component.to_string(), level.to_string());
            }
            None => eprintln!("ignoring --log-component {}: expected crate=level", pair[1]),
        }
    }
    config.json = args.iter().any(|a| a == "--log-json");
    config
}

fn endpoint_config(args: &[String]) -> anyhow::Result<EndpointConfig> {
    match parse_flag(args, "--config") {
        Some(path) => EndpointConfig::from_file(&path)
            .with_context(|| format!("cannot load endpoint config {path}")),
        None => Ok(EndpointConfig {
            include_public_defaults: true,
            ..EndpointConfig::default()
        }),
    }
}

fn provider_cache(config: &EndpointConfig) -> anyhow::Result<Arc<ProviderCache>> {
    let connector = HttpConnector::from_endpoint_config(config)?;
    Ok(Arc::new(ProviderCache::new(
        EndpointPool::from_config(config),
        Arc::new(connector),
    )))
}

fn chain_flag(args: &[String]) -> anyhow::Result<Option<ChainId>> {
    parse_flag(args, "--chain")
        .map(|raw| raw.parse().with_context(|| format!("invalid chain id {raw}")))
        .transpose()
}

fn required(args: &[String], flag: &str) -> anyhow::Result<String> {
    parse_flag(args, flag).with_context(|| format!("{flag} is required"))
}

fn load_abi(path: &str) -> anyhow::Result<JsonAbi> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("cannot read ABI {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid ABI JSON in {path}"))
}

fn cmd_endpoints(args: &[String]) -> anyhow::Result<()> {
    let pool = EndpointPool::from_config(&endpoint_config(args)?);
    let chains = match chain_flag(args)? {
        Some(chain) => vec![chain],
        None => pool.chains(),
    };

    for chain in chains {
        let endpoints = pool.get_endpoints(chain);
        println!("chain {chain}:");
        if endpoints.is_empty() {
            println!("  (no endpoints configured)");
        }
        for e in endpoints {
            println!("  {}. {}", e.priority + 1, e.url);
        }
    }
    Ok(())
}

async fn cmd_probe(args: &[String]) -> anyhow::Result<()> {
    let chain = chain_flag(args)?.context("--chain is required")?;
    let cache = provider_cache(&endpoint_config(args)?)?;

    let start = Instant::now();
    let transport = cache.get_connection(chain).await?;
    let block = transport.block_number().await?;

    println!("  Chain:        {chain}");
    println!("  Endpoint:     {}", transport.url());
    println!("  Block number: {block}");
    println!("  Latency:      {}ms", start.elapsed().as_millis());
    Ok(())
}

async fn cmd_read(args: &[String]) -> anyhow::Result<()> {
    let chain = chain_flag(args)?.context("--chain is required")?;
    let address: Address = required(args, "--address")?
        .parse()
        .context("invalid --address")?;
    let abi = load_abi(&required(args, "--abi")?)?;
    let method = required(args, "--method")?;
    let call_args = match parse_flag(args, "--args") {
        Some(raw) => match serde_json::from_str::<Value>(&raw).context("--args is not JSON")? {
            Value::Array(items) => items,
            other => bail!("--args must be a JSON array, got {other}"),
        },
        None => vec![],
    };

    let cache = provider_cache(&endpoint_config(args)?)?;
    let client = ContractClient::new(ContractDescriptor::new(address, abi, chain), cache, None);
    let reply = client.read(&method, &call_args).await?;

    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn cmd_decode(args: &[String]) -> anyhow::Result<()> {
    let data = required(args, "--data")?;
    let decoder = match parse_flag(args, "--abi") {
        Some(path) => RevertDecoder::from_abi(&load_abi(&path)?),
        None => RevertDecoder::standard(),
    };

    let Some(decoded) = decoder.decode_hex(&data) else {
        bail!("revert data matches no known error");
    };
    println!("  Error:  {}", decoded.name);
    println!("  Reason: {}", decoded.reason());
    for (name, value) in &decoded.args {
        let label = if name.is_empty() { "_" } else { name.as_str() };
        println!("  {label}: {value}");
    }
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "biblio",
    about = "BiblioChain: a publication registry on a permissioned ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Gateway configuration file (TOML)
    #[arg(short, long, global = true, env = "BIBLIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Organization the client identity belongs to
    #[arg(long, global = true, env = "MSP_ID")]
    pub msp_id: Option<String>,

    /// Channel the contract is deployed on
    #[arg(long, global = true, env = "CHANNEL_NAME")]
    pub channel: Option<String>,

    /// Name of the deployed contract
    #[arg(long, global = true, env = "CHAINCODE_NAME")]
    pub chaincode: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the sample publication flow against an in-process network
    Demo(DemoArgs),
    /// Print the effective gateway configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct DemoArgs {
    /// Seconds to wait for in-flight work when closing the connection
    #[arg(long, default_value = "5")]
    pub grace_secs: u64,
}

#[derive(Args)]
pub struct ConfigArgs {}

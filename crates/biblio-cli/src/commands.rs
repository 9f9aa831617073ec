use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use biblio_crypto::{Identity, SigningKey};
use biblio_fabric::{FabricConfig, InProcessNetwork};
use biblio_gateway::client::decode;
use biblio_gateway::{Gateway, GatewayConfig, GatewayError, PublicationClient};
use biblio_ledger::PublicationContract;
use biblio_protocol::GatewayConnection;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = effective_config(&cli)?;
    match cli.command {
        Command::Demo(args) => cmd_demo(config, args).await,
        Command::Config(_) => cmd_config(&config),
    }
}

/// Defaults, then the config file, then the environment, then flags.
pub fn effective_config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    effective_config_with(cli, |key| std::env::var(key).ok())
}

fn effective_config_with<F: Fn(&str) -> Option<String>>(
    cli: &Cli,
    lookup: F,
) -> anyhow::Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::default(),
    };
    config.apply_env_with(lookup);
    let flags = [
        (&mut config.msp_id, &cli.msp_id),
        (&mut config.channel_name, &cli.channel),
        (&mut config.chaincode_name, &cli.chaincode),
    ];
    for (field, flag) in flags {
        if let Some(value) = flag.as_ref().filter(|v| !v.trim().is_empty()) {
            *field = value.clone();
        }
    }
    config.validate()?;
    Ok(config)
}

fn cmd_config(config: &GatewayConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Network layout serving `config`: the sample's two organizations, plus
/// the client's own if it is not one of them.
fn fabric_config(config: &GatewayConfig) -> FabricConfig {
    let mut fabric = FabricConfig {
        channel: config.channel_name.clone(),
        chaincode: config.chaincode_name.clone(),
        ..FabricConfig::default()
    };
    if !fabric.organizations.contains(&config.msp_id) {
        fabric.organizations.push(config.msp_id.clone());
    }
    fabric
}

async fn cmd_demo(config: GatewayConfig, args: DemoArgs) -> anyhow::Result<()> {
    let network = InProcessNetwork::start(fabric_config(&config), PublicationContract::new())?;
    let connection: Arc<dyn GatewayConnection> = network;

    let key = SigningKey::generate();
    let identity = Identity::from_verifying_key(config.msp_id.clone(), &key.verifying_key());
    let gateway = Gateway::builder()
        .identity(identity)
        .signer(key)
        .config(&config)
        .connection(connection)
        .connect()?;
    info!(msp_id = %config.msp_id, channel = %config.channel_name, "gateway connected");

    let client = PublicationClient::new(
        gateway
            .network(&config.channel_name)
            .contract(&config.chaincode_name),
    );
    let outcome = run_demo(&client).await;
    let closed = gateway.close(Duration::from_secs(args.grace_secs)).await;
    outcome?;
    closed?;
    Ok(())
}

async fn run_demo(client: &PublicationClient) -> anyhow::Result<()> {
    heading("Init Ledger");
    client.init_ledger().await.context("initLedger failed")?;
    println!("{} Transaction committed successfully", "✓".green().bold());

    heading("Get All Publications");
    let all = client.get_all().await.context("getAll failed")?;
    println!("Result: {}", pretty(&all)?);

    exists(client, "publication1").await;
    exists(client, "randomId").await;

    let id = "publication3";
    heading(&format!("Create Publication with Id '{id}'"));
    match client.create_publication(id, "Ethereum Whitepaper").await {
        Ok(_) => println!("{} Transaction committed successfully", "✓".green().bold()),
        Err(err) => report(&err),
    }
    exists(client, id).await;

    heading(&format!("Delete Publication with Id '{id}'"));
    match client.delete_publication(id).await {
        Ok(()) => println!("{} Transaction committed successfully", "✓".green().bold()),
        Err(err) => report(&err),
    }
    exists(client, id).await;

    heading(&format!("Get History for Publication '{id}'"));
    let history = client.get_history(id).await.context("getHistory failed")?;
    println!("Result: {}", pretty(&history)?);

    change_title_async(client, "publication1", "The DAO").await
}

async fn change_title_async(client: &PublicationClient, id: &str, title: &str) -> anyhow::Result<()> {
    heading("Change Publication Title Asynchronously");
    let submitted = client
        .change_title_async(id, title)
        .await
        .context("async title change failed")?;
    println!(
        "Submitted transaction {} to change title of Publication '{}' to '{}'",
        submitted.tx_id().short_hex().yellow(),
        id,
        title
    );
    println!("Waiting for transaction commit");

    let status = submitted.status().await?;
    if !status.is_successful() {
        anyhow::bail!(
            "transaction {} failed to commit with status code {} ({})",
            status.tx_id,
            status.code.code(),
            status.code.name()
        );
    }
    let record = decode(submitted.result())?;
    println!("Result: {}", pretty(&record)?);
    Ok(())
}

async fn exists(client: &PublicationClient, id: &str) {
    heading(&format!("Checking If Publication '{id}' Exists"));
    let found = client.exists_best_effort(id).await;
    let shown = if found { "true".green() } else { "false".red() };
    println!("result: {shown}");
}

fn report(err: &GatewayError) {
    println!("{} {}", "✗".red().bold(), err);
    for detail in err.details() {
        println!("  {detail}");
    }
    if let Some(tx_id) = err.tx_id() {
        println!("  Transaction ID: {}", tx_id.to_string().yellow());
    }
    if let Some(code) = err.code() {
        println!("  Status code: {} ({})", code.code(), code.name());
    }
}

fn heading(title: &str) {
    println!("\n{}", format!("------ {title} ------").bold());
}

fn pretty<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(channel: Option<&str>, config: Option<&str>) -> Cli {
        Cli {
            command: Command::Config(ConfigArgs {}),
            verbose: false,
            config: config.map(Into::into),
            msp_id: None,
            channel: channel.map(Into::into),
            chaincode: None,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn flags_override_defaults() {
        let config = effective_config_with(&cli(Some("library"), None), no_env).unwrap();
        assert_eq!(config.channel_name, "library");
        assert_eq!(config.chaincode_name, GatewayConfig::default().chaincode_name);
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "CHANNEL_NAME" => Some("from-env".to_string()),
            "CHAINCODE_NAME" => Some("catalog".to_string()),
            _ => None,
        };
        let config = effective_config_with(&cli(Some("library"), None), env).unwrap();
        assert_eq!(config.channel_name, "library");
        assert_eq!(config.chaincode_name, "catalog");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = cli(None, Some("/nonexistent/biblio.toml"));
        assert!(effective_config_with(&cli, no_env).is_err());
    }

    #[test]
    fn fabric_layout_includes_client_org() {
        let config = GatewayConfig {
            msp_id: "Org3MSP".into(),
            channel_name: "library".into(),
            ..GatewayConfig::default()
        };
        let fabric = fabric_config(&config);
        assert_eq!(fabric.channel, "library");
        assert_eq!(fabric.organizations, vec!["Org1MSP", "Org2MSP", "Org3MSP"]);
        fabric.validate().unwrap();

        let fabric = fabric_config(&GatewayConfig::default());
        assert_eq!(fabric.organizations.len(), 2);
    }

    #[tokio::test]
    async fn demo_runs_to_completion() {
        let args = DemoArgs { grace_secs: 1 };
        cmd_demo(GatewayConfig::default(), args).await.unwrap();
    }
}

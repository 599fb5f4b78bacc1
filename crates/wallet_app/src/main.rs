mod cli;
mod context;
mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};
use wallet_contracts::ContractParams;
use wallet_core::{WalletConfig, WalletError, WalletResult, logging};
use wallet_state::{SettingsAction, Store, WalletAction};

use cli::{Cli, Command, ContractsCommand, DeployArgs, SettingsArgs};
use context::AppContext;
use server::StaticServer;

const TOAST_TICK: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a wallet operation's result, or its user-facing message on failure.
fn emit<T: Serialize>(result: WalletResult<T>) -> Result<()> {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => bail!(e.user_message()),
    }
}

/// Echo WalletConnect pairing URIs as they show up in the store.
fn watch_pairing(store: &Store) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut shown: Option<String> = None;
        while rx.changed().await.is_ok() {
            let uri = rx.borrow_and_update().wallet.pairing_uri.clone();
            if uri.is_some() && uri != shown {
                if let Some(uri) = &uri {
                    eprintln!("Scan with your wallet to connect:\n{uri}");
                }
                shown = uri;
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn connect(ctx: &AppContext, cli: &Cli) -> Result<()> {
    let pairing = watch_pairing(ctx.store());
    let result = ctx.thunks.connect_wallet(cli.wallet.into()).await;
    pairing.abort();
    let connected = result.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    info!(address = %connected.address, "connected");
    Ok(())
}

async fn deploy(ctx: &AppContext, cli: &Cli, args: &DeployArgs) -> Result<()> {
    // `--verify` applies to this run only and is not persisted.
    if args.verify {
        ctx.store().dispatch(SettingsAction::SetAutoVerify(true));
    }
    // The owner is recorded when an account is available.
    if let Err(e) = connect(ctx, cli).await {
        info!("deploying without a connected account: {e}");
    }

    let mut params = ContractParams::new(args.contract_type.into(), &args.name, &args.symbol);
    params.decimals = args.decimals.clone().unwrap_or_default();
    params.total_supply = args.total_supply.clone().unwrap_or_default();
    params.base_uri = args.base_uri.clone().unwrap_or_default();
    emit(ctx.thunks.deploy_contract(params).await)
}

async fn contracts(ctx: &AppContext, command: &ContractsCommand) -> Result<()> {
    match command {
        ContractsCommand::List => emit(ctx.thunks.load_stored_contracts().await),
        ContractsCommand::Show { id } => {
            let storage = &ctx.thunks.services().contracts;
            let found = storage
                .get_contract_by_id(id)
                .or_else(|| storage.get_contract_by_address(id))
                .ok_or_else(|| WalletError::Validation(format!("Contract {id} not found")));
            emit(found)
        }
        ContractsCommand::Delete { id } => emit(ctx.thunks.delete_contract(id).await),
    }
}

fn settings(ctx: &AppContext, args: &SettingsArgs) -> Result<()> {
    let mut changes = Vec::new();
    if let Some(m) = args.gas_buffer {
        changes.push(SettingsAction::SetGasBufferMultiplier(m));
    }
    if let Some(id) = &args.default_network {
        changes.push(SettingsAction::SetDefaultNetwork(id.clone()));
    }
    if let Some(on) = args.auto_verify {
        changes.push(SettingsAction::SetAutoVerify(on));
    }
    if let Some(strategy) = args.deploy_strategy {
        changes.push(SettingsAction::SetDeployStrategy(strategy.into()));
    }
    for change in changes {
        ctx.thunks
            .update_settings(change)
            .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    }
    print_json(&ctx.store().select(|s| s.settings.clone()))
}

async fn serve(ctx: &AppContext, port: u16, dir: std::path::PathBuf) -> Result<()> {
    if !dir.join("index.html").exists() {
        bail!("{} does not contain index.html", dir.display());
    }
    let script = server::env_script(&ctx.config.get(), &ctx.networks);
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    println!("Serving {} at http://127.0.0.1:{port}", dir.display());

    let server = Arc::new(StaticServer::new(dir, script));
    tokio::select! {
        result = server.serve(listener) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::load()?;

    if let Some(id) = &cli.network {
        if ctx.networks.get(id).is_none() {
            bail!("Unknown network: {id}");
        }
        ctx.store().dispatch(WalletAction::SetNetwork(id.clone()));
    }
    let ticker = ctx.thunks.spawn_toast_ticker(TOAST_TICK);

    let result = match &cli.command {
        Command::Serve { port, dir } => serve(&ctx, *port, dir.clone()).await,
        Command::Networks => print_json(&ctx.networks.all()),
        Command::Balance => {
            connect(&ctx, &cli).await?;
            print_json(&ctx.store().select(|s| s.wallet.clone()))
        }
        Command::Send { to, amount } => {
            connect(&ctx, &cli).await?;
            emit(ctx.thunks.send_native(to, amount).await)
        }
        Command::SendToken { token, to, amount } => {
            connect(&ctx, &cli).await?;
            emit(ctx.thunks.send_erc20(token, to, amount).await)
        }
        Command::Mint {
            contract,
            to,
            token_uri,
        } => {
            connect(&ctx, &cli).await?;
            emit(ctx.thunks.mint_nft(contract, to, token_uri).await)
        }
        Command::Estimate { to, amount, token } => {
            connect(&ctx, &cli).await?;
            match token {
                Some(token) => emit(ctx.thunks.estimate_erc20_gas(token, to, amount).await),
                None => emit(ctx.thunks.estimate_native_gas(to, amount).await),
            }
        }
        Command::TokenInfo { token } => {
            connect(&ctx, &cli).await?;
            emit(ctx.thunks.fetch_token_info(token).await)
        }
        Command::Status { hash } => {
            connect(&ctx, &cli).await?;
            emit(ctx.thunks.refresh_status(hash).await)
        }
        Command::Deploy(args) => deploy(&ctx, &cli, args).await,
        Command::Contracts(command) => contracts(&ctx, command).await,
        Command::Settings(args) => settings(&ctx, args),
    };

    if ctx.thunks.services().wallet.is_connected() {
        ctx.thunks.disconnect_wallet().await;
    }
    ticker.abort();
    result
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let stored = WalletConfig::load_stored().unwrap_or_default();
    let _log_guard = match logging::init_logging(&stored) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging unavailable: {e:#}");
            None
        }
    };
    info!("Starting wallet v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

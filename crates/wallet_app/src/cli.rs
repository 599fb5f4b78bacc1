use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use wallet_chain::ConnectionKind;
use wallet_contracts::ContractType;
use wallet_core::DeployStrategy;

#[derive(Debug, Parser)]
#[command(name = "wallet", version, about = "Web3 wallet: balances, transfers and contract deployment")]
pub struct Cli {
    /// Network to use instead of the configured default.
    #[arg(long, global = true, env = "WALLET_NETWORK")]
    pub network: Option<String>,

    /// How to connect for commands that need an account.
    #[arg(long, global = true, value_enum, default_value_t = WalletKind::Local)]
    pub wallet: WalletKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WalletKind {
    Local,
    External,
    Walletconnect,
}

impl From<WalletKind> for ConnectionKind {
    fn from(kind: WalletKind) -> Self {
        match kind {
            WalletKind::Local => ConnectionKind::Local,
            WalletKind::External => ConnectionKind::External,
            WalletKind::Walletconnect => ConnectionKind::WalletConnect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContractKind {
    Erc20,
    Erc721,
}

impl From<ContractKind> for ContractType {
    fn from(kind: ContractKind) -> Self {
        match kind {
            ContractKind::Erc20 => ContractType::Erc20,
            ContractKind::Erc721 => ContractType::Erc721,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Remote,
    Local,
}

impl From<StrategyArg> for DeployStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Remote => DeployStrategy::Remote,
            StrategyArg::Local => DeployStrategy::Local,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the built front-end with a generated /env.js.
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Directory containing index.html.
        #[arg(long, default_value = "dist")]
        dir: PathBuf,
    },
    /// List the known networks.
    Networks,
    /// Connect and print the account balance.
    Balance,
    /// Send native currency.
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },
    /// Transfer ERC-20 tokens.
    SendToken {
        #[arg(long)]
        token: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },
    /// Mint an NFT on a deployed ERC-721 contract.
    Mint {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        token_uri: String,
    },
    /// Estimate gas for a transfer, with the buffer applied.
    Estimate {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        /// ERC-20 token address; native transfer when omitted.
        #[arg(long)]
        token: Option<String>,
    },
    /// Read an ERC-20 token's metadata and balance.
    TokenInfo {
        #[arg(long)]
        token: String,
    },
    /// Look up a transaction's receipt.
    Status {
        #[arg(long)]
        hash: String,
    },
    /// Deploy an ERC-20 or ERC-721 contract.
    Deploy(DeployArgs),
    /// Inspect recorded deployments.
    #[command(subcommand)]
    Contracts(ContractsCommand),
    /// Show or change persisted settings.
    Settings(SettingsArgs),
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    #[arg(long = "type", value_enum)]
    pub contract_type: ContractKind,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub symbol: String,
    #[arg(long)]
    pub decimals: Option<String>,
    #[arg(long)]
    pub total_supply: Option<String>,
    #[arg(long)]
    pub base_uri: Option<String>,
    /// Verify on the block explorer after deploying.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Debug, Subcommand)]
pub enum ContractsCommand {
    List,
    /// Show one record by id or address.
    Show { id: String },
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[arg(long)]
    pub gas_buffer: Option<f64>,
    #[arg(long)]
    pub default_network: Option<String>,
    #[arg(long)]
    pub auto_verify: Option<bool>,
    #[arg(long, value_enum)]
    pub deploy_strategy: Option<StrategyArg>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_deploy() {
        let cli = Cli::try_parse_from([
            "wallet", "--network", "holesky", "deploy", "--type", "erc20", "--name", "My Token",
            "--symbol", "MTK", "--total-supply", "1000", "--verify",
        ])
        .unwrap();
        assert_eq!(cli.network.as_deref(), Some("holesky"));
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.contract_type, ContractKind::Erc20);
        assert_eq!(args.total_supply.as_deref(), Some("1000"));
        assert!(args.verify);
    }

    #[test]
    fn wallet_kind_maps_to_connection() {
        let cli = Cli::try_parse_from(["wallet", "--wallet", "walletconnect", "balance"]).unwrap();
        assert_eq!(ConnectionKind::from(cli.wallet), ConnectionKind::WalletConnect);
    }
}

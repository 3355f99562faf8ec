//! docstore: command-line access to a modules database
//!
//! Loads a TOML client config, applies flag/env overrides and runs one
//! document or transaction command.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use docstore_client::{ClientConfig, DocumentStoreClient, ErrorFormat, TransactionId};

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Upload, delete and move documents in a modules database")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "docstore.toml")]
    config: PathBuf,

    /// Service URL (overrides config file)
    #[arg(long, env = "DOCSTORE_URL")]
    url: Option<String>,

    /// Auth mode: none, basic or digest (overrides config file)
    #[arg(long, env = "DOCSTORE_AUTH")]
    auth: Option<String>,

    #[arg(long, env = "DOCSTORE_USER")]
    user: Option<String>,

    #[arg(long, env = "DOCSTORE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "DOCSTORE_DATABASE")]
    database: Option<String>,

    /// URI root prefix (overrides config file)
    #[arg(long)]
    root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local file
    Put {
        uri: String,
        file: PathBuf,
        /// Write inside an existing transaction
        #[arg(long)]
        txid: Option<String>,
    },
    /// Delete a document
    Delete {
        uri: String,
        #[arg(long)]
        txid: Option<String>,
    },
    /// Replace a document with a local file at a new URI
    Move {
        from: String,
        to: String,
        file: PathBuf,
        /// Run inside an existing transaction (left uncommitted)
        #[arg(long)]
        txid: Option<String>,
    },
    /// Open a transaction and print its id
    Begin,
    /// Commit a transaction
    Commit { txid: String },
    /// Roll back a transaction
    Rollback { txid: String },
    /// Ask the service to return JSON error bodies
    ConfigureErrors,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docstore_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        info!("Config file: {}", cli.config.display());
        ClientConfig::load(&cli.config)?
    } else {
        info!("Config file not found, using defaults");
        ClientConfig::default()
    };

    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(auth) = cli.auth {
        config.auth = auth;
    }
    if let Some(user) = cli.user {
        config.user = Some(user);
    }
    if let Some(password) = cli.password {
        config.password = Some(password);
    }
    if let Some(database) = cli.database {
        config.database = Some(database);
    }
    if let Some(root) = cli.root {
        config.root = root;
    }

    let client = DocumentStoreClient::new(config)?;
    let tx = |txid: Option<String>| txid.map(TransactionId::from);

    match cli.command {
        Command::Put { uri, file, txid } => {
            let result = client.put_file(&uri, &file, tx(txid).as_ref()).await?;
            println!("{}", result);
        }
        Command::Delete { uri, txid } => {
            let result = client.delete(&uri, tx(txid).as_ref()).await?;
            println!("{}", result);
        }
        Command::Move { from, to, file, txid } => {
            let result = client
                .move_file(&from, &to, &file, tx(txid).as_ref())
                .await?;
            println!("{}", result);
        }
        Command::Begin => {
            println!("{}", client.create_transaction().await?);
        }
        Command::Commit { txid } => {
            client.commit_transaction(&TransactionId::from(txid)).await?;
        }
        Command::Rollback { txid } => {
            client.rollback_transaction(&TransactionId::from(txid)).await?;
        }
        Command::ConfigureErrors => {
            client.configure_error_format(ErrorFormat::Json).await?;
        }
    }

    Ok(())
}

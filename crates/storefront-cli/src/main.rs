use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::context::AppContext;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront sync CLI - durable cart, server sync and live notifications", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the durable cart store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also write daily-rotated log files to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Log in, merge the cart with the server, then print channel notifications
    Listen {
        /// Session token
        #[arg(long)]
        token: String,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add a product (merges with an existing line)
    Add {
        product_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        image: Option<String>,
    },
    /// Set a line's quantity (values below 1 become 1)
    Update {
        id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { id: String },
    /// Empty the cart and delete its stored record
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_log_dir = match (&cli.log_dir, &cli.command) {
        (Some(dir), _) => Some(dir.clone()),
        // The listener runs for a long time; keep a file trail by default.
        (None, Commands::Listen { .. }) => {
            storefront_infrastructure::StorefrontPaths::new(cli.data_dir.clone())
                .logs_dir()
                .ok()
        }
        (None, _) => None,
    };
    let _log_guard = logging::init(file_log_dir.as_deref());

    let ctx = AppContext::load(cli.config, cli.data_dir)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx)?,
            CartAction::Add {
                product_id,
                name,
                price,
                quantity,
                image,
            } => commands::cart::add(&ctx, product_id, name, price, quantity, image)?,
            CartAction::Update { id, quantity } => commands::cart::update(&ctx, &id, quantity)?,
            CartAction::Remove { id } => commands::cart::remove(&ctx, &id)?,
            CartAction::Clear => commands::cart::clear(&ctx)?,
        },
        Commands::Listen { token } => commands::listen::run(&ctx, token).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&ctx)?,
            ConfigAction::Path => commands::config::path(&ctx),
        },
    }

    Ok(())
}

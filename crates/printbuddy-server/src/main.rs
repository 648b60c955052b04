use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use printbuddy_db::{open_database, DbConfig};
use printbuddy_server::config::ServerConfig;
use printbuddy_server::intake::Intake;
use printbuddy_server::notify::{create_notifier, NotifierConfig};
use printbuddy_server::routes::{app_state, build_router};
use printbuddy_store::{create_store, FileStager, StoreConfig};

#[derive(Parser)]
#[command(name = "printbuddy-server")]
struct Cli {
    #[command(flatten)]
    config: ServerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the most recent orders
    ListOrders {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List the most recent feedback
    ListFeedback {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let db = open_database(&DbConfig::from_env())
        .await
        .context("opening database")?;

    match cli.command {
        Some(Commands::ListOrders { limit }) => {
            let orders = db.list_orders(limit).await?;
            if orders.is_empty() {
                eprintln!("No orders yet.");
            } else {
                println!(
                    "{:<38} {:<26} {:<10} {:>6} {:<20} FILE",
                    "ID", "CREATED", "SERVICE", "AMOUNT", "EMAIL"
                );
                for order in orders {
                    println!(
                        "{:<38} {:<26} {:<10} {:>6} {:<20} {}",
                        order.id,
                        order.created_at.to_rfc3339(),
                        order.service,
                        order.amount,
                        order.email,
                        order.file_locator,
                    );
                }
            }
        }
        Some(Commands::ListFeedback { limit }) => {
            let feedback = db.list_feedback(limit).await?;
            if feedback.is_empty() {
                eprintln!("No feedback yet.");
            } else {
                println!("{:<38} {:<26} {:<6} {:<20} FEEDBACK", "ID", "CREATED", "RATING", "NAME");
                for fb in feedback {
                    println!(
                        "{:<38} {:<26} {:<6} {:<20} {}",
                        fb.id,
                        fb.created_at.to_rfc3339(),
                        fb.rating,
                        fb.name.as_deref().unwrap_or("-"),
                        fb.feedback,
                    );
                }
            }
        }
        None => {
            let config = cli.config;

            let store_config = StoreConfig::from_env();
            let store = create_store(&store_config).context("configuring upload store")?;
            if store_config.is_s3() {
                info!("uploads go to object storage");
            } else {
                info!("uploads go to the local filesystem");
            }

            let notifier_config = NotifierConfig::from_env();
            if notifier_config.is_none() {
                info!("operator notifications disabled (no Twilio credentials)");
            }
            let notifier = create_notifier(notifier_config).context("configuring notifier")?;

            let stager = FileStager::new(store, config.upload_policy());
            let intake = Intake::new(db, stager, notifier, config.catalog);
            let state = app_state(intake, config.rate_limit());
            let app = build_router(state, &config);

            let addr = config.addr();
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            info!(catalog = config.catalog.as_str(), "printbuddy-server listening on http://{addr}");

            printbuddy_server::serve(listener, app).await?;
            info!("server stopped");
        }
    }

    Ok(())
}

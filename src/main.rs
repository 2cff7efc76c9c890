use clap::{Parser, Subcommand};
use fulfillment_bridge::application::converter::PayloadConverter;
use fulfillment_bridge::application::orchestrator::FulfillmentOrchestrator;
use fulfillment_bridge::application::state::OrderStateManager;
use fulfillment_bridge::application::verifier::{WebhookVerifier, sign_payload};
use fulfillment_bridge::config::BridgeConfig;
use fulfillment_bridge::domain::ports::{
    AuditLogRef, FulfillmentApiBox, InvoiceStoreBox, ProductStoreBox, UserStoreBox,
};
use fulfillment_bridge::error::BridgeError;
use fulfillment_bridge::infrastructure::audit::TracingAuditLog;
use fulfillment_bridge::infrastructure::fulfillment_client::FulfillmentClient;
use fulfillment_bridge::infrastructure::in_memory::{
    InMemoryInvoiceStore, InMemoryProductStore, InMemoryUserStore,
};
#[cfg(feature = "storage-rocksdb")]
use fulfillment_bridge::infrastructure::rocksdb::RocksDBStore;
use fulfillment_bridge::infrastructure::seed::SeedData;
use fulfillment_bridge::interfaces::http::{self, AppState};
use miette::{IntoDiagnostic, Result, miette};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// JSON file with `invoices`, `users` and `products` to load at start.
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Include error details in HTTP responses.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook and shipment HTTP service.
    Serve {
        #[arg(long, env = "BRIDGE_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Print the webhook signature for a JSON payload file.
    Sign {
        #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
        payload: PathBuf,
    },
    /// Validate and convert a stored invoice without calling the provider.
    Preview { invoice_id: String },
}

struct Stores {
    invoices: InvoiceStoreBox,
    users: UserStoreBox,
    products: ProductStoreBox,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Sign { secret, payload } => {
            let raw = std::fs::read_to_string(payload).into_diagnostic()?;
            let payload: Value = serde_json::from_str(&raw).into_diagnostic()?;
            let Value::Object(map) = payload else {
                return Err(miette!("payload must be a JSON object"));
            };
            println!("{}", sign_payload(&secret, &map));
        }
        Command::Serve { bind } => {
            let config = BridgeConfig::from_env().into_diagnostic()?;
            let debug = cli.debug || config.debug;
            let stores = open_stores(cli.db_path, cli.seed).await?;
            let orchestrator = build_orchestrator(&config, stores)?;

            let listener = tokio::net::TcpListener::bind(&bind).await.into_diagnostic()?;
            http::serve(listener, AppState::new(orchestrator, debug))
                .await
                .into_diagnostic()?;
        }
        Command::Preview { invoice_id } => {
            let config = BridgeConfig::from_env().into_diagnostic()?;
            let stores = open_stores(cli.db_path, cli.seed).await?;
            let orchestrator = build_orchestrator(&config, stores)?;

            let invoice = orchestrator
                .state()
                .load_invoice(&invoice_id)
                .await
                .into_diagnostic()?;
            match orchestrator.prepare(&invoice).await {
                Ok((validation, converted)) => {
                    let out = json!({
                        "validation": validation,
                        "conversionMetadata": converted.conversion,
                        "payload": converted.request,
                    });
                    println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
                }
                Err(BridgeError::Validation(report)) => {
                    let out = json!({ "validation": report });
                    println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
                    return Err(miette!("invoice {invoice_id} failed validation"));
                }
                Err(e) => return Err(e).into_diagnostic(),
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fulfillment_bridge=info,audit=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so `sign` and `preview` output stays pipeable.
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn open_stores(db_path: Option<PathBuf>, seed: Option<PathBuf>) -> Result<Stores> {
    let stores = match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Stores {
                invoices: Box::new(store.clone()),
                users: Box::new(store.clone()),
                products: Box::new(store),
            }
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' \
                 feature is not enabled. Falling back to In-Memory storage."
            );
            in_memory_stores()
        }
        None => in_memory_stores(),
    };

    if let Some(path) = seed {
        SeedData::from_file(path)
            .into_diagnostic()?
            .apply(&*stores.invoices, &*stores.users, &*stores.products)
            .await
            .into_diagnostic()?;
    }

    Ok(stores)
}

fn in_memory_stores() -> Stores {
    Stores {
        invoices: Box::new(InMemoryInvoiceStore::new()),
        users: Box::new(InMemoryUserStore::new()),
        products: Box::new(InMemoryProductStore::new()),
    }
}

fn build_orchestrator(config: &BridgeConfig, stores: Stores) -> Result<FulfillmentOrchestrator> {
    let audit: AuditLogRef = Arc::new(TracingAuditLog::new());
    let verifier = WebhookVerifier::new(config.webhook_secret.clone(), audit);

    // A claim outlives any single provider call, so a crashed submission can be
    // retried once twice the request timeout has passed.
    let claim_ttl_secs = config.api.timeout.as_secs().saturating_mul(2).clamp(1, 86_400);
    let state = OrderStateManager::new(stores.invoices, stores.users, stores.products)
        .with_claim_ttl(chrono::Duration::seconds(claim_ttl_secs as i64));

    let api: FulfillmentApiBox =
        Box::new(FulfillmentClient::new(config.api.clone()).into_diagnostic()?);
    let converter = PayloadConverter::new(config.conversion.clone());

    Ok(FulfillmentOrchestrator::new(
        verifier,
        state,
        converter,
        api,
        config.auto_ship,
    ))
}

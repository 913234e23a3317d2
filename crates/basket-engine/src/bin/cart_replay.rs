//! # Cart Replay
//!
//! Runs a JSON script of cart operations against a configured engine and
//! prints a JSON report: the outcome of every step plus the final cart state.
//!
//! ## Usage
//! ```bash
//! cart-replay script.json
//! cart-replay script.json --config ./engine.toml --db ./basket.db
//! RUST_LOG=basket=trace cart-replay script.json
//! ```
//!
//! ## Script
//! ```json
//! {
//!   "cartId": "demo",
//!   "operations": [
//!     { "op": "addItem", "item": { "productId": "A", "name": "Whey", "price": 1000, "quantity": 2 } },
//!     { "op": "applyCoupon", "code": "SAVE10" },
//!     { "op": "updateQuantity", "productId": "A", "quantity": 3 },
//!     { "op": "removeCoupon", "code": "SAVE10" },
//!     { "op": "checkout" }
//!   ]
//! }
//! ```
//! Lines are addressed by product id; the first line of that product is used.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use basket_core::{Cart, CartId, CartResult, ItemCandidate, ItemId};
use basket_db::Database;
use basket_engine::{
    CartController, CartSessions, CartState, CartStore, EngineConfig, ErrorDetail,
    InMemoryCartStore, SqliteCartStore,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

// =============================================================================
// Script Format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Script {
    cart_id: Option<CartId>,
    operations: Vec<Operation>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Operation {
    AddItem {
        item: ItemCandidate,
    },
    RemoveItem {
        #[serde(rename = "productId")]
        product_id: String,
    },
    UpdateQuantity {
        #[serde(rename = "productId")]
        product_id: String,
        quantity: i64,
    },
    ClearCart,
    ApplyCoupon {
        code: String,
    },
    RemoveCoupon {
        code: String,
    },
    Checkout,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::AddItem { .. } => "addItem",
            Operation::RemoveItem { .. } => "removeItem",
            Operation::UpdateQuantity { .. } => "updateQuantity",
            Operation::ClearCart => "clearCart",
            Operation::ApplyCoupon { .. } => "applyCoupon",
            Operation::RemoveCoupon { .. } => "removeCoupon",
            Operation::Checkout => "checkout",
        }
    }
}

// =============================================================================
// Report Format
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepReport {
    op: &'static str,
    ok: bool,
    /// `applyCoupon` only: whether the coupon was committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    accepted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    cart_id: CartId,
    steps: Vec<StepReport>,
    state: CartState,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<Arc<Cart>>,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut script_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => script_path = Some(PathBuf::from(other)),
        }
        i += 1;
    }

    let Some(script_path) = script_path else {
        print_help();
        return Err("missing script path".into());
    };

    let mut config = EngineConfig::load(config_path)?;
    if db_path.is_some() {
        config.database.path = db_path;
    }

    let script: Script = serde_json::from_str(&std::fs::read_to_string(&script_path)?)?;
    let cart_id = script.cart_id.unwrap_or_else(CartId::generate);

    let store: Arc<dyn CartStore> = match config.database_config() {
        Some(db_config) => Arc::new(SqliteCartStore::new(&Database::new(db_config).await?)),
        None => Arc::new(InMemoryCartStore::new()),
    };
    let sessions = CartSessions::new(config.context()?, store);

    info!(
        cart_id = %cart_id,
        operations = script.operations.len(),
        "Replaying cart script"
    );

    let controller = sessions.open(&cart_id).await?;
    let mut steps = Vec::with_capacity(script.operations.len());
    let mut order = None;

    for operation in script.operations {
        let op = operation.name();
        let (accepted, result) = match operation {
            Operation::AddItem { item } => (None, controller.add_item(item).map(|_| ())),
            Operation::RemoveItem { product_id } => (
                None,
                match line_of(&controller, &product_id) {
                    Some(id) => controller.remove_item(&id),
                    None => Ok(()),
                },
            ),
            Operation::UpdateQuantity {
                product_id,
                quantity,
            } => {
                let id = line_of(&controller, &product_id).unwrap_or_else(|| ItemId::new(product_id));
                (None, controller.update_quantity(&id, quantity))
            }
            Operation::ClearCart => (None, controller.clear_cart()),
            Operation::ApplyCoupon { code } => match controller.apply_coupon(&code).await {
                Ok(accepted) => (Some(accepted), Ok(())),
                Err(err) => (None, Err(err)),
            },
            Operation::RemoveCoupon { code } => (None, controller.remove_coupon(&code)),
            Operation::Checkout => {
                let result: CartResult<()> = sessions.checkout(&cart_id).await.map(|done| {
                    order = Some(done);
                });
                (None, result)
            }
        };

        if let Err(err) = &result {
            warn!(op, error = %err, "Replay step failed");
        }
        let error = match (&result, accepted) {
            (Err(err), _) => Some(ErrorDetail::from(err)),
            // A rejected coupon leaves its reason in the error slot
            (Ok(()), Some(false)) => controller.state().error,
            _ => None,
        };
        steps.push(StepReport {
            op,
            ok: result.is_ok(),
            accepted,
            error,
        });
    }

    let state = controller.state();
    if order.is_none() {
        sessions.close(&cart_id).await?;
    }

    let report = Report {
        cart_id,
        steps,
        state,
        order,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Item id of the first line holding `product_id`.
fn line_of(controller: &CartController, product_id: &str) -> Option<ItemId> {
    controller.cart().and_then(|cart| {
        cart.items()
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.id.clone())
    })
}

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "info,basket=debug,sqlx=warn";

/// Logs go to stderr; stdout carries the JSON report.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    log_subscriber(filter, std::io::stderr).init();
}

fn log_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

fn print_help() {
    println!("Basket Cart Replay");
    println!();
    println!("Usage: cart-replay <SCRIPT> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Engine config file (default: BASKET_CONFIG or platform config dir)");
    println!("  -d, --db <PATH>      SQLite database file (default: in-memory cart store)");
    println!("  -h, --help           Show this help message");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_default_filter_is_honored() {
        let subscriber = log_subscriber(EnvFilter::new(DEFAULT_LOG_FILTER), std::io::sink);

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "basket_engine::sessions", Level::DEBUG));
            assert!(!tracing::enabled!(target: "basket_engine::sessions", Level::TRACE));
            assert!(tracing::enabled!(target: "tokio", Level::INFO));
            assert!(!tracing::enabled!(target: "tokio", Level::DEBUG));
            assert!(tracing::enabled!(target: "sqlx::query", Level::WARN));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::INFO));
        });
    }
}

//! Command-line actions. Each one loads the lists it needs, performs a
//! single user action, and prints the result.

use crate::app_system::{AdminConfig, AdminSystem};
use crate::domain::{Order, Product};
use crate::product_actor::ProductError;
use crate::remote::{Collection, HttpStore, MemoryStore, StoreOp};
use crate::validation::{OrderForm, ProductForm};
use crate::view::{FilteredView, OrderRow};
use anyhow::Context;
use clap::Subcommand;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage products.
    #[clap(subcommand)]
    Products(ProductCommand),
    /// Manage orders.
    #[clap(subcommand)]
    Orders(OrderCommand),
    /// Walk through create, rollback and partial failure against an in-memory store.
    Demo,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    List {
        #[clap(short, long, default_value = "")]
        search: String,
    },
    Add {
        #[clap(long)]
        name: String,
        #[clap(long)]
        price: String,
        #[clap(long)]
        remaining: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
    List {
        /// Matches against the product name.
        #[clap(short, long, default_value = "")]
        search: String,
    },
    Add {
        /// Product name or id.
        #[clap(long)]
        product: String,
        #[clap(long)]
        quantity: String,
        /// YYYY-MM-DD
        #[clap(long)]
        date: String,
    },
    Delete {
        id: String,
    },
}

fn connect(config: &AdminConfig) -> anyhow::Result<AdminSystem> {
    let store = HttpStore::new(&config.base_url, config.request_timeout)
        .with_context(|| format!("cannot build HTTP client for {}", config.base_url))?;
    Ok(AdminSystem::start(config, Arc::new(store)))
}

fn print_products(products: &[Product]) {
    println!("{:<8} {:<24} {:>10} {:>10}", "ID", "Name", "Price", "Remaining");
    for p in products {
        println!("{:<8} {:<24} {:>10.2} {:>10}", p.id, p.name, p.price, p.remaining);
    }
}

fn print_order_rows(rows: &[OrderRow]) {
    println!("{:<8} {:<24} {:>8} {:>10} {:<10}", "ID", "Product", "Quantity", "Amount", "Date");
    for row in rows {
        let o = &row.order;
        println!(
            "{:<8} {:<24} {:>8} {:>10.2} {:<10}",
            o.id, row.product_name, o.quantity, o.amount, o.date
        );
    }
}

pub async fn products(config: &AdminConfig, cmd: ProductCommand) -> anyhow::Result<()> {
    let system = connect(config)?;
    system
        .product_client
        .refresh_products()
        .await
        .context("loading products")?;

    let result = match cmd {
        ProductCommand::List { search } => system
            .product_client
            .search_products(&search)
            .await
            .map(|found| print_products(&found)),
        ProductCommand::Add {
            name,
            price,
            remaining,
        } => {
            let form = ProductForm {
                name,
                price,
                remaining,
            };
            system
                .product_client
                .add_product(&form)
                .await
                .map(|p| println!("Added product {} ({})", p.id, p.name))
        }
        ProductCommand::Delete { id } => system
            .product_client
            .delete_product(id)
            .await
            .map(|p| println!("Deleted product {} ({})", p.id, p.name)),
    };

    system.shutdown().await.map_err(anyhow::Error::msg)?;
    Ok(result?)
}

pub async fn orders(config: &AdminConfig, cmd: OrderCommand) -> anyhow::Result<()> {
    let system = connect(config)?;
    system.load().await.context("loading products and orders")?;

    let result = match cmd {
        OrderCommand::List { search } => system
            .order_client
            .order_rows(&search)
            .await
            .map(|rows| print_order_rows(&rows)),
        OrderCommand::Add {
            product,
            quantity,
            date,
        } => {
            let form = OrderForm {
                product,
                quantity,
                date,
            };
            system
                .order_client
                .add_order(&form)
                .await
                .map(|o| println!("Added order {} (amount {:.2})", o.id, o.amount))
        }
        OrderCommand::Delete { id } => system
            .order_client
            .delete_order(id)
            .await
            .map(|o| println!("Deleted order {}", o.id)),
    };

    system.shutdown().await.map_err(anyhow::Error::msg)?;
    Ok(result?)
}

/// Runs the reference scenarios against an in-memory store and logs what
/// happened to both lists.
pub async fn demo(config: &AdminConfig) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::with_server_ids(100));
    store.seed(Collection::Products, &[Product::new("1", "Widget", 10.0, 5)]);

    let system = AdminSystem::start(config, store.clone());
    system.load().await?;
    let mut product_view: FilteredView<Product> = FilteredView::new();

    let span = tracing::info_span!("order_created");
    async {
        let form = OrderForm {
            product: "Widget".into(),
            quantity: "3".into(),
            date: "2025-05-01".into(),
        };
        let order: Order = system.order_client.add_order(&form).await?;
        let widget = system.product_client.get_product("1".into()).await?;
        info!(
            order_id = %order.id,
            amount = order.amount,
            remaining = widget.map(|p| p.remaining),
            "Order placed"
        );
        anyhow::Ok(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("order_create_fails");
    async {
        store.fail(Collection::Orders, StoreOp::Create);
        let form = OrderForm {
            product: "Widget".into(),
            quantity: "1".into(),
            date: "2025-05-02".into(),
        };
        match system.order_client.add_order(&form).await {
            Ok(order) => warn!(order_id = %order.id, "Order unexpectedly accepted"),
            Err(e) => info!(error = %e, "Order rejected"),
        }
        store.recover(Collection::Orders, StoreOp::Create);
        let orders = system.order_client.list_orders().await?;
        let widget = system.product_client.get_product("1".into()).await?;
        info!(
            orders = orders.records.len(),
            remaining = widget.map(|p| p.remaining),
            stock_updates = store.calls(Collection::Products, StoreOp::Update),
            policy = ?config.partial_failure,
            "State after failed order"
        );
        anyhow::Ok(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("delete_unknown_product");
    async {
        match system.product_client.delete_product("7".into()).await {
            Err(ProductError::NotFound(id)) => info!(product_id = %id, "Nothing to delete"),
            other => warn!(result = ?other, "Unexpected delete result"),
        }
        anyhow::Ok(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("search");
    async {
        let draft = ProductForm {
            name: "Widget Pro".into(),
            price: "25".into(),
            remaining: "2".into(),
        };
        system.product_client.add_product(&draft).await?;
        let snapshot = system.product_client.list_products().await?;
        let hits = product_view.get(snapshot.version, &snapshot.records, "widget");
        info!(hits = hits.len(), version = snapshot.version, "Search results");
        anyhow::Ok(())
    }
    .instrument(span)
    .await?;

    system.shutdown().await.map_err(anyhow::Error::msg)?;
    info!("Demo completed");
    Ok(())
}

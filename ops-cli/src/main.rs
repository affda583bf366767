//! `billing-ops`: runs one billing operation against the accounting service.
//!
//! ```bash
//! billing-ops --config billing-ops.yaml accrue-late-fees
//! billing-ops consolidate --customer 4242
//! billing-ops notify --outbox
//! ```

mod app_config;

use accounting_service::HttpAccountingClient;
use anyhow::{bail, Context, Result};
use app_config::AppConfig;
use billing_service::{BillingContext, BillingService, SystemClock};
use chrono::Local;
use clap::{Parser, Subcommand};
use email_service::{EmailService, NotificationGateway, Outbox};
use logger_redacted::{init_tracing, PiiRedactor};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "billing-ops")]
#[command(about = "Late fees, invoice consolidation and payment reminders for the accounting service")]
struct Args {
    /// Configuration file (YAML); BILLING_OPS__* variables override it
    #[arg(short, long, default_value = "billing-ops.yaml", env = "BILLING_OPS_CONFIG")]
    config: String,

    /// Print the operation messages as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List customers with a positive balance
    LateCustomers,
    /// Send payment reminders to eligible late customers
    Notify {
        /// Record reminders in memory and print them instead of sending
        #[arg(long)]
        outbox: bool,
    },
    /// Add late fees to overdue invoices, catching up on missed days
    AccrueLateFees {
        /// Rate for customers without LateFeePercentRate (e.g. 0.02)
        #[arg(long)]
        rate: Option<Decimal>,
        /// Run a single pass without catch-up
        #[arg(long)]
        once: bool,
    },
    /// Move unpaid invoice items into each customer's oldest invoice
    Consolidate {
        #[arg(long)]
        customer: Option<i64>,
    },
    /// Write default settings into new or incomplete customers
    SetDefaults,
    /// Disable online payments on every open invoice
    DisablePayments,
    /// Refresh the connected bank feeds
    RefreshBanks,
    /// Assemble the eviction packet of one customer
    EvictionPacket { customer_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    init_tracing(&config.logging).context("Failed to initialize logging")?;
    info!(command = ?args.command, "billing-ops starting");

    let outbox = Arc::new(Outbox::new());
    let gateway: Arc<dyn NotificationGateway> = match &args.command {
        Command::Notify { outbox: false } => Arc::new(EmailService::new(config.email()?)?),
        _ => outbox.clone(),
    };
    let api = Arc::new(HttpAccountingClient::new(config.accounting()?)?);

    let ctx = BillingContext::new(api, gateway, Arc::new(SystemClock), config.billing.clone())?
        .with_redactor(PiiRedactor::from_logger_config(&config.logging));
    let service = BillingService::new(ctx);

    let messages = match args.command {
        Command::LateCustomers => {
            let late = service.late_customers(Local::now().naive_local()).await?;
            late.iter()
                .map(|late| format!("{}: {}", late.customer.name, late.balance()))
                .collect()
        }
        Command::Notify { .. } => {
            let report = service.notify_late_customers().await?;
            let mut messages = report.messages;
            messages.extend(
                outbox
                    .sent()
                    .into_iter()
                    .map(|message| format!("[outbox] {}", message.body)),
            );
            messages
        }
        Command::AccrueLateFees { rate, once: true } => service.accrue_late_fees_once(rate).await?.messages,
        Command::AccrueLateFees { rate, once: false } => {
            let report = service.charge_late_fees(rate).await?;
            if !report.unresolved_catch_up.is_empty() {
                print_messages(&report.messages, args.json)?;
                error!(customers = ?report.unresolved_catch_up, "Late fee catch-up did not finish");
                bail!(
                    "late fee catch-up stopped after {} passes for customers {:?}",
                    report.passes,
                    report.unresolved_catch_up
                );
            }
            report.messages
        }
        Command::Consolidate { customer } => service.consolidate_invoices(customer).await?.messages,
        Command::SetDefaults => service.apply_customer_defaults().await?.messages,
        Command::DisablePayments => service.disable_invoice_payments().await?.messages,
        Command::RefreshBanks => service.refresh_bank_connections().await?.messages,
        Command::EvictionPacket { customer_id } => {
            let packet = service.eviction_packet(customer_id).await?;
            vec![serde_json::to_string_pretty(&packet)?]
        }
    };

    print_messages(&messages, args.json)
}

fn print_messages(messages: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(messages)?);
    } else {
        for message in messages {
            println!("{}", message);
        }
    }
    Ok(())
}

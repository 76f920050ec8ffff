use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use loanbook::config::AppConfig;
use loanbook::error::AppError;
use loanbook::lending::{
    lending_router, ComputedTerms, LoanCategory, LoanService, LoggingNotifier,
    MemoryApplicationStore, MemoryPeriodStore, PricingEngine,
};
use loanbook::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Loanbook",
    about = "Run the loan origination and collections service, or price a request from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Price a loan request against the standard tier tables
    Quote(QuoteArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct QuoteArgs {
    /// Loan category: with_collateral, without_collateral, or open_term
    #[arg(long, value_parser = parse_category)]
    category: LoanCategory,
    /// Requested principal
    #[arg(long)]
    amount: f64,
    /// Amortization months, only meaningful for open-term loans
    #[arg(long)]
    months: Option<u32>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Quote(args) => run_quote(args),
    }
}

fn parse_category(raw: &str) -> Result<LoanCategory, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "with_collateral" | "collateral" => Ok(LoanCategory::WithCollateral),
        "without_collateral" | "unsecured" => Ok(LoanCategory::WithoutCollateral),
        "open_term" | "open" => Ok(LoanCategory::OpenTerm),
        other => Err(format!(
            "unknown category '{other}', expected with_collateral, without_collateral, or open_term"
        )),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let service = Arc::new(LoanService::new(
        Arc::new(MemoryApplicationStore::default()),
        Arc::new(MemoryPeriodStore::default()),
        Arc::new(LoggingNotifier),
        PricingEngine::standard(config.lending.open_term_months),
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(lending_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan origination service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let engine = PricingEngine::standard(args.months.unwrap_or(12));

    match engine.quote_with_term(args.category, args.amount, args.months) {
        Ok(terms) => {
            render_quote(args.category, args.amount, &terms);
            Ok(())
        }
        Err(err) => {
            eprintln!("cannot price this request: {err}");
            std::process::exit(2);
        }
    }
}

fn render_quote(category: LoanCategory, amount: f64, terms: &ComputedTerms) {
    println!("Loan quote");
    println!("Category: {}", category.label());
    println!("Requested principal: {amount:.2}");
    println!();
    println!(
        "Term: {} months at {:.2}% monthly",
        terms.term_months, terms.interest_rate_percent
    );
    println!("Interest per period: {:.2}", terms.interest_amount);
    println!("Total interest: {:.2}", terms.total_interest);
    println!("Service fee: {:.2}", terms.service_fee);
    println!("Total payable: {:.2}", terms.total_payable);
    println!("Installment: {:.2}", terms.installment_amount);
    println!("Net released: {:.2}", terms.net_released);
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

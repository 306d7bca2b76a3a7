use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hiscore_api::auth::Permission;
use hiscore_api::models::token::{NewToken, TokenGrant};
use hiscore_api::store::{schema, QueryExecutor};
use hiscore_api::{api, config, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // OTLP export is only wired when an endpoint is configured.
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "hiscore-api"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "hiscore_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Migrate) => {
            let executor = QueryExecutor::connect(&cfg.store()).await?;
            schema::ensure(&executor).await?;
            executor.close().await;
            Ok(())
        }
        Some(cli::Commands::Token { command }) => {
            let executor = QueryExecutor::connect(&cfg.store()).await?;
            let state = AppState::new(executor);
            let outcome = handle_token_command(command, &state).await;
            state.executor.close().await;
            outcome
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let executor = QueryExecutor::connect(&cfg.store())
        .await
        .context("failed to connect to database")?;

    tracing::info!("Ensuring schema...");
    schema::ensure(&executor).await?;

    let state = Arc::new(AppState::new(executor));
    let app = api::app(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("hiscore API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.executor.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutting down");
}

async fn handle_token_command(cmd: cli::TokenCommands, state: &AppState) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Create {
            hiscore,
            ban,
            create_token,
            verify_players,
        } => {
            let new_token = NewToken::generate(TokenGrant {
                request_highscores: hiscore,
                verify_ban: ban,
                create_token,
                verify_players,
            });
            state.tokens.insert(&new_token).await?;
            println!("Token created:\n  Token: {}\n  Use:   token: {}", new_token.token, new_token.token);
        }
        cli::TokenCommands::Show { token } => match state.tokens.find(&token).await? {
            Some(record) => {
                println!("{:<16} {:<8}", "PERMISSION", "GRANTED");
                for p in Permission::ALL {
                    println!("{:<16} {:<8}", p.name(), record.grants(p));
                }
            }
            None => println!("Token not found."),
        },
    }
    Ok(())
}

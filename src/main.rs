use std::net::SocketAddr;

use clap::Parser;
use tokenjar::cli::{
    Args, build_config, build_token_config, generate_secret, handle_create_user, init_logging,
    load_secret, open_database,
};
use tokenjar::config::TokenConfig;
use tokenjar::create_app;
use tracing::{error, info};

fn main() {
    let args = Args::parse();

    if args.generate_secret {
        println!("{}", generate_secret());
        return;
    }

    init_logging(&args.log_format);

    let Some(secret) = load_secret(args.secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(token) = build_token_config(&args, secret) else {
        std::process::exit(1);
    };

    // Started only once the secret is out of the environment.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to start runtime");
            std::process::exit(1);
        });

    runtime.block_on(serve(args, token));
}

async fn serve(args: Args, token: TokenConfig) {
    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(username) = args.create_user.as_deref() {
        handle_create_user(
            &db,
            username,
            args.display_name.as_deref(),
            args.email.as_deref(),
        )
        .await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to get local address");
        std::process::exit(1);
    });

    info!(
        algorithm = %token.algorithm(),
        access_ttl_secs = token.access_ttl_secs(),
        refresh_ttl_secs = token.refresh_ttl_secs(),
        "Token settings loaded"
    );

    let config = build_config(&args, db, token);
    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

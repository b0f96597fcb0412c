use crate::arguments::WebArguments;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Result;
use clap::Parser;
use log::*;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vsctl::control::{BalancerControl, NoopControl, SocketControl};
use vsctl::lifecycle::LifecycleController;
use vsctl::registry::Registry;

mod arguments;
mod http_error;
mod models;
mod stats_endpoint;
mod virtual_server_endpoint;

pub static DEBUG: bool = cfg!(debug_assertions);

/// Shared application state handed to every endpoint.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub controller: LifecycleController,
    pub render_dir: PathBuf,
}

pub async fn run() -> Result<()> {
    let args = WebArguments::parse();
    pretty_env_logger::env_logger::builder()
        .format_timestamp(None)
        .filter_level(if args.verbose || DEBUG { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    let registry = Registry::try_load(&args.registry_path).await?;
    info!("Registry loaded from {} ({} virtual servers)", args.registry_path, registry.count().await);

    let control: Arc<dyn BalancerControl> = match &args.balancer_socket {
        Some(socket) => {
            info!("Balancer control channel: {}", socket);
            Arc::new(SocketControl::new(socket.clone()))
        }
        None => {
            warn!("No balancer socket configured, running standalone");
            Arc::new(NoopControl)
        }
    };
    let controller = LifecycleController::new(registry.clone(), control).with_control_timeout(Duration::from_secs(args.control_timeout));

    let state = web::Data::new(AppState { registry, controller, render_dir: PathBuf::from(&args.render_dir) });

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Methods", "GET, POST, PATCH, DELETE, OPTIONS"))
                    .add(("Access-Control-Allow-Headers", "Content-Type, Authorization")),
            )
            .app_data(web::JsonConfig::default().limit(8192).error_handler(|err, _req| {
                let error = json!({ "error": { "kind": "bad_request", "message": format!("{}", err) } });
                actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(error)).into()
            }))
            // Stats first so /virtual-servers/stats wins over /{id}
            .configure(stats_endpoint::configure)
            .configure(virtual_server_endpoint::configure)
    })
    .workers(4)
    .bind(format!("{}:{}", args.bind, args.port))?
    .run();

    info!("Starting {} server at http://{}:{}...", if DEBUG { "development" } else { "production" }, args.bind, args.port);

    let stop_result = server.await;
    debug!("Server stopped");

    Ok(stop_result?)
}

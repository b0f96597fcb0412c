use actix_web::{HttpResponse, Result as ActixResult, delete, get, patch, post, web};
use log::info;
use uuid::Uuid;

use crate::AppState;
use crate::http_error::Error;
use crate::models::{GeneratedConfigResponse, UpdateStatusRequest, VirtualServerResponse};
use vsctl::registry::types::{VirtualServerPatch, VirtualServerSpec, VsStatus};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/virtual-servers")
            .service(list_virtual_servers)
            .service(create_virtual_server)
            .service(get_virtual_server)
            .service(update_virtual_server)
            .service(update_virtual_server_status)
            .service(delete_virtual_server)
            .service(generate_virtual_server_config),
    );
}

#[get("")]
async fn list_virtual_servers(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let servers = state.registry.list().await;
    Ok(HttpResponse::Ok().json(servers))
}

#[post("")]
async fn create_virtual_server(state: web::Data<AppState>, req: web::Json<VirtualServerSpec>) -> ActixResult<HttpResponse> {
    let server = state.registry.create(req.into_inner()).await.map_err(Error::from)?;
    Ok(HttpResponse::Created().json(VirtualServerResponse { virtual_server: server }))
}

#[get("/{id}")]
async fn get_virtual_server(state: web::Data<AppState>, id: web::Path<String>) -> ActixResult<HttpResponse> {
    let id = parse_id(&id)?;
    let server = state.registry.get(id).await.map_err(Error::from)?;
    Ok(HttpResponse::Ok().json(server))
}

#[patch("/{id}")]
async fn update_virtual_server(state: web::Data<AppState>, id: web::Path<String>, req: web::Json<VirtualServerPatch>) -> ActixResult<HttpResponse> {
    let id = parse_id(&id)?;
    let server = state.controller.update(id, req.into_inner()).await.map_err(Error::from)?;
    Ok(HttpResponse::Ok().json(VirtualServerResponse { virtual_server: server }))
}

#[patch("/{id}/status")]
async fn update_virtual_server_status(
    state: web::Data<AppState>,
    id: web::Path<String>,
    req: web::Json<UpdateStatusRequest>,
) -> ActixResult<HttpResponse> {
    let id = parse_id(&id)?;
    let requested: VsStatus = req.status.parse().map_err(|message: String| Error(vsctl::Error::validation("status", message)))?;
    let server = state.controller.request_status(id, requested).await.map_err(Error::from)?;
    Ok(HttpResponse::Ok().json(VirtualServerResponse { virtual_server: server }))
}

#[delete("/{id}")]
async fn delete_virtual_server(state: web::Data<AppState>, id: web::Path<String>) -> ActixResult<HttpResponse> {
    let id = parse_id(&id)?;
    state.controller.remove(id).await.map_err(Error::from)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Generate the configuration artifact server-side. The response is only a
/// summary; the artifact lands in the render directory, not in the body.
#[get("/{id}/config")]
async fn generate_virtual_server_config(state: web::Data<AppState>, id: web::Path<String>) -> ActixResult<HttpResponse> {
    let id = parse_id(&id)?;
    let server = state.registry.get(id).await.map_err(Error::from)?;
    let rendered = vsctl::render::render(&server).map_err(Error::from)?;

    std::fs::create_dir_all(&state.render_dir).map_err(|e| Error(vsctl::Error::Storage(e.to_string())))?;
    let target = state.render_dir.join(&rendered.filename);
    tokio::fs::write(&target, &rendered.contents).await.map_err(|e| Error(vsctl::Error::Storage(e.to_string())))?;

    info!("Generated configuration for {} at {}", server.name, target.display());
    Ok(HttpResponse::Ok().json(GeneratedConfigResponse { filename: rendered.filename, bytes: rendered.contents.len() }))
}

// Ill-formed ids never reach the registry; the caller gets a field-level message.
fn parse_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error(vsctl::Error::validation("id", format!("'{}' is not a valid virtual server id", raw))))
}

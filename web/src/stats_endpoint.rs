use actix_web::{HttpResponse, Result as ActixResult, web};
use vsctl::registry::types::VsStatus;

use crate::AppState;
use crate::models::RegistryStats;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/virtual-servers/stats", web::get().to(get_stats));
}

/// The aggregate counters the console's dashboard cards display.
async fn get_stats(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let servers = state.registry.list().await;
    let stats = RegistryStats {
        total: servers.len(),
        active: servers.iter().filter(|s| s.status == VsStatus::Active).count(),
        inactive: servers.iter().filter(|s| s.status == VsStatus::Inactive).count(),
        degraded: servers.iter().filter(|s| s.status == VsStatus::Degraded).count(),
        maintenance: servers.iter().filter(|s| s.status == VsStatus::Maintenance).count(),
        total_backends: servers.iter().map(|s| s.backends.len()).sum(),
    };
    Ok(HttpResponse::Ok().json(stats))
}

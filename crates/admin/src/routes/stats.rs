//! Dashboard counters.

use axum::{Json, extract::State};

use crate::db::StatsRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::StoreStats;
use crate::state::AppState;

/// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<StoreStats>> {
    let stats = StatsRepository::new(state.pool())
        .load(state.config().low_stock_threshold)
        .await?;
    Ok(Json(stats))
}

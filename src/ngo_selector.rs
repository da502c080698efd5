// src/ngo_selector.rs

use log::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::user::NgoLoad;
use crate::store::EntityStore;

/// Picks the active NGO in `city` holding the fewest assigned incidents.
///
/// Every incident ever assigned counts toward load, resolved ones included.
/// Equal loads resolve to the smallest id so the choice is reproducible.
pub async fn select_ngo(store: &dyn EntityStore, city: &str) -> AppResult<NgoLoad> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::Validation("Reporter city is required".to_string()));
    }

    let candidates = store.ngo_loads(city).await?;
    debug!("{} NGO candidates in {}", candidates.len(), city);

    least_loaded(candidates).ok_or_else(|| {
        warn!("No active NGO available in {}", city);
        AppError::NoNgoAvailable {
            city: city.to_string(),
        }
    })
}

pub fn least_loaded(candidates: Vec<NgoLoad>) -> Option<NgoLoad> {
    candidates
        .into_iter()
        .min_by(|a, b| a.incident_count.cmp(&b.incident_count).then_with(|| a.id.cmp(&b.id)))
}

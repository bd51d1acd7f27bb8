//! Free-form key/value settings used by the dashboard UI.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

use crate::db::repos::settings::{Setting, SettingsRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ApiJson;
use crate::http::response::{ok, ApiResult};
use crate::http::server::AppState;
use crate::models::banking::SettingValue;

const MAX_KEY_LEN: usize = 100;

fn check_key(key: &str) -> Result<&str, ApiError> {
    let key = key.trim();
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(ApiError::bad_request(format!(
            "setting key must be 1-{MAX_KEY_LEN} characters"
        )));
    }
    Ok(key)
}

async fn list_settings(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Setting>> {
    Ok(ok(SettingsRepo::new(&state.pool).list().await?))
}

async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Setting> {
    let key = check_key(&key)?;
    Ok(ok(SettingsRepo::new(&state.pool).get(key).await?))
}

/// PUT /settings/{key} - insert or overwrite
async fn put_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    ApiJson(body): ApiJson<SettingValue>,
) -> ApiResult<Setting> {
    let key = check_key(&key)?;
    Ok(ok(SettingsRepo::new(&state.pool)
        .upsert(key, body.setting_value)
        .await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings", get(list_settings))
        .route("/settings/{key}", get(get_setting).put(put_setting))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_trimmed_and_bounded() {
        assert_eq!(check_key("  theme ").unwrap(), "theme");
        assert!(check_key("   ").is_err());
        assert!(check_key(&"k".repeat(101)).is_err());
    }
}

//! Mode catalogue endpoint.

use axum::Json;
use failover_control::Mode;
use serde::Serialize;

/// One selectable mode.
#[derive(Debug, Serialize)]
pub struct ModeInfo {
    /// Wire value accepted by `/control`.
    pub value: Mode,
    /// Short label for a picker.
    pub label: &'static str,
    /// What the mode does.
    pub description: &'static str,
}

/// Response for the mode catalogue.
#[derive(Debug, Serialize)]
pub struct ModesResponse {
    /// Every mode, automatic first.
    pub modes: Vec<ModeInfo>,
}

fn describe(mode: Mode) -> ModeInfo {
    let (label, description) = match mode {
        Mode::Auto => (
            "Auto - Automatic control based on WAN1",
            "Automatically turns plug on/off based on WAN1 status",
        ),
        Mode::ForceOn => (
            "On - Keep plug always ON",
            "Plug will stay ON regardless of WAN1 status",
        ),
        Mode::ForceOff => (
            "Off - Keep plug always OFF",
            "Plug will stay OFF regardless of WAN1 status",
        ),
    };
    ModeInfo {
        value: mode,
        label,
        description,
    }
}

/// List the available modes.
///
/// ```text
/// GET /modes
///
/// Response: 200 OK
/// {"modes": [{"value": "auto", "label": "...", "description": "..."}, ...]}
/// ```
pub async fn list_modes() -> Json<ModesResponse> {
    Json(ModesResponse {
        modes: Mode::ALL.into_iter().map(describe).collect(),
    })
}

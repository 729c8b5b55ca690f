//! HTTP surface of §6: session lifecycle plus one semantic route per driver
//! operation of §4.2, addressed by the hostname of the switch's currently
//! open session.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use netman_model::{Bond, Interface, SwitchDescriptor, Vlan};
use serde::{Deserialize, Serialize};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/switches-sessions/:id", post(open_session).delete(close_session))
        .route("/switches-sessions/:id/actions", post(session_action))
        .route("/switches/:hostname/vlans", get(list_vlans).post(add_vlan))
        .route("/switches/:hostname/vlans/:number", get(get_vlan).delete(remove_vlan))
        .route("/switches/:hostname/interfaces", get(list_interfaces))
        .route("/switches/:hostname/interfaces/:name", get(get_interface))
        .route("/switches/:hostname/interfaces/:name/access-mode", post(set_access_mode))
        .route("/switches/:hostname/interfaces/:name/trunk-mode", post(set_trunk_mode))
        .route(
            "/switches/:hostname/interfaces/:name/access-vlan",
            post(set_access_vlan).delete(remove_access_vlan),
        )
        .route(
            "/switches/:hostname/interfaces/:name/native-vlan",
            post(configure_native_vlan).delete(remove_native_vlan),
        )
        .route("/switches/:hostname/interfaces/:name/trunk-vlans", post(add_trunk_vlan))
        .route(
            "/switches/:hostname/interfaces/:name/trunk-vlans/:number",
            delete(remove_trunk_vlan),
        )
        .route(
            "/switches/:hostname/interfaces/:name/description",
            post(set_interface_description).delete(remove_interface_description),
        )
        .route(
            "/switches/:hostname/interfaces/:name/spanning-tree",
            post(edit_interface_spanning_tree),
        )
        .route("/switches/:hostname/interfaces/:name/shutdown", post(shutdown_interface))
        .route("/switches/:hostname/interfaces/:name/openup", post(openup_interface))
        .route("/switches/:hostname/interfaces/:name/lldp", post(enable_lldp))
        .route("/switches/:hostname/interfaces/:name/bond", delete(remove_interface_from_bond))
        .route("/switches/:hostname/bonds", get(list_bonds).post(add_bond))
        .route("/switches/:hostname/bonds/:number", get(get_bond).delete(remove_bond))
        .route("/switches/:hostname/bonds/:number/members", post(add_interface_to_bond))
        .route("/switches/:hostname/bonds/:number/link-speed", post(set_bond_link_speed))
        .with_state(state)
}

async fn session_for_host(state: &AppState, hostname: &str) -> Result<String, ApiError> {
    state
        .sessions
        .session_id_for_hostname(hostname)
        .await
        .ok_or_else(|| ApiError::NoSessionForHost(hostname.to_string()))
}

#[derive(Serialize)]
struct SessionOpened {
    session_id: String,
}

async fn open_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(descriptor): Json<SwitchDescriptor>,
) -> Result<(StatusCode, Json<SessionOpened>), ApiError> {
    state.sessions.open(id.clone(), descriptor).await?;
    Ok((StatusCode::CREATED, Json(SessionOpened { session_id: id })))
}

async fn close_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.sessions.close(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn session_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<StatusCode, ApiError> {
    netman_engine::dispatch_action(&state.sessions, &id, body.trim()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_vlans(State(state): State<AppState>, Path(hostname): Path<String>) -> Result<Json<Vec<Vlan>>, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    let vlans = state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.get_vlans().await }))
        .await?;
    Ok(Json(vlans))
}

async fn get_vlan(
    State(state): State<AppState>,
    Path((hostname, number)): Path<(String, u16)>,
) -> Result<Json<Vlan>, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    let vlan = state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.get_vlan(number).await }))
        .await?;
    Ok(Json(vlan))
}

#[derive(Deserialize)]
struct AddVlanBody {
    number: u16,
    name: Option<String>,
}

async fn add_vlan(
    State(state): State<AppState>,
    Path(hostname): Path<String>,
    Json(body): Json<AddVlanBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            Box::pin(async move { d.add_vlan(body.number, body.name.as_deref()).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_vlan(
    State(state): State<AppState>,
    Path((hostname, number)): Path<(String, u16)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.remove_vlan(number).await }))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_interfaces(
    State(state): State<AppState>,
    Path(hostname): Path<String>,
) -> Result<Json<Vec<Interface>>, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    let interfaces = state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.get_interfaces().await }))
        .await?;
    Ok(Json(interfaces))
}

async fn get_interface(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<Json<Interface>, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    let interface = state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.get_interface(&name).await })
        })
        .await?;
    Ok(Json(interface))
}

async fn set_access_mode(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.set_access_mode(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_trunk_mode(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.set_trunk_mode(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct VlanNumberBody {
    number: u16,
}

async fn set_access_vlan(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
    Json(body): Json<VlanNumberBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.set_access_vlan(&name, body.number).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_access_vlan(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.remove_access_vlan(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn configure_native_vlan(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
    Json(body): Json<VlanNumberBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.configure_native_vlan(&name, body.number).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_native_vlan(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.remove_native_vlan(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_trunk_vlan(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
    Json(body): Json<VlanNumberBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.add_trunk_vlan(&name, body.number).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_trunk_vlan(
    State(state): State<AppState>,
    Path((hostname, name, number)): Path<(String, String, u16)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.remove_trunk_vlan(&name, number).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct DescriptionBody {
    text: String,
}

async fn set_interface_description(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
    Json(body): Json<DescriptionBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.set_interface_description(&name, &body.text).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_interface_description(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.remove_interface_description(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SpanningTreeBody {
    edge: bool,
}

async fn edit_interface_spanning_tree(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
    Json(body): Json<SpanningTreeBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.edit_interface_spanning_tree(&name, body.edge).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn shutdown_interface(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.shutdown_interface(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn openup_interface(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.openup_interface(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct LldpBody {
    enabled: bool,
}

async fn enable_lldp(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
    Json(body): Json<LldpBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.enable_lldp(&name, body.enabled).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_interface_from_bond(
    State(state): State<AppState>,
    Path((hostname, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            let name = name.clone();
            Box::pin(async move { d.remove_interface_from_bond(&name).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_bonds(State(state): State<AppState>, Path(hostname): Path<String>) -> Result<Json<Vec<Bond>>, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    let bonds = state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.get_bonds().await }))
        .await?;
    Ok(Json(bonds))
}

async fn get_bond(
    State(state): State<AppState>,
    Path((hostname, number)): Path<(String, u32)>,
) -> Result<Json<Bond>, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    let bond = state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.get_bond(number).await }))
        .await?;
    Ok(Json(bond))
}

#[derive(Deserialize)]
struct BondNumberBody {
    number: u32,
}

async fn add_bond(
    State(state): State<AppState>,
    Path(hostname): Path<String>,
    Json(body): Json<BondNumberBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.add_bond(body.number).await }))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_bond(
    State(state): State<AppState>,
    Path((hostname, number)): Path<(String, u32)>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| Box::pin(async move { d.remove_bond(number).await }))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct BondMemberBody {
    interface: String,
}

async fn add_interface_to_bond(
    State(state): State<AppState>,
    Path((hostname, number)): Path<(String, u32)>,
    Json(body): Json<BondMemberBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            Box::pin(async move { d.add_interface_to_bond(&body.interface, number).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct LinkSpeedBody {
    speed: String,
}

async fn set_bond_link_speed(
    State(state): State<AppState>,
    Path((hostname, number)): Path<(String, u32)>,
    Json(body): Json<LinkSpeedBody>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_for_host(&state, &hostname).await?;
    state
        .sessions
        .with_driver(&session_id, |d| {
            Box::pin(async move { d.set_bond_link_speed(number, &body.speed).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Route handlers.
//!
//! Each handler decodes the body, calls one [`NodeControl`] operation and
//! wraps the result. Mutating calls answer `{"status": "ok"}`.

use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use bridge_core::{NodeControl, NodeDescription, NodeId, NodeSnapshot, ServiceMap, Slot};
use serde::{Deserialize, Serialize};
use shared_types::{Request, RequestResponse, StatusResponse};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handler state.
pub type AppState = Arc<dyn NodeControl>;

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeList {
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDetail {
    pub node: NodeDescription,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceList {
    pub services: ServiceMap,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlotList {
    pub slots: Vec<Slot>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

pub async fn create_node(
    State(control): State<AppState>,
    payload: Result<Json<NodeDescription>, JsonRejection>,
) -> ApiResult<NodeSnapshot> {
    let description = body(payload)?;
    info!(port = %description.port, "Create node requested");
    let snapshot = control.create_node(description).await?;
    Ok(Json(snapshot))
}

pub async fn list_nodes(State(control): State<AppState>) -> Json<NodeList> {
    Json(NodeList {
        nodes: control.list_nodes(),
    })
}

pub async fn get_node(
    State(control): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<NodeDetail> {
    let node = control.describe_node(&NodeId::from(id))?;
    Ok(Json(NodeDetail { node }))
}

pub async fn delete_node(
    State(control): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let id = NodeId::from(id);
    info!(node_id = %id, "Delete node requested");
    control.delete_node(&id).await?;
    Ok(Json(StatusResponse::ok()))
}

pub async fn list_services(
    State(control): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ServiceList> {
    let services = control.list_services(&NodeId::from(id))?;
    Ok(Json(ServiceList { services }))
}

pub async fn add_services(
    State(control): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ServiceMap>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let services = body(payload)?;
    control.add_services(&NodeId::from(id), services)?;
    Ok(Json(StatusResponse::ok()))
}

pub async fn remove_services(
    State(control): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ServiceMap>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let services = body(payload)?;
    control.remove_services(&NodeId::from(id), &services)?;
    Ok(Json(StatusResponse::ok()))
}

pub async fn list_slots(
    State(control): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SlotList> {
    let slots = control.list_slots(&NodeId::from(id))?;
    Ok(Json(SlotList { slots }))
}

pub async fn add_slot(
    State(control): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Slot>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let slot = body(payload)?;
    control.add_slot(&NodeId::from(id), slot)?;
    Ok(Json(StatusResponse::ok()))
}

pub async fn remove_slot(
    State(control): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Slot>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let slot = body(payload)?;
    control.remove_slot(&NodeId::from(id), &slot)?;
    Ok(Json(StatusResponse::ok()))
}

pub async fn relay_request(
    State(control): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Request>, JsonRejection>,
) -> ApiResult<RequestResponse> {
    let request = body(payload)?;
    debug!(node_id = %id, topic = %request.topic, "Relay requested");
    let response = control.request(&NodeId::from(id), request).await?;
    Ok(Json(response))
}

/// Liveness of the control plane itself.
pub async fn health_check() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

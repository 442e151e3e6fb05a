//! Request and response bodies of the target API

use serde::{Deserialize, Serialize};

use crate::storage::{HistoryRecord, NewTarget, Target, TargetId};

/// Body of `POST /api/fetcher`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateTargetRequest {
    pub url: String,

    /// Polling interval in seconds
    pub interval: u32,
}

impl From<CreateTargetRequest> for NewTarget {
    fn from(request: CreateTargetRequest) -> Self {
        NewTarget::new(request.url, request.interval)
    }
}

/// Response of `POST /api/fetcher`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedResponse {
    pub id: TargetId,
}

/// One entry of `GET /api/fetcher`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetResponse {
    pub id: TargetId,
    pub url: String,
    pub interval: u32,
}

impl From<Target> for TargetResponse {
    fn from(target: Target) -> Self {
        Self {
            id: target.id,
            url: target.url,
            interval: target.interval_secs,
        }
    }
}

/// One entry of `GET /api/fetcher/{id}/history`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    pub response: String,

    /// Fetch duration in seconds
    pub duration: f64,

    /// Unix timestamp in seconds
    pub created_at: i64,
}

impl From<HistoryRecord> for HistoryResponse {
    fn from(record: HistoryRecord) -> Self {
        Self {
            response: record.response,
            duration: record.duration_secs,
            created_at: record.created_at.timestamp(),
        }
    }
}

/// Response of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage_healthy: bool,

    /// Targets with a fetch in progress, absent without a scheduler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_flight: Option<usize>,
}

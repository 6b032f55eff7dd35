//! Viewer push protocol.
//!
//! Client to server: `{"type":"subscribe","subjectId":"42"}`.
//! Server to client: `{"type":"status_update","subjectId":"42","text":"...","status":"ready"}`.

use serde::{Deserialize, Serialize};

use crate::models::{DiagnosisStatus, StatusChanged};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        #[serde(rename = "subjectId")]
        subject_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StatusUpdate {
        #[serde(rename = "subjectId")]
        subject_id: String,
        text: String,
        status: DiagnosisStatus,
    },
}

impl From<&StatusChanged> for ServerMessage {
    fn from(event: &StatusChanged) -> Self {
        Self::StatusUpdate {
            subject_id: event.subject_id.clone(),
            text: event.text.clone(),
            status: event.status,
        }
    }
}

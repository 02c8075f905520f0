use mindmap_core::{MindMapGraph, MindMapNode};
use serde::{Deserialize, Serialize};

/// Browser upload: one or more base64-encoded files; only the first is
/// analyzed.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickRequest {
    pub node_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub status: String,
    pub title: String,
    pub selected: Option<MindMapNode>,
    pub graph: MindMapGraph,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickResponse {
    pub session_id: String,
    pub selected: MindMapNode,
    pub graph: MindMapGraph,
}

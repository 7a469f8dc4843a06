use serde::{Deserialize, Serialize};

// POST /summarize request body
#[derive(Deserialize, Debug)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub text: Option<String>,
}

// POST /summarize response body
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub summary: String,
    pub bullet_points: Vec<String>,
}

// DELETE /delete success body
#[derive(Serialize, Deserialize, Debug)]
pub struct MessageBody {
    pub message: String,
}

// Body of every error response
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

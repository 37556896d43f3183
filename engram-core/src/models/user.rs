use serde::{Deserialize, Serialize};

/// Human identity. Referenced weakly by memories and conversations; owned
/// spaces cascade on `delete(cascade = true)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: i64,
}

//! configuration template type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// a prioritised NetJSON template.
///
/// templates are authored through the admin surface and read-only to the
/// reconciler. lower priority merges first, so higher-priority templates
/// win on conflicting keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTemplate {
    /// unique identifier.
    pub id: u64,

    /// owning organisation, if scoped.
    pub org_id: Option<u64>,

    /// template name, unique per organisation.
    pub name: String,

    /// merge priority; lower merges first.
    pub priority: i32,

    /// the NetJSON object body.
    pub netjson: serde_json::Value,

    /// optional json schema for the variable bag.
    pub vars_schema: Option<serde_json::Value>,

    /// creation timestamp.
    pub created_at: DateTime<Utc>,

    /// last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

//! config template entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};
use tracing::warn;

use wispd_types::ConfigTemplate;

/// config template database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "config_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub org_id: Option<i64>,

    pub name: String,

    /// lower merges first
    pub priority: i32,

    /// json-serialized netjson body
    #[sea_orm(column_type = "Text")]
    pub netjson: String,

    /// json-serialized vars schema
    #[sea_orm(column_type = "Text", nullable)]
    pub vars_schema: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ConfigTemplate {
    fn from(model: Model) -> Self {
        let netjson = match serde_json::from_str(&model.netjson) {
            Ok(value) => value,
            Err(e) => {
                warn!(template_id = model.id, error = %e, "failed to parse template netjson, using empty object");
                serde_json::Value::Object(Default::default())
            }
        };
        let vars_schema = model
            .vars_schema
            .as_ref()
            .and_then(|raw| match serde_json::from_str(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(template_id = model.id, error = %e, "failed to parse template vars_schema");
                    None
                }
            });

        ConfigTemplate {
            id: model.id as u64,
            org_id: model.org_id.map(|id| id as u64),
            name: model.name,
            priority: model.priority,
            netjson,
            vars_schema,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&ConfigTemplate> for ActiveModel {
    fn from(template: &ConfigTemplate) -> Self {
        let netjson =
            serde_json::to_string(&template.netjson).unwrap_or_else(|_| "{}".to_string());
        let vars_schema = template
            .vars_schema
            .as_ref()
            .and_then(|v| serde_json::to_string(v).ok());

        ActiveModel {
            id: if template.id == 0 {
                NotSet
            } else {
                Set(template.id as i64)
            },
            org_id: Set(template.org_id.map(|id| id as i64)),
            name: Set(template.name.clone()),
            priority: Set(template.priority),
            netjson: Set(netjson),
            vars_schema: Set(vars_schema),
            created_at: Set(template.created_at),
            updated_at: Set(template.updated_at),
        }
    }
}

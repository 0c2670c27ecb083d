use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{config::PlanConf, error::PlanResult};

/// `database.table` name of a catalog object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    pub table: String,
    pub database: Option<String>,
}

impl TableIdentifier {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), database: None }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// Table or view descriptor handed over by the catalog.
///
/// The plan only reads the properties a view captured at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogTable {
    pub identifier: Option<TableIdentifier>,
    pub properties: IndexMap<String, String>,
}

impl CatalogTable {
    /// Property prefix of the settings a view captured when it was created.
    pub const VIEW_SQL_CONFIG_PREFIX: &'static str = "view.sqlConfig.";

    pub fn new(identifier: TableIdentifier) -> Self {
        Self { identifier: Some(identifier), properties: IndexMap::new() }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Captured settings with the prefix stripped.
    pub fn view_sql_configs(&self) -> IndexMap<String, String> {
        self.properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(Self::VIEW_SQL_CONFIG_PREFIX).map(|key| (key.to_string(), v.clone()))
            })
            .collect()
    }

    /// Options as they were when the view was created, on top of the defaults.
    pub fn captured_conf(&self) -> PlanResult<PlanConf> {
        let configs = self.view_sql_configs();
        PlanConf::from_pairs(configs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Storage description of an `INSERT OVERWRITE DIRECTORY` target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogStorageFormat {
    pub location: Option<String>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub serde: Option<String>,
    pub compressed: bool,
    pub properties: IndexMap<String, String>,
}

//! `meta.k8s.io/v1` table rendering for command-line clients.

use serde::{Deserialize, Serialize};

use crate::types::{ApiServer, ApiServerList, ListMeta};

/// Column definition of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumnDefinition {
    /// Column header.
    pub name: String,
    /// OpenAPI type of the cells.
    #[serde(rename = "type")]
    pub type_: String,
    /// Optional OpenAPI format.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Column description.
    pub description: String,
    /// Display priority; 0 is always shown.
    pub priority: i32,
}

/// One row of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cell values, one per column.
    pub cells: Vec<serde_json::Value>,
    /// The object the row was rendered from.
    pub object: serde_json::Value,
}

/// A `meta.k8s.io/v1` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Always `Table`.
    pub kind: String,
    /// Always `meta.k8s.io/v1`.
    pub api_version: String,
    /// List metadata.
    pub metadata: ListMeta,
    /// Columns.
    pub column_definitions: Vec<TableColumnDefinition>,
    /// Rows.
    pub rows: Vec<TableRow>,
}

/// Objects that can be rendered as a table.
pub trait ToTable {
    /// Render `self` as a table.
    fn to_table(&self) -> Table;
}

fn column(name: &str, format: &str, description: &str) -> TableColumnDefinition {
    TableColumnDefinition {
        name: name.to_owned(),
        type_: "string".to_owned(),
        format: format.to_owned(),
        description: description.to_owned(),
        priority: 0,
    }
}

fn definitions() -> Vec<TableColumnDefinition> {
    vec![
        column("Name", "name", "the name of the SAEAPIServer"),
        column("Region", "", "the region of the SAEAPIServer"),
        column("AK", "", "the accessKeyId of the SAEAPIServer"),
    ]
}

fn table(rows: Vec<TableRow>) -> Table {
    Table {
        kind: "Table".to_owned(),
        api_version: "meta.k8s.io/v1".to_owned(),
        metadata: ListMeta::default(),
        column_definitions: definitions(),
        rows,
    }
}

impl ApiServer {
    fn row(&self) -> TableRow {
        // Rows embed partial object metadata only, never the secret.
        let object = serde_json::json!({
            "kind": "PartialObjectMetadata",
            "apiVersion": "meta.k8s.io/v1",
            "metadata": self.metadata,
        });
        TableRow {
            cells: vec![
                self.metadata.name.clone().into(),
                self.spec.region_or_default().into(),
                self.spec.access_key_id.clone().into(),
            ],
            object,
        }
    }
}

impl ToTable for ApiServer {
    fn to_table(&self) -> Table {
        table(vec![self.row()])
    }
}

impl ToTable for ApiServerList {
    fn to_table(&self) -> Table {
        table(self.items.iter().map(ApiServer::row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiServerSpec, ObjectMeta};

    fn server(name: &str, region: &str) -> ApiServer {
        ApiServer::new(
            ObjectMeta::named(name),
            ApiServerSpec {
                access_key_id: format!("ak-{name}"),
                access_key_secret: "sk".to_owned(),
                region: region.to_owned(),
            },
        )
    }

    #[test]
    fn test_should_render_single_row() {
        let t = server("prod", "cn-beijing").to_table();
        assert_eq!(t.column_definitions.len(), 3);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].cells[0], "prod");
        assert_eq!(t.rows[0].cells[1], "cn-beijing");
        assert_eq!(t.rows[0].cells[2], "ak-prod");
    }

    #[test]
    fn test_should_render_list_with_default_region() {
        let list = ApiServerList::new(vec![server("a", ""), server("b", "cn-shanghai")]);
        let t = list.to_table();
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0].cells[1], "cn-hangzhou");
        assert_eq!(t.rows[1].cells[1], "cn-shanghai");
    }

    #[test]
    fn test_should_not_leak_secret_into_rows() {
        let t = server("prod", "").to_table();
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("accessKeySecret"));
    }
}

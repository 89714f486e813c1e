// SPDX-License-Identifier: Apache-2.0

use tablechat_core::{ParamType, ToolDefinition};

/// Every tool the registry knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListTables,
    GetTableDetails,
    GetRelatedTables,
    ExecuteSql,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::ListTables,
        ToolKind::GetTableDetails,
        ToolKind::GetRelatedTables,
        ToolKind::ExecuteSql,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::ListTables => "list_tables",
            ToolKind::GetTableDetails => "get_table_details",
            ToolKind::GetRelatedTables => "get_related_tables",
            ToolKind::ExecuteSql => "execute_sql",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolKind::ListTables => ToolDefinition::new(
                self.name(),
                "List the tables of a Unity Catalog schema. Returns every table name with its type and comment.",
            )
            .param("catalog", ParamType::String, "Catalog name (e.g. demo)", true)
            .param("schema", ParamType::String, "Schema name (e.g. sales)", true),

            ToolKind::GetTableDetails => ToolDefinition::new(
                self.name(),
                "Describe one Unity Catalog table: its type, comment, and every column with data type and comment.",
            )
            .param("catalog", ParamType::String, "Catalog name (e.g. demo)", true)
            .param("schema", ParamType::String, "Schema name (e.g. sales)", true)
            .param("table", ParamType::String, "Table name", true),

            ToolKind::GetRelatedTables => ToolDefinition::new(
                self.name(),
                "Find tables related to a table through foreign keys: tables that reference it and tables it references, with the joining columns.",
            )
            .param("catalog", ParamType::String, "Catalog name (e.g. demo)", true)
            .param("schema", ParamType::String, "Schema name (e.g. sales)", true)
            .param("table", ParamType::String, "Table name", true),

            ToolKind::ExecuteSql => ToolDefinition::new(
                self.name(),
                "Run a read-only SQL query (SELECT, SHOW, EXPLAIN) in a schema and return at most 50 rows.",
            )
            .param("query", ParamType::String, "SQL query to run", true)
            .param("catalog", ParamType::String, "Default catalog for unqualified names", true)
            .param("schema", ParamType::String, "Default schema for unqualified names", true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.definition().name, kind.name());
        }
        assert_eq!(ToolKind::from_name("drop_table"), None);
    }

    #[test]
    fn required_parameters() {
        let list = ToolKind::ListTables.definition();
        assert_eq!(list.required_params().collect::<Vec<_>>(), vec!["catalog", "schema"]);

        let details = ToolKind::GetRelatedTables.definition();
        assert_eq!(
            details.required_params().collect::<Vec<_>>(),
            vec!["catalog", "schema", "table"]
        );
    }
}

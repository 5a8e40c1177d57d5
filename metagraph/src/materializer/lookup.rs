// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fixed traversals completing entities and tables

use crate::backend::literal::string_literal;
use crate::backend::GraphBackend;
use crate::error::Result;
use crate::ontology::labels;

/// Tables implementing an entity, returned in column `t`
pub fn tables_query(backend: &dyn GraphBackend, entity_id: &str) -> Result<String> {
    Ok(format!(
        "MATCH (e:{entity})-[:{implements}]->(t:{table}) WHERE ID(e) = {id} RETURN t",
        entity = backend.label(labels::DATA_ENTITY),
        implements = backend.label(labels::IMPLEMENTS),
        table = backend.label(labels::PHYSICAL_TABLE),
        id = backend.id_literal(entity_id)?,
    ))
}

/// Columns of a table, returned in column `c`
pub fn columns_query(backend: &dyn GraphBackend, full_table_name: &str) -> String {
    format!(
        "MATCH (t:{table} {{full_table_name: {name}}})-[:{has_column}]->(c:{column}) RETURN c",
        table = backend.label(labels::PHYSICAL_TABLE),
        name = string_literal(full_table_name),
        has_column = backend.label(labels::HAS_COLUMN),
        column = backend.label(labels::COLUMN),
    )
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Type registry mapping raw records onto metamodel types
//!
//! Dispatch walks the factories in registration order and picks the first
//! whose `fit` accepts the record. The fallback factory accepts everything
//! and is always consulted last, so dispatch is total.

use super::{
    labels, Application, BusinessDomain, BusinessTerm, Column, DataEntity, FlowsTo, MetaObject,
    MetaValue, PhysicalTable, RelatedTo, Relationship,
};
use crate::backend::raw::RawRecord;
use crate::error::{GraphError, Result};
use std::sync::Arc;

/// Fetches the secondary records a factory needs to complete an object
pub trait SecondaryLookup {
    /// Physical tables implementing the entity with the given identity
    fn resolve_tables(&self, entity_id: &str) -> Result<Vec<Arc<PhysicalTable>>>;

    /// Columns of the table with the given fully qualified name
    fn resolve_columns(&self, full_table_name: &str) -> Result<Vec<Column>>;
}

/// Recognizes and builds one metamodel type
pub trait MetaFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this factory handles the record
    fn fit(&self, record: RawRecord<'_>) -> bool;

    /// Build the value from the record's own properties. Fails with a
    /// malformed-record error when a required property is missing or null.
    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue>;

    /// Complete a parsed value with secondary records
    fn resolve(&self, value: MetaValue, _lookup: &dyn SecondaryLookup) -> Result<MetaValue> {
        Ok(value)
    }
}

fn required(record: RawRecord<'_>, key: &str) -> Result<String> {
    record
        .property(key)
        .and_then(|value| value.to_plain_string())
        .ok_or_else(|| GraphError::malformed(record.label(), record.id(), key))
}

fn optional(record: RawRecord<'_>, key: &str) -> String {
    record
        .property(key)
        .and_then(|value| value.to_plain_string())
        .unwrap_or_default()
}

fn is_vertex_labeled(record: RawRecord<'_>, label: &str) -> bool {
    record.is_vertex() && record.label() == label
}

fn is_edge_labeled(record: RawRecord<'_>, label: &str) -> bool {
    record.is_edge() && record.label() == label
}

/// Edge endpoints, absent for vertices
fn endpoints(record: RawRecord<'_>) -> (String, String) {
    match record {
        RawRecord::Edge(e) => (e.from_id.clone(), e.to_id.clone()),
        RawRecord::Vertex(_) => (String::new(), String::new()),
    }
}

pub struct BusinessDomainFactory;

impl MetaFactory for BusinessDomainFactory {
    fn name(&self) -> &'static str {
        labels::BUSINESS_DOMAIN
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_vertex_labeled(record, labels::BUSINESS_DOMAIN)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        Ok(MetaObject::BusinessDomain(Arc::new(BusinessDomain {
            id: record.id().to_string(),
            name: required(record, "name")?,
            node: record.label().to_string(),
            code: required(record, "code")?,
        }))
        .into())
    }
}

pub struct ApplicationFactory;

impl MetaFactory for ApplicationFactory {
    fn name(&self) -> &'static str {
        labels::APPLICATION
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_vertex_labeled(record, labels::APPLICATION)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        Ok(MetaObject::Application(Arc::new(Application {
            id: record.id().to_string(),
            name: required(record, "name")?,
            node: record.label().to_string(),
        }))
        .into())
    }
}

/// Builds entities and fills their implementing tables
pub struct DataEntityFactory;

impl MetaFactory for DataEntityFactory {
    fn name(&self) -> &'static str {
        labels::DATA_ENTITY
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_vertex_labeled(record, labels::DATA_ENTITY)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        Ok(MetaObject::DataEntity(Arc::new(DataEntity {
            id: record.id().to_string(),
            name: required(record, "name")?,
            node: record.label().to_string(),
            tables: Vec::new(),
        }))
        .into())
    }

    fn resolve(&self, value: MetaValue, lookup: &dyn SecondaryLookup) -> Result<MetaValue> {
        match value {
            MetaValue::Object(MetaObject::DataEntity(entity)) => {
                let mut entity = Arc::try_unwrap(entity).unwrap_or_else(|shared| (*shared).clone());
                entity.tables = lookup.resolve_tables(&entity.id)?;
                Ok(MetaObject::DataEntity(Arc::new(entity)).into())
            }
            other => Ok(other),
        }
    }
}

/// Builds physical tables and fills their columns
pub struct PhysicalTableFactory;

impl MetaFactory for PhysicalTableFactory {
    fn name(&self) -> &'static str {
        labels::PHYSICAL_TABLE
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_vertex_labeled(record, labels::PHYSICAL_TABLE)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        Ok(MetaObject::PhysicalTable(Arc::new(PhysicalTable {
            id: record.id().to_string(),
            name: required(record, "name")?,
            node: record.label().to_string(),
            db_schema: required(record, "schema")?,
            table_name: required(record, "table_name")?,
            full_table_name: required(record, "full_table_name")?,
            columns: Vec::new(),
        }))
        .into())
    }

    fn resolve(&self, value: MetaValue, lookup: &dyn SecondaryLookup) -> Result<MetaValue> {
        match value {
            MetaValue::Object(MetaObject::PhysicalTable(table)) => {
                let mut table = Arc::try_unwrap(table).unwrap_or_else(|shared| (*shared).clone());
                table.columns = lookup.resolve_columns(&table.full_table_name)?;
                Ok(MetaObject::PhysicalTable(Arc::new(table)).into())
            }
            other => Ok(other),
        }
    }
}

pub struct ColumnFactory;

impl ColumnFactory {
    /// Parse straight into a column, as the column lookup needs
    pub fn parse_column(&self, record: RawRecord<'_>) -> Result<Column> {
        Ok(Column {
            id: record.id().to_string(),
            name: required(record, "name")?,
            node: record.label().to_string(),
            dtype: required(record, "dtype")?,
        })
    }
}

impl MetaFactory for ColumnFactory {
    fn name(&self) -> &'static str {
        labels::COLUMN
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_vertex_labeled(record, labels::COLUMN)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        Ok(MetaObject::Column(Arc::new(self.parse_column(record)?)).into())
    }
}

pub struct BusinessTermFactory;

impl MetaFactory for BusinessTermFactory {
    fn name(&self) -> &'static str {
        labels::BUSINESS_TERM
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_vertex_labeled(record, labels::BUSINESS_TERM)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        Ok(MetaObject::BusinessTerm(Arc::new(BusinessTerm {
            id: record.id().to_string(),
            name: required(record, "name")?,
            node: record.label().to_string(),
            definition: required(record, "definition")?,
            owner: required(record, "owner")?,
            status: required(record, "status")?,
        }))
        .into())
    }
}

pub struct RelatedToFactory;

impl MetaFactory for RelatedToFactory {
    fn name(&self) -> &'static str {
        "RelatedTo"
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_edge_labeled(record, labels::RELATED_TO)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        let (from_id, to_id) = endpoints(record);
        Ok(Relationship::RelatedTo(RelatedTo {
            from_id,
            to_id,
            id: record.id().to_string(),
            rel: optional(record, "rel"),
        })
        .into())
    }
}

pub struct FlowsToFactory;

impl MetaFactory for FlowsToFactory {
    fn name(&self) -> &'static str {
        "FlowsTo"
    }

    fn fit(&self, record: RawRecord<'_>) -> bool {
        is_edge_labeled(record, labels::FLOWS_TO)
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        let (from_id, to_id) = endpoints(record);
        Ok(Relationship::FlowsTo(FlowsTo {
            from_id,
            to_id,
            id: record.id().to_string(),
        })
        .into())
    }
}

/// Accepts any record and renders it as text
pub struct FallbackFactory;

impl MetaFactory for FallbackFactory {
    fn name(&self) -> &'static str {
        "Others"
    }

    fn fit(&self, _record: RawRecord<'_>) -> bool {
        true
    }

    fn parse(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        Ok(MetaValue::Text(record.to_string()))
    }
}

/// Ordered collection of factories with a terminal fallback
pub struct TypeRegistry {
    factories: Vec<Arc<dyn MetaFactory>>,
    fallback: Arc<dyn MetaFactory>,
}

impl TypeRegistry {
    /// Registry holding only the fallback
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
            fallback: Arc::new(FallbackFactory),
        }
    }

    /// Registry holding every metamodel type
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry
            .register(BusinessTermFactory)
            .register(BusinessDomainFactory)
            .register(ApplicationFactory)
            .register(DataEntityFactory)
            .register(PhysicalTableFactory)
            .register(ColumnFactory)
            .register(FlowsToFactory)
            .register(RelatedToFactory);
        registry
    }

    /// Append a factory; it is consulted after those already registered
    /// and before the fallback
    pub fn register(&mut self, factory: impl MetaFactory + 'static) -> &mut Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// The first factory that fits, or the fallback
    pub fn dispatch(&self, record: RawRecord<'_>) -> &dyn MetaFactory {
        self.factories
            .iter()
            .find(|factory| factory.fit(record))
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    /// Factory names in dispatch order, fallback last
    pub fn names(&self) -> Vec<&'static str> {
        self.factories
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|factory| factory.name())
            .collect()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data-governance metamodel
//!
//! Typed counterparts of the graph's node and relationship labels. Node
//! objects are shared through `Arc` so the identity cache can hand the same
//! instance to every row that references a record; equality and hashing use
//! the record identity only.

pub mod registry;

pub use registry::{
    ApplicationFactory, BusinessDomainFactory, BusinessTermFactory, ColumnFactory,
    DataEntityFactory, FallbackFactory, FlowsToFactory, MetaFactory, PhysicalTableFactory,
    RelatedToFactory, SecondaryLookup, TypeRegistry,
};

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Graph labels of the metamodel
pub mod labels {
    pub const BUSINESS_DOMAIN: &str = "BusinessDomain";
    pub const APPLICATION: &str = "Application";
    pub const DATA_ENTITY: &str = "DataEntity";
    pub const PHYSICAL_TABLE: &str = "PhysicalTable";
    pub const COLUMN: &str = "Column";
    pub const BUSINESS_TERM: &str = "BusinessTerm";

    pub const RELATED_TO: &str = "RELATED_TO";
    pub const FLOWS_TO: &str = "FLOWS_TO";
    pub const IMPLEMENTS: &str = "IMPLEMENTS";
    pub const HAS_COLUMN: &str = "HAS_COLUMN";
}

#[derive(Debug, Clone, Serialize)]
pub struct BusinessDomain {
    pub id: String,
    pub name: String,
    pub node: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub node: String,
}

/// A logical entity; `tables` holds the physical tables implementing it
#[derive(Debug, Clone, Serialize)]
pub struct DataEntity {
    pub id: String,
    pub name: String,
    pub node: String,
    pub tables: Vec<Arc<PhysicalTable>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhysicalTable {
    pub id: String,
    pub name: String,
    pub node: String,
    #[serde(rename = "schema")]
    pub db_schema: String,
    pub table_name: String,
    pub full_table_name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub id: String,
    pub name: String,
    pub node: String,
    pub dtype: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BusinessTerm {
    pub id: String,
    pub name: String,
    pub node: String,
    pub definition: String,
    pub owner: String,
    pub status: String,
}

macro_rules! identity_by_id {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl Eq for $ty {}

            impl Hash for $ty {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }
        )*
    };
}

identity_by_id!(BusinessDomain, Application, DataEntity, PhysicalTable, Column, BusinessTerm);

/// A materialized node of the metamodel
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MetaObject {
    BusinessDomain(Arc<BusinessDomain>),
    Application(Arc<Application>),
    DataEntity(Arc<DataEntity>),
    PhysicalTable(Arc<PhysicalTable>),
    Column(Arc<Column>),
    BusinessTerm(Arc<BusinessTerm>),
}

impl MetaObject {
    pub fn id(&self) -> &str {
        match self {
            MetaObject::BusinessDomain(o) => &o.id,
            MetaObject::Application(o) => &o.id,
            MetaObject::DataEntity(o) => &o.id,
            MetaObject::PhysicalTable(o) => &o.id,
            MetaObject::Column(o) => &o.id,
            MetaObject::BusinessTerm(o) => &o.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MetaObject::BusinessDomain(o) => &o.name,
            MetaObject::Application(o) => &o.name,
            MetaObject::DataEntity(o) => &o.name,
            MetaObject::PhysicalTable(o) => &o.name,
            MetaObject::Column(o) => &o.name,
            MetaObject::BusinessTerm(o) => &o.name,
        }
    }

    /// The label the object was built from
    pub fn node(&self) -> &str {
        match self {
            MetaObject::BusinessDomain(o) => &o.node,
            MetaObject::Application(o) => &o.node,
            MetaObject::DataEntity(o) => &o.node,
            MetaObject::PhysicalTable(o) => &o.node,
            MetaObject::Column(o) => &o.node,
            MetaObject::BusinessTerm(o) => &o.node,
        }
    }

    /// True when both values share one allocation, i.e. came from the same
    /// identity-cache entry
    pub fn same_instance(&self, other: &MetaObject) -> bool {
        match (self, other) {
            (MetaObject::BusinessDomain(a), MetaObject::BusinessDomain(b)) => Arc::ptr_eq(a, b),
            (MetaObject::Application(a), MetaObject::Application(b)) => Arc::ptr_eq(a, b),
            (MetaObject::DataEntity(a), MetaObject::DataEntity(b)) => Arc::ptr_eq(a, b),
            (MetaObject::PhysicalTable(a), MetaObject::PhysicalTable(b)) => Arc::ptr_eq(a, b),
            (MetaObject::Column(a), MetaObject::Column(b)) => Arc::ptr_eq(a, b),
            (MetaObject::BusinessTerm(a), MetaObject::BusinessTerm(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for MetaObject {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for MetaObject {}

impl Hash for MetaObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelatedTo {
    pub from_id: String,
    pub to_id: String,
    pub id: String,
    pub rel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FlowsTo {
    pub from_id: String,
    pub to_id: String,
    pub id: String,
}

/// A materialized relationship; equality is structural
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Relationship {
    RelatedTo(RelatedTo),
    FlowsTo(FlowsTo),
}

impl Relationship {
    pub fn id(&self) -> &str {
        match self {
            Relationship::RelatedTo(r) => &r.id,
            Relationship::FlowsTo(r) => &r.id,
        }
    }
}

/// One value of a materialized result row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Object(MetaObject),
    Relation(Relationship),
    /// A primitive returned by the query (string, number, boolean, null)
    Scalar(JsonValue),
    /// Textual rendering of a record no factory recognized
    Text(String),
}

impl MetaValue {
    pub fn as_object(&self) -> Option<&MetaObject> {
        match self {
            MetaValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relationship> {
        match self {
            MetaValue::Relation(r) => Some(r),
            _ => None,
        }
    }
}

impl From<MetaObject> for MetaValue {
    fn from(object: MetaObject) -> Self {
        MetaValue::Object(object)
    }
}

impl From<Relationship> for MetaValue {
    fn from(relation: Relationship) -> Self {
        MetaValue::Relation(relation)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column(id={}, name={}, dtype={})", self.id, self.name, self.dtype)
    }
}

impl fmt::Display for PhysicalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.dtype))
            .collect();
        write!(
            f,
            "PhysicalTable(id={}, name={}, schema={}, table_name={}, full_table_name={}, columns=[{}])",
            self.id,
            self.name,
            self.db_schema,
            self.table_name,
            self.full_table_name,
            columns.join(", ")
        )
    }
}

impl fmt::Display for DataEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables: Vec<String> = self.tables.iter().map(|t| t.to_string()).collect();
        write!(
            f,
            "DataEntity(id={}, name={}, tables=[{}])",
            self.id,
            self.name,
            tables.join(", ")
        )
    }
}

impl fmt::Display for MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaObject::BusinessDomain(o) => {
                write!(f, "BusinessDomain(id={}, name={}, code={})", o.id, o.name, o.code)
            }
            MetaObject::Application(o) => write!(f, "Application(id={}, name={})", o.id, o.name),
            MetaObject::DataEntity(o) => write!(f, "{}", o),
            MetaObject::PhysicalTable(o) => write!(f, "{}", o),
            MetaObject::Column(o) => write!(f, "{}", o),
            MetaObject::BusinessTerm(o) => write!(
                f,
                "BusinessTerm(id={}, name={}, definition={}, owner={}, status={})",
                o.id, o.name, o.definition, o.owner, o.status
            ),
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::RelatedTo(r) => write!(
                f,
                "RelatedTo(id={}, from_id={}, to_id={}, rel={})",
                r.id, r.from_id, r.to_id, r.rel
            ),
            Relationship::FlowsTo(r) => {
                write!(f, "FlowsTo(id={}, from_id={}, to_id={})", r.id, r.from_id, r.to_id)
            }
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Object(o) => write!(f, "{}", o),
            MetaValue::Relation(r) => write!(f, "{}", r),
            MetaValue::Scalar(JsonValue::String(s)) => write!(f, "{}", s),
            MetaValue::Scalar(v) => write!(f, "{}", v),
            MetaValue::Text(t) => write!(f, "{}", t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(id: &str, name: &str) -> PhysicalTable {
        PhysicalTable {
            id: id.to_string(),
            name: name.to_string(),
            node: labels::PHYSICAL_TABLE.to_string(),
            db_schema: "ods".to_string(),
            table_name: name.to_string(),
            full_table_name: format!("ods.{}", name),
            columns: vec![],
        }
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = MetaObject::PhysicalTable(Arc::new(table("1", "t_bank")));
        let b = MetaObject::PhysicalTable(Arc::new(table("1", "renamed")));
        let c = MetaObject::PhysicalTable(Arc::new(table("2", "t_bank")));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.same_instance(&b));
        assert!(a.same_instance(&a.clone()));
    }

    #[test]
    fn relationships_compare_structurally() {
        let a = Relationship::FlowsTo(FlowsTo {
            from_id: "1".to_string(),
            to_id: "2".to_string(),
            id: "10".to_string(),
        });
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn entity_rendering_includes_tables() {
        let mut t = table("1", "t_bank");
        t.columns.push(Column {
            id: "5".to_string(),
            name: "bank_id".to_string(),
            node: labels::COLUMN.to_string(),
            dtype: "BIGINT".to_string(),
        });
        let entity = DataEntity {
            id: "9".to_string(),
            name: "银行".to_string(),
            node: labels::DATA_ENTITY.to_string(),
            tables: vec![Arc::new(t)],
        };
        let text = MetaValue::Object(MetaObject::DataEntity(Arc::new(entity))).to_string();

        assert!(text.starts_with("DataEntity(id=9, name=银行"));
        assert!(text.contains("full_table_name=ods.t_bank"));
        assert!(text.contains("bank_id BIGINT"));
    }

    #[test]
    fn serializes_without_variant_tags() {
        let value = MetaValue::Scalar(serde_json::json!(3));
        assert_eq!(serde_json::to_string(&value).unwrap(), "3");
    }
}

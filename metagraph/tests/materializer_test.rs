// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Integration tests for result materialization
//!
//! Rows come from a scripted backend so every secondary lookup the
//! materializer issues can be observed.

mod testutils;

use metagraph::ontology::{MetaObject, PhysicalTable, Relationship, SecondaryLookup};
use metagraph::{GraphError, IdentityCache, MetaValue, RawValue, ResultMaterializer};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use testutils::*;

const ENTITY_QUERY: &str = "MATCH (e:DataEntity {name: '银行'}) RETURN e";

fn materializer(backend: Arc<ScriptedBackend>) -> ResultMaterializer {
    ResultMaterializer::new(backend)
        .with_cache(Arc::new(IdentityCache::new(200, Duration::from_secs(3000))))
}

/// Entity 1 implemented by table 100 with one column
fn bank_backend() -> ScriptedBackend {
    ScriptedBackend::new("age:g1")
        .on(
            &tables_marker("1"),
            vec![row(vec![("t", RawValue::Vertex(physical_table("100", "ods.t_bank")))])],
        )
        .on(
            &columns_marker("ods.t_bank"),
            vec![
                row(vec![("c", RawValue::Vertex(column("1000", "bank_id", "BIGINT")))]),
                row(vec![("c", RawValue::Vertex(column("1001", "bank_name", "VARCHAR")))]),
            ],
        )
}

fn entity_of(value: &MetaValue) -> Arc<metagraph::ontology::DataEntity> {
    match value {
        MetaValue::Object(MetaObject::DataEntity(entity)) => entity.clone(),
        other => panic!("expected data entity, got {:?}", other),
    }
}

#[test]
fn entity_is_resolved_with_tables_and_columns() {
    let backend = Arc::new(
        bank_backend().on(
            ENTITY_QUERY,
            vec![row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))])],
        ),
    );
    let response = materializer(backend.clone())
        .query(ENTITY_QUERY, "bank entity")
        .expect("query should materialize");

    assert_eq!(response.description, "bank entity");
    assert_eq!(response.contents.len(), 1);

    let entity = entity_of(&response.contents[0][0]);
    assert_eq!(entity.name, "银行");
    assert_eq!(entity.tables.len(), 1);
    assert_eq!(entity.tables[0].full_table_name, "ods.t_bank");
    let columns: Vec<&str> = entity.tables[0].columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["bank_id", "bank_name"]);
}

/// Table id, full name and column names, for comparing resolutions
fn table_summary(tables: &[Arc<PhysicalTable>]) -> Vec<(String, String, Vec<String>)> {
    tables
        .iter()
        .map(|t| {
            (
                t.id.clone(),
                t.full_table_name.clone(),
                t.columns.iter().map(|c| c.name.clone()).collect(),
            )
        })
        .collect()
}

#[test]
fn entity_without_implementing_tables_has_none() {
    let backend = Arc::new(ScriptedBackend::new("age:g1").on(
        ENTITY_QUERY,
        vec![row(vec![("e", RawValue::Vertex(data_entity("2", "客户")))])],
    ));
    let response = materializer(backend.clone())
        .query(ENTITY_QUERY, "")
        .expect("query should materialize");

    let entity = entity_of(&response.contents[0][0]);
    assert_eq!(entity.name, "客户");
    assert!(entity.tables.is_empty());
    assert_eq!(backend.count_issued(&tables_marker("2")), 1);
}

#[test]
fn table_resolution_is_stable_across_cache_state() {
    let backend = Arc::new(bank_backend());
    let warm = materializer(backend.clone());

    let first = warm.resolve_tables("1").expect("first resolution");
    warm.cache().clear();
    let after_clear = warm.resolve_tables("1").expect("resolution after clear");
    let fresh = materializer(backend.clone())
        .resolve_tables("1")
        .expect("resolution with a fresh cache");

    assert_eq!(table_summary(&first), table_summary(&after_clear));
    assert_eq!(table_summary(&first), table_summary(&fresh));
    assert_eq!(
        table_summary(&first),
        vec![(
            "100".to_string(),
            "ods.t_bank".to_string(),
            vec!["bank_id".to_string(), "bank_name".to_string()],
        )]
    );
    assert!(!Arc::ptr_eq(&first[0], &after_clear[0]));
    assert_eq!(backend.count_issued(&tables_marker("1")), 3);
}

#[test]
fn shared_cache_serves_concurrent_materializers() {
    let backend = Arc::new(bank_backend().on(
        ENTITY_QUERY,
        vec![row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))])],
    ));
    let cache = Arc::new(IdentityCache::new(200, Duration::from_secs(3000)));

    let summaries: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let backend = backend.clone();
                let cache = cache.clone();
                scope.spawn(move || {
                    let materializer = ResultMaterializer::new(backend).with_cache(cache);
                    (0..5)
                        .map(|_| {
                            let response = materializer
                                .query(ENTITY_QUERY, "")
                                .expect("query should materialize");
                            let entity = entity_of(&response.contents[0][0]);
                            (entity.id.clone(), table_summary(&entity.tables))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker thread"))
            .collect()
    });

    assert_eq!(summaries.len(), 40);
    assert!(summaries.iter().all(|summary| summary == &summaries[0]));

    let lookups = backend.count_issued(&tables_marker("1"));
    assert!((1..=8).contains(&lookups));
    materializer(backend.clone())
        .with_cache(cache.clone())
        .query(ENTITY_QUERY, "")
        .expect("warm query");
    assert_eq!(backend.count_issued(&tables_marker("1")), lookups);
}

#[test]
fn repeated_record_resolves_to_one_instance() {
    let backend = Arc::new(bank_backend().on(
        ENTITY_QUERY,
        vec![
            row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))]),
            row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))]),
        ],
    ));
    let response = materializer(backend.clone())
        .query(ENTITY_QUERY, "")
        .expect("query should materialize");

    let first = response.contents[0][0].as_object().expect("object");
    let second = response.contents[1][0].as_object().expect("object");
    assert!(first.same_instance(second));
    assert_eq!(backend.count_issued(&tables_marker("1")), 1);
}

#[test]
fn table_reached_twice_is_looked_up_once() {
    let query = "MATCH (e:DataEntity)-[:IMPLEMENTS]->(t:PhysicalTable) RETURN e, t";
    let backend = Arc::new(bank_backend().on(
        query,
        vec![row(vec![
            ("e", RawValue::Vertex(data_entity("1", "银行"))),
            ("t", RawValue::Vertex(physical_table("100", "ods.t_bank"))),
        ])],
    ));
    let response = materializer(backend.clone())
        .query(query, "")
        .expect("query should materialize");

    let entity = entity_of(&response.contents[0][0]);
    let table = response.contents[0][1].as_object().expect("object");
    assert!(MetaObject::PhysicalTable(entity.tables[0].clone()).same_instance(table));
    assert_eq!(backend.count_issued(&columns_marker("ods.t_bank")), 1);
}

#[test]
fn scalar_rows_keep_their_shape() {
    let query = "MATCH (t:PhysicalTable) RETURN t.full_table_name AS name, count(t) AS n, t.note AS note";
    let backend = Arc::new(ScriptedBackend::new("age:g1").on(
        query,
        vec![row(vec![
            ("name", text("ods.t_bank")),
            ("n", RawValue::Int(3)),
            ("note", RawValue::Null),
        ])],
    ));
    let response = materializer(backend).query(query, "").expect("query should materialize");

    assert_eq!(
        response.contents[0],
        vec![
            MetaValue::Scalar(serde_json::json!("ods.t_bank")),
            MetaValue::Scalar(serde_json::json!(3)),
            MetaValue::Scalar(serde_json::Value::Null),
        ]
    );
}

#[test]
fn path_elements_follow_traversal_order() {
    let query = "MATCH p = (a:DataEntity)-[:FLOWS_TO*1..2]->(b:DataEntity) RETURN p";
    let backend = Arc::new(ScriptedBackend::new("age:g1").on(
        query,
        vec![row(vec![(
            "p",
            path(
                vec![data_entity("1", "a"), data_entity("2", "b"), data_entity("3", "c")],
                vec![flows_to("10", "1", "2"), flows_to("11", "2", "3")],
            ),
        )])],
    ));
    let response = materializer(backend).query(query, "").expect("query should materialize");

    let ids: Vec<String> = response.contents[0]
        .iter()
        .map(|value| match value {
            MetaValue::Object(object) => object.id().to_string(),
            MetaValue::Relation(relation) => relation.id().to_string(),
            other => panic!("unexpected value {:?}", other),
        })
        .collect();
    assert_eq!(ids, vec!["1", "10", "2", "11", "3"]);
}

#[test]
fn variable_length_relationship_list_is_flattened() {
    let query = "MATCH (e1:DataEntity)-[r:RELATED_TO*1..2]->(e2:DataEntity) RETURN r";
    let backend = Arc::new(ScriptedBackend::new("age:g1").on(
        query,
        vec![row(vec![(
            "r",
            RawValue::List(vec![
                RawValue::Edge(related_to("20", "1", "2", "owns")),
                RawValue::Edge(related_to("21", "2", "3", "uses")),
            ]),
        )])],
    ));
    let response = materializer(backend).query(query, "").expect("query should materialize");

    assert_eq!(response.contents[0].len(), 2);
    match &response.contents[0][1] {
        MetaValue::Relation(Relationship::RelatedTo(rel)) => {
            assert_eq!(rel.rel, "uses");
            assert_eq!(rel.from_id, "2");
        }
        other => panic!("expected relationship, got {:?}", other),
    }
}

#[test]
fn empty_traversal_contributes_nothing() {
    let query = "MATCH (a:Application) RETURN a, []";
    let backend = Arc::new(ScriptedBackend::new("age:g1").on(
        query,
        vec![row(vec![
            ("a", RawValue::Vertex(application("5", "crm"))),
            ("column_1", RawValue::List(vec![])),
            ("p", path(vec![], vec![])),
        ])],
    ));
    let response = materializer(backend).query(query, "").expect("query should materialize");

    assert_eq!(response.contents[0].len(), 1);
}

#[test]
fn unknown_label_and_map_cells_become_text() {
    let query = "MATCH (d:Dashboard) RETURN d, {a: 1} AS m";
    let mut map = std::collections::BTreeMap::new();
    map.insert("a".to_string(), RawValue::Int(1));
    let backend = Arc::new(ScriptedBackend::new("age:g1").on(
        query,
        vec![row(vec![
            (
                "d",
                RawValue::Vertex(
                    metagraph::backend::RawVertex::new("8", "Dashboard")
                        .with_property("name", text("sales")),
                ),
            ),
            ("m", RawValue::Map(map)),
        ])],
    ));
    let response = materializer(backend).query(query, "").expect("query should materialize");

    assert!(matches!(&response.contents[0][0], MetaValue::Text(t) if t.contains("Dashboard")));
    assert!(matches!(&response.contents[0][1], MetaValue::Text(t) if t.contains("\"a\"")));
}

#[test]
fn repeated_query_yields_equal_contents() {
    let backend = Arc::new(bank_backend().on(
        ENTITY_QUERY,
        vec![row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))])],
    ));
    let materializer = materializer(backend.clone());

    let first = materializer.query(ENTITY_QUERY, "").expect("first run");
    let second = materializer.query(ENTITY_QUERY, "").expect("second run");

    assert_eq!(first.contents, second.contents);
    assert_ne!(first.query_id, second.query_id);
    assert_eq!(backend.count_issued(&tables_marker("1")), 1);
}

#[test]
fn malformed_table_fails_the_whole_call() {
    let query = "MATCH (t:PhysicalTable) RETURN t";
    let broken = metagraph::backend::RawVertex::new("100", "PhysicalTable")
        .with_property("name", text("t_bank"))
        .with_property("schema", text("ods"))
        .with_property("table_name", text("t_bank"));
    let backend = Arc::new(ScriptedBackend::new("age:g1").on(
        query,
        vec![
            row(vec![("t", RawValue::Vertex(physical_table("101", "ods.t_ok")))]),
            row(vec![("t", RawValue::Vertex(broken))]),
        ],
    ));
    let err = materializer(backend).query(query, "").unwrap_err();

    match err {
        GraphError::MalformedRecord { label, id, property } => {
            assert_eq!(label, "PhysicalTable");
            assert_eq!(id, "100");
            assert_eq!(property, "full_table_name");
        }
        other => panic!("expected malformed record, got {:?}", other),
    }
}

#[test]
fn backend_failure_surfaces_as_query_error() {
    let query = "MATCH (e:DataEntity) RETRUN e";
    let backend = Arc::new(
        ScriptedBackend::new("age:g1").fail_on("RETRUN", "syntax error at or near \"RETRUN\""),
    );
    let err = materializer(backend).query(query, "").unwrap_err();

    match err {
        GraphError::Query { query: failed, detail } => {
            assert_eq!(failed, query);
            assert!(detail.contains("syntax error"));
        }
        other => panic!("expected query error, got {:?}", other),
    }
}

#[test]
fn lookup_of_wrong_kind_is_unexpected_record() {
    let backend = Arc::new(
        ScriptedBackend::new("age:g1")
            .on(
                ENTITY_QUERY,
                vec![row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))])],
            )
            .on(&tables_marker("1"), vec![row(vec![("t", text("not a table"))])]),
    );
    let err = materializer(backend).query(ENTITY_QUERY, "").unwrap_err();

    assert!(matches!(err, GraphError::UnexpectedRecord { .. }));
}

#[test]
#[serial]
fn default_materializer_shares_the_process_cache() {
    let backend = Arc::new(bank_backend().on(
        ENTITY_QUERY,
        vec![row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))])],
    ));
    IdentityCache::global().invalidate_namespace("age:shared-test");

    let scoped = Arc::new(ScriptedBackend::new("age:shared-test").on(
        ENTITY_QUERY,
        vec![row(vec![("e", RawValue::Vertex(data_entity("1", "银行")))])],
    ));
    let first = ResultMaterializer::new(scoped.clone())
        .query(ENTITY_QUERY, "")
        .expect("first materializer");
    let second = ResultMaterializer::new(scoped.clone())
        .query(ENTITY_QUERY, "")
        .expect("second materializer");

    let a = first.contents[0][0].as_object().expect("object");
    let b = second.contents[0][0].as_object().expect("object");
    assert!(a.same_instance(b));
    assert!(Arc::ptr_eq(
        ResultMaterializer::new(backend).cache(),
        &IdentityCache::global()
    ));
}

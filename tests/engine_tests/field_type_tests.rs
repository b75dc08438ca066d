//! Tests for entities carrying every column type through the engine
//!
//! These tests verify:
//! - Save-then-load equality for every FieldType
//! - DateTime and Decimal columns as index values
//! - DateTime and Decimal columns as sort scores

use std::sync::Arc;

use atlasorm::codec::{
    FieldType, FieldValue, ObjectClass, ObjectValue, ScalarValue, Serialisable,
};
use atlasorm::metadata::{Column, Entity, Index, SortIndex};
use atlasorm::store::MemoryStore;
use atlasorm::{
    Direction, EntityManager, KeyValueStore, MetadataRegistry, OrmError, Result, SortScore,
    SortedTableQuery,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Location {
    lat: f64,
    lon: f64,
}

/// Stored as `low..high`
#[derive(Debug, Clone, PartialEq)]
struct Span(i64, i64);

impl Serialisable for Span {
    fn serialise(&self) -> Result<String> {
        Ok(format!("{}..{}", self.0, self.1))
    }

    fn deserialise(raw: &str) -> Result<Self> {
        let (low, high) = raw
            .split_once("..")
            .ok_or_else(|| OrmError::Serialization(format!("bad span {:?}", raw)))?;
        let parse = |s: &str| {
            s.parse::<i64>()
                .map_err(|e| OrmError::Serialization(e.to_string()))
        };
        Ok(Span(parse(low)?, parse(high)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Reading {
    id: String,
    station: Option<String>,
    samples: i64,
    level: f64,
    calibrated: bool,
    taken: Option<DateTime<FixedOffset>>,
    flags: Vec<String>,
    location: Option<Location>,
    span: Option<Span>,
}

fn reading_entity() -> Entity<Reading> {
    Entity::<Reading>::builder("readings")
        .id("id")
        .column(Column::new(
            "id",
            FieldType::String,
            |r: &Reading| FieldValue::from(r.id.clone()),
            |r: &mut Reading, v: FieldValue| {
                r.id = v.into_string()?.unwrap_or_default();
                Ok(())
            },
        ))
        .column(Column::new(
            "station",
            FieldType::String,
            |r: &Reading| FieldValue::from(r.station.clone()),
            |r: &mut Reading, v: FieldValue| {
                r.station = v.into_string()?;
                Ok(())
            },
        ))
        .column(Column::new(
            "samples",
            FieldType::Int,
            |r: &Reading| FieldValue::from(r.samples),
            |r: &mut Reading, v: FieldValue| {
                r.samples = v.into_i64()?.unwrap_or_default();
                Ok(())
            },
        ))
        .column(Column::new(
            "level",
            FieldType::Decimal,
            |r: &Reading| FieldValue::from(r.level),
            |r: &mut Reading, v: FieldValue| {
                r.level = v.into_f64()?.unwrap_or_default();
                Ok(())
            },
        ))
        .column(Column::new(
            "calibrated",
            FieldType::Bool,
            |r: &Reading| FieldValue::from(r.calibrated),
            |r: &mut Reading, v: FieldValue| {
                r.calibrated = v.into_bool()?.unwrap_or_default();
                Ok(())
            },
        ))
        .column(Column::new(
            "taken",
            FieldType::DateTime,
            |r: &Reading| FieldValue::from(r.taken),
            |r: &mut Reading, v: FieldValue| {
                r.taken = v.into_datetime()?;
                Ok(())
            },
        ))
        .column(Column::new(
            "flags",
            FieldType::Set,
            |r: &Reading| {
                FieldValue::Set(r.flags.iter().map(|f| ScalarValue::from(f.as_str())).collect())
            },
            |r: &mut Reading, v: FieldValue| {
                r.flags = v
                    .into_set()?
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|s| match s {
                        ScalarValue::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                Ok(())
            },
        ))
        .column(Column::object(
            "location",
            ObjectClass::serde::<Location>(),
            |r: &Reading| FieldValue::from(r.location.clone().map(ObjectValue::serde)),
            |r: &mut Reading, v: FieldValue| {
                r.location = v.into_object()?;
                Ok(())
            },
        ))
        .column(Column::object(
            "span",
            ObjectClass::serialisable::<Span>(),
            |r: &Reading| FieldValue::from(r.span.clone().map(ObjectValue::serialisable)),
            |r: &mut Reading, v: FieldValue| {
                r.span = v.into_object()?;
                Ok(())
            },
        ))
        .index(Index::new("by_level").column("level"))
        .index(Index::new("by_taken").column("taken"))
        .sortable(SortIndex::new("taken"))
        .sortable(SortIndex::new("level"))
        .build()
        .unwrap()
}

fn setup() -> (Arc<MemoryStore>, EntityManager) {
    let registry = MetadataRegistry::new();
    registry.register(reading_entity()).unwrap();
    let store = Arc::new(MemoryStore::new());
    let manager = EntityManager::new(store.clone(), Arc::new(registry));
    (store, manager)
}

fn at(rfc3339: &str) -> Option<DateTime<FixedOffset>> {
    Some(DateTime::parse_from_rfc3339(rfc3339).unwrap())
}

fn reading(id: &str, level: f64, taken: &str) -> Reading {
    Reading {
        id: id.to_string(),
        station: Some("north".to_string()),
        samples: 12,
        level,
        calibrated: true,
        taken: at(taken),
        flags: vec!["gusty".to_string(), "wet".to_string()],
        location: Some(Location {
            lat: 59.91,
            lon: 10.75,
        }),
        span: Some(Span(-3, 14)),
    }
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_every_column_type_round_trips() {
    let (_store, manager) = setup();
    let original = reading("r1", 4.5, "2023-07-14T20:31:00+02:00");

    manager.save(&original).unwrap();
    let loaded: Reading = manager.load("r1").unwrap();

    assert_eq!(loaded, original);
}

#[test]
fn test_null_columns_round_trip() {
    let (_store, manager) = setup();
    let sparse = Reading {
        id: "r2".to_string(),
        ..Default::default()
    };

    manager.save(&sparse).unwrap();
    let loaded: Reading = manager.load("r2").unwrap();

    assert_eq!(loaded, sparse);
}

#[test]
fn test_updated_columns_replace_stored_values() {
    let (_store, manager) = setup();
    manager.save(&reading("r1", 4.5, "2023-07-14T20:31:00+02:00")).unwrap();

    let updated = Reading {
        flags: vec!["calm".to_string()],
        location: None,
        span: Some(Span(0, 1)),
        ..reading("r1", 2.25, "2024-01-01T00:00:00+00:00")
    };
    manager.save(&updated).unwrap();

    assert_eq!(manager.load::<Reading>("r1").unwrap(), updated);
}

// =============================================================================
// Index Tests
// =============================================================================

#[test]
fn test_decimal_and_datetime_index_lookup() {
    let (_store, manager) = setup();
    manager.save(&reading("r1", 4.5, "2023-07-14T20:31:00+02:00")).unwrap();
    manager.save(&reading("r2", 7.0, "2023-07-14T20:31:00+02:00")).unwrap();

    assert_eq!(
        manager.retrieve_by_index::<Reading>("by_level", &["4.5"]).unwrap(),
        vec!["r1"]
    );

    let mut same_time = manager
        .retrieve_by_index::<Reading>("by_taken", &["2023-07-14T20:31:00+02:00"])
        .unwrap();
    same_time.sort();
    assert_eq!(same_time, vec!["r1", "r2"]);
}

#[test]
fn test_datetime_change_moves_index_bucket() {
    let (_store, manager) = setup();
    manager.save(&reading("r1", 4.5, "2023-07-14T20:31:00+02:00")).unwrap();

    manager.save(&reading("r1", 4.5, "2023-07-15T08:00:00+02:00")).unwrap();

    assert!(manager
        .retrieve_by_index::<Reading>("by_taken", &["2023-07-14T20:31:00+02:00"])
        .unwrap()
        .is_empty());
    assert_eq!(
        manager
            .retrieve_by_index::<Reading>("by_taken", &["2023-07-15T08:00:00+02:00"])
            .unwrap(),
        vec!["r1"]
    );
}

// =============================================================================
// Sort Tests
// =============================================================================

#[test]
fn test_query_sorted_by_datetime() {
    let (store, manager) = setup();
    // offsets differ; order follows the instant, not the wall clock
    manager.save(&reading("late", 1.0, "2023-07-14T12:00:00+00:00")).unwrap();
    manager.save(&reading("early", 2.0, "2023-07-14T13:00:00+02:00")).unwrap();
    manager.save(&reading("mid", 3.0, "2023-07-14T10:30:00-01:00")).unwrap();

    let ascending = manager
        .query::<Reading>(SortedTableQuery::new("readings", "taken"))
        .unwrap();
    let latest = manager
        .query::<Reading>(
            SortedTableQuery::new("readings", "taken")
                .direction(Direction::Desc)
                .range(0, 0),
        )
        .unwrap();

    assert_eq!(ascending.ids(), ["early", "mid", "late"]);
    let loaded: Vec<Reading> = latest.iter().collect::<Result<_>>().unwrap();
    assert_eq!(loaded, vec![reading("late", 1.0, "2023-07-14T12:00:00+00:00")]);
    assert_eq!(
        store.sorted_set_score("srt:readings:taken", "early").unwrap(),
        Some(SortScore::Number(1_689_332_400.0))
    );
}

#[test]
fn test_query_sorted_by_decimal() {
    let (_store, manager) = setup();
    manager.save(&reading("a", 0.5, "2023-07-14T12:00:00+00:00")).unwrap();
    manager.save(&reading("b", -1.25, "2023-07-14T12:00:00+00:00")).unwrap();
    manager.save(&reading("c", 10.0, "2023-07-14T12:00:00+00:00")).unwrap();

    let result = manager
        .query::<Reading>(SortedTableQuery::new("readings", "level").direction(Direction::Desc))
        .unwrap();

    assert_eq!(result.ids(), ["c", "a", "b"]);
}

#[test]
fn test_null_datetime_is_left_out_of_sort_set() {
    let (store, manager) = setup();
    manager.save(&reading("r1", 4.5, "2023-07-14T20:31:00+02:00")).unwrap();

    manager
        .save(&Reading {
            taken: None,
            ..reading("r1", 4.5, "2023-07-14T20:31:00+02:00")
        })
        .unwrap();

    assert_eq!(store.sorted_set_score("srt:readings:taken", "r1").unwrap(), None);
}

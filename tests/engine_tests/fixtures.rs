//! Shared entities for engine tests
//!
//! ```text
//! users ──posts (o2m, sorted by created)──▶ posts ──tags (m2m)──▶ tags
//!   ▲                                         │                    │
//!   └──────────────author (m2o)───────────────┘   posts (m2m, sorted by created)
//! users ◀──profile / user (o2o)──▶ profiles
//! owners ──items (o2m, inverse "owner" undeclared)──▶ items
//! ```

use std::sync::Arc;

use atlasorm::codec::{FieldType, FieldValue};
use atlasorm::metadata::{Column, Comparison, Condition, Entity, Index, Relationship, SortIndex};
use atlasorm::store::MemoryStore;
use atlasorm::{Config, EntityManager, MetadataRegistry};

// =============================================================================
// Entities
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
    pub active: bool,
    pub posts: Option<Vec<String>>,
    pub profile: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub created: i64,
    pub author: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub id: String,
    pub label: String,
    pub posts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub id: String,
    pub bio: String,
    pub user: Option<Vec<String>>,
}

/// Owned side of a relationship whose inverse it never declares
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Owner {
    pub id: String,
    pub items: Option<Vec<String>>,
}

pub fn user(id: &str, name: &str, age: i64) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        age,
        active: true,
        ..Default::default()
    }
}

pub fn post(id: &str, title: &str, created: i64) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        created,
        ..Default::default()
    }
}

pub fn ids(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

// =============================================================================
// Metadata
// =============================================================================

fn string(value: FieldValue) -> atlasorm::Result<String> {
    Ok(value.into_string()?.unwrap_or_default())
}

pub fn user_entity() -> Entity<User> {
    Entity::<User>::builder("users")
        .id("id")
        .column(Column::new(
            "id",
            FieldType::String,
            |u: &User| FieldValue::from(u.id.clone()),
            |u: &mut User, v: FieldValue| {
                u.id = string(v)?;
                Ok(())
            },
        ))
        .column(Column::new(
            "name",
            FieldType::String,
            |u: &User| FieldValue::from(u.name.clone()),
            |u: &mut User, v: FieldValue| {
                u.name = string(v)?;
                Ok(())
            },
        ))
        .column(Column::new(
            "email",
            FieldType::String,
            |u: &User| FieldValue::from(u.email.clone()),
            |u: &mut User, v: FieldValue| {
                u.email = v.into_string()?;
                Ok(())
            },
        ))
        .column(Column::new(
            "age",
            FieldType::Int,
            |u: &User| FieldValue::from(u.age),
            |u: &mut User, v: FieldValue| {
                u.age = v.into_i64()?.unwrap_or_default();
                Ok(())
            },
        ))
        .column(Column::new(
            "active",
            FieldType::Bool,
            |u: &User| FieldValue::from(u.active),
            |u: &mut User, v: FieldValue| {
                u.active = v.into_bool()?.unwrap_or_default();
                Ok(())
            },
        ))
        .index(Index::new("by_email").column("email"))
        .index(Index::new("by_name_age").column("name").column("age"))
        .index(
            Index::new("active_by_name")
                .column("name")
                .condition(Condition::new("active", true)),
        )
        .sortable(SortIndex::new("age"))
        .sortable(
            SortIndex::new("name")
                .condition(Condition::new("age", 18i64).with_comparison(Comparison::Ge)),
        )
        .relationship(
            Relationship::one_to_many("posts", "posts")
                .inversed_by("author")
                .sorted_by("created"),
            |u: &User| u.posts.clone(),
        )
        .relationship(
            Relationship::one_to_one("profile", "profiles").inversed_by("user"),
            |u: &User| u.profile.clone(),
        )
        .build()
        .unwrap()
}

pub fn post_entity() -> Entity<Post> {
    Entity::<Post>::builder("posts")
        .id("id")
        .column(Column::new(
            "id",
            FieldType::String,
            |p: &Post| FieldValue::from(p.id.clone()),
            |p: &mut Post, v: FieldValue| {
                p.id = string(v)?;
                Ok(())
            },
        ))
        .column(Column::new(
            "title",
            FieldType::String,
            |p: &Post| FieldValue::from(p.title.clone()),
            |p: &mut Post, v: FieldValue| {
                p.title = string(v)?;
                Ok(())
            },
        ))
        .column(Column::new(
            "created",
            FieldType::Int,
            |p: &Post| FieldValue::from(p.created),
            |p: &mut Post, v: FieldValue| {
                p.created = v.into_i64()?.unwrap_or_default();
                Ok(())
            },
        ))
        .sortable(SortIndex::new("created"))
        .relationship(
            Relationship::many_to_one("author", "users").inversed_by("posts"),
            |p: &Post| p.author.clone(),
        )
        .relationship(
            Relationship::many_to_many("tags", "tags").inversed_by("posts"),
            |p: &Post| p.tags.clone(),
        )
        .build()
        .unwrap()
}

pub fn tag_entity() -> Entity<Tag> {
    Entity::<Tag>::builder("tags")
        .id("id")
        .column(Column::new(
            "id",
            FieldType::String,
            |t: &Tag| FieldValue::from(t.id.clone()),
            |t: &mut Tag, v: FieldValue| {
                t.id = string(v)?;
                Ok(())
            },
        ))
        .column(Column::new(
            "label",
            FieldType::String,
            |t: &Tag| FieldValue::from(t.label.clone()),
            |t: &mut Tag, v: FieldValue| {
                t.label = string(v)?;
                Ok(())
            },
        ))
        .relationship(
            Relationship::many_to_many("posts", "posts")
                .inversed_by("tags")
                .sorted_by("created"),
            |t: &Tag| t.posts.clone(),
        )
        .build()
        .unwrap()
}

pub fn profile_entity() -> Entity<Profile> {
    Entity::<Profile>::builder("profiles")
        .id("id")
        .column(Column::new(
            "id",
            FieldType::String,
            |p: &Profile| FieldValue::from(p.id.clone()),
            |p: &mut Profile, v: FieldValue| {
                p.id = string(v)?;
                Ok(())
            },
        ))
        .column(Column::new(
            "bio",
            FieldType::String,
            |p: &Profile| FieldValue::from(p.bio.clone()),
            |p: &mut Profile, v: FieldValue| {
                p.bio = string(v)?;
                Ok(())
            },
        ))
        .relationship(
            Relationship::one_to_one("user", "users").inversed_by("profile"),
            |p: &Profile| p.user.clone(),
        )
        .build()
        .unwrap()
}

pub fn owner_entity() -> Entity<Owner> {
    Entity::<Owner>::builder("owners")
        .id("id")
        .column(Column::new(
            "id",
            FieldType::String,
            |o: &Owner| FieldValue::from(o.id.clone()),
            |o: &mut Owner, v: FieldValue| {
                o.id = string(v)?;
                Ok(())
            },
        ))
        .relationship(
            Relationship::one_to_many("items", "items").inversed_by("owner"),
            |o: &Owner| o.items.clone(),
        )
        .build()
        .unwrap()
}

pub fn item_entity() -> Entity<Item> {
    Entity::<Item>::builder("items")
        .id("id")
        .column(Column::new(
            "id",
            FieldType::String,
            |i: &Item| FieldValue::from(i.id.clone()),
            |i: &mut Item, v: FieldValue| {
                i.id = string(v)?;
                Ok(())
            },
        ))
        .column(Column::new(
            "name",
            FieldType::String,
            |i: &Item| FieldValue::from(i.name.clone()),
            |i: &mut Item, v: FieldValue| {
                i.name = string(v)?;
                Ok(())
            },
        ))
        .build()
        .unwrap()
}

pub fn registry() -> Arc<MetadataRegistry> {
    let registry = MetadataRegistry::new();
    registry.register(user_entity()).unwrap();
    registry.register(post_entity()).unwrap();
    registry.register(tag_entity()).unwrap();
    registry.register(profile_entity()).unwrap();
    registry.register(owner_entity()).unwrap();
    registry.register(item_entity()).unwrap();
    Arc::new(registry)
}

// =============================================================================
// Setup
// =============================================================================

pub fn setup() -> (Arc<MemoryStore>, EntityManager) {
    let store = Arc::new(MemoryStore::new());
    let manager = EntityManager::new(store.clone(), registry());
    (store, manager)
}

pub fn setup_with_config(config: Config) -> (Arc<MemoryStore>, EntityManager) {
    let store = Arc::new(MemoryStore::new());
    let manager = EntityManager::with_config(store.clone(), registry(), config).unwrap();
    (store, manager)
}

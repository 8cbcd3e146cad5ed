//! Domain models for the Star Wars catalogue.
//!
//! Models are plain immutable values compared field by field. They carry no
//! reference to the fragment they were built from.

use serde::{Deserialize, Serialize};

/// Implemented by every model published through a repository collection.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Collection name used in logs and repository events.
    const COLLECTION: &'static str;

    /// Identifier unique within one published collection.
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    /// Name of the person's homeworld.
    pub home_world: String,
}

impl Person {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        home_world: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            home_world: home_world.into(),
        }
    }
}

impl Entity for Person {
    const COLLECTION: &'static str = "people";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Film {
    pub id: String,
    pub title: String,
    pub director: String,
}

impl Film {
    pub fn new(id: impl Into<String>, title: impl Into<String>, director: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            director: director.into(),
        }
    }
}

impl Entity for Film {
    const COLLECTION: &'static str = "films";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_value() {
        let a = Person::new("1", "Luke Skywalker", "Tatooine");
        let b = Person::new("1", "Luke Skywalker", "Tatooine");
        assert_eq!(a, b);
        assert_ne!(a, Person::new("1", "Luke Skywalker", "Alderaan"));
    }

    #[test]
    fn test_serializes_with_snake_case_fields() {
        let json = serde_json::to_value(Person::new("1", "Luke Skywalker", "Tatooine")).unwrap();
        assert_eq!(json["home_world"], "Tatooine");

        let film: Film = serde_json::from_str(
            r#"{"id":"1","title":"A New Hope","director":"George Lucas"}"#,
        )
        .unwrap();
        assert_eq!(film, Film::new("1", "A New Hope", "George Lucas"));
    }
}

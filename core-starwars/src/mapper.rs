//! Fragment to domain model mapping.
//!
//! Mapping is a pure function of its input. A missing required value is an
//! error and is never replaced by a default.

use std::collections::HashMap;

use core_graphql::{FilmFragment, FragmentList, PersonFragment, Query};

use crate::error::MappingError;
use crate::models::{Entity, Film, Person};

type Result<T> = std::result::Result<T, MappingError>;

/// Conversion from the wire fragment of one entity type.
pub trait FragmentMapper: Entity + Sized {
    type Fragment;

    /// Entity name used in error reports.
    const ENTITY: &'static str;

    /// Query whose payload carries this entity's fragments.
    const QUERY: Query;

    /// Map one fragment. `index` is its position in the server response and
    /// only serves error reporting.
    fn from_fragment(fragment: Self::Fragment, index: usize) -> Result<Self>;

    /// Take this entity's fragments out of a query payload.
    fn fragments(list: FragmentList) -> Result<Vec<Self::Fragment>>;
}

fn required<T>(
    value: Option<T>,
    entity: &'static str,
    field: &'static str,
    index: usize,
) -> Result<T> {
    value.ok_or(MappingError::MissingField {
        entity,
        field,
        index,
    })
}

fn identifier(id: String, entity: &'static str, index: usize) -> Result<String> {
    if id.trim().is_empty() {
        return Err(MappingError::EmptyIdentifier { entity, index });
    }
    Ok(id)
}

impl FragmentMapper for Person {
    type Fragment = PersonFragment;

    const ENTITY: &'static str = "Person";
    const QUERY: Query = Query::AllPeople;

    fn from_fragment(fragment: PersonFragment, index: usize) -> Result<Self> {
        let id = identifier(fragment.id, Self::ENTITY, index)?;
        let name = required(fragment.name, Self::ENTITY, "name", index)?;
        let homeworld = required(fragment.homeworld, Self::ENTITY, "homeworld", index)?;
        let home_world = required(homeworld.name, Self::ENTITY, "homeworld.name", index)?;

        Ok(Person {
            id,
            name,
            home_world,
        })
    }

    fn fragments(list: FragmentList) -> Result<Vec<PersonFragment>> {
        match list {
            FragmentList::People(people) => Ok(people),
            other => Err(MappingError::UnexpectedPayload {
                expected: "PersonFragment",
                found: other.kind(),
            }),
        }
    }
}

impl FragmentMapper for Film {
    type Fragment = FilmFragment;

    const ENTITY: &'static str = "Film";
    const QUERY: Query = Query::AllFilms;

    fn from_fragment(fragment: FilmFragment, index: usize) -> Result<Self> {
        Ok(Film {
            id: identifier(fragment.id, Self::ENTITY, index)?,
            title: required(fragment.title, Self::ENTITY, "title", index)?,
            director: required(fragment.director, Self::ENTITY, "director", index)?,
        })
    }

    fn fragments(list: FragmentList) -> Result<Vec<FilmFragment>> {
        match list {
            FragmentList::Films(films) => Ok(films),
            other => Err(MappingError::UnexpectedPayload {
                expected: "FilmFragment",
                found: other.kind(),
            }),
        }
    }
}

/// Map a single person fragment.
pub fn map_person(fragment: PersonFragment) -> Result<Person> {
    Person::from_fragment(fragment, 0)
}

/// Map a single film fragment.
pub fn map_film(fragment: FilmFragment) -> Result<Film> {
    Film::from_fragment(fragment, 0)
}

/// Map a whole query payload, preserving server order.
///
/// Fails on the first bad fragment, or when two fragments share an id.
pub fn map_all<T: FragmentMapper>(list: FragmentList) -> Result<Vec<T>> {
    let items = T::fragments(list)?
        .into_iter()
        .enumerate()
        .map(|(index, fragment)| T::from_fragment(fragment, index))
        .collect::<Result<Vec<T>>>()?;

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Some(&first_index) = seen.get(item.id()) {
            return Err(MappingError::DuplicateId {
                entity: T::ENTITY,
                id: item.id().to_string(),
                first_index,
                index,
            });
        }
        seen.insert(item.id(), index);
    }

    Ok(items)
}

//! Wire shapes of the GraphQL fragments selected by each query.
//!
//! Nullable schema fields stay `Option` here. Deciding whether a missing
//! value is acceptable is the mapper's job, not the transport's.

use serde::{Deserialize, Serialize};

/// `fragment PersonFragment on Person { id name homeworld { name } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFragment {
    pub id: String,
    pub name: Option<String>,
    pub homeworld: Option<HomeworldFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworldFragment {
    pub name: Option<String>,
}

/// `fragment FilmFragment on Film { id title director }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmFragment {
    pub id: String,
    pub title: Option<String>,
    pub director: Option<String>,
}

/// Decoded payload of one query, in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentList {
    People(Vec<PersonFragment>),
    Films(Vec<FilmFragment>),
}

impl FragmentList {
    pub fn len(&self) -> usize {
        match self {
            FragmentList::People(items) => items.len(),
            FragmentList::Films(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the fragment type carried, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FragmentList::People(_) => "PersonFragment",
            FragmentList::Films(_) => "FilmFragment",
        }
    }
}

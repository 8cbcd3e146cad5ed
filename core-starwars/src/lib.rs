//! # Star Wars Repository
//!
//! Domain models, fragment mapping and the reactive repository shared by
//! every presentation layer.
//!
//! ## Overview
//!
//! - [`models`]: [`Person`] and [`Film`] value objects
//! - [`mapper`]: fragment to model conversion
//! - [`publication`]: versioned snapshots and [`CollectionStream`]
//! - [`repository`]: [`StarWarsRepository`] with single-flight fetches
//!
//! ## Usage
//!
//! ```ignore
//! use core_starwars::{CollectionEvent, RepositoryConfig, StarWarsRepository};
//!
//! let repository = StarWarsRepository::new(transport, RepositoryConfig::default())?;
//! let mut films = repository.films();
//! if let Some(CollectionEvent::Loaded(snapshot)) = films.next().await {
//!     for film in snapshot.iter() {
//!         println!("{} ({})", film.title, film.director);
//!     }
//! }
//! ```

pub mod error;
pub mod mapper;
pub mod models;
pub mod publication;
pub mod repository;

pub use error::{MappingError, RepositoryError, Result};
pub use mapper::{map_all, map_film, map_person, FragmentMapper};
pub use models::{Entity, Film, Person};
pub use publication::{CollectionEvent, CollectionStream, Snapshot};
pub use repository::{RepositoryConfig, StarWarsRepository, DEFAULT_CHANNEL_CAPACITY};

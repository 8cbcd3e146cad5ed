//! The fixed set of operations this client knows how to execute.

const PERSON_FRAGMENT: &str = "fragment PersonFragment on Person { id name homeworld { name } }";
const FILM_FRAGMENT: &str = "fragment FilmFragment on Film { id title director }";

/// A named GraphQL query together with the fragment it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    /// Every person known to the server.
    AllPeople,
    /// Every film known to the server.
    AllFilms,
}

impl Query {
    pub fn operation_name(&self) -> &'static str {
        match self {
            Query::AllPeople => "GetAllPeople",
            Query::AllFilms => "GetAllFilms",
        }
    }

    /// Full query document, fragment definition included.
    pub fn document(&self) -> String {
        match self {
            Query::AllPeople => format!(
                "query GetAllPeople {{ allPeople {{ people {{ ...PersonFragment }} }} }} {}",
                PERSON_FRAGMENT
            ),
            Query::AllFilms => format!(
                "query GetAllFilms {{ allFilms {{ films {{ ...FilmFragment }} }} }} {}",
                FILM_FRAGMENT
            ),
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.operation_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_name_their_operation() {
        for query in [Query::AllPeople, Query::AllFilms] {
            let document = query.document();
            assert!(document.starts_with(&format!("query {}", query.operation_name())));
        }
    }

    #[test]
    fn test_documents_define_the_spread_fragment() {
        let people = Query::AllPeople.document();
        assert!(people.contains("...PersonFragment"));
        assert!(people.contains("fragment PersonFragment on Person"));
        assert!(people.contains("homeworld { name }"));

        let films = Query::AllFilms.document();
        assert!(films.contains("...FilmFragment"));
        assert!(films.contains("fragment FilmFragment on Film { id title director }"));
    }
}

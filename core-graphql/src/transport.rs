use async_trait::async_trait;

use crate::error::Result;
use crate::fragments::FragmentList;
use crate::query::Query;

/// Executes a named query and yields its fragments.
///
/// One call is one network round trip: implementations do not cache.
/// Dropping the returned future abandons the request.
///
/// # Example
///
/// ```ignore
/// use core_graphql::{Query, TransportClient};
///
/// async fn count_people(transport: &dyn TransportClient) -> usize {
///     transport.fetch(Query::AllPeople).await.map(|list| list.len()).unwrap_or(0)
/// }
/// ```
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn fetch(&self, query: Query) -> Result<FragmentList>;
}

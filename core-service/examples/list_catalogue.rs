//! Fetch people and films from the public API and print them.
//!
//! ```text
//! RUST_LOG=core_starwars=debug cargo run -p core-service --example list_catalogue
//! ```

use anyhow::{bail, Context};
use core_service::{
    init_logging, CollectionEvent, CoreConfig, CoreService, FetchPolicy, LogFormat, LoggingConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))
        .context("failed to initialize logging")?;

    let config = CoreConfig::builder()
        .fetch_policy(FetchPolicy::CacheFirst)
        .build()
        .context("invalid core configuration")?;
    let core = CoreService::bootstrap(config)?;

    let mut people = core.repository().people();
    let mut films = core.repository().films();

    match people.next().await {
        Some(CollectionEvent::Loaded(snapshot)) => {
            println!("{} people (version {})", snapshot.len(), snapshot.version());
            for person in snapshot.iter() {
                println!("  {:<24} {}", person.name, person.home_world);
            }
        }
        Some(CollectionEvent::Failed(error)) => bail!("people fetch failed: {error}"),
        None => bail!("people stream closed"),
    }

    match films.next().await {
        Some(CollectionEvent::Loaded(snapshot)) => {
            println!("{} films (version {})", snapshot.len(), snapshot.version());
            for film in snapshot.iter() {
                println!("  {:<24} {}", film.title, film.director);
            }
        }
        Some(CollectionEvent::Failed(error)) => bail!("films fetch failed: {error}"),
        None => bail!("films stream closed"),
    }

    Ok(())
}

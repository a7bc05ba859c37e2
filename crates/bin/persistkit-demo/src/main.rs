//! # persistkit-demo
//!
//! Composition root that wires the in-memory adapter into an
//! [`EntityService`] and walks through its operations.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Construct the store, DAO and transaction manager (adapters)
//! - Construct the entity service, injecting them via port traits
//! - Run a short save / find / count / delete session and log the outcome
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! No persistence logic belongs here.

mod character;
mod config;

use anyhow::Context;
use persistkit_adapter_memory::InMemoryStore;
use persistkit_app::services::{EntityFactory, EntityService};
use persistkit_domain::search::{SearchMode, SearchTemplate};
use tracing_subscriber::EnvFilter;

use crate::character::Character;
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading persistkit.toml")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Adapters
    let store = InMemoryStore::<Character>::new();

    // Service
    let service = EntityService::new(
        store.dao(),
        store.transactions(),
        EntityFactory::new(Character::default, Character::recruit),
    )
    .with_default_template(SearchTemplate::from(&config.search));

    // Seed
    service
        .save_batch(vec![
            Character::new("john", "knight", 12),
            Character::new("joseph", "cleric", 7),
            Character::new("mark", "knight", 3),
        ])
        .await?;

    let mut recruit = service.get_new_with_defaults();
    recruit.name = "joanna".to_string();
    service.save(&mut recruit).await?;
    tracing::info!(id = ?recruit.id, "recruited");

    // Queries
    let jo = service.find_by_query("jo").await?;
    tracing::info!(
        names = ?jo.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        "names starting with \"jo\""
    );

    let knights = Character {
        class: "knight".to_string(),
        ..service.get_new()
    };
    let total = service.count_all().await?;
    let knight_count = service.count_by_example(&knights).await?;
    tracing::info!(total, knights = knight_count, "population");

    let paged = SearchTemplate::new()
        .with_max_results(2)
        .with_search_pattern("o")
        .with_search_mode(SearchMode::Anywhere);
    let page = service.find_with(&paged).await?;
    tracing::info!(
        page = ?page.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        "first page containing \"o\""
    );

    let mark = Character {
        name: "mark".to_string(),
        ..service.get_new()
    };
    let found = service.find_unique(&mark).await?;
    tracing::info!(?found, "unique lookup");

    match service.find_unique_or_none(&knights).await {
        Ok(found) => tracing::info!(?found, "single knight"),
        Err(err) if err.is_uniqueness_violation() => {
            tracing::info!(%err, "knights are not unique");
        }
        Err(err) => return Err(err.into()),
    }

    // Cleanup
    if let Some(id) = found.id {
        service.delete_by_id(id).await?;
    }
    service.delete(None).await?;
    let remaining = service.count_all().await?;
    tracing::info!(remaining, "after deletion");

    Ok(())
}

#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics from corrupt data.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xdbm_search::config::SearchConfig;
use xdbm_search::cursor::Cursor;
use xdbm_search::schema::Schema;
use xdbm_search::store::{DirectoryDump, MemoryStore, Store};
use xdbm_search::{SearchControls, SearchEngine, SearchError};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xdbm_search=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match SearchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: data_file={}, scope={}, deref_aliases={}, filter={}",
        config.data_file.display(),
        config.scope,
        config.deref_aliases,
        config.filter
    );

    let json = match std::fs::read_to_string(&config.data_file) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to read {}: {e}", config.data_file.display());
            std::process::exit(1);
        }
    };

    let schema = Schema::bootstrap();
    let store = match DirectoryDump::from_json(&json)
        .and_then(|dump| MemoryStore::from_dump(&schema, &dump))
    {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to load directory: {e}");
            std::process::exit(1);
        }
    };

    match search(&store, &schema, &config) {
        Ok(matches) => tracing::info!("{matches} entries matched"),
        Err(e) => {
            tracing::error!("Search failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Run the configured search and print one name per match.
fn search(
    store: &MemoryStore,
    schema: &Schema,
    config: &SearchConfig,
) -> Result<usize, SearchError> {
    let base = config.search_base.clone().unwrap_or_else(|| store.suffix().clone());
    let engine = SearchEngine::new(store, schema);
    let mut cursor = engine.cursor(
        &base,
        config.deref_aliases,
        &config.filter,
        &SearchControls::new(config.scope),
    )?;

    let printed = print_all(cursor.as_mut(), store);
    let closed = cursor.close();
    let printed = printed?;
    closed?;
    Ok(printed)
}

fn print_all(cursor: &mut dyn Cursor, store: &MemoryStore) -> Result<usize, SearchError> {
    let mut printed = 0;
    cursor.before_first()?;
    while cursor.next()? {
        let candidate = cursor.get()?;
        match store.lookup(candidate.id)? {
            Some(entry) => {
                println!("{}", entry.dn);
                printed += 1;
            }
            None => tracing::warn!("candidate {} vanished", candidate.id),
        }
    }
    Ok(printed)
}

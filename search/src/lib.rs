// Life of a search request:
// 1. The caller hands the engine a base name, scope, alias mode and filter
// 2. The base is resolved to an id (following an alias if asked to)
// 3. For object scope, the filter's evaluator tests the base directly
// 4. Otherwise:
//     - AND a scope node onto the filter
//     - Annotate every node with a scan count (optimizer)
//     - Build the cursor tree; each AND walks its cheapest child only
//     - The caller walks the root cursor and closes it
//
// System components:
//  - Store and indices (borrowed, never owned)
//  - Optimizer
//  - Evaluator tree
//  - Cursor tree

pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod optimizer;
pub mod schema;
pub mod store;
pub mod types;

mod e2e_tests;
mod testing;

pub use engine::{SearchControls, SearchEngine};
pub use error::SearchError;

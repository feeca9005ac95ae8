//! Core data types shared by every layer of the search subsystem.

mod dn;
mod entry;
mod ids;
mod index_entry;
mod value;

pub use dn::Dn;
pub use entry::Entry;
pub use ids::EntryId;
pub use index_entry::IndexEntry;
pub use value::Value;

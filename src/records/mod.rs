//! Document and folder records.
//!
//! Raw records arrive from an external fetch layer with inconsistent field
//! names. `extract` turns them into the typed fields the query and usage
//! layers work with; every accessor is total.

pub mod extract;
pub mod schema;

pub use extract::{
    category_of, extension_of, folder_key_of, size_of, timestamp_of, GENERAL_FOLDER,
    UNKNOWN_EXTENSION,
};
pub use schema::{DocumentRecord, FolderRecord};

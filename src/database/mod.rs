pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;

pub use manager::MongoCatStore;
pub use memory::InMemoryCatStore;
pub use repository::{CatDraft, CatStore, StoreError};

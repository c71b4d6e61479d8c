pub mod cat;
pub mod format;

pub use cat::{Cat, CatPatch, ListQuery, NewCat};

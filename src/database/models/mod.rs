pub mod cat;

pub use cat::CatDocument;

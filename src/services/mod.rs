pub mod cat_service;
pub mod error;

pub use cat_service::{CatService, DayWindow};
pub use error::CatError;

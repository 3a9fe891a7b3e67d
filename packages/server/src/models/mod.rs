pub mod auth;
pub mod ingredient;
pub mod recipe;
pub mod shared;
pub mod tag;
pub mod user;

pub mod auth;
pub mod ingredient;
pub mod media;
pub mod recipe;
pub mod shopping;
pub mod tag;
pub mod user;

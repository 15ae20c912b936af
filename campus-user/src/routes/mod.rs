pub mod blocks;
pub mod decisions;
pub mod discover;
pub mod health;
pub mod matches;
pub mod photo;
pub mod profile;

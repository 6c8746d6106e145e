pub mod health;
pub mod score;
pub mod signal;
pub mod update;

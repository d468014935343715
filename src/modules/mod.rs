pub mod auth;
pub mod subjects;
pub mod welcome;

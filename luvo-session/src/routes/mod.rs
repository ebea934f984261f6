pub mod calls;
pub mod cameras;
pub mod health;
pub mod interactions;
pub mod streams;
pub mod swipes;

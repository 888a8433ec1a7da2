pub mod admin;
pub mod orders;

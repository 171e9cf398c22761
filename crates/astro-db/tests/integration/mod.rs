pub mod body_tests;
pub mod common;
pub mod user_tests;

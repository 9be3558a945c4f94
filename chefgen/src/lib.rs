pub mod basic_models;
pub mod classify;
pub mod prompt;

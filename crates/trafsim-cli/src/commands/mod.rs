pub mod list_models;
pub mod run;
pub mod validate;

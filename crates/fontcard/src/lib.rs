pub mod agent;
pub mod errors;
pub mod fonts;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod tool;
pub mod translator;

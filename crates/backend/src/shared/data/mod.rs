pub mod db;
pub mod numbering;
pub mod schema;
pub mod settings;

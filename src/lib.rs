pub mod database;
pub mod model;
pub mod report;
pub mod router;
pub mod source;

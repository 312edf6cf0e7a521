pub mod functions;
pub mod sqlite;

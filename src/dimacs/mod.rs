pub mod parser;
pub mod sat_instance;

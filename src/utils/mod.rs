pub mod density_grid;
pub mod parser;
pub mod parser_registry;

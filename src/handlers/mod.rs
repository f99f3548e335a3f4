pub mod chunk;
pub mod density;
pub mod health;
pub mod metadata;
pub mod performance;
pub mod preprocess;
pub mod slice;

pub use chunk::get_density_chunk;
pub use density::get_density_grid;
pub use health::hello;
pub use metadata::get_density_metadata;
pub use performance::get_performance;
pub use preprocess::preprocess_density_grid;
pub use slice::get_density_slice;

pub mod classes;
pub mod model;
pub mod preprocess;
pub mod remote;

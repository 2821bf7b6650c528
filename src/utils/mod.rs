pub mod console;
pub mod path_validator;
pub mod slug;
pub mod status_file;

pub use path_validator::PathValidator;

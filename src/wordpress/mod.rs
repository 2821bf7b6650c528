pub mod cli;
pub mod docker;
pub mod version;

pub use cli::{WpCli, WpExecutor};
pub use docker::DockerCli;

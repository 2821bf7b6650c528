pub mod backup;
pub mod batch_runner;
pub mod command_runner;
pub mod deploy;
pub mod health_check;
pub mod inventory;
pub mod site_executor;
pub mod site_urls;
pub mod target_enumerator;
pub mod update;

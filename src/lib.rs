pub mod bootstrap;
pub mod cli;
pub mod k8s;
pub mod logging;
pub mod server;
pub mod version;

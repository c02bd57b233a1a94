pub mod app_clientset;
pub mod application;
pub mod clientset;
pub mod kube_config;

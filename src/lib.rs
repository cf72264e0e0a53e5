pub mod config;
pub mod error;
pub mod events;
pub mod fade;
pub mod inactivity;
pub mod screens;
pub mod tasks {
    pub mod input;
    pub mod loader;
    pub mod manager;
    pub mod viewer;
}

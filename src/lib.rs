pub mod logging;
pub mod overlay;
pub mod sensors;
pub mod settings;
pub mod single_instance;

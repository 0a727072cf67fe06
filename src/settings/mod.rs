// Settings module
// Persisted alert sound preferences

pub mod settings;

pub use settings::AlertSettings;

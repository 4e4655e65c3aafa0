use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchError {
    #[error("Region bounds invalid for {id:?}: active_radius {active} exceeds load_radius {load}")]
    RegionBounds {
        id: crate::core::types::RegionId,
        active: f32,
        load: f32,
    },

    #[error("Region not found: {0:?}")]
    RegionNotFound(crate::core::types::RegionId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Frame callback failed: {0}")]
    Callback(String),
}

pub type Result<T> = std::result::Result<T, ArchError>;

use thiserror::Error;
use umbra_core::MeshError;

/// Configuration errors found while assembling a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene has no camera")]
    MissingCamera,

    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("unknown medium '{0}'")]
    UnknownMedium(String),

    #[error("unknown integrator '{0}'")]
    UnknownIntegrator(String),

    #[error("unknown sampler '{0}'")]
    UnknownSampler(String),

    #[error("invalid {element}: {message}")]
    InvalidParameter { element: String, message: String },

    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),

    #[error("invalid render settings: {0}")]
    Settings(#[from] serde_json::Error),
}

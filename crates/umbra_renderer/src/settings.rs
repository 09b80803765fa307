//! Render settings loaded from JSON.
//!
//! ```json
//! {
//!     "integrator": { "type": "path_tracer_mis", "beta": 2.0 },
//!     "sampler": { "type": "halton", "samples": 64 },
//!     "background": [0.1, 0.1, 0.1],
//!     "roulette": { "min_survival": 0.1 }
//! }
//! ```
//!
//! Every field is optional.

use serde::Deserialize;

use crate::error::SceneError;
use crate::integrator::{
    AmbientOcclusion, Integrator, Normals, PathTracerMats, PathTracerMis, PathTracerMixture, PathTracerNee,
    PathTracerSimple, RussianRoulette, VolpathTracerHero, VolpathTracerNee, VolpathTracerUni,
    DEFAULT_MAX_BOUNCES, DEFAULT_VOLPATH_BETA,
};
use crate::sampler::{HaltonSampler, IndependentSampler, Sampler, StratifiedSampler, DEFAULT_DIMENSIONS};
use crate::scene::Accelerator;

const DEFAULT_SAMPLES: usize = 16;

fn default_samples() -> usize {
    DEFAULT_SAMPLES
}

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

/// Balance heuristic for the surface MIS tracer.
fn default_mis_beta() -> f32 {
    1.0
}

/// Power heuristic for the volumetric NEE tracer, not the balance
/// heuristic used for surfaces; see [`DEFAULT_VOLPATH_BETA`].
fn default_volpath_beta() -> f32 {
    DEFAULT_VOLPATH_BETA
}

/// Which integrator to render with.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegratorConfig {
    Normals,
    AmbientOcclusion,
    PathTracerSimple,
    PathTracerMats,
    PathTracerNee,
    PathTracerMis {
        #[serde(default = "default_mis_beta")]
        beta: f32,
    },
    PathTracerMixture,
    VolpathTracerNee {
        #[serde(default = "default_volpath_beta")]
        beta: f32,
    },
    VolpathTracerUni,
    VolpathTracerHero,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig::VolpathTracerNee {
            beta: default_volpath_beta(),
        }
    }
}

/// `PathTracerMis`, `path_tracer_mis` and `pathtracermis` all name the same thing.
fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| *c != '_' && *c != '-').collect::<String>().to_ascii_lowercase()
}

impl IntegratorConfig {
    /// Look up an integrator by name with default parameters.
    pub fn from_name(name: &str) -> Result<Self, SceneError> {
        let config = match normalize_name(name).as_str() {
            "normals" => IntegratorConfig::Normals,
            "ambientocclusion" | "ao" => IntegratorConfig::AmbientOcclusion,
            "pathtracersimple" => IntegratorConfig::PathTracerSimple,
            "pathtracermats" => IntegratorConfig::PathTracerMats,
            "pathtracernee" => IntegratorConfig::PathTracerNee,
            "pathtracermis" => IntegratorConfig::PathTracerMis {
                beta: default_mis_beta(),
            },
            "pathtracermixture" => IntegratorConfig::PathTracerMixture,
            "volpathtracernee" => IntegratorConfig::VolpathTracerNee {
                beta: default_volpath_beta(),
            },
            "volpathtraceruni" => IntegratorConfig::VolpathTracerUni,
            "volpathtracerhero" | "volpathtraceroriginal" => IntegratorConfig::VolpathTracerHero,
            _ => return Err(SceneError::UnknownIntegrator(name.to_string())),
        };
        Ok(config)
    }

    /// Instantiate the configured integrator.
    pub fn build(&self, max_bounces: u32, roulette: RussianRoulette) -> Box<dyn Integrator> {
        match *self {
            IntegratorConfig::Normals => Box::new(Normals),
            IntegratorConfig::AmbientOcclusion => Box::new(AmbientOcclusion),
            IntegratorConfig::PathTracerSimple => Box::new(PathTracerSimple::new(max_bounces, roulette)),
            IntegratorConfig::PathTracerMats => Box::new(PathTracerMats::new(max_bounces, roulette)),
            IntegratorConfig::PathTracerNee => Box::new(PathTracerNee::new(max_bounces, roulette)),
            IntegratorConfig::PathTracerMis { beta } => Box::new(PathTracerMis::new(max_bounces, roulette, beta)),
            IntegratorConfig::PathTracerMixture => Box::new(PathTracerMixture::new(max_bounces, roulette)),
            IntegratorConfig::VolpathTracerNee { beta } => {
                Box::new(VolpathTracerNee::new(max_bounces, roulette, beta))
            }
            IntegratorConfig::VolpathTracerUni => Box::new(VolpathTracerUni::new(max_bounces, roulette)),
            IntegratorConfig::VolpathTracerHero => Box::new(VolpathTracerHero::new(max_bounces, roulette)),
        }
    }
}

/// Which sampler to render with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplerConfig {
    Independent {
        #[serde(default = "default_samples")]
        samples: usize,
        #[serde(default)]
        seed: u64,
    },
    Stratified {
        #[serde(default = "default_samples")]
        samples: usize,
        #[serde(default = "default_dimensions")]
        dimensions: usize,
        #[serde(default)]
        seed: u64,
    },
    Halton {
        #[serde(default = "default_samples")]
        samples: usize,
        #[serde(default = "default_dimensions")]
        dimensions: usize,
        #[serde(default)]
        seed: u64,
    },
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig::Independent {
            samples: DEFAULT_SAMPLES,
            seed: 0,
        }
    }
}

impl SamplerConfig {
    /// Look up a sampler by name.
    pub fn from_name(name: &str, samples: usize) -> Result<Self, SceneError> {
        let config = match normalize_name(name).as_str() {
            "independent" | "random" => SamplerConfig::Independent { samples, seed: 0 },
            "stratified" => SamplerConfig::Stratified {
                samples,
                dimensions: DEFAULT_DIMENSIONS,
                seed: 0,
            },
            "halton" => SamplerConfig::Halton {
                samples,
                dimensions: DEFAULT_DIMENSIONS,
                seed: 0,
            },
            _ => return Err(SceneError::UnknownSampler(name.to_string())),
        };
        Ok(config)
    }

    /// Instantiate the configured sampler.
    pub fn build(&self) -> Box<dyn Sampler> {
        match *self {
            SamplerConfig::Independent { samples, seed } => Box::new(IndependentSampler::new(samples, seed)),
            SamplerConfig::Stratified {
                samples,
                dimensions,
                seed,
            } => Box::new(StratifiedSampler::new(samples, dimensions, seed)),
            SamplerConfig::Halton {
                samples,
                dimensions,
                seed,
            } => Box::new(HaltonSampler::new(samples, dimensions, seed)),
        }
    }
}

/// Everything about a render that is not scene content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub integrator: IntegratorConfig,
    pub sampler: SamplerConfig,
    /// Linear RGB radiance of rays that leave the scene
    pub background: [f32; 3],
    pub accelerator: Accelerator,
    pub roulette: RussianRoulette,
    pub max_bounces: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            integrator: IntegratorConfig::default(),
            sampler: SamplerConfig::default(),
            background: [0.2; 3],
            accelerator: Accelerator::default(),
            roulette: RussianRoulette::default(),
            max_bounces: DEFAULT_MAX_BOUNCES,
        }
    }
}

impl RenderSettings {
    /// Parse settings; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The configured integrator with the shared bounce limit and roulette.
    pub fn build_integrator(&self) -> Box<dyn Integrator> {
        self.integrator.build(self.max_bounces, self.roulette)
    }
}

//! Umbra Core - renderer-agnostic scene data.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh`, a validated indexed triangle soup with optional
//!   per-vertex normals and UVs
//! - **Textures**: constant, checker, marble and image-grid color lookups
//! - **Noise**: seeded Perlin gradient noise shared by textures and media
//!
//! # Example
//!
//! ```
//! use umbra_core::{Mesh, Texture};
//! use umbra_math::{Vec2, Vec3};
//!
//! let mesh = Mesh::new(
//!     vec![Vec3::ZERO, Vec3::X, Vec3::Y],
//!     vec![0, 1, 2],
//! )?;
//! assert_eq!(mesh.triangle_count(), 1);
//!
//! let albedo = Texture::constant(Vec3::splat(0.5));
//! assert_eq!(albedo.value(Vec2::ZERO, Vec3::ZERO), Vec3::splat(0.5));
//! # Ok::<(), umbra_core::MeshError>(())
//! ```

pub mod mesh;
pub mod perlin;
pub mod texture;

// Re-export commonly used types
pub use mesh::{Mesh, MeshError};
pub use perlin::Perlin;
pub use texture::{ImageTexture, Texture, TextureError};

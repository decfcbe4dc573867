//! USD (Universal Scene Description) support for twin models.
//!
//! This module builds a USD scene graph from a [`crate::model::TwinModel`],
//! serializes it as USDA (ASCII) text, and reads that text back.
//!
//! ## Supported USD Features
//!
//! - `Xform`: root transform with a single `xformOp:transform` matrix
//! - `UsdGeomMesh`: triangle meshes with points, normals and `primvars:st`
//! - `UsdShade`: `Material` with a `UsdPreviewSurface` shader
//! - `UsdLux`: `DistantLight` and `SphereLight`
//! - `UsdPhysics`: `PhysicsScene` with rigid body, collider and material
//!
//! ## Not Supported
//!
//! - Binary `.usdc` format
//! - Animation / time samples
//! - References, payloads and variants
//!
//! # Example
//!
//! ```ignore
//! use twin_usd::model::TwinModel;
//! use twin_usd::usd::{build_stage, write_usda};
//!
//! let model = TwinModel::from_path("pump.json")?;
//! let text = write_usda(&build_stage(&model));
//! ```

mod builder;
mod parser;
mod types;
mod writer;

pub use builder::*;
pub use parser::*;
pub use types::*;
pub use writer::*;

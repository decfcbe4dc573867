//! Twin-model input records.
//!
//! A twin model is the JSON document produced by the generation service or
//! authored by hand. Two geometry shapes exist in the wild: nested
//! `geometry.vertices`/`geometry.faces` and legacy top-level
//! `vertices`/`faces`. [`TwinModel::normalize`] folds both into one
//! [`NormalizedModel`] before any scene graph is built.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use twin_math::{Vec2, Vec3};

use crate::lenient;

/// Stage name used when the model has none.
pub const DEFAULT_STAGE_NAME: &str = "StahikiTwin";

/// Errors that can occur while reading a twin model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid twin model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Twin model must be a JSON object")]
    NotAnObject,
}

/// A twin model as found in JSON. Every field is optional, and a field of
/// the wrong type is read as absent rather than rejecting the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwinModel {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,

    /// Nested geometry (current shape)
    #[serde(deserialize_with = "lenient::opt_object")]
    pub geometry: Option<GeometryInput>,

    // Legacy flat geometry fields
    #[serde(deserialize_with = "lenient::opt_points")]
    pub vertices: Option<Vec<Vec<f32>>>,
    #[serde(deserialize_with = "lenient::opt_faces")]
    pub faces: Option<Vec<Vec<i64>>>,
    #[serde(deserialize_with = "lenient::opt_points")]
    pub normals: Option<Vec<Vec<f32>>>,
    #[serde(deserialize_with = "lenient::opt_points")]
    pub uvs: Option<Vec<Vec<f32>>>,

    #[serde(deserialize_with = "lenient::opt_object")]
    pub materials: Option<MaterialInput>,
    #[serde(deserialize_with = "lenient::opt_object")]
    pub lighting: Option<LightingInput>,
    #[serde(deserialize_with = "lenient::opt_object")]
    pub physics: Option<PhysicsInput>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryInput {
    #[serde(deserialize_with = "lenient::opt_points")]
    pub vertices: Option<Vec<Vec<f32>>>,
    #[serde(deserialize_with = "lenient::opt_faces")]
    pub faces: Option<Vec<Vec<i64>>>,
    #[serde(deserialize_with = "lenient::opt_points")]
    pub normals: Option<Vec<Vec<f32>>>,
    #[serde(deserialize_with = "lenient::opt_points")]
    pub uvs: Option<Vec<Vec<f32>>>,
}

/// Material fields. `diffuse` and the legacy `color` are aliases.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialInput {
    #[serde(deserialize_with = "lenient::opt_color")]
    pub diffuse: Option<String>,
    #[serde(deserialize_with = "lenient::opt_color")]
    pub color: Option<String>,
    #[serde(deserialize_with = "lenient::opt_f32")]
    pub metalness: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_f32")]
    pub roughness: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_f32")]
    pub opacity: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_color")]
    pub emissive: Option<String>,
}

impl MaterialInput {
    /// The diffuse color string, preferring `diffuse` over `color`.
    pub fn diffuse_color(&self) -> Option<&str> {
        non_empty(self.diffuse.as_deref()).or_else(|| non_empty(self.color.as_deref()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightingInput {
    #[serde(deserialize_with = "lenient::opt_objects")]
    pub directional_lights: Option<Vec<LightInput>>,
    #[serde(deserialize_with = "lenient::opt_objects")]
    pub point_lights: Option<Vec<LightInput>>,
}

/// A directional or point light. Positional keys are not carried over.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightInput {
    #[serde(deserialize_with = "lenient::opt_color")]
    pub color: Option<String>,
    #[serde(deserialize_with = "lenient::opt_f32")]
    pub intensity: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub cast_shadow: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsInput {
    #[serde(deserialize_with = "lenient::flag")]
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::opt_f32")]
    pub mass: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_f32")]
    pub friction: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_f32")]
    pub restitution: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub collision_shape: Option<String>,
}

impl TwinModel {
    /// Parse a twin model from JSON.
    ///
    /// Accepts either the bare model object or the generation API response
    /// envelope `{ "success": true, "model": { ... } }`.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("success").is_some() {
            if let Some(model) = value.get_mut("model").filter(|m| m.is_object()) {
                value = model.take();
            }
        }
        if !value.is_object() {
            return Err(ModelError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a twin model JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Fold both historical geometry shapes into one canonical shape.
    pub fn normalize(&self) -> NormalizedModel {
        NormalizedModel {
            name: non_empty(self.name.as_deref())
                .unwrap_or(DEFAULT_STAGE_NAME)
                .to_string(),
            description: self.description.clone(),
            geometry: self.resolve_geometry(),
            materials: self.materials.clone(),
            lighting: self.lighting.clone(),
            physics: self.physics.clone(),
        }
    }

    fn resolve_geometry(&self) -> Option<Geometry> {
        let nested = self.geometry.as_ref();

        // Each field prefers the nested shape and falls back to the flat one
        let vertices = nested
            .and_then(|g| g.vertices.as_ref())
            .or(self.vertices.as_ref())?;
        let faces = nested.and_then(|g| g.faces.as_ref()).or(self.faces.as_ref())?;
        let normals = nested
            .and_then(|g| g.normals.as_ref())
            .or(self.normals.as_ref());
        let uvs = nested.and_then(|g| g.uvs.as_ref()).or(self.uvs.as_ref());

        Some(Geometry {
            vertices: vertices.iter().map(|v| to_vec3(v)).collect(),
            faces: faces.clone(),
            normals: normals.map(|n| n.iter().map(|v| to_vec3(v)).collect()),
            uvs: uvs.map(|uv| uv.iter().map(|v| to_vec2(v)).collect()),
        })
    }
}

/// The canonical model shape the stage builder consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedModel {
    pub name: String,
    pub description: Option<String>,
    pub geometry: Option<Geometry>,
    pub materials: Option<MaterialInput>,
    pub lighting: Option<LightingInput>,
    pub physics: Option<PhysicsInput>,
}

/// Canonical geometry. Faces are kept as given; the builder validates them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Vec<i64>>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

// Missing components become 0, extra components are dropped.
fn to_vec3(v: &[f32]) -> Vec3 {
    let c = |i: usize| v.get(i).copied().unwrap_or(0.0);
    Vec3::new(c(0), c(1), c(2))
}

fn to_vec2(v: &[f32]) -> Vec2 {
    let c = |i: usize| v.get(i).copied().unwrap_or(0.0);
    Vec2::new(c(0), c(1))
}

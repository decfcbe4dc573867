//! USD scene graph types.
//!
//! A [`Stage`] owns a tree of [`Prim`]s. Each prim carries the attributes
//! common to every USD prim plus a [`PrimKind`] payload that decides which
//! properties the writer emits for it.

use std::collections::BTreeMap;

use serde::Serialize;
use twin_math::{Transform, Vec2, Vec3, NEUTRAL_GRAY};

/// Path of the root transform every built stage hangs its content under.
pub const WORLD_PATH: &str = "/World";

/// Interpolation used for per-vertex primvars.
pub const VERTEX_INTERPOLATION: &str = "vertex";

/// The root container of a scene graph (`UsdStage`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// Display name of the document
    pub name: String,

    /// Path of the conventional root prim
    pub default_prim: String,

    pub time_codes_per_second: f64,
    pub start_time_code: f64,
    pub end_time_code: f64,

    /// Free-form annotations (creator, version, description)
    pub metadata: BTreeMap<String, String>,

    /// Top-level prim trees
    pub prims: Vec<Prim>,
}

impl Stage {
    /// Create an empty stage with default timing metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_prim: WORLD_PATH.to_string(),
            time_codes_per_second: 24.0,
            start_time_code: 0.0,
            end_time_code: 100.0,
            metadata: BTreeMap::new(),
            prims: Vec::new(),
        }
    }

    /// The first root prim, if any.
    pub fn root(&self) -> Option<&Prim> {
        self.prims.first()
    }

    /// Look up a prim anywhere in the stage by its full path.
    pub fn find_prim(&self, path: &str) -> Option<&Prim> {
        self.prims.iter().find_map(|prim| prim.find(path))
    }

    /// Pre-order traversal over every prim, yielding `(depth, prim)`.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.prims)
    }

    /// Total number of prims in the stage.
    pub fn prim_count(&self) -> usize {
        self.walk().count()
    }

    /// Stage description, when the source model had one.
    pub fn description(&self) -> Option<&str> {
        self.metadata.get("description").map(String::as_str)
    }
}

/// A node in the scene tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prim {
    /// Slash-delimited path, unique within the stage
    pub path: String,

    /// Inactive prims are still written but marked non-participating
    pub active: bool,

    pub metadata: BTreeMap<String, String>,

    /// Variant payload
    #[serde(flatten)]
    pub kind: PrimKind,

    /// Child prims, owned by this prim
    pub children: Vec<Prim>,
}

impl Prim {
    /// Create an active prim with no children.
    pub fn new(path: impl Into<String>, kind: PrimKind) -> Self {
        Self {
            path: path.into(),
            active: true,
            metadata: BTreeMap::new(),
            kind,
            children: Vec::new(),
        }
    }

    /// Create a transform prim.
    pub fn xform(path: impl Into<String>, transform: Transform) -> Self {
        Self::new(path, PrimKind::Xform(XformData { transform }))
    }

    /// Display name (last path segment).
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// USD schema type token (`Xform`, `Mesh`, `DistantLight`, ...).
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Find this prim or a descendant by full path.
    pub fn find(&self, path: &str) -> Option<&Prim> {
        if self.path == path {
            return Some(self);
        }
        // Descend only into children whose path is a prefix of the target
        self.children
            .iter()
            .filter(|child| is_path_prefix(&child.path, path))
            .find_map(|child| child.find(path))
    }

    /// Pre-order traversal of this prim and its descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(std::slice::from_ref(self))
    }
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Per-type payload of a prim.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PrimKind {
    /// A transform group
    Xform(XformData),

    /// Triangle mesh geometry
    Mesh(MeshData),

    /// A UsdPreviewSurface material
    Material(MaterialData),

    /// A UsdLux light
    Light(LightData),

    /// Rigid body, collider and physics material parameters
    Physics(PhysicsData),
}

impl PrimKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimKind::Xform(_) => "Xform",
            PrimKind::Mesh(_) => "Mesh",
            PrimKind::Material(_) => "Material",
            PrimKind::Light(light) => light.light_type.usd_type(),
            PrimKind::Physics(_) => "PhysicsScene",
        }
    }
}

/// A USD Xform prim payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct XformData {
    pub transform: Transform,
}

/// A primvar: auxiliary per-element data with an interpolation mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Primvar<T> {
    pub values: Vec<T>,
    pub interpolation: String,
}

impl<T> Primvar<T> {
    /// A primvar with one value per vertex.
    pub fn vertex(values: Vec<T>) -> Self {
        Self {
            values,
            interpolation: VERTEX_INTERPOLATION.to_string(),
        }
    }
}

/// A USD Mesh prim payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshData {
    /// Number of vertices per face
    pub face_vertex_counts: Vec<i32>,

    /// Vertex indices for each face, flattened in face order
    pub face_vertex_indices: Vec<i32>,

    /// Vertex positions
    pub points: Vec<Vec3>,

    /// Vertex normals (optional)
    pub normals: Option<Vec<Vec3>>,

    /// Texture coordinates (`primvars:st`)
    pub st: Option<Primvar<Vec2>>,
}

impl MeshData {
    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// Number of triangles a fan triangulation of this mesh yields.
    pub fn triangle_count(&self) -> usize {
        self.face_vertex_counts
            .iter()
            .map(|&count| (count.max(2) - 2) as usize)
            .sum()
    }
}

/// UsdPreviewSurface inputs.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSurface {
    /// Diffuse/albedo color (RGB, 0-1)
    pub diffuse_color: Vec3,

    /// Metallic factor (0=dielectric, 1=metal)
    pub metallic: f32,

    /// Roughness factor (0=smooth, 1=rough)
    pub roughness: f32,

    /// Opacity (0=transparent, 1=opaque)
    pub opacity: f32,

    /// Emissive color, for light-emitting surfaces
    pub emissive_color: Option<Vec3>,
}

impl Default for PreviewSurface {
    fn default() -> Self {
        Self {
            diffuse_color: NEUTRAL_GRAY,
            metallic: 0.0,
            roughness: 0.5,
            opacity: 1.0,
            emissive_color: None,
        }
    }
}

/// A USD Material prim payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MaterialData {
    pub surface: PreviewSurface,
}

/// Supported UsdLux light shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    Distant,
    Sphere,
}

impl LightType {
    pub fn usd_type(self) -> &'static str {
        match self {
            LightType::Distant => "DistantLight",
            LightType::Sphere => "SphereLight",
        }
    }

    pub fn from_usd_type(type_name: &str) -> Option<Self> {
        match type_name {
            "DistantLight" => Some(LightType::Distant),
            "SphereLight" => Some(LightType::Sphere),
            _ => None,
        }
    }
}

/// A USD light prim payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightData {
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    pub exposure: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub normalize: bool,
    pub enable_color_temperature: bool,
    /// Kelvin
    pub color_temperature: f32,

    /// Sphere lights only
    pub radius: Option<f32>,
    pub treat_as_point: Option<bool>,

    /// `inputs:shadow:enable`, written only when the source said so
    pub shadow_enable: Option<bool>,
}

impl LightData {
    /// A distant (directional) light with UsdLux defaults.
    pub fn distant(color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Distant,
            color,
            intensity,
            exposure: 0.0,
            diffuse: 1.0,
            specular: 1.0,
            normalize: true,
            enable_color_temperature: false,
            color_temperature: 6500.0,
            radius: None,
            treat_as_point: None,
            shadow_enable: None,
        }
    }

    /// A sphere (point) light with UsdLux defaults.
    pub fn sphere(color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Sphere,
            radius: Some(0.5),
            treat_as_point: Some(false),
            ..Self::distant(color, intensity)
        }
    }

    /// Defaults for a light of the given type.
    pub fn for_type(light_type: LightType) -> Self {
        match light_type {
            LightType::Distant => Self::distant(Vec3::ONE, 1.0),
            LightType::Sphere => Self::sphere(Vec3::ONE, 1.0),
        }
    }
}

/// Collision approximation used for the collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ApproximationShape {
    BoundingCube,
    BoundingSphere,
    ConvexHull,
}

impl ApproximationShape {
    /// Map a twin-model `collisionShape` string.
    ///
    /// Anything other than `"box"` or `"sphere"` approximates with a convex hull.
    pub fn from_collision_shape(shape: &str) -> Self {
        match shape {
            "box" => ApproximationShape::BoundingCube,
            "sphere" => ApproximationShape::BoundingSphere,
            _ => ApproximationShape::ConvexHull,
        }
    }

    pub fn usd_token(self) -> &'static str {
        match self {
            ApproximationShape::BoundingCube => "boundingCube",
            ApproximationShape::BoundingSphere => "boundingSphere",
            ApproximationShape::ConvexHull => "convexHull",
        }
    }

    pub fn from_usd_token(token: &str) -> Option<Self> {
        match token {
            "boundingCube" => Some(ApproximationShape::BoundingCube),
            "boundingSphere" => Some(ApproximationShape::BoundingSphere),
            "convexHull" => Some(ApproximationShape::ConvexHull),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RigidBody {
    pub kinematic: bool,
    pub mass: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collider {
    pub approximation_shape: ApproximationShape,
    pub contact_offset: f32,
    pub rest_offset: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsMaterial {
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
}

/// A physics descriptor prim payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsData {
    pub rigid_body: RigidBody,
    pub collider: Collider,
    pub material: PhysicsMaterial,
}

impl Default for PhysicsData {
    fn default() -> Self {
        Self {
            rigid_body: RigidBody {
                kinematic: false,
                mass: 1.0,
            },
            collider: Collider {
                approximation_shape: ApproximationShape::ConvexHull,
                contact_offset: 0.02,
                rest_offset: 0.0,
            },
            material: PhysicsMaterial {
                static_friction: 0.5,
                dynamic_friction: 0.5,
                restitution: 0.0,
            },
        }
    }
}

/// Pre-order prim iterator yielding `(depth, prim)`.
pub struct Walk<'a> {
    stack: Vec<(usize, &'a Prim)>,
}

impl<'a> Walk<'a> {
    fn new(roots: &'a [Prim]) -> Self {
        Self {
            stack: roots.iter().rev().map(|prim| (0, prim)).collect(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Prim);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, prim) = self.stack.pop()?;
        self.stack
            .extend(prim.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, prim))
    }
}

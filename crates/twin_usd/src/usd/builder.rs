//! Twin model to USD stage conversion.
//!
//! The builder never rejects input. Missing sub-objects omit their subtree
//! and malformed values fall back to documented defaults:
//!
//! - malformed colors become neutral gray
//! - unknown collision shapes approximate with a convex hull
//! - faces with fewer than 3 indices, or triangles that reference a vertex
//!   outside `points`, are dropped; larger polygons are fan-triangulated
//!
//! Root children are always ordered Mesh, Material, directional lights,
//! point lights, Physics.

use twin_math::{parse_hex_color, Transform, Vec3, NEUTRAL_GRAY};

use crate::model::{
    Geometry, LightInput, LightingInput, MaterialInput, NormalizedModel, PhysicsInput, TwinModel,
};
use crate::usd::types::*;

const CREATOR: &str = "Stahiki Digital Twin Platform";
const FORMAT_VERSION: &str = "1.0";

/// Build a USD stage from a twin model.
pub fn build_stage(model: &TwinModel) -> Stage {
    build_stage_from_normalized(&model.normalize())
}

/// Build a USD stage from an already normalized model.
pub fn build_stage_from_normalized(model: &NormalizedModel) -> Stage {
    let mut builder = StageBuilder::new(model);

    if let Some(geometry) = &model.geometry {
        builder.add_mesh(geometry);
    }
    if let Some(materials) = &model.materials {
        builder.add_material(materials);
    }
    if let Some(lighting) = &model.lighting {
        builder.add_lights(lighting);
    }
    if let Some(physics) = model.physics.as_ref().filter(|p| p.enabled) {
        builder.add_physics(physics);
    }

    builder.finish()
}

/// Internal builder for assembling the `/World` tree.
struct StageBuilder {
    stage: Stage,
    world: Prim,
}

impl StageBuilder {
    fn new(model: &NormalizedModel) -> Self {
        let mut stage = Stage::new(model.name.clone());
        stage.metadata.insert("creator".into(), CREATOR.into());
        stage.metadata.insert("version".into(), FORMAT_VERSION.into());
        if let Some(description) = &model.description {
            stage.metadata.insert("description".into(), description.clone());
        }

        Self {
            stage,
            world: Prim::xform(WORLD_PATH, Transform::IDENTITY),
        }
    }

    fn child_path(&self, name: &str) -> String {
        format!("{}/{}", self.world.path, name)
    }

    fn push(&mut self, name: &str, kind: PrimKind) {
        let path = self.child_path(name);
        self.world.children.push(Prim::new(path, kind));
    }

    fn add_mesh(&mut self, geometry: &Geometry) {
        let path = self.child_path("Mesh");
        let mesh = build_mesh(&path, geometry);
        log::debug!(
            "Mesh {}: {} points, {} triangles",
            path,
            mesh.points.len(),
            mesh.face_count()
        );
        self.push("Mesh", PrimKind::Mesh(mesh));
    }

    fn add_material(&mut self, materials: &MaterialInput) {
        let surface = PreviewSurface {
            diffuse_color: materials
                .diffuse_color()
                .map_or(NEUTRAL_GRAY, |hex| color_or_gray(hex, "material diffuse")),
            metallic: unit_interval(materials.metalness.unwrap_or(0.0)),
            roughness: unit_interval(materials.roughness.unwrap_or(0.5)),
            opacity: unit_interval(materials.opacity.unwrap_or(1.0)),
            emissive_color: materials
                .emissive
                .as_deref()
                .map(|hex| color_or_gray(hex, "material emissive")),
        };
        self.push("Material", PrimKind::Material(MaterialData { surface }));
    }

    fn add_lights(&mut self, lighting: &LightingInput) {
        for (index, light) in lighting.directional_lights.iter().flatten().enumerate() {
            let data = light_data(light, LightType::Distant);
            self.push(&format!("DirectionalLight{}", index), PrimKind::Light(data));
        }
        for (index, light) in lighting.point_lights.iter().flatten().enumerate() {
            let data = light_data(light, LightType::Sphere);
            self.push(&format!("PointLight{}", index), PrimKind::Light(data));
        }
    }

    fn add_physics(&mut self, physics: &PhysicsInput) {
        let mut data = PhysicsData::default();
        if let Some(mass) = physics.mass {
            data.rigid_body.mass = mass;
        }
        if let Some(shape) = &physics.collision_shape {
            data.collider.approximation_shape = ApproximationShape::from_collision_shape(shape);
        }
        if let Some(friction) = physics.friction {
            data.material.static_friction = friction;
            data.material.dynamic_friction = friction;
        }
        if let Some(restitution) = physics.restitution {
            data.material.restitution = restitution;
        }
        self.push("Physics", PrimKind::Physics(data));
    }

    fn finish(mut self) -> Stage {
        log::debug!(
            "Built stage '{}' with {} root children",
            self.stage.name,
            self.world.child_count()
        );
        self.stage.prims.push(self.world);
        self.stage
    }
}

/// Convert canonical geometry into a triangulated USD mesh payload.
fn build_mesh(path: &str, geometry: &Geometry) -> MeshData {
    let vertex_count = geometry.vertices.len();
    let mut indices = Vec::with_capacity(geometry.faces.len() * 3);
    let mut dropped = 0usize;

    for face in &geometry.faces {
        if face.len() < 3 {
            dropped += 1;
            continue;
        }

        // Fan triangulation: (0,1,2), (0,2,3), ... (0,n-2,n-1)
        for i in 1..(face.len() - 1) {
            let triangle = [face[0], face[i], face[i + 1]].map(|idx| vertex_index(idx, vertex_count));
            match triangle {
                [Some(a), Some(b), Some(c)] => indices.extend_from_slice(&[a, b, c]),
                _ => dropped += 1,
            }
        }
    }

    if dropped > 0 {
        log::warn!(
            "Mesh {}: dropped {} face(s) with fewer than 3 vertices or out-of-range indices",
            path,
            dropped
        );
    }

    MeshData {
        face_vertex_counts: vec![3; indices.len() / 3],
        face_vertex_indices: indices,
        points: geometry.vertices.clone(),
        normals: geometry.normals.clone(),
        st: geometry.uvs.clone().map(Primvar::vertex),
    }
}

fn vertex_index(index: i64, vertex_count: usize) -> Option<i32> {
    i32::try_from(index)
        .ok()
        .filter(|&i| i >= 0 && (i as usize) < vertex_count)
}

fn light_data(light: &LightInput, light_type: LightType) -> LightData {
    let mut data = LightData::for_type(light_type);
    if let Some(hex) = light.color.as_deref().filter(|s| !s.is_empty()) {
        data.color = color_or_gray(hex, "light color");
    }
    if let Some(intensity) = light.intensity {
        data.intensity = intensity;
    }
    data.shadow_enable = light.cast_shadow;
    data
}

fn color_or_gray(hex: &str, what: &str) -> Vec3 {
    parse_hex_color(hex).unwrap_or_else(|| {
        log::warn!("Malformed {} '{}', using neutral gray", what, hex);
        NEUTRAL_GRAY
    })
}

fn unit_interval(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(json: &str) -> TwinModel {
        TwinModel::from_json(json).unwrap()
    }

    fn world(stage: &Stage) -> &Prim {
        assert_eq!(stage.prims.len(), 1);
        &stage.prims[0]
    }

    fn mesh(stage: &Stage) -> &MeshData {
        match &world(stage).children[0].kind {
            PrimKind::Mesh(mesh) => mesh,
            other => panic!("Expected Mesh prim, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_model_has_only_world() {
        let stage = build_stage(&TwinModel::default());
        let root = world(&stage);
        assert_eq!(root.path, WORLD_PATH);
        assert!(root.children.is_empty());
        assert_eq!(stage.name, "StahikiTwin");
        assert_eq!(stage.default_prim, WORLD_PATH);
        assert_eq!(stage.time_codes_per_second, 24.0);
        match &root.kind {
            PrimKind::Xform(xform) => assert!(xform.transform.is_identity()),
            other => panic!("Expected Xform root, got {:?}", other),
        }
    }

    #[test]
    fn test_face_counts_for_triangles() {
        let stage = build_stage(&model(
            r#"{"geometry": {"vertices": [[0,0,0],[1,0,0],[1,1,0],[0,1,0]], "faces": [[0,1,2],[0,2,3]]}}"#,
        ));
        let mesh = mesh(&stage);
        assert_eq!(mesh.face_vertex_counts, vec![3, 3]);
        assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.face_vertex_indices.len(), 3 * mesh.face_vertex_counts.len());
        assert!(mesh.normals.is_none());
        assert!(mesh.st.is_none());
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let stage = build_stage(&model(
            r#"{"vertices": [[0,0,0],[1,0,0],[1,1,0],[0,1,0]], "faces": [[0,1,2,3]]}"#,
        ));
        let mesh = mesh(&stage);
        assert_eq!(mesh.face_vertex_counts, vec![3, 3]);
        assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_invalid_faces_are_dropped() {
        let stage = build_stage(&model(
            r#"{"vertices": [[0,0,0],[1,0,0],[1,1,0]], "faces": [[0,1,2],[0,1,7],[-1,0,1],[0,1]]}"#,
        ));
        let mesh = mesh(&stage);
        assert_eq!(mesh.face_vertex_counts, vec![3]);
        assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_uvs_become_vertex_primvar() {
        let stage = build_stage(&model(
            r#"{"geometry": {"vertices": [[0,0,0],[1,0,0],[1,1,0]], "faces": [[0,1,2]], "uvs": [[0,0],[1,0],[1,1]], "normals": [[0,0,1],[0,0,1],[0,0,1]]}}"#,
        ));
        let mesh = mesh(&stage);
        let st = mesh.st.as_ref().unwrap();
        assert_eq!(st.interpolation, "vertex");
        assert_eq!(st.values.len(), 3);
        assert_eq!(mesh.normals.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_material_colors_and_defaults() {
        let stage = build_stage(&model(r##"{"materials": {"diffuse": "#FF0000", "emissive": "bogus"}}"##));
        let prim = &world(&stage).children[0];
        assert_eq!(prim.path, "/World/Material");
        let PrimKind::Material(material) = &prim.kind else {
            panic!("Expected Material prim");
        };
        assert_eq!(material.surface.diffuse_color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(material.surface.metallic, 0.0);
        assert_eq!(material.surface.roughness, 0.5);
        assert_eq!(material.surface.opacity, 1.0);
        assert_eq!(material.surface.emissive_color, Some(NEUTRAL_GRAY));
    }

    #[test]
    fn test_invalid_and_missing_color_is_gray() {
        for json in [r#"{"materials": {"color": "red"}}"#, r#"{"materials": {}}"#] {
            let stage = build_stage(&model(json));
            let PrimKind::Material(material) = &world(&stage).children[0].kind else {
                panic!("Expected Material prim");
            };
            assert_eq!(material.surface.diffuse_color, Vec3::new(0.5, 0.5, 0.5));
        }
    }

    #[test]
    fn test_non_string_colors_are_gray() {
        let stage = build_stage(&model(
            r#"{"materials": {"diffuse": 112233, "emissive": [1, 0, 0]},
                "lighting": {"pointLights": [{"color": 16777215, "intensity": "2"}]}}"#,
        ));
        let children = &world(&stage).children;
        let PrimKind::Material(material) = &children[0].kind else {
            panic!("Expected Material prim");
        };
        assert_eq!(material.surface.diffuse_color, NEUTRAL_GRAY);
        assert_eq!(material.surface.emissive_color, Some(NEUTRAL_GRAY));
        let PrimKind::Light(light) = &children[1].kind else {
            panic!("Expected Light prim");
        };
        assert_eq!(light.color, NEUTRAL_GRAY);
        assert_eq!(light.intensity, 2.0);
    }

    #[test]
    fn test_float_face_indices_build_mesh() {
        let stage = build_stage(&model(
            r#"{"vertices": [[0,0,0],[1,0,0],[1,1,0],[0,1,0]], "faces": [[0.0, 1.0, 2.0, 3.0], [0, 1.5, 2]],
                "physics": {"enabled": null}}"#,
        ));
        assert_eq!(world(&stage).children.len(), 1);
        let mesh = mesh(&stage);
        assert_eq!(mesh.face_vertex_counts, vec![3, 3]);
        assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_explicit_zero_values_are_kept() {
        let stage = build_stage(&model(
            r#"{"materials": {"roughness": 0, "opacity": 0, "metalness": 2.5},
                "lighting": {"pointLights": [{"intensity": 0}]}}"#,
        ));
        let children = &world(&stage).children;
        let PrimKind::Material(material) = &children[0].kind else {
            panic!("Expected Material prim");
        };
        assert_eq!(material.surface.roughness, 0.0);
        assert_eq!(material.surface.opacity, 0.0);
        assert_eq!(material.surface.metallic, 1.0);
        let PrimKind::Light(light) = &children[1].kind else {
            panic!("Expected Light prim");
        };
        assert_eq!(light.intensity, 0.0);
    }

    #[test]
    fn test_light_defaults() {
        let stage = build_stage(&model(
            r##"{"lighting": {"directionalLights": [{"color": "#FFFFFF", "intensity": 2}]}}"##,
        ));
        let prim = &world(&stage).children[0];
        assert_eq!(prim.path, "/World/DirectionalLight0");
        assert_eq!(prim.type_name(), "DistantLight");
        let PrimKind::Light(light) = &prim.kind else {
            panic!("Expected Light prim");
        };
        assert_eq!(light.intensity, 2.0);
        assert_eq!(light.color, Vec3::ONE);
        assert_eq!(light.color_temperature, 6500.0);
        assert!(light.normalize);
        assert!(!light.enable_color_temperature);
        assert_eq!(light.exposure, 0.0);
        assert_eq!(light.diffuse, 1.0);
        assert_eq!(light.specular, 1.0);
        assert_eq!(light.shadow_enable, None);
        assert_eq!(light.radius, None);
    }

    #[test]
    fn test_light_ordering_and_paths() {
        let stage = build_stage(&model(
            r#"{"physics": {"enabled": true},
                "lighting": {"pointLights": [{}, {"castShadow": false}], "directionalLights": [{}]},
                "materials": {}}"#,
        ));
        let paths: Vec<&str> = world(&stage).children.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/World/Material",
                "/World/DirectionalLight0",
                "/World/PointLight0",
                "/World/PointLight1",
                "/World/Physics",
            ]
        );
        let PrimKind::Light(light) = &world(&stage).children[3].kind else {
            panic!("Expected Light prim");
        };
        assert_eq!(light.light_type, LightType::Sphere);
        assert_eq!(light.radius, Some(0.5));
        assert_eq!(light.shadow_enable, Some(false));
    }

    #[test]
    fn test_physics_mapping() {
        let stage = build_stage(&model(
            r#"{"physics": {"enabled": true, "mass": 12.5, "friction": 0.8, "collisionShape": "box"}}"#,
        ));
        let PrimKind::Physics(physics) = &world(&stage).children[0].kind else {
            panic!("Expected Physics prim");
        };
        assert_eq!(physics.rigid_body.mass, 12.5);
        assert!(!physics.rigid_body.kinematic);
        assert_eq!(physics.collider.approximation_shape, ApproximationShape::BoundingCube);
        assert_eq!(physics.collider.contact_offset, 0.02);
        assert_eq!(physics.material.static_friction, 0.8);
        assert_eq!(physics.material.dynamic_friction, 0.8);
        assert_eq!(physics.material.restitution, 0.0);
    }

    #[test]
    fn test_disabled_physics_and_missing_lighting_are_omitted() {
        let stage = build_stage(&model(r#"{"physics": {"enabled": false, "mass": 3}}"#));
        assert!(world(&stage).children.is_empty());
        assert!(!stage
            .walk()
            .any(|(_, prim)| matches!(prim.kind, PrimKind::Light(_) | PrimKind::Physics(_))));
    }

    #[test]
    fn test_stage_metadata() {
        let stage = build_stage(&model(r#"{"name": "Boiler", "description": "Steam boiler"}"#));
        assert_eq!(stage.name, "Boiler");
        assert_eq!(stage.description(), Some("Steam boiler"));
        assert_eq!(stage.metadata.get("creator").map(String::as_str), Some(CREATOR));
    }
}

//! End-to-end conversion of twin-model JSON to USDA text.

use twin_usd::hierarchy::rows;
use twin_usd::usd::{
    build_stage, parse_usda, write_usda, LightType, PrimKind, Stage, UsdaWriter, WriteOptions,
};
use twin_usd::{TwinModel, UsdaExport};

const CUBE: &str = r##"{
    "name": "Cube",
    "materials": {"color": "#3366FF"},
    "geometry": {
        "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0]],
        "faces": [[0, 1, 2]]
    }
}"##;

const FULL: &str = r##"{
    "name": "Pump Station",
    "description": "Line \"A\" pump",
    "geometry": {
        "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0], [0.5, 0.5, 1]],
        "faces": [[0, 1, 2, 3], [0, 1, 4], [1, 2, 4], [0, 9, 4]],
        "normals": [[0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1]],
        "uvs": [[0, 0], [1, 0], [1, 1], [0, 1], [0.5, 0.5]]
    },
    "materials": {"diffuse": "#808080", "metalness": 0.8, "roughness": 0, "emissive": "#FF8000"},
    "lighting": {
        "directionalLights": [{"color": "#FFFFFF", "intensity": 2, "castShadow": true}],
        "pointLights": [{"color": "#FFEEDD", "intensity": 40}]
    },
    "physics": {"enabled": true, "mass": 120, "friction": 0.7, "collisionShape": "box"}
}"##;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn model(json: &str) -> TwinModel {
    TwinModel::from_json(json).unwrap()
}

fn world(stage: &Stage) -> &twin_usd::Prim {
    stage.find_prim("/World").unwrap()
}

#[test]
fn test_cube_scenario() {
    let stage = build_stage(&model(CUBE));
    let world = world(&stage);

    assert_eq!(stage.prims.len(), 1);
    assert_eq!(world.children.len(), 2);
    assert_eq!(world.children[0].type_name(), "Mesh");
    assert_eq!(world.children[1].type_name(), "Material");

    let PrimKind::Mesh(mesh) = &world.children[0].kind else {
        panic!("Expected Mesh prim");
    };
    assert_eq!(mesh.points.len(), 3);
    assert_eq!(mesh.face_vertex_counts, vec![3]);
    assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2]);

    let PrimKind::Material(material) = &world.children[1].kind else {
        panic!("Expected Material prim");
    };
    let diffuse = material.surface.diffuse_color;
    assert!((diffuse.x - 0.2).abs() < 1e-6);
    assert!((diffuse.y - 0.4).abs() < 1e-6);
    assert!((diffuse.z - 1.0).abs() < 1e-6);

    let text = write_usda(&stage);
    assert!(text.lines().any(|l| l.trim() == "int[] faceVertexCounts = [3]"));

    // The diffuse color sits inside the nested Shader block
    let shader = text.find("def Shader \"Surface\"").unwrap();
    let diffuse_line = text.find("color3f inputs:diffuseColor = (0.2, 0.4, 1)").unwrap();
    let shader_end = shader + text[shader..].find('}').unwrap();
    assert!(shader < diffuse_line && diffuse_line < shader_end);
}

#[test]
fn test_cube_hierarchy_rows() {
    let rows = rows(&build_stage(&model(CUBE)));
    assert_eq!(rows.len(), 3);
    assert_eq!((rows[0].path.as_str(), rows[0].depth, rows[0].child_count), ("/World", 0, 2));
    assert_eq!((rows[1].path.as_str(), rows[1].depth), ("/World/Mesh", 1));
    assert_eq!((rows[2].path.as_str(), rows[2].depth), ("/World/Material", 1));
}

#[test]
fn test_build_is_deterministic() {
    let m = model(FULL);
    let first = build_stage(&m);
    let second = build_stage(&m);
    assert_eq!(first, second);
    assert_eq!(write_usda(&first), write_usda(&second));
}

#[test]
fn test_full_model_children_and_counts() {
    init_logging();
    let stage = build_stage(&model(FULL));
    let world = world(&stage);

    let names: Vec<&str> = world.children.iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec!["Mesh", "Material", "DirectionalLight0", "PointLight0", "Physics"]
    );

    // Quad fans into two triangles; the face indexing vertex 9 is dropped
    let PrimKind::Mesh(mesh) = &world.children[0].kind else {
        panic!("Expected Mesh prim");
    };
    assert_eq!(mesh.face_vertex_counts, vec![3; 4]);
    assert_eq!(mesh.face_vertex_indices.len(), 3 * mesh.face_vertex_counts.len());
    assert_eq!(&mesh.face_vertex_indices[..6], &[0, 1, 2, 0, 2, 3]);

    let PrimKind::Light(point) = &world.children[3].kind else {
        panic!("Expected Light prim");
    };
    assert_eq!(point.light_type, LightType::Sphere);
    assert_eq!(point.intensity, 40.0);
}

#[test]
fn test_legacy_shape_builds_same_mesh() {
    let nested = model(CUBE);
    let legacy = model(
        r##"{
        "name": "Cube",
        "materials": {"color": "#3366FF"},
        "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0]],
        "faces": [[0, 1, 2]]
    }"##,
    );
    assert_eq!(build_stage(&legacy), build_stage(&nested));
}

#[test]
fn test_optional_subtrees_are_omitted() {
    let stage = build_stage(&model(r#"{"physics": {"enabled": false, "mass": 5}}"#));
    assert!(world(&stage).children.is_empty());

    let text = write_usda(&stage);
    assert!(!text.contains("PhysicsScene"));
    assert!(!text.contains("Light"));
}

#[test]
fn test_directional_light_defaults() {
    let stage = build_stage(&model(
        r##"{"lighting": {"directionalLights": [{"color": "#FFFFFF", "intensity": 2}]}}"##,
    ));
    let light = stage.find_prim("/World/DirectionalLight0").unwrap();
    let PrimKind::Light(data) = &light.kind else {
        panic!("Expected Light prim");
    };
    assert_eq!(data.color_temperature, 6500.0);
    assert!(data.normalize);
    assert_eq!(data.intensity, 2.0);
    assert_eq!(data.shadow_enable, None);
}

#[test]
fn test_braces_balance() {
    for json in [CUBE, FULL, "{}"] {
        for indent in [0, 2, 4] {
            let text = UsdaWriter::new(WriteOptions::with_indent_width(indent))
                .write(&build_stage(&model(json)));
            assert_eq!(text.matches('{').count(), text.matches('}').count());
        }
    }
}

#[test]
fn test_braces_in_description_stay_balanced() {
    let stage = build_stage(&model(r#"{"name": "X", "description": "Tank {v2"}"#));
    assert_eq!(stage.description(), Some("Tank {v2"));

    let text = write_usda(&stage);
    assert_eq!(text.matches('{').count(), text.matches('}').count());
    assert!(parse_usda(&text, "X").is_ok());
}

#[test]
fn test_empty_stage_is_header_only() {
    let text = write_usda(&Stage::new("Empty"));
    assert!(text.starts_with("#usda 1.0\n(\n"));
    assert!(text.ends_with(")\n"));
    assert!(!text.contains('{'));
}

#[test]
fn test_written_stage_reads_back() {
    init_logging();
    let built = build_stage(&model(FULL));
    let text = write_usda(&built);

    let read = parse_usda(&text, &built.name).unwrap();
    assert_eq!(read.prims, built.prims);
    assert_eq!(read.default_prim, built.default_prim);
    assert_eq!(read.time_codes_per_second, built.time_codes_per_second);
    assert_eq!(read.end_time_code, built.end_time_code);
    assert_eq!(built.description(), Some("Line \"A\" pump"));
    assert!(read.metadata.is_empty());

    // Writing the read stage reproduces the text
    assert_eq!(write_usda(&read), text);
}

#[test]
fn test_export_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let export = UsdaExport::from_model(&model(FULL), &WriteOptions::default());
    let path = export.write_to(dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "Pump Station.usda");

    let text = std::fs::read_to_string(&path).unwrap();
    let stage = parse_usda(&text, "Pump Station").unwrap();
    assert_eq!(stage.prim_count(), 6);
}

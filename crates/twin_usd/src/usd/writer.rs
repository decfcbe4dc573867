//! USDA (ASCII) stage writer.
//!
//! Walks the stage depth-first and emits one `def` block per prim, with the
//! type-specific properties first and child blocks after them, each child one
//! indentation unit deeper than its parent.

use serde::{Deserialize, Serialize};
use twin_math::{format_real, format_real_f64, format_tuple, Transform, Vec2, Vec3};

use crate::usd::types::*;

/// Output options for the USDA writer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// One indentation unit, repeated per tree depth
    pub indent: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
        }
    }
}

impl WriteOptions {
    /// Indent with `width` spaces per level.
    pub fn with_indent_width(width: usize) -> Self {
        Self {
            indent: " ".repeat(width),
        }
    }
}

/// Writer for `.usda` documents.
#[derive(Clone, Debug, Default)]
pub struct UsdaWriter {
    options: WriteOptions,
}

impl UsdaWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Serialize a stage to USDA text.
    pub fn write(&self, stage: &Stage) -> String {
        let mut builder = UsdaBuilder::new(&self.options.indent);
        builder.write_header(stage);
        for prim in &stage.prims {
            builder.write_blank();
            builder.write_prim(prim);
        }
        builder.output
    }
}

/// Serialize a stage with default options.
pub fn write_usda(stage: &Stage) -> String {
    UsdaWriter::default().write(stage)
}

/// Builder for USDA output.
struct UsdaBuilder<'a> {
    output: String,
    indent: usize,
    unit: &'a str,
}

impl<'a> UsdaBuilder<'a> {
    fn new(unit: &'a str) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            unit,
        }
    }

    fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str(self.unit);
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn write_blank(&mut self) {
        self.output.push('\n');
    }

    fn open_block(&mut self) {
        self.write_line("{");
        self.indent += 1;
    }

    fn close_block(&mut self) {
        self.indent -= 1;
        self.write_line("}");
    }

    fn write_header(&mut self, stage: &Stage) {
        self.write_line("#usda 1.0");
        self.write_line("(");
        self.indent += 1;

        // defaultPrim names a root prim, not a path
        let default_prim = stage.default_prim.trim_start_matches('/');
        self.write_line(&format!("defaultPrim = {}", quote(default_prim)));
        self.write_line(&format!(
            "timeCodesPerSecond = {}",
            format_real_f64(stage.time_codes_per_second)
        ));
        self.write_line("upAxis = \"Y\"");
        self.write_line("metersPerUnit = 1");
        self.write_line(&format!(
            "startTimeCode = {}",
            format_real_f64(stage.start_time_code)
        ));
        self.write_line(&format!("endTimeCode = {}", format_real_f64(stage.end_time_code)));

        self.indent -= 1;
        self.write_line(")");
    }

    fn write_prim(&mut self, prim: &Prim) {
        self.write_line(&format!("def {} {} (", prim.type_name(), quote(prim.name())));
        if !prim.active {
            self.indent += 1;
            self.write_line("active = false");
            self.indent -= 1;
        }
        self.write_line(")");
        self.open_block();

        match &prim.kind {
            PrimKind::Xform(xform) => self.write_xform(&xform.transform),
            PrimKind::Mesh(mesh) => self.write_mesh(mesh),
            PrimKind::Material(material) => self.write_material(&prim.path, &material.surface),
            PrimKind::Light(light) => self.write_light(light),
            PrimKind::Physics(physics) => self.write_physics(physics),
        }

        for child in &prim.children {
            self.write_blank();
            self.write_prim(child);
        }

        self.close_block();
    }

    fn write_xform(&mut self, transform: &Transform) {
        let rows: Vec<String> = transform
            .to_usd_rows()
            .iter()
            .map(|row| format_tuple(row))
            .collect();
        self.write_line(&format!("matrix4d xformOp:transform = ( {} )", rows.join(", ")));
        self.write_line("uniform token[] xformOpOrder = [\"xformOp:transform\"]");
    }

    fn write_mesh(&mut self, mesh: &MeshData) {
        self.write_line(&format!(
            "int[] faceVertexCounts = {}",
            int_array(&mesh.face_vertex_counts)
        ));
        self.write_line(&format!(
            "int[] faceVertexIndices = {}",
            int_array(&mesh.face_vertex_indices)
        ));
        self.write_line(&format!("point3f[] points = {}", vec3_array(&mesh.points)));

        if let Some(normals) = &mesh.normals {
            self.write_line(&format!("normal3f[] normals = {}", vec3_array(normals)));
        }

        if let Some(st) = &mesh.st {
            self.write_line(&format!("texCoord2f[] primvars:st = {} (", vec2_array(&st.values)));
            self.indent += 1;
            self.write_line(&format!("interpolation = {}", quote(&st.interpolation)));
            self.indent -= 1;
            self.write_line(")");
        }
    }

    fn write_material(&mut self, path: &str, surface: &PreviewSurface) {
        self.write_line(&format!(
            "token outputs:surface.connect = <{}/Surface.outputs:surface>",
            path
        ));
        self.write_blank();

        // UsdPreviewSurface shader
        self.write_line("def Shader \"Surface\"");
        self.open_block();
        self.write_line("uniform token info:id = \"UsdPreviewSurface\"");
        self.write_line(&format!(
            "color3f inputs:diffuseColor = {}",
            vec3(surface.diffuse_color)
        ));
        self.write_line(&format!("float inputs:metallic = {}", format_real(surface.metallic)));
        self.write_line(&format!("float inputs:roughness = {}", format_real(surface.roughness)));
        self.write_line(&format!("float inputs:opacity = {}", format_real(surface.opacity)));
        if let Some(emissive) = surface.emissive_color {
            self.write_line(&format!("color3f inputs:emissiveColor = {}", vec3(emissive)));
        }
        self.write_line("token outputs:surface");
        self.close_block();
    }

    fn write_light(&mut self, light: &LightData) {
        self.write_line(&format!("color3f inputs:color = {}", vec3(light.color)));
        self.write_line(&format!("float inputs:intensity = {}", format_real(light.intensity)));
        self.write_line(&format!("float inputs:exposure = {}", format_real(light.exposure)));
        self.write_line(&format!("float inputs:diffuse = {}", format_real(light.diffuse)));
        self.write_line(&format!("float inputs:specular = {}", format_real(light.specular)));
        self.write_line(&format!("bool inputs:normalize = {}", boolean(light.normalize)));
        self.write_line(&format!(
            "bool inputs:enableColorTemperature = {}",
            boolean(light.enable_color_temperature)
        ));
        self.write_line(&format!(
            "float inputs:colorTemperature = {}",
            format_real(light.color_temperature)
        ));
        if let Some(radius) = light.radius {
            self.write_line(&format!("float inputs:radius = {}", format_real(radius)));
        }
        if let Some(treat_as_point) = light.treat_as_point {
            self.write_line(&format!("bool treatAsPoint = {}", boolean(treat_as_point)));
        }
        if let Some(shadow) = light.shadow_enable {
            self.write_line(&format!("bool inputs:shadow:enable = {}", boolean(shadow)));
        }
    }

    fn write_physics(&mut self, physics: &PhysicsData) {
        self.write_line("bool physics:rigidBodyEnabled = 1");
        self.write_line(&format!(
            "bool physics:kinematicEnabled = {}",
            boolean(physics.rigid_body.kinematic)
        ));
        self.write_line(&format!("float physics:mass = {}", format_real(physics.rigid_body.mass)));
        self.write_line(&format!(
            "uniform token physics:approximation = {}",
            quote(physics.collider.approximation_shape.usd_token())
        ));
        self.write_line(&format!(
            "float physxCollision:contactOffset = {}",
            format_real(physics.collider.contact_offset)
        ));
        self.write_line(&format!(
            "float physxCollision:restOffset = {}",
            format_real(physics.collider.rest_offset)
        ));
        self.write_line(&format!(
            "float physics:staticFriction = {}",
            format_real(physics.material.static_friction)
        ));
        self.write_line(&format!(
            "float physics:dynamicFriction = {}",
            format_real(physics.material.dynamic_friction)
        ));
        self.write_line(&format!(
            "float physics:restitution = {}",
            format_real(physics.material.restitution)
        ));
    }
}

fn int_array(values: &[i32]) -> String {
    let parts: Vec<String> = values.iter().map(i32::to_string).collect();
    format!("[{}]", parts.join(", "))
}

fn vec3(v: Vec3) -> String {
    format_tuple(&v.to_array())
}

fn vec3_array(values: &[Vec3]) -> String {
    let parts: Vec<String> = values.iter().map(|&v| vec3(v)).collect();
    format!("[{}]", parts.join(", "))
}

fn vec2_array(values: &[Vec2]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format_tuple(&v.to_array())).collect();
    format!("[{}]", parts.join(", "))
}

fn boolean(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Quote and escape a string value.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

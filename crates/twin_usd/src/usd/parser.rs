//! USDA (ASCII) file parser.
//!
//! Line-by-line reader for the `.usda` dialect [`super::writer`] produces,
//! so exported stages can be imported back.
//!
//! # Supported Syntax
//!
//! - Layer metadata: `defaultPrim`, `timeCodesPerSecond`, `startTimeCode`,
//!   `endTimeCode`, `doc`
//! - `def Xform|Scope|Mesh|Material|DistantLight|SphereLight|PhysicsScene "Name"`
//! - Prim metadata blocks in parentheses (`active = false`)
//! - `def Shader` blocks nested in a `Material`
//! - One attribute per line; `primvars:st` may carry an `interpolation` block
//!
//! Unknown prim types are skipped with their subtree.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use thiserror::Error;
use twin_math::{Transform, Vec2, Vec3};

use super::types::*;

/// Errors that can occur during USDA parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    #[error("Unclosed block starting at line {0}")]
    UnclosedBlock(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A `type name = value` line inside a prim block.
#[derive(Clone, Debug)]
struct Attribute {
    name: String,
    value: Option<String>,
    interpolation: Option<String>,
}

/// A prim block before it is interpreted by type.
#[derive(Clone, Debug)]
struct RawPrim {
    type_name: String,
    path: String,
    active: bool,
    line: usize,
    attributes: Vec<Attribute>,
    children: Vec<RawPrim>,
}

impl RawPrim {
    fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(|a| a.value.as_deref())
    }
}

/// Layer metadata read from the header block.
#[derive(Debug, Default)]
struct LayerMetadata {
    default_prim: Option<String>,
    time_codes_per_second: Option<f64>,
    start_time_code: Option<f64>,
    end_time_code: Option<f64>,
    doc: Option<String>,
}

/// USDA file parser.
pub struct UsdaParser {
    lines: VecDeque<(usize, String)>,
    current_line: usize,
}

impl UsdaParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        let lines: VecDeque<_> = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();

        Self {
            lines,
            current_line: 0,
        }
    }

    /// Parse the USDA content into a stage called `name`.
    pub fn parse(&mut self, name: &str) -> ParseResult<Stage> {
        let metadata = self.parse_header()?;

        let mut raw_prims = Vec::new();
        while let Some((line_num, line)) = self.next_content_line() {
            let trimmed = line.trim();
            if trimmed.starts_with("def ") {
                raw_prims.push(self.parse_def(trimmed, "", line_num)?);
            } else {
                return Err(ParseError::Parse {
                    line: line_num,
                    message: format!("Expected prim definition, found: {}", trimmed),
                });
            }
        }

        let mut stage = Stage::new(name);
        if let Some(default_prim) = metadata.default_prim {
            stage.default_prim = if default_prim.starts_with('/') {
                default_prim
            } else {
                format!("/{}", default_prim)
            };
        }
        if let Some(tcps) = metadata.time_codes_per_second {
            stage.time_codes_per_second = tcps;
        }
        if let Some(start) = metadata.start_time_code {
            stage.start_time_code = start;
        }
        if let Some(end) = metadata.end_time_code {
            stage.end_time_code = end;
        }
        if let Some(doc) = metadata.doc {
            stage.metadata.insert("description".into(), doc);
        }

        for raw in &raw_prims {
            if let Some(prim) = convert_prim(raw)? {
                stage.prims.push(prim);
            }
        }

        Ok(stage)
    }

    /// Next line that is neither blank nor a comment.
    fn next_content_line(&mut self) -> Option<(usize, String)> {
        while let Some((num, line)) = self.lines.pop_front() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                self.current_line = num;
                return Some((num, line));
            }
        }
        None
    }

    /// Parse the `#usda 1.0` magic line and the layer metadata block.
    fn parse_header(&mut self) -> ParseResult<LayerMetadata> {
        let mut metadata = LayerMetadata::default();

        // Magic line
        match self.lines.front() {
            Some((num, line)) if !line.trim_start().starts_with("#usda") => {
                return Err(ParseError::Parse {
                    line: *num,
                    message: "Missing '#usda' header".to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof),
            _ => {}
        }

        // Optional metadata block in parentheses
        let starts_block = self
            .lines
            .iter()
            .map(|(_, l)| l.trim())
            .find(|t| !t.is_empty() && !t.starts_with('#'))
            .is_some_and(|t| t == "(");
        if !starts_block {
            return Ok(metadata);
        }

        let (start_line, _) = self.next_content_line().ok_or(ParseError::UnexpectedEof)?;
        loop {
            let (line_num, line) = self
                .next_content_line()
                .ok_or(ParseError::UnclosedBlock(start_line))?;
            let trimmed = line.trim();
            if trimmed == ")" {
                break;
            }
            let Some((key, value)) = trimmed.split_once(" = ") else {
                continue;
            };
            match key.trim() {
                "defaultPrim" => metadata.default_prim = Some(parse_string(value, line_num)?),
                "timeCodesPerSecond" => metadata.time_codes_per_second = Some(parse_f64(value)?),
                "startTimeCode" => metadata.start_time_code = Some(parse_f64(value)?),
                "endTimeCode" => metadata.end_time_code = Some(parse_f64(value)?),
                "doc" => metadata.doc = Some(parse_string(value, line_num)?),
                // upAxis, metersPerUnit and anything else are fixed or unused
                _ => {}
            }
        }

        Ok(metadata)
    }

    /// Parse a `def Type "Name"` block.
    fn parse_def(&mut self, line: &str, parent_path: &str, start_line: usize) -> ParseResult<RawPrim> {
        let rest = line.strip_prefix("def ").unwrap_or(line);
        let type_name = rest.split_whitespace().next().unwrap_or("").to_string();
        let name = extract_quoted(rest).ok_or_else(|| ParseError::Parse {
            line: start_line,
            message: format!("Missing prim name in: {}", line),
        })?;
        if type_name.is_empty() || type_name.starts_with('"') {
            return Err(ParseError::Parse {
                line: start_line,
                message: format!("Missing prim type in: {}", line),
            });
        }

        let path = format!("{}/{}", parent_path, name);
        let mut prim = RawPrim {
            type_name,
            path,
            active: true,
            line: start_line,
            attributes: Vec::new(),
            children: Vec::new(),
        };

        // Prim metadata: `def T "N" (` ... `)`, or a standalone `(` line
        let after_name = rest.rsplit('"').next().unwrap_or("").trim();
        let opens_metadata = if after_name.starts_with('(') {
            if after_name.contains(')') {
                prim.active = !after_name.contains("active = false");
                false
            } else {
                true
            }
        } else {
            self.peek_trimmed() == Some("(") && self.next_content_line().is_some()
        };
        if opens_metadata {
            prim.active = !self.parse_prim_metadata(start_line)?;
        }

        if !after_name.ends_with('{') {
            self.expect_opening_brace(start_line)?;
        }

        self.parse_block(&mut prim)?;
        Ok(prim)
    }

    /// Consume a prim metadata block. Returns whether it marked the prim inactive.
    fn parse_prim_metadata(&mut self, start_line: usize) -> ParseResult<bool> {
        let mut inactive = false;
        let mut depth = 1usize;
        while depth > 0 {
            let (_, line) = self
                .next_content_line()
                .ok_or(ParseError::UnclosedBlock(start_line))?;
            let trimmed = line.trim();
            depth += trimmed.matches('(').count();
            depth = depth.saturating_sub(trimmed.matches(')').count());
            if trimmed.replace(' ', "") == "active=false" {
                inactive = true;
            }
        }
        Ok(inactive)
    }

    fn peek_trimmed(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(|(_, l)| l.trim())
            .find(|t| !t.is_empty() && !t.starts_with('#'))
    }

    /// Expect and consume an opening brace.
    fn expect_opening_brace(&mut self, start_line: usize) -> ParseResult<()> {
        match self.next_content_line() {
            Some((_, line)) if line.trim() == "{" => Ok(()),
            Some((num, line)) => Err(ParseError::Parse {
                line: num,
                message: format!("Expected opening brace, found: {}", line.trim()),
            }),
            None => Err(ParseError::UnclosedBlock(start_line)),
        }
    }

    /// Parse attributes and child prims until the block's closing brace.
    fn parse_block(&mut self, prim: &mut RawPrim) -> ParseResult<()> {
        loop {
            let (line_num, line) = self
                .next_content_line()
                .ok_or(ParseError::UnclosedBlock(prim.line))?;
            let trimmed = line.trim();

            if trimmed == "}" {
                return Ok(());
            }

            if trimmed.starts_with("def ") {
                let child = self.parse_def(trimmed, &prim.path, line_num)?;
                prim.children.push(child);
                continue;
            }

            let attribute = self.parse_attribute(trimmed, line_num)?;
            prim.attributes.push(attribute);
        }
    }

    /// Parse a `[uniform] type name [= value] [(metadata)]` line.
    fn parse_attribute(&mut self, line: &str, line_num: usize) -> ParseResult<Attribute> {
        let (declaration, value) = match line.split_once(" = ") {
            Some((decl, value)) => (decl, Some(value.trim())),
            None => (line, None),
        };

        let name = declaration
            .split_whitespace()
            .last()
            .ok_or_else(|| ParseError::Parse {
                line: line_num,
                message: format!("Malformed attribute: {}", line),
            })?
            .to_string();

        let mut attribute = Attribute {
            name,
            value: value.map(str::to_string),
            interpolation: None,
        };

        // Trailing `(` opens an attribute metadata block on the following lines
        if let Some(value) = value.and_then(|v| v.strip_suffix('(')) {
            attribute.value = Some(value.trim().to_string());
            loop {
                let (meta_line, meta) = self
                    .next_content_line()
                    .ok_or(ParseError::UnclosedBlock(line_num))?;
                let meta = meta.trim();
                if meta == ")" {
                    break;
                }
                if let Some((key, v)) = meta.split_once(" = ") {
                    if key.trim() == "interpolation" {
                        attribute.interpolation = Some(parse_string(v, meta_line)?);
                    }
                }
            }
        }

        Ok(attribute)
    }
}

/// Parse a USDA string into a stage called `name`.
pub fn parse_usda(content: &str, name: &str) -> ParseResult<Stage> {
    let mut parser = UsdaParser::new(content);
    parser.parse(name)
}

/// Read and parse a USDA file. The stage is named after the file stem.
pub fn load_usda<P: AsRef<Path>>(path: P) -> ParseResult<Stage> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    log::debug!("Loading USDA file: {}", path.display());
    parse_usda(&content, &name)
}

/// Interpret a raw prim by its type. Unknown types yield `None`.
fn convert_prim(raw: &RawPrim) -> ParseResult<Option<Prim>> {
    let kind = match raw.type_name.as_str() {
        // Scope is like Xform but without transform
        "Xform" | "Scope" => PrimKind::Xform(XformData {
            transform: match raw.value("xformOp:transform") {
                Some(value) => Transform::from_usd_rows(parse_matrix(value, raw.line)?),
                None => Transform::IDENTITY,
            },
        }),
        "Mesh" => PrimKind::Mesh(convert_mesh(raw)?),
        "Material" => PrimKind::Material(convert_material(raw)?),
        "DistantLight" | "SphereLight" => {
            let light_type = LightType::from_usd_type(&raw.type_name).unwrap_or(LightType::Distant);
            PrimKind::Light(convert_light(raw, light_type)?)
        }
        "PhysicsScene" => PrimKind::Physics(convert_physics(raw)?),
        other => {
            log::debug!("Skipping unsupported prim type '{}' at {}", other, raw.path);
            return Ok(None);
        }
    };

    let mut children = Vec::new();
    for child in &raw.children {
        // Shaders are folded into their material
        if child.type_name == "Shader" && matches!(kind, PrimKind::Material(_)) {
            continue;
        }
        if let Some(prim) = convert_prim(child)? {
            children.push(prim);
        }
    }

    Ok(Some(Prim {
        path: raw.path.clone(),
        active: raw.active,
        metadata: BTreeMap::new(),
        kind,
        children,
    }))
}

fn convert_mesh(raw: &RawPrim) -> ParseResult<MeshData> {
    let mut mesh = MeshData::default();
    if let Some(value) = raw.value("faceVertexCounts") {
        mesh.face_vertex_counts = parse_int_array(value)?;
    }
    if let Some(value) = raw.value("faceVertexIndices") {
        mesh.face_vertex_indices = parse_int_array(value)?;
    }
    if let Some(value) = raw.value("points") {
        mesh.points = parse_vec3_array(value, raw.line)?;
    }
    if let Some(value) = raw.value("normals") {
        mesh.normals = Some(parse_vec3_array(value, raw.line)?);
    }
    if let Some(attr) = raw.attr("primvars:st") {
        let values = match &attr.value {
            Some(value) => parse_tuple_array(value, 2, raw.line)?
                .into_iter()
                .map(|t| Vec2::new(t[0], t[1]))
                .collect(),
            None => Vec::new(),
        };
        mesh.st = Some(Primvar {
            values,
            interpolation: attr
                .interpolation
                .clone()
                .unwrap_or_else(|| VERTEX_INTERPOLATION.to_string()),
        });
    }
    Ok(mesh)
}

fn convert_material(raw: &RawPrim) -> ParseResult<MaterialData> {
    let mut surface = PreviewSurface::default();

    let shader = raw.children.iter().find(|c| c.type_name == "Shader");
    if let Some(shader) = shader {
        if let Some(value) = shader.value("inputs:diffuseColor") {
            surface.diffuse_color = parse_vec3(value, shader.line)?;
        }
        if let Some(value) = shader.value("inputs:metallic") {
            surface.metallic = parse_f32(value)?;
        }
        if let Some(value) = shader.value("inputs:roughness") {
            surface.roughness = parse_f32(value)?;
        }
        if let Some(value) = shader.value("inputs:opacity") {
            surface.opacity = parse_f32(value)?;
        }
        if let Some(value) = shader.value("inputs:emissiveColor") {
            surface.emissive_color = Some(parse_vec3(value, shader.line)?);
        }
    } else {
        log::debug!("Material {} has no Shader child, using defaults", raw.path);
    }

    Ok(MaterialData { surface })
}

fn convert_light(raw: &RawPrim, light_type: LightType) -> ParseResult<LightData> {
    let mut light = LightData::for_type(light_type);
    if let Some(value) = raw.value("inputs:color") {
        light.color = parse_vec3(value, raw.line)?;
    }
    let floats: [(&str, &mut f32); 5] = [
        ("inputs:intensity", &mut light.intensity),
        ("inputs:exposure", &mut light.exposure),
        ("inputs:diffuse", &mut light.diffuse),
        ("inputs:specular", &mut light.specular),
        ("inputs:colorTemperature", &mut light.color_temperature),
    ];
    for (name, field) in floats {
        if let Some(value) = raw.value(name) {
            *field = parse_f32(value)?;
        }
    }
    if let Some(value) = raw.value("inputs:normalize") {
        light.normalize = parse_bool(value, raw.line)?;
    }
    if let Some(value) = raw.value("inputs:enableColorTemperature") {
        light.enable_color_temperature = parse_bool(value, raw.line)?;
    }
    if let Some(value) = raw.value("inputs:radius") {
        light.radius = Some(parse_f32(value)?);
    }
    if let Some(value) = raw.value("treatAsPoint") {
        light.treat_as_point = Some(parse_bool(value, raw.line)?);
    }
    if let Some(value) = raw.value("inputs:shadow:enable") {
        light.shadow_enable = Some(parse_bool(value, raw.line)?);
    }
    Ok(light)
}

fn convert_physics(raw: &RawPrim) -> ParseResult<PhysicsData> {
    let mut physics = PhysicsData::default();
    if let Some(value) = raw.value("physics:kinematicEnabled") {
        physics.rigid_body.kinematic = parse_bool(value, raw.line)?;
    }
    if let Some(value) = raw.value("physics:approximation") {
        let token = parse_string(value, raw.line)?;
        physics.collider.approximation_shape =
            ApproximationShape::from_usd_token(&token).unwrap_or(ApproximationShape::ConvexHull);
    }
    let floats: [(&str, &mut f32); 6] = [
        ("physics:mass", &mut physics.rigid_body.mass),
        ("physxCollision:contactOffset", &mut physics.collider.contact_offset),
        ("physxCollision:restOffset", &mut physics.collider.rest_offset),
        ("physics:staticFriction", &mut physics.material.static_friction),
        ("physics:dynamicFriction", &mut physics.material.dynamic_friction),
        ("physics:restitution", &mut physics.material.restitution),
    ];
    for (name, field) in floats {
        if let Some(value) = raw.value(name) {
            *field = parse_f32(value)?;
        }
    }
    Ok(physics)
}

/// Extract the first double-quoted string.
fn extract_quoted(s: &str) -> Option<&str> {
    let start = s.find('"')? + 1;
    let len = s[start..].find('"')?;
    Some(&s[start..start + len])
}

/// Parse a quoted, escaped string value.
fn parse_string(value: &str, line: usize) -> ParseResult<String> {
    let inner = value
        .trim()
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| ParseError::Parse {
            line,
            message: format!("Expected quoted string, found: {}", value),
        })?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Ok(out)
}

fn parse_f32(value: &str) -> ParseResult<f32> {
    let value = value.trim();
    value
        .parse::<f32>()
        .map_err(|_| ParseError::InvalidNumber(value.to_string()))
}

fn parse_f64(value: &str) -> ParseResult<f64> {
    let value = value.trim();
    value
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(value.to_string()))
}

fn parse_bool(value: &str, line: usize) -> ParseResult<bool> {
    match value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(ParseError::Parse {
            line,
            message: format!("Invalid bool value: {}", other),
        }),
    }
}

/// Contents between the outermost `[` and `]`.
fn array_body(value: &str) -> &str {
    let start = value.find('[').map_or(0, |i| i + 1);
    let end = value.rfind(']').unwrap_or(value.len()).max(start);
    &value[start..end]
}

/// Parse an int array like [1, 2, 3, ...].
fn parse_int_array(value: &str) -> ParseResult<Vec<i32>> {
    array_body(value)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| ParseError::InvalidNumber(s.to_string())))
        .collect()
}

/// Parse every `(a, b, ...)` group in `s`, each with exactly `arity` components.
fn parse_tuples(s: &str, arity: usize, line: usize) -> ParseResult<Vec<Vec<f32>>> {
    let mut result = Vec::new();
    let mut rest = s;
    while let Some(open) = rest.find('(') {
        let close = rest[open..].find(')').ok_or_else(|| ParseError::Parse {
            line,
            message: format!("Unclosed tuple in: {}", s),
        })? + open;

        let components = rest[open + 1..close]
            .split(',')
            .map(parse_f32)
            .collect::<ParseResult<Vec<f32>>>()?;
        if components.len() != arity {
            return Err(ParseError::Parse {
                line,
                message: format!("Expected {} components, got {}", arity, components.len()),
            });
        }
        result.push(components);
        rest = &rest[close + 1..];
    }
    Ok(result)
}

/// Parse a tuple array like [(1, 2, 3), (4, 5, 6), ...].
fn parse_tuple_array(value: &str, arity: usize, line: usize) -> ParseResult<Vec<Vec<f32>>> {
    parse_tuples(array_body(value), arity, line)
}

fn parse_vec3_array(value: &str, line: usize) -> ParseResult<Vec<Vec3>> {
    Ok(parse_tuple_array(value, 3, line)?
        .into_iter()
        .map(|t| Vec3::new(t[0], t[1], t[2]))
        .collect())
}

/// Parse a single `(x, y, z)` value.
fn parse_vec3(value: &str, line: usize) -> ParseResult<Vec3> {
    match parse_tuples(value, 3, line)?.as_slice() {
        [t] => Ok(Vec3::new(t[0], t[1], t[2])),
        _ => Err(ParseError::Parse {
            line,
            message: format!("Expected one 3-tuple, found: {}", value),
        }),
    }
}

/// Parse a `( (r0), (r1), (r2), (r3) )` matrix.
fn parse_matrix(value: &str, line: usize) -> ParseResult<[[f32; 4]; 4]> {
    let inner = value
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| ParseError::Parse {
            line,
            message: format!("Malformed matrix: {}", value),
        })?;

    let rows = parse_tuples(inner, 4, line)?;
    if rows.len() != 4 {
        return Err(ParseError::Parse {
            line,
            message: format!("Expected 4 matrix rows, got {}", rows.len()),
        });
    }

    let mut matrix = [[0.0; 4]; 4];
    for (dst, src) in matrix.iter_mut().zip(rows) {
        dst.copy_from_slice(&src);
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_mesh() {
        let usda = r#"#usda 1.0
(
    defaultPrim = "World"
)

def Xform "World" (
)
{
    def Mesh "Cube" (
    )
    {
        int[] faceVertexCounts = [3, 3]
        int[] faceVertexIndices = [0, 1, 2, 0, 2, 3]
        point3f[] points = [(0, 0, 0), (1, 0, 0), (1, 1, 0), (0, 1, 0)]
    }
}
"#;

        let stage = parse_usda(usda, "cube").unwrap();
        assert_eq!(stage.default_prim, "/World");
        assert_eq!(stage.prims.len(), 1);

        let cube = stage.find_prim("/World/Cube").unwrap();
        if let PrimKind::Mesh(mesh) = &cube.kind {
            assert_eq!(mesh.points.len(), 4);
            assert_eq!(mesh.face_vertex_counts, vec![3, 3]);
            assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2, 0, 2, 3]);
            assert!(mesh.normals.is_none());
        } else {
            panic!("Expected Mesh prim");
        }
    }

    #[test]
    fn test_parse_header_metadata() {
        let usda = r#"#usda 1.0
(
    defaultPrim = "Root"
    timeCodesPerSecond = 30
    startTimeCode = 1
    endTimeCode = 48
    doc = "Authored {elsewhere}"
)
"#;

        let stage = parse_usda(usda, "header").unwrap();
        assert_eq!(stage.default_prim, "/Root");
        assert_eq!(stage.time_codes_per_second, 30.0);
        assert_eq!(stage.start_time_code, 1.0);
        assert_eq!(stage.end_time_code, 48.0);
        assert_eq!(stage.description(), Some("Authored {elsewhere}"));
        assert!(stage.prims.is_empty());
    }

    #[test]
    fn test_parse_xform_matrix() {
        let usda = r#"#usda 1.0

def Xform "Model"
{
    matrix4d xformOp:transform = ( (2, 0, 0, 0), (0, 2, 0, 0), (0, 0, 2, 0), (1, 2, 3, 1) )
    uniform token[] xformOpOrder = ["xformOp:transform"]
}
"#;

        let stage = parse_usda(usda, "model").unwrap();
        let PrimKind::Xform(xform) = &stage.prims[0].kind else {
            panic!("Expected Xform prim");
        };
        assert!((xform.transform.translation - Vec3::new(1.0, 2.0, 3.0)).length() < 0.001);
        assert!((xform.transform.scale - Vec3::splat(2.0)).length() < 0.001);
    }

    #[test]
    fn test_parse_inactive_and_primvar() {
        let usda = r#"#usda 1.0

def Mesh "Tri" (
    active = false
)
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (0, 1, 0)]
    texCoord2f[] primvars:st = [(0, 0), (1, 0), (0, 1)] (
        interpolation = "faceVarying"
    )
}
"#;

        let stage = parse_usda(usda, "tri").unwrap();
        let tri = &stage.prims[0];
        assert!(!tri.active);
        let PrimKind::Mesh(mesh) = &tri.kind else {
            panic!("Expected Mesh prim");
        };
        let st = mesh.st.as_ref().unwrap();
        assert_eq!(st.interpolation, "faceVarying");
        assert_eq!(st.values[2], Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_parse_material_shader() {
        let usda = r#"#usda 1.0

def Material "Steel" (
)
{
    token outputs:surface.connect = </Steel/Surface.outputs:surface>

    def Shader "Surface"
    {
        uniform token info:id = "UsdPreviewSurface"
        color3f inputs:diffuseColor = (0.2, 0.4, 1)
        float inputs:metallic = 1
        token outputs:surface
    }
}
"#;

        let stage = parse_usda(usda, "steel").unwrap();
        let steel = &stage.prims[0];
        assert!(steel.children.is_empty());
        let PrimKind::Material(material) = &steel.kind else {
            panic!("Expected Material prim");
        };
        assert_eq!(material.surface.diffuse_color, Vec3::new(0.2, 0.4, 1.0));
        assert_eq!(material.surface.metallic, 1.0);
        assert_eq!(material.surface.roughness, 0.5);
        assert_eq!(material.surface.emissive_color, None);
    }

    #[test]
    fn test_unknown_prims_are_skipped() {
        let usda = r#"#usda 1.0

def Xform "World"
{
    def Camera "Cam"
    {
        float focalLength = 50
        def Xform "Nested"
        {
        }
    }

    def DistantLight "Sun"
    {
        float inputs:intensity = 3
    }
}
"#;

        let stage = parse_usda(usda, "scene").unwrap();
        let world = &stage.prims[0];
        assert_eq!(world.children.len(), 1);
        assert_eq!(world.children[0].type_name(), "DistantLight");
    }

    #[test]
    fn test_unclosed_block() {
        let usda = "#usda 1.0\n\ndef Xform \"World\"\n{\n    def Mesh \"M\"\n    {\n";
        assert!(matches!(parse_usda(usda, "bad"), Err(ParseError::UnclosedBlock(_))));
    }

    #[test]
    fn test_missing_magic_and_bad_numbers() {
        assert!(matches!(
            parse_usda("def Xform \"World\"\n{\n}\n", "x"),
            Err(ParseError::Parse { line: 1, .. })
        ));

        let usda = "#usda 1.0\n\ndef Mesh \"M\"\n{\n    int[] faceVertexCounts = [3, x]\n}\n";
        assert!(matches!(parse_usda(usda, "bad"), Err(ParseError::InvalidNumber(_))));
    }

    #[test]
    fn test_load_usda_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate_box.usda");
        std::fs::write(&path, "#usda 1.0\n\ndef Xform \"World\"\n{\n}\n").unwrap();

        let stage = load_usda(&path).unwrap();
        assert_eq!(stage.name, "crate_box");
        assert_eq!(stage.prims[0].path, "/World");

        let missing = load_usda(dir.path().join("missing.usda"));
        assert!(matches!(missing, Err(ParseError::Io(_))));
    }

    #[test]
    fn test_parse_string_escapes() {
        assert_eq!(parse_string(r#""a \"b\" \\ c""#, 1).unwrap(), r#"a "b" \ c"#);
        assert!(parse_string("unquoted", 1).is_err());
    }
}

//! Downloadable `.usda` artifacts.

use std::io;
use std::path::{Path, PathBuf};

use crate::model::TwinModel;
use crate::usd::{build_stage, Stage, UsdaWriter, WriteOptions};

/// MIME type reported for USDA downloads.
pub const USDA_MIME_TYPE: &str = "text/plain";

/// Base file name used when the model has no name.
const FALLBACK_FILE_STEM: &str = "model";

/// A serialized stage together with the file name to save it under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsdaExport {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

impl UsdaExport {
    /// Build and serialize a model. The file name follows `model.name`.
    pub fn from_model(model: &TwinModel, options: &WriteOptions) -> Self {
        let stage = build_stage(model);
        let stem = model
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILE_STEM);
        Self::new(stem, UsdaWriter::new(options.clone()).write(&stage))
    }

    /// Serialize an existing stage. The file name follows `stage.name`.
    pub fn from_stage(stage: &Stage, options: &WriteOptions) -> Self {
        let stem = if stage.name.is_empty() {
            FALLBACK_FILE_STEM
        } else {
            stage.name.as_str()
        };
        Self::new(stem, UsdaWriter::new(options.clone()).write(stage))
    }

    fn new(stem: &str, contents: String) -> Self {
        Self {
            file_name: format!("{}.usda", sanitize_file_stem(stem)),
            mime_type: USDA_MIME_TYPE,
            contents,
        }
    }

    /// Write the contents to `dir/file_name`, returning the written path.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> io::Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.contents)?;
        log::debug!("Wrote {} ({} bytes)", path.display(), self.contents.len());
        Ok(path)
    }
}

/// Make `stem` safe as a single path component.
fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

//! Twin USD - Digital-twin models as USD scenes.
//!
//! This crate provides:
//!
//! - **Model input**: `TwinModel`, in both nested and legacy JSON shapes
//! - **USD support**: stage building, USDA writing and reading
//! - **Hierarchy view**: flattened, filterable prim rows
//! - **Export**: named `.usda` artifacts ready to save
//!
//! # Example
//!
//! ```ignore
//! use twin_usd::{TwinModel, UsdaExport, WriteOptions};
//!
//! let model = TwinModel::from_path("pump.json")?;
//! let export = UsdaExport::from_model(&model, &WriteOptions::default());
//! export.write_to("out")?;
//! ```

pub mod export;
pub mod hierarchy;
mod lenient;
pub mod model;
pub mod usd;

// Re-export commonly used types
pub use export::UsdaExport;
pub use hierarchy::{render_tree, rows, HierarchyFilter, PrimDataProvider, PrimRow};
pub use model::{ModelError, NormalizedModel, TwinModel};
pub use usd::{build_stage, load_usda, parse_usda, write_usda, ParseError, Prim, PrimKind, Stage, UsdaWriter, WriteOptions};

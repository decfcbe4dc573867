//! `twin2usd` - convert twin models to USDA and browse the result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;

use twin_usd::usd::{build_stage, load_usda, PrimKind, Stage, WriteOptions};
use twin_usd::{render_tree, rows, HierarchyFilter, TwinModel, UsdaExport};

#[derive(Parser, Debug)]
#[command(name = "twin2usd", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert twin-model JSON files to `.usda`.
    Convert {
        /// Model JSON files.
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory.
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// Spaces per indentation level.
        #[arg(long, default_value_t = 4)]
        indent: usize,
    },

    /// Print the prim hierarchy of a model `.json` or a `.usda` file.
    Tree {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print the whole stage as JSON instead of a tree.
        #[arg(long, conflicts_with_all = ["filter", "hide_inactive"])]
        json: bool,

        /// Only show prims whose path or type contains TEXT.
        #[arg(long, value_name = "TEXT")]
        filter: Option<String>,

        /// Hide inactive prims and their descendants.
        #[arg(long)]
        hide_inactive: bool,
    },

    /// Summarize a `.usda` file.
    Inspect {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    match Cli::parse().command {
        Command::Convert {
            inputs,
            output,
            indent,
        } => convert(&inputs, &output, &WriteOptions::with_indent_width(indent)),
        Command::Tree {
            input,
            json,
            filter,
            hide_inactive,
        } => {
            let stage = load_stage(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stage)?);
            } else {
                let filter = HierarchyFilter {
                    search: filter.unwrap_or_default(),
                    show_inactive: !hide_inactive,
                };
                print!("{}", render_tree(&filter.filter(&rows(&stage))));
            }
            Ok(())
        }
        Command::Inspect { input } => {
            let stage = read_usda(&input)?;
            print!("{}", StageSummary::of(&stage));
            Ok(())
        }
    }
}

/// Convert every input in parallel. Failures are reported and do not stop the rest.
fn convert(inputs: &[PathBuf], output: &Path, options: &WriteOptions) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let results: Vec<(&PathBuf, Result<PathBuf>)> = inputs
        .par_iter()
        .map(|input| (input, convert_one(input, output, options)))
        .collect();

    let mut failed = 0usize;
    for (input, result) in &results {
        match result {
            Ok(path) => println!("{} -> {}", input.display(), path.display()),
            Err(err) => {
                failed += 1;
                log::error!("{}: {:#}", input.display(), err);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} conversions failed", failed, inputs.len());
    }
    Ok(())
}

fn convert_one(input: &Path, output: &Path, options: &WriteOptions) -> Result<PathBuf> {
    let model = TwinModel::from_path(input)
        .with_context(|| format!("Failed to read model {}", input.display()))?;
    let export = UsdaExport::from_model(&model, options);
    export
        .write_to(output)
        .with_context(|| format!("Failed to write {}", export.file_name))
}

/// Load a stage from a `.usda` file, or build one from anything else as model JSON.
fn load_stage(input: &Path) -> Result<Stage> {
    let is_usda = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("usda"));
    if is_usda {
        return read_usda(input);
    }

    let model = TwinModel::from_path(input)
        .with_context(|| format!("Failed to read model {}", input.display()))?;
    Ok(build_stage(&model))
}

fn read_usda(input: &Path) -> Result<Stage> {
    load_usda(input).with_context(|| format!("Failed to load {}", input.display()))
}

/// Counts printed by `inspect`.
#[derive(Debug, Default, PartialEq)]
struct StageSummary {
    name: String,
    prims_by_type: BTreeMap<&'static str, usize>,
    triangles: usize,
    materials: usize,
    lights: usize,
    inactive: usize,
}

impl StageSummary {
    fn of(stage: &Stage) -> Self {
        let mut summary = Self {
            name: stage.name.clone(),
            ..Self::default()
        };
        for (_, prim) in stage.walk() {
            *summary.prims_by_type.entry(prim.type_name()).or_default() += 1;
            if !prim.active {
                summary.inactive += 1;
            }
            match &prim.kind {
                PrimKind::Mesh(mesh) => summary.triangles += mesh.triangle_count(),
                PrimKind::Material(_) => summary.materials += 1,
                PrimKind::Light(_) => summary.lights += 1,
                PrimKind::Xform(_) | PrimKind::Physics(_) => {}
            }
        }
        summary
    }
}

impl std::fmt::Display for StageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total: usize = self.prims_by_type.values().sum();
        writeln!(f, "Stage: {}", self.name)?;
        writeln!(f, "Prims: {} ({} inactive)", total, self.inactive)?;
        for (type_name, count) in &self.prims_by_type {
            writeln!(f, "  {:<14} {}", type_name, count)?;
        }
        writeln!(f, "Triangles: {}", self.triangles)?;
        writeln!(f, "Materials: {}", self.materials)?;
        writeln!(f, "Lights: {}", self.lights)
    }
}

pub mod ast;
pub mod block;
pub mod broadcast;
pub mod chain;
pub mod codegen;
pub mod error;
pub mod intrinsics;
pub mod package;
pub mod project;
pub mod scope;
pub mod sprite;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(all(target_arch = "wasm32", feature = "wasm-bindings"))]
pub mod wasm;

use anyhow::{Context, Result};
use ast::{parse_definitions, Definition};
use codegen::CodegenOptions;
use std::path::{Path, PathBuf};

pub use error::LowerError;

#[cfg(not(target_arch = "wasm32"))]
pub fn run_cli(args: &cli::Args) -> Result<()> {
    use package::ArtifactSink;

    let total_stages = 3
        + usize::from(args.emit_project_json.is_some())
        + usize::from(args.output.is_some());
    let progress = CliProgress::new("Compile", total_stages);
    let mut stage = 0usize;

    stage += 1;
    progress.emit(stage, "Resolving input path");
    let input = canonicalize_file(&args.input)?;

    stage += 1;
    progress.emit(stage, "Reading definitions");
    let definitions = read_definitions(&input)?;

    stage += 1;
    progress.emit(stage, "Lowering sprites and functions");
    let options = CodegenOptions {
        backdrop: args.backdrop.clone(),
    };
    let (project, assets) = codegen::build_project(&definitions, &options)?;

    if let Some(json_path) = &args.emit_project_json {
        stage += 1;
        progress.emit(stage, "Writing project.json");
        std::fs::write(json_path, serde_json::to_vec_pretty(&project.to_json())?)
            .with_context(|| format!("Failed to write '{}'.", json_path.display()))?;
    }

    if let Some(output) = &args.output {
        stage += 1;
        progress.emit(stage, "Building .sb3");
        codegen::package(&project, &assets)?.write_to(output)?;
    }

    Ok(())
}

pub fn read_definitions(path: &Path) -> Result<Vec<Definition>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'.", path.display()))?;
    parse_definitions(&text).with_context(|| format!("Invalid definitions in '{}'.", path.display()))
}

pub fn compile_definitions_to_sb3_bytes(
    definitions: &[Definition],
    options: &CodegenOptions,
) -> Result<Vec<u8>> {
    codegen::build_sb3_bytes(definitions, options)
}

pub fn compile_definitions_json_to_sb3_bytes(json: &str, options: &CodegenOptions) -> Result<Vec<u8>> {
    let definitions = parse_definitions(json)?;
    codegen::build_sb3_bytes(&definitions, options)
}

pub fn compile_file(input: &Path, output: &Path, options: &CodegenOptions) -> Result<()> {
    let input = canonicalize_file(input)?;
    let definitions = read_definitions(&input)?;
    codegen::write_sb3(&definitions, output, options)
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!("Input file not found: '{}'.", path.display()));
    }
    Ok(path.canonicalize()?)
}

#[cfg(not(target_arch = "wasm32"))]
struct CliProgress {
    prefix: &'static str,
    total: usize,
}

#[cfg(not(target_arch = "wasm32"))]
impl CliProgress {
    fn new(prefix: &'static str, total: usize) -> Self {
        Self {
            prefix,
            total: total.max(1),
        }
    }

    fn emit(&self, step: usize, label: &str) {
        let step = step.clamp(1, self.total);
        let bar = render_progress_bar(step, self.total, 14);
        eprintln!(
            "[{}] {}... ({}/{}) {}",
            self.prefix, label, step, self.total, bar
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn render_progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width) + (total / 2)) / total;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < filled { '=' } else { '-' });
    }
    s.push(']');
    s
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(render_progress_bar(0, 4, 4), "[----]");
        assert_eq!(render_progress_bar(2, 4, 4), "[==--]");
        assert_eq!(render_progress_bar(4, 4, 4), "[====]");
    }

    #[test]
    fn missing_input_is_reported() {
        let err = canonicalize_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }
}

use crate::ast::{Definition, SpriteDefinition};
use crate::broadcast::BroadcastRegistry;
use crate::error::{LowerError, LowerResult};
use crate::package::{asset_extension, asset_name, ArtifactSink, Sb3Archive};
use crate::project::{Costume, IdAllocator, Project, STAGE_NAME};
use crate::scope::{StackList, STACK_LIST_NAME};
use crate::sprite::SpriteLowering;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;
use xmltree::Element;

const DEFAULT_BACKDROP_SVG: &[u8] = include_bytes!("../assets/backdrop.svg");

type CodegenProgressCallback<'a> = dyn FnMut(usize, usize, &str) + 'a;

#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    pub backdrop: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Embedded { name: String, bytes: &'static [u8] },
    File(PathBuf),
}

pub fn write_sb3(definitions: &[Definition], output_path: &Path, options: &CodegenOptions) -> Result<()> {
    write_sb3_with_progress(
        definitions,
        output_path,
        options,
        Option::<&mut fn(usize, usize, &str)>::None,
    )
}

pub fn write_sb3_with_progress<F>(
    definitions: &[Definition],
    output_path: &Path,
    options: &CodegenOptions,
    progress: Option<&mut F>,
) -> Result<()>
where
    F: FnMut(usize, usize, &str),
{
    let mut progress = progress.map(|cb| cb as &mut CodegenProgressCallback<'_>);
    let archive = package_with_progress(definitions, options, &mut progress)?;
    report_progress(&mut progress, 1, 1, "Writing archive");
    archive.write_to(output_path)
}

pub fn build_sb3_bytes(definitions: &[Definition], options: &CodegenOptions) -> Result<Vec<u8>> {
    let mut progress: Option<&mut CodegenProgressCallback<'_>> = None;
    package_with_progress(definitions, options, &mut progress)?.into_bytes()
}

fn package_with_progress(
    definitions: &[Definition],
    options: &CodegenOptions,
    progress: &mut Option<&mut CodegenProgressCallback<'_>>,
) -> Result<Sb3Archive> {
    report_progress(progress, 1, 2, "Lowering sprites");
    let (project, assets) = build_project(definitions, options)?;
    report_progress(progress, 2, 2, "Packaging project.json and assets");
    package(&project, &assets)
}

pub fn package(project: &Project, assets: &[Asset]) -> Result<Sb3Archive> {
    let mut archive = Sb3Archive::create_empty_artifact();
    let manifest = serde_json::to_vec_pretty(&project.to_json())?;
    archive.add_manifest(&manifest)?;
    for asset in assets {
        match asset {
            Asset::Embedded { name, bytes } => archive.add_asset_bytes(name, bytes)?,
            Asset::File(path) => {
                archive.add_asset_file(path)?;
            }
        }
    }
    Ok(archive)
}

fn report_progress(
    progress: &mut Option<&mut CodegenProgressCallback<'_>>,
    step: usize,
    total: usize,
    label: &str,
) {
    if let Some(cb) = progress.as_deref_mut() {
        cb(step, total, label);
    }
}

/// Lowers `definitions` and attaches costumes. Nothing is packaged if any
/// sprite fails to lower.
pub fn build_project(definitions: &[Definition], options: &CodegenOptions) -> Result<(Project, Vec<Asset>)> {
    let mut project = ProjectAssembler::new().assemble(definitions)?;
    let (costume, asset) = load_backdrop(options)?;
    for target in &mut project.targets {
        let mut costume = costume.clone();
        costume.name = if target.is_stage {
            "backdrop1".to_string()
        } else {
            "costume1".to_string()
        };
        target.costumes.push(costume);
    }
    Ok((project, vec![asset]))
}

pub struct ProjectAssembler {
    ids: IdAllocator,
    broadcasts: BroadcastRegistry,
    project: Project,
    stack: StackList,
}

impl Default for ProjectAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectAssembler {
    pub fn new() -> Self {
        let mut ids = IdAllocator::new();
        let mut project = Project::empty();
        let list = project
            .stage_mut()
            .add_list(ids.next("list"), STACK_LIST_NAME);
        Self {
            ids,
            broadcasts: BroadcastRegistry::new(),
            project,
            stack: StackList::new(&list.id, &list.name),
        }
    }

    pub fn assemble(mut self, definitions: &[Definition]) -> LowerResult<Project> {
        let sprites = definitions
            .iter()
            .filter_map(|d| match d {
                Definition::Sprite(sprite) => Some(sprite),
                _ => None,
            })
            .collect::<Vec<_>>();

        // Every function gets its message before any body is lowered, so calls
        // may refer to functions declared later or in another sprite.
        let mut seen = HashSet::new();
        for sprite in &sprites {
            if !seen.insert(sprite.name.as_str()) {
                return Err(LowerError::DuplicateSprite {
                    name: sprite.name.clone(),
                });
            }
            SpriteLowering::register_functions(sprite, &mut self.broadcasts, &mut self.ids);
        }

        for sprite in &sprites {
            self.lower_sprite(sprite)?;
        }

        let stage = self.project.stage_mut();
        for entry in self.broadcasts.entries() {
            stage.add_broadcast(&entry.id, &entry.message);
        }
        info!(
            targets = self.project.targets.len(),
            broadcasts = self.broadcasts.len(),
            "assembled project"
        );
        Ok(self.project)
    }

    fn lower_sprite(&mut self, sprite: &SpriteDefinition) -> LowerResult<()> {
        let index = if sprite.name == STAGE_NAME {
            0
        } else {
            self.project.add_sprite(&sprite.name)
        };
        let target = &mut self.project.targets[index];
        let chains = SpriteLowering::new(sprite, &self.stack).lower(
            target,
            &mut self.broadcasts,
            &mut self.ids,
        )?;
        info!(sprite = %sprite.name, scripts = chains.len(), "lowered sprite");
        Ok(())
    }
}

fn load_backdrop(options: &CodegenOptions) -> Result<(Costume, Asset)> {
    let (data, ext, asset) = match &options.backdrop {
        Some(path) => {
            if !path.is_file() {
                bail!("Backdrop file not found: '{}'.", path.display());
            }
            let ext = asset_extension(path)?;
            let data = fs::read(path)
                .with_context(|| format!("Failed to read backdrop '{}'.", path.display()))?;
            (data, ext, Asset::File(path.clone()))
        }
        None => {
            let name = asset_name(DEFAULT_BACKDROP_SVG, "svg");
            (
                DEFAULT_BACKDROP_SVG.to_vec(),
                "svg".to_string(),
                Asset::Embedded {
                    name,
                    bytes: DEFAULT_BACKDROP_SVG,
                },
            )
        }
    };
    let rotation_center = if ext == "svg" {
        let (_, _, width, height) = read_svg_bounds(&data)?;
        (width / 2.0, height / 2.0)
    } else {
        (0.0, 0.0)
    };
    let digest = format!("{:x}", md5::compute(&data));
    Ok((
        Costume {
            name: String::new(),
            asset_id: digest,
            data_format: ext,
            rotation_center,
        },
        asset,
    ))
}

fn read_svg_bounds(data: &[u8]) -> Result<(f64, f64, f64, f64)> {
    let root =
        Element::parse(Cursor::new(data)).map_err(|e| anyhow!("Invalid SVG backdrop: {}.", e))?;
    if let Some(view_box) = root.attributes.get("viewBox") {
        let parts = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| anyhow!("Invalid SVG viewBox '{}'.", view_box))?;
        if let &[min_x, min_y, width, height] = parts.as_slice() {
            if width <= 0.0 || height <= 0.0 {
                bail!("SVG viewBox must have positive width/height.");
            }
            return Ok((min_x, min_y, width, height));
        }
    }
    let width = parse_svg_length(root.attributes.get("width").map(|s| s.as_str()));
    let height = parse_svg_length(root.attributes.get("height").map(|s| s.as_str()));
    match (width, height) {
        (Some(w), Some(h)) => Ok((0.0, 0.0, w, h)),
        _ => Ok((0.0, 0.0, 0.0, 0.0)),
    }
}

fn parse_svg_length(value: Option<&str>) -> Option<f64> {
    let s = value?.trim();
    let digits = s.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    let n = digits.parse::<f64>().ok()?;
    if n > 0.0 {
        Some(n)
    } else {
        None
    }
}

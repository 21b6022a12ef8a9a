use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const MANIFEST_NAME: &str = "project.json";

pub trait ArtifactSink {
    fn create_empty_artifact() -> Self
    where
        Self: Sized;

    fn add_manifest(&mut self, bytes: &[u8]) -> Result<()>;

    /// Copies a file from disk unmodified. Returns the archive entry name,
    /// `<md5>.<ext>`.
    fn add_asset_file(&mut self, path: &Path) -> Result<String>;

    fn add_asset_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    fn write_to(self, path: &Path) -> Result<()>
    where
        Self: Sized;
}

pub fn asset_name(bytes: &[u8], ext: &str) -> String {
    format!("{:x}.{}", md5::compute(bytes), ext)
}

pub fn asset_extension(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|x| x.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext != "svg" && ext != "png" {
        bail!(
            "Unsupported asset format '.{}' for '{}'. Only .svg and .png are supported.",
            ext,
            path.display()
        );
    }
    Ok(ext)
}

pub struct Sb3Archive {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    entries: HashSet<String>,
}

impl Sb3Archive {
    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
    }

    fn start_entry(&mut self, name: &str) -> Result<bool> {
        if !self.entries.insert(name.to_string()) {
            return Ok(false);
        }
        self.zip.start_file(name, Self::options())?;
        Ok(true)
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if !self.entries.contains(MANIFEST_NAME) {
            return Err(anyhow!("Artifact has no {}.", MANIFEST_NAME));
        }
        Ok(self.zip.finish()?.into_inner())
    }
}

impl ArtifactSink for Sb3Archive {
    fn create_empty_artifact() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            entries: HashSet::new(),
        }
    }

    fn add_manifest(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.start_entry(MANIFEST_NAME)? {
            bail!("Artifact already has a {}.", MANIFEST_NAME);
        }
        self.zip.write_all(bytes)?;
        Ok(())
    }

    fn add_asset_file(&mut self, path: &Path) -> Result<String> {
        let ext = asset_extension(path)?;
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read asset '{}'.", path.display()))?;
        let name = asset_name(&bytes, &ext);
        self.add_asset_bytes(&name, &bytes)?;
        Ok(name)
    }

    fn add_asset_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        // Assets are content-addressed, so a repeated name is the same file.
        if self.start_entry(name)? {
            self.zip.write_all(bytes)?;
        }
        Ok(())
    }

    fn write_to(self, path: &Path) -> Result<()> {
        let bytes = self.into_bytes()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes).with_context(|| format!("Failed to write '{}'.", path.display()))?;
        Ok(())
    }
}

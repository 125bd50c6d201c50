use anyhow::{Result, Context};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

// @const: Extension of accepted subtitle files
pub const SUBTITLE_EXTENSION: &str = "srt";

/// A subtitle file found on the command line or under a directory
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleSource {
    pub path: PathBuf,
    /// Directory of the file relative to the searched root; empty for
    /// files given directly
    pub relative_dir: PathBuf,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @checks: Subtitle extension, case-insensitive
    pub fn is_subtitle_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(SUBTITLE_EXTENSION))
    }

    // @generates: Output path for translated subtitle
    // @params: input_file, output_dir, target_language
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());

        let language_tag: String = target_language
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();

        output_dir
            .as_ref()
            .join(format!("{}.{}.{}", stem, language_tag, SUBTITLE_EXTENSION))
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let extension = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(extension) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Expand files and directories into an ordered list of subtitle files.
    /// Non-subtitle files are skipped; missing paths are an error.
    pub fn collect_subtitle_files(paths: &[PathBuf]) -> Result<Vec<SubtitleSource>> {
        let mut files = Vec::new();
        for path in paths {
            if Self::dir_exists(path) {
                for file in Self::find_files(path, SUBTITLE_EXTENSION)? {
                    let relative_dir = file
                        .parent()
                        .and_then(|parent| parent.strip_prefix(path).ok())
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    files.push(SubtitleSource { path: file, relative_dir });
                }
            } else if Self::file_exists(path) {
                if Self::is_subtitle_file(path) {
                    files.push(SubtitleSource { path: path.clone(), relative_dir: PathBuf::new() });
                }
            } else {
                return Err(anyhow::anyhow!("Input path does not exist: {:?}", path));
            }
        }
        Ok(files)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file through a temp file in the same directory,
    /// so readers see either the old content or the new one
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temp file for {:?}", path))?;
        temp.flush()?;
        temp.persist(path)
            .with_context(|| format!("Failed to move temp file into place: {:?}", path))?;

        Ok(())
    }
}

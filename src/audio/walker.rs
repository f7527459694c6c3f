use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{CompressorError, Result};
use crate::pipeline::is_rendered_output;

const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "wave"];

/// Expands CLI inputs (files and directories) into a list of WAV files.
#[derive(Debug, Default)]
pub struct AudioWalker;

impl AudioWalker {
    pub fn new() -> Self {
        Self
    }

    /// Finds WAV files under `root`, leaving out earlier `*.compressed.wav` outputs.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_file() && self.is_supported(path) && !is_rendered_output(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Collects WAV files from a mix of file and directory inputs.
    ///
    /// Files named explicitly are kept even without a WAV extension; the
    /// decoder reports them if they are not WAV. A file reached twice (listed
    /// and inside a listed directory, or through another spelling of its path)
    /// is kept once, at its first position.
    pub fn collect(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for input in inputs {
            if input.is_dir() {
                found.extend(self.walk(input)?);
            } else if input.is_file() {
                found.push(input.clone());
            } else {
                return Err(CompressorError::FileNotFound(input.display().to_string()));
            }
        }

        let mut seen = HashSet::new();
        let files = found
            .into_iter()
            .filter(|path| seen.insert(path.canonicalize().unwrap_or_else(|_| path.clone())))
            .collect();
        Ok(files)
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| ext.eq_ignore_ascii_case(supported))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap();
    }

    #[test]
    fn test_walk_finds_wav_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "kick.wav");
        create_file(temp_dir.path(), "nested/snare.WAV");
        create_file(temp_dir.path(), "notes.txt");

        let files = AudioWalker::new().walk(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| AudioWalker::new().is_supported(p)));
    }

    #[test]
    fn test_walk_skips_hidden() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), ".cache/bounce.wav");
        create_file(temp_dir.path(), "mix.wav");

        let files = AudioWalker::new().walk(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("mix.wav"));
    }

    #[test]
    fn test_collect_mixed_inputs() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "dir/a.wav");
        create_file(temp_dir.path(), "b.wav");

        let inputs = vec![temp_dir.path().join("dir"), temp_dir.path().join("b.wav")];
        let files = AudioWalker::new().collect(&inputs).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_collect_dedups_file_inside_listed_dir() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "a.wav");
        create_file(temp_dir.path(), "b.wav");

        let inputs = vec![
            temp_dir.path().to_path_buf(),
            temp_dir.path().join("a.wav"),
            temp_dir.path().join(".").join("b.wav"),
        ];
        let files = AudioWalker::new().collect(&inputs).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.wav"));
        assert!(files[1].ends_with("b.wav"));
    }

    #[test]
    fn test_walk_skips_rendered_outputs() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "mix.wav");
        create_file(temp_dir.path(), "mix.compressed.wav");
        create_file(temp_dir.path(), "out/bass.COMPRESSED.wav");

        let files = AudioWalker::new().walk(temp_dir.path()).unwrap();
        assert_eq!(files, vec![temp_dir.path().join("mix.wav")]);

        // Named explicitly, an output is still processed
        let explicit = vec![temp_dir.path().join("mix.compressed.wav")];
        assert_eq!(AudioWalker::new().collect(&explicit).unwrap().len(), 1);
    }

    #[test]
    fn test_collect_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = vec![temp_dir.path().join("missing.wav")];
        assert!(matches!(
            AudioWalker::new().collect(&inputs),
            Err(CompressorError::FileNotFound(_))
        ));
    }
}

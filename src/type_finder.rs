use crate::error::{Error, Result};
use crate::language::Language;
use crate::syntax_index::SyntaxIndex;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory depth searched below the start file's parent.
pub const MAX_SEARCH_DEPTH: usize = 10;

/// Directories never descended into during the sibling search, besides hidden ones.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "build",
    "target",
    "dist",
    "out",
    "bin",
];

/// Where a named declaration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationLocation {
    pub type_name: String,
    /// File that actually holds the declaration.
    pub file_path: PathBuf,
    /// 1-based line of the first token of the declaration node.
    pub line_number: usize,
    pub source_code: String,
    pub imports: Vec<String>,
}

/// Locates named declarations for one language.
///
/// A finder holds no parser state between calls: every lookup builds a fresh
/// [`SyntaxIndex`] and reparses whatever it reads, so finders are cheap to
/// create and safe to use from several threads at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeFinder {
    language: Language,
}

impl TypeFinder {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Finds the declaration of `type_name`, starting at `start_file`.
    ///
    /// The start file is searched first when it exists. Otherwise, or when it does
    /// not declare the type, every file with the same extension under the start
    /// file's parent directory is searched in file-name order, up to
    /// [`MAX_SEARCH_DEPTH`] levels deep.
    ///
    /// # Arguments
    ///
    /// * `start_file` - File the caller expects to hold the type
    /// * `type_name` - Simple name of the declaration
    ///
    /// # Returns
    ///
    /// The first matching location, or `None` when nothing searched declares the type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `start_file` does not carry this finder's
    /// extension, and I/O or parse errors raised while reading the start file.
    pub fn find_by_name(
        &self,
        start_file: &Path,
        type_name: &str,
    ) -> Result<Option<DeclarationLocation>> {
        self.find(start_file, type_name, None)
    }

    /// Like [`find_by_name`](Self::find_by_name), but the sibling search never
    /// starts above `root`. When the start file's parent lies outside `root`, the
    /// search covers `root` instead.
    ///
    /// Both paths are compared as given, so callers pass canonical paths.
    pub fn find_within(
        &self,
        root: &Path,
        start_file: &Path,
        type_name: &str,
    ) -> Result<Option<DeclarationLocation>> {
        self.find(start_file, type_name, Some(root))
    }

    fn find(
        &self,
        start_file: &Path,
        type_name: &str,
        root: Option<&Path>,
    ) -> Result<Option<DeclarationLocation>> {
        self.check_extension(start_file)?;

        let mut index = SyntaxIndex::new(self.language)?;
        let searched_start = start_file.is_file();

        if searched_start {
            if let Some(location) = self.search_file(&mut index, start_file, type_name)? {
                return Ok(Some(location));
            }
            debug!(
                "`{}` not declared in {}, searching siblings",
                type_name,
                start_file.display()
            );
        }

        let parent = match start_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let parent = match root {
            Some(root) if !parent.starts_with(root) => root,
            _ => parent,
        };

        for candidate in self.candidate_files(parent) {
            if searched_start && candidate == start_file {
                continue;
            }
            match self.search_file(&mut index, &candidate, type_name) {
                Ok(Some(location)) => return Ok(Some(location)),
                Ok(None) => {}
                Err(e) => debug!("Skipping {}: {}", candidate.display(), e),
            }
        }

        Ok(None)
    }

    fn check_extension(&self, file: &Path) -> Result<()> {
        let expected = self.language.extension();
        let actual = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match actual {
            Some(ext) if ext == expected => Ok(()),
            Some(ext) => Err(Error::invalid_input(format!(
                "expected .{} file, but got .{}",
                expected, ext
            ))),
            None => Err(Error::invalid_input(format!(
                "expected .{} file, but got a file without extension",
                expected
            ))),
        }
    }

    /// Same-extension files below `dir`, depth first, sorted by name within each directory.
    fn candidate_files(&self, dir: &Path) -> Vec<PathBuf> {
        let extension = self.language.extension();

        WalkDir::new(dir)
            .max_depth(MAX_SEARCH_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') && !IGNORED_DIRS.contains(&name.as_ref())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Failed to access path: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .collect()
    }

    fn search_file(
        &self,
        index: &mut SyntaxIndex,
        path: &Path,
        type_name: &str,
    ) -> Result<Option<DeclarationLocation>> {
        let source = fs::read_to_string(path)?;
        let parsed = index.parse(source, path)?;

        let Some(node) = index.find_declaration(&parsed, type_name) else {
            return Ok(None);
        };

        Ok(Some(DeclarationLocation {
            type_name: type_name.to_string(),
            file_path: path.to_path_buf(),
            line_number: node.start_position().row + 1,
            source_code: parsed.text_of(node).to_string(),
            imports: index.list_imports(&parsed),
        }))
    }
}

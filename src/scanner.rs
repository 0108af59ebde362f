use crate::language::Language;
use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files at or above this size are never read.
pub const MAX_FILE_SIZE: u64 = 500_000;

/// Directory names never descended into, besides hidden directories.
pub const EXCLUDED_DIRS: &[&str] = &[
    // Build outputs
    "build", "dist", "out", "target", "bin",
    // Dependencies
    "node_modules", "vendor", "Pods",
    // Python environments
    "__pycache__", "venv", "env",
    // Tests
    "test", "tests", "__tests__", "spec", "specs",
    // Others
    "coverage", "docs", "documentation",
];

/// File scanner that finds API controllers in a project.
///
/// The `FileScanner` walks a project directory, reads every source file of a
/// supported language and keeps the ones that look like they declare HTTP
/// endpoints. Comments are stripped before matching so commented-out routes do
/// not count.
///
/// # Example
///
/// ```no_run
/// use openapi_scribe::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} controllers", result.files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// A source file that looks like an API controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub absolute_path: PathBuf,
    /// Path relative to the scanned root
    pub relative_path: PathBuf,
    pub content: String,
    pub language: Language,
    pub estimated_endpoints: usize,
    /// Web framework guessed from the source, if any
    pub framework: Option<&'static str>,
}

/// Counts over one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Supported source files that were inspected
    pub total_files_scanned: usize,
    pub api_files_found: usize,
    pub by_language: BTreeMap<&'static str, usize>,
    pub by_framework: BTreeMap<&'static str, usize>,
    pub estimated_total_endpoints: usize,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Controllers, most endpoints first
    pub files: Vec<ScannedFile>,
    pub summary: ScanSummary,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

struct Patterns {
    controller: Vec<Regex>,
    endpoint: Vec<Regex>,
    comments: Vec<Regex>,
}

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .filter_map(|source| Regex::new(source).ok())
        .collect()
}

const C_STYLE_COMMENTS: &[&str] = &[r"(?m)//.*$", r"/\*[\s\S]*?\*/"];
const SPRING_ENDPOINT: &[&str] = &[r"@(Get|Post|Put|Delete|Patch|Request)Mapping\s*\("];

fn pattern_sources(
    language: Language,
) -> (&'static [&'static str], &'static [&'static str], &'static [&'static str]) {
    match language {
        // Spring MVC, WebFlux, Ktor
        Language::Kotlin => (
            &[
                r"@(Rest)?Controller\b",
                r"@(Get|Post|Put|Delete|Patch|Request)Mapping\s*\(",
                r"@RouterOperation\b",
                r"\brouting\s*\{",
                r#"\bget\s*\(\s*["'/]"#,
                r#"\bpost\s*\(\s*["'/]"#,
            ],
            SPRING_ENDPOINT,
            C_STYLE_COMMENTS,
        ),
        // Spring, JAX-RS
        Language::Java => (
            &[
                r"@(Rest)?Controller\b",
                r"@(Get|Post|Put|Delete|Patch|Request)Mapping\s*\(",
                r"@RouterOperation\b",
                r"@Path\s*\(",
            ],
            SPRING_ENDPOINT,
            C_STYLE_COMMENTS,
        ),
        // NestJS, Express, Hono, Fastify
        Language::TypeScript => (
            &[
                r"@Controller\s*\(",
                r"@(Get|Post|Put|Delete|Patch)\s*\(",
                r"\brouter\.(get|post|put|delete|patch)\s*\(",
                r#"\bapp\.(get|post|put|delete|patch)\s*\(["'/]"#,
                r#"\.route\s*\(\s*["'/]"#,
                r"\bHono\s*\(\s*\)",
                r"\bfastify\.(get|post|put|delete)\s*\(",
            ],
            &[r#"(@(Get|Post|Put|Delete|Patch)\s*\()|(\.(?:get|post|put|delete|patch)\s*\(\s*["'/])"#],
            C_STYLE_COMMENTS,
        ),
        // Express, Koa, Hapi, Fastify
        Language::JavaScript => (
            &[
                r#"\brouter\.(get|post|put|delete|patch)\s*\(\s*["'/]"#,
                r#"\bapp\.(get|post|put|delete|patch)\s*\(\s*["'/]"#,
                r"express\.Router\s*\(\s*\)",
                r"\bserver\.route\s*\(\s*\{",
                r"\bfastify\.(get|post|put|delete)\s*\(",
            ],
            &[r#"\.(?:get|post|put|delete|patch)\s*\(\s*["'/]"#],
            C_STYLE_COMMENTS,
        ),
        // FastAPI, Flask, Django, Django REST Framework
        Language::Python => (
            &[
                r"@(app|router)\.(get|post|put|delete|patch)\s*\(",
                r"\bAPIRouter\s*\(",
                r"@(app|blueprint)\.route\s*\(",
                r#"\bpath\s*\(\s*["']"#,
                r#"\bre_path\s*\(\s*["']"#,
                r"@api_view\s*\(\s*\[",
                r"class\s+\w+\s*\(\s*\w*(APIView|ViewSet|ModelViewSet)",
            ],
            &[r#"@(app|router)\.(get|post|put|delete|patch)\s*\(|\bpath\s*\(\s*["']"#],
            &[r"(?m)#.*$", r#"('''[\s\S]*?''')|("""[\s\S]*?""")"#],
        ),
        // net/http, Gin, Echo, Fiber, Chi, Gorilla Mux
        Language::Go => (
            &[
                r"\bhttp\.(HandleFunc|Handle)\s*\(",
                r#"\b(GET|POST|PUT|DELETE|PATCH)\s*\(\s*["']"#,
                r#"\.(Get|Post|Put|Delete|Patch)\s*\(\s*["']"#,
                r"\bmux\.(HandleFunc|Handle)\s*\(",
                r"\becho\.New\s*\(",
                r"\bgin\.(Default|New)\s*\(",
                r"\bfiber\.New\s*\(",
                r"\bchi\.(NewRouter|Router)\s*\(",
            ],
            &[r#"(\.(?:GET|POST|PUT|DELETE|PATCH|Get|Post|Put|Delete|Patch|HandleFunc)\s*\(\s*["'])|(http\.Handle\()"#],
            C_STYLE_COMMENTS,
        ),
    }
}

static PATTERNS: Lazy<HashMap<Language, Patterns>> = Lazy::new(|| {
    Language::ALL
        .into_iter()
        .map(|language| {
            let (controller, endpoint, comments) = pattern_sources(language);
            (
                language,
                Patterns {
                    controller: compile(controller),
                    endpoint: compile(endpoint),
                    comments: compile(comments),
                },
            )
        })
        .collect()
});

static NEST_CONTROLLER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"@Controller\s*\(").ok());

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    ///
    /// # Arguments
    ///
    /// * `root_path` - The root directory to scan for controllers
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects every controller-like file.
    ///
    /// Hidden directories and the names in [`EXCLUDED_DIRS`] are skipped, as are
    /// files of [`MAX_FILE_SIZE`] or more. Unreadable entries are logged and
    /// recorded as warnings, but scanning continues.
    ///
    /// # Returns
    ///
    /// Returns a `ScanResult` with the controllers sorted by estimated endpoint
    /// count, most first.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be accessed.
    pub fn scan(&self) -> Result<ScanResult> {
        let root = self.root_path.canonicalize().with_context(|| {
            format!("Cannot access project directory {}", self.root_path.display())
        })?;

        let mut files = Vec::new();
        let mut warnings = Vec::new();
        let mut total_files_scanned = 0;

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') && !EXCLUDED_DIRS.contains(&name.as_ref())
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let Some(language) = Language::from_path(entry.path()) else {
                continue;
            };
            let too_large = entry
                .metadata()
                .map(|m| m.len() >= MAX_FILE_SIZE)
                .unwrap_or(true);
            if too_large {
                debug!("Skipping {} (too large or unreadable)", entry.path().display());
                continue;
            }

            total_files_scanned += 1;
            match fs::read_to_string(entry.path()) {
                Ok(content) => {
                    if let Some(file) = inspect(&root, entry.path(), content, language) {
                        files.push(file);
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to read {}: {}", entry.path().display(), e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        files.sort_by(|a, b| b.estimated_endpoints.cmp(&a.estimated_endpoints));

        let mut summary = ScanSummary {
            total_files_scanned,
            api_files_found: files.len(),
            ..Default::default()
        };
        for file in &files {
            *summary.by_language.entry(file.language.as_str()).or_default() += 1;
            if let Some(framework) = file.framework {
                *summary.by_framework.entry(framework).or_default() += 1;
            }
            summary.estimated_total_endpoints += file.estimated_endpoints;
        }

        Ok(ScanResult {
            files,
            summary,
            warnings,
        })
    }
}

fn inspect(root: &Path, path: &Path, content: String, language: Language) -> Option<ScannedFile> {
    let patterns = PATTERNS.get(&language)?;
    let code = strip_comments(&content, &patterns.comments);

    if !patterns.controller.iter().any(|re| re.is_match(&code)) {
        return None;
    }

    let estimated_endpoints = patterns
        .endpoint
        .iter()
        .map(|re| re.find_iter(&code).count())
        .sum();

    Some(ScannedFile {
        absolute_path: path.to_path_buf(),
        relative_path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
        framework: detect_framework(&code, language),
        content,
        language,
        estimated_endpoints,
    })
}

fn strip_comments(content: &str, comments: &[Regex]) -> String {
    comments.iter().fold(content.to_string(), |code, re| {
        re.replace_all(&code, "").into_owned()
    })
}

fn detect_framework(code: &str, language: Language) -> Option<&'static str> {
    let has = |needle: &str| code.contains(needle);
    match language {
        Language::Kotlin if has("@RestController") || has("@Controller") => Some("Spring"),
        Language::Kotlin if has("routing {") => Some("Ktor"),
        Language::Java if has("@RestController") || has("@Controller") => Some("Spring"),
        Language::Java if has("@Path(") => Some("JAX-RS"),
        Language::TypeScript
            if NEST_CONTROLLER.as_ref().is_some_and(|re| re.is_match(code)) =>
        {
            Some("NestJS")
        }
        Language::TypeScript if has("Hono") => Some("Hono"),
        Language::TypeScript if has("fastify") => Some("Fastify"),
        Language::TypeScript if has("express") || has("Router()") => Some("Express"),
        Language::JavaScript if has("express") => Some("Express"),
        Language::JavaScript if has("fastify") => Some("Fastify"),
        Language::JavaScript if has("server.route") => Some("Hapi"),
        Language::JavaScript if has("new Koa") => Some("Koa"),
        Language::Python if has("FastAPI") || has("APIRouter") => Some("FastAPI"),
        Language::Python if has("Flask") || has("@blueprint") => Some("Flask"),
        Language::Python if has("APIView") || has("ViewSet") => Some("Django REST"),
        Language::Python if has("path(") || has("re_path(") => Some("Django"),
        Language::Go if has("gin.") => Some("Gin"),
        Language::Go if has("echo.") => Some("Echo"),
        Language::Go if has("fiber.") => Some("Fiber"),
        Language::Go if has("chi.") => Some("Chi"),
        Language::Go if has("mux.") => Some("Gorilla Mux"),
        Language::Go if has("http.HandleFunc") => Some("net/http"),
        _ => None,
    }
}

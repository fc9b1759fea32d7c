//! Model folder ingestion
//!
//! Reads `relationships.tmdl` from the root, then every other `.tmdl` file
//! below it in sorted path order. Unreadable files are skipped with a
//! warning diagnostic; a single bad file never fails the run.

use semaudit_core::{Diagnostic, DiagnosticCode, Location, Model, Severity};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::expressions::parse_parameters;
use crate::relationships::parse_relationships;
use crate::table::{find_table_name, parse_table};

/// Name of the relationship file at the model root
pub const RELATIONSHIPS_FILE: &str = "relationships.tmdl";

/// Model ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum TmdlError {
    #[error("Model root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("Model root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Parser for a TMDL `definition/` folder
#[derive(Debug, Clone)]
pub struct ModelParser {
    root: PathBuf,
}

impl ModelParser {
    /// Create a parser for the given model root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Parse the whole folder into a [`Model`]
    pub fn parse(&self) -> Result<Model, TmdlError> {
        if !self.root.exists() {
            return Err(TmdlError::MissingRoot(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(TmdlError::NotADirectory(self.root.clone()));
        }

        tracing::info!(root = %self.root.display(), "parsing model definition");

        let mut model = Model::new();

        let relationships_path = self.root.join(RELATIONSHIPS_FILE);
        if relationships_path.exists() {
            if let Some(content) = self.read_file(&relationships_path, &mut model) {
                self.ingest_relationships(&relationships_path, &content, &mut model);
            }
        }

        let files = self.declaration_files(&mut model);
        tracing::debug!(count = files.len(), "found declaration files");

        for path in files {
            let Some(content) = self.read_file(&path, &mut model) else {
                continue;
            };
            self.ingest_file(&path, &content, &mut model);
        }

        tracing::info!(
            tables = model.tables().len(),
            measures = model.measures().len(),
            parameters = model.parameters.len(),
            relationships = model.relationships.len(),
            "model ingested"
        );

        Ok(model)
    }

    /// All `.tmdl` files except relationship files, sorted by path
    fn declaration_files(&self, model: &mut Model) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    let mut diag = Diagnostic::new(
                        DiagnosticCode::FileReadFailed,
                        Severity::Warn,
                        format!("Failed to read directory entry: {}", e),
                    );
                    if let Some(path) = e.path() {
                        diag = diag.with_location(self.location(path));
                    }
                    model.diagnostics.push(diag);
                    continue;
                }
            };

            let path = entry.path();
            let is_tmdl = path.extension().map_or(false, |ext| ext == "tmdl");
            let is_relationships = entry
                .file_name()
                .to_string_lossy()
                .contains(RELATIONSHIPS_FILE);

            if entry.file_type().is_file() && is_tmdl && !is_relationships {
                files.push(path.to_path_buf());
            }
        }

        files
    }

    fn read_file(&self, path: &Path, model: &mut Model) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
                model.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::FileReadFailed,
                        Severity::Warn,
                        format!("Failed to read {}: {}", path.display(), e),
                    )
                    .with_location(self.location(path)),
                );
                None
            }
        }
    }

    fn ingest_relationships(&self, path: &Path, content: &str, model: &mut Model) {
        let blocks = parse_relationships(content);

        for id in blocks.incomplete {
            model.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::IncompleteRelationship,
                    Severity::Info,
                    format!("Relationship {} has no fromColumn/toColumn pair", id),
                )
                .with_location(self.location(path))
                .with_subject(id),
            );
        }

        model.relationships.extend(blocks.relationships);
    }

    /// Route a declaration file to table or parameter parsing
    fn ingest_file(&self, path: &Path, content: &str, model: &mut Model) {
        if let Some(table_name) = find_table_name(content) {
            tracing::debug!(file = %path.display(), table = %table_name, "table file");

            let parsed = parse_table(&table_name, content);

            if let Some(previous) = model.insert_table(parsed.table) {
                tracing::warn!(table = %previous.name, "table declared twice, keeping latest");
                model.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::DuplicateTable,
                        Severity::Warn,
                        format!("Table '{}' is declared more than once", previous.name),
                    )
                    .with_location(self.location(path))
                    .with_subject(previous.name),
                );
            }

            for measure in parsed.measures {
                if let Some(previous) = model.insert_measure(measure) {
                    tracing::warn!(measure = %previous.name, "measure name reused, keeping latest");
                    model.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::DuplicateMeasure,
                            Severity::Warn,
                            format!(
                                "Measure '{}' (home table '{}') is redefined; measure names are model-global",
                                previous.name, previous.home_table
                            ),
                        )
                        .with_location(self.location(path))
                        .with_subject(previous.name),
                    );
                }
            }
        } else if content.contains("expression") {
            tracing::debug!(file = %path.display(), "expression file");

            for parameter in parse_parameters(content) {
                match model.parameters.iter_mut().find(|p| p.name == parameter.name) {
                    Some(existing) => *existing = parameter,
                    None => model.parameters.push(parameter),
                }
            }
        }
    }

    fn location(&self, path: &Path) -> Location {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        Location::new(relative.display().to_string())
    }
}

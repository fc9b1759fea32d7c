//! Table origin classification
//!
//! Signatures are checked in order and the first one whose function name
//! appears in the source wins, so an Excel workbook fetched over
//! `Web.Contents` is still Excel.

use std::fmt;
use semaudit_core::Parameter;
use crate::calls::find_calls;
use crate::lexer::{Token, TokenKind};

/// Where a table's data physically comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginKind {
    Excel,
    SqlDatabase,
    Csv,
    Web,
    SharePoint,
    Dataflow,

    /// M code without a recognized connector
    GeneralTransformation,

    /// No source expression at all
    Calculated,
}

impl OriginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginKind::Excel => "Excel",
            OriginKind::SqlDatabase => "SQL Database",
            OriginKind::Csv => "CSV",
            OriginKind::Web => "Web",
            OriginKind::SharePoint => "SharePoint",
            OriginKind::Dataflow => "Dataflow",
            OriginKind::GeneralTransformation => "General Transformation",
            OriginKind::Calculated => "Calculated/DirectQuery",
        }
    }

    /// Path reported when nothing more specific can be extracted
    pub fn fallback_path(&self) -> &'static str {
        match self {
            OriginKind::Excel => "Dynamic Excel",
            OriginKind::SqlDatabase => "SQL",
            OriginKind::Csv => "CSV",
            OriginKind::Web => "Web",
            OriginKind::SharePoint => "SharePoint Site",
            OriginKind::Dataflow => "Dataflow ID",
            OriginKind::GeneralTransformation => "Internal Logic",
            OriginKind::Calculated => "Internal Model",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered connector signatures. A pattern ending in `.` matches any member
/// of that library.
const ORIGIN_SIGNATURES: &[(OriginKind, &[&str])] = &[
    (OriginKind::Excel, &["Excel.Workbook", "Excel.Database"]),
    (OriginKind::SqlDatabase, &["Sql.Database", "Sql.Databases"]),
    (OriginKind::Csv, &["Csv.Document"]),
    (OriginKind::Web, &["Web.Contents"]),
    (OriginKind::SharePoint, &["SharePoint."]),
    (OriginKind::Dataflow, &["PowerPlatform.Dataflows"]),
];

fn signature_matches(pattern: &str, name: &str) -> bool {
    if pattern.ends_with('.') {
        name.starts_with(pattern)
    } else {
        name == pattern
    }
}

/// Resolved origin path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPath {
    /// The source is driven by a model parameter
    Parameter(String),

    /// File path, URL or `server | database` pulled from the connector call
    Location(String),

    /// Nothing extractable
    Fallback(&'static str),
}

impl fmt::Display for OriginPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginPath::Parameter(name) => write!(f, "Parameter: {}", name),
            OriginPath::Location(location) => f.write_str(location),
            OriginPath::Fallback(label) => f.write_str(label),
        }
    }
}

/// Classified origin of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub kind: OriginKind,
    pub path: OriginPath,
}

impl Origin {
    /// Origin of a table without source expression
    pub fn calculated() -> Self {
        Self {
            kind: OriginKind::Calculated,
            path: OriginPath::Fallback(OriginKind::Calculated.fallback_path()),
        }
    }
}

/// Classify the connector used by the source tokens
pub fn classify(tokens: &[Token<'_>]) -> OriginKind {
    ORIGIN_SIGNATURES
        .iter()
        .find(|(_, patterns)| {
            tokens.iter().any(|token| {
                token.kind == TokenKind::Ident
                    && patterns.iter().any(|p| signature_matches(p, token.text))
            })
        })
        .map(|(kind, _)| *kind)
        .unwrap_or(OriginKind::GeneralTransformation)
}

/// First parameter (in declaration order) referenced bare or as `#"name"`
pub fn detect_parameter<'p>(tokens: &[Token<'_>], parameters: &'p [Parameter]) -> Option<&'p Parameter> {
    parameters.iter().find(|param| {
        tokens.iter().any(|token| match token.kind {
            TokenKind::Ident | TokenKind::QuotedIdent => token.value() == param.name,
            _ => false,
        })
    })
}

/// Full origin: parameter-driven path first, else per-connector extraction
pub fn resolve_origin(tokens: &[Token<'_>], parameters: &[Parameter]) -> Origin {
    let kind = classify(tokens);

    let path = match detect_parameter(tokens, parameters) {
        Some(param) => OriginPath::Parameter(param.name.clone()),
        None => extract_path(kind, tokens)
            .map(OriginPath::Location)
            .unwrap_or(OriginPath::Fallback(kind.fallback_path())),
    };

    Origin { kind, path }
}

fn extract_path(kind: OriginKind, tokens: &[Token<'_>]) -> Option<String> {
    match kind {
        OriginKind::Excel => first_literal(tokens, "Web.Contents")
            .or_else(|| first_literal(tokens, "File.Contents")),
        OriginKind::SqlDatabase => find_calls(tokens, |name| name == "Sql.Database")
            .into_iter()
            .find_map(|call| {
                let server = call.string_arg(0)?;
                let database = call.string_arg(1)?;
                Some(format!("{} | {}", server, database))
            }),
        OriginKind::Csv => first_literal(tokens, "File.Contents")
            .or_else(|| first_literal(tokens, "Web.Contents")),
        OriginKind::Web => first_literal(tokens, "Web.Contents"),
        OriginKind::SharePoint => find_calls(tokens, |name| name.starts_with("SharePoint."))
            .into_iter()
            .find_map(|call| call.string_arg(0)),
        OriginKind::Dataflow | OriginKind::GeneralTransformation | OriginKind::Calculated => None,
    }
}

/// Literal first argument of the first matching call that has one
fn first_literal(tokens: &[Token<'_>], function: &str) -> Option<String> {
    find_calls(tokens, |name| name == function)
        .into_iter()
        .find_map(|call| call.string_arg(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn origin(src: &str, parameters: &[Parameter]) -> (OriginKind, String) {
        let tokens = tokenize(src);
        let origin = resolve_origin(&tokens, parameters);
        (origin.kind, origin.path.to_string())
    }

    #[test]
    fn sql_server_and_database() {
        assert_eq!(
            origin(r#"Source = Sql.Database("srv", "db")"#, &[]),
            (OriginKind::SqlDatabase, "srv | db".to_string())
        );
        assert_eq!(
            origin(r#"Source = Sql.Database(Server, "db")"#, &[]),
            (OriginKind::SqlDatabase, "SQL".to_string())
        );
    }

    #[test]
    fn server_level_sql_source() {
        assert_eq!(
            origin(r#"Source = Sql.Databases("srv")"#, &[]),
            (OriginKind::SqlDatabase, "SQL".to_string())
        );
    }

    #[test]
    fn excel_wins_over_web() {
        let src = r#"Source = Excel.Workbook(Web.Contents("https://share/x.xlsx"), null, true)"#;
        assert_eq!(
            origin(src, &[]),
            (OriginKind::Excel, "https://share/x.xlsx".to_string())
        );

        let src = r#"Source = Excel.Workbook(File.Contents("C:\in.xlsx"))"#;
        assert_eq!(origin(src, &[]).1, "C:\\in.xlsx");

        let src = r#"Source = Excel.Workbook(Contents)"#;
        assert_eq!(origin(src, &[]).1, "Dynamic Excel");
    }

    #[test]
    fn csv_web_sharepoint_and_dataflow() {
        assert_eq!(
            origin(r#"Csv.Document(File.Contents("D:\a.csv"), [Delimiter=","])"#, &[]),
            (OriginKind::Csv, "D:\\a.csv".to_string())
        );
        assert_eq!(
            origin(r#"Json.Document(Web.Contents("https://api"))"#, &[]),
            (OriginKind::Web, "https://api".to_string())
        );
        assert_eq!(
            origin(r#"SharePoint.Files("https://corp.sharepoint.com/sites/x", [ApiVersion = 15])"#, &[]),
            (OriginKind::SharePoint, "https://corp.sharepoint.com/sites/x".to_string())
        );
        assert_eq!(
            origin("PowerPlatform.Dataflows(null)", &[]),
            (OriginKind::Dataflow, "Dataflow ID".to_string())
        );
    }

    #[test]
    fn unrecognized_connector_is_general() {
        assert_eq!(
            origin("Source = #table({\"A\"}, {{1}})", &[]),
            (OriginKind::GeneralTransformation, "Internal Logic".to_string())
        );
    }

    #[test]
    fn parameter_reference_overrides_path() {
        let params = vec![Parameter::new("Server", "sql01"), Parameter::new("Db Name", "sales")];

        assert_eq!(
            origin(r#"Sql.Database(Server, "db")"#, &params),
            (OriginKind::SqlDatabase, "Parameter: Server".to_string())
        );
        assert_eq!(
            origin(r#"Sql.Database("srv", #"Db Name")"#, &params),
            (OriginKind::SqlDatabase, "Parameter: Db Name".to_string())
        );
    }

    #[test]
    fn parameter_name_inside_string_is_not_a_reference() {
        let params = vec![Parameter::new("Server", "sql01")];
        assert_eq!(
            origin(r#"Sql.Database("Server", "db")"#, &params).1,
            "Server | db"
        );
    }

    #[test]
    fn calculated_origin_labels() {
        let origin = Origin::calculated();
        assert_eq!(origin.kind.to_string(), "Calculated/DirectQuery");
        assert_eq!(origin.path.to_string(), "Internal Model");
    }
}

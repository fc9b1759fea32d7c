//! Integration tests for model folder ingestion

use pretty_assertions::assert_eq;
use semaudit_core::{DiagnosticCode, RelationType};
use semaudit_tmdl::{ModelParser, TmdlError};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_model(root: &Path) {
    write(
        root,
        "relationships.tmdl",
        "relationship 0f1e\n\tfromColumn: Sales.DateKey\n\ttoColumn: Calendar.DateKey\n",
    );
    write(
        root,
        "tables/Sales.tmdl",
        "table Sales\n\
         \tmeasure Total = SUM(Sales[Amount])\n\
         \tcolumn Amount\n\
         \t\tdataType: decimal\n\
         \tcolumn Date\n\
         \t\tdataType: dateTime\n\
         \tpartition Sales = m\n\
         \t\tsource =\n\
         \t\t\t\tlet\n\
         \t\t\t\t    Source = Sql.Database(\"srv\", \"db\")\n\
         \t\t\t\tin\n\
         \t\t\t\t    Source\n",
    );
    write(
        root,
        "tables/Calendar.tmdl",
        "table Calendar\n\tcolumn DateKey\n\tcolumn Year = YEAR(Calendar[DateKey])\n",
    );
    write(
        root,
        "expressions.tmdl",
        "expression Region = \"West\" meta [IsParameterQuery=true]\n",
    );
}

#[test]
fn parses_full_definition_folder() {
    let dir = tempfile::tempdir().unwrap();
    sample_model(dir.path());

    let model = ModelParser::new(dir.path()).parse().unwrap();

    // Tables come in sorted file order: Calendar.tmdl before Sales.tmdl
    let names: Vec<_> = model.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Calendar", "Sales"]);

    let sales = model.table("sales").unwrap();
    assert_eq!(sales.column_names(), vec!["Amount", "Date"]);
    assert!(sales.source.contains("Sql.Database"));

    let calendar = model.table("Calendar").unwrap();
    assert!(!calendar.has_source());
    assert_eq!(calendar.columns[1].expression.as_deref(), Some("YEAR(Calendar[DateKey])"));

    let total = model.measure("total").unwrap();
    assert_eq!(total.expression, "SUM(Sales[Amount])");
    assert_eq!(total.home_table, "Sales");

    assert_eq!(model.relationships.len(), 1);
    assert_eq!(model.relationships[0].relation_type, RelationType::ManyToOne);

    assert_eq!(model.parameter("Region").map(|p| p.value.as_str()), Some("West"));
    assert!(model.diagnostics.is_empty());
}

#[test]
fn missing_root_returns_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    match ModelParser::new(&missing).parse() {
        Err(TmdlError::MissingRoot(path)) => assert_eq!(path, missing),
        other => panic!("expected MissingRoot, got {:?}", other),
    }
}

#[test]
fn undecodable_file_is_skipped_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    sample_model(dir.path());
    fs::write(dir.path().join("tables/Broken.tmdl"), [0xff, 0xfe, 0x00, 0x74]).unwrap();

    let model = ModelParser::new(dir.path()).parse().unwrap();

    assert_eq!(model.tables().len(), 2);
    assert_eq!(model.diagnostics.len(), 1);
    assert_eq!(model.diagnostics[0].code, DiagnosticCode::FileReadFailed);
    assert_eq!(
        model.diagnostics[0].location.as_ref().map(|l| l.file.replace('\\', "/")),
        Some("tables/Broken.tmdl".to_string())
    );
}

#[test]
fn duplicate_measure_names_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tables/A.tmdl", "table A\n\tmeasure Total = 1\n");
    write(dir.path(), "tables/B.tmdl", "table B\n\tmeasure total = 2\n");

    let model = ModelParser::new(dir.path()).parse().unwrap();

    assert_eq!(model.measures().len(), 1);
    assert_eq!(model.measure("Total").unwrap().home_table, "B");
    assert_eq!(model.diagnostics[0].code, DiagnosticCode::DuplicateMeasure);
}

#[test]
fn empty_folder_yields_empty_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = ModelParser::new(dir.path()).parse().unwrap();
    assert!(model.is_empty());
}

#[test]
fn non_tmdl_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "notes.txt", "table Fake\n\tcolumn X\n");
    write(dir.path(), "tables/Real.tmdl", "table Real\n\tcolumn X\n");

    let model = ModelParser::new(dir.path()).parse().unwrap();
    assert_eq!(model.tables().len(), 1);
    assert_eq!(model.tables()[0].name, "Real");
}

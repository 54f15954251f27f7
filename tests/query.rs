//! End-to-end runs on in-memory SQLite.

use flatsql::engine;
use flatsql::prelude::*;
use pretty_assertions::assert_eq;
use std::path::Path;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

async fn run(read: ReadOptions, sql: &str) -> Result<SliceWriter> {
    let mut fs = FlatSql::new(FileImporter::new(read), SliceWriter::new());
    fs.exec(sql).await?;
    Ok(fs.into_exporter().into_writer())
}

fn texts(rows: &[Row]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(Value::to_text).collect())
        .collect()
}

#[tokio::test]
async fn test_csv_ordered_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "pairs.csv", "h1,h2\nb,2\na,1\nc,3\n");

    let sql = format!("SELECT h1, h2 FROM {} ORDER BY h1", file);
    let result = run(ReadOptions::new().header(true), &sql).await.unwrap();

    assert_eq!(result.columns, vec!["h1", "h2"]);
    assert_eq!(
        texts(&result.rows),
        vec![vec!["a", "1"], vec!["b", "2"], vec!["c", "3"]]
    );
}

#[tokio::test]
async fn test_query_without_table() {
    let result = run(ReadOptions::new(), "SELECT 1+1").await.unwrap();
    assert_eq!(texts(&result.rows), vec![vec!["2"]]);
}

#[tokio::test]
async fn test_missing_file_is_not_imported() {
    let mut engine = engine::connect(Driver::Sqlite, "").await.unwrap();
    let mut importer = FileImporter::default();
    let sql = "SELECT * FROM missing_file.csv";
    assert_eq!(importer.import(engine.as_mut(), sql).await.unwrap(), sql);
}

#[tokio::test]
async fn test_join_csv_and_ltsv() {
    let dir = tempfile::tempdir().unwrap();
    let users = write(dir.path(), "users.csv", "id,name\n1,ann\n2,bob\n");
    let logins = write(dir.path(), "logins.ltsv", "id:2\tat:mon\nid:1\tat:tue\nid:2\tat:wed\n");

    let sql = format!(
        "SELECT u.name, count(*) FROM {} AS u JOIN {} AS l ON u.id = l.id GROUP BY u.name ORDER BY u.name",
        users, logins
    );
    let read = ReadOptions::new().header(true).pre_read(10);
    let result = run(read, &sql).await.unwrap();
    assert_eq!(texts(&result.rows), vec![vec!["ann", "1"], vec!["bob", "2"]]);
}

#[tokio::test]
async fn test_glob_concatenates_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ltsv", "host:a\tstatus:200\n");
    write(dir.path(), "b.ltsv", "host:b\tstatus:404\n");

    let pattern = format!("{}/*.ltsv", dir.path().display());
    let sql = format!("SELECT host FROM {} ORDER BY host", pattern);
    let result = run(ReadOptions::new(), &sql).await.unwrap();
    assert_eq!(texts(&result.rows), vec![vec!["a"], vec!["b"]]);
}

#[tokio::test]
async fn test_json_path_with_row_number() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", r#"{"items":[{"name":"x"},{"name":"y"}]}"#);

    let sql = format!("SELECT num, name FROM {}::items ORDER BY num", doc);
    let result = run(ReadOptions::new().row_number(true), &sql).await.unwrap();
    assert_eq!(result.columns, vec!["num", "name"]);
    assert_eq!(texts(&result.rows), vec![vec!["1", "x"], vec!["2", "y"]]);
}

#[tokio::test]
async fn test_reference_inside_another_reference() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", r#"{"items":[{"a":1},{"a":2}]}"#);

    let sql = format!(
        "SELECT '{doc}' AS src, count(*) FROM {doc} AS d, {doc}::items AS i",
        doc = doc
    );
    let result = run(ReadOptions::new(), &sql).await.unwrap();
    assert_eq!(texts(&result.rows), vec![vec![doc, "2".to_string()]]);
}

#[tokio::test]
async fn test_null_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "nulls.csv", "a,\\N\n\\N,b\n");

    let sql = format!("SELECT count(*) FROM {} WHERE c1 IS NULL OR c2 IS NULL", file);
    let result = run(ReadOptions::new().null("\\N"), &sql).await.unwrap();
    assert_eq!(texts(&result.rows), vec![vec!["2"]]);
}

#[tokio::test]
async fn test_reader_importer_from_memory() {
    let data = vec![vec!["apple", "3"], vec!["pear", "5"]];
    let importer = ReaderImporter::new("fruit", SliceReader::new(&data).unwrap());
    let mut fs = FlatSql::new(importer, SliceWriter::new());
    fs.exec("SELECT c1 FROM fruit WHERE c2 = '5'").await.unwrap();

    let result = fs.into_exporter().into_writer();
    assert_eq!(texts(&result.rows), vec![vec!["pear"]]);
}

#[tokio::test]
async fn test_bad_query_is_engine_error() {
    let err = run(ReadOptions::new(), "SELEC nonsense").await.unwrap_err();
    assert!(matches!(err, Error::Engine { .. }));
}

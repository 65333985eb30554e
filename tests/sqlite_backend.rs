use db_ops::{Backend, Error, Result, SqliteBackend, Value};
use tempfile::NamedTempFile;

// Helper function to create an in-memory database for testing
fn create_test_db() -> Result<SqliteBackend> {
    let backend = SqliteBackend::open_in_memory()?;
    initialize_schema(&backend)?;
    Ok(backend)
}

// Helper function to create a temporary file-based database
fn create_temp_db() -> Result<(SqliteBackend, NamedTempFile)> {
    let temp_file = NamedTempFile::new().unwrap();
    let backend = SqliteBackend::open(temp_file.path())?;
    initialize_schema(&backend)?;
    Ok((backend, temp_file))
}

fn initialize_schema(backend: &SqliteBackend) -> Result<()> {
    backend.connection().execute_batch(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            age INTEGER
        );
        "#,
    )?;
    Ok(())
}

#[test]
fn test_basic_operations() {
    test_basic_operations_impl().unwrap();
}

fn test_basic_operations_impl() -> Result<()> {
    let db = create_test_db()?;

    let inserted = db.execute(
        "INSERT INTO users (name, email, age) VALUES (?1, ?2, ?3)",
        &[Value::from("John Doe"), Value::from("john@example.com"), Value::from(30)],
    )?;
    assert_eq!(inserted, 1);

    let result = db.query(
        "SELECT id, name, email, age FROM users WHERE id = ?",
        &[Value::Integer(1)],
    )?;
    assert_eq!(result.columns, ["id", "name", "email", "age"]);
    assert_eq!(
        result.rows,
        vec![vec![
            Value::Integer(1),
            Value::from("John Doe"),
            Value::from("john@example.com"),
            Value::Integer(30),
        ]]
    );

    db.execute("UPDATE users SET age = ? WHERE id = ?", &[Value::from(31), Value::from(1)])?;
    let age = db.query("SELECT age FROM users WHERE id = 1", &[])?;
    assert_eq!(age.rows, vec![vec![Value::Integer(31)]]);

    db.execute("DELETE FROM users WHERE id = ?", &[Value::from(1)])?;
    let gone = db.query("SELECT id FROM users WHERE id = 1", &[])?;
    assert!(gone.rows.is_empty());
    assert!(gone.has_result_set());

    Ok(())
}

#[test]
fn test_execute_many_commits_all_rows() -> Result<()> {
    let db = create_test_db()?;
    let rows = vec![
        vec![Value::from("a"), Value::from("a@x.com"), Value::Null],
        vec![Value::from("b"), Value::from("b@x.com"), Value::Integer(40)],
    ];
    let inserted = db.execute_many("INSERT INTO users (name, email, age) VALUES (?, ?, ?)", &rows)?;
    assert_eq!(inserted, 2);

    let result = db.query("SELECT name, age FROM users ORDER BY name", &[])?;
    assert_eq!(result.rows[0], vec![Value::from("a"), Value::Null]);
    assert_eq!(result.rows[1], vec![Value::from("b"), Value::Integer(40)]);
    Ok(())
}

#[test]
fn test_execute_many_rolls_back_on_failure() -> Result<()> {
    let db = create_test_db()?;
    let rows = vec![
        vec![Value::from("a"), Value::from("dup@x.com")],
        vec![Value::from("b"), Value::from("dup@x.com")],
    ];
    let err = db
        .execute_many("INSERT INTO users (name, email) VALUES (?, ?)", &rows)
        .unwrap_err();
    assert!(matches!(err, Error::Sqlite(_)));

    let count = db.query("SELECT COUNT(*) FROM users", &[])?;
    assert_eq!(count.rows, vec![vec![Value::Integer(0)]]);
    Ok(())
}

#[test]
fn test_statement_without_result_set() -> Result<()> {
    let db = create_test_db()?;
    let result = db.query("CREATE TABLE extra (id INTEGER)", &[])?;
    assert!(!result.has_result_set());

    let tables = db.query(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        &[],
    )?;
    assert_eq!(
        tables.rows,
        vec![vec![Value::from("extra")], vec![Value::from("users")]]
    );
    Ok(())
}

#[test]
fn test_booleans_and_blobs() -> Result<()> {
    let db = create_test_db()?;
    let result = db.query("SELECT ?, ?", &[Value::Boolean(true), Value::Blob(vec![1, 2])])?;
    assert_eq!(
        result.rows,
        vec![vec![Value::Integer(1), Value::Blob(vec![1, 2])]]
    );
    Ok(())
}

#[test]
fn test_file_database_persists() -> Result<()> {
    let (db, temp_file) = create_temp_db()?;
    db.execute(
        "INSERT INTO users (name, email) VALUES (?, ?)",
        &[Value::from("Jane"), Value::from("jane@example.com")],
    )?;
    drop(db);

    let reopened = SqliteBackend::open(temp_file.path())?;
    reopened.ping()?;
    let result = reopened.query("SELECT name FROM users", &[])?;
    assert_eq!(result.rows, vec![vec![Value::from("Jane")]]);
    Ok(())
}

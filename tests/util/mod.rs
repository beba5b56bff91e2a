use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// The small catalog most tests run against.
#[allow(dead_code)]
pub fn seed_json() -> serde_json::Value {
    json!({
        "institutions": [
            {"id": 1, "name": "Stanford University", "location": "Stanford, CA"},
            {"id": 2, "name": "Oxford University", "location": "Oxford, UK"},
            {"id": 3, "name": "Stanton College", "location": "Stanton, TX"}
        ],
        "instructors": [
            {
                "id": 42, "first_name": "Smith", "last_name": "Adams",
                "department": "Physics", "institution": 1,
                "ratings": {"overall_rating": 4.5, "would_take_again_percentage": 90.0, "difficulty_level": 2.5}
            },
            {"id": 43, "first_name": "Smithers", "last_name": "Burns", "institution": 1},
            {"id": 77, "first_name": "Smithson", "last_name": "Clark", "institution": 2}
        ],
        "courses": [
            {"id": 10, "course_code": "PHYS 101"}
        ],
        "reviews": [
            {
                "id": 1, "instructor": 42, "course": 10, "rating": 5.0, "difficulty": 2.0,
                "text_review": "Great lectures", "grade_received": "A", "for_credit": true,
                "attendance": false, "textbook_required": false
            }
        ]
    })
}

/// Temp workspace holding a seed file, an isolated HOME and a db path.
#[allow(dead_code)]
pub struct CatalogFixture {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl CatalogFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        std::fs::write(
            dir.path().join("seed.json"),
            serde_json::to_string_pretty(&seed_json()).unwrap(),
        )
        .expect("write seed");
        Self { dir }
    }

    pub fn seed_path(&self) -> PathBuf {
        self.dir.path().join("seed.json")
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("data").join("catalog.db")
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }
}

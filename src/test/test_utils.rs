use crate::api::SharedSubmissionGuard;
use crate::db::{create_assessment, load_questionnaire};
use crate::debounce::{Clock, InMemorySubmissionGuard};
use crate::error::AppError;
use crate::init_rocket;
use crate::models::{FirstLevelAnswer, NewAssessment, SecondLevelAnswer};
use crate::questionnaire::Questionnaire;
use crate::seed::seed_questionnaire;
use rocket::local::asynchronous::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::log::LevelFilter;

static INIT: Once = Once::new();

fn init_test_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Fresh in-memory database with the schema applied but no seed data.
pub async fn setup_test_pool() -> Pool<Sqlite> {
    init_test_logging();

    // A single long-lived connection keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// File-backed WAL database inside `dir`, so a reader and a writer can hold
/// separate connections at the same time.
pub async fn setup_file_test_pool(dir: &TempDir) -> Pool<Sqlite> {
    init_test_logging();

    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("risk_survey.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .expect("Failed to create file database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

pub struct TestAssessment {
    pub company: String,
    pub department: String,
    pub role: Option<String>,
    /// (theme sequence, selected)
    pub themes: Vec<(i64, bool)>,
    /// (theme sequence, sub-theme letter, discomfort level)
    pub ratings: Vec<(i64, String, i64)>,
}

impl TestAssessment {
    pub fn new(company: &str, department: &str) -> Self {
        Self {
            company: company.to_string(),
            department: department.to_string(),
            role: None,
            themes: Vec::new(),
            ratings: Vec::new(),
        }
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn select(mut self, sequence: i64) -> Self {
        self.themes.push((sequence, true));
        self
    }

    pub fn decline(mut self, sequence: i64) -> Self {
        self.themes.push((sequence, false));
        self
    }

    pub fn rate(mut self, sequence: i64, letter: &str, level: i64) -> Self {
        self.ratings.push((sequence, letter.to_string(), level));
        self
    }
}

#[derive(Default)]
pub struct TestDbBuilder {
    assessments: Vec<TestAssessment>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assessment(mut self, assessment: TestAssessment) -> Self {
        self.assessments.push(assessment);
        self
    }

    /// Adds `count` copies built by `make`.
    pub fn assessments(mut self, count: usize, make: impl Fn() -> TestAssessment) -> Self {
        for _ in 0..count {
            self.assessments.push(make());
        }
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        let pool = setup_test_pool().await;

        seed_questionnaire(&pool).await?;
        let questionnaire = load_questionnaire(&pool).await?;

        let mut assessment_ids = Vec::new();
        for assessment in &self.assessments {
            let new_assessment = NewAssessment {
                company: assessment.company.clone(),
                department: assessment.department.clone(),
                role: assessment.role.clone(),
                first_level_answers: assessment
                    .themes
                    .iter()
                    .map(|&(sequence, selected)| FirstLevelAnswer {
                        theme_id: theme_id(&questionnaire, sequence),
                        selected,
                    })
                    .collect(),
                second_level_answers: assessment
                    .ratings
                    .iter()
                    .map(|(sequence, letter, level)| SecondLevelAnswer {
                        sub_theme_id: sub_theme_id(&questionnaire, *sequence, letter),
                        discomfort_level: *level,
                    })
                    .collect(),
            };

            assessment_ids.push(create_assessment(&pool, &new_assessment).await?);
        }

        Ok(TestDb {
            pool,
            questionnaire,
            assessment_ids,
        })
    }
}

fn theme_id(questionnaire: &Questionnaire, sequence: i64) -> i64 {
    questionnaire
        .theme_by_sequence(sequence)
        .unwrap_or_else(|| panic!("No theme with sequence {}", sequence))
        .theme
        .id
}

fn sub_theme_id(questionnaire: &Questionnaire, sequence: i64, letter: &str) -> i64 {
    questionnaire
        .theme_by_sequence(sequence)
        .and_then(|entry| entry.theme.sub_themes.iter().find(|s| s.letter == letter))
        .unwrap_or_else(|| panic!("No sub-theme {}{}", sequence, letter))
        .id
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
    pub questionnaire: Questionnaire,
    pub assessment_ids: Vec<i64>,
}

impl TestDb {
    pub fn theme_id(&self, sequence: i64) -> i64 {
        theme_id(&self.questionnaire, sequence)
    }

    pub fn sub_theme_id(&self, sequence: i64, letter: &str) -> i64 {
        sub_theme_id(&self.questionnaire, sequence, letter)
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count rows")
    }
}

pub async fn setup_test_client(test_db: &TestDb) -> Client {
    let guard: SharedSubmissionGuard = Arc::new(InMemorySubmissionGuard::new());
    setup_test_client_with_guard(test_db, guard).await
}

pub async fn setup_test_client_with_guard(
    test_db: &TestDb,
    guard: SharedSubmissionGuard,
) -> Client {
    let rocket = init_rocket(test_db.pool.clone(), test_db.questionnaire.clone(), guard).await;

    Client::tracked(rocket)
        .await
        .expect("Failed to build rocket client")
}

pub async fn create_standard_test_db() -> TestDb {
    TestDbBuilder::new()
        .build()
        .await
        .expect("Failed to build test database")
}

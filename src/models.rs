use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MacroTheme {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub themes: Vec<Theme>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Theme {
    pub id: i64,
    pub sequence: i64,
    pub description: String,
    pub sub_themes: Vec<SubTheme>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubTheme {
    pub id: i64,
    pub letter: String,
    pub description: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbMacroTheme {
    pub id: i64,
    pub code: String,
    pub title: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTheme {
    pub id: i64,
    pub macro_theme_id: i64,
    pub sequence: i64,
    pub description: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbSubTheme {
    pub id: i64,
    pub theme_id: i64,
    pub letter: String,
    pub description: String,
}

impl From<DbMacroTheme> for MacroTheme {
    fn from(db: DbMacroTheme) -> Self {
        Self {
            id: db.id,
            code: db.code,
            title: db.title,
            themes: Vec::new(),
        }
    }
}

impl From<DbTheme> for Theme {
    fn from(db: DbTheme) -> Self {
        Self {
            id: db.id,
            sequence: db.sequence,
            description: db.description,
            sub_themes: Vec::new(),
        }
    }
}

impl From<DbSubTheme> for SubTheme {
    fn from(db: DbSubTheme) -> Self {
        Self {
            id: db.id,
            letter: db.letter,
            description: db.description,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FirstLevelAnswer {
    pub theme_id: i64,
    pub selected: bool,
}

/// Discomfort is rated 0 (no impact) through 4 (intense pain).
#[derive(Debug, Clone)]
pub struct SecondLevelAnswer {
    pub sub_theme_id: i64,
    pub discomfort_level: i64,
}

/// One respondent's questionnaire, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub company: String,
    pub department: String,
    pub role: Option<String>,
    pub first_level_answers: Vec<FirstLevelAnswer>,
    pub second_level_answers: Vec<SecondLevelAnswer>,
}

/// Equality filters for report generation. Blank values mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub company: Option<String>,
    pub department: Option<String>,
}

impl ReportFilter {
    pub fn new(company: Option<&str>, department: Option<&str>) -> Self {
        fn normalize(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        }

        Self {
            company: normalize(company),
            department: normalize(department),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ThemeSelectionRow {
    pub theme_id: i64,
    pub selections: i64,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SubThemeTotalRow {
    pub sub_theme_id: i64,
    pub total: i64,
    pub answers: i64,
}

use chrono::Utc;
use sqlx::sqlite::SqliteExecutor;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::models::{
    DbMacroTheme, DbSubTheme, DbTheme, MacroTheme, NewAssessment, ReportFilter, SubTheme,
    SubThemeTotalRow, Theme, ThemeSelectionRow,
};
use crate::questionnaire::Questionnaire;

#[instrument(skip(pool))]
pub async fn count_macro_themes(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM macro_themes")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[instrument(skip(pool))]
pub async fn load_questionnaire(pool: &Pool<Sqlite>) -> Result<Questionnaire, AppError> {
    info!("Loading questionnaire");
    let macro_rows = sqlx::query_as::<_, DbMacroTheme>(
        "SELECT id, code, title FROM macro_themes ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let theme_rows = sqlx::query_as::<_, DbTheme>(
        "SELECT id, macro_theme_id, sequence, description FROM themes ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let sub_theme_rows = sqlx::query_as::<_, DbSubTheme>(
        "SELECT id, theme_id, letter, description FROM sub_themes ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let mut themes: Vec<(i64, Theme)> = theme_rows
        .into_iter()
        .map(|row| (row.macro_theme_id, Theme::from(row)))
        .collect();

    for row in sub_theme_rows {
        let theme_id = row.theme_id;
        if let Some((_, theme)) = themes.iter_mut().find(|(_, t)| t.id == theme_id) {
            theme.sub_themes.push(SubTheme::from(row));
        }
    }

    let mut macro_themes: Vec<MacroTheme> =
        macro_rows.into_iter().map(MacroTheme::from).collect();

    for (macro_theme_id, theme) in themes {
        if let Some(macro_theme) = macro_themes.iter_mut().find(|m| m.id == macro_theme_id) {
            macro_theme.themes.push(theme);
        }
    }

    Ok(Questionnaire::new(macro_themes))
}

#[instrument(skip(executor))]
pub async fn get_recommendations<'e, E>(
    executor: E,
    theme_id: i64,
    risk_band: i64,
) -> Result<Vec<String>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let texts: Vec<String> = sqlx::query_scalar(
        "SELECT text FROM recommendations
         WHERE theme_id = ? AND risk_band = ?
         ORDER BY id",
    )
    .bind(theme_id)
    .bind(risk_band)
    .fetch_all(executor)
    .await?;

    debug!(count = texts.len(), "Found recommendations");
    Ok(texts)
}

/// Writes the assessment and all of its answers in one transaction.
#[instrument(skip(pool, assessment), fields(company = %assessment.company, department = %assessment.department))]
pub async fn create_assessment(
    pool: &Pool<Sqlite>,
    assessment: &NewAssessment,
) -> Result<i64, AppError> {
    info!("Creating assessment");
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO assessments (company, department, role, created_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&assessment.company)
    .bind(&assessment.department)
    .bind(&assessment.role)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    let assessment_id = res.last_insert_rowid();

    for answer in &assessment.first_level_answers {
        sqlx::query(
            "INSERT INTO first_level_answers (assessment_id, theme_id, selected)
             VALUES (?, ?, ?)",
        )
        .bind(assessment_id)
        .bind(answer.theme_id)
        .bind(answer.selected)
        .execute(&mut *tx)
        .await?;
    }

    for answer in &assessment.second_level_answers {
        sqlx::query(
            "INSERT INTO second_level_answers (assessment_id, sub_theme_id, discomfort_level)
             VALUES (?, ?, ?)",
        )
        .bind(assessment_id)
        .bind(answer.sub_theme_id)
        .bind(answer.discomfort_level)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(assessment_id, "Assessment created");
    Ok(assessment_id)
}

#[instrument(skip(executor))]
pub async fn count_assessments<'e, E>(executor: E, filter: &ReportFilter) -> Result<i64, AppError>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assessments a
         WHERE (? IS NULL OR a.company = ?)
           AND (? IS NULL OR a.department = ?)",
    )
    .bind(&filter.company)
    .bind(&filter.company)
    .bind(&filter.department)
    .bind(&filter.department)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

#[instrument(skip(executor))]
pub async fn get_theme_selection_counts<'e, E>(
    executor: E,
    filter: &ReportFilter,
) -> Result<Vec<ThemeSelectionRow>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ThemeSelectionRow>(
        "SELECT f.theme_id AS theme_id, COUNT(*) AS selections
         FROM first_level_answers f
         JOIN assessments a ON a.id = f.assessment_id
         WHERE f.selected
           AND (? IS NULL OR a.company = ?)
           AND (? IS NULL OR a.department = ?)
         GROUP BY f.theme_id",
    )
    .bind(&filter.company)
    .bind(&filter.company)
    .bind(&filter.department)
    .bind(&filter.department)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

#[instrument(skip(executor))]
pub async fn get_sub_theme_totals<'e, E>(
    executor: E,
    filter: &ReportFilter,
) -> Result<Vec<SubThemeTotalRow>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, SubThemeTotalRow>(
        "SELECT s.sub_theme_id AS sub_theme_id,
                SUM(s.discomfort_level) AS total,
                COUNT(*) AS answers
         FROM second_level_answers s
         JOIN assessments a ON a.id = s.assessment_id
         WHERE (? IS NULL OR a.company = ?)
           AND (? IS NULL OR a.department = ?)
         GROUP BY s.sub_theme_id",
    )
    .bind(&filter.company)
    .bind(&filter.company)
    .bind(&filter.department)
    .bind(&filter.department)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

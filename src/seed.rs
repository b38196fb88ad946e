use std::collections::HashMap;

use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::db::count_macro_themes;
use crate::error::AppError;

static QUESTIONNAIRE_SEED: &str = include_str!("../seed/questionnaire.json");

#[derive(Deserialize, Debug)]
pub struct SeedData {
    pub macro_themes: Vec<SeedMacroTheme>,
    pub recommendations: Vec<SeedRecommendation>,
}

#[derive(Deserialize, Debug)]
pub struct SeedMacroTheme {
    pub code: String,
    pub title: String,
    pub themes: Vec<SeedTheme>,
}

#[derive(Deserialize, Debug)]
pub struct SeedTheme {
    pub sequence: i64,
    pub description: String,
    pub sub_themes: Vec<SeedSubTheme>,
}

#[derive(Deserialize, Debug)]
pub struct SeedSubTheme {
    pub letter: String,
    pub description: String,
}

/// Recommendations address their theme by sequence number, not by row id.
#[derive(Deserialize, Debug)]
pub struct SeedRecommendation {
    pub theme_sequence: i64,
    pub risk_band: i64,
    pub text: String,
}

pub fn seed_data() -> Result<SeedData, AppError> {
    Ok(serde_json::from_str(QUESTIONNAIRE_SEED)?)
}

/// Populates the questionnaire and recommendation tables.
///
/// Does nothing once any macro-theme exists, so later edits to the seed file
/// never reach an already seeded database. Returns whether rows were written.
#[instrument(skip_all)]
pub async fn seed_questionnaire(pool: &Pool<Sqlite>) -> Result<bool, AppError> {
    if count_macro_themes(pool).await? > 0 {
        info!("Questionnaire already seeded, skipping");
        return Ok(false);
    }

    let data = seed_data()?;
    let mut tx = pool.begin().await?;
    let mut theme_ids: HashMap<i64, i64> = HashMap::new();

    for macro_theme in &data.macro_themes {
        let macro_theme_id = sqlx::query("INSERT INTO macro_themes (code, title) VALUES (?, ?)")
            .bind(&macro_theme.code)
            .bind(&macro_theme.title)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for theme in &macro_theme.themes {
            let theme_id = sqlx::query(
                "INSERT INTO themes (macro_theme_id, sequence, description) VALUES (?, ?, ?)",
            )
            .bind(macro_theme_id)
            .bind(theme.sequence)
            .bind(&theme.description)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            theme_ids.insert(theme.sequence, theme_id);

            for sub_theme in &theme.sub_themes {
                sqlx::query(
                    "INSERT INTO sub_themes (theme_id, letter, description) VALUES (?, ?, ?)",
                )
                .bind(theme_id)
                .bind(&sub_theme.letter)
                .bind(&sub_theme.description)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    let mut recommendation_count = 0;
    for recommendation in &data.recommendations {
        let Some(theme_id) = theme_ids.get(&recommendation.theme_sequence) else {
            warn!(
                theme_sequence = recommendation.theme_sequence,
                "Recommendation refers to unknown theme, skipping"
            );
            continue;
        };

        sqlx::query("INSERT INTO recommendations (theme_id, risk_band, text) VALUES (?, ?, ?)")
            .bind(theme_id)
            .bind(recommendation.risk_band)
            .bind(&recommendation.text)
            .execute(&mut *tx)
            .await?;
        recommendation_count += 1;
    }

    tx.commit().await?;

    info!(
        macro_themes = data.macro_themes.len(),
        themes = theme_ids.len(),
        recommendations = recommendation_count,
        "Seeded questionnaire"
    );
    Ok(true)
}

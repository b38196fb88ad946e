use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::db::{
    count_assessments, get_recommendations, get_sub_theme_totals, get_theme_selection_counts,
};
use crate::error::AppError;
use crate::models::{ReportFilter, SubTheme, SubThemeTotalRow, ThemeSelectionRow};
use crate::questionnaire::{Questionnaire, ThemeEntry};

pub const EMPTY_REPORT_MESSAGE: &str = "No assessments found for the given filters.";

/// Risk classification of a theme's average discomfort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskBand {
    NoRisk = 0,
    Low = 1,
    Moderate = 2,
    High = 3,
    Critical = 4,
}

impl RiskBand {
    /// Bands are half-open: `[0, 0.5)`, `[0.5, 1.5)`, `[1.5, 2.5)`, `[2.5, 3.5)`, `[3.5, ∞)`.
    pub fn from_average(average: f64) -> Self {
        if average >= 3.5 {
            RiskBand::Critical
        } else if average >= 2.5 {
            RiskBand::High
        } else if average >= 1.5 {
            RiskBand::Moderate
        } else if average >= 0.5 {
            RiskBand::Low
        } else {
            RiskBand::NoRisk
        }
    }

    pub fn level(self) -> i64 {
        self as i64
    }
}

/// `numerator / denominator` rounded half-up to `places` decimals.
///
/// Works on integers so values like 2.675 are not skewed by binary floats.
/// Operands are expected to be non-negative.
pub fn round_ratio(numerator: i64, denominator: i64, places: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let scale = 10_i64.pow(places);
    let scaled = (2 * numerator * scale + denominator) / (2 * denominator);
    scaled as f64 / scale as f64
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubThemeSummary {
    pub letter: String,
    pub description: String,
    pub average_discomfort: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThemeSummary {
    #[serde(skip)]
    pub theme_id: i64,
    pub sequence: i64,
    pub description: String,
    pub macro_theme_code: String,
    pub selection_count: i64,
    pub percentage: f64,
    pub average_discomfort: f64,
    pub risk_band: i64,
    pub sub_themes: Vec<SubThemeSummary>,
    pub recommendations: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub total_assessments: i64,
    pub company: Option<String>,
    pub department: Option<String>,
    pub themes: Vec<ThemeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Report {
    pub fn empty(filter: ReportFilter) -> Self {
        Self {
            total_assessments: 0,
            company: filter.company,
            department: filter.department,
            themes: Vec::new(),
            message: Some(EMPTY_REPORT_MESSAGE.to_string()),
        }
    }
}

struct SubThemeAccumulator<'a> {
    sub_theme: &'a SubTheme,
    total: i64,
    answers: i64,
}

struct ThemeAccumulator<'a> {
    entry: ThemeEntry<'a>,
    selections: i64,
    // Keyed by position so summaries come out in questionnaire order.
    sub_themes: BTreeMap<usize, SubThemeAccumulator<'a>>,
}

impl ThemeAccumulator<'_> {
    fn into_summary(self, total_assessments: i64) -> ThemeSummary {
        let mut theme_total = 0;
        let mut theme_answers = 0;
        let mut sub_themes = Vec::with_capacity(self.sub_themes.len());

        for acc in self.sub_themes.into_values() {
            if acc.answers == 0 {
                continue;
            }
            theme_total += acc.total;
            theme_answers += acc.answers;
            sub_themes.push(SubThemeSummary {
                letter: acc.sub_theme.letter.clone(),
                description: acc.sub_theme.description.clone(),
                average_discomfort: round_ratio(acc.total, acc.answers, 2),
            });
        }

        // A theme selected without any sub-theme answers averages 0 and lands in
        // the no-risk band.
        let average_discomfort = round_ratio(theme_total, theme_answers, 2);
        let theme = self.entry.theme;

        ThemeSummary {
            theme_id: theme.id,
            sequence: theme.sequence,
            description: theme.description.clone(),
            macro_theme_code: self.entry.macro_theme.code.clone(),
            selection_count: self.selections,
            percentage: round_ratio(self.selections * 100, total_assessments, 1),
            average_discomfort,
            risk_band: RiskBand::from_average(average_discomfort).level(),
            sub_themes,
            recommendations: Vec::new(),
        }
    }
}

/// Folds grouped answer rows into one summary per selected theme.
///
/// Sub-theme answers count whether or not the same respondent selected the
/// parent theme, but only themes with at least one selection are reported.
/// Output is sorted by percentage, highest first; ties keep questionnaire order.
pub fn aggregate(
    questionnaire: &Questionnaire,
    total_assessments: i64,
    selections: &[ThemeSelectionRow],
    sub_theme_totals: &[SubThemeTotalRow],
) -> Vec<ThemeSummary> {
    if total_assessments == 0 {
        return Vec::new();
    }

    let selection_counts: HashMap<i64, i64> = selections
        .iter()
        .map(|row| (row.theme_id, row.selections))
        .collect();

    for row in selections {
        if questionnaire.theme(row.theme_id).is_none() {
            warn!(theme_id = row.theme_id, "Selection for unknown theme ignored");
        }
    }

    let mut accumulators: Vec<ThemeAccumulator<'_>> = questionnaire
        .themes()
        .filter_map(|entry| {
            let selections = selection_counts.get(&entry.theme.id).copied()?;
            (selections > 0).then(|| ThemeAccumulator {
                entry,
                selections,
                sub_themes: BTreeMap::new(),
            })
        })
        .collect();

    for row in sub_theme_totals {
        let Some(sub_entry) = questionnaire.sub_theme(row.sub_theme_id) else {
            warn!(sub_theme_id = row.sub_theme_id, "Answer for unknown sub-theme ignored");
            continue;
        };

        let Some(acc) = accumulators
            .iter_mut()
            .find(|acc| acc.entry.theme.id == sub_entry.theme.id)
        else {
            continue;
        };

        let sub_acc = acc
            .sub_themes
            .entry(sub_entry.position)
            .or_insert(SubThemeAccumulator {
                sub_theme: sub_entry.sub_theme,
                total: 0,
                answers: 0,
            });
        sub_acc.total += row.total;
        sub_acc.answers += row.answers;
    }

    let mut summaries: Vec<ThemeSummary> = accumulators
        .into_iter()
        .map(|acc| acc.into_summary(total_assessments))
        .collect();

    summaries.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    summaries
}

#[instrument(skip(pool, questionnaire))]
pub async fn generate_report(
    pool: &Pool<Sqlite>,
    questionnaire: &Questionnaire,
    filter: ReportFilter,
) -> Result<Report, AppError> {
    info!("Generating report");
    // Every figure below is read from the same snapshot.
    let mut tx = pool.begin().await?;
    let total_assessments = count_assessments(&mut *tx, &filter).await?;

    if total_assessments == 0 {
        info!("No assessments match the filters");
        return Ok(Report::empty(filter));
    }

    let selections = get_theme_selection_counts(&mut *tx, &filter).await?;
    let sub_theme_totals = get_sub_theme_totals(&mut *tx, &filter).await?;

    let mut themes = aggregate(questionnaire, total_assessments, &selections, &sub_theme_totals);

    for theme in &mut themes {
        theme.recommendations =
            get_recommendations(&mut *tx, theme.theme_id, theme.risk_band).await?;
        info!(
            sequence = theme.sequence,
            average = theme.average_discomfort,
            risk_band = theme.risk_band,
            recommendations = theme.recommendations.len(),
            "Theme classified"
        );
    }

    tx.commit().await?;

    Ok(Report {
        total_assessments,
        company: filter.company,
        department: filter.department,
        themes,
        message: None,
    })
}

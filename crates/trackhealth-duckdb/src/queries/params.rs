use std::collections::{HashMap, HashSet};

use anyhow::Result;

use trackhealth_core::health::{MissingParamRow, ParamStatus, ParameterAnalysisRow};
use trackhealth_core::occurrence::ParamCategory;
use trackhealth_core::window::DateWindow;

use crate::backend::parse_name_list;
use crate::queries::{safe_pct, window_bounds};
use crate::DuckDbBackend;

/// Column holding the missing-name list for a category. The name comes
/// from the enum, never from request input.
fn list_column(category: ParamCategory) -> &'static str {
    match category {
        ParamCategory::Event => "missing_event_params",
        ParamCategory::User => "missing_user_params",
        ParamCategory::Item => "missing_item_params",
        ParamCategory::Ecommerce => "missing_ecommerce_params",
    }
}

/// Distinct occurrence count over the window — the percentage denominator
/// for every breakdown.
async fn total_occurrences(db: &DuckDbBackend, window: &DateWindow) -> Result<i64> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);
    let total: i64 = conn
        .prepare(
            "SELECT COUNT(DISTINCT occurrence_key) FROM occurrences \
             WHERE date BETWEEN ?1 AND ?2",
        )?
        .query_row(duckdb::params![start, end], |row| row.get(0))?;
    Ok(total)
}

/// Fetch the deduplicated (occurrence key, missing-name list) pairs for
/// one category and count distinct occurrences per parameter name.
async fn missing_counts_for_category(
    db: &DuckDbBackend,
    window: &DateWindow,
    category: ParamCategory,
) -> Result<HashMap<String, i64>> {
    let conn = db.conn.lock().await;
    let (start, end) = window_bounds(window);
    let column = list_column(category);

    let sql = format!(
        "SELECT DISTINCT occurrence_key, {column} \
         FROM occurrences \
         WHERE date BETWEEN ?1 AND ?2 \
           AND {column} IS NOT NULL"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![start, end], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
        ))
    })?;

    // Explode each occurrence's list into (param name → occurrence keys).
    // Counting the key sets rather than list entries keeps the metric
    // distinct-by-occurrence even if one list repeats a name.
    let mut keys_per_param: HashMap<String, HashSet<String>> = HashMap::new();
    for row in rows {
        let (key, raw_list) = row?;
        for name in parse_name_list(raw_list) {
            if name.is_empty() {
                continue;
            }
            keys_per_param.entry(name).or_default().insert(key.clone());
        }
    }

    Ok(keys_per_param
        .into_iter()
        .map(|(name, keys)| (name, keys.len() as i64))
        .collect())
}

/// Dashboard missing-parameter breakdown across the {event, user, item}
/// categories: distinct occurrences per (name, category) pair, ranked by
/// missing count descending, top `top_n`.
pub async fn parameter_analysis_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    top_n: usize,
) -> Result<Vec<ParameterAnalysisRow>> {
    let total = total_occurrences(db, window).await?;

    let mut rows: Vec<ParameterAnalysisRow> = Vec::new();
    for category in [ParamCategory::Event, ParamCategory::User, ParamCategory::Item] {
        let counts = missing_counts_for_category(db, window, category).await?;
        for (param_name, missing) in counts {
            let pct = safe_pct(missing, total);
            rows.push(ParameterAnalysisRow {
                param_name,
                param_type: category,
                events_with_missing_param: missing,
                total_events: total,
                missing_percentage: pct,
                status: ParamStatus::from_percentage(pct),
            });
        }
    }

    rows.sort_by(|a, b| {
        b.events_with_missing_param
            .cmp(&a.events_with_missing_param)
            .then_with(|| a.param_name.cmp(&b.param_name))
    });
    rows.truncate(top_n);
    Ok(rows)
}

/// Realtime panel for one category: top `limit` missing parameter names by
/// distinct occurrence count, with the window-wide distinct total as the
/// percentage denominator.
pub async fn missing_param_panel_inner(
    db: &DuckDbBackend,
    window: &DateWindow,
    category: ParamCategory,
    limit: usize,
) -> Result<Vec<MissingParamRow>> {
    let total = total_occurrences(db, window).await?;
    let counts = missing_counts_for_category(db, window, category).await?;

    let mut rows: Vec<MissingParamRow> = counts
        .into_iter()
        .map(|(param_name, missing_count)| MissingParamRow {
            missing_percentage: safe_pct(missing_count, total),
            param_name,
            missing_count,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.missing_count
            .cmp(&a.missing_count)
            .then_with(|| a.param_name.cmp(&b.param_name))
    });
    rows.truncate(limit);
    Ok(rows)
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One tracked event instance — mirrors the DuckDB `occurrences` table
/// columns exactly.
///
/// `occurrence_key` is the dedup identity: the warehouse may deliver the
/// same occurrence more than once, and every aggregate counts distinct
/// keys rather than raw rows.
///
/// The `missing_*_params` lists are serialized JSON string arrays before
/// storage (the column type is VARCHAR).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub occurrence_key: String,
    pub date: NaiveDate,
    pub event_timestamp: DateTime<Utc>,
    /// The event name the tracking plan expects at this location.
    pub expected_event_name: String,
    /// The event name actually observed.
    pub event_name: String,
    pub user_pseudo_id: String,
    pub session_id: Option<String>,
    pub device_category: Option<String>,
    pub device_os: Option<String>,
    pub device_browser: Option<String>,
    pub page_location: Option<String>,
    /// The expected event was not seen at all in the source window.
    pub is_missing_in_source: bool,
    pub is_event_param_missing: bool,
    pub is_user_param_missing: bool,
    pub is_item_param_missing: bool,
    pub is_ecommerce_param_missing: bool,
    /// Overall flag: any parameter category has at least one missing name.
    pub has_missing_params: bool,
    pub missing_event_params: Vec<String>,
    pub missing_user_params: Vec<String>,
    pub missing_item_params: Vec<String>,
    pub missing_ecommerce_params: Vec<String>,
}

/// The parameter categories a missing name can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamCategory {
    Event,
    User,
    Item,
    Ecommerce,
}

impl ParamCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamCategory::Event => "event",
            ParamCategory::User => "user",
            ParamCategory::Item => "item",
            ParamCategory::Ecommerce => "ecommerce",
        }
    }
}

//! Request-scoped data loading.
//!
//! Translates query parameters into typed engine invocations and response
//! slices. The HTTP router is an external collaborator: its thin handlers
//! parse the raw query string into pairs, hand them here, and serialise
//! whatever comes back.

use std::collections::{BTreeMap, BTreeSet};

use billsim_core::model::ConsolidatedEntry;
use billsim_core::queries::breakdown::{
    category_breakdown, item_transactions, section_breakdown, section_transactions,
};
use billsim_core::queries::graph::{GraphData, account_graph};
use billsim_core::queries::healthcare::{
    ConfigProgress, HealthcareExpense, healthcare_expenses, healthcare_progress,
};
use billsim_core::queries::movement::money_movement;
use billsim_core::queries::spending::{TrackerChart, tracker_chart};
use billsim_core::queries::ChartData;
use billsim_core::scenario::{DEFAULT_SCENARIO, used_variables};
use billsim_core::timeline::Window;
use jiff::civil::Date;

use crate::app::App;
use crate::error::{Result, ServiceError};

/// Typed view of the supported query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub simulation: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub selected_accounts: Option<Vec<String>>,
    pub selected_simulations: Option<Vec<String>>,
    pub is_transfer: bool,
    pub as_activity: bool,
    pub skip: bool,
    pub path: Vec<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams {
            simulation: DEFAULT_SCENARIO.to_string(),
            start_date: None,
            end_date: None,
            selected_accounts: None,
            selected_simulations: None,
            is_transfer: false,
            as_activity: false,
            skip: false,
            path: Vec::new(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "true" | "1" | "yes")
}

fn parse_list(value: &str) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

impl QueryParams {
    /// Parse from decoded key/value pairs. Unknown keys are ignored;
    /// malformed dates are treated as absent.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            match key {
                "simulation" if !value.is_empty() => params.simulation = value.to_string(),
                "startDate" => params.start_date = value.parse().ok(),
                "endDate" => params.end_date = value.parse().ok(),
                "selectedAccounts" => params.selected_accounts = parse_list(value),
                "selectedSimulations" => params.selected_simulations = parse_list(value),
                "isTransfer" => params.is_transfer = parse_bool(value),
                "asActivity" => params.as_activity = parse_bool(value),
                "skip" => params.skip = parse_bool(value),
                "path" => {
                    params.path = value
                        .split('.')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                _ => {}
            }
        }
        params
    }

    /// The requested window, with a one-year default around `today` when a
    /// bound is missing.
    pub fn window_or(&self, today: Date) -> Window {
        let start = self
            .start_date
            .unwrap_or_else(|| jiff::civil::date(today.year(), 1, 1));
        let end = self
            .end_date
            .unwrap_or_else(|| jiff::civil::date(today.year(), 12, 31));
        Window::new(start, end.max(start))
    }

    pub fn selection(&self) -> Option<&[String]> {
        self.selected_accounts.as_deref()
    }
}

/// Best-effort request-body parsing: JSON when it is JSON, otherwise the raw
/// text wrapped in a string value.
pub fn parse_body(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// The scenarios a multi-simulation query targets: the explicit selection,
/// or every enabled scenario.
fn target_scenarios(app: &App, params: &QueryParams) -> Vec<String> {
    match &params.selected_simulations {
        Some(names) => names.clone(),
        None => {
            let catalog = app.catalog();
            catalog
                .scenarios
                .scenarios
                .iter()
                .filter(|s| s.enabled)
                .map(|s| s.name.clone())
                .collect()
        }
    }
}

fn slice_to_window(entries: &[ConsolidatedEntry], window: Window) -> Vec<ConsolidatedEntry> {
    entries
        .iter()
        .filter(|e| window.contains(e.date))
        .cloned()
        .collect()
}

// ============================================================================
// Per-endpoint loaders
// ============================================================================

pub fn consolidated_activity(
    app: &App,
    account_id: &str,
    params: &QueryParams,
    today: Date,
) -> Result<Vec<ConsolidatedEntry>> {
    let window = params.window_or(today);
    let result = app.compute(&params.simulation, window)?;
    let account = result
        .account(account_id)
        .ok_or_else(|| ServiceError::NotFound(format!("account {account_id}")))?;
    Ok(slice_to_window(&account.consolidated_activity, window))
}

pub fn account_graph_payload(
    app: &App,
    account_id: &str,
    params: &QueryParams,
    today: Date,
) -> Result<GraphData> {
    let window = params.window_or(today);
    let result = app.compute(&params.simulation, window)?;
    if result.account(account_id).is_none() {
        return Err(ServiceError::NotFound(format!("account {account_id}")));
    }
    let selection = vec![account_id.to_string()];
    Ok(account_graph(&result, window, Some(&selection)))
}

/// Multi-scenario graph: one `GraphData` per selected simulation, keyed by
/// scenario name.
pub fn scenario_graphs(
    app: &App,
    params: &QueryParams,
    today: Date,
) -> Result<BTreeMap<String, GraphData>> {
    let window = params.window_or(today);
    let mut out = BTreeMap::new();
    for scenario in target_scenarios(app, params) {
        let result = app.compute(&scenario, window)?;
        out.insert(
            scenario,
            account_graph(&result, window, params.selection()),
        );
    }
    Ok(out)
}

pub fn category_breakdown_payload(
    app: &App,
    params: &QueryParams,
    today: Date,
) -> Result<BTreeMap<String, f64>> {
    let window = params.window_or(today);
    let result = app.compute(&params.simulation, window)?;
    Ok(category_breakdown(&result, window, params.selection()))
}

pub fn section_breakdown_payload(
    app: &App,
    section: &str,
    params: &QueryParams,
    today: Date,
) -> Result<BTreeMap<String, f64>> {
    let window = params.window_or(today);
    let result = app.compute(&params.simulation, window)?;
    Ok(section_breakdown(&result, section, window, params.selection()))
}

pub fn section_transactions_payload(
    app: &App,
    section: &str,
    params: &QueryParams,
    today: Date,
) -> Result<Vec<ConsolidatedEntry>> {
    let window = params.window_or(today);
    let result = app.compute(&params.simulation, window)?;
    Ok(section_transactions(&result, section, window, params.selection()))
}

pub fn item_transactions_payload(
    app: &App,
    section: &str,
    item: &str,
    params: &QueryParams,
    today: Date,
) -> Result<Vec<ConsolidatedEntry>> {
    let window = params.window_or(today);
    let result = app.compute(&params.simulation, window)?;
    Ok(item_transactions(&result, section, item, window, params.selection()))
}

/// Healthcare progress as of a query date (defaults to today).
pub fn healthcare_progress_payload(
    app: &App,
    params: &QueryParams,
    on: Option<Date>,
    today: Date,
) -> Result<Vec<ConfigProgress>> {
    let on = on.unwrap_or(today);
    let catalog = app.catalog();
    // The plan year containing `on` must be fully computed.
    let window = Window::new(
        catalog
            .healthcare_configs
            .iter()
            .filter(|c| c.active_on(on))
            .map(|c| c.plan_year_start(on))
            .min()
            .unwrap_or(jiff::civil::date(on.year(), 1, 1)),
        on,
    );
    let result = app.compute(&params.simulation, window)?;
    Ok(healthcare_progress(&catalog, &result, on))
}

pub fn healthcare_expenses_payload(
    app: &App,
    params: &QueryParams,
    today: Date,
) -> Result<Vec<HealthcareExpense>> {
    let window = params.window_or(today);
    let catalog = app.catalog();
    let result = app.compute(&params.simulation, window)?;
    Ok(healthcare_expenses(&catalog, &result))
}

pub fn spending_tracker_chart_payload(
    app: &App,
    category_id: &str,
    params: &QueryParams,
    today: Date,
) -> Result<TrackerChart> {
    let window = params.window_or(today);
    let catalog = app.catalog();
    let category = catalog
        .spending_tracker
        .iter()
        .find(|c| c.id == category_id)
        .ok_or_else(|| ServiceError::NotFound(format!("spending tracker {category_id}")))?;
    let result = app.compute(&params.simulation, window)?;
    Ok(tracker_chart(
        &catalog,
        &result,
        category,
        window,
        &params.simulation,
    )?)
}

pub fn money_movement_payload(
    app: &App,
    params: &QueryParams,
    today: Date,
) -> Result<ChartData> {
    let window = params.window_or(today);
    let result = app.compute(&params.simulation, window)?;
    Ok(money_movement(&result, window, params.selection()))
}

/// Account names in listing order.
pub fn names_payload(app: &App) -> Vec<String> {
    app.catalog().account_names()
}

/// Variable names the catalog references anywhere.
pub fn used_variables_payload(app: &App) -> BTreeSet<String> {
    used_variables(&app.catalog())
}

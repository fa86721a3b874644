use std::collections::BTreeMap;

use serde::Serialize;

/// Figures shown on the tenant home screen.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSummary {
    /// Keyed by lead status; every status is present.
    pub leads_by_status: BTreeMap<String, i64>,
    pub open_deals: i64,
    pub open_deal_value_cents: i64,
    pub tasks_due_today: i64,
    pub overdue_tasks: i64,
}

//! Tenant home screen figures

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::{DashboardSummary, LeadStatus};
use crate::error::DomainError;
use crate::repositories::{DealRepository, LeadRepository, TaskRepository};

pub struct DashboardService<L: LeadRepository, D: DealRepository, T: TaskRepository> {
    lead_repo: Arc<L>,
    deal_repo: Arc<D>,
    task_repo: Arc<T>,
}

impl<L: LeadRepository, D: DealRepository, T: TaskRepository> DashboardService<L, D, T> {
    pub fn new(lead_repo: Arc<L>, deal_repo: Arc<D>, task_repo: Arc<T>) -> Self {
        Self {
            lead_repo,
            deal_repo,
            task_repo,
        }
    }

    /// "Today" is the UTC calendar day containing `now`.
    pub async fn summary(&self, now: DateTime<Utc>) -> Result<DashboardSummary, DomainError> {
        let mut summary = DashboardSummary::default();
        for status in LeadStatus::ALL {
            summary.leads_by_status.insert(status.as_str().to_string(), 0);
        }
        for (status, count) in self.lead_repo.count_by_status().await? {
            summary.leads_by_status.insert(status.as_str().to_string(), count);
        }

        let (open_deals, open_value) = self.deal_repo.open_totals().await?;
        summary.open_deals = open_deals;
        summary.open_deal_value_cents = open_value;

        let day_start = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
        summary.tasks_due_today = self
            .task_repo
            .count_open_due_between(day_start, day_start + Duration::days(1))
            .await?;
        summary.overdue_tasks = self.task_repo.count_overdue(now).await?;

        debug!("Dashboard summary computed: {:?}", summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MockDealRepository, MockLeadRepository, MockTaskRepository};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_summary_fills_every_status() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 15, 30, 0).unwrap();
        let mut leads = MockLeadRepository::new();
        leads
            .expect_count_by_status()
            .returning(|| Ok(vec![(LeadStatus::New, 4), (LeadStatus::Converted, 1)]));
        let mut deals = MockDealRepository::new();
        deals.expect_open_totals().returning(|| Ok((2, 90_000)));
        let mut tasks = MockTaskRepository::new();
        tasks
            .expect_count_open_due_between()
            .withf(|from, to| {
                *from == Utc.with_ymd_and_hms(2026, 5, 4, 0, 0, 0).unwrap()
                    && *to == Utc.with_ymd_and_hms(2026, 5, 5, 0, 0, 0).unwrap()
            })
            .returning(|_, _| Ok(3));
        tasks.expect_count_overdue().returning(|_| Ok(1));

        let summary = DashboardService::new(Arc::new(leads), Arc::new(deals), Arc::new(tasks))
            .summary(now)
            .await
            .unwrap();
        assert_eq!(summary.leads_by_status.len(), LeadStatus::ALL.len());
        assert_eq!(summary.leads_by_status["new"], 4);
        assert_eq!(summary.leads_by_status["qualified"], 0);
        assert_eq!(summary.open_deal_value_cents, 90_000);
        assert_eq!(summary.tasks_due_today, 3);
        assert_eq!(summary.overdue_tasks, 1);
    }
}

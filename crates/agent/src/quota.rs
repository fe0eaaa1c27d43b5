//! Quota & Feature Gate (C5, §4.5).
//!
//! Composed directly over `pregnancy_persistence::Repository`; period
//! arithmetic uses `chrono`, matching the teacher's date-handling
//! throughout `persistence` (TTL/expiry fields). `check_quota` and
//! `increment_usage` swallow repository errors at this layer rather than
//! bubbling a `Result` up to the orchestrator: §4.5 fixes the policy per
//! operation (fail closed vs. best effort), so there is nothing left for a
//! caller to decide once the error reaches here.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use pregnancy_core::{Feature, QuotaLimit, QuotaPeriod, UserId};
use pregnancy_persistence::Repository;

/// `calculate_period_bounds(now, period)` (§4.5): returns `[start, end)`.
pub fn calculate_period_bounds(now: DateTime<Utc>, period: QuotaPeriod) -> (DateTime<Utc>, DateTime<Utc>) {
    match period {
        QuotaPeriod::Daily => {
            let start = midnight(now.date_naive());
            (start, start + Duration::days(1))
        }
        QuotaPeriod::Weekly => {
            let days_since_monday = now.weekday().num_days_from_monday() as i64;
            let start = midnight(now.date_naive() - Duration::days(days_since_monday));
            (start, start + Duration::weeks(1))
        }
        QuotaPeriod::Monthly => {
            let first_of_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
                .expect("valid year/month from a real DateTime");
            let start = midnight(first_of_month);
            let (next_year, next_month) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
            let first_of_next_month = NaiveDate::from_ymd_opt(next_year, next_month, 1)
                .expect("valid next year/month");
            (start, midnight(first_of_next_month))
        }
        QuotaPeriod::Unlimited => (now, now + Duration::days(365 * 100)),
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc()
}

/// `has_feature(user, feature) -> bool` (§4.5): true iff the user has a
/// current subscription whose plan grants this feature. Fails closed
/// (treated as "no") on any repository error.
pub async fn has_feature(repo: &dyn Repository, user: &UserId, feature: Feature) -> bool {
    match has_feature_inner(repo, user, feature).await {
        Ok(granted) => granted,
        Err(e) => {
            tracing::warn!(error = %e, user = %user, "has_feature check failed; failing closed");
            false
        }
    }
}

async fn has_feature_inner(
    repo: &dyn Repository,
    user: &UserId,
    feature: Feature,
) -> Result<bool, pregnancy_persistence::PersistenceError> {
    let Some(subscription) = repo.get_current_subscription(user).await? else {
        return Ok(false);
    };
    let plan_feature = repo.get_plan_feature(&subscription.plan, feature).await?;
    Ok(plan_feature.is_some())
}

/// `check_quota(user, feature) -> bool` (§4.5): true iff `has_feature` AND
/// (unlimited OR current-period count is strictly below the limit). A
/// database failure fails closed (deny).
pub async fn check_quota(repo: &dyn Repository, user: &UserId, feature: Feature) -> bool {
    match check_quota_inner(repo, user, feature).await {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!(error = %e, user = %user, "check_quota failed; failing closed");
            false
        }
    }
}

async fn check_quota_inner(
    repo: &dyn Repository,
    user: &UserId,
    feature: Feature,
) -> Result<bool, pregnancy_persistence::PersistenceError> {
    let Some(subscription) = repo.get_current_subscription(user).await? else {
        return Ok(false);
    };
    let Some(plan_feature) = repo.get_plan_feature(&subscription.plan, feature).await? else {
        return Ok(false);
    };
    match plan_feature.quota_limit {
        QuotaLimit::Unlimited => Ok(true),
        QuotaLimit::Limited(limit) => {
            let (period_start, _) = calculate_period_bounds(Utc::now(), plan_feature.quota_period);
            let count = repo.get_usage_count(user, feature, period_start).await?;
            Ok(count < limit)
        }
    }
}

/// `increment_usage(user, feature)` (§4.5): best-effort, logged and
/// swallowed on failure — never blocks the turn (§7).
pub async fn increment_usage(repo: &dyn Repository, user: &UserId, feature: Feature) {
    let subscription = match repo.get_current_subscription(user).await {
        Ok(Some(s)) => s,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, user = %user, "increment_usage: could not resolve subscription");
            return;
        }
    };
    let plan_feature = match repo.get_plan_feature(&subscription.plan, feature).await {
        Ok(Some(pf)) => pf,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, user = %user, "increment_usage: could not resolve plan feature");
            return;
        }
    };
    let (period_start, _) = calculate_period_bounds(Utc::now(), plan_feature.quota_period);
    if let Err(e) = repo.increment_usage(user, feature, period_start).await {
        tracing::warn!(error = %e, user = %user, "increment_usage failed");
    }
}

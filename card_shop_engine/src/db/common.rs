//! Backend-independent helpers. The read-side aggregations are pure functions over the live order set, so both
//! backends produce identical statistics.
use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::db_types::{normalize_contact, DashboardStats, EmailStats, EmailStatsEntry, Order, PaymentStatus};

/// Groups orders by (normalized) contact info. Contacts are listed by most recent order first; each contact's orders
/// are newest first.
pub fn aggregate_email_stats(orders: Vec<Order>) -> EmailStats {
    let total_emails = orders.len();
    let mut groups: HashMap<String, Vec<Order>> = HashMap::new();
    for order in orders {
        groups.entry(normalize_contact(&order.contact_info)).or_default().push(order);
    }
    let mut email_list = groups
        .into_values()
        .filter_map(|mut orders| {
            newest_first(&mut orders, |o| o.created_at);
            let last = orders.first()?;
            let first = orders.last()?;
            Some(EmailStatsEntry {
                email: last.contact_info.trim().to_string(),
                order_count: orders.len(),
                total_amount: orders.iter().map(|o| o.total_amount).sum(),
                first_order_date: first.created_at,
                last_order_date: last.created_at,
                orders,
            })
        })
        .collect::<Vec<_>>();
    email_list.sort_by(|a, b| b.last_order_date.cmp(&a.last_order_date).then_with(|| a.email.cmp(&b.email)));
    EmailStats { total_emails, unique_emails: email_list.len(), email_list }
}

/// Paid-order counts and revenue for today, yesterday and the current month, in UTC. Orders are bucketed by the
/// time they were paid (delivery time), falling back to their creation time.
pub fn dashboard_stats(orders: &[Order], now: DateTime<Utc>) -> DashboardStats {
    let today = now.date_naive();
    let yesterday = today - Duration::days(1);
    let mut stats = DashboardStats::default();
    for order in orders.iter().filter(|o| o.payment_status == PaymentStatus::Paid) {
        let day = order.card_secret_delivered_at.unwrap_or(order.created_at).date_naive();
        if day == today {
            stats.today_sales += 1;
            stats.today_revenue += order.total_amount;
        }
        if day == yesterday {
            stats.yesterday_sales += 1;
            stats.yesterday_revenue += order.total_amount;
        }
        if same_month(day, today) {
            stats.month_sales += 1;
            stats.month_revenue += order.total_amount;
        }
    }
    stats
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn newest_first<T, F: Fn(&T) -> DateTime<Utc>>(items: &mut [T], key: F) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

//! PostgREST query-string encoding for filters and ordering.

use serde_json::Value;
use url::Url;

use planner_core::store::protocol::{Filter, Order};

/// `col=eq.value` for each condition.
pub(crate) fn filter_pairs(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions()
        .iter()
        .map(|c| (c.column.clone(), format!("eq.{}", literal(&c.value))))
        .collect()
}

pub(crate) fn order_pair(order: &Order) -> (String, String) {
    let direction = if order.ascending { "asc" } else { "desc" };
    ("order".to_string(), format!("{}.{}", order.column, direction))
}

/// Append query pairs to `url`, leaving it untouched when there are none.
pub(crate) fn with_query(mut url: Url, pairs: &[(String, String)]) -> Url {
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    url
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_pairs() {
        let filter = Filter::eq("event_id", "e1")
            .and_eq("guest_id", "g1")
            .and_eq("is_attending", true);

        assert_eq!(
            filter_pairs(&filter),
            vec![
                ("event_id".to_string(), "eq.e1".to_string()),
                ("guest_id".to_string(), "eq.g1".to_string()),
                ("is_attending".to_string(), "eq.true".to_string()),
            ]
        );
        assert!(filter_pairs(&Filter::all()).is_empty());
    }

    #[test]
    fn test_order_pair() {
        assert_eq!(
            order_pair(&Order::asc("created_at")),
            ("order".to_string(), "created_at.asc".to_string())
        );
        let desc = Order {
            column: "event_date".into(),
            ascending: false,
        };
        assert_eq!(order_pair(&desc).1, "event_date.desc");
    }

    #[test]
    fn test_with_query_encodes_values() {
        let url = Url::parse("https://xyz.supabase.co/rest/v1/guests").unwrap();
        let pairs = filter_pairs(&Filter::eq("name", "Ana & co"));

        assert_eq!(
            with_query(url.clone(), &pairs).as_str(),
            "https://xyz.supabase.co/rest/v1/guests?name=eq.Ana+%26+co"
        );
        assert_eq!(with_query(url, &[]).query(), None);
    }
}

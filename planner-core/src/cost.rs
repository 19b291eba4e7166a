//! Splitting an event's cost among confirmed attendees.

use crate::attendance::AttendanceMap;

pub fn confirmed_count(attendees: &AttendanceMap) -> usize {
    attendees.values().filter(|attending| **attending).count()
}

/// `ceil(total / confirmed)`, or 0 when nobody is confirmed.
pub fn cost_per_person(total_cost: f64, confirmed: usize) -> f64 {
    if confirmed == 0 {
        return 0.0;
    }
    (total_cost / confirmed as f64).ceil()
}

/// Parse a cost typed by a user. Anything that is not a finite,
/// non-negative number becomes 0.
pub fn parse_cost(input: &str) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(cost) if cost.is_finite() && cost > 0.0 => cost,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GuestId;

    #[test]
    fn test_cost_per_person_rounds_up() {
        assert_eq!(cost_per_person(100.0, 1), 100.0);
        assert_eq!(cost_per_person(100.0, 2), 50.0);
        assert_eq!(cost_per_person(100.0, 3), 34.0);
        assert_eq!(cost_per_person(0.0, 4), 0.0);
    }

    #[test]
    fn test_cost_per_person_without_confirmed_is_zero() {
        assert_eq!(cost_per_person(250.0, 0), 0.0);
        assert_eq!(cost_per_person(0.0, 0), 0.0);
    }

    #[test]
    fn test_confirmed_count_ignores_declined() {
        let attendees: AttendanceMap = [
            (GuestId::from("a"), true),
            (GuestId::from("b"), false),
            (GuestId::from("c"), true),
        ]
        .into_iter()
        .collect();
        assert_eq!(confirmed_count(&attendees), 2);
    }

    #[test]
    fn test_parse_cost() {
        assert_eq!(parse_cost("120"), 120.0);
        assert_eq!(parse_cost(" 12.5 "), 12.5);
        assert_eq!(parse_cost(""), 0.0);
        assert_eq!(parse_cost("abc"), 0.0);
        assert_eq!(parse_cost("-5"), 0.0);
        assert_eq!(parse_cost("NaN"), 0.0);
    }
}

//! Financial health score: a derived 0-100 integer summarizing budget
//! adherence and goal progress. Never authoritative; recomputed from the
//! other entities whenever they change.

/// Compute the score from `(limit, recomputed_spent)` budget pairs and
/// `(current, target)` goal pairs. A user with no budgets and no goals
/// sits at the 75 baseline.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn compute_health_score(budgets: &[(f64, f64)], goals: &[(f64, f64)]) -> i64 {
    if budgets.is_empty() && goals.is_empty() {
        return 75;
    }

    // Budget adherence contributes up to 60 points.
    let budget_points = if budgets.is_empty() {
        45.0
    } else {
        let within = budgets.iter().filter(|(limit, spent)| spent <= limit).count();
        60.0 * within as f64 / budgets.len() as f64
    };

    // Goal progress contributes up to 40 points.
    let goal_points = if goals.is_empty() {
        30.0
    } else {
        let avg: f64 = goals
            .iter()
            .map(|(current, target)| {
                if *target > 0.0 {
                    (current / target).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .sum::<f64>()
            / goals.len() as f64;
        40.0 * avg
    };

    (budget_points + goal_points).round().clamp(0.0, 100.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_data_is_baseline() {
        assert_eq!(compute_health_score(&[], &[]), 75);
    }

    #[test]
    fn test_perfect_adherence_and_complete_goals() {
        let budgets = [(500.0, 200.0), (300.0, 0.0)];
        let goals = [(1000.0, 1000.0), (2000.0, 2000.0)];
        assert_eq!(compute_health_score(&budgets, &goals), 100);
    }

    #[test]
    fn test_all_overspent_no_progress() {
        let budgets = [(500.0, 900.0)];
        let goals = [(0.0, 1000.0)];
        assert_eq!(compute_health_score(&budgets, &goals), 0);
    }

    #[test]
    fn test_partial_adherence() {
        // One of two budgets blown, goals half done: 30 + 20 = 50.
        let budgets = [(500.0, 200.0), (300.0, 400.0)];
        let goals = [(500.0, 1000.0)];
        assert_eq!(compute_health_score(&budgets, &goals), 50);
    }

    #[test]
    fn test_goals_only() {
        // No budgets: 45 neutral + full goal progress 40 = 85.
        let goals = [(1000.0, 1000.0)];
        assert_eq!(compute_health_score(&[], &goals), 85);
    }

    #[test]
    fn test_overfunded_goal_clamps_to_full() {
        let goals = [(1500.0, 1000.0)];
        assert_eq!(compute_health_score(&[], &goals), 85);
    }

    #[test]
    fn test_score_within_bounds() {
        let budgets = [(1.0, 0.0); 10];
        let goals = [(1.0, 1.0); 10];
        let score = compute_health_score(&budgets, &goals);
        assert!((0..=100).contains(&score));
    }
}

// src/utils/scoring.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::question::{AnswerValue, Question};

/// What the calculator needs to know about a question.
#[derive(Debug, Clone)]
pub struct AnswerKey {
    pub id: String,
    pub answer: AnswerValue,
    pub points: i32,
}

impl From<&Question> for AnswerKey {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.to_string(),
            answer: q.answer.0.clone(),
            points: q.points,
        }
    }
}

/// Outcome for a single question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub answered: bool,
    pub correct: bool,
    pub earned: i32,
    pub points: i32,
}

/// Compares a submitted value to the answer key.
///
/// List keys match only a list with the same elements after sorting both
/// (duplicates count). Single keys need exact string equality.
pub fn is_correct(expected: &AnswerValue, submitted: &AnswerValue) -> bool {
    match (expected, submitted) {
        (AnswerValue::Multiple(expected), AnswerValue::Multiple(submitted)) => {
            if expected.len() != submitted.len() {
                return false;
            }
            let mut expected: Vec<&String> = expected.iter().collect();
            let mut submitted: Vec<&String> = submitted.iter().collect();
            expected.sort();
            submitted.sort();
            expected == submitted
        }
        (AnswerValue::Single(expected), AnswerValue::Single(submitted)) => expected == submitted,
        _ => false,
    }
}

/// Grades every question in order. Missing responses earn nothing.
pub fn grade_responses(
    responses: &HashMap<String, AnswerValue>,
    keys: &[AnswerKey],
) -> Vec<QuestionResult> {
    keys.iter()
        .map(|key| {
            let submitted = responses.get(&key.id);
            let correct = submitted.is_some_and(|value| is_correct(&key.answer, value));
            QuestionResult {
                question_id: key.id.clone(),
                answered: submitted.is_some(),
                correct,
                earned: if correct { key.points } else { 0 },
                points: key.points,
            }
        })
        .collect()
}

/// Returns `(earned, total)`. `total` is always the sum of all points.
pub fn calculate_score(responses: &HashMap<String, AnswerValue>, keys: &[AnswerKey]) -> (i32, i32) {
    grade_responses(responses, keys)
        .iter()
        .fold((0, 0), |(earned, total), r| (earned + r.earned, total + r.points))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, answer: AnswerValue, points: i32) -> AnswerKey {
        AnswerKey {
            id: id.to_string(),
            answer,
            points,
        }
    }

    fn single(v: &str) -> AnswerValue {
        AnswerValue::Single(v.to_string())
    }

    fn multiple(vs: &[&str]) -> AnswerValue {
        AnswerValue::Multiple(vs.iter().map(|s| s.to_string()).collect())
    }

    fn responses(pairs: Vec<(&str, AnswerValue)>) -> HashMap<String, AnswerValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn single_choice_correct_and_wrong() {
        let keys = vec![key("q1", single("B"), 10)];
        assert_eq!(calculate_score(&responses(vec![("q1", single("B"))]), &keys), (10, 10));
        assert_eq!(calculate_score(&responses(vec![("q1", single("A"))]), &keys), (0, 10));
    }

    #[test]
    fn multiple_choice_ignores_order() {
        let keys = vec![key("q1", multiple(&["B", "C"]), 5)];
        let given = responses(vec![("q1", multiple(&["C", "B"]))]);
        assert_eq!(calculate_score(&given, &keys), (5, 5));
    }

    #[test]
    fn missing_response_earns_nothing() {
        let keys = vec![key("q1", single("B"), 10)];
        assert_eq!(calculate_score(&HashMap::new(), &keys), (0, 10));
    }

    #[test]
    fn duplicates_do_not_match_distinct_answers() {
        let keys = vec![key("q1", multiple(&["A", "B"]), 4)];
        let given = responses(vec![("q1", multiple(&["B", "B"]))]);
        assert_eq!(calculate_score(&given, &keys), (0, 4));
    }

    #[test]
    fn shape_mismatch_is_wrong() {
        let keys = vec![
            key("q1", multiple(&["A"]), 3),
            key("q2", single("A"), 3),
        ];
        let given = responses(vec![("q1", single("A")), ("q2", multiple(&["A"]))]);
        assert_eq!(calculate_score(&given, &keys), (0, 6));
    }

    #[test]
    fn subset_of_multiple_answer_gets_no_partial_credit() {
        let keys = vec![key("q1", multiple(&["A", "B", "C"]), 6)];
        let given = responses(vec![("q1", multiple(&["A", "B"]))]);
        assert_eq!(calculate_score(&given, &keys), (0, 6));
    }

    #[test]
    fn total_is_sum_of_points_regardless_of_responses() {
        let keys = vec![
            key("q1", single("A"), 1),
            key("q2", multiple(&["A", "B"]), 2),
            key("q3", single("paris"), 7),
            key("q4", single(""), 5),
        ];
        let cases = vec![
            HashMap::new(),
            responses(vec![("q1", single("A"))]),
            responses(vec![("q2", multiple(&["B", "A"])), ("q3", single("Paris"))]),
            responses(vec![("unknown", single("A"))]),
        ];
        for given in cases {
            let (earned, total) = calculate_score(&given, &keys);
            assert_eq!(total, 15);
            assert!(earned <= total);
        }
    }

    #[test]
    fn grade_reports_each_question() {
        let keys = vec![key("q1", single("A"), 2), key("q2", single("B"), 3)];
        let results = grade_responses(&responses(vec![("q1", single("A"))]), &keys);
        assert_eq!(results.len(), 2);
        assert!(results[0].answered && results[0].correct);
        assert_eq!(results[0].earned, 2);
        assert!(!results[1].answered && !results[1].correct);
        assert_eq!(results[1].earned, 0);
    }
}

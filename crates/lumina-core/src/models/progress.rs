use serde::{Deserialize, Serialize};

use crate::models::session::SessionCounters;
use crate::models::subject::Subject;

/// Engagement figures for one subject on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProgress {
    pub subject: Subject,
    pub sessions: u64,
    /// Engagement score derived from session count, capped at 100.
    pub score: u64,
}

/// The learner dashboard, derived on demand from [`SessionCounters`].
/// Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub per_subject: Vec<SubjectProgress>,
    pub total_sessions: u64,
    pub level: u64,
}

impl ProgressReport {
    pub fn derive(counters: &SessionCounters) -> Self {
        let per_subject = counters
            .iter()
            .map(|(subject, sessions)| SubjectProgress {
                subject,
                sessions,
                score: (sessions * 5).min(100),
            })
            .collect();
        let total_sessions = counters.total();
        Self {
            per_subject,
            total_sessions,
            level: total_sessions / 10 + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_counters_derive_level_one() {
        let report = ProgressReport::derive(&SessionCounters::default());
        assert_eq!(report.total_sessions, 0);
        assert_eq!(report.level, 1);
        assert_eq!(report.per_subject.len(), 5);
        assert!(report.per_subject.iter().all(|p| p.score == 0));
    }

    #[test]
    fn score_scales_with_sessions_and_caps_at_100() {
        let mut counters = SessionCounters::default();
        for _ in 0..3 {
            counters.increment(Subject::Science);
        }
        for _ in 0..25 {
            counters.increment(Subject::Math);
        }
        let report = ProgressReport::derive(&counters);
        let science = report
            .per_subject
            .iter()
            .find(|p| p.subject == Subject::Science)
            .unwrap();
        let math = report
            .per_subject
            .iter()
            .find(|p| p.subject == Subject::Math)
            .unwrap();
        assert_eq!(science.score, 15);
        assert_eq!(math.score, 100);
    }

    #[test]
    fn level_advances_every_ten_sessions() {
        let mut counters = SessionCounters::default();
        for _ in 0..10 {
            counters.increment(Subject::General);
        }
        assert_eq!(ProgressReport::derive(&counters).level, 2);
    }
}

//! Progress engine: pure profile updates, recommendations and history views.

use chrono::{DateTime, Utc};
use learnloop_core::profile::{Achievement, Level, Profile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Progress points per newly detected topic.
pub const POINTS_PER_TOPIC: u8 = 5;
/// Maximum progress gained in one turn.
pub const MAX_INCREASE: u8 = 15;

const MAX_RECOMMENDATIONS: usize = 3;

/// Fold one processed turn into a profile.
///
/// Topics are unioned, progress grows by `min(15, 5 * |detected|)` and is
/// clamped at 100, the question counter advances and `last_active_at` is set
/// to `now`. The level is recomputed by `Profile::from_parts`; moving up a
/// level earns an achievement. The learning streak follows [`next_streak`].
pub fn apply(current: &Profile, detected: &BTreeSet<String>, now: DateTime<Utc>) -> Profile {
    let topics: BTreeSet<String> = current.topics().union(detected).cloned().collect();
    let increase = detected.len().saturating_mul(POINTS_PER_TOPIC as usize).min(MAX_INCREASE as usize) as u8;

    let streak = next_streak(current, now);
    let mut achievements = current.achievements.clone();
    let updated = Profile::from_parts(
        current.student_id.clone(),
        current.progress().saturating_add(increase),
        topics,
        current.total_questions + 1,
        current.created_at,
        now,
    );

    if updated.level() > current.level() {
        award(
            &mut achievements,
            &format!("Reached {}", updated.level()),
            &format!("Moved up from {} to {}", current.level(), updated.level()),
            now,
        );
    }

    updated.with_activity(current.total_sessions, streak, achievements)
}

/// Streak after activity at `now`.
///
/// Activity on the calendar day after `last_active_at` extends the streak, a
/// longer gap restarts it at 1 and a second turn on the same day keeps it.
/// A profile that never had a streak starts at 1.
pub fn next_streak(current: &Profile, now: DateTime<Utc>) -> u32 {
    let days = (now.date_naive() - current.last_active_at.date_naive()).num_days();
    match days {
        1 => current.learning_streak_days.saturating_add(1),
        d if d > 1 => 1,
        _ => current.learning_streak_days.max(1),
    }
}

/// Count a newly opened session.
pub fn start_session(current: &Profile) -> Profile {
    let mut next = current.clone();
    next.total_sessions += 1;
    next
}

/// Append an achievement unless one with the same name was already earned.
pub fn award(achievements: &mut Vec<Achievement>, name: &str, description: &str, now: DateTime<Utc>) -> bool {
    if achievements.iter().any(|a| a.name == name) {
        return false;
    }
    achievements.push(Achievement {
        name: name.into(),
        description: description.into(),
        earned_at: now,
    });
    true
}

// ── Recommendations ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub topic: String,
    pub reason: String,
    pub difficulty: Level,
}

impl Recommendation {
    fn new(topic: &str, reason: &str, difficulty: Level) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
            difficulty,
        }
    }
}

/// Up to three next topics suited to the student's level.
pub fn recommendations(profile: &Profile) -> Vec<Recommendation> {
    let mut out = Vec::new();

    match profile.level() {
        Level::Beginner => {
            if !profile.has_topic("Machine Learning") {
                out.push(Recommendation::new(
                    "Machine Learning Basics",
                    "Great starting point for AI learning",
                    Level::Beginner,
                ));
            }
            if !profile.has_topic("AI Ethics") {
                out.push(Recommendation::new(
                    "AI Ethics",
                    "Understanding responsible AI is important",
                    Level::Beginner,
                ));
            }
        }
        Level::Intermediate => {
            if profile.has_topic("Machine Learning") && !profile.has_topic("Neural Networks") {
                out.push(Recommendation::new(
                    "Neural Networks",
                    "Natural next step after Machine Learning",
                    Level::Intermediate,
                ));
            }
            if !profile.has_topic("NLP") {
                out.push(Recommendation::new(
                    "Natural Language Processing",
                    "Exciting applications in language AI",
                    Level::Intermediate,
                ));
            }
        }
        Level::Advanced | Level::Expert => {
            if profile.has_topic("Neural Networks") && !profile.has_topic("Generative AI") {
                out.push(Recommendation::new(
                    "Generative AI",
                    "Cutting-edge AI technology",
                    Level::Advanced,
                ));
            }
        }
    }

    out.truncate(MAX_RECOMMENDATIONS);
    out
}

// ── History ──────────────────────────────────────────────────────────────

/// Read-only learning history for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningHistory {
    pub student_id: String,
    pub level: Level,
    pub progress: u8,
    pub topics_learned: Vec<String>,
    pub topics_count: usize,
    pub total_questions: u64,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub days_since_created: i64,
    pub total_sessions: u64,
    pub learning_streak: u32,
    pub achievements: Vec<Achievement>,
}

impl LearningHistory {
    pub fn from_profile(profile: &Profile, now: DateTime<Utc>) -> Self {
        Self {
            student_id: profile.student_id.clone(),
            level: profile.level(),
            progress: profile.progress(),
            topics_learned: profile.topics().iter().cloned().collect(),
            topics_count: profile.topics().len(),
            total_questions: profile.total_questions,
            created_at: profile.created_at,
            last_active: profile.last_active_at,
            days_since_created: (now - profile.created_at).num_days().max(0),
            total_sessions: profile.total_sessions,
            learning_streak: profile.learning_streak_days,
            achievements: profile.achievements.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use learnloop_core::profile::level_for;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn profile(progress: u8, topics: &[&str]) -> Profile {
        Profile::from_parts("s", progress, set(topics), 0, t0(), t0())
    }

    #[test]
    fn two_topics_add_ten() {
        let p = apply(&Profile::new("s", t0()), &set(&["Machine Learning", "Neural Networks"]), t0());
        assert_eq!(p.progress(), 10);
        assert_eq!(p.topics().len(), 2);
        assert_eq!(p.level(), Level::Beginner);
        assert_eq!(p.total_questions, 1);
    }

    #[test]
    fn increase_capped_at_fifteen() {
        let p = apply(&profile(10, &[]), &set(&["A", "B", "C", "D", "E"]), t0());
        assert_eq!(p.progress(), 25);
    }

    #[test]
    fn no_topics_no_progress_but_counts_question() {
        let now = t0() + Duration::hours(1);
        let p = apply(&profile(30, &["NLP"]), &BTreeSet::new(), now);
        assert_eq!(p.progress(), 30);
        assert_eq!(p.total_questions, 1);
        assert_eq!(p.last_active_at, now);
        assert_eq!(p.created_at, t0());
    }

    #[test]
    fn progress_clamped_and_monotonic() {
        let mut p = profile(95, &[]);
        for _ in 0..5 {
            let next = apply(&p, &set(&["X", "Y", "Z"]), t0());
            assert!(next.progress() >= p.progress());
            p = next;
        }
        assert_eq!(p.progress(), 100);
    }

    #[test]
    fn topic_union_idempotent_progress_not() {
        let detected = set(&["NLP", "AI Ethics"]);
        let once = apply(&Profile::new("s", t0()), &detected, t0());
        let twice = apply(&once, &detected, t0());
        assert_eq!(once.topics(), twice.topics());
        assert_eq!(twice.progress(), 20);
    }

    #[test]
    fn level_gating_is_weakest_link() {
        assert_eq!(level_for(19, 10), Level::Beginner);
        assert_eq!(level_for(100, 1), Level::Beginner);
        assert_eq!(level_for(20, 2), Level::Intermediate);
        assert_eq!(level_for(90, 4), Level::Intermediate);
        assert_eq!(level_for(50, 5), Level::Advanced);
        assert_eq!(level_for(80, 8), Level::Expert);
    }

    #[test]
    fn beginner_recommendations() {
        let recs = recommendations(&Profile::new("s", t0()));
        let topics: Vec<_> = recs.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["Machine Learning Basics", "AI Ethics"]);

        let recs = recommendations(&profile(5, &["Machine Learning"]));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].topic, "AI Ethics");
    }

    #[test]
    fn intermediate_recommendations() {
        let recs = recommendations(&profile(30, &["Machine Learning", "AI Ethics"]));
        let topics: Vec<_> = recs.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["Neural Networks", "Natural Language Processing"]);
        assert!(recs.iter().all(|r| r.difficulty == Level::Intermediate));
    }

    #[test]
    fn advanced_recommendations() {
        let p = profile(60, &["Machine Learning", "Neural Networks", "NLP", "AI Ethics", "Computer Vision"]);
        assert_eq!(p.level(), Level::Advanced);
        let recs = recommendations(&p);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].topic, "Generative AI");

        let done = profile(60, &["Neural Networks", "Generative AI", "NLP", "AI Ethics", "Computer Vision"]);
        assert!(recommendations(&done).is_empty());
    }

    #[test]
    fn history_view() {
        let p = apply(&Profile::new("s", t0()), &set(&["NLP"]), t0());
        let h = LearningHistory::from_profile(&p, t0() + Duration::days(3));
        assert_eq!(h.topics_count, 1);
        assert_eq!(h.days_since_created, 3);
        assert_eq!(h.total_questions, 1);
    }

    #[test]
    fn streak_extends_resets_and_holds() {
        let first = apply(&Profile::new("s", t0()), &BTreeSet::new(), t0());
        assert_eq!(first.learning_streak_days, 1);

        let same_day = apply(&first, &BTreeSet::new(), t0() + Duration::hours(5));
        assert_eq!(same_day.learning_streak_days, 1);

        let next_day = apply(&same_day, &BTreeSet::new(), t0() + Duration::hours(30));
        assert_eq!(next_day.learning_streak_days, 2);

        let after_gap = apply(&next_day, &BTreeSet::new(), t0() + Duration::days(5));
        assert_eq!(after_gap.learning_streak_days, 1);
    }

    #[test]
    fn streak_uses_calendar_days() {
        // 23:30 then 00:10 the next day is one day apart
        let late = Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
        let p = Profile::new("s", late).with_activity(0, 4, Vec::new());
        let p = apply(&p, &BTreeSet::new(), late + Duration::minutes(40));
        assert_eq!(p.learning_streak_days, 5);
    }

    #[test]
    fn sessions_are_counted_and_carried() {
        let p = start_session(&start_session(&Profile::new("s", t0())));
        assert_eq!(p.total_sessions, 2);
        let after_turn = apply(&p, &set(&["NLP"]), t0());
        assert_eq!(after_turn.total_sessions, 2);
        assert_eq!(after_turn.progress(), 5);
    }

    #[test]
    fn level_up_earns_one_achievement() {
        let p = profile(15, &["Machine Learning"]);
        let up = apply(&p, &set(&["NLP"]), t0());
        assert_eq!(up.level(), Level::Intermediate);
        assert_eq!(up.achievements.len(), 1);
        assert_eq!(up.achievements[0].name, "Reached Intermediate");

        let stay = apply(&up, &set(&["AI Ethics"]), t0());
        assert_eq!(stay.level(), Level::Intermediate);
        assert_eq!(stay.achievements.len(), 1);
    }

    #[test]
    fn award_skips_duplicates() {
        let mut list = Vec::new();
        assert!(award(&mut list, "First Steps", "Asked a first question", t0()));
        assert!(!award(&mut list, "First Steps", "again", t0()));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn history_reports_activity() {
        let p = start_session(&Profile::new("s", t0()));
        let p = apply(&p, &set(&["NLP"]), t0());
        let h = LearningHistory::from_profile(&p, t0());
        assert_eq!(h.total_sessions, 1);
        assert_eq!(h.learning_streak, 1);
        assert!(h.achievements.is_empty());
    }
}

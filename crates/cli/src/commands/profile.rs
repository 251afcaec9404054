//! `learnloop profile`: Print a student's learning history.

use chrono::Utc;
use learnloop_agent::progress::{LearningHistory, recommendations};
use learnloop_config::AppConfig;
use learnloop_core::profile::ProfileStore;
use learnloop_store::FileProfileStore;

pub async fn run(student_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = FileProfileStore::new(config.profiles_dir());

    let profile = store.load(&student_id).await;
    let history = LearningHistory::from_profile(&profile, Utc::now());

    println!();
    println!("  Student:    {}", history.student_id);
    println!("  Level:      {}", history.level);
    println!("  Progress:   {}%", history.progress);
    println!("  Questions:  {}", history.total_questions);
    println!("  Sessions:   {}", history.total_sessions);
    println!("  Streak:     {} days", history.learning_streak);
    println!("  Active for: {} days", history.days_since_created);
    if history.topics_learned.is_empty() {
        println!("  Topics:     none yet");
    } else {
        println!("  Topics:     {}", history.topics_learned.join(", "));
    }

    if !history.achievements.is_empty() {
        let names: Vec<&str> = history.achievements.iter().map(|a| a.name.as_str()).collect();
        println!("  Earned:     {}", names.join(", "));
    }

    let recs = recommendations(&profile);
    if !recs.is_empty() {
        println!();
        println!("  Recommended next:");
        for rec in recs {
            println!("    • {} ({}): {}", rec.topic, rec.difficulty, rec.reason);
        }
    }
    println!();

    Ok(())
}

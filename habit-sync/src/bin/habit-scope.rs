use std::rc::Rc;

use chrono::Datelike;
use habit_model::{MonthKey, planner::weeks};
use habit_sync::{SupabaseStore, SyncOrchestrator};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if !(2..=3).contains(&args.len()) {
        eprintln!("Usage: {} <user-id> [month-key]", args[0]);
        eprintln!("\nExample: {} 6f1c0c9e-0000-0000-0000-000000000000 2025-11", args[0]);
        eprintln!("\nReads SUPABASE_URL, SUPABASE_ANON_KEY and (optionally) SUPABASE_ACCESS_TOKEN");
        std::process::exit(1);
    }

    let user_id = &args[1];
    let month_key = match args.get(2) {
        Some(raw) => raw.parse::<MonthKey>(),
        None => MonthKey::from_date(chrono::Local::now()),
    };
    let month_key = match month_key {
        Ok(month_key) => month_key,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let store = match SupabaseStore::from_env() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let sync = SyncOrchestrator::new(Rc::new(store), month_key);
    let identity = match sync.sign_in(user_id).await {
        Ok(identity) => identity,
        Err(e) => {
            eprintln!("Error loading {month_key}: {}", e.message());
            std::process::exit(1);
        }
    };

    let stats = sync.stats();

    println!("HabitScope - Month Overview");
    println!("===========================");
    println!("User: {} ({:?})", identity.user_id, identity.role);
    match month_key.first_day() {
        Some(first) => println!(
            "Month: {month_key} ({} days, starts on a {})",
            stats.days_in_month,
            first.weekday()
        ),
        None => println!("Month: {month_key} ({} days)", stats.days_in_month),
    }
    println!();

    println!("Habits:");
    println!("-------");
    let habits = sync.habits();
    if habits.is_empty() {
        println!("  No habits this month");
    }
    for habit in &habits {
        let days = habit
            .completed_days
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "  {} {:<24} {:>2}/{:<2} {:>5.1}%  [{days}]",
            habit.icon,
            habit.name,
            habit.completed_days.len(),
            habit.goal,
            habit.progress_percent()
        );
    }
    println!(
        "  Overall: {}/{} ({:.1}%)",
        stats.total_completed, stats.total_goal, stats.overall_percent
    );
    println!();

    println!("Weeks:");
    println!("------");
    for week in weeks(stats.days_in_month) {
        let Some(days) = stats.daily.get((week.start - 1) as usize..week.end as usize) else {
            continue;
        };
        let done: usize = days.iter().map(|day| day.completed).sum();
        let possible: usize = days.iter().map(|day| day.completed + day.not_completed).sum();
        let percent = if possible == 0 {
            0.0
        } else {
            done as f64 / possible as f64 * 100.0
        };
        println!(
            "  Week {} (days {:>2}-{:>2}): {done}/{possible} ({percent:.1}%)",
            week.number, week.start, week.end
        );
    }
    println!();

    println!("Days:");
    println!("-----");
    let rating = |value: Option<u8>| value.map_or_else(|| "-".to_string(), |value| value.to_string());
    for ((habits, tasks), mental) in stats.daily.iter().zip(&stats.tasks).zip(&stats.mental) {
        let untouched = habits.completed == 0
            && tasks.total == 0
            && mental.mood.is_none()
            && mental.motivation.is_none();
        if untouched {
            continue;
        }
        println!(
            "  {:>2}: habits {:>5.1}%  tasks {}/{}  mood {:>2}  motivation {:>2}",
            habits.day,
            habits.percent,
            tasks.completed,
            tasks.total,
            rating(mental.mood),
            rating(mental.motivation)
        );
    }
}

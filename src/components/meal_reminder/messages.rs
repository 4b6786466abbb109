use super::classifier::MealType;
use crate::components::google_calendar::CalendarEvent;
use crate::utils::time::format_clock_time;
use chrono::DateTime;
use chrono_tz::Tz;
use rust_i18n::t;

fn meal_name(meal: MealType) -> String {
    match meal {
        MealType::Lunch => t!("meal_lunch"),
        MealType::Dinner => t!("meal_dinner"),
    }
    .to_string()
}

/// Reminder text for a meal-time meeting
pub fn event_reminder(event: &CalendarEvent, start: &DateTime<Tz>, meal: MealType) -> String {
    let title = event
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| t!("reminder_untitled_event").to_string());

    t!(
        "reminder_event",
        title = title,
        time = format_clock_time(start),
        meal = meal_name(meal)
    )
    .to_string()
}

/// Suggestion sent when a meal time approaches and nothing is booked
pub fn general_nudge(meal: MealType) -> String {
    t!("reminder_general_nudge", meal = meal_name(meal)).to_string()
}

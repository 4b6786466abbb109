use chrono::NaiveTime;
use execumate::components::google_calendar::{parse_events, GoogleCalendarClient};
use execumate::components::meal_reminder::{
    CredentialStore, EventSource, MealType, MealWindow, MealWindows,
};
use execumate::components::redis_service::RedisActorHandle;
use execumate::config::{Config, ReminderSettings, WindowConfig};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A trimmed `events.list` response as Google returns it
fn sample_response() -> serde_json::Value {
    json!({
        "kind": "calendar#events",
        "summary": "someone@example.com",
        "timeZone": "Europe/Helsinki",
        "items": [
            {
                "id": "breakfast",
                "summary": "Breakfast sync",
                "start": { "dateTime": "2024-03-04T08:30:00+02:00" },
                "end": { "dateTime": "2024-03-04T09:00:00+02:00" }
            },
            {
                "id": "lunch",
                "summary": "Lunch with the board",
                "description": "Room 4",
                "start": { "dateTime": "2024-03-04T12:00:00+02:00", "timeZone": "Europe/Helsinki" },
                "end": { "dateTime": "2024-03-04T13:00:00+02:00" }
            },
            {
                "id": "offsite",
                "summary": "Offsite",
                "start": { "date": "2024-03-04" },
                "end": { "date": "2024-03-05" }
            },
            {
                "id": "dinner",
                "start": { "dateTime": "2024-03-04T16:15:00Z" }
            }
        ]
    })
}

fn windows() -> MealWindows {
    let settings = ReminderSettings::default();
    MealWindows {
        lunch: MealWindow::from_config("lunch", &settings.lunch).unwrap(),
        dinner: MealWindow::from_config("dinner", &settings.dinner).unwrap(),
    }
}

#[test]
fn test_google_response_classification() {
    let events = parse_events(&sample_response()).unwrap();
    assert_eq!(events.len(), 4);

    let tz = chrono_tz::Europe::Helsinki;
    let meals: Vec<(String, Option<MealType>)> = events
        .iter()
        .map(|event| {
            let meal = event
                .start_time()
                .unwrap()
                .and_then(|start| windows().classify(start.with_timezone(&tz).time()));
            (event.id.clone(), meal)
        })
        .collect();

    assert_eq!(
        meals,
        vec![
            ("breakfast".to_string(), None),
            ("lunch".to_string(), Some(MealType::Lunch)),
            ("offsite".to_string(), None),
            // 16:15 UTC is 18:15 in Helsinki
            ("dinner".to_string(), Some(MealType::Dinner)),
        ]
    );

    assert!(events[2].is_all_day());
    assert_eq!(events[3].summary, None);
}

#[test]
fn test_response_without_items_is_an_error() {
    assert!(parse_events(&json!({ "error": { "code": 401 } })).is_err());
}

#[test]
fn test_custom_window_shifts_classification() {
    let windows = MealWindows {
        lunch: MealWindow::from_config("lunch", &WindowConfig::new("12:30", "13:30")).unwrap(),
        dinner: windows().dinner,
    };
    assert_eq!(windows.classify(NaiveTime::from_hms_opt(12, 0, 0).unwrap()), None);
    assert_eq!(
        windows.classify(NaiveTime::from_hms_opt(12, 30, 0).unwrap()),
        Some(MealType::Lunch)
    );
}

/// Without a Redis actor the client reports errors instead of hanging
#[tokio::test]
async fn test_client_without_token_store() {
    let config = Config {
        discord_token: String::new(),
        google_client_id: "id".to_string(),
        google_client_secret: "secret".to_string(),
        redis_url: String::new(),
        components: HashMap::new(),
        timezone: "UTC".to_string(),
        activity: String::new(),
        bot_locale: "en".to_string(),
        reminder_channel_id: None,
        order_agent_url: String::new(),
        assistant_api_url: String::new(),
        assistant_api_key: None,
        assistant_model: String::new(),
        reminders: ReminderSettings::default(),
    };

    let client = GoogleCalendarClient::new(
        Arc::new(RwLock::new(config)),
        RedisActorHandle::empty(),
        chrono_tz::UTC,
    )
    .with_api_base("http://127.0.0.1:9");

    assert_eq!(client.name(), "google_calendar");
    assert!(client.has_credentials("42").await.is_err());
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    assert!(client.events_for_day("42", date).await.is_err());
}

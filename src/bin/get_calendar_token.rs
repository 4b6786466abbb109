use execumate::components::google_calendar::token::{stamp_expiry, TOKEN_URL};
use execumate::components::redis_service::RedisActor;
use execumate::config::Config;
use execumate::error::{other_error, BotResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

const REDIRECT_URI: &str = "http://localhost:8080";
const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Link a Discord user's Google Calendar:
/// `get_calendar_token <discord-user-id>`
#[tokio::main]
async fn main() -> BotResult<()> {
    let user_id = std::env::args()
        .nth(1)
        .filter(|id| id.parse::<u64>().is_ok())
        .ok_or_else(|| other_error("Usage: get_calendar_token <discord-user-id>"))?;

    let config = Arc::new(RwLock::new(Config::load()?));

    // Create Redis actor
    let (mut redis_actor, redis_handle) = RedisActor::new(config.clone());
    let redis_task = tokio::spawn(async move {
        redis_actor.run().await;
    });

    let (client_id, client_secret) = {
        let config_read = config.read().await;
        (
            config_read.google_client_id.clone(),
            config_read.google_client_secret.clone(),
        )
    };

    // Random state ties the callback to this run
    let state = uuid::Uuid::new_v4().to_string();

    let auth_url = Url::parse_with_params(
        "https://accounts.google.com/o/oauth2/v2/auth",
        &[
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("scope", SCOPE),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| other_error(&format!("Failed to build authorization URL: {}", e)))?;

    println!("Opening browser to link the calendar of user {}...", user_id);
    webbrowser::open(auth_url.as_str())?;

    let server = tiny_http::Server::http("127.0.0.1:8080")?;
    println!("Waiting for authorization callback...");

    let request = server.recv()?;
    let callback = Url::parse(&format!("{}{}", REDIRECT_URI, request.url()))
        .map_err(|e| other_error(&format!("Invalid callback URL: {}", e)))?;

    let param = |name: &str| {
        callback
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if param("state").as_deref() != Some(state.as_str()) {
        return Err(other_error("Callback state does not match, aborting"));
    }
    let code = param("code").ok_or_else(|| other_error("No authorization code found in callback"))?;

    // Exchange code for tokens
    let response = reqwest::Client::new()
        .post(TOKEN_URL)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("redirect_uri", REDIRECT_URI.to_string()),
            ("grant_type", "authorization_code".to_string()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(other_error(&format!("Failed to get token: {}", error_text)));
    }

    let token_data = stamp_expiry(response.json().await?, chrono::Utc::now().timestamp())?;
    redis_handle.save_token(&user_id, token_data).await?;

    request.respond(tiny_http::Response::from_string(
        "Calendar linked! You can close this window.",
    ))?;
    println!("Token saved to Redis for user {}", user_id);

    redis_handle.shutdown().await?;
    let _ = redis_task.await;

    Ok(())
}

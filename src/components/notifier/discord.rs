use super::{events, NotificationPayload, NotificationSink};
use poise::serenity_prelude::{self as serenity, ChannelId, CreateEmbed, CreateMessage, Mentionable, UserId};
use rust_i18n::t;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Delivers notifications as Discord messages: a DM to the user, or a
/// mention in the reminder channel when one is configured.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
    channel_id: Option<u64>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<serenity::Http>, channel_id: Option<u64>) -> Self {
        Self { http, channel_id }
    }
}

/// Embed title and colour for an event name
fn embed_style(event_name: &str) -> (String, u32) {
    match event_name {
        events::REMINDER => (t!("notification_reminder_title").to_string(), 0x00_AA_FF),
        events::ORDER_PLACED => (t!("notification_order_placed_title").to_string(), 0x00_FF_00),
        events::ORDER_FAILED => (t!("notification_order_failed_title").to_string(), 0xFF_44_44),
        _ => (event_name.to_string(), 0xAA_AA_AA),
    }
}

fn build_message(event_name: &str, payload: &NotificationPayload, mention: Option<UserId>) -> CreateMessage {
    let (title, color) = embed_style(event_name);
    let mut embed = CreateEmbed::new()
        .title(title)
        .description(&payload.message)
        .color(color);

    if event_name == events::REMINDER {
        embed = embed.footer(serenity::CreateEmbedFooter::new(t!("notification_reminder_footer")));
    }

    let mut message = CreateMessage::new().embed(embed);
    if let Some(user) = mention {
        message = message.content(user.mention().to_string());
    }
    message
}

impl NotificationSink for DiscordNotifier {
    fn emit(&self, event_name: &str, payload: NotificationPayload, target: &str) {
        let user = match target.parse::<u64>() {
            Ok(id) if id != 0 => UserId::new(id),
            _ => {
                warn!("Cannot deliver {} to non-Discord target {}", event_name, target);
                return;
            }
        };

        let http = Arc::clone(&self.http);
        let channel_id = self.channel_id;
        let event_name = event_name.to_string();

        tokio::spawn(async move {
            let result = match channel_id {
                Some(channel_id) => {
                    let message = build_message(&event_name, &payload, Some(user));
                    ChannelId::new(channel_id).send_message(&*http, message).await
                }
                None => {
                    let message = build_message(&event_name, &payload, None);
                    user.direct_message(&*http, message).await
                }
            };

            match result {
                Ok(_) => debug!("Delivered {} to {}", event_name, user),
                Err(e) => error!("Failed to deliver {} to {}: {}", event_name, user, e),
            }
        });
    }
}

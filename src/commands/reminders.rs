use crate::commands::{create_success_embed, CommandResult, Context};
use crate::error::component_error;
use rust_i18n::t;

/// Show the meal reminders you've received recently
#[poise::command(slash_command, prefix_command)]
pub async fn reminders(ctx: Context<'_>) -> CommandResult {
    let user_id = ctx.author().id.to_string();
    let reminder = ctx
        .data()
        .meal_reminder()
        .ok_or_else(|| component_error("Meal reminders are disabled"))?;

    let records = reminder.get_state_handle().records_for(&user_id).await?;

    let description = if records.is_empty() {
        t!("reminders_none").to_string()
    } else {
        records
            .iter()
            .map(|record| {
                format!(
                    "- `{}` at {}",
                    record.key.key,
                    record.fired_at.format("%Y-%m-%d %H:%M UTC")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    ctx.send(
        poise::CreateReply::default()
            .embed(create_success_embed(&t!("reminders_title"), &description))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Check whether your Google Calendar is linked
#[poise::command(slash_command, prefix_command)]
pub async fn calendar_status(ctx: Context<'_>) -> CommandResult {
    let user_id = ctx.author().id.to_string();
    let linked = ctx.data().redis_handle.has_token(&user_id).await?;

    let message = if linked {
        t!("calendar_linked")
    } else {
        t!("calendar_not_linked", user_id = user_id.as_str())
    };

    ctx.send(
        poise::CreateReply::default()
            .content(message)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Forget your stored Google Calendar token
#[poise::command(slash_command, prefix_command)]
pub async fn unlink_calendar(ctx: Context<'_>) -> CommandResult {
    let user_id = ctx.author().id.to_string();
    let removed = ctx.data().redis_handle.delete_token(&user_id).await?;

    let message = if removed {
        t!("calendar_unlinked")
    } else {
        t!("calendar_nothing_to_unlink")
    };

    ctx.send(
        poise::CreateReply::default()
            .content(message)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

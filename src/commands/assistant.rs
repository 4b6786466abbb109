use crate::commands::{CommandResult, Context};
use crate::error::component_error;

/// Talk to ExecuMate
#[poise::command(slash_command, prefix_command)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your message"]
    #[rest]
    message: String,
) -> CommandResult {
    let assistant = ctx
        .data()
        .assistant()
        .ok_or_else(|| component_error("The assistant is disabled"))?;

    ctx.defer().await?;
    let reply = assistant
        .respond(&ctx.author().id.to_string(), &message)
        .await;
    ctx.say(reply).await?;
    Ok(())
}

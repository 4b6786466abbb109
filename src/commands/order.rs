use crate::commands::{create_success_embed, CommandResult, Context};
use crate::components::ordering::{MenuItem, OrderRequest};
use crate::error::component_error;
use rust_i18n::t;

fn format_items(items: &[MenuItem]) -> String {
    if items.is_empty() {
        return t!("order_no_results").to_string();
    }
    items
        .iter()
        .map(|item| format!("- [{}]({})", item, item.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Suggest a few popular lunch options
#[poise::command(slash_command, prefix_command)]
pub async fn lunch_options(ctx: Context<'_>) -> CommandResult {
    let dispatcher = ctx
        .data()
        .ordering()
        .ok_or_else(|| component_error("Ordering is disabled"))?
        .get_dispatcher()
        .await
        .ok_or_else(|| component_error("Ordering is not ready yet"))?;

    // Browser runs take a while
    ctx.defer().await?;
    let items = dispatcher.service().find_lunch_options().await?;

    ctx.send(poise::CreateReply::default().embed(create_success_embed(
        &t!("order_lunch_options_title"),
        &format_items(&items),
    )))
    .await?;
    Ok(())
}

/// Search delivery menus for something specific
#[poise::command(slash_command, prefix_command)]
pub async fn find_food(
    ctx: Context<'_>,
    #[description = "What are you hungry for?"]
    #[rest]
    query: String,
) -> CommandResult {
    let dispatcher = ctx
        .data()
        .ordering()
        .ok_or_else(|| component_error("Ordering is disabled"))?
        .get_dispatcher()
        .await
        .ok_or_else(|| component_error("Ordering is not ready yet"))?;

    ctx.defer().await?;
    let items = dispatcher.service().search_menu(&query).await?;

    ctx.send(poise::CreateReply::default().embed(create_success_embed(
        &t!("order_search_title", query = query.as_str()),
        &format_items(&items),
    )))
    .await?;
    Ok(())
}

/// Order an item; you'll hear back when it goes through
#[poise::command(slash_command, prefix_command)]
pub async fn order(
    ctx: Context<'_>,
    #[description = "Restaurant name"] restaurant: String,
    #[description = "Menu item"]
    #[rest]
    item: String,
) -> CommandResult {
    let dispatcher = ctx
        .data()
        .ordering()
        .ok_or_else(|| component_error("Ordering is disabled"))?
        .get_dispatcher()
        .await
        .ok_or_else(|| component_error("Ordering is not ready yet"))?;

    let user_id = ctx.author().id.to_string();
    let request = OrderRequest::new(restaurant.trim(), item.trim());

    // Detached; the outcome arrives as a notification
    drop(dispatcher.dispatch(&user_id, request.clone()));

    ctx.say(t!(
        "order_acknowledged",
        item = request.item.as_str(),
        restaurant = request.restaurant.as_str()
    ))
    .await?;
    Ok(())
}

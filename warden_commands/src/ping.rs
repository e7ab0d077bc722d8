use crate::prelude::*;

pub fn setup(set: &mut CommandSetBuilder) -> anyhow::Result<()> {
    set.add_command(
        TextCommandBuilder::new("ping")
            .set_description("Measures the bot's reply latency")
            .set_category("utility")
            .set_handler(ping),
    )
}

async fn ping(mut ctx: CommandContext, _args: Arguments) -> anyhow::Result<()> {
    let before = chrono::Utc::now();

    ctx.reply("Pong!").await?;

    let ping = chrono::Utc::now().timestamp_millis() - before.timestamp_millis();

    let embed = EmbedBuilder::new_common()
        .set_color(if ping < 200 {
            Color::GREEN
        } else if ping < 400 {
            Color::YELLOW
        } else {
            Color::RED
        })
        .set_title("Pong! 🏓")
        .add_field("Latency", format!("{ping}ms"), true);

    ctx.edit_reply(Response::from(embed)).await?;

    Ok(())
}

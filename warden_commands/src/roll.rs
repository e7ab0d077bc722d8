use rand::Rng;

use crate::prelude::*;

pub fn setup(set: &mut CommandSetBuilder) -> anyhow::Result<()> {
    set.add_command(
        TextCommandBuilder::new("roll")
            .set_description("Rolls a die")
            .set_category("utility")
            .add_number_option(ArgumentOptions::new("sides", "How many sides the die has").optional())
            .set_handler(roll),
    )
}

async fn roll(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let sides = args.number_opt(0).unwrap_or(6).clamp(2, 1000);
    let rolled = rand::rng().random_range(1..=sides);

    let author = ctx.author().cloned().context("roll has no invoking user")?;
    ctx.reply(Response::new_user_reply(
        &author,
        format!("you rolled **{rolled}** on a d{sides}."),
    ))
    .await?;

    Ok(())
}

use crate::prelude::*;

pub fn setup(set: &mut CommandSetBuilder) -> anyhow::Result<()> {
    set.add_command(
        // "say" is the shorthand for text chat only; "echo" also registers
        // as a slash command.
        TextCommandBuilder::new_aliased(&["echo", "say"])
            .set_description("Repeats your message back")
            .set_slash_config(&[true, false])
            .set_category("utility")
            .add_string_option(ArgumentOptions::new("text", "What to repeat"))
            .set_handler(echo),
    )
}

async fn echo(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let text = args.string(0)?;

    ctx.reply(Response::from_string(text)).await?;

    Ok(())
}

use std::{collections::HashMap, sync::Mutex};

use once_cell::sync::Lazy;

use crate::prelude::*;

// Cross-invocation state is the component's responsibility; handlers
// interleave at await points, so access goes through a mutex.
static TAGS: Lazy<Mutex<HashMap<String, String>>> = Lazy::new(Default::default);

pub fn setup(set: &mut CommandSetBuilder) -> anyhow::Result<()> {
    set.add_command(
        TextCommandBuilder::new("tag")
            .set_description("Manages reusable text snippets")
            .set_category("utility")
            .add_subcommand(
                TextCommandBuilder::new("add")
                    .set_description("Adds or replaces a snippet")
                    .add_string_option(ArgumentOptions::new("name", "The snippet's name"))
                    .add_string_option(ArgumentOptions::new("content", "The snippet itself"))
                    .set_handler(tag_add),
            )
            .add_subcommand(
                TextCommandBuilder::new("remove")
                    .set_description("Deletes a snippet")
                    .add_string_option(ArgumentOptions::new("name", "The snippet to delete"))
                    .set_handler(tag_remove),
            )
            .add_subcommand(
                TextCommandBuilder::new("get")
                    .set_description("Posts a snippet")
                    .add_string_option(
                        ArgumentOptions::new("name", "The snippet to post").with_autocomplete(
                            |partial, _command| {
                                let tags = TAGS.lock().unwrap();
                                tags.keys()
                                    .filter(|name| name.starts_with(partial))
                                    .map(|name| AutocompleteChoice {
                                        name: name.clone(),
                                        value: name.clone(),
                                    })
                                    .collect()
                            },
                        ),
                    )
                    .set_handler(tag_get),
            )
            .add_subcommand(
                TextCommandBuilder::new("list")
                    .set_description("Lists every snippet")
                    .set_handler(tag_list),
            ),
    )
}

async fn tag_add(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let name = args.string(0)?;
    let content = args.string(1)?;

    let replaced = TAGS.lock().unwrap().insert(name.clone(), content).is_some();

    ctx.reply(Response::success(if replaced {
        format!("Replaced tag **{name}**.")
    } else {
        format!("Added tag **{name}**.")
    }))
    .await?;

    Ok(())
}

async fn tag_remove(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let name = args.string(0)?;

    if !TAGS.lock().unwrap().contains_key(&name) {
        ctx.reply(Response::error(format!("There is no tag named **{name}**.")))
            .await?;
        return Ok(());
    }

    let author_id = ctx.author_id()?;
    let confirmed = ctx
        .create_confirmation(
            author_id,
            Response::from_string(format!("Delete tag **{name}**?")),
        )
        .await?;

    if confirmed {
        TAGS.lock().unwrap().remove(&name);
        ctx.reply(Response::success(format!("Deleted tag **{name}**.")))
            .await?;
    }

    Ok(())
}

async fn tag_get(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let name = args.string(0)?;

    let content = TAGS.lock().unwrap().get(&name).cloned();
    match content {
        Some(content) => ctx.reply(Response::from_string(content)).await?,
        None => {
            ctx.reply(Response::error(format!("There is no tag named **{name}**.")).set_ephemeral())
                .await?
        }
    }

    Ok(())
}

async fn tag_list(mut ctx: CommandContext, _args: Arguments) -> anyhow::Result<()> {
    let names = {
        let tags = TAGS.lock().unwrap();
        let mut names: Vec<_> = tags.keys().cloned().collect();
        names.sort();
        names
    };

    if names.is_empty() {
        ctx.reply(Response::from_string("No tags yet.")).await?;
        return Ok(());
    }

    let embed = EmbedBuilder::new_common()
        .set_title("Tags")
        .set_description(
            names
                .iter()
                .map(|name| format!("`{name}`"))
                .collect::<Vec<_>>()
                .join(", "),
        );

    ctx.reply(Response::from(embed)).await?;

    Ok(())
}

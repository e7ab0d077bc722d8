use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use once_cell::sync::Lazy;

use crate::prelude::*;

#[derive(Debug, Clone)]
struct Note {
    id: u64,
    author: String,
    text: String,
}

static NOTES: Lazy<Mutex<HashMap<u64, Vec<Note>>>> = Lazy::new(Default::default);
static NEXT_NOTE_ID: AtomicU64 = AtomicU64::new(1);

/// Moderator notes about users: a permission-gated command pair plus a
/// delete button and an edit modal, both carrying the note reference in
/// their identifiers.
pub fn setup(set: &mut CommandSetBuilder) -> anyhow::Result<()> {
    let edit_modal = set.add_modal(
        ModalCommandBuilder::new("note-edit", "Edit note")
            .set_permissions(Permissions::MANAGE_MESSAGES)
            .add_number_option(ArgumentOptions::new("note", "The note's id"))
            .add_user_id_option(ArgumentOptions::new("target", "Who the note is about"))
            .add_field(ModalFieldConfig::new("text", "Note text").paragraph())
            .set_handler(edit_note_submit),
    )?;

    let edit_button = {
        let edit_modal = edit_modal.clone();
        set.add_button(
            ButtonCommandBuilder::new("note-editbtn")
                .set_permissions(Permissions::MANAGE_MESSAGES)
                .add_number_option(ArgumentOptions::new("note", "The note's id"))
                .add_user_id_option(ArgumentOptions::new("target", "Who the note is about"))
                .set_handler(move |mut ctx: CommandContext, args: Arguments| {
                    let edit_modal = edit_modal.clone();
                    async move {
                        let payload = edit_modal.build_modal(&[
                            ArgumentValue::Number(args.number(0)?),
                            ArgumentValue::UserId(args.user_id(1)?),
                        ])?;
                        ctx.open_modal(payload).await
                    }
                }),
        )?
    };

    let delete_button = set.add_button(
        ButtonCommandBuilder::new("note-del")
            .set_permissions(Permissions::MANAGE_MESSAGES)
            .add_number_option(ArgumentOptions::new("note", "The note's id"))
            .add_user_id_option(ArgumentOptions::new("target", "Who the note is about"))
            .set_handler(delete_note_press),
    )?;

    set.add_command(
        TextCommandBuilder::new("note")
            .set_description("Keeps a note about a user")
            .set_permissions(Permissions::MANAGE_MESSAGES)
            .set_category("notes")
            .add_user_option(ArgumentOptions::new("user", "Who the note is about"))
            .add_string_option(ArgumentOptions::new("text", "The note itself"))
            .set_handler(add_note),
    )?;

    set.add_command(
        TextCommandBuilder::new("notes")
            .set_description("Shows the notes kept about a user")
            .set_permissions(Permissions::MANAGE_MESSAGES)
            .set_reply_mode(ReplyMode::Ephemeral)
            .set_category("notes")
            .add_user_option(ArgumentOptions::new("user", "Whose notes to show"))
            .set_handler(move |ctx: CommandContext, args: Arguments| {
                let edit_button = edit_button.clone();
                let delete_button = delete_button.clone();
                async move { show_notes(ctx, args, edit_button, delete_button).await }
            }),
    )?;

    Ok(())
}

async fn add_note(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let user = args.user(0)?;
    let text = args.string(1)?;
    let author = ctx.author().cloned().context("note has no invoking user")?;

    let id = NEXT_NOTE_ID.fetch_add(1, Ordering::Relaxed);
    NOTES.lock().unwrap().entry(user.id.get()).or_default().push(Note {
        id,
        author: author.display_name(),
        text,
    });

    ctx.reply(
        Response::success(format!(
            "Note **#{id}** added for {}.",
            user.mention()
        ))
        .set_ephemeral(),
    )
    .await?;

    Ok(())
}

async fn show_notes(
    mut ctx: CommandContext,
    args: Arguments,
    edit_button: std::sync::Arc<ComponentDescriptor>,
    delete_button: std::sync::Arc<ComponentDescriptor>,
) -> anyhow::Result<()> {
    let user = args.user(0)?;

    let notes = NOTES
        .lock()
        .unwrap()
        .get(&user.id.get())
        .cloned()
        .unwrap_or_default();

    if notes.is_empty() {
        ctx.reply(
            Response::from_string(format!("No notes for {}.", user.mention())).set_ephemeral(),
        )
        .await?;
        return Ok(());
    }

    let mut embed = EmbedBuilder::new_common()
        .set_author_to_user(&user)
        .set_title(format!("Notes for {}", user.display_name()));
    for note in &notes {
        embed = embed.add_field(
            format!("#{} — {}", note.id, note.author),
            note.text.clone(),
            false,
        );
    }

    // The buttons operate on the most recent note; the identifiers carry
    // the note id and the target user through the round trip.
    let latest = notes.last().context("notes list cannot be empty here")?;
    let state = [
        ArgumentValue::Number(latest.id as i64),
        ArgumentValue::UserId(user.id),
    ];

    let buttons = vec![
        ButtonBuilder::new()
            .set_custom_id(edit_button.encode_custom_id(&state)?)
            .set_label(format!("Edit #{}", latest.id))
            .set_style(ButtonStyle::Primary),
        ButtonBuilder::new()
            .set_custom_id(delete_button.encode_custom_id(&state)?)
            .set_label(format!("Delete #{}", latest.id))
            .set_style(ButtonStyle::Danger),
    ];

    ctx.reply(
        Response::from(embed)
            .set_components(vec![ActionRowBuilder::new().add_buttons(buttons)])
            .set_ephemeral(),
    )
    .await?;

    Ok(())
}

async fn delete_note_press(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let note_id = args.number(0)? as u64;
    let target = args.user_id(1)?;

    let removed = {
        let mut notes = NOTES.lock().unwrap();
        match notes.get_mut(&target.get()) {
            Some(list) => {
                let before = list.len();
                list.retain(|note| note.id != note_id);
                before != list.len()
            }
            None => false,
        }
    };

    let message = if removed {
        format!("Note **#{note_id}** deleted.")
    } else {
        format!("Note **#{note_id}** no longer exists.")
    };

    ctx.update_component_message(Response::from_string(message).remove_all_components())
        .await?;

    Ok(())
}

async fn edit_note_submit(mut ctx: CommandContext, args: Arguments) -> anyhow::Result<()> {
    let note_id = args.number(0)? as u64;
    let target = args.user_id(1)?;
    let text = args.string(2)?;

    let edited = {
        let mut notes = NOTES.lock().unwrap();
        notes
            .get_mut(&target.get())
            .and_then(|list| list.iter_mut().find(|note| note.id == note_id))
            .map(|note| note.text = text)
            .is_some()
    };

    if edited {
        ctx.reply(Response::success(format!("Note **#{note_id}** updated.")).set_ephemeral())
            .await?;
    } else {
        ctx.reply(
            Response::error(format!("Note **#{note_id}** no longer exists.")).set_ephemeral(),
        )
        .await?;
    }

    Ok(())
}

//! Command execution.

use std::io::Write;

use anyhow::{bail, Context};
use emoji_art_core::{Defaults, EmojiId, Offset, PaletteBook, Point};
use emoji_art_document::{
    BackgroundState, DocumentId, DocumentOptions, DocumentStore, EmojiArtDocument,
};

use crate::{CliConfig, Command};

/// Run one command, writing its report to `out`.
///
/// Pending document writes are flushed before returning.
///
/// # Errors
///
/// Returns an error if the data directory cannot be used, a document or
/// emoji cannot be found, or writing to `out` fails.
pub async fn run(
    config: CliConfig,
    options: DocumentOptions,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let path = config.defaults_path();
    let defaults = Defaults::with_file(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    tracing::debug!(path = %path.display(), store = %config.store, "Opened defaults");

    let store = DocumentStore::new(config.store.as_str(), defaults.clone(), options);
    let result = execute(&store, &defaults, config.command, out).await;
    store.flush().await;
    result
}

async fn execute(
    store: &DocumentStore,
    defaults: &Defaults,
    command: Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::List => {
            for (id, name) in store.documents() {
                writeln!(out, "{id}  {name}")?;
            }
        }
        Command::New { name } => {
            let document = store.add_document(name.as_deref())?;
            let name = store.name(document.id()).unwrap_or_default();
            writeln!(out, "{}  {name}", document.id())?;
        }
        Command::Show { doc } => {
            let document = open(store, &doc)?;
            show(&document, out)?;
        }
        Command::Rename { doc, name } => {
            let id = resolve(store, &doc)?;
            let given = store.set_name(id, &name)?;
            writeln!(out, "{id}  {given}")?;
        }
        Command::Delete { doc } => {
            let id = resolve(store, &doc)?;
            store.remove_document(id).await?;
            writeln!(out, "Deleted {id}")?;
        }
        Command::Add {
            doc,
            emoji,
            x,
            y,
            size,
        } => {
            let document = open(store, &doc)?;
            let placed = document.add_emoji(&emoji, Point::new(x, y), size);
            writeln!(out, "{}", placed.id)?;
        }
        Command::Move {
            doc,
            emoji_id,
            dx,
            dy,
        } => {
            let (document, id) = open_emoji(store, &doc, &emoji_id)?;
            document.move_emoji(id, Offset::new(dx, dy));
        }
        Command::Scale {
            doc,
            emoji_id,
            factor,
        } => {
            let (document, id) = open_emoji(store, &doc, &emoji_id)?;
            document.scale_emoji(id, factor);
        }
        Command::Remove { doc, emoji_id } => {
            let (document, id) = open_emoji(store, &doc, &emoji_id)?;
            document.remove_emoji(id);
        }
        Command::Background { doc, url, wait } => {
            let document = open(store, &doc)?;
            document.set_background(url);
            if let Some(url) = document.background_url() {
                writeln!(out, "Background {url}")?;
            }
            if wait {
                writeln!(out, "{}", describe(&document.background_settled().await))?;
            }
        }
        Command::Palettes => {
            let book = PaletteBook::load(defaults.clone());
            for palette in book.palettes() {
                writeln!(out, "{}: {}", palette.name, palette.emojis)?;
            }
        }
    }
    Ok(())
}

/// Find a document by ID or, failing that, by name.
fn resolve(store: &DocumentStore, doc: &str) -> anyhow::Result<DocumentId> {
    DocumentId::parse(doc)
        .ok()
        .filter(|id| store.name(*id).is_some())
        .or_else(|| store.find(doc))
        .with_context(|| format!("No document named {doc:?} in store {:?}", store.store_name()))
}

fn open(store: &DocumentStore, doc: &str) -> anyhow::Result<EmojiArtDocument> {
    let id = resolve(store, doc)?;
    store
        .open(id)
        .with_context(|| format!("Document {id} disappeared"))
}

fn open_emoji(
    store: &DocumentStore,
    doc: &str,
    emoji_id: &str,
) -> anyhow::Result<(EmojiArtDocument, EmojiId)> {
    let document = open(store, doc)?;
    let id = EmojiId::parse(emoji_id)?;
    if document.emoji(id).is_none() {
        bail!("No emoji {id} in {doc:?}");
    }
    Ok((document, id))
}

fn show(document: &EmojiArtDocument, out: &mut impl Write) -> anyhow::Result<()> {
    match document.background_url() {
        Some(url) => writeln!(out, "background: {url}")?,
        None => writeln!(out, "background: none")?,
    }
    for emoji in document.emojis() {
        writeln!(
            out,
            "{}  {}  ({}, {})  size {}",
            emoji.id, emoji.text, emoji.x, emoji.y, emoji.size
        )?;
    }
    Ok(())
}

fn describe(state: &BackgroundState) -> String {
    match state {
        BackgroundState::Ready(image) => format!("Loaded {}x{} image", image.width, image.height),
        BackgroundState::Loading => "Loading".to_string(),
        BackgroundState::Absent => "No background image".to_string(),
    }
}

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lamp::canon;
use lamp::corpus::passage_text;
use lamp::preferences::palette_color;
use lamp::tags::TagCleaner;
use lamp::{Book, BookmarkId, NewNote, Note, NoteFilter, NoteId, Reader};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// lamp - read the King James Bible and keep your own annotations
#[derive(Parser)]
#[command(name = "lamp")]
#[command(about = "A KJV reader with bookmarks, highlights, and notes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// List the 66 books
    Books,
    /// Print a chapter and remember it as the reading position
    Read(ReadCommand),
    /// Read the chapter after the last reading position
    Next,
    /// Read the chapter before the last reading position
    Prev,
    /// Search verse text (case-insensitive, first 100 matches)
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Manage bookmarks
    #[command(subcommand)]
    Bookmark(BookmarkCommand),
    /// Manage verse highlights
    #[command(subcommand)]
    Highlight(HighlightCommand),
    /// Manage notes
    #[command(subcommand)]
    Note(NoteCommand),
    /// Show the last reading position
    Progress,
    /// Show or clear recent searches
    Recent {
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Parser)]
struct ReadCommand {
    /// Book name, abbreviation, or number (e.g. "John", "1John", 43)
    #[arg(value_name = "BOOK")]
    book: String,

    #[arg(value_name = "CHAPTER")]
    chapter: u32,

    /// Comma-separated verse numbers to print as a copyable passage
    #[arg(short, long, value_name = "VERSES")]
    verses: Option<String>,
}

#[derive(Subcommand)]
enum BookmarkCommand {
    /// Bookmark a chapter or verse, e.g. "John 3" or "John 3:16"
    Add {
        #[arg(value_name = "REFERENCE")]
        reference: String,
        #[arg(short, long)]
        title: Option<String>,
    },
    /// List bookmarks, newest first
    List,
    /// Delete a bookmark
    Rm {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(Subcommand)]
enum HighlightCommand {
    /// Highlight a verse with a palette colour name or RRGGBB hex
    Set {
        #[arg(value_name = "REFERENCE")]
        reference: String,
        #[arg(value_name = "COLOR")]
        color: String,
    },
    /// Remove a verse's highlight
    Clear {
        #[arg(value_name = "REFERENCE")]
        reference: String,
    },
    /// List highlights in a chapter
    List {
        #[arg(value_name = "REFERENCE")]
        reference: String,
    },
}

#[derive(Subcommand)]
enum NoteCommand {
    /// Add a note, anchored to a verse with --at or freeform without
    Add(NoteAddCommand),
    /// List notes, most recently updated first
    List {
        #[arg(short, long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        /// Only notes whose title, content, or tags contain this text
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show a note in full
    Show {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Change a note's title, content, tags, or images
    Edit(NoteEditCommand),
    /// Delete a note
    Rm {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Search note titles and content
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },
}

#[derive(Parser)]
struct NoteAddCommand {
    #[arg(short, long)]
    title: String,

    #[arg(short, long)]
    content: String,

    /// Verse reference such as "John 3:16"
    #[arg(long, value_name = "REFERENCE")]
    at: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_name = "TAGS")]
    tags: Option<String>,

    /// Image file to attach; may be repeated
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,
}

#[derive(Parser)]
struct NoteEditCommand {
    #[arg(value_name = "ID")]
    id: i64,

    #[arg(short, long)]
    title: Option<String>,

    #[arg(short, long)]
    content: Option<String>,

    /// Replacement comma-separated tags
    #[arg(long, value_name = "TAGS")]
    tags: Option<String>,

    /// Replacement images; may be repeated
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Verse,
    Freeform,
}

impl From<FilterArg> for NoteFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => NoteFilter::All,
            FilterArg::Verse => NoteFilter::Verse,
            FilterArg::Freeform => NoteFilter::Freeform,
        }
    }
}

/// Invalid input from the command line.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

fn usage(message: impl Into<String>) -> anyhow::Error {
    UsageError(message.into()).into()
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = open_reader().and_then(|mut reader| {
        let stdout = io::stdout();
        run(&cli.command, &mut reader, &mut stdout.lock())
    });

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

/// User errors are bad references, unknown ids, and the like. Everything
/// else (storage, I/O, configuration) is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.is::<UsageError>())
}

fn open_reader() -> Result<Reader> {
    Reader::from_env().context("Failed to start reader")
}

/// Executes one command against an opened reader, writing output to `out`.
///
/// Separated from `main` so commands can be tested with in-memory stores.
fn run(command: &Commands, reader: &mut Reader, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Books => execute_books(reader, out),
        Commands::Read(cmd) => {
            let book = parse_book(&cmd.book)?;
            let verses = cmd.verses.as_deref().map(parse_verse_list).transpose()?;
            execute_read(reader, book.id, cmd.chapter, verses.as_deref(), out)
        }
        Commands::Next => {
            resume_location(reader)?;
            let found = reader.next_chapter().is_some();
            print_navigation(reader, found, "Already at the last chapter", out)
        }
        Commands::Prev => {
            resume_location(reader)?;
            let found = reader.previous_chapter().is_some();
            print_navigation(reader, found, "Already at the first chapter", out)
        }
        Commands::Search { query } => execute_search(reader, query, out),
        Commands::Bookmark(cmd) => execute_bookmark(reader, cmd, out),
        Commands::Highlight(cmd) => execute_highlight(reader, cmd, out),
        Commands::Note(cmd) => execute_note(reader, cmd, out),
        Commands::Progress => execute_progress(reader, out),
        Commands::Recent { clear } => execute_recent(reader, *clear, out),
    }
}

fn execute_books(reader: &Reader, out: &mut impl Write) -> Result<()> {
    for book in reader.books() {
        writeln!(
            out,
            "{:>2}  {:<16} {:<6} {:>3} chapters  {}",
            book.id, book.name, book.abbreviation, book.chapter_count, book.testament
        )?;
    }
    Ok(())
}

fn execute_read(
    reader: &mut Reader,
    book_id: u32,
    chapter: u32,
    verses: Option<&[u32]>,
    out: &mut impl Write,
) -> Result<()> {
    if reader.open_chapter(book_id, chapter).is_none() {
        return Err(chapter_unavailable(reader, book_id, chapter));
    }
    match verses {
        Some(selected) => {
            let passage = reader
                .current_chapter()
                .and_then(|current| passage_text(current, selected))
                .ok_or_else(|| usage("None of the selected verses are in this chapter"))?;
            writeln!(out, "{passage}")?;
            Ok(())
        }
        None => print_current_chapter(reader, out),
    }
}

/// Restores the last reading position as the navigation starting point.
fn resume_location(reader: &mut Reader) -> Result<()> {
    if reader.last_reading_position().is_none() {
        return Err(usage("Nothing read yet; start with `lamp read <book> <chapter>`"));
    }
    reader.resume();
    Ok(())
}

fn print_navigation(reader: &Reader, found: bool, edge: &str, out: &mut impl Write) -> Result<()> {
    if found {
        return print_current_chapter(reader, out);
    }
    match reader.location() {
        Some((book_id, chapter)) if reader.current_chapter().is_none() => {
            Err(chapter_unavailable(reader, book_id, chapter))
        }
        _ => Err(usage(edge)),
    }
}

fn chapter_unavailable(reader: &Reader, book_id: u32, chapter: u32) -> anyhow::Error {
    let valid = reader
        .find_book(book_id)
        .is_some_and(|book| book.has_chapter(chapter));
    if !valid {
        return usage(format!("No such chapter: {}", canon::reference(book_id, chapter, None)));
    }
    match reader.corpus().ensure_loaded() {
        Err(err) => {
            let location = match reader.corpus().source() {
                Some(path) => path.display().to_string(),
                None => "no corpus file configured".to_string(),
            };
            anyhow::Error::new(err).context(format!("Bible text is unavailable ({location})"))
        }
        Ok(()) => anyhow::anyhow!(
            "{} is missing from the Bible text",
            canon::reference(book_id, chapter, None)
        ),
    }
}

fn print_current_chapter(reader: &Reader, out: &mut impl Write) -> Result<()> {
    let Some(chapter) = reader.current_chapter() else {
        return Ok(());
    };
    let overlay = reader.chapter_overlay().context("Failed to load annotations")?;

    writeln!(out, "{} (KJV)", canon::reference(chapter.book_id, chapter.chapter, None))?;
    writeln!(out)?;
    for verse in &chapter.verses {
        let mut line = format!("{:>3}  {}", verse.verse, verse.text);
        if let Some(color) = overlay.highlight(verse.verse) {
            line.push_str(&format!("  [#{color}]"));
        }
        if overlay.has_note(verse.verse) {
            line.push_str("  *");
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn execute_search(reader: &mut Reader, query: &str, out: &mut impl Write) -> Result<()> {
    if query.trim().is_empty() {
        return Err(usage("Search query cannot be empty"));
    }
    let verses = reader.search(query);
    if verses.is_empty() {
        writeln!(out, "No verses found for \"{}\"", query.trim())?;
        return Ok(());
    }
    for verse in &verses {
        writeln!(
            out,
            "{:<20} {}",
            canon::reference(verse.book_id, verse.chapter, Some(verse.verse)),
            verse.text
        )?;
    }
    writeln!(out, "\n{} verse(s)", verses.len())?;
    Ok(())
}

fn execute_bookmark(reader: &Reader, cmd: &BookmarkCommand, out: &mut impl Write) -> Result<()> {
    match cmd {
        BookmarkCommand::Add { reference, title } => {
            let (book, chapter, verse) = parse_reference(reference)?;
            check_chapter(book, chapter)?;
            let title = title
                .clone()
                .unwrap_or_else(|| canon::reference(book.id, chapter, verse));
            let bookmark = reader
                .add_bookmark(book.id, chapter, verse, Some(&title))
                .context("Failed to add bookmark")?;
            writeln!(out, "Bookmark added (id: {})", bookmark.id)?;
        }
        BookmarkCommand::List => {
            let bookmarks = reader.list_bookmarks().context("Failed to list bookmarks")?;
            if bookmarks.is_empty() {
                writeln!(out, "No bookmarks")?;
            }
            for bookmark in bookmarks {
                let location = canon::reference(bookmark.book_id, bookmark.chapter, bookmark.verse);
                let title = bookmark.title.as_deref().unwrap_or(&location);
                writeln!(
                    out,
                    "{:>4}  {:<24} {:<16} {}",
                    bookmark.id,
                    title,
                    location,
                    format_timestamp(bookmark.created_at)
                )?;
            }
        }
        BookmarkCommand::Rm { id } => {
            let id = BookmarkId::new(*id);
            if reader.store().get_bookmark(id)?.is_none() {
                return Err(usage(format!("Bookmark {id} not found")));
            }
            reader.delete_bookmark(id).context("Failed to delete bookmark")?;
            writeln!(out, "Bookmark {id} deleted")?;
        }
    }
    Ok(())
}

fn execute_highlight(reader: &Reader, cmd: &HighlightCommand, out: &mut impl Write) -> Result<()> {
    match cmd {
        HighlightCommand::Set { reference, color } => {
            let (book, chapter, verse) = parse_verse_reference(reference)?;
            let color = parse_color(color)?;
            reader
                .set_highlight(book.id, chapter, verse, &color)
                .context("Failed to set highlight")?;
            writeln!(
                out,
                "Highlighted {} [#{color}]",
                canon::reference(book.id, chapter, Some(verse))
            )?;
        }
        HighlightCommand::Clear { reference } => {
            let (book, chapter, verse) = parse_verse_reference(reference)?;
            let removed = reader
                .clear_highlight(book.id, chapter, verse)
                .context("Failed to clear highlight")?;
            let location = canon::reference(book.id, chapter, Some(verse));
            if removed {
                writeln!(out, "Cleared highlight on {location}")?;
            } else {
                writeln!(out, "{location} was not highlighted")?;
            }
        }
        HighlightCommand::List { reference } => {
            let (book, chapter, verse) = parse_reference(reference)?;
            if verse.is_some() {
                return Err(usage("Highlights are listed per chapter, e.g. \"John 3\""));
            }
            check_chapter(book, chapter)?;
            let highlights = reader
                .list_highlights(book.id, chapter)
                .context("Failed to list highlights")?;
            if highlights.is_empty() {
                writeln!(out, "No highlights in {}", canon::reference(book.id, chapter, None))?;
            }
            for (verse, color) in highlights {
                writeln!(out, "{:<20} #{color}", canon::reference(book.id, chapter, Some(verse)))?;
            }
        }
    }
    Ok(())
}

fn execute_note(reader: &Reader, cmd: &NoteCommand, out: &mut impl Write) -> Result<()> {
    match cmd {
        NoteCommand::Add(add) => {
            let images = read_images(&add.images)?;
            let tags = add.tags.as_deref().map(parse_tags).unwrap_or_default();
            let new = match &add.at {
                Some(reference) => {
                    let (book, chapter, verse) = parse_verse_reference(reference)?;
                    NewNote::at_verse(book.id, chapter, verse, &add.title, &add.content)
                }
                None => NewNote::freeform(&add.title, &add.content),
            };
            let note = reader
                .add_note(new.tags(tags).images(images))
                .context("Failed to add note")?;
            writeln!(out, "Note created (id: {})", note.id)?;
        }
        NoteCommand::List { filter, query } => {
            let notes = reader
                .filter_notes((*filter).into(), query.as_deref())
                .context("Failed to list notes")?;
            print_note_list(&notes, out)?;
        }
        NoteCommand::Show { id } => {
            let note = require_note(reader, NoteId::new(*id))?;
            print_note(&note, out)?;
        }
        NoteCommand::Edit(edit) => {
            let id = NoteId::new(edit.id);
            let existing = require_note(reader, id)?;
            // Read replacement images before writing anything, so a bad path
            // leaves the note untouched.
            let images = if edit.images.is_empty() {
                None
            } else {
                Some(read_images(&edit.images)?)
            };
            let title = edit.title.as_deref().unwrap_or(&existing.title);
            let content = edit.content.as_deref().unwrap_or(&existing.content);
            let tags = match &edit.tags {
                Some(tags) => parse_tags(tags),
                None => existing.tags.clone(),
            };
            reader
                .update_note(id, title, content, &tags)
                .context("Failed to update note")?;
            if let Some(images) = images {
                reader
                    .set_note_images(id, &images)
                    .context("Failed to replace note images")?;
            }
            writeln!(out, "Note {id} updated")?;
        }
        NoteCommand::Rm { id } => {
            let id = NoteId::new(*id);
            require_note(reader, id)?;
            reader.delete_note(id).context("Failed to delete note")?;
            writeln!(out, "Note {id} deleted")?;
        }
        NoteCommand::Search { query } => {
            if query.trim().is_empty() {
                return Err(usage("Search query cannot be empty"));
            }
            let notes = reader.search_notes(query).context("Failed to search notes")?;
            print_note_list(&notes, out)?;
        }
    }
    Ok(())
}

fn require_note(reader: &Reader, id: NoteId) -> Result<Note> {
    reader
        .get_note(id)
        .context("Failed to load note")?
        .ok_or_else(|| usage(format!("Note {id} not found")))
}

fn note_location(note: &Note) -> String {
    match note.anchor() {
        Some((book_id, chapter, verse)) => canon::reference(book_id, chapter, Some(verse)),
        None => "freeform".to_string(),
    }
}

fn print_note_list(notes: &[Note], out: &mut impl Write) -> Result<()> {
    if notes.is_empty() {
        writeln!(out, "No notes found")?;
    }
    for note in notes {
        let mut line = format!("{:>4}  {:<24} {:<16}", note.id, note.title, note_location(note));
        if !note.tags.is_empty() {
            line.push_str(&format!(" [{}]", note.tags.join(", ")));
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

fn print_note(note: &Note, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", note.title)?;
    writeln!(out, "{}", note_location(note))?;
    writeln!(
        out,
        "created {}, updated {}",
        format_timestamp(note.created_at),
        format_timestamp(note.updated_at)
    )?;
    if !note.tags.is_empty() {
        writeln!(out, "tags: {}", note.tags.join(", "))?;
    }
    if !note.images.is_empty() {
        writeln!(out, "images: {}", note.images.len())?;
    }
    writeln!(out)?;
    writeln!(out, "{}", note.content)?;
    Ok(())
}

fn execute_progress(reader: &mut Reader, out: &mut impl Write) -> Result<()> {
    match reader
        .load_last_reading_progress()
        .context("Failed to load reading position")?
    {
        Some(progress) => writeln!(
            out,
            "{} (last read {})",
            canon::reference(progress.book_id, progress.chapter, Some(progress.verse)),
            format_timestamp(progress.last_read_at)
        )?,
        None => writeln!(out, "Nothing read yet")?,
    }
    Ok(())
}

fn execute_recent(reader: &mut Reader, clear: bool, out: &mut impl Write) -> Result<()> {
    if clear {
        reader
            .clear_recent_searches()
            .context("Failed to save preferences")?;
        writeln!(out, "Recent searches cleared")?;
        return Ok(());
    }
    let recent = reader.preferences().recent_searches();
    if recent.is_empty() {
        writeln!(out, "No recent searches")?;
    }
    for query in recent {
        writeln!(out, "{query}")?;
    }
    Ok(())
}

/// Resolves a book from its number, name, or abbreviation.
fn parse_book(input: &str) -> Result<&'static Book> {
    let found = match input.trim().parse::<u32>() {
        Ok(id) => canon::find_book(id),
        Err(_) => canon::find_book_by_name(input),
    };
    found.ok_or_else(|| usage(format!("Unknown book: {}", input.trim())))
}

/// Parses `"<book> <chapter>"` or `"<book> <chapter>:<verse>"`.
///
/// The book part may contain spaces ("Song of Solomon 2:1", "1 John 4:8").
fn parse_reference(input: &str) -> Result<(&'static Book, u32, Option<u32>)> {
    let input = input.trim();
    let invalid = || usage(format!("Invalid reference: \"{input}\" (expected e.g. \"John 3:16\")"));

    let (book, location) = input.rsplit_once(char::is_whitespace).ok_or_else(invalid)?;
    let book = parse_book(book)?;
    let (chapter, verse) = match location.split_once(':') {
        Some((chapter, verse)) => (chapter, Some(verse)),
        None => (location, None),
    };
    let chapter = chapter.parse::<u32>().map_err(|_| invalid())?;
    let verse = verse
        .map(|verse| verse.parse::<u32>().map_err(|_| invalid()))
        .transpose()?;
    if chapter == 0 || verse == Some(0) {
        return Err(invalid());
    }
    Ok((book, chapter, verse))
}

/// Parses a reference that must name a verse.
fn parse_verse_reference(input: &str) -> Result<(&'static Book, u32, u32)> {
    let (book, chapter, verse) = parse_reference(input)?;
    check_chapter(book, chapter)?;
    let verse = verse.ok_or_else(|| usage(format!("\"{}\" does not name a verse", input.trim())))?;
    Ok((book, chapter, verse))
}

fn check_chapter(book: &Book, chapter: u32) -> Result<()> {
    if book.has_chapter(chapter) {
        Ok(())
    } else {
        Err(usage(format!(
            "{} has {} chapters",
            book.name, book.chapter_count
        )))
    }
}

/// Parses comma-separated verse numbers such as `"16,17"`.
fn parse_verse_list(input: &str) -> Result<Vec<u32>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| usage(format!("Invalid verse number: {s}")))
        })
        .collect()
}

/// Accepts a palette colour name or a six-digit hex code, with or without `#`.
fn parse_color(input: &str) -> Result<String> {
    if let Some(color) = palette_color(input) {
        return Ok(color.hex.to_string());
    }
    let hex = input.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(hex.to_ascii_uppercase())
    } else {
        Err(usage(format!("Unknown highlight colour: {}", input.trim())))
    }
}

/// Parses comma-separated tags from a string.
///
/// Each tag is trimmed with inner whitespace collapsed; blanks and
/// case-insensitive repeats are dropped.
fn parse_tags(input: &str) -> Vec<String> {
    TagCleaner::clean_tags(input.split(','))
}

fn read_images(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
    paths
        .iter()
        .map(|path| {
            std::fs::read(path)
                .with_context(|| format!("Failed to read image: {}", path.display()))
        })
        .collect()
}

fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    at.format(format).unwrap_or_else(|_| at.to_string())
}

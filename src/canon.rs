//! Canonical index of the 66 books of the KJV canon.
//!
//! The table is static and sorted by id; lookups never touch the corpus.

use crate::models::{Book, Testament};

use Testament::{New, Old};

const fn book(
    id: u32,
    name: &'static str,
    abbreviation: &'static str,
    chapter_count: u32,
    testament: Testament,
) -> Book {
    Book {
        id,
        name,
        abbreviation,
        chapter_count,
        testament,
    }
}

/// All books in canonical order.
pub static BOOKS: [Book; 66] = [
    book(1, "Genesis", "Gen", 50, Old),
    book(2, "Exodus", "Exod", 40, Old),
    book(3, "Leviticus", "Lev", 27, Old),
    book(4, "Numbers", "Num", 36, Old),
    book(5, "Deuteronomy", "Deut", 34, Old),
    book(6, "Joshua", "Josh", 24, Old),
    book(7, "Judges", "Judg", 21, Old),
    book(8, "Ruth", "Ruth", 4, Old),
    book(9, "1 Samuel", "1Sam", 31, Old),
    book(10, "2 Samuel", "2Sam", 24, Old),
    book(11, "1 Kings", "1Kgs", 22, Old),
    book(12, "2 Kings", "2Kgs", 25, Old),
    book(13, "1 Chronicles", "1Chr", 29, Old),
    book(14, "2 Chronicles", "2Chr", 36, Old),
    book(15, "Ezra", "Ezra", 10, Old),
    book(16, "Nehemiah", "Neh", 13, Old),
    book(17, "Esther", "Esth", 10, Old),
    book(18, "Job", "Job", 42, Old),
    book(19, "Psalms", "Ps", 150, Old),
    book(20, "Proverbs", "Prov", 31, Old),
    book(21, "Ecclesiastes", "Eccl", 12, Old),
    book(22, "Song of Solomon", "Song", 8, Old),
    book(23, "Isaiah", "Isa", 66, Old),
    book(24, "Jeremiah", "Jer", 52, Old),
    book(25, "Lamentations", "Lam", 5, Old),
    book(26, "Ezekiel", "Ezek", 48, Old),
    book(27, "Daniel", "Dan", 12, Old),
    book(28, "Hosea", "Hos", 14, Old),
    book(29, "Joel", "Joel", 3, Old),
    book(30, "Amos", "Amos", 9, Old),
    book(31, "Obadiah", "Obad", 1, Old),
    book(32, "Jonah", "Jonah", 4, Old),
    book(33, "Micah", "Mic", 7, Old),
    book(34, "Nahum", "Nah", 3, Old),
    book(35, "Habakkuk", "Hab", 3, Old),
    book(36, "Zephaniah", "Zeph", 3, Old),
    book(37, "Haggai", "Hag", 2, Old),
    book(38, "Zechariah", "Zech", 14, Old),
    book(39, "Malachi", "Mal", 4, Old),
    book(40, "Matthew", "Matt", 28, New),
    book(41, "Mark", "Mark", 16, New),
    book(42, "Luke", "Luke", 24, New),
    book(43, "John", "John", 21, New),
    book(44, "Acts", "Acts", 28, New),
    book(45, "Romans", "Rom", 16, New),
    book(46, "1 Corinthians", "1Cor", 16, New),
    book(47, "2 Corinthians", "2Cor", 13, New),
    book(48, "Galatians", "Gal", 6, New),
    book(49, "Ephesians", "Eph", 6, New),
    book(50, "Philippians", "Phil", 4, New),
    book(51, "Colossians", "Col", 4, New),
    book(52, "1 Thessalonians", "1Thess", 5, New),
    book(53, "2 Thessalonians", "2Thess", 3, New),
    book(54, "1 Timothy", "1Tim", 6, New),
    book(55, "2 Timothy", "2Tim", 4, New),
    book(56, "Titus", "Titus", 3, New),
    book(57, "Philemon", "Phlm", 1, New),
    book(58, "Hebrews", "Heb", 13, New),
    book(59, "James", "Jas", 5, New),
    book(60, "1 Peter", "1Pet", 5, New),
    book(61, "2 Peter", "2Pet", 3, New),
    book(62, "1 John", "1John", 5, New),
    book(63, "2 John", "2John", 1, New),
    book(64, "3 John", "3John", 1, New),
    book(65, "Jude", "Jude", 1, New),
    book(66, "Revelation", "Rev", 22, New),
];

/// Returns every book, sorted by id.
pub fn list_books() -> &'static [Book] {
    &BOOKS
}

/// Looks up a book by its canonical id (1..=66).
pub fn find_book(id: u32) -> Option<&'static Book> {
    id.checked_sub(1)
        .and_then(|index| BOOKS.get(index as usize))
}

/// Looks up a book by full name or abbreviation, ignoring case and
/// surrounding whitespace.
///
/// # Examples
///
/// ```
/// use lamp::canon::find_book_by_name;
///
/// assert_eq!(find_book_by_name("genesis").map(|b| b.id), Some(1));
/// assert_eq!(find_book_by_name("1John").map(|b| b.id), Some(62));
/// assert_eq!(find_book_by_name("song of solomon").map(|b| b.id), Some(22));
/// assert!(find_book_by_name("Maccabees").is_none());
/// ```
pub fn find_book_by_name(name: &str) -> Option<&'static Book> {
    let wanted = name.trim();
    BOOKS.iter().find(|book| {
        book.name.eq_ignore_ascii_case(wanted) || book.abbreviation.eq_ignore_ascii_case(wanted)
    })
}

/// Formats a scripture reference such as `John 3` or `John 3:16`.
///
/// Unknown book ids fall back to `Book {id}` so a stale record still renders.
pub fn reference(book_id: u32, chapter: u32, verse: Option<u32>) -> String {
    let name = match find_book(book_id) {
        Some(book) => book.name.to_string(),
        None => format!("Book {book_id}"),
    };
    match verse {
        Some(verse) => format!("{name} {chapter}:{verse}"),
        None => format!("{name} {chapter}"),
    }
}

/// Returns the chapter after `(book_id, chapter)`, moving into the next book
/// when the current one is finished. `None` past Revelation 22.
pub fn next_chapter(book_id: u32, chapter: u32) -> Option<(u32, u32)> {
    let book = find_book(book_id)?;
    if chapter < book.chapter_count {
        Some((book_id, chapter + 1))
    } else {
        find_book(book_id + 1).map(|next| (next.id, 1))
    }
}

/// Returns the chapter before `(book_id, chapter)`, moving to the last
/// chapter of the previous book when needed. `None` before Genesis 1.
pub fn previous_chapter(book_id: u32, chapter: u32) -> Option<(u32, u32)> {
    let book = find_book(book_id)?;
    if chapter > 1 {
        Some((book_id, (chapter - 1).min(book.chapter_count)))
    } else {
        let previous = find_book(book_id.checked_sub(1)?)?;
        Some((previous.id, previous.chapter_count))
    }
}

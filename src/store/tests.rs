use super::*;

fn store() -> AnnotationStore {
    AnnotationStore::in_memory().expect("failed to create in-memory store")
}

fn count(store: &AnnotationStore, table: &str) -> i64 {
    store
        .database()
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("failed to count rows")
}

// --- Bookmarks ---

#[test]
fn add_bookmark_returns_persisted_record() {
    let store = store();

    let bookmark = store
        .add_bookmark(43, 3, Some(16), Some("John 3:16"))
        .expect("failed to add bookmark");

    assert!(bookmark.id.get() > 0);
    let loaded = store
        .get_bookmark(bookmark.id)
        .expect("get_bookmark failed")
        .expect("bookmark should exist");
    assert_eq!(loaded, bookmark);
}

#[test]
fn add_bookmark_never_deduplicates() {
    let store = store();

    store.add_bookmark(1, 1, None, None).unwrap();
    store.add_bookmark(1, 1, None, None).unwrap();

    assert_eq!(store.list_bookmarks().unwrap().len(), 2);
}

#[test]
fn chapter_bookmark_has_no_verse_or_title() {
    let store = store();

    let bookmark = store.add_bookmark(19, 23, None, None).unwrap();
    let loaded = store.get_bookmark(bookmark.id).unwrap().unwrap();

    assert_eq!(loaded.verse, None);
    assert_eq!(loaded.title, None);
}

#[test]
fn list_bookmarks_is_most_recent_first() {
    let store = store();

    let first = store.add_bookmark(1, 1, Some(1), None).unwrap();
    let second = store.add_bookmark(2, 1, Some(1), None).unwrap();
    let third = store.add_bookmark(3, 1, Some(1), None).unwrap();

    let ids: Vec<BookmarkId> = store.list_bookmarks().unwrap().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[test]
fn delete_bookmark_is_idempotent() {
    let store = store();
    let bookmark = store.add_bookmark(1, 1, None, None).unwrap();

    store.delete_bookmark(bookmark.id).unwrap();
    store.delete_bookmark(bookmark.id).unwrap();

    assert_eq!(store.get_bookmark(bookmark.id).unwrap(), None);
    assert!(store.list_bookmarks().unwrap().is_empty());
}

// --- Highlights ---

#[test]
fn set_highlight_replaces_existing_colour() {
    let store = store();

    let red = store.set_highlight(1, 1, 1, "red").unwrap();
    let blue = store.set_highlight(1, 1, 1, "blue").unwrap();

    assert_ne!(red.id, blue.id, "replacement is a new record");
    assert_eq!(count(&store, "highlights"), 1);

    let current = store.get_highlight(1, 1, 1).unwrap().expect("highlight exists");
    assert_eq!(current.color_tag, "blue");
    assert_eq!(current.id, blue.id);
}

#[test]
fn highlights_on_different_verses_are_independent() {
    let store = store();

    store.set_highlight(1, 1, 1, "FFCDD2").unwrap();
    store.set_highlight(1, 1, 2, "FFE0B2").unwrap();
    store.set_highlight(1, 2, 1, "FFF9C4").unwrap();

    let chapter_one = store.list_highlights(1, 1).unwrap();
    assert_eq!(chapter_one.len(), 2);
    assert_eq!(chapter_one.get(&1).map(String::as_str), Some("FFCDD2"));
    assert_eq!(chapter_one.get(&2).map(String::as_str), Some("FFE0B2"));

    let chapter_two = store.list_highlights(1, 2).unwrap();
    assert_eq!(chapter_two.len(), 1);
}

#[test]
fn clear_highlight_removes_only_that_verse() {
    let store = store();
    store.set_highlight(1, 1, 1, "red").unwrap();
    store.set_highlight(1, 1, 2, "red").unwrap();

    assert!(store.clear_highlight(1, 1, 1).unwrap());

    let remaining = store.list_highlights(1, 1).unwrap();
    assert_eq!(remaining.keys().copied().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn clear_highlight_without_highlight_is_noop() {
    let store = store();

    assert!(!store.clear_highlight(5, 5, 5).unwrap());
    assert_eq!(store.get_highlight(5, 5, 5).unwrap(), None);
}

#[test]
fn list_highlights_for_unmarked_chapter_is_empty() {
    let store = store();
    assert!(store.list_highlights(66, 22).unwrap().is_empty());
}

// --- Notes ---

#[test]
fn note_roundtrip_preserves_fields() {
    let store = store();
    let images = vec![vec![0xff, 0xd8, 0xff], vec![], vec![0x89, 0x50, 0x4e, 0x47]];

    let created = store
        .add_note(
            NewNote::at_verse(43, 3, 16, "John 3:16", "God so loved the world")
                .tags(["Gratitude", "Insight"])
                .images(images.clone()),
        )
        .unwrap();

    let by_id = store.get_note(created.id).unwrap().expect("note exists");
    assert_eq!(by_id, created);
    assert_eq!(by_id.title, "John 3:16");
    assert_eq!(by_id.content, "God so loved the world");
    assert_eq!(by_id.tags, vec!["Gratitude", "Insight"]);
    assert_eq!(by_id.images, images);
    assert_eq!(by_id.anchor(), Some((43, 3, 16)));

    let by_location = store.list_notes_at(43, 3, 16).unwrap();
    assert_eq!(by_location, vec![created]);
}

#[test]
fn note_tags_reload_as_saved() {
    let store = store();
    let saved = ["Faith", "faith", "quiet  time", " Prayer "];

    let note = store
        .add_note(NewNote::freeform("t", "c").tags(saved))
        .unwrap();
    let reloaded = store.get_note(note.id).unwrap().expect("note exists");

    let saved_set: BTreeSet<&str> = saved.into_iter().collect();
    let reloaded_set: BTreeSet<&str> = reloaded.tags.iter().map(String::as_str).collect();
    assert_eq!(reloaded_set, saved_set);
    assert_eq!(reloaded.tags, vec!["Faith", "faith", "quiet  time", " Prayer "]);
}

#[test]
fn exact_duplicate_tags_are_stored_once() {
    let store = store();

    let note = store
        .add_note(NewNote::freeform("t", "c").tags(["Praise", "Prayer", "Praise"]))
        .unwrap();

    assert_eq!(note.tags, vec!["Praise", "Prayer"]);
    let updated = store
        .update_note(note.id, "t", "c", &["Grace", "grace", "Grace"])
        .unwrap()
        .unwrap();
    assert_eq!(updated.tags, vec!["Grace", "grace"]);
    assert_eq!(count(&store, "note_tags"), 2);
}

#[test]
fn freeform_note_drops_location() {
    let store = store();
    let mut new = NewNote::freeform("Journal", "Today");
    new.book_id = Some(1);
    new.chapter = Some(1);
    new.verse = Some(1);

    let note = store.add_note(new).unwrap();

    assert!(note.is_freeform);
    assert_eq!(note.anchor(), None);
    assert!(store.list_notes_at(1, 1, 1).unwrap().is_empty());
}

#[test]
fn get_note_returns_none_for_missing_id() {
    let store = store();
    assert_eq!(store.get_note(NoteId::new(999)).unwrap(), None);
}

#[test]
fn update_note_changes_text_and_refreshes_updated_at() {
    let store = store();
    let note = store
        .add_note(NewNote::at_verse(1, 1, 1, "Old", "old").tags(["A"]))
        .unwrap();

    let updated = store
        .update_note(note.id, "New", "new", &["B", "C"])
        .unwrap()
        .expect("note exists");

    assert_eq!(updated.title, "New");
    assert_eq!(updated.content, "new");
    assert_eq!(updated.tags, vec!["B", "C"]);
    assert_eq!(updated.created_at, note.created_at);
    assert!(updated.updated_at > note.updated_at);
    assert_eq!(updated.anchor(), note.anchor());
}

#[test]
fn update_note_keeps_images() {
    let store = store();
    let note = store
        .add_note(NewNote::freeform("t", "c").images(vec![vec![1, 2, 3]]))
        .unwrap();

    let updated = store
        .update_note(note.id, "t2", "c2", &[] as &[&str])
        .unwrap()
        .unwrap();

    assert_eq!(updated.images, vec![vec![1, 2, 3]]);
    assert!(updated.tags.is_empty());
}

#[test]
fn update_missing_note_returns_none() {
    let store = store();
    let result = store.update_note(NoteId::new(42), "t", "c", &["x"]).unwrap();
    assert_eq!(result, None);
    assert_eq!(count(&store, "note_tags"), 0);
}

#[test]
fn set_note_images_replaces_sequence() {
    let store = store();
    let note = store
        .add_note(NewNote::freeform("t", "c").images(vec![vec![1], vec![2]]))
        .unwrap();

    let updated = store
        .set_note_images(note.id, &[vec![3], vec![4], vec![5]])
        .unwrap()
        .unwrap();

    assert_eq!(updated.images, vec![vec![3], vec![4], vec![5]]);
    assert!(updated.updated_at > note.updated_at);
    assert_eq!(count(&store, "note_images"), 3);
    assert_eq!(store.set_note_images(NoteId::new(77), &[]).unwrap(), None);
}

#[test]
fn delete_note_removes_it_and_its_children() {
    let store = store();
    let keep = store.add_note(NewNote::freeform("keep", "")).unwrap();
    let gone = store
        .add_note(NewNote::freeform("gone", "").tags(["x"]).images(vec![vec![0]]))
        .unwrap();

    store.delete_note(gone.id).unwrap();
    store.delete_note(gone.id).unwrap();

    let ids: Vec<NoteId> = store.list_notes().unwrap().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![keep.id]);
    assert_eq!(count(&store, "note_tags"), 0);
    assert_eq!(count(&store, "note_images"), 0);
}

#[test]
fn deleted_note_id_is_never_reused() {
    let store = store();
    let first = store.add_note(NewNote::freeform("first", "")).unwrap();
    store.delete_note(first.id).unwrap();

    let second = store.add_note(NewNote::freeform("second", "")).unwrap();
    assert_ne!(second.id, first.id);

    // A stale id no longer reaches any note.
    assert_eq!(store.update_note(first.id, "overwritten", "", &[] as &[&str]).unwrap(), None);
    assert_eq!(store.get_note(second.id).unwrap().unwrap().title, "second");
}

#[test]
fn deleted_bookmark_id_is_never_reused() {
    let store = store();
    let first = store.add_bookmark(1, 1, None, None).unwrap();
    store.delete_bookmark(first.id).unwrap();

    let second = store.add_bookmark(1, 1, None, None).unwrap();
    assert!(second.id > first.id);
}

#[test]
fn list_notes_is_ordered_by_updated_at_descending() {
    let store = store();
    let a = store.add_note(NewNote::freeform("a", "")).unwrap();
    let b = store.add_note(NewNote::freeform("b", "")).unwrap();
    let c = store.add_note(NewNote::freeform("c", "")).unwrap();

    // Editing the oldest note moves it to the front.
    store.update_note(a.id, "a2", "", &[] as &[&str]).unwrap();

    let notes = store.list_notes().unwrap();
    let ids: Vec<NoteId> = notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![a.id, c.id, b.id]);
    assert!(notes.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));
}

#[test]
fn list_notes_at_is_exact_match() {
    let store = store();
    store.add_note(NewNote::at_verse(1, 1, 1, "here", "")).unwrap();
    store.add_note(NewNote::at_verse(1, 1, 2, "next verse", "")).unwrap();
    store.add_note(NewNote::at_verse(1, 2, 1, "next chapter", "")).unwrap();
    store.add_note(NewNote::freeform("journal", "")).unwrap();

    let notes = store.list_notes_at(1, 1, 1).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "here");
}

#[test]
fn search_notes_matches_title_or_content_ignoring_case() {
    let store = store();
    store.add_note(NewNote::freeform("Morning PRAYER", "")).unwrap();
    store.add_note(NewNote::freeform("Evening", "a prayer for rest")).unwrap();
    store
        .add_note(NewNote::freeform("Unrelated", "nothing").tags(["prayer"]))
        .unwrap();

    let titles: Vec<String> = store
        .search_notes("Prayer")
        .unwrap()
        .into_iter()
        .map(|n| n.title)
        .collect();

    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"Morning PRAYER".to_string()));
    assert!(titles.contains(&"Evening".to_string()));
}

#[test]
fn search_notes_blank_query_matches_nothing() {
    let store = store();
    store.add_note(NewNote::freeform("a", "b")).unwrap();
    assert!(store.search_notes("  ").unwrap().is_empty());
}

#[test]
fn filter_notes_by_kind_and_tag() {
    let store = store();
    store
        .add_note(NewNote::at_verse(1, 1, 1, "Creation", "").tags(["Praise"]))
        .unwrap();
    store.add_note(NewNote::freeform("Journal", "").tags(["Question"])).unwrap();
    store.add_note(NewNote::freeform("Praise report", "")).unwrap();

    assert_eq!(store.filter_notes(NoteFilter::All, None).unwrap().len(), 3);
    assert_eq!(store.filter_notes(NoteFilter::Verse, None).unwrap().len(), 1);
    assert_eq!(store.filter_notes(NoteFilter::Freeform, None).unwrap().len(), 2);

    let praise = store.filter_notes(NoteFilter::All, Some("praise")).unwrap();
    assert_eq!(praise.len(), 2, "tag and title both match");

    let freeform_question = store
        .filter_notes(NoteFilter::Freeform, Some("QUEST"))
        .unwrap();
    assert_eq!(freeform_question.len(), 1);
    assert_eq!(freeform_question[0].title, "Journal");

    assert_eq!(store.filter_notes(NoteFilter::All, Some(" ")).unwrap().len(), 3);
}

#[test]
fn noted_verses_lists_distinct_verses_in_chapter() {
    let store = store();
    store.add_note(NewNote::at_verse(19, 23, 1, "a", "")).unwrap();
    store.add_note(NewNote::at_verse(19, 23, 1, "b", "")).unwrap();
    store.add_note(NewNote::at_verse(19, 23, 4, "c", "")).unwrap();
    store.add_note(NewNote::at_verse(19, 24, 1, "d", "")).unwrap();

    let verses = store.noted_verses(19, 23).unwrap();
    assert_eq!(verses.into_iter().collect::<Vec<_>>(), vec![1, 4]);
}

// --- Reading progress ---

#[test]
fn load_progress_on_empty_store_is_none() {
    let store = store();
    assert_eq!(store.load_last_reading_progress().unwrap(), None);
}

#[test]
fn save_progress_upserts_single_row() {
    let store = store();

    let first = store.save_reading_progress(1, 1, 1).unwrap();
    let second = store.save_reading_progress(19, 23, 4).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(count(&store, "reading_progress"), 1);

    let loaded = store.load_last_reading_progress().unwrap().unwrap();
    assert!(loaded.is_at(19, 23, 4));
    assert_eq!(loaded, second);
}

#[test]
fn save_progress_is_idempotent_for_repeated_position() {
    let store = store();

    store.save_reading_progress(40, 5, 3).unwrap();
    let again = store.save_reading_progress(40, 5, 3).unwrap();

    assert_eq!(count(&store, "reading_progress"), 1);
    assert!(again.is_at(40, 5, 3));
}

#[test]
fn save_progress_updates_most_recent_of_legacy_rows() {
    let store = store();
    let conn = store.database().connection();
    conn.execute(
        "INSERT INTO reading_progress (id, book_id, chapter, verse, last_read_at) VALUES (1, 1, 1, 1, 1000)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO reading_progress (id, book_id, chapter, verse, last_read_at) VALUES (2, 2, 2, 2, 2000)",
        [],
    )
    .unwrap();

    let saved = store.save_reading_progress(3, 3, 3).unwrap();

    assert_eq!(saved.id, ProgressId::new(2));
    assert_eq!(count(&store, "reading_progress"), 2);
    assert!(store.load_last_reading_progress().unwrap().unwrap().is_at(3, 3, 3));
}

#[test]
fn corrupt_timestamp_surfaces_as_error() {
    let store = store();
    store
        .database()
        .connection()
        .execute(
            "INSERT INTO bookmarks (book_id, chapter, created_at) VALUES (1, 1, ?1)",
            [i64::MAX],
        )
        .unwrap();

    assert!(store.list_bookmarks().is_err());
}

#[test]
fn store_reopens_with_persisted_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.db");

    {
        let store = AnnotationStore::open(&path).unwrap();
        store.add_bookmark(1, 1, None, None).unwrap();
        store.set_highlight(1, 1, 1, "red").unwrap();
        store.add_note(NewNote::freeform("kept", "")).unwrap();
        store.save_reading_progress(2, 3, 4).unwrap();
    }

    let store = AnnotationStore::open(&path).unwrap();
    assert_eq!(store.list_bookmarks().unwrap().len(), 1);
    assert_eq!(store.list_highlights(1, 1).unwrap().len(), 1);
    assert_eq!(store.list_notes().unwrap()[0].title, "kept");
    assert!(store.load_last_reading_progress().unwrap().unwrap().is_at(2, 3, 4));
}

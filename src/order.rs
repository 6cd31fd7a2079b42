//! Post-decode ordering and linking.
//!
//! Runs strictly after a book's decode fan-out has joined. Chapters are
//! sorted by a total composite key:
//!
//! 1. `order`, ascending
//! 2. `published`, ascending, chapters without a date first
//! 3. `title`, lexicographic
//! 4. `id`, lexicographic (unique within a book, so no two chapters tie)
//!
//! `previous`/`next` are then plain neighbour indices in the sorted vector.

use crate::types::{Book, Chapter};
use std::cmp::Ordering;

/// The composite chapter ordering.
pub fn compare_chapters(a: &Chapter, b: &Chapter) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.published.cmp(&b.published))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort chapters and assign `previous`/`next` indices.
pub fn sort_and_link(chapters: &mut [Chapter]) {
    chapters.sort_by(compare_chapters);
    let last = chapters.len().saturating_sub(1);
    for (i, chapter) in chapters.iter_mut().enumerate() {
        chapter.previous = i.checked_sub(1);
        chapter.next = (i < last).then_some(i + 1);
    }
}

/// Fill the book's publication range from its chapters.
///
/// Explicit values are kept. A missing start takes the earliest chapter
/// date and a missing end the latest. For completed or inactive books a
/// range still open at one end collapses onto the other.
pub fn derive_book_dates(book: &mut Book) {
    let dates = || book.chapters.iter().filter_map(|c| c.published);
    let earliest = dates().min();
    let latest = dates().max();

    if book.published.is_none() {
        book.published = earliest;
    }
    if book.published_end.is_none() {
        book.published_end = latest;
    }

    if book.parsed_status().is_some_and(|s| s.is_finished()) {
        match (book.published, book.published_end) {
            (Some(start), None) => book.published_end = Some(start),
            (None, Some(end)) => book.published = Some(end),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::test_helpers::*;
    use pretty_assertions::assert_eq;

    fn chapter(id: &str, order: i64, published: Option<&str>) -> Chapter {
        let mut c = blank_chapter(id);
        c.order = order;
        c.published = published.map(|d| parse_date(d).unwrap());
        c
    }

    fn ids(chapters: &[Chapter]) -> Vec<&str> {
        chapters.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn order_dominates_title() {
        let mut chapters = vec![
            chapter("aardvark", 2, None),
            chapter("zebra", 1, None),
            chapter("mole", 3, None),
        ];
        sort_and_link(&mut chapters);
        assert_eq!(ids(&chapters), vec!["zebra", "aardvark", "mole"]);
    }

    #[test]
    fn date_breaks_order_ties_with_undated_first() {
        let mut chapters = vec![
            chapter("late", 0, Some("2024-05-01")),
            chapter("undated", 0, None),
            chapter("early", 0, Some("2024-01-01")),
        ];
        sort_and_link(&mut chapters);
        assert_eq!(ids(&chapters), vec!["undated", "early", "late"]);
    }

    #[test]
    fn title_then_id_break_remaining_ties() {
        let mut b = chapter("b", 0, None);
        b.title = "Same".into();
        let mut a = chapter("a", 0, None);
        a.title = "Same".into();
        let mut first = chapter("z", 0, None);
        first.title = "Alpha".into();
        let mut chapters = vec![b, a, first];
        sort_and_link(&mut chapters);
        assert_eq!(ids(&chapters), vec!["z", "a", "b"]);
    }

    #[test]
    fn ordering_is_total() {
        let a = chapter("a", 1, Some("2024-01-01"));
        let b = chapter("b", 1, Some("2024-01-01"));
        assert_ne!(compare_chapters(&a, &b), Ordering::Equal);
        assert_eq!(compare_chapters(&a, &a), Ordering::Equal);
    }

    #[test]
    fn links_form_a_doubly_linked_list() {
        let mut chapters: Vec<Chapter> =
            (0..5).map(|i| chapter(&format!("c{i}"), 4 - i, None)).collect();
        sort_and_link(&mut chapters);

        assert_eq!(chapters[0].previous, None);
        assert_eq!(chapters[4].next, None);
        for i in 1..chapters.len() {
            assert_eq!(chapters[i].previous, Some(i - 1));
            assert_eq!(chapters[i - 1].next, Some(i));
        }
    }

    #[test]
    fn single_and_empty_books_link_cleanly() {
        let mut one = vec![chapter("only", 0, None)];
        sort_and_link(&mut one);
        assert_eq!((one[0].previous, one[0].next), (None, None));

        let mut none: Vec<Chapter> = Vec::new();
        sort_and_link(&mut none);
    }

    // =========================================================================
    // Book dates
    // =========================================================================

    fn rfc(d: Option<chrono::DateTime<chrono::FixedOffset>>) -> Option<String> {
        d.map(|d| d.date_naive().to_string())
    }

    #[test]
    fn range_derives_from_chapters() {
        let mut book = blank_book();
        book.chapters = vec![
            chapter("a", 0, Some("2024-03-01")),
            chapter("b", 0, None),
            chapter("c", 0, Some("2024-01-15")),
        ];
        derive_book_dates(&mut book);
        assert_eq!(rfc(book.published).as_deref(), Some("2024-01-15"));
        assert_eq!(rfc(book.published_end).as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn explicit_dates_win() {
        let mut book = blank_book();
        book.published = Some(parse_date("2020").unwrap());
        book.chapters = vec![chapter("a", 0, Some("2024-03-01"))];
        derive_book_dates(&mut book);
        assert_eq!(rfc(book.published).as_deref(), Some("2020-01-01"));
        assert_eq!(rfc(book.published_end).as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn finished_book_collapses_open_range() {
        let mut book = blank_book();
        book.status = Some("Completed".into());
        book.published = Some(parse_date("2022-06").unwrap());
        derive_book_dates(&mut book);
        assert_eq!(rfc(book.published_end).as_deref(), Some("2022-06-01"));

        let mut book = blank_book();
        book.status = Some("inactive".into());
        book.published_end = Some(parse_date("2021").unwrap());
        derive_book_dates(&mut book);
        assert_eq!(rfc(book.published).as_deref(), Some("2021-01-01"));
    }

    #[test]
    fn ongoing_book_keeps_open_range() {
        let mut book = blank_book();
        book.status = Some("ongoing".into());
        book.published = Some(parse_date("2022").unwrap());
        derive_book_dates(&mut book);
        assert_eq!(book.published_end, None);
    }

    #[test]
    fn undated_book_stays_undated() {
        let mut book = blank_book();
        book.status = Some("completed".into());
        book.chapters = vec![chapter("a", 0, None)];
        derive_book_dates(&mut book);
        assert_eq!((book.published, book.published_end), (None, None));
    }
}

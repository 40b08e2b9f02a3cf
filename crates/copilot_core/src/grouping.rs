//! crates/copilot_core/src/grouping.rs
//!
//! The Course Grouping Engine: pure functions that derive course aggregates
//! from directory listings. No I/O happens here; the adapters hand in
//! `FileEntry` lists and this module folds them into courses.

use crate::domain::{Category, CourseSummary, FileEntry, has_course_extension};

/// Derives a course slug from a file's base name: trim, lowercase,
/// underscores become spaces, runs of whitespace collapse, words join with
/// hyphens. Deterministic, and idempotent on its own output.
pub fn slugify(base: &str) -> String {
    base.trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Builds the course index from the course-material listing plus the other
/// categories' listings.
///
/// Every course-extension file in `material` contributes a course keyed by
/// its slug; files sharing a slug fold into one record, keeping the latest
/// timestamp. Files in the other categories attach to the FIRST course (in
/// discovery order) whose title is a case-insensitive prefix of their base
/// name; files matching no course are excluded from all aggregates. The
/// result is sorted newest-updated first.
pub fn build_courses(
    material: &[FileEntry],
    others: &[(Category, Vec<FileEntry>)],
) -> Vec<CourseSummary> {
    // Vec rather than a map: discovery order is load-bearing for the
    // first-match prefix rule below.
    let mut courses: Vec<CourseSummary> = Vec::new();

    for entry in material {
        if !has_course_extension(&entry.name) {
            continue;
        }
        let stem = entry.stem();
        let slug = slugify(stem);
        match courses.iter_mut().find(|c| c.slug == slug) {
            Some(course) => {
                course.categories.bump(Category::CourseMaterial);
                if entry.modified > course.updated {
                    course.updated = entry.modified;
                }
            }
            None => {
                let mut course = CourseSummary {
                    slug,
                    title: stem.to_string(),
                    updated: entry.modified,
                    categories: Default::default(),
                };
                course.categories.bump(Category::CourseMaterial);
                courses.push(course);
            }
        }
    }

    for (category, entries) in others {
        for entry in entries {
            let stem_lower = entry.stem().to_lowercase();
            // First match wins when one course title is a prefix of another.
            if let Some(course) = courses
                .iter_mut()
                .find(|c| stem_lower.starts_with(&c.title.to_lowercase()))
            {
                course.categories.bump(*category);
                if entry.modified > course.updated {
                    course.updated = entry.modified;
                }
            }
        }
    }

    courses.sort_by(|a, b| b.updated.cmp(&a.updated));
    courses
}

/// Finds the course-material file whose derived slug matches, returning its
/// base name (the course title). `None` signals an unknown slug.
pub fn find_title_for_slug<'a>(material: &'a [FileEntry], slug: &str) -> Option<&'a str> {
    material
        .iter()
        .map(|entry| entry.stem())
        .find(|stem| slugify(stem) == slug)
}

/// Collects the files whose base name starts (case-insensitively) with the
/// course title, newest first.
pub fn files_with_title_prefix(entries: &[FileEntry], title: &str) -> Vec<FileEntry> {
    let title_lower = title.to_lowercase();
    let mut matched: Vec<FileEntry> = entries
        .iter()
        .filter(|e| e.stem().to_lowercase().starts_with(&title_lower))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.modified.cmp(&a.modified));
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(name: &str, minute: u32) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            size: 10,
            modified: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            ext: format!(
                ".{}",
                name.rsplit('.').next().unwrap_or("").to_lowercase()
            ),
        }
    }

    #[test]
    fn slugify_normalizes_case_underscores_and_whitespace() {
        assert_eq!(slugify("Intro_To ML"), "intro-to-ml");
        assert_eq!(slugify("  Intro_To ML  "), slugify("Intro_To ML"));
        assert_eq!(slugify("a   b\tc"), "a-b-c");
    }

    #[test]
    fn slugify_is_idempotent_on_its_own_output() {
        let once = slugify("Week_1  Advanced Topics");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn material_files_sharing_a_slug_fold_into_one_course() {
        let material = vec![entry("Intro to ML.pdf", 1), entry("intro_to ml.txt", 5)];
        let courses = build_courses(&material, &[]);
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].categories.course_material, 2);
        // Latest contributing timestamp wins.
        assert_eq!(courses[0].updated, material[1].modified);
    }

    #[test]
    fn pptx_material_does_not_identify_a_course() {
        let material = vec![entry("Slides Only.pptx", 1)];
        assert!(build_courses(&material, &[]).is_empty());
    }

    #[test]
    fn prefix_association_counts_and_unrelated_files_are_excluded() {
        let material = vec![entry("Intro to ML.pdf", 1)];
        let quizzes = vec![
            entry("Intro to ML Week1.txt", 2),
            entry("Unrelated.txt", 3),
        ];
        let courses = build_courses(&material, &[(Category::Quizzes, quizzes)]);
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].title, "Intro to ML");
        assert_eq!(courses[0].categories.quizzes, 1);
        assert_eq!(courses[0].categories.ppts, 0);
    }

    #[test]
    fn prefix_association_is_first_match_in_discovery_order() {
        // "Rust" is discovered before "Rust Advanced"; both are prefixes of
        // the quiz file, so the earlier course takes it.
        let material = vec![entry("Rust.pdf", 1), entry("Rust Advanced.pdf", 2)];
        let quizzes = vec![entry("Rust Advanced Quiz.txt", 3)];
        let courses = build_courses(&material, &[(Category::Quizzes, quizzes)]);
        let rust = courses.iter().find(|c| c.slug == "rust").unwrap();
        let advanced = courses.iter().find(|c| c.slug == "rust-advanced").unwrap();
        assert_eq!(rust.categories.quizzes, 1);
        assert_eq!(advanced.categories.quizzes, 0);
    }

    #[test]
    fn association_is_case_insensitive_and_bumps_updated() {
        let material = vec![entry("Intro to ML.pdf", 1)];
        let flashcards = vec![entry("INTRO TO ML cards.txt", 9)];
        let courses = build_courses(&material, &[(Category::Flashcards, flashcards.clone())]);
        assert_eq!(courses[0].categories.flashcards, 1);
        assert_eq!(courses[0].updated, flashcards[0].modified);
    }

    #[test]
    fn courses_sort_newest_updated_first() {
        let material = vec![entry("Old Course.pdf", 1), entry("New Course.pdf", 30)];
        let courses = build_courses(&material, &[]);
        assert_eq!(courses[0].slug, "new-course");
        assert_eq!(courses[1].slug, "old-course");
    }

    #[test]
    fn title_lookup_by_slug() {
        let material = vec![entry("Intro to ML.pdf", 1)];
        assert_eq!(find_title_for_slug(&material, "intro-to-ml"), Some("Intro to ML"));
        assert_eq!(find_title_for_slug(&material, "missing"), None);
    }

    #[test]
    fn title_prefix_collection_sorts_newest_first() {
        let entries = vec![
            entry("Intro to ML Week1.txt", 1),
            entry("Intro to ML Week2.txt", 8),
            entry("Other.txt", 9),
        ];
        let matched = files_with_title_prefix(&entries, "Intro to ML");
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].name, "Intro to ML Week2.txt");
    }
}

use duet_artifact::{apply, parse, render, ArtifactPath, ChangeSet, FileSet, Hunk, HunkOutcome};
use proptest::prelude::*;

fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_]{0,7}", 1..3)
        .prop_map(|segments| format!("{}.txt", segments.join("/")))
}

// Content lines that are neither fences nor markers
fn content_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9 =()+]{0,20}", 0..6).prop_map(|lines| lines.join("\n"))
}

fn file_set_strategy() -> impl Strategy<Value = FileSet> {
    prop::collection::btree_map(path_strategy(), content_strategy(), 0..5)
        .prop_map(|map| FileSet::try_from_pairs(map).unwrap())
}

proptest! {
    #[test]
    fn prop_render_parse_identity(files in file_set_strategy()) {
        let parsed = parse(&render(&files));
        prop_assert_eq!(parsed.files, files);
        prop_assert!(parsed.deletions.is_empty());
    }

    #[test]
    fn prop_parse_is_idempotent(files in file_set_strategy()) {
        let once = parse(&render(&files)).files;
        let twice = parse(&render(&once)).files;
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_parse_never_panics(raw in ".{0,400}") {
        let _ = parse(&raw);
    }

    #[test]
    fn prop_full_file_apply_keeps_untouched_files(
        existing in file_set_strategy(),
        incoming in file_set_strategy(),
    ) {
        let change = ChangeSet::Files(parse(&render(&incoming)));
        let report = apply(&existing, &change);
        for (path, content) in existing.iter() {
            if !incoming.contains(path) {
                prop_assert_eq!(report.files.get(path), Some(content));
            }
        }
        for (path, content) in incoming.iter() {
            prop_assert_eq!(report.files.get(path), Some(content));
        }
    }

    #[test]
    fn prop_replace_miss_leaves_content(content in content_strategy()) {
        let path = ArtifactPath::new("a.txt").unwrap();
        let mut files = FileSet::new();
        files.insert(path.clone(), content.clone());
        let report = apply(
            &files,
            &ChangeSet::Hunks(vec![Hunk::replace(path.clone(), "#never-present#", "x")]),
        );
        prop_assert_eq!(report.files.get(&path), Some(content.as_str()));
        prop_assert_eq!(report.results[0].outcome, HunkOutcome::TargetMissing);
    }
}

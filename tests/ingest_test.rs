mod helpers;

use helpers::{test_config, write_file};
use twinsync::ingest::learner::{self, Analysis};
use twinsync::knowledge::{DocFlag, KnowledgeBase};

#[test]
fn gbk_text_is_decoded_and_indexed() {
    let (dir, config) = test_config();
    let (bytes, _, had_errors) = encoding_rs::GBK.encode("交易策略笔记：均线突破");
    assert!(!had_errors);
    let path = write_file(dir.path(), "策略.txt", &bytes);

    let mut kb = KnowledgeBase::open(config.knowledge_dir()).unwrap();
    let outcome = learner::learn_file(&mut kb, &path, &config.knowledge, &[], None);
    assert!(outcome.is_ok(), "{:?}", outcome.error);

    let entry = outcome.entry.unwrap();
    assert_eq!(entry.summary, "交易策略笔记：均线突破");
    assert_eq!(kb.search("均线", false).len(), 1);
}

#[test]
fn unsupported_and_missing_files_embed_errors() {
    let (dir, config) = test_config();
    let mut kb = KnowledgeBase::open(config.knowledge_dir()).unwrap();

    let odd = write_file(dir.path(), "data.xyz", b"???");
    let outcome = learner::learn_file(&mut kb, &odd, &config.knowledge, &[], None);
    assert!(outcome.entry.is_none());
    assert_eq!(outcome.error.as_deref(), Some("unsupported file type: .xyz"));

    let missing = dir.path().join("nope.md");
    let outcome = learner::learn_file(&mut kb, &missing, &config.knowledge, &[], None);
    assert!(outcome.error.unwrap().starts_with("file not found"));

    assert!(kb.documents().is_empty());
}

#[test]
fn directory_learning_keeps_going_past_failures() {
    let (dir, config) = test_config();
    let src = dir.path().join("trading");
    std::fs::create_dir_all(src.join("nested")).unwrap();
    write_file(&src, "readme.md", b"# Plan\nBuy low. Sell high.");
    write_file(&src, "broken.png", b"definitely not a png");
    write_file(&src, "skip.bin", b"\x00\x01");
    write_file(&src.join("nested"), "deep.py", b"print('hi')\n");

    let mut kb = KnowledgeBase::open(config.knowledge_dir()).unwrap();

    let flat = learner::learn_directory(&mut kb, &src, false, &config.knowledge, &[], None).unwrap();
    assert_eq!(flat.len(), 2);
    assert_eq!(flat.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(flat.iter().any(|o| o.path.ends_with("broken.png") && o.error.is_some()));

    let deep = learner::learn_directory(&mut kb, &src, true, &config.knowledge, &[], None).unwrap();
    assert_eq!(deep.len(), 3);
    assert_eq!(kb.documents().len(), 2);

    // path keyword tags and extension categories
    assert_eq!(kb.search_by_tag("trading").len(), 2);
    assert_eq!(kb.search_by_category("documentation").len(), 1);
    assert_eq!(kb.search_by_category("code").len(), 1);
}

#[test]
fn directory_learning_applies_given_tags_and_category() {
    let (dir, config) = test_config();
    let src = dir.path().join("trading");
    std::fs::create_dir_all(&src).unwrap();
    write_file(&src, "a.md", b"# Entry rules");
    write_file(&src, "b.py", b"print('exit')\n");

    let mut kb = KnowledgeBase::open(config.knowledge_dir()).unwrap();
    let tags = vec!["strategy".to_string(), "trading".to_string()];
    let outcomes =
        learner::learn_directory(&mut kb, &src, false, &config.knowledge, &tags, Some("playbook"))
            .unwrap();
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 2);

    assert_eq!(kb.search_by_tag("strategy").len(), 2);
    assert_eq!(kb.search_by_tag("trading").len(), 2);
    assert_eq!(kb.search_by_category("playbook").len(), 2);
    assert!(kb.search_by_category("documentation").is_empty());
}

#[test]
fn auto_learn_writes_summary() {
    let (dir, mut config) = test_config();
    let inbox = dir.path().join("inbox");
    std::fs::create_dir_all(&inbox).unwrap();
    write_file(&inbox, "note.txt", b"Remember the meeting.");
    config.knowledge.learn_paths = vec![
        inbox.to_string_lossy().into_owned(),
        dir.path().join("missing").to_string_lossy().into_owned(),
    ];

    let mut kb = KnowledgeBase::open(config.knowledge_dir()).unwrap();
    let report = learner::auto_learn(&mut kb, &config.knowledge).unwrap();
    assert_eq!(report.learned, 1);
    assert_eq!(report.skipped_paths.len(), 1);

    let summary = std::fs::read_to_string(report.summary_path.unwrap()).unwrap();
    assert!(summary.starts_with("# Auto Learning Summary"));
    assert!(summary.contains("### note.txt"));
}

#[test]
fn images_are_analyzed_and_learned_with_flags() {
    let (dir, config) = test_config();
    let path = dir.path().join("chart.png");
    let mut img = image::RgbImage::new(64, 32);
    for (x, _, px) in img.enumerate_pixels_mut() {
        *px = if x < 32 { image::Rgb([255, 255, 255]) } else { image::Rgb([0, 0, 0]) };
    }
    img.save(&path).unwrap();

    match learner::analyze(&path, &config.knowledge).unwrap() {
        Analysis::Image(a) => {
            assert_eq!((a.width, a.height), (64, 32));
            assert_eq!(a.format, "PNG");
            assert!(a.is_chart);
            assert!(a.has_text);
        }
        Analysis::Document(_) => panic!("expected image analysis"),
    }

    let mut kb = KnowledgeBase::open(config.knowledge_dir()).unwrap();
    let outcome = learner::learn_file(&mut kb, &path, &config.knowledge, &[], Some("image"));
    let entry = outcome.entry.unwrap();
    assert!(entry.has_flag(DocFlag::Chart));
    assert!(entry.has_flag(DocFlag::TextRegion));
}

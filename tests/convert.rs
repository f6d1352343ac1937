//! End-to-end runs over synthesised `.iwb` boards.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use iwb_convert::pipeline::assemble::page_sizes;
use iwb_convert::{
    convert_to_pdf, extract_pages, extract_to_dir, extract_to_dir_sync, inspect, AssemblyConfig,
    ConversionConfig, ConversionProgressCallback, ConvertError, EngineKind, EnginePreference,
    ImageMode, PageSizing, TransformConfig,
};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zip::write::SimpleFileOptions;

const HEAD: &str = r#"<iwb xmlns="http://www.imsglobal.org/xsd/iwb_v1p0" xmlns:svg="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><svg:svg>"#;
const TAIL: &str = "</svg:svg></iwb>";

const STROKE_PAGE: &str = r##"<svg:page width="100" height="100"><svg:path d="M10 10L90 90" stroke="#000" stroke-width="2" fill="#123456"/></svg:page>"##;
const BROKEN_PAGE: &str = "<svg:page>&lt;g&gt;&lt;rect&gt;</svg:page>";

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zw = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        zw.start_file(*name, SimpleFileOptions::default()).unwrap();
        zw.write_all(data).unwrap();
    }
    zw.finish().unwrap();
}

/// Write `board.iwb` with a `content.xml` manifest holding `pages`.
fn board(dir: &Path, pages: &[&str], extra: &[(&str, &[u8])]) -> PathBuf {
    let manifest = format!("{HEAD}{}{TAIL}", pages.concat());
    let mut entries: Vec<(&str, &[u8])> = vec![("content.xml", manifest.as_bytes())];
    entries.extend_from_slice(extra);
    let path = dir.join("board.iwb");
    write_zip(&path, &entries);
    path
}

fn png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn in_process(sizing: PageSizing) -> ConversionConfig {
    ConversionConfig::builder()
        .assembly(
            AssemblyConfig::builder()
                .engine(EnginePreference::ForceInProcess)
                .page_sizing(sizing)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

// ── SVG extraction ───────────────────────────────────────────────────────

#[tokio::test]
async fn svg_mode_writes_one_file_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE, STROKE_PAGE, STROKE_PAGE], &[]);
    let out = dir.path().join("out");

    let summary = extract_to_dir(&input, &out, &ConversionConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.is_complete());
    for i in 0..3 {
        let text = std::fs::read_to_string(out.join(format!("page_{i}.svg"))).unwrap();
        assert!(text.starts_with("<?xml"), "{text}");
        assert!(text.contains(r#"fill="none""#), "{text}");
        assert!(!text.contains("#123456"), "{text}");
    }
    assert_eq!(summary.outputs.len(), 3);
}

#[tokio::test]
async fn malformed_page_is_skipped_and_siblings_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE, BROKEN_PAGE, STROKE_PAGE], &[]);
    let out = dir.path().join("out");

    let summary = extract_to_dir(&input, &out, &ConversionConfig::default())
        .await
        .unwrap();

    assert!(out.join("page_0.svg").exists());
    assert!(!out.join("page_1.svg").exists());
    assert!(out.join("page_2.svg").exists());
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].index, 1);
    assert_eq!(summary.skipped[0].reason, "malformedXml");
    assert!(matches!(
        summary.into_result(),
        Err(ConvertError::PartialFailure { succeeded: 2, skipped: 1, attempted: 3 })
    ));
}

#[tokio::test]
async fn canvas_grows_to_contain_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(
        dir.path(),
        &[r#"<svg:page width="100" height="100"><svg:rect x="0" y="0" width="100" height="150"/></svg:page>"#],
        &[],
    );

    let extraction = extract_pages(&input, &ConversionConfig::default()).await.unwrap();
    let page = &extraction.pages[0];
    assert_eq!(page.width, Some(100.0));
    assert_eq!(page.height, Some(150.0));
    assert!(page.markup.contains(r#"height="150""#), "{}", page.markup);
}

#[tokio::test]
async fn growing_one_axis_keeps_the_other_axis_exact() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(
        dir.path(),
        &[r#"<svg:page width="100.12345" height="100"><svg:rect x="0" y="0" width="50" height="150"/></svg:page>"#],
        &[],
    );

    let extraction = extract_pages(&input, &ConversionConfig::default()).await.unwrap();
    let page = &extraction.pages[0];
    assert_eq!(page.width, Some(100.12345));
    assert!(page.height.unwrap() >= 150.0, "{:?}", page.height);
    assert!(page.markup.contains(r#"width="100.12345""#), "{}", page.markup);
}

#[tokio::test]
async fn content_inside_canvas_keeps_declared_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE], &[]);

    let extraction = extract_pages(&input, &ConversionConfig::default()).await.unwrap();
    assert_eq!(extraction.pages[0].width, Some(100.0));
    assert_eq!(extraction.pages[0].height, Some(100.0));
}

#[tokio::test]
async fn images_are_embedded_as_data_uris() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = png();
    let input = board(
        dir.path(),
        &[r#"<svg:page width="100" height="100"><svg:image xlink:href="images/dot.png" width="10" height="10"/></svg:page>"#],
        &[("images/dot.png", &bytes)],
    );

    let extraction = extract_pages(&input, &ConversionConfig::default()).await.unwrap();
    let expected = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
    assert!(extraction.pages[0].markup.contains(&expected));
    assert!(extraction.summary.warnings.is_empty());
}

#[tokio::test]
async fn copy_assets_places_images_next_to_pages() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = png();
    let input = board(
        dir.path(),
        &[r#"<svg:page width="100" height="100"><svg:image xlink:href="./images/dot.png" width="10" height="10"/></svg:page>"#],
        &[("images/dot.png", &bytes)],
    );
    let out = dir.path().join("out");
    let config = ConversionConfig::builder()
        .transform(
            TransformConfig::builder()
                .image_mode(ImageMode::CopyAssets)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    extract_to_dir(&input, &out, &config).await.unwrap();

    assert_eq!(std::fs::read(out.join("images/dot.png")).unwrap(), bytes);
    let svg = std::fs::read_to_string(out.join("page_0.svg")).unwrap();
    assert!(svg.contains(r#"href="images/dot.png""#), "{svg}");
}

#[tokio::test]
async fn missing_image_is_a_warning_not_a_skip() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(
        dir.path(),
        &[r#"<svg:page width="100" height="100"><svg:image xlink:href="images/gone.png" width="10" height="10"/></svg:page>"#],
        &[],
    );

    let extraction = extract_pages(&input, &ConversionConfig::default()).await.unwrap();
    assert_eq!(extraction.summary.succeeded, 1);
    assert_eq!(extraction.summary.warnings.len(), 1);
    assert!(extraction.pages[0].markup.contains("images/gone.png"));
}

#[test]
fn sync_wrapper_runs_without_a_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE], &[]);
    let out = dir.path().join("out");
    let summary = extract_to_dir_sync(&input, &out, &ConversionConfig::default()).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(out.join("page_0.svg").exists());
}

// ── Fatal errors ─────────────────────────────────────────────────────────

#[tokio::test]
async fn archive_without_manifest_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("board.iwb");
    write_zip(&input, &[("images/a.png", b"png")]);
    let out = dir.path().join("out");

    let err = extract_to_dir(&input, &out, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::ManifestMissing { .. }), "{err}");
    assert!(!out.exists());
}

#[tokio::test]
async fn manifest_without_pages_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[], &[]);
    let err = extract_pages(&input, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::NoPages { .. }), "{err}");
}

#[tokio::test]
async fn non_zip_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("board.iwb");
    std::fs::write(&input, "just some text").unwrap();
    let err = extract_pages(&input, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::NotAContainer { .. }), "{err}");
}

#[tokio::test]
async fn every_page_failing_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[BROKEN_PAGE], &[]);
    let err = extract_pages(&input, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::AllPagesFailed { total: 1, .. }), "{err}");
}

#[tokio::test]
async fn failed_extraction_leaves_no_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[BROKEN_PAGE, BROKEN_PAGE], &[]);
    let out = dir.path().join("out");

    let err = extract_to_dir(&input, &out, &ConversionConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::AllPagesFailed { total: 2, .. }), "{err}");
    assert!(!out.exists());
}

// ── PDF assembly ─────────────────────────────────────────────────────────

const WIDE_PAGE: &str = r##"<svg:page width="200" height="50"><svg:rect x="10" y="10" width="20" height="20" stroke="#000"/></svg:page>"##;

#[tokio::test]
async fn independent_sizing_keeps_each_page_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE, WIDE_PAGE], &[]);
    let pdf = dir.path().join("board.pdf");

    let summary = convert_to_pdf(&input, &pdf, &in_process(PageSizing::Independent))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.outputs, vec![pdf.clone()]);
    let sizes = page_sizes(&std::fs::read(&pdf).unwrap()).unwrap();
    assert_eq!(sizes.len(), 2);
    assert_ne!(sizes[0], sizes[1]);
}

#[tokio::test]
async fn uniform_sizing_uses_largest_extents() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE, WIDE_PAGE], &[]);
    let pdf = dir.path().join("board.pdf");

    convert_to_pdf(&input, &pdf, &in_process(PageSizing::Uniform))
        .await
        .unwrap();

    let sizes = page_sizes(&std::fs::read(&pdf).unwrap()).unwrap();
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0], sizes[1]);
    let (w, h) = sizes[0];
    assert!(w >= h * 1.5, "expected the wide page's width to win: {w} x {h}");
}

#[tokio::test]
async fn skipped_pages_are_left_out_of_the_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE, BROKEN_PAGE, WIDE_PAGE], &[]);
    let pdf = dir.path().join("board.pdf");

    let summary = convert_to_pdf(&input, &pdf, &in_process(PageSizing::Independent))
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped[0].index, 1);
    let doc = lopdf::Document::load(&pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[tokio::test]
async fn forced_external_engine_falls_back_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE], &[]);
    let pdf = dir.path().join("nested/board.pdf");
    let config = ConversionConfig::builder()
        .assembly(
            AssemblyConfig::builder()
                .engine(EnginePreference::ForceExternal)
                .inkscape_path(dir.path().join("no-such-inkscape"))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let summary = convert_to_pdf(&input, &pdf, &config).await.unwrap();

    let engine = summary.engine.expect("engine report");
    assert_eq!(engine.requested, EnginePreference::ForceExternal);
    assert_eq!(engine.used, EngineKind::InProcess);
    assert!(engine.substituted);
    assert!(pdf.exists());
    assert!(!dir.path().join("nested/board.pdf.tmp").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn unstartable_inkscape_falls_back_for_every_page() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE, WIDE_PAGE], &[]);
    let exe = dir.path().join("inkscape");
    std::fs::write(&exe, "#!/nonexistent/interpreter\n").unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    let pdf = dir.path().join("board.pdf");
    let config = ConversionConfig::builder()
        .assembly(
            AssemblyConfig::builder()
                .engine(EnginePreference::ForceExternal)
                .inkscape_path(&exe)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let summary = convert_to_pdf(&input, &pdf, &config).await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert!(summary.skipped.is_empty());
    let engine = summary.engine.expect("engine report");
    assert_eq!(engine.used, EngineKind::InProcess);
    assert!(engine.substituted);
    assert!(engine.note.is_some());
    assert_eq!(page_sizes(&std::fs::read(&pdf).unwrap()).unwrap().len(), 2);
}

// ── Inspection and progress ──────────────────────────────────────────────

#[tokio::test]
async fn inspect_lists_pages_without_converting() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(
        dir.path(),
        &[
            r#"<svg:page width="800" height="600"><svg:image xlink:href="images/a.png"/></svg:page>"#,
            BROKEN_PAGE,
        ],
        &[],
    );

    let pages = inspect(&input).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].declared_width.as_deref(), Some("800"));
    assert_eq!(pages[0].image_refs, vec!["images/a.png".to_string()]);
    assert!(pages[0].skipped.is_none());
    assert_eq!(pages[1].skipped.as_ref().unwrap().reason, "malformedXml");
}

#[derive(Default)]
struct Counter {
    started: AtomicUsize,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    finished: AtomicUsize,
}

impl ConversionProgressCallback for Counter {
    fn on_page_start(&self, _index: usize, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_complete(&self, _index: usize, _total: usize, _len: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_skipped(&self, _index: usize, _total: usize, _reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
    fn on_run_complete(&self, _attempted: usize, succeeded: usize) {
        self.finished.store(succeeded, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_callback_sees_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = board(dir.path(), &[STROKE_PAGE, BROKEN_PAGE, STROKE_PAGE], &[]);
    let counter = Arc::new(Counter::default());
    let config = ConversionConfig::builder()
        .progress_callback(counter.clone())
        .build()
        .unwrap();

    extract_pages(&input, &config).await.unwrap();

    assert_eq!(counter.started.load(Ordering::SeqCst), 3);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    assert_eq!(counter.skipped.load(Ordering::SeqCst), 1);
    assert_eq!(counter.finished.load(Ordering::SeqCst), 2);
}

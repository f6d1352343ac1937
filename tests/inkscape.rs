//! Runs against a real Inkscape install.
//!
//! Skipped unless Inkscape can be located (see `INKSCAPE_PATH`) and
//! `IWB_INKSCAPE_TESTS` is set, since a cold Inkscape start is slow.
//!
//! Run with:
//!   IWB_INKSCAPE_TESTS=1 cargo test --test inkscape -- --nocapture

use iwb_convert::{
    convert_to_pdf, AssemblyConfig, ConversionConfig, EngineKind, EnginePreference, PageSizing,
};
use std::fs::File;
use std::io::Write;
use zip::write::SimpleFileOptions;

macro_rules! skip_unless_inkscape {
    () => {{
        if std::env::var("IWB_INKSCAPE_TESTS").is_err() {
            println!("SKIP: set IWB_INKSCAPE_TESTS=1 to run Inkscape tests");
            return;
        }
        if !inkscape_locate::is_inkscape_available() {
            println!("SKIP: Inkscape not found");
            return;
        }
    }};
}

#[tokio::test]
async fn inkscape_renders_and_merges_pages() {
    skip_unless_inkscape!();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("board.iwb");
    let manifest = concat!(
        r#"<iwb xmlns:svg="http://www.w3.org/2000/svg"><svg:svg>"#,
        r##"<svg:page width="300" height="200"><svg:circle cx="50" cy="50" r="40" stroke="#00f"/></svg:page>"##,
        r##"<svg:page width="120" height="400"><svg:line x1="0" y1="0" x2="100" y2="380" stroke="#f00"/></svg:page>"##,
        "</svg:svg></iwb>"
    );
    let mut zw = zip::ZipWriter::new(File::create(&input).unwrap());
    zw.start_file("content.xml", SimpleFileOptions::default()).unwrap();
    zw.write_all(manifest.as_bytes()).unwrap();
    zw.finish().unwrap();

    let config = ConversionConfig::builder()
        .assembly(
            AssemblyConfig::builder()
                .engine(EnginePreference::ForceExternal)
                .page_sizing(PageSizing::Uniform)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let pdf = dir.path().join("board.pdf");
    let summary = convert_to_pdf(&input, &pdf, &config).await.unwrap();

    let engine = summary.engine.unwrap();
    assert_eq!(engine.used, EngineKind::External);
    assert!(!engine.substituted);
    let sizes = iwb_convert::pipeline::assemble::page_sizes(&std::fs::read(&pdf).unwrap()).unwrap();
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0], sizes[1]);
}

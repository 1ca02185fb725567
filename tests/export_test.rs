use std::sync::Arc;

use chrono::Local;
use icschart::application::services::{
    ChartRasterizer, ChartSession, ExportFormat, ExportMetadata, ExportService, ExportSnapshot,
    PageGeometry, PdfComposer, RasterOptions,
};
use icschart::application::ApplicationError;
use icschart::config::ExportSettings;
use icschart::domain::{
    ChartLayout, LayoutConfig, LayoutEngine, OrganizationNode, TemplateCatalog, Vec2,
    ViewTransform, ZoomLimits,
};
use icschart::infrastructure::traits::{AutoConfirmer, RealFileSystem};
use icschart::util::testing::init_test_setup;
use rstest::{fixture, rstest};
use tempfile::TempDir;

/// Small boxes keep the rasters cheap.
fn small_session() -> ChartSession {
    ChartSession::new(
        LayoutEngine::new(LayoutConfig {
            node_width: 32.0,
            node_height: 12.0,
            sibling_gap: 4.0,
            level_gap: 8.0,
            stem_length: 4.0,
        }),
        ZoomLimits::default(),
        TemplateCatalog::builtin(),
        Arc::new(AutoConfirmer::yes()),
    )
}

#[fixture]
fn service() -> ExportService {
    init_test_setup();
    let options = RasterOptions {
        padding: 8.0,
        ..RasterOptions::default()
    };
    ExportService::new(
        ChartRasterizer::new(options),
        PdfComposer::new(PageGeometry::from(&ExportSettings::default())),
    )
}

fn metadata(task: &str) -> ExportMetadata {
    ExportMetadata {
        task_reference: task.to_string(),
        event_name: "River Flood".to_string(),
        operational_period: "0600-1800".to_string(),
    }
}

#[rstest]
fn given_chart_when_exporting_pdf_then_document_bytes_and_name(service: ExportService) {
    let mut session = small_session();

    let artifact = session
        .export_with(&service, metadata("T-7"), ExportFormat::Pdf)
        .unwrap();

    assert!(artifact.bytes.starts_with(b"%PDF"));
    assert_eq!(artifact.file_name, "ICS_Chart_T-7.pdf");
    assert_eq!(artifact.format, ExportFormat::Pdf);
    assert!(artifact.raster_size.0 > artifact.raster_size.1);
    assert!(!service.is_busy());
}

#[rstest]
fn given_chart_when_exporting_png_then_png_signature(service: ExportService) {
    let mut session = small_session();

    let artifact = session
        .export_with(&service, ExportMetadata::default(), ExportFormat::Png)
        .unwrap();

    assert!(artifact.bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    assert_eq!(artifact.file_name, "ICS_Chart_Draft.png");
}

#[rstest]
fn given_panned_view_when_exporting_then_identity_capture_and_view_restored(
    service: ExportService,
) {
    let mut session = small_session();
    session.zoom_in();
    session.pan_to(Vec2::new(25.0, 10.0));
    let view = session.viewport().transform();

    let snapshot = session.export_snapshot(metadata("T-1"));

    assert!(snapshot.transform.is_identity());
    assert_eq!(session.viewport().transform(), view);
    assert!(service.export(&snapshot, ExportFormat::Png).is_ok());
}

#[rstest]
fn given_snapshot_when_chart_edited_afterwards_then_export_unaffected(service: ExportService) {
    let mut session = small_session();
    let snapshot = session.export_snapshot(metadata("T-2"));
    let nodes = snapshot.layout.nodes.len();

    session.add_child("fin").unwrap();
    session.add_child("fin").unwrap();

    assert_eq!(snapshot.layout.nodes.len(), nodes);
    assert_eq!(snapshot.tree.count(), nodes);
    let artifact = service.export(&snapshot, ExportFormat::Png).unwrap();
    assert_eq!(
        artifact.raster_size,
        service.rasterizer().capture_size(&snapshot.layout)
    );
}

#[rstest]
fn given_export_in_flight_when_exporting_again_then_busy(service: ExportService) {
    let mut session = small_session();
    let guard = service.begin_export().unwrap();

    let err = session
        .export_with(&service, metadata("T-3"), ExportFormat::Pdf)
        .unwrap_err();

    assert!(matches!(err, ApplicationError::ExportBusy));
    drop(guard);
    assert!(session
        .export_with(&service, metadata("T-3"), ExportFormat::Pdf)
        .is_ok());
}

#[rstest]
fn given_empty_layout_when_exporting_then_capture_fails(service: ExportService) {
    let snapshot = ExportSnapshot {
        tree: OrganizationNode::new("root", "EOC Director"),
        layout: ChartLayout::default(),
        transform: ViewTransform::IDENTITY,
        metadata: ExportMetadata::default(),
        taken_at: Local::now(),
    };

    let err = service.export(&snapshot, ExportFormat::Pdf).unwrap_err();

    assert!(matches!(err, ApplicationError::EmptyCapture { .. }));
    assert!(!service.is_busy());
}

#[test]
fn given_tiny_edge_limit_when_exporting_then_too_large() {
    let service = ExportService::new(
        ChartRasterizer::new(RasterOptions {
            max_edge_px: 64,
            ..RasterOptions::default()
        }),
        PdfComposer::new(PageGeometry::from(&ExportSettings::default())),
    );
    let mut session = small_session();

    let err = session
        .export_with(&service, metadata("T-4"), ExportFormat::Png)
        .unwrap_err();

    assert!(matches!(err, ApplicationError::CaptureTooLarge { max: 64, .. }));
}

#[rstest]
fn given_artifact_when_saving_then_written_to_new_directory(service: ExportService) {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("exports").join("day1");
    let mut session = small_session();
    let artifact = session
        .export_with(&service, metadata("Ops/North"), ExportFormat::Pdf)
        .unwrap();

    let path = service.save(&artifact, &out, &RealFileSystem).unwrap();

    assert_eq!(path, out.join("ICS_Chart_Ops_North.pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);
}

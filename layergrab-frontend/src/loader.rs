use std::env;
use std::path::{Path, PathBuf};

use layergrab_core::document::{Definition, Drawing, Polyline, Primitive};
use layergrab_core::geometry::{AffineTransform, Point3};
use layergrab_io::{DocumentLoader, DxfFacade};
use tracing::{debug, info, warn};

use crate::errors::FrontendError;

pub const SAMPLE_DXF_ENV: &str = "LAYERGRAB_SAMPLE_DXF";

/// 文档来源，便于前端呈现加载信息。
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    Dxf(PathBuf),
    Demo,
}

/// 加载后的图纸与来源。
#[derive(Debug)]
pub struct LoadedDrawing {
    pub drawing: Drawing,
    pub source: DocumentSource,
}

/// 显式给出路径时直接加载，失败即返回错误；否则读取环境变量
/// `LAYERGRAB_SAMPLE_DXF`，加载失败时回退到内置示例。
pub fn load_drawing(path: Option<&Path>) -> Result<LoadedDrawing, FrontendError> {
    if let Some(path) = path {
        return load_dxf(path);
    }
    if let Some(path) = env::var_os(SAMPLE_DXF_ENV) {
        let path = PathBuf::from(path);
        match load_dxf(&path) {
            Ok(loaded) => return Ok(loaded),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载 DXF 失败，回退到内置示例");
            }
        }
    }
    Ok(LoadedDrawing {
        drawing: demo_drawing(),
        source: DocumentSource::Demo,
    })
}

fn load_dxf(path: &Path) -> Result<LoadedDrawing, FrontendError> {
    let drawing = DxfFacade::new().load(path)?;
    info!(
        path = %path.display(),
        entities = drawing.entities().count(),
        blocks = drawing.definitions().count(),
        "从 DXF 加载图纸成功"
    );
    Ok(LoadedDrawing {
        drawing,
        source: DocumentSource::Dxf(path.to_path_buf()),
    })
}

/// 内置示例：块 PANEL 含两个 `FOUND` 图层矩形，放置于 (100,100,0)；
/// 顶层另有四条线段围成的矩形与一个标注圆。
pub fn demo_drawing() -> Drawing {
    let mut drawing = Drawing::new();
    drawing.add_definition(
        Definition::new("PANEL")
            .with_primitive(rectangle(0.0, 0.0, 2.0, 2.0, "FOUND"))
            .with_primitive(rectangle(10.0, 0.0, 12.0, 2.0, "FOUND"))
            .with_primitive(rectangle(-1.0, -1.0, 13.0, 3.0, "OUTLINE")),
    );
    drawing.add_definition(Definition::layout("*Paper_Space"));
    drawing.add_insert(
        "PANEL",
        AffineTransform::translation(Point3::new(100.0, 100.0, 0.0)),
        "0",
    );

    let corners = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
    for (index, &(x0, y0)) in corners.iter().enumerate() {
        let (x1, y1) = corners[(index + 1) % corners.len()];
        drawing.add_line(Point3::new(x0, y0, 0.0), Point3::new(x1, y1, 0.0), "FOUND");
    }
    drawing.add_circle(Point3::new(50.0, 25.0, 0.0), 12.5, "ANNOT");

    debug!(
        entities = drawing.entities().count(),
        blocks = drawing.definitions().count(),
        "已构建演示图纸"
    );
    drawing
}

fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64, layer: &str) -> Primitive {
    Primitive::Polyline(Polyline {
        vertices: vec![
            Point3::new(x0, y0, 0.0),
            Point3::new(x1, y0, 0.0),
            Point3::new(x1, y1, 0.0),
            Point3::new(x0, y1, 0.0),
        ],
        is_closed: true,
        layer: layer.into(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn demo_drawing_contains_panel_and_loose_rectangle() {
        let drawing = demo_drawing();
        assert!(drawing.definition("panel").is_some());
        assert!(drawing.definition("*PAPER_SPACE").is_some_and(|d| d.is_layout));
        assert_eq!(drawing.entities().count(), 6);
    }

    #[test]
    fn explicit_path_errors_are_not_hidden() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let result = load_drawing(Some(&dir.path().join("absent.dxf")));
        assert!(matches!(result, Err(FrontendError::Load(_))));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\nFOUND\n10\n0\n20\n0\n11\n5\n21\n0\n0\nENDSEC\n0\nEOF\n"
        )
        .unwrap();
        let loaded = load_drawing(Some(file.path())).expect("load dxf");
        assert_eq!(loaded.source, DocumentSource::Dxf(file.path().to_path_buf()));
        assert_eq!(loaded.drawing.entities().count(), 1);
    }
}

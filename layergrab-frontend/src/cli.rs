use layergrab_engine::Extraction;
use layergrab_engine::OutputPoint;
use serde::Serialize;

use crate::errors::FrontendError;
use crate::loader::DocumentSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    points: &'a [OutputPoint],
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

/// 对齐的文本表格，列为 `id x y z corner source`，警告附在表格之后。
pub fn render_table(extraction: &Extraction, precision: usize) -> String {
    let rows: Vec<[String; 6]> = extraction
        .points
        .iter()
        .map(|point| {
            [
                point.id.clone(),
                format!("{:.precision$}", point.coordinates.x()),
                format!("{:.precision$}", point.coordinates.y()),
                format!("{:.precision$}", point.coordinates.z()),
                point
                    .corner
                    .map(|corner| corner.as_str().to_string())
                    .unwrap_or_default(),
                point.source.clone(),
            ]
        })
        .collect();
    let header = ["id", "x", "y", "z", "corner", "source"].map(String::from);

    let mut widths = header.clone().map(|cell| cell.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(column, (cell, width))| match column {
                1..=3 => format!("{cell:>width$}"),
                _ => format!("{cell:<width$}"),
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    if let Some(message) = &extraction.message {
        out.push_str(&format!("{message}\n"));
    }
    if !extraction.warnings.is_empty() {
        out.push_str(&format!("警告（{} 条）：\n", extraction.warnings.len()));
        for warning in &extraction.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }
    out
}

pub fn render_json(extraction: &Extraction) -> Result<String, FrontendError> {
    let report = Report {
        points: &extraction.points,
        warnings: extraction.warnings.iter().map(ToString::to_string).collect(),
        message: extraction.message.as_deref(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn describe_source(source: &DocumentSource) -> String {
    match source {
        DocumentSource::Dxf(path) => format!("DXF 文件：{}", path.display()),
        DocumentSource::Demo => "内置示例图纸".to_string(),
    }
}

use layergrab_core::document::Primitive;
use layergrab_core::geometry::Point3;

/// 图元在所在容器坐标系中的代表点。
///
/// 线段与多段线原样返回顶点；曲线与点返回锚点；块参照由解析器单独处理，
/// 此处返回空；无法读取的图元同样返回空。
pub fn local_points(primitive: &Primitive) -> Vec<Point3> {
    match primitive {
        Primitive::Line(line) => vec![line.start, line.end],
        Primitive::Polyline(polyline) => polyline.vertices.clone(),
        Primitive::Curve(curve) => vec![curve.anchor],
        Primitive::Insert(_) | Primitive::Unsupported(_) => Vec::new(),
    }
}

/// 若图元的几何无法读取，返回原因。
pub fn read_failure(primitive: &Primitive) -> Option<String> {
    match primitive {
        Primitive::Unsupported(unsupported) => Some(
            unsupported
                .reason
                .clone()
                .unwrap_or_else(|| format!("unsupported entity {}", unsupported.kind)),
        ),
        Primitive::Polyline(polyline) if polyline.vertices.is_empty() => {
            Some("polyline without vertices".to_string())
        }
        _ => None,
    }
}

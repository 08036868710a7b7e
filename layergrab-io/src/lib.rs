use std::fs;
use std::path::Path;

use glam::DVec3;
use thiserror::Error;
use tracing::debug;
use layergrab_core::{
    document::{
        Curve, DEFAULT_LAYER, Definition, Drawing, InstanceReference, Line, Polyline, Primitive,
        Unsupported,
    },
    geometry::{AffineTransform, Point3},
};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

const BINARY_DXF_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Drawing, IoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 直接解析内存中的 ASCII DXF 文本。
    pub fn parse_str(&self, source: &str) -> Result<Drawing, IoError> {
        if source.as_bytes().starts_with(BINARY_DXF_SENTINEL) {
            return Err(IoError::UnsupportedFeature("binary DXF".to_string()));
        }
        DxfParser::new(source).parse().map_err(|err| match err {
            DxfError::Unsupported { feature } => IoError::UnsupportedFeature(feature),
            DxfError::Invalid { message } => IoError::InvalidDocument(message),
        })
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Drawing, IoError> {
        let bytes = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.starts_with(BINARY_DXF_SENTINEL) {
            return Err(IoError::UnsupportedFeature("binary DXF".to_string()));
        }
        // 非 UTF-8 代码页的文本按有损方式读取，坐标与组码均为 ASCII
        self.parse_str(&String::from_utf8_lossy(&bytes))
    }
}

#[derive(Debug)]
enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// 单个实体的组码/值对，直到下一个组码 0 为止。
type Body = Vec<(i32, String)>;

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Drawing, DxfError> {
        let mut drawing = Drawing::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut drawing)?,
                        "BLOCKS" => self.parse_blocks(&mut drawing)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(drawing)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                kind => {
                    if let Some(primitive) = self.parse_entity(kind)? {
                        drawing.add_primitive(primitive);
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_blocks(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("BLOCKS 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "BLOCKS 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "BLOCK" => {
                    let definition = self.parse_block_definition()?;
                    drawing.add_definition(definition);
                }
                _ => {
                    // 未预期的条目（例如孤立的 ENDBLK），直接跳过
                    self.read_body()?;
                }
            }
        }
        Ok(())
    }

    fn parse_block_definition(&mut self) -> Result<Definition, DxfError> {
        let header = self.read_body()?;
        let mut name: Option<String> = None;
        let mut base = [0.0_f64; 3];
        for (code, value) in &header {
            match code {
                2 => name = Some(value.trim().to_string()),
                10 => base[0] = parse_f64(value, "BLOCK 基点 X")?,
                20 => base[1] = parse_f64(value, "BLOCK 基点 Y")?,
                30 => base[2] = parse_f64(value, "BLOCK 基点 Z")?,
                _ => {}
            }
        }
        let name = name.ok_or_else(|| DxfError::invalid("BLOCK 缺少名称（组码 2）"))?;

        let mut definition = if is_layout_block(&name) {
            Definition::layout(name)
        } else {
            Definition::new(name)
        };

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ENDBLK" => {
                        self.read_body()?;
                        break;
                    }
                    kind => {
                        if let Some(primitive) = self.parse_entity(kind)? {
                            definition.primitives.push(primitive);
                        }
                    }
                },
                Some((code, _)) => {
                    return Err(DxfError::invalid(format!(
                        "BLOCK {} 内遇到组码 {code}（期望 0 表示实体起始）",
                        definition.name
                    )));
                }
                None => {
                    return Err(DxfError::invalid("BLOCK 定义未找到 ENDBLK 终止标记"));
                }
            }
        }

        definition.rebase(Point3::new(base[0], base[1], base[2]));
        debug!(
            block = %definition.name,
            primitives = definition.primitives.len(),
            is_layout = definition.is_layout,
            "已解析块定义"
        );
        Ok(definition)
    }

    /// 解析一个实体。属性、序列结束等附属记录返回 `None`；
    /// 无法识别或数据损坏的实体转为 `Primitive::Unsupported`，不中断加载。
    fn parse_entity(&mut self, kind: &str) -> Result<Option<Primitive>, DxfError> {
        if matches!(kind, "ATTRIB" | "SEQEND" | "VERTEX") {
            self.read_body()?;
            return Ok(None);
        }

        let body = self.read_body()?;
        let parsed = match kind {
            "LINE" => build_line(&body),
            "LWPOLYLINE" => build_lwpolyline(&body),
            "POLYLINE" => {
                let vertices = self.read_polyline_vertices()?;
                build_polyline(&body, &vertices)
            }
            "CIRCLE" => build_circle(&body),
            "ARC" => build_arc(&body),
            "ELLIPSE" => build_ellipse(&body),
            "POINT" => build_point(&body),
            "INSERT" => build_insert(&body),
            other => Err(DxfError::unsupported(format!("暂不支持的实体类型 {other}"))),
        };

        match parsed {
            Ok(primitive) => Ok(Some(primitive)),
            Err(err) => {
                let reason = match err {
                    DxfError::Unsupported { feature } => feature,
                    DxfError::Invalid { message } => message,
                };
                debug!(kind, reason = %reason, "实体无法解析，保留为不支持的图元");
                Ok(Some(Primitive::Unsupported(Unsupported {
                    kind: kind.to_string(),
                    layer: layer_of(&body),
                    reason: Some(reason),
                })))
            }
        }
    }

    /// 旧式 POLYLINE 后随的 VERTEX 记录，直到 SEQEND。
    fn read_polyline_vertices(&mut self) -> Result<Vec<Body>, DxfError> {
        let mut vertices = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => vertices.push(self.read_body()?),
                    "SEQEND" => {
                        self.read_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, _)) => {
                    return Err(DxfError::invalid(format!(
                        "POLYLINE 顶点序列出现意外组码 {code}"
                    )));
                }
                None => break,
            }
        }
        Ok(vertices)
    }

    fn read_body(&mut self) -> Result<Body, DxfError> {
        let mut body = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(pair) => body.push(pair),
                None => break,
            }
        }
        Ok(body)
    }
}

fn is_layout_block(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with("*model_space") || lower.starts_with("*paper_space")
}

fn layer_of(body: &Body) -> String {
    body.iter()
        .find(|(code, _)| *code == 8)
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_LAYER.to_string())
}

fn build_line(body: &Body) -> Result<Primitive, DxfError> {
    let mut start = [None, None, None];
    let mut end = [None, None, None];
    for (code, value) in body {
        match code {
            10 => assign_coord(&mut start[0], value, "LINE 起点 X（组码 10）")?,
            20 => assign_coord(&mut start[1], value, "LINE 起点 Y（组码 20）")?,
            30 => assign_coord(&mut start[2], value, "LINE 起点 Z（组码 30）")?,
            11 => assign_coord(&mut end[0], value, "LINE 终点 X（组码 11）")?,
            21 => assign_coord(&mut end[1], value, "LINE 终点 Y（组码 21）")?,
            31 => assign_coord(&mut end[2], value, "LINE 终点 Z（组码 31）")?,
            _ => {}
        }
    }
    Ok(Primitive::Line(Line {
        start: required_point(start, "LINE 起点")?,
        end: required_point(end, "LINE 终点")?,
        layer: layer_of(body),
    }))
}

fn build_lwpolyline(body: &Body) -> Result<Primitive, DxfError> {
    let mut is_closed = false;
    let mut elevation = 0.0;
    let mut planar: Vec<(f64, f64)> = Vec::new();
    let mut pending_x: Option<f64> = None;
    for (code, value) in body {
        match code {
            70 => {
                let flag = parse_i32(value, "LWPOLYLINE 标志")?;
                is_closed = flag & 0x01 == 0x01;
            }
            38 => elevation = parse_f64(value, "LWPOLYLINE 标高（组码 38）")?,
            10 => {
                let x = parse_f64(value, "LWPOLYLINE 顶点 X")?;
                if pending_x.replace(x).is_some() {
                    return Err(DxfError::invalid("LWPOLYLINE 顶点缺少对应的 Y（组码 20）"));
                }
            }
            20 => {
                let y = parse_f64(value, "LWPOLYLINE 顶点 Y")?;
                let x = pending_x
                    .take()
                    .ok_or_else(|| DxfError::invalid("LWPOLYLINE 顶点缺少对应的 X（组码 10）"))?;
                planar.push((x, y));
            }
            _ => {}
        }
    }

    if pending_x.is_some() {
        return Err(DxfError::invalid(
            "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
        ));
    }
    if planar.is_empty() {
        return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
    }

    Ok(Primitive::Polyline(Polyline {
        vertices: planar
            .into_iter()
            .map(|(x, y)| Point3::new(x, y, elevation))
            .collect(),
        is_closed,
        layer: layer_of(body),
    }))
}

fn build_polyline(header: &Body, vertices: &[Body]) -> Result<Primitive, DxfError> {
    let mut flags = 0;
    let mut elevation = 0.0;
    for (code, value) in header {
        match code {
            70 => flags = parse_i32(value, "POLYLINE 标志（组码 70）")?,
            30 => elevation = parse_f64(value, "POLYLINE 标高（组码 30）")?,
            _ => {}
        }
    }

    let mut points = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        let mut coords = [None, None, None];
        let mut vertex_flags = 0;
        for (code, value) in vertex {
            match code {
                10 => assign_coord(&mut coords[0], value, "VERTEX X（组码 10）")?,
                20 => assign_coord(&mut coords[1], value, "VERTEX Y（组码 20）")?,
                30 => assign_coord(&mut coords[2], value, "VERTEX Z（组码 30）")?,
                70 => vertex_flags = parse_i32(value, "VERTEX 标志（组码 70）")?,
                _ => {}
            }
        }
        // 多面网格的面记录（128 且非 64）不携带几何位置
        if vertex_flags & 128 == 128 && vertex_flags & 64 == 0 {
            continue;
        }
        if coords[2].is_none() {
            coords[2] = Some(elevation);
        }
        points.push(required_point(coords, "VERTEX")?);
    }

    if points.is_empty() {
        return Err(DxfError::invalid("POLYLINE 未解析到任何顶点"));
    }

    Ok(Primitive::Polyline(Polyline {
        vertices: points,
        is_closed: flags & 0x01 == 0x01,
        layer: layer_of(header),
    }))
}

fn read_center(body: &Body, context: &str) -> Result<Point3, DxfError> {
    let mut center = [None, None, None];
    for (code, value) in body {
        match code {
            10 => assign_coord(&mut center[0], value, &format!("{context} 圆心 X（组码 10）"))?,
            20 => assign_coord(&mut center[1], value, &format!("{context} 圆心 Y（组码 20）"))?,
            30 => assign_coord(&mut center[2], value, &format!("{context} 圆心 Z（组码 30）"))?,
            _ => {}
        }
    }
    required_point(center, &format!("{context} 圆心"))
}

fn find_f64(body: &Body, wanted: i32, context: &str) -> Result<Option<f64>, DxfError> {
    body.iter()
        .find(|(code, _)| *code == wanted)
        .map(|(_, value)| parse_f64(value, context))
        .transpose()
}

fn build_circle(body: &Body) -> Result<Primitive, DxfError> {
    let center = read_center(body, "CIRCLE")?;
    let radius = find_f64(body, 40, "CIRCLE 半径")?
        .ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;
    Ok(Primitive::Curve(Curve::circle(center, radius, layer_of(body))))
}

fn build_arc(body: &Body) -> Result<Primitive, DxfError> {
    let center = read_center(body, "ARC")?;
    let radius = find_f64(body, 40, "ARC 半径")?
        .ok_or_else(|| DxfError::invalid("ARC 缺少半径（组码 40）"))?;
    let start = find_f64(body, 50, "ARC 起始角")?.unwrap_or(0.0);
    let end = find_f64(body, 51, "ARC 终止角")?.unwrap_or(360.0);
    Ok(Primitive::Curve(Curve::arc(
        center,
        radius,
        start.to_radians(),
        end.to_radians(),
        layer_of(body),
    )))
}

fn build_ellipse(body: &Body) -> Result<Primitive, DxfError> {
    let center = read_center(body, "ELLIPSE")?;
    let major_x = find_f64(body, 11, "ELLIPSE 长轴 X")?
        .ok_or_else(|| DxfError::invalid("ELLIPSE 缺少长轴 X（组码 11）"))?;
    let major_y = find_f64(body, 21, "ELLIPSE 长轴 Y")?
        .ok_or_else(|| DxfError::invalid("ELLIPSE 缺少长轴 Y（组码 21）"))?;
    let major_z = find_f64(body, 31, "ELLIPSE 长轴 Z")?.unwrap_or(0.0);
    let ratio = find_f64(body, 40, "ELLIPSE 短长轴比")?.unwrap_or(1.0);
    let start = find_f64(body, 41, "ELLIPSE 起始参数")?.unwrap_or(0.0);
    let end = find_f64(body, 42, "ELLIPSE 终止参数")?.unwrap_or(std::f64::consts::TAU);
    Ok(Primitive::Curve(Curve::ellipse(
        center,
        DVec3::new(major_x, major_y, major_z),
        ratio,
        start,
        end,
        layer_of(body),
    )))
}

fn build_point(body: &Body) -> Result<Primitive, DxfError> {
    let mut position = [None, None, None];
    for (code, value) in body {
        match code {
            10 => assign_coord(&mut position[0], value, "POINT X（组码 10）")?,
            20 => assign_coord(&mut position[1], value, "POINT Y（组码 20）")?,
            30 => assign_coord(&mut position[2], value, "POINT Z（组码 30）")?,
            _ => {}
        }
    }
    Ok(Primitive::Curve(Curve::point(
        required_point(position, "POINT")?,
        layer_of(body),
    )))
}

fn build_insert(body: &Body) -> Result<Primitive, DxfError> {
    let mut name: Option<String> = None;
    let mut insert = [None, None, None];
    let mut scale_x: Option<f64> = None;
    let mut scale_y: Option<f64> = None;
    let mut scale_z: Option<f64> = None;
    let mut rotation_deg = 0.0;
    for (code, value) in body {
        match code {
            2 => {
                if name.is_some() {
                    return Err(DxfError::invalid("INSERT 遇到重复的块名（组码 2）"));
                }
                name = Some(value.trim().to_string());
            }
            10 => assign_coord(&mut insert[0], value, "INSERT 插入点 X（组码 10）")?,
            20 => assign_coord(&mut insert[1], value, "INSERT 插入点 Y（组码 20）")?,
            30 => assign_coord(&mut insert[2], value, "INSERT 插入点 Z（组码 30）")?,
            41 => scale_x = Some(parse_f64(value, "INSERT 缩放 X")?),
            42 => scale_y = Some(parse_f64(value, "INSERT 缩放 Y")?),
            43 => scale_z = Some(parse_f64(value, "INSERT 缩放 Z")?),
            50 => rotation_deg = parse_f64(value, "INSERT 旋转角")?,
            _ => {}
        }
    }

    let name = name.ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
    let sx = scale_x.unwrap_or(1.0);
    let sy = scale_y.unwrap_or(sx);
    let sz = scale_z.unwrap_or(sx);
    let transform = AffineTransform::new(
        DVec3::new(sx, sy, sz),
        rotation_deg.to_radians(),
        required_point(insert, "INSERT 插入点")?,
    );
    Ok(Primitive::Insert(InstanceReference::new(
        name,
        transform,
        layer_of(body),
    )))
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => return Ok(None),
        };
        if code_line.trim().is_empty() && self.lines.clone().all(|line| line.trim().is_empty()) {
            return Ok(None);
        }

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "尝试多次回退 DXF pair");
        self.buffer = Some(pair);
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

/// XY 必须齐全，缺省 Z 视为 0。
fn required_point(coords: [Option<f64>; 3], context: &str) -> Result<Point3, DxfError> {
    match coords {
        [Some(x), Some(y), z] => Ok(Point3::new(x, y, z.unwrap_or(0.0))),
        _ => Err(DxfError::invalid(format!("{context} 缺少完整的 XY 坐标"))),
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_blocks_are_detected_case_insensitively() {
        assert!(is_layout_block("*Model_Space"));
        assert!(is_layout_block("*PAPER_SPACE0"));
        assert!(!is_layout_block("*U12"));
        assert!(!is_layout_block("DOOR"));
    }

    #[test]
    fn reader_tolerates_trailing_blank_lines() {
        let mut reader = DxfReader::new("0\nEOF\n\n\n");
        assert_eq!(reader.next_pair().unwrap(), Some((0, "EOF".to_string())));
        assert!(reader.next_pair().unwrap().is_none());
    }

    #[test]
    fn reader_reports_non_numeric_group_code() {
        let mut reader = DxfReader::new("zero\nSECTION\n");
        let err = reader.next_pair().unwrap_err();
        assert!(matches!(err, DxfError::Invalid { .. }));
    }

    #[test]
    fn insert_scale_defaults_follow_x_scale() {
        let body: Body = vec![
            (2, "SYM".into()),
            (8, "BLOCKS".into()),
            (10, "5".into()),
            (20, "6".into()),
            (41, "2".into()),
            (50, "90".into()),
        ];
        match build_insert(&body).unwrap() {
            Primitive::Insert(reference) => {
                assert_eq!(reference.definition, "SYM");
                assert_eq!(reference.layer, "BLOCKS");
                assert_eq!(reference.transform.scale, DVec3::new(2.0, 2.0, 2.0));
                assert!((reference.transform.rotation - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
                assert!(
                    reference
                        .transform
                        .translation
                        .max_abs_diff(Point3::new(5.0, 6.0, 0.0))
                        < 1e-12
                );
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn lwpolyline_applies_shared_elevation() {
        let body: Body = vec![
            (8, "FOUND".into()),
            (38, "7.5".into()),
            (70, "1".into()),
            (10, "0".into()),
            (20, "0".into()),
            (10, "2".into()),
            (20, "0".into()),
        ];
        match build_lwpolyline(&body).unwrap() {
            Primitive::Polyline(polyline) => {
                assert!(polyline.is_closed);
                assert_eq!(polyline.vertices.len(), 2);
                assert!(polyline.vertices.iter().all(|v| (v.z() - 7.5).abs() < 1e-12));
            }
            other => panic!("expected polyline, got {other:?}"),
        }
    }
}

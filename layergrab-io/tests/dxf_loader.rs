use std::io::Write;

use layergrab_core::{
    document::{CurveKind, Primitive},
    geometry::Point3,
};
use layergrab_io::{DocumentLoader, DxfFacade, IoError};

/// 将若干 (组码, 值) 拼成 ASCII DXF 文本。
fn dxf(pairs: &[(i32, &str)]) -> String {
    let mut out = String::new();
    for (code, value) in pairs {
        out.push_str(&format!("{code}\n{value}\n"));
    }
    out
}

fn nested_block_fixture() -> String {
    dxf(&[
        (0, "SECTION"),
        (2, "HEADER"),
        (9, "$ACADVER"),
        (1, "AC1027"),
        (0, "ENDSEC"),
        (0, "SECTION"),
        (2, "BLOCKS"),
        (0, "BLOCK"),
        (2, "*Model_Space"),
        (70, "0"),
        (10, "0"),
        (20, "0"),
        (0, "ENDBLK"),
        (0, "BLOCK"),
        (2, "PANEL"),
        (70, "0"),
        (10, "5"),
        (20, "5"),
        (30, "0"),
        (0, "LWPOLYLINE"),
        (8, "FOUND"),
        (90, "4"),
        (70, "1"),
        (10, "5"),
        (20, "5"),
        (10, "7"),
        (20, "5"),
        (10, "7"),
        (20, "7"),
        (10, "5"),
        (20, "7"),
        (0, "INSERT"),
        (8, "0"),
        (2, "BOLT"),
        (10, "6"),
        (20, "6"),
        (0, "ENDBLK"),
        (8, "0"),
        (0, "BLOCK"),
        (2, "BOLT"),
        (10, "0"),
        (20, "0"),
        (0, "CIRCLE"),
        (8, "FOUND"),
        (10, "0"),
        (20, "0"),
        (40, "0.25"),
        (0, "ENDBLK"),
        (0, "ENDSEC"),
        (0, "SECTION"),
        (2, "ENTITIES"),
        (0, "LINE"),
        (8, "FOUND"),
        (10, "0"),
        (20, "0"),
        (30, "1.5"),
        (11, "10"),
        (21, "0"),
        (31, "1.5"),
        (0, "INSERT"),
        (8, "SYMBOLS"),
        (66, "1"),
        (2, "PANEL"),
        (10, "100"),
        (20, "200"),
        (41, "2"),
        (50, "90"),
        (0, "ATTRIB"),
        (8, "SYMBOLS"),
        (2, "TAG"),
        (1, "P-1"),
        (0, "SEQEND"),
        (0, "POLYLINE"),
        (8, "FOUND"),
        (66, "1"),
        (70, "1"),
        (30, "3"),
        (0, "VERTEX"),
        (8, "FOUND"),
        (10, "1"),
        (20, "1"),
        (0, "VERTEX"),
        (8, "FOUND"),
        (10, "4"),
        (20, "1"),
        (0, "VERTEX"),
        (8, "FOUND"),
        (10, "4"),
        (20, "3"),
        (0, "SEQEND"),
        (0, "HATCH"),
        (8, "FOUND"),
        (2, "SOLID"),
        (0, "LINE"),
        (8, "Found"),
        (10, "abc"),
        (20, "0"),
        (11, "1"),
        (21, "1"),
        (0, "POINT"),
        (8, "MARKS"),
        (10, "3"),
        (20, "4"),
        (30, "5"),
        (0, "ENDSEC"),
        (0, "EOF"),
    ])
}

#[test]
fn load_nested_blocks_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
    file.write_all(nested_block_fixture().as_bytes())
        .expect("写入临时 DXF 失败");

    let drawing = DxfFacade::new().load(file.path()).expect("读取 DXF 失败");

    let model = drawing.definition("*MODEL_SPACE").expect("缺少模型空间块");
    assert!(model.is_layout);

    let panel = drawing.definition("panel").expect("缺少 PANEL 块");
    assert!(!panel.is_layout);
    assert_eq!(panel.primitives.len(), 2);
    match &panel.primitives[0] {
        Primitive::Polyline(polyline) => {
            assert!(polyline.is_closed);
            // 基点 (5,5) 已平移到局部原点
            assert!(polyline.vertices[0].max_abs_diff(Point3::new(0.0, 0.0, 0.0)) < 1e-12);
            assert!(polyline.vertices[2].max_abs_diff(Point3::new(2.0, 2.0, 0.0)) < 1e-12);
        }
        other => panic!("期望多段线，实际为 {other:?}"),
    }
    match &panel.primitives[1] {
        Primitive::Insert(reference) => {
            assert_eq!(reference.definition, "BOLT");
            assert!(
                reference
                    .transform
                    .translation
                    .max_abs_diff(Point3::new(1.0, 1.0, 0.0))
                    < 1e-12
            );
        }
        other => panic!("期望块参照，实际为 {other:?}"),
    }

    let bolt = drawing.definition("BOLT").expect("缺少 BOLT 块");
    match &bolt.primitives[0] {
        Primitive::Curve(curve) => {
            assert_eq!(curve.kind, CurveKind::Circle);
            assert_eq!(curve.layer, "FOUND");
        }
        other => panic!("期望圆，实际为 {other:?}"),
    }
}

#[test]
fn load_top_level_entities_in_order() {
    let drawing = DxfFacade::new()
        .parse_str(&nested_block_fixture())
        .expect("解析 DXF 失败");

    let kinds: Vec<&str> = drawing.entities().map(|(_, p)| p.kind()).collect();
    assert_eq!(kinds, vec!["LINE", "INSERT", "POLYLINE", "HATCH", "LINE", "POINT"]);

    let entities: Vec<_> = drawing.entities().collect();
    match &entities[0].1 {
        Primitive::Line(line) => {
            assert!((line.start.z() - 1.5).abs() < 1e-12);
            assert!(line.end.max_abs_diff(Point3::new(10.0, 0.0, 1.5)) < 1e-12);
        }
        other => panic!("期望线段，实际为 {other:?}"),
    }
    match &entities[1].1 {
        Primitive::Insert(reference) => {
            assert_eq!(reference.definition, "PANEL");
            assert_eq!(reference.layer, "SYMBOLS");
            assert!((reference.transform.scale.y - 2.0).abs() < 1e-12);
            assert!((reference.transform.rotation.to_degrees() - 90.0).abs() < 1e-9);
        }
        other => panic!("期望块参照，实际为 {other:?}"),
    }
    match &entities[2].1 {
        Primitive::Polyline(polyline) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.vertices.len(), 3);
            assert!(polyline.vertices.iter().all(|v| (v.z() - 3.0).abs() < 1e-12));
        }
        other => panic!("期望旧式多段线，实际为 {other:?}"),
    }
    match &entities[5].1 {
        Primitive::Curve(curve) => {
            assert_eq!(curve.kind, CurveKind::Point);
            assert!(curve.anchor.max_abs_diff(Point3::new(3.0, 4.0, 5.0)) < 1e-12);
        }
        other => panic!("期望点，实际为 {other:?}"),
    }
}

#[test]
fn unreadable_entities_are_kept_as_unsupported() {
    let drawing = DxfFacade::new()
        .parse_str(&nested_block_fixture())
        .expect("解析 DXF 失败");

    let unsupported: Vec<_> = drawing
        .entities()
        .filter_map(|(_, p)| match p {
            Primitive::Unsupported(u) => Some(u),
            _ => None,
        })
        .collect();
    assert_eq!(unsupported.len(), 2);
    assert_eq!(unsupported[0].kind, "HATCH");
    assert_eq!(unsupported[0].layer, "FOUND");
    assert_eq!(unsupported[1].kind, "LINE");
    assert_eq!(unsupported[1].layer, "Found");
    assert!(unsupported[1].reason.as_deref().unwrap_or_default().contains("abc"));
}

#[test]
fn missing_endsec_is_invalid() {
    let text = dxf(&[(0, "SECTION"), (2, "ENTITIES"), (0, "LINE"), (8, "0")]);
    let err = DxfFacade::new().parse_str(&text).unwrap_err();
    assert!(matches!(err, IoError::InvalidDocument(_)));
}

#[test]
fn missing_file_reports_read_error() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let err = DxfFacade::new()
        .load(&dir.path().join("absent.dxf"))
        .unwrap_err();
    assert!(matches!(err, IoError::ReadError { .. }));
}

#[test]
fn binary_dxf_is_rejected_as_unsupported() {
    let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
    file.write_all(b"AutoCAD Binary DXF\r\n\x1a\x00\x00\x00\xff\xfe")
        .expect("写入临时 DXF 失败");
    let err = DxfFacade::new().load(file.path()).unwrap_err();
    assert!(matches!(err, IoError::UnsupportedFeature(feature) if feature == "binary DXF"));
}

#[test]
fn non_utf8_layer_names_are_decoded_lossily() {
    // 图层名 "地基" 的 GBK 编码
    let mut bytes = b"0\nSECTION\n2\nENTITIES\n0\nLINE\n8\n".to_vec();
    bytes.extend_from_slice(b"\xb5\xd8\xbb\xf9");
    bytes.extend_from_slice(b"\n10\n1\n20\n2\n30\n0\n11\n4\n21\n6\n31\n0\n0\nENDSEC\n0\nEOF\n");
    let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
    file.write_all(&bytes).expect("写入临时 DXF 失败");

    let drawing = DxfFacade::new().load(file.path()).expect("读取 DXF 失败");

    let entities: Vec<_> = drawing.entities().collect();
    assert_eq!(entities.len(), 1);
    match &entities[0].1 {
        Primitive::Line(line) => {
            assert!(line.layer.contains('\u{FFFD}'));
            assert!(line.start.max_abs_diff(Point3::new(1.0, 2.0, 0.0)) < 1e-12);
            assert!(line.end.max_abs_diff(Point3::new(4.0, 6.0, 0.0)) < 1e-12);
        }
        other => panic!("期望线段，实际为 {other:?}"),
    }
}

pub mod geometry {
    use glam::{DAffine3, DQuat, DVec3};
    use serde::{Deserialize, Serialize};

    /// 三维点，内部以 `glam::DVec3` 表示。世界坐标或局部坐标取决于上下文。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn origin() -> Self {
            Self(DVec3::ZERO)
        }

        #[inline]
        pub fn from_vec(vec: DVec3) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn translate(self, offset: DVec3) -> Self {
            Self(self.0 + offset)
        }

        /// 各分量与 `other` 的最大绝对差，测试与比较时使用。
        #[inline]
        pub fn max_abs_diff(self, other: Point3) -> f64 {
            (self.0 - other.0).abs().max_element()
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 轴对齐包围盒。构造后总是规范化（每个轴上 `min <= max`）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct BoundingBox {
        min: Point3,
        max: Point3,
    }

    impl BoundingBox {
        /// 以任意两个角点构造，并立即规范化。
        pub fn new(a: Point3, b: Point3) -> Self {
            Self {
                min: Point3(a.0.min(b.0)),
                max: Point3(a.0.max(b.0)),
            }
        }

        pub fn from_points<I>(points: I) -> Option<Self>
        where
            I: IntoIterator<Item = Point3>,
        {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(point);
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
                max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y() || self.min.z() > self.max.z()
        }

        #[inline]
        pub fn min(&self) -> Point3 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point3 {
            self.max
        }

        pub fn include_point(&mut self, point: Point3) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = Point3(self.min.0.min(point.0));
            self.max = Point3(self.max.0.max(point.0));
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        #[inline]
        pub fn center(&self) -> Point3 {
            debug_assert!(!self.is_empty());
            Point3((self.min.0 + self.max.0) * 0.5)
        }

        /// 在 XY 平面上向四周各扩张 `margin`，Z 保持不变。
        pub fn expanded_xy(&self, margin: f64) -> Self {
            let offset = DVec3::new(margin, margin, 0.0);
            Self::new(Point3(self.min.0 - offset), Point3(self.max.0 + offset))
        }

        /// 二维（XY）范围是否相交，边界接触视为相交。
        pub fn overlaps_xy(&self, other: &BoundingBox) -> bool {
            self.min.x() <= other.max.x()
                && other.min.x() <= self.max.x()
                && self.min.y() <= other.max.y()
                && other.min.y() <= self.max.y()
        }
    }

    /// 实例放置变换：先缩放，再绕 Z 轴旋转（弧度），最后平移。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct AffineTransform {
        pub scale: DVec3,
        pub rotation: f64,
        pub translation: Point3,
    }

    impl AffineTransform {
        #[inline]
        pub fn new(scale: DVec3, rotation: f64, translation: Point3) -> Self {
            Self {
                scale,
                rotation,
                translation,
            }
        }

        #[inline]
        pub fn identity() -> Self {
            Self::new(DVec3::ONE, 0.0, Point3::origin())
        }

        #[inline]
        pub fn translation(offset: Point3) -> Self {
            Self::new(DVec3::ONE, 0.0, offset)
        }

        /// 将局部点映射到父空间。NaN 等非法输入按浮点规则传播，不做特殊处理。
        pub fn apply(&self, local: Point3) -> Point3 {
            let scaled = local.0 * self.scale;
            let (sin, cos) = self.rotation.sin_cos();
            let rotated = DVec3::new(
                scaled.x * cos - scaled.y * sin,
                scaled.x * sin + scaled.y * cos,
                scaled.z,
            );
            Point3(rotated + self.translation.0)
        }

        /// 等价的仿射矩阵，便于与嵌套变换做整体组合。
        pub fn to_affine(&self) -> DAffine3 {
            DAffine3::from_scale_rotation_translation(
                self.scale,
                DQuat::from_rotation_z(self.rotation),
                self.translation.0,
            )
        }
    }

    impl Default for AffineTransform {
        fn default() -> Self {
            Self::identity()
        }
    }

    /// 图层名，比较时忽略大小写。
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LayerTag(String);

    impl LayerTag {
        pub fn new(name: impl AsRef<str>) -> Self {
            Self(name.as_ref().to_lowercase())
        }

        #[inline]
        pub fn as_str(&self) -> &str {
            &self.0
        }

        #[inline]
        pub fn matches(&self, layer: &str) -> bool {
            self.0 == layer.to_lowercase()
        }
    }
}

pub mod document {
    use std::collections::HashMap;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{AffineTransform, BoundingBox, LayerTag, Point3};

    /// 默认图层名，与 DXF 约定一致。
    pub const DEFAULT_LAYER: &str = "0";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    /// 图元：每个图元恰好属于一个图层，并位于某个块定义或顶层空间中。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Primitive {
        Line(Line),
        Polyline(Polyline),
        Curve(Curve),
        Insert(InstanceReference),
        Unsupported(Unsupported),
    }

    impl Primitive {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Primitive::Line(line) => &line.layer,
                Primitive::Polyline(polyline) => &polyline.layer,
                Primitive::Curve(curve) => &curve.layer,
                Primitive::Insert(reference) => &reference.layer,
                Primitive::Unsupported(unsupported) => &unsupported.layer,
            }
        }

        #[inline]
        pub fn is_on(&self, layer: &LayerTag) -> bool {
            layer.matches(self.layer_name())
        }

        pub fn kind(&self) -> &str {
            match self {
                Primitive::Line(_) => "LINE",
                Primitive::Polyline(_) => "POLYLINE",
                Primitive::Curve(curve) => curve.kind.dxf_name(),
                Primitive::Insert(_) => "INSERT",
                Primitive::Unsupported(unsupported) => &unsupported.kind,
            }
        }

        /// 图元在所在容器坐标系中的包围盒。块参照与无法解析的图元返回 `None`。
        pub fn bounds(&self) -> Option<BoundingBox> {
            match self {
                Primitive::Line(line) => Some(BoundingBox::new(line.start, line.end)),
                Primitive::Polyline(polyline) => {
                    BoundingBox::from_points(polyline.vertices.iter().copied())
                }
                Primitive::Curve(curve) => Some(
                    curve
                        .extent
                        .unwrap_or_else(|| BoundingBox::new(curve.anchor, curve.anchor)),
                ),
                Primitive::Insert(_) | Primitive::Unsupported(_) => None,
            }
        }

        fn rebase(&mut self, offset: DVec3) {
            match self {
                Primitive::Line(line) => {
                    line.start = line.start.translate(offset);
                    line.end = line.end.translate(offset);
                }
                Primitive::Polyline(polyline) => {
                    for vertex in &mut polyline.vertices {
                        *vertex = vertex.translate(offset);
                    }
                }
                Primitive::Curve(curve) => {
                    curve.anchor = curve.anchor.translate(offset);
                    if let Some(extent) = curve.extent.as_mut() {
                        *extent =
                            BoundingBox::new(extent.min().translate(offset), extent.max().translate(offset));
                    }
                }
                Primitive::Insert(reference) => {
                    reference.transform.translation =
                        reference.transform.translation.translate(offset);
                }
                Primitive::Unsupported(_) => {}
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point3,
        pub end: Point3,
        pub layer: String,
    }

    /// 多段线顶点。若源数据只给出统一标高，加载时已写入每个顶点的 Z。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point3>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum CurveKind {
        Circle,
        Arc,
        Ellipse,
        Point,
    }

    impl CurveKind {
        pub fn dxf_name(self) -> &'static str {
            match self {
                CurveKind::Circle => "CIRCLE",
                CurveKind::Arc => "ARC",
                CurveKind::Ellipse => "ELLIPSE",
                CurveKind::Point => "POINT",
            }
        }
    }

    /// 曲线或点类图元：代表点为锚点（圆心/点位置），范围单独保存。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Curve {
        pub kind: CurveKind,
        pub anchor: Point3,
        pub extent: Option<BoundingBox>,
        pub layer: String,
    }

    impl Curve {
        pub fn point(position: Point3, layer: impl Into<String>) -> Self {
            Self {
                kind: CurveKind::Point,
                anchor: position,
                extent: None,
                layer: layer.into(),
            }
        }

        pub fn circle(center: Point3, radius: f64, layer: impl Into<String>) -> Self {
            let radius = radius.abs();
            let offset = DVec3::new(radius, radius, 0.0);
            Self {
                kind: CurveKind::Circle,
                anchor: center,
                extent: Some(BoundingBox::new(
                    Point3(center.0 - offset),
                    Point3(center.0 + offset),
                )),
                layer: layer.into(),
            }
        }

        /// 圆弧，角度为弧度，按逆时针从 `start_angle` 到 `end_angle`。
        pub fn arc(
            center: Point3,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> Self {
            Self {
                kind: CurveKind::Arc,
                anchor: center,
                extent: Some(arc_extent(center, radius.abs(), start_angle, end_angle)),
                layer: layer.into(),
            }
        }

        /// 椭圆（或椭圆弧）。`major_axis` 为相对圆心的长轴端点向量。
        pub fn ellipse(
            center: Point3,
            major_axis: DVec3,
            ratio: f64,
            start_parameter: f64,
            end_parameter: f64,
            layer: impl Into<String>,
        ) -> Self {
            Self {
                kind: CurveKind::Ellipse,
                anchor: center,
                extent: Some(ellipse_extent(
                    center,
                    major_axis,
                    ratio,
                    start_parameter,
                    end_parameter,
                )),
                layer: layer.into(),
            }
        }
    }

    /// 块参照：指向某个块定义并携带自身的放置变换。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct InstanceReference {
        pub definition: String,
        pub transform: AffineTransform,
        pub layer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub layer_override: Option<String>,
    }

    impl InstanceReference {
        pub fn new(
            definition: impl Into<String>,
            transform: AffineTransform,
            layer: impl Into<String>,
        ) -> Self {
            Self {
                definition: definition.into(),
                transform,
                layer: layer.into(),
                layer_override: None,
            }
        }

        /// 参照自身的有效图层：存在覆盖时取覆盖值。
        #[inline]
        pub fn effective_layer(&self) -> &str {
            self.layer_override.as_deref().unwrap_or(&self.layer)
        }
    }

    /// 读取阶段无法解释的实体，仅保留类型名、图层与原因。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Unsupported {
        pub kind: String,
        pub layer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub reason: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Definition {
        pub name: String,
        pub is_layout: bool,
        pub primitives: Vec<Primitive>,
    }

    impl Definition {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                is_layout: false,
                primitives: Vec::new(),
            }
        }

        pub fn layout(name: impl Into<String>) -> Self {
            Self {
                is_layout: true,
                ..Self::new(name)
            }
        }

        pub fn with_primitive(mut self, primitive: Primitive) -> Self {
            self.primitives.push(primitive);
            self
        }

        /// 平移全部内容，使 `base_point` 落在局部原点。
        pub fn rebase(&mut self, base_point: Point3) {
            let offset = -base_point.as_vec3();
            if offset == DVec3::ZERO {
                return;
            }
            for primitive in &mut self.primitives {
                primitive.rebase(offset);
            }
        }
    }

    /// 内存中的图纸：顶层空间实体加块定义表。块名查找忽略大小写。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Drawing {
        layers: HashMap<String, Layer>,
        entities: Vec<(EntityId, Primitive)>,
        next_entity_id: u64,
        definitions: HashMap<String, Definition>,
    }

    impl Drawing {
        pub fn new() -> Self {
            let mut drawing = Self::default();
            drawing.ensure_layer(DEFAULT_LAYER);
            drawing
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let name = name.as_ref();
            self.layers
                .entry(name.to_lowercase())
                .or_insert_with(|| Layer::new(name));
        }

        pub fn add_line(&mut self, start: Point3, end: Point3, layer: impl Into<String>) -> EntityId {
            self.add_primitive(Primitive::Line(Line {
                start,
                end,
                layer: layer.into(),
            }))
        }

        pub fn add_polyline<I>(&mut self, vertices: I, is_closed: bool, layer: impl Into<String>) -> EntityId
        where
            I: IntoIterator<Item = Point3>,
        {
            self.add_primitive(Primitive::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer: layer.into(),
            }))
        }

        pub fn add_circle(&mut self, center: Point3, radius: f64, layer: impl Into<String>) -> EntityId {
            self.add_primitive(Primitive::Curve(Curve::circle(center, radius, layer)))
        }

        pub fn add_insert(
            &mut self,
            definition: impl Into<String>,
            transform: AffineTransform,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_primitive(Primitive::Insert(InstanceReference::new(
                definition, transform, layer,
            )))
        }

        pub fn add_primitive(&mut self, primitive: Primitive) -> EntityId {
            self.ensure_layer(primitive.layer_name());
            let id = self.next_id();
            self.entities.push((id, primitive));
            id
        }

        pub fn add_definition(&mut self, definition: Definition) {
            for primitive in &definition.primitives {
                self.ensure_layer(primitive.layer_name());
            }
            self.definitions
                .insert(definition.name.to_lowercase(), definition);
        }

        #[inline]
        pub fn definition(&self, name: &str) -> Option<&Definition> {
            self.definitions.get(&name.to_lowercase())
        }

        #[inline]
        pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
            self.definitions.values()
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Primitive)> {
            self.entities.iter()
        }

        pub fn entity(&self, id: EntityId) -> Option<&Primitive> {
            self.entities
                .iter()
                .find_map(|(entity_id, primitive)| (*entity_id == id).then_some(primitive))
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_point(center: Point3, radius: f64, angle: f64) -> Point3 {
        center.translate(DVec3::new(radius * angle.cos(), radius * angle.sin(), 0.0))
    }

    fn arc_extent(center: Point3, radius: f64, start_angle: f64, end_angle: f64) -> BoundingBox {
        if radius <= f64::EPSILON {
            return BoundingBox::new(center, center);
        }
        let mut bounds = BoundingBox::empty();

        let (start, end) = canonical_interval(start_angle, end_angle);
        bounds.include_point(arc_point(center, radius, start));
        bounds.include_point(arc_point(center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(arc_point(center, radius, candidate));
            }
        }
        bounds
    }

    fn ellipse_extent(
        center: Point3,
        major_axis: DVec3,
        ratio: f64,
        start_parameter: f64,
        end_parameter: f64,
    ) -> BoundingBox {
        let major_length = major_axis.length();
        if major_length <= f64::EPSILON {
            return BoundingBox::new(center, center);
        }
        let minor_dir = DVec3::new(-major_axis.y, major_axis.x, 0.0) / major_length;
        let minor_axis = minor_dir * major_length * ratio.abs();

        let start = start_parameter;
        let mut end = end_parameter;
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else {
            while end < start {
                end += TAU;
            }
        }
        let span = end - start;
        let step_count = ((span / (TAU / 64.0)).ceil() as usize).max(16);
        let mut bounds = BoundingBox::empty();
        for i in 0..=step_count {
            let t = start + span * (i as f64 / step_count as f64);
            bounds.include_point(center.translate(major_axis * t.cos() + minor_axis * t.sin()));
        }
        bounds
    }

}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_3};

    use glam::DVec3;

    use crate::geometry::{AffineTransform, BoundingBox, LayerTag, Point3};

    #[test]
    fn bounding_box_is_normalized_on_construction() {
        let bounds = BoundingBox::new(Point3::new(5.0, -1.0, 3.0), Point3::new(1.0, 4.0, -2.0));
        assert_eq!(bounds.min(), Point3::new(1.0, -1.0, -2.0));
        assert_eq!(bounds.max(), Point3::new(5.0, 4.0, 3.0));
        assert!((bounds.width() - 4.0).abs() < 1e-12);
        assert!((bounds.height() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn expanded_boxes_overlap_when_within_margin() {
        let a = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        let b = BoundingBox::new(Point3::new(1.1, 0.0, 0.0), Point3::new(2.0, 1.0, 0.0));
        assert!(!a.overlaps_xy(&b));
        assert!(a.expanded_xy(0.06).overlaps_xy(&b.expanded_xy(0.06)));
    }

    #[test]
    fn quarter_turn_maps_x_axis_onto_y_axis() {
        let transform = AffineTransform::new(DVec3::ONE, FRAC_PI_2, Point3::origin());
        let mapped = transform.apply(Point3::new(1.0, 0.0, 0.0));
        assert!(mapped.max_abs_diff(Point3::new(0.0, 1.0, 0.0)) < 1e-9);
    }

    #[test]
    fn scale_applies_before_rotation_and_translation() {
        let transform = AffineTransform::new(
            DVec3::new(2.0, 3.0, 4.0),
            FRAC_PI_2,
            Point3::new(10.0, 20.0, 30.0),
        );
        let mapped = transform.apply(Point3::new(1.0, 1.0, 1.0));
        // (2,3,4) 旋转 90° 得 (-3,2,4)
        assert!(mapped.max_abs_diff(Point3::new(7.0, 22.0, 34.0)) < 1e-9);
    }

    #[test]
    fn nested_application_matches_matrix_composition() {
        let a = AffineTransform::new(DVec3::new(2.0, 0.5, 1.0), FRAC_PI_3, Point3::new(10.0, -4.0, 1.0));
        let b = AffineTransform::new(DVec3::new(1.5, 1.5, 1.5), -0.7, Point3::new(250.0, 900.0, 0.0));
        let c = AffineTransform::new(DVec3::new(0.25, 3.0, 1.0), 2.1, Point3::new(4000.0, 1234.5, -6.0));

        let left = (c.to_affine() * b.to_affine()) * a.to_affine();
        let right = c.to_affine() * (b.to_affine() * a.to_affine());

        for local in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(123.4, 567.8, 9.0),
            Point3::new(9_999.0, 10_000.0, 42.0),
        ] {
            let stepwise = c.apply(b.apply(a.apply(local)));
            let via_left = Point3::from(left.transform_point3(local.as_vec3()));
            let via_right = Point3::from(right.transform_point3(local.as_vec3()));
            assert!(stepwise.max_abs_diff(via_left) < 1e-9);
            assert!(via_left.max_abs_diff(via_right) < 1e-9);
        }
    }

    #[test]
    fn layer_tags_compare_case_insensitively() {
        let tag = LayerTag::new("Found");
        assert!(tag.matches("FOUND"));
        assert!(tag.matches("found"));
        assert!(!tag.matches("FOUNDATION"));
        assert_eq!(tag, LayerTag::new("fOuNd"));
    }
}

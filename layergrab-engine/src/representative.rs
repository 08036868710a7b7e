use layergrab_core::geometry::{BoundingBox, Point3};
use serde::{Deserialize, Serialize};

/// 宽或高不超过该值时视为退化，角点模式回退为中心点。
const DEGENERATE_EXTENT: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointMode {
    #[default]
    Center,
    Corners,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CornerTag {
    #[serde(rename = "NW")]
    Nw,
    #[serde(rename = "NE")]
    Ne,
    #[serde(rename = "SW")]
    Sw,
    #[serde(rename = "SE")]
    Se,
    #[serde(rename = "center")]
    Center,
}

impl CornerTag {
    pub fn as_str(self) -> &'static str {
        match self {
            CornerTag::Nw => "NW",
            CornerTag::Ne => "NE",
            CornerTag::Sw => "SW",
            CornerTag::Se => "SE",
            CornerTag::Center => "center",
        }
    }
}

/// 将一组点归约为一个中心点或四个角点。空输入得到空输出。
pub fn reduce(points: &[Point3], mode: PointMode) -> Vec<(Point3, CornerTag)> {
    let Some(bounds) = BoundingBox::from_points(points.iter().copied()) else {
        return Vec::new();
    };
    if points.len() == 1 {
        return vec![(points[0], CornerTag::Center)];
    }

    let z = average_z(points);
    match mode {
        PointMode::Center => vec![(center_of(&bounds, z), CornerTag::Center)],
        PointMode::Corners => {
            if bounds.width() <= DEGENERATE_EXTENT || bounds.height() <= DEGENERATE_EXTENT {
                return vec![(center_of(&bounds, z), CornerTag::Center)];
            }
            let (min, max) = (bounds.min(), bounds.max());
            vec![
                (Point3::new(min.x(), max.y(), z), CornerTag::Nw),
                (Point3::new(max.x(), max.y(), z), CornerTag::Ne),
                (Point3::new(min.x(), min.y(), z), CornerTag::Sw),
                (Point3::new(max.x(), min.y(), z), CornerTag::Se),
            ]
        }
    }
}

fn center_of(bounds: &BoundingBox, z: f64) -> Point3 {
    let center = bounds.center();
    Point3::new(center.x(), center.y(), z)
}

fn average_z(points: &[Point3]) -> f64 {
    points.iter().map(|p| p.z()).sum::<f64>() / points.len() as f64
}

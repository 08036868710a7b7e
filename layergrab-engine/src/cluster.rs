//! 顶层图元的近似空间聚类：网格哈希 + 并查集。
//!
//! 容差与网格尺寸都由包围盒尺寸的中位数推导，只用于近似“一个绘制形状”，
//! 对稀疏或很不规则的布局可能误分组。

use std::collections::HashMap;

use layergrab_core::geometry::BoundingBox;
use tracing::trace;

const MIN_TOLERANCE: f64 = 1e-6;
const TOLERANCE_RATIO: f64 = 0.02;
const CELL_RATIO: f64 = 1.5;
const MIN_CELL: f64 = 1.0;
/// 覆盖格子数超过该值的包围盒不入网格，改为与全部候选直接比较。
const MAX_CELLS_PER_BOX: i64 = 4096;

/// 由候选包围盒推导出的聚类参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub typical: f64,
    pub tolerance: f64,
    pub cell: f64,
}

impl ClusterParams {
    pub fn from_boxes(boxes: &[BoundingBox]) -> Self {
        let typical = median(boxes.iter().map(|b| b.width().max(b.height())).collect());
        Self {
            typical,
            tolerance: (typical * TOLERANCE_RATIO).max(MIN_TOLERANCE),
            cell: (typical * CELL_RATIO).max(MIN_CELL),
        }
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    }
}

/// 基于数组的并查集，按秩合并并做路径压缩。
#[derive(Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] = self.rank[root_x].saturating_add(1);
            }
        }
    }

    /// 按首次出现顺序返回各组成员；组内下标升序。
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for index in 0..self.parent.len() {
            let root = self.find(index);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(index);
        }
        groups
    }
}

/// 将二维范围（扩张容差后）相交的包围盒合并为一组。
///
/// 返回的分组按各组最小下标排序，结果与哈希表遍历顺序无关。
pub fn cluster_boxes(boxes: &[BoundingBox]) -> Vec<Vec<usize>> {
    if boxes.is_empty() {
        return Vec::new();
    }
    let params = ClusterParams::from_boxes(boxes);
    let expanded: Vec<BoundingBox> = boxes
        .iter()
        .map(|b| b.expanded_xy(params.tolerance))
        .collect();

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    let mut oversized: Vec<usize> = Vec::new();
    for (index, bounds) in expanded.iter().enumerate() {
        let finite = [bounds.min(), bounds.max()]
            .iter()
            .all(|p| p.x().is_finite() && p.y().is_finite());
        let x0 = cell_index(bounds.min().x(), params.cell);
        let x1 = cell_index(bounds.max().x(), params.cell);
        let y0 = cell_index(bounds.min().y(), params.cell);
        let y1 = cell_index(bounds.max().y(), params.cell);
        let span = cell_span(x0, x1)
            .zip(cell_span(y0, y1))
            .and_then(|(w, h)| w.checked_mul(h));
        // 非有限坐标或格子数溢出的包围盒同样走全量比较
        if !finite || !matches!(span, Some(n) if n <= MAX_CELLS_PER_BOX) {
            oversized.push(index);
            continue;
        }
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                grid.entry((cx, cy)).or_default().push(index);
            }
        }
    }

    let mut sets = UnionFind::new(boxes.len());
    for members in grid.values() {
        for (offset, &a) in members.iter().enumerate() {
            for &b in &members[offset + 1..] {
                if expanded[a].overlaps_xy(&expanded[b]) {
                    sets.union(a, b);
                }
            }
        }
    }
    for &big in &oversized {
        for other in 0..boxes.len() {
            if other != big && expanded[big].overlaps_xy(&expanded[other]) {
                sets.union(big, other);
            }
        }
    }

    let groups = sets.groups();
    trace!(
        candidates = boxes.len(),
        clusters = groups.len(),
        typical = params.typical,
        tolerance = params.tolerance,
        cell = params.cell,
        oversized = oversized.len(),
        "聚类完成"
    );
    groups
}

fn cell_index(value: f64, cell: f64) -> i64 {
    // `as` 对超范围饱和，调用方已排除非有限值
    (value / cell).floor() as i64
}

fn cell_span(lo: i64, hi: i64) -> Option<i64> {
    hi.checked_sub(lo)?.checked_add(1)
}

#[cfg(test)]
mod tests {
    use layergrab_core::geometry::Point3;

    use super::*;

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(Point3::new(x0, y0, 0.0), Point3::new(x1, y1, 0.0))
    }

    #[test]
    fn params_follow_median_size() {
        let boxes = [bbox(0.0, 0.0, 10.0, 1.0), bbox(0.0, 0.0, 2.0, 4.0), bbox(0.0, 0.0, 6.0, 6.0)];
        let params = ClusterParams::from_boxes(&boxes);
        assert!((params.typical - 6.0).abs() < 1e-12);
        assert!((params.tolerance - 0.12).abs() < 1e-12);
        assert!((params.cell - 9.0).abs() < 1e-12);

        let tiny = ClusterParams::from_boxes(&[bbox(0.0, 0.0, 0.0, 0.0)]);
        assert!((tiny.tolerance - MIN_TOLERANCE).abs() < 1e-18);
        assert!((tiny.cell - MIN_CELL).abs() < 1e-12);
    }

    #[test]
    fn touching_edges_of_one_rectangle_form_one_cluster() {
        // 四条线段围成一个矩形
        let boxes = [
            bbox(0.0, 0.0, 4.0, 0.0),
            bbox(4.0, 0.0, 4.0, 4.0),
            bbox(0.0, 4.0, 4.0, 4.0),
            bbox(0.0, 0.0, 0.0, 4.0),
        ];
        assert_eq!(cluster_boxes(&boxes), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn boxes_within_tolerance_are_merged() {
        // typical = 2，tol = 0.04；间隙 0.05 < 2 × 0.04
        let boxes = [bbox(0.0, 0.0, 2.0, 2.0), bbox(2.05, 0.0, 4.05, 2.0)];
        assert_eq!(cluster_boxes(&boxes), vec![vec![0, 1]]);
    }

    #[test]
    fn boxes_separated_by_more_than_typical_size_stay_apart() {
        let boxes = [
            bbox(0.0, 0.0, 2.0, 2.0),
            bbox(10.0, 0.0, 12.0, 2.0),
            bbox(0.5, 0.5, 1.5, 1.5),
            bbox(10.0, 4.5, 12.0, 6.5),
        ];
        assert_eq!(cluster_boxes(&boxes), vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn chains_are_merged_transitively_across_cells() {
        let boxes: Vec<_> = (0..6)
            .map(|i| bbox(i as f64 * 2.0, 0.0, i as f64 * 2.0 + 2.0, 2.0))
            .collect();
        assert_eq!(cluster_boxes(&boxes), vec![(0..6).collect::<Vec<_>>()]);
    }

    #[test]
    fn oversized_boxes_still_join_their_neighbours() {
        let mut boxes: Vec<_> = (0..5)
            .map(|i| bbox(i as f64 * 100.0, 0.0, i as f64 * 100.0 + 1.0, 1.0))
            .collect();
        // 横跨全部小框的长线，覆盖格子数远超上限
        boxes.push(bbox(-50_000.0, 0.5, 50_000.0, 0.5));
        boxes.push(bbox(0.0, 500.0, 1.0, 501.0));
        let groups = cluster_boxes(&boxes);
        assert_eq!(groups, vec![vec![0, 1, 2, 3, 4, 5], vec![6]]);
    }

    #[test]
    fn unbounded_boxes_are_compared_without_the_grid() {
        // 1e400 之类的坐标读入后为无穷大
        let boxes = [
            bbox(0.0, 0.0, 1.0, 1.0),
            bbox(0.0, 0.0, f64::INFINITY, 0.0),
            bbox(5.0, 5.0, 6.0, 6.0),
        ];
        assert_eq!(cluster_boxes(&boxes), vec![vec![0, 1], vec![2]]);

        let far = [bbox(-1e300, 0.0, 1e300, 0.0), bbox(0.0, -0.5, 1.0, 0.5)];
        assert_eq!(cluster_boxes(&far), vec![vec![0, 1]]);
    }

    #[test]
    fn union_find_groups_keep_first_seen_order() {
        let mut sets = UnionFind::new(5);
        sets.union(3, 4);
        sets.union(1, 3);
        assert_eq!(sets.groups(), vec![vec![0], vec![1, 3, 4], vec![2]]);
    }

    #[test]
    fn empty_input_has_no_clusters() {
        assert!(cluster_boxes(&[]).is_empty());
    }
}

use std::collections::HashSet;

use layergrab_core::document::{EntityId, InstanceReference, Primitive};
use layergrab_core::geometry::{BoundingBox, LayerTag, Point3};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::cluster::cluster_boxes;
use crate::errors::{ExtractError, HostError, Warning};
use crate::host::HostDocument;
use crate::naming::Sequencer;
use crate::points::{local_points, read_failure};
use crate::representative::{CornerTag, PointMode, reduce};
use crate::resolver::{Resolver, ResolverCache};
use crate::retry::{RetryPolicy, invoke_with_retry};

pub const MAX_DECIMAL_PRECISION: u32 = 12;

/// 一次提取的参数。
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub target_layers: Vec<String>,
    pub mode: PointMode,
    pub id_prefix: String,
    pub start_number: u64,
    pub decimal_precision: u32,
    pub restrict_to_top_level_only: bool,
    pub restrict_to_selection_only: bool,
    /// 仅在 `restrict_to_selection_only` 时生效。
    pub selection: HashSet<EntityId>,
}

impl RunConfig {
    pub fn for_layers<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_layers: layers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_layers: Vec::new(),
            mode: PointMode::Center,
            id_prefix: "P".to_string(),
            start_number: 1,
            decimal_precision: 3,
            restrict_to_top_level_only: false,
            restrict_to_selection_only: false,
            selection: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputPoint {
    pub id: String,
    pub coordinates: Point3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner: Option<CornerTag>,
    pub source: String,
}

/// 提取结果：有序的输出点、非致命警告，以及结果为空时的说明。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub points: Vec<OutputPoint>,
    pub warnings: Vec<Warning>,
    pub message: Option<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 等待归约的一组点及其来源描述。
#[derive(Debug)]
struct Group {
    points: Vec<Point3>,
    source: String,
}

/// 提取会话：持有宿主文档、重试策略与解析缓存。
///
/// 目标图层集合与上一次运行不同时自动清空缓存；文档可能已修改时调用
/// [`Extractor::invalidate`]。
pub struct Extractor<H: HostDocument> {
    host: H,
    retry: RetryPolicy,
    cache: ResolverCache,
    last_layers: Option<Vec<LayerTag>>,
}

impl<H: HostDocument> Extractor<H> {
    pub fn new(host: H, retry: RetryPolicy, cache: ResolverCache) -> Self {
        Self {
            host,
            retry,
            cache,
            last_layers: None,
        }
    }

    #[inline]
    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    pub fn invalidate(&mut self) {
        debug!(entries = self.cache.len(), "丢弃解析缓存");
        self.cache.clear();
        self.last_layers = None;
    }

    pub fn run(&mut self, config: &RunConfig) -> Result<Extraction, ExtractError> {
        if config.decimal_precision > MAX_DECIMAL_PRECISION {
            return Err(ExtractError::InvalidPrecision(config.decimal_precision));
        }
        let layers = normalize_layers(&config.target_layers);
        if layers.is_empty() {
            return Err(ExtractError::NoTargetLayers);
        }
        if self.last_layers.as_ref() != Some(&layers) {
            if !self.cache.is_empty() {
                debug!("目标图层集合变化，清空解析缓存");
            }
            self.cache.clear();
            self.last_layers = Some(layers.clone());
        }

        let host = &self.host;
        let available = invoke_with_retry(&self.retry, HostError::is_retryable, || {
            host.layer_names()
        })
        .map_err(ExtractError::LayerEnumerationFailure)?;
        let present: Vec<LayerTag> = layers
            .iter()
            .filter(|tag| available.iter().any(|name| tag.matches(name)))
            .cloned()
            .collect();
        if present.is_empty() {
            let message = format!(
                "none of the requested layers exist in the document: {}",
                join_layers(&layers)
            );
            info!(layers = %join_layers(&layers), "目标图层不存在");
            return Ok(Extraction {
                message: Some(message),
                ..Extraction::default()
            });
        }

        let entities = invoke_with_retry(&self.retry, HostError::is_retryable, || {
            host.enumerate_top_level()
        })
        .map_err(ExtractError::DocumentUnavailable)?;
        let entities: Vec<(EntityId, Primitive)> = entities
            .into_iter()
            .filter(|(id, _)| {
                !config.restrict_to_selection_only || config.selection.contains(id)
            })
            .collect();

        let mut warnings = Vec::new();
        let mut groups = Vec::new();
        if config.restrict_to_top_level_only {
            debug!("仅处理顶层图元，跳过块参照");
        } else {
            let mut resolver = Resolver::new(host, &self.retry, &mut self.cache, &mut warnings);
            for (id, primitive) in &entities {
                if let Primitive::Insert(reference) = primitive {
                    groups.extend(occurrence_groups(&mut resolver, *id, reference, &present));
                }
            }
        }
        let instance_groups = groups.len();
        groups.extend(top_level_groups(&entities, &present, &mut warnings));

        let reduced: Vec<_> = groups
            .iter()
            .map(|group| (group, reduce(&group.points, config.mode)))
            .collect();
        let count: usize = reduced.iter().map(|(_, picked)| picked.len()).sum();
        // 最后一个编号为 start + count - 1，必须可表示
        let fits = u64::try_from(count)
            .ok()
            .and_then(|count| count.checked_sub(1))
            .map_or(true, |last| config.start_number.checked_add(last).is_some());
        if !fits {
            return Err(ExtractError::StartNumberOverflow {
                start: config.start_number,
                count,
            });
        }

        let mut sequencer = Sequencer::new(config.id_prefix.clone(), config.start_number);
        let mut points = Vec::with_capacity(count);
        for (group, picked) in reduced {
            for (point, corner) in picked {
                points.push(OutputPoint {
                    id: sequencer.next_id(Some(corner)),
                    coordinates: round_point(point, config.decimal_precision),
                    corner: Some(corner),
                    source: group.source.clone(),
                });
            }
        }

        let message = points.is_empty().then(|| {
            format!("no geometry found on layers {}", join_layers(&present))
        });
        info!(
            layers = %join_layers(&present),
            instance_groups,
            top_level_groups = groups.len() - instance_groups,
            points = points.len(),
            warnings = warnings.len(),
            cached = self.cache.len(),
            "提取完成"
        );
        Ok(Extraction {
            points,
            warnings,
            message,
        })
    }
}

/// 去重并保持首次出现顺序，忽略空白图层名。
fn normalize_layers(layers: &[String]) -> Vec<LayerTag> {
    let mut seen = HashSet::new();
    layers
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(LayerTag::new)
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

fn join_layers(layers: &[LayerTag]) -> String {
    layers
        .iter()
        .map(LayerTag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// 单个块参照放置的结果：各目标图层的几何合并后转到世界坐标，再按空间邻近分组。
fn occurrence_groups<H: HostDocument + ?Sized>(
    resolver: &mut Resolver<'_, H>,
    id: EntityId,
    reference: &InstanceReference,
    layers: &[LayerTag],
) -> Vec<Group> {
    let source = format!("insert `{}` #{}", reference.definition, id.get());
    let mut shapes: Vec<(BoundingBox, Vec<Point3>)> = Vec::new();
    for layer in layers {
        let local = resolver.resolve_shapes(&reference.definition, layer, &mut HashSet::new());
        for shape in local.iter() {
            let world: Vec<Point3> = shape
                .iter()
                .map(|point| reference.transform.apply(*point))
                .collect();
            if let Some(bounds) = BoundingBox::from_points(world.iter().copied()) {
                shapes.push((bounds, world));
            }
        }
    }

    if shapes.is_empty() {
        let effective = reference.effective_layer();
        if layers.iter().any(|layer| layer.matches(effective)) {
            trace!(block = %reference.definition, layer = effective, "块内无目标几何，使用插入点");
            return vec![Group {
                points: vec![reference.transform.translation],
                source: format!("{source} insertion point"),
            }];
        }
        return Vec::new();
    }

    let boxes: Vec<BoundingBox> = shapes.iter().map(|(bounds, _)| *bounds).collect();
    let clusters = cluster_boxes(&boxes);
    let single = clusters.len() == 1;
    clusters
        .into_iter()
        .enumerate()
        .map(|(index, members)| Group {
            points: members
                .iter()
                .flat_map(|&member| shapes[member].1.iter().copied())
                .collect(),
            source: if single {
                source.clone()
            } else {
                format!("{source} part {}", index + 1)
            },
        })
        .collect()
}

/// 顶层空间中目标图层上的非块参照图元，按空间邻近聚类。
fn top_level_groups(
    entities: &[(EntityId, Primitive)],
    layers: &[LayerTag],
    warnings: &mut Vec<Warning>,
) -> Vec<Group> {
    let mut candidates: Vec<(BoundingBox, Vec<Point3>)> = Vec::new();
    for (id, primitive) in entities {
        if matches!(primitive, Primitive::Insert(_))
            || !layers.iter().any(|layer| primitive.is_on(layer))
        {
            continue;
        }
        if let Some(reason) = read_failure(primitive) {
            warn!(
                entity = id.get(),
                kind = primitive.kind(),
                reason = %reason,
                "顶层图元几何无法读取"
            );
            warnings.push(Warning::PrimitiveReadFailure {
                container: format!("top-level entity #{}", id.get()),
                kind: primitive.kind().to_string(),
                layer: primitive.layer_name().to_string(),
                reason,
            });
            continue;
        }
        let points = local_points(primitive);
        let bounds = primitive
            .bounds()
            .or_else(|| BoundingBox::from_points(points.iter().copied()));
        if let Some(bounds) = bounds {
            candidates.push((bounds, points));
        }
    }

    let boxes: Vec<BoundingBox> = candidates.iter().map(|(bounds, _)| *bounds).collect();
    cluster_boxes(&boxes)
        .into_iter()
        .enumerate()
        .map(|(index, members)| Group {
            points: members
                .iter()
                .flat_map(|&member| candidates[member].1.iter().copied())
                .collect(),
            source: format!(
                "top-level cluster {} ({} primitives)",
                index + 1,
                members.len()
            ),
        })
        .collect()
}

fn round_point(point: Point3, precision: u32) -> Point3 {
    Point3::new(
        round_to(point.x(), precision),
        round_to(point.y(), precision),
        round_to(point.z(), precision),
    )
}

fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    // 避免输出 -0
    if rounded == 0.0 { 0.0 } else { rounded }
}

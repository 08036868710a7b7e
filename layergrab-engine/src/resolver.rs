use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use layergrab_core::document::{Definition, Primitive};
use layergrab_core::geometry::{LayerTag, Point3};
use tracing::{debug, trace, warn};

use crate::errors::{HostError, RetryError, Warning};
use crate::host::HostDocument;
use crate::points::{local_points, read_failure};
use crate::retry::{RetryPolicy, invoke_with_retry};

/// 块定义中目标图层上的几何，按叶子图元分组，坐标位于该定义的局部空间。
pub type Shapes = Vec<Vec<Point3>>;

/// `(块名, 图层)`（均忽略大小写）到局部几何的缓存，同时记住已取回的块定义。
///
/// 缓存没有失效检测：目标图层集合变化或文档可能已修改时，调用方必须先 `clear`。
#[derive(Debug, Default)]
pub struct ResolverCache {
    entries: HashMap<(String, String), Rc<Shapes>>,
    definitions: HashMap<String, Option<Rc<Definition>>>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.definitions.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, definition: &str, layer: &LayerTag) -> Option<Rc<Shapes>> {
        self.entries
            .get(&(definition.to_lowercase(), layer.as_str().to_string()))
            .cloned()
    }

    fn insert(&mut self, key: &str, layer: &LayerTag, shapes: Rc<Shapes>) {
        self.entries
            .insert((key.to_string(), layer.as_str().to_string()), shapes);
    }
}

/// 递归展开块定义，收集指定图层上的点。
pub struct Resolver<'a, H: HostDocument + ?Sized> {
    host: &'a H,
    policy: &'a RetryPolicy,
    cache: &'a mut ResolverCache,
    warnings: &'a mut Vec<Warning>,
}

impl<'a, H: HostDocument + ?Sized> Resolver<'a, H> {
    pub fn new(
        host: &'a H,
        policy: &'a RetryPolicy,
        cache: &'a mut ResolverCache,
        warnings: &'a mut Vec<Warning>,
    ) -> Self {
        Self {
            host,
            policy,
            cache,
            warnings,
        }
    }

    /// 定义内目标图层上的全部点（调用方坐标系，尚未施加调用方自身的放置变换）。
    pub fn resolve(
        &mut self,
        definition: &str,
        layer: &LayerTag,
        visiting: &mut HashSet<String>,
    ) -> Vec<Point3> {
        self.resolve_shapes(definition, layer, visiting)
            .iter()
            .flatten()
            .copied()
            .collect()
    }

    /// 与 [`Resolver::resolve`] 相同，但保留叶子图元的分组。
    ///
    /// `visiting` 为当前递归路径上的块名（小写），进入子定义前插入、返回后移除。
    pub fn resolve_shapes(
        &mut self,
        definition: &str,
        layer: &LayerTag,
        visiting: &mut HashSet<String>,
    ) -> Rc<Shapes> {
        let key = definition.to_lowercase();
        if let Some(hit) = self.cache.get(&key, layer) {
            trace!(block = definition, layer = layer.as_str(), "块几何缓存命中");
            return hit;
        }

        if visiting.contains(&key) {
            debug!(block = definition, layer = layer.as_str(), "检测到循环引用，截断该分支");
            self.warnings
                .push(Warning::CyclicDefinitionReference(definition.to_string()));
            return self.remember(&key, layer, Vec::new());
        }

        let resolved = match self.fetch_definition(&key, definition) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                warn!(block = definition, "块定义不存在");
                self.warnings
                    .push(Warning::DefinitionNotFound(definition.to_string()));
                return self.remember(&key, layer, Vec::new());
            }
            Err(err) => {
                warn!(block = definition, error = %err, "读取块定义失败，跳过该分支");
                self.warnings.push(Warning::HostCallFailed {
                    definition: definition.to_string(),
                    message: err.to_string(),
                });
                return Rc::new(Vec::new());
            }
        };

        if resolved.is_layout {
            debug!(block = definition, "布局块不含几何，跳过");
            self.warnings
                .push(Warning::LayoutDefinitionSkipped(resolved.name.clone()));
            return self.remember(&key, layer, Vec::new());
        }

        visiting.insert(key.clone());
        let mut shapes: Shapes = Vec::new();
        for primitive in &resolved.primitives {
            match primitive {
                Primitive::Insert(reference) => {
                    let child = self.resolve_shapes(&reference.definition, layer, visiting);
                    shapes.extend(child.iter().map(|shape| {
                        shape
                            .iter()
                            .map(|point| reference.transform.apply(*point))
                            .collect::<Vec<_>>()
                    }));
                }
                other if other.is_on(layer) => {
                    if let Some(reason) = read_failure(other) {
                        warn!(
                            block = %resolved.name,
                            kind = other.kind(),
                            reason = %reason,
                            "图元几何无法读取"
                        );
                        self.warnings.push(Warning::PrimitiveReadFailure {
                            container: format!("block `{}`", resolved.name),
                            kind: other.kind().to_string(),
                            layer: other.layer_name().to_string(),
                            reason,
                        });
                        continue;
                    }
                    let points = local_points(other);
                    if !points.is_empty() {
                        shapes.push(points);
                    }
                }
                _ => {}
            }
        }
        visiting.remove(&key);

        trace!(
            block = definition,
            layer = layer.as_str(),
            shapes = shapes.len(),
            "块几何已解析"
        );
        self.remember(&key, layer, shapes)
    }

    fn remember(&mut self, key: &str, layer: &LayerTag, shapes: Shapes) -> Rc<Shapes> {
        let shapes = Rc::new(shapes);
        self.cache.insert(key, layer, Rc::clone(&shapes));
        shapes
    }

    fn fetch_definition(
        &mut self,
        key: &str,
        name: &str,
    ) -> Result<Option<Rc<Definition>>, RetryError<HostError>> {
        if let Some(known) = self.cache.definitions.get(key) {
            return Ok(known.clone());
        }
        let host = self.host;
        let fetched = invoke_with_retry(self.policy, HostError::is_retryable, || {
            host.resolve_definition(name)
        })?
        .map(Rc::new);
        self.cache
            .definitions
            .insert(key.to_string(), fetched.clone());
        Ok(fetched)
    }
}

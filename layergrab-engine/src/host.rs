//! 宿主文档模型的只读接口。
//!
//! 宿主（CAD 自动化接口或内存图纸）返回图元快照；图层、包围盒、顶点与
//! 放置变换都直接从 [`Primitive`] 上读取。

use layergrab_core::document::{Definition, Drawing, EntityId, Primitive};

use crate::errors::HostError;

pub trait HostDocument {
    /// 文档中的全部图层名。
    fn layer_names(&self) -> Result<Vec<String>, HostError>;

    /// 顶层空间的图元，按扫描顺序。
    fn enumerate_top_level(&self) -> Result<Vec<(EntityId, Primitive)>, HostError>;

    /// 按名称（忽略大小写）查找块定义，不存在时返回 `Ok(None)`。
    fn resolve_definition(&self, name: &str) -> Result<Option<Definition>, HostError>;
}

impl HostDocument for Drawing {
    fn layer_names(&self) -> Result<Vec<String>, HostError> {
        Ok(self.layers().map(|layer| layer.name.clone()).collect())
    }

    fn enumerate_top_level(&self) -> Result<Vec<(EntityId, Primitive)>, HostError> {
        Ok(self.entities().cloned().collect())
    }

    fn resolve_definition(&self, name: &str) -> Result<Option<Definition>, HostError> {
        Ok(self.definition(name).cloned())
    }
}

impl<H: HostDocument + ?Sized> HostDocument for &H {
    fn layer_names(&self) -> Result<Vec<String>, HostError> {
        (**self).layer_names()
    }

    fn enumerate_top_level(&self) -> Result<Vec<(EntityId, Primitive)>, HostError> {
        (**self).enumerate_top_level()
    }

    fn resolve_definition(&self, name: &str) -> Result<Option<Definition>, HostError> {
        (**self).resolve_definition(name)
    }
}

//! 索引模块
//!
//! 设计理念：
//! - 索引在导入阶段一次性建立，由存储持有，导入结束后只读
//! - 不使用任何全局 / 线程局部缓存，别名查找也在导入时直接登记
//!
//! 索引类型：
//! - EntityIndex: 实体键 ↔ 稠密下标 (也用作参数名索引)
//! - AxisIndex: 轴值 ↔ 稠密下标 (有序，支持区间查询)
//! - Catalog: 实体索引 + 参数索引 + 实体元数据 + 别名

pub mod axis;
pub mod entity;

pub use axis::AxisIndex;
pub use entity::EntityIndex;

use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::types::{EntityId, EntityMeta, ParamId};

// ═══════════════════════════════════════════════════════════════════════════
// 参数过滤
// ═══════════════════════════════════════════════════════════════════════════

/// 已解析的参数过滤条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamFilter {
    /// 不过滤
    Any,
    /// 只接受该参数
    Only(ParamId),
    /// 参数名未知，什么都不匹配
    Nothing,
}

impl ParamFilter {
    #[inline]
    pub fn accepts(&self, parameter: Option<ParamId>) -> bool {
        match self {
            ParamFilter::Any => true,
            ParamFilter::Only(id) => parameter == Some(*id),
            ParamFilter::Nothing => false,
        }
    }

    #[inline]
    pub fn is_nothing(&self) -> bool {
        matches!(self, ParamFilter::Nothing)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 目录
// ═══════════════════════════════════════════════════════════════════════════

/// 存储目录
///
/// 每个存储持有一份，`Measurement` 中的下标只在所属目录内有效。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: EntityIndex,
    parameters: EntityIndex,
    /// 按 EntityId 排列
    meta: Vec<EntityMeta>,
    /// 别名 → 实体
    aliases: HashMap<Arc<str>, EntityId>,
}

/// 合并目录时产生的下标重映射表
#[derive(Debug, Clone, Default)]
pub struct Remap {
    pub entities: Vec<EntityId>,
    pub parameters: Vec<ParamId>,
}

impl Remap {
    #[inline]
    pub fn entity(&self, old: EntityId) -> EntityId {
        self.entities[old as usize]
    }

    #[inline]
    pub fn parameter(&self, old: Option<ParamId>) -> Option<ParamId> {
        old.map(|p| self.parameters[p as usize])
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记实体；首次出现时缓存元数据并登记别名
    pub fn register_entity(&mut self, key: &str, meta: &EntityMeta) -> EntityId {
        let before = self.entities.len();
        let id = self.entities.insert(key);

        if id as usize == before {
            self.meta.push(meta.clone());
            if let Some(alias) = meta.alias.as_deref().filter(|a| !a.is_empty()) {
                self.aliases.entry(Arc::from(alias)).or_insert(id);
            }
        }
        id
    }

    pub fn register_parameter(&mut self, name: &str) -> ParamId {
        self.parameters.insert(name)
    }

    /// 按主键或别名解析实体
    pub fn resolve_entity(&self, key: &str) -> Option<EntityId> {
        self.entities
            .index_of(key)
            .or_else(|| self.aliases.get(key).copied())
    }

    pub fn parameter_id(&self, name: &str) -> Option<ParamId> {
        self.parameters.index_of(name)
    }

    pub fn param_filter(&self, parameter: Option<&str>) -> ParamFilter {
        match parameter {
            None => ParamFilter::Any,
            Some(name) => match self.parameters.index_of(name) {
                Some(id) => ParamFilter::Only(id),
                None => ParamFilter::Nothing,
            },
        }
    }

    #[inline]
    pub fn entity_key(&self, id: EntityId) -> &str {
        self.entities.key_of(id)
    }

    pub fn parameter_name(&self, id: ParamId) -> &str {
        self.parameters.key_of(id)
    }

    pub fn meta(&self, id: EntityId) -> &EntityMeta {
        &self.meta[id as usize]
    }

    pub fn entities(&self) -> &EntityIndex {
        &self.entities
    }

    pub fn parameters(&self) -> &EntityIndex {
        &self.parameters
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// 吸收另一份目录，返回对方下标到本目录下标的映射
    pub fn absorb(&mut self, other: &Catalog) -> Remap {
        let entities = other
            .entities
            .iter()
            .map(|(id, key)| self.register_entity(key, other.meta(id)))
            .collect();
        let parameters = other
            .parameters
            .iter()
            .map(|(_, name)| self.register_parameter(name))
            .collect();

        Remap {
            entities,
            parameters,
        }
    }
}

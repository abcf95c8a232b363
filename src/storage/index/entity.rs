//! 实体索引
//!
//! 设计理念：
//! - 字符串键 ↔ 稠密下标的双向映射
//! - 内存高效：键只存一份 `Arc<str>`，正反两个方向共享
//! - 只增不删，下标按首次出现顺序分配
//!
//! 同一结构也用作参数 (污染物) 名称索引。

use std::collections::HashMap;
use std::sync::Arc;

/// 实体索引
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    /// 下标 → 键
    keys: Vec<Arc<str>>,
    /// 键 → 下标
    positions: HashMap<Arc<str>, u32>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入键，已存在时返回原下标 (幂等)
    pub fn insert(&mut self, key: &str) -> u32 {
        if let Some(&idx) = self.positions.get(key) {
            return idx;
        }

        let idx = self.keys.len() as u32;
        let key: Arc<str> = Arc::from(key);
        self.keys.push(key.clone());
        self.positions.insert(key, idx);
        idx
    }

    #[inline]
    pub fn index_of(&self, key: &str) -> Option<u32> {
        self.positions.get(key).copied()
    }

    /// 下标 → 键
    ///
    /// 下标必须来自本索引，越界属于调用方违约，直接 panic。
    #[inline]
    pub fn key_of(&self, idx: u32) -> &str {
        &self.keys[idx as usize]
    }

    pub fn get(&self, idx: u32) -> Option<&str> {
        self.keys.get(idx as usize).map(|k| k.as_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 按下标顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(idx, key)| (idx as u32, key.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_idempotent() {
        let mut index = EntityIndex::new();

        assert_eq!(index.insert("Country1"), 0);
        assert_eq!(index.insert("Country2"), 1);
        // 重复插入返回原下标
        assert_eq!(index.insert("Country1"), 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_bijection() {
        let mut index = EntityIndex::new();
        for key in ["A", "B", "C"] {
            index.insert(key);
        }

        for (idx, key) in index.iter() {
            assert_eq!(index.index_of(key), Some(idx));
            assert_eq!(index.key_of(idx), key);
        }
        assert_eq!(index.index_of("Nowhere"), None);
        assert_eq!(index.get(3), None);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::store::{Bucket, IndexFn, Indexers, Indices, KeyFn, StoreError};

/// 线程安全对象索引存储：主键表 + 若干命名二级索引，作为一个一致单元维护。
///
/// ## 契约（重要）
/// - 主键唯一：同 key 再次 add/update 为覆盖语义，先按“旧对象”的索引值
///   清掉全部旧桶成员，再写入新对象并重建成员，绝不静默重复。
/// - 一致性：任意两次写操作之间，每个在库对象的 key 恰好出现在其索引函数
///   当前产出的那些 bucket 中，不多不少；更新不残留旧版本的桶条目。
/// - 失败原子：主键/索引函数的全部产出先校验、后落盘；任何一步失败时
///   主键表与索引均保持原状。
///
/// 整个 store 由一把读写锁保护：写操作（add/update/delete/replace）独占，
/// 读操作共享并发。索引函数表在构造后不可变，放在锁外。
pub struct IndexedStore<T> {
    key_of: KeyFn<T>,
    indexers: Indexers<T>,
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    /// 主键 -> 对象。对象以 Arc 持有，读路径只克隆指针。
    items: HashMap<String, Arc<T>>,
    indices: Indices,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            indices: Indices::new(),
        }
    }
}

/// 把 key 写进 values 描述的全部 bucket。
fn add_to_indices(indices: &mut Indices, key: &str, values: &[(&str, Vec<String>)]) {
    for (index_name, values) in values {
        if values.is_empty() {
            // 零索引值合法：该对象在此索引下不参与任何桶
            continue;
        }
        let index = indices.entry((*index_name).to_string()).or_default();
        for v in values {
            index.entry(v.clone()).or_default().insert(key.to_string());
        }
    }
}

/// 把 key 从 values 描述的全部 bucket 移除，空桶即时剪除。
fn remove_from_indices(indices: &mut Indices, key: &str, values: &[(&str, Vec<String>)]) {
    for (index_name, values) in values {
        let Some(index) = indices.get_mut(*index_name) else {
            continue;
        };
        for v in values {
            if let Some(bucket) = index.get_mut(v) {
                bucket.remove(key);
                if bucket.is_empty() {
                    index.remove(v);
                }
            }
        }
    }
}

impl<T> IndexedStore<T> {
    /// 用主键函数和固定的索引函数集构造空 store。
    /// 索引集此后不可增减；需要新索引类型时重建 store。
    pub fn new(key_of: KeyFn<T>, indexers: Indexers<T>) -> Self {
        Self {
            key_of,
            indexers,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn key_for(&self, obj: &T) -> Result<String, StoreError> {
        (self.key_of)(obj).map_err(|source| StoreError::Key { source })
    }

    fn indexer(&self, index_name: &str) -> Result<&IndexFn<T>, StoreError> {
        self.indexers
            .get(index_name)
            .ok_or_else(|| StoreError::IndexNotFound(index_name.to_string()))
    }

    /// 对一个对象跑全部索引函数。任何失败都发生在落盘之前。
    fn index_values_for(&self, obj: &T) -> Result<Vec<(&str, Vec<String>)>, StoreError> {
        let mut out = Vec::with_capacity(self.indexers.len());
        for (name, f) in &self.indexers {
            let values = f(obj).map_err(|source| StoreError::Index {
                index: name.clone(),
                source,
            })?;
            out.push((name.as_str(), values));
        }
        Ok(out)
    }

    /// 插入对象（upsert）。key 已存在时整体覆盖并重建索引成员。
    pub fn add(&self, obj: T) -> Result<(), StoreError> {
        self.upsert(obj)
    }

    /// 与 `add` 同语义（upsert）。保留两个入口以贴合 watch 管道的调用习惯。
    pub fn update(&self, obj: T) -> Result<(), StoreError> {
        self.upsert(obj)
    }

    fn upsert(&self, obj: T) -> Result<(), StoreError> {
        let key = self.key_for(&obj)?;
        // 新对象的索引值在取写锁之前全部算好
        let new_values = self.index_values_for(&obj)?;
        let obj = Arc::new(obj);

        let mut inner = self.inner.write();
        // 覆盖路径：旧对象的索引值也要先算出来，全部通过才开始改动
        let old_values = match inner.items.get(&key) {
            Some(old) => Some(self.index_values_for(old)?),
            None => None,
        };

        if let Some(old_values) = old_values {
            remove_from_indices(&mut inner.indices, &key, &old_values);
        }
        add_to_indices(&mut inner.indices, &key, &new_values);
        inner.items.insert(key, obj);
        Ok(())
    }

    /// 删除主键对应的对象；key 不存在时为 no-op。
    /// 按对象最后在库的索引值（索引函数为纯函数，重算即得）清空全部桶成员。
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let old_values = match inner.items.get(key) {
            Some(old) => self.index_values_for(old)?,
            None => return Ok(()),
        };

        remove_from_indices(&mut inner.indices, key, &old_values);
        inner.items.remove(key);
        Ok(())
    }

    /// O(1) 主键查询；miss 不是错误。
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.inner.read().items.get(key).cloned()
    }

    /// 按对象查询：先派生主键再查。适合手头只有对象副本的调用方。
    pub fn get_object(&self, obj: &T) -> Result<Option<Arc<T>>, StoreError> {
        let key = self.key_for(obj)?;
        Ok(self.get(&key))
    }

    /// 全部在库对象。顺序未定义，调用方不得依赖。
    pub fn list(&self) -> Vec<Arc<T>> {
        self.inner.read().items.values().cloned().collect()
    }

    /// 全部主键。顺序未定义，调用方不得依赖。
    pub fn list_keys(&self) -> Vec<String> {
        self.inner.read().items.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// 已配置的索引名（构造时固定）。
    pub fn index_names(&self) -> Vec<&str> {
        self.indexers.keys().map(|k| k.as_str()).collect()
    }

    /// 按对象查索引：对 `obj` 现场重算 `index_name` 的索引值（不看它是否在库、
    /// 在库的成员关系如何，因此探针对象可以不在 store 中），对命中的各桶取并集，
    /// 按主键去重后解析为对象。
    pub fn index(&self, index_name: &str, obj: &T) -> Result<Vec<Arc<T>>, StoreError> {
        let f = self.indexer(index_name)?;
        let values = f(obj).map_err(|source| StoreError::Index {
            index: index_name.to_string(),
            source,
        })?;

        let inner = self.inner.read();
        // 并集落到 set：多值重叠时同一主键只出现一次
        let mut keys = Bucket::new();
        if let Some(index) = inner.indices.get(index_name) {
            for v in &values {
                if let Some(bucket) = index.get(v) {
                    keys.extend(bucket.iter().cloned());
                }
            }
        }
        Ok(keys
            .iter()
            .filter_map(|k| inner.items.get(k).cloned())
            .collect())
    }

    /// 某索引某取值下的全部主键，字典序升序。排序是对外契约的一部分，
    /// 下游依赖该确定性顺序。
    pub fn index_keys(&self, index_name: &str, index_value: &str) -> Result<Vec<String>, StoreError> {
        self.indexer(index_name)?;
        let inner = self.inner.read();
        Ok(inner
            .indices
            .get(index_name)
            .and_then(|index| index.get(index_value))
            .map(|bucket| bucket.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// `index_keys` 的对象版：同一桶、同一排序，解析为对象返回。
    pub fn by_index(&self, index_name: &str, index_value: &str) -> Result<Vec<Arc<T>>, StoreError> {
        self.indexer(index_name)?;
        let inner = self.inner.read();
        let Some(bucket) = inner
            .indices
            .get(index_name)
            .and_then(|index| index.get(index_value))
        else {
            return Ok(Vec::new());
        };
        Ok(bucket
            .iter()
            .filter_map(|k| inner.items.get(k).cloned())
            .collect())
    }

    /// 某索引当前出现过的全部取值（即全部非空桶名）。
    /// 未配置的索引名此处宽松处理：返回空序列而非报错。
    pub fn list_index_func_values(&self, index_name: &str) -> Vec<String> {
        self.inner
            .read()
            .indices
            .get(index_name)
            .map(|index| index.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 整体替换 store 内容：在锁外对新列表算好全部主键与索引值并完成校验，
    /// 最后一次性切换内部状态。重复主键后者覆盖前者。
    /// 读者看到的要么是旧全量、要么是新全量，没有中间态；失败时旧状态原样保留。
    pub fn replace(&self, objects: Vec<T>) -> Result<(), StoreError> {
        let mut items = HashMap::with_capacity(objects.len());
        for obj in objects {
            let key = self.key_for(&obj)?;
            items.insert(key, Arc::new(obj));
        }

        // 索引按去重后的对象集重建，避免被覆盖的重复 key 残留桶成员
        let mut indices = Indices::new();
        for (key, obj) in &items {
            let values = self.index_values_for(obj)?;
            add_to_indices(&mut indices, key, &values);
        }

        let count = items.len();
        *self.inner.write() = Inner { items, indices };
        tracing::debug!("replace: store rebuilt with {} objects", count);
        Ok(())
    }
}

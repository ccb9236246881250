pub mod indexed;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// 主键提取函数：对象 -> 唯一主键字符串。
pub type KeyFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<String> + Send + Sync>;

/// 索引函数：对象 -> 零或多个索引值（多值索引，如一个对象属于多个分组）。
pub type IndexFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<Vec<String>> + Send + Sync>;

/// 索引名 -> 索引函数。构造时一次性给定，store 生命周期内不可增减。
pub type Indexers<T> = BTreeMap<String, IndexFn<T>>;

/// bucket：一个索引值下的主键集合。set 语义（重复产出同一值不会重复入桶），
/// BTreeSet 迭代即字典序，`index_keys` 的排序输出直接来自这里。
pub(crate) type Bucket = BTreeSet<String>;

/// 单个命名索引：索引值 -> bucket。空桶随删除即时剪除，
/// `list_index_func_values` 因此只见到当前非空的取值。
pub(crate) type Index = BTreeMap<String, Bucket>;

/// 全部命名索引：索引名 -> Index。条目按需创建；
/// 索引名是否合法以 `Indexers` 为准，不以这里是否有条目为准。
pub(crate) type Indices = HashMap<String, Index>;

/// 存储层错误。全部同步返回调用方：内部不重试、不打日志、不致命，
/// 任何失败之后 store 保持可用且无中间状态。
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 主键函数失败：操作中止，store 不变。
    #[error("key function failed: {source}")]
    Key {
        #[source]
        source: anyhow::Error,
    },

    /// 索引函数失败：写操作原子中止（无部分索引）；按对象查询返回错误而非部分结果。
    #[error("index function failed for index {index:?}: {source}")]
    Index {
        index: String,
        #[source]
        source: anyhow::Error,
    },

    /// 查询引用了未配置的索引名。
    /// 注意 `list_index_func_values` 刻意不走这条路：未知索引名返回空序列。
    #[error("index {0:?} does not exist")]
    IndexNotFound(String),
}

pub use indexed::IndexedStore;

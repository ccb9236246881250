use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use obj_index::key::{meta_namespace_key, ObjectMeta};
use obj_index::store::{IndexFn, IndexedStore, Indexers, KeyFn};

/// 演示用记录：watch cache 里 pod 元数据的最小同构
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodRecord {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    node_name: String,
}

impl ObjectMeta for PodRecord {
    fn name(&self) -> &str {
        &self.name
    }
    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

#[derive(Parser)]
#[command(name = "obj-index", about = "Thread-safe object index demo")]
struct Args {
    /// JSON 数组文件；缺省用内置样例数据
    #[arg(long)]
    data: Option<PathBuf>,

    /// 查询的索引名（内置：namespace / nodeName）
    #[arg(long, default_value = "nodeName")]
    index: String,

    /// 查询的索引值
    #[arg(long)]
    value: Option<String>,

    /// 按主键查单个对象（与 --index/--value 互斥时优先）
    #[arg(long)]
    key: Option<String>,

    /// 列出该索引下当前全部取值
    #[arg(long)]
    list_values: bool,
}

fn build_store() -> IndexedStore<PodRecord> {
    let key_of: KeyFn<PodRecord> = Arc::new(|p: &PodRecord| Ok(meta_namespace_key(p)));

    let mut indexers = Indexers::new();
    // namespace 可缺省：缺省对象产出零个索引值，仅主键可达
    let by_namespace: IndexFn<PodRecord> =
        Arc::new(|p: &PodRecord| Ok(p.namespace.clone().into_iter().collect()));
    let by_node: IndexFn<PodRecord> = Arc::new(|p: &PodRecord| Ok(vec![p.node_name.clone()]));
    indexers.insert("namespace".to_string(), by_namespace);
    indexers.insert("nodeName".to_string(), by_node);

    IndexedStore::new(key_of, indexers)
}

fn sample_pods() -> Vec<PodRecord> {
    let mk = |name: &str, ns: &str, node: &str| PodRecord {
        name: name.to_string(),
        namespace: Some(ns.to_string()),
        node_name: node.to_string(),
    };
    vec![
        mk("foo1", "fakeNs1", "fakeNode1"),
        mk("bar1", "fakeNs1", "fakeNode1"),
        mk("foo2", "fakeNs2", "fakeNode2"),
        mk("bar2", "fakeNs2", "fakeNode2"),
    ]
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let pods: Vec<PodRecord> = match &args.data {
        Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
        None => sample_pods(),
    };

    let store = build_store();
    store.replace(pods)?;
    info!("indexed {} objects ({:?})", store.len(), store.index_names());

    if let Some(key) = &args.key {
        match store.get(key) {
            Some(pod) => println!("{}", serde_json::to_string_pretty(pod.as_ref())?),
            None => println!("null"),
        }
        return Ok(());
    }

    if args.list_values {
        let values = store.list_index_func_values(&args.index);
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    let value = args.value.as_deref().unwrap_or("fakeNode1");
    let objects = store.by_index(&args.index, value)?;
    let out: Vec<&PodRecord> = objects.iter().map(|o| o.as_ref()).collect();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

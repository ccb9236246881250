//! 命名空间主键派生：从对象身份字段构造 `<prefix>/<namespace>/<name>` 形式的
//! 主键，以及 API 路径段的合法性校验。纯字符串构造，无共享状态，
//! 作为 store 的 `KeyFn` 组合件使用。

use thiserror::Error;

/// API 层 bad request 语义：key 派生的全部失败条件。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BadRequest {
    #[error("Namespace parameter required.")]
    NamespaceRequired,

    #[error("Name parameter required.")]
    NameRequired,

    #[error("Name parameter invalid: {name:?}: {reasons}")]
    NameInvalid { name: String, reasons: String },

    #[error("unexpected key format: {0:?}")]
    KeyMalformed(String),
}

/// 对象暴露给 key 派生的最小身份表面。
pub trait ObjectMeta {
    fn name(&self) -> &str;
    fn namespace(&self) -> Option<&str>;
}

/// 默认主键：有 namespace 时 `<namespace>/<name>`，否则裸 `<name>`。
/// 适合直接作为 namespaced 资源 store 的 `KeyFn`。
pub fn meta_namespace_key<T: ObjectMeta>(obj: &T) -> String {
    match obj.namespace() {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns, obj.name()),
        _ => obj.name().to_string(),
    }
}

/// `meta_namespace_key` 的逆：拆回 (namespace, name)。
pub fn split_meta_namespace_key(key: &str) -> Result<(Option<&str>, &str), BadRequest> {
    let parts: Vec<&str> = key.split('/').collect();
    match parts.as_slice() {
        [name] => Ok((None, *name)),
        [ns, name] => Ok((Some(*ns), *name)),
        _ => Err(BadRequest::KeyMalformed(key.to_string())),
    }
}

/// 请求根路径：有 namespace 时 `<prefix>/<namespace>`，否则 `<prefix>`。
pub fn namespace_key_root(prefix: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}", prefix, ns),
        _ => prefix.to_string(),
    }
}

/// 完整对象主键：`<prefix>/<namespace>/<name>`。
/// namespace 缺失/为空、name 为空、name 非法路径段时拒绝。
pub fn namespace_key(
    prefix: &str,
    namespace: Option<&str>,
    name: &str,
) -> Result<String, BadRequest> {
    let root = namespace_key_root(prefix, namespace);
    if namespace.map_or(true, str::is_empty) {
        return Err(BadRequest::NamespaceRequired);
    }
    if name.is_empty() {
        return Err(BadRequest::NameRequired);
    }
    let reasons = validate_path_segment(name);
    if !reasons.is_empty() {
        return Err(BadRequest::NameInvalid {
            name: name.to_string(),
            reasons: reasons.join("; "),
        });
    }
    Ok(format!("{}/{}", root, name))
}

/// 路径段校验：不得为 `.` / `..`，不得包含 `/` 与 `%`。
/// 返回违规说明列表；空列表即合法。
pub fn validate_path_segment(name: &str) -> Vec<String> {
    let mut reasons = Vec::new();
    if name == "." {
        reasons.push("may not be '.'".to_string());
    }
    if name == ".." {
        reasons.push("may not be '..'".to_string());
    }
    if name.contains('/') {
        reasons.push("may not contain '/'".to_string());
    }
    if name.contains('%') {
        reasons.push("may not contain '%'".to_string());
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePod {
        name: String,
        namespace: Option<String>,
    }

    impl ObjectMeta for FakePod {
        fn name(&self) -> &str {
            &self.name
        }
        fn namespace(&self) -> Option<&str> {
            self.namespace.as_deref()
        }
    }

    fn mk_pod(name: &str, namespace: Option<&str>) -> FakePod {
        FakePod {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }

    #[test]
    fn api_key_derivation_matches_reference() {
        assert_eq!(
            namespace_key("/pod", Some("fakeNs1"), "foo1").unwrap(),
            "/pod/fakeNs1/foo1"
        );
    }

    #[test]
    fn namespace_key_requires_namespace() {
        assert_eq!(
            namespace_key("/pod", None, "foo1"),
            Err(BadRequest::NamespaceRequired)
        );
        assert_eq!(
            namespace_key("/pod", Some(""), "foo1"),
            Err(BadRequest::NamespaceRequired)
        );
    }

    #[test]
    fn namespace_key_requires_valid_name() {
        assert_eq!(
            namespace_key("/pod", Some("ns"), ""),
            Err(BadRequest::NameRequired)
        );
        assert!(matches!(
            namespace_key("/pod", Some("ns"), ".."),
            Err(BadRequest::NameInvalid { .. })
        ));
        assert!(matches!(
            namespace_key("/pod", Some("ns"), "a/b"),
            Err(BadRequest::NameInvalid { .. })
        ));
        assert!(matches!(
            namespace_key("/pod", Some("ns"), "a%20b"),
            Err(BadRequest::NameInvalid { .. })
        ));
    }

    #[test]
    fn namespace_key_root_with_and_without_namespace() {
        assert_eq!(namespace_key_root("/pod", Some("fakeNs1")), "/pod/fakeNs1");
        assert_eq!(namespace_key_root("/pod", None), "/pod");
        assert_eq!(namespace_key_root("/pod", Some("")), "/pod");
    }

    #[test]
    fn meta_namespace_key_with_and_without_namespace() {
        assert_eq!(
            meta_namespace_key(&mk_pod("foo1", Some("fakeNs1"))),
            "fakeNs1/foo1"
        );
        assert_eq!(meta_namespace_key(&mk_pod("foo1", None)), "foo1");
    }

    #[test]
    fn split_inverts_meta_namespace_key() {
        assert_eq!(
            split_meta_namespace_key("fakeNs1/foo1").unwrap(),
            (Some("fakeNs1"), "foo1")
        );
        assert_eq!(split_meta_namespace_key("foo1").unwrap(), (None, "foo1"));
        assert!(matches!(
            split_meta_namespace_key("a/b/c"),
            Err(BadRequest::KeyMalformed(_))
        ));
    }

    #[test]
    fn validate_path_segment_rules() {
        assert!(validate_path_segment("foo1").is_empty());
        assert_eq!(validate_path_segment(".").len(), 1);
        assert_eq!(validate_path_segment("..").len(), 1);
        assert_eq!(validate_path_segment("a/b").len(), 1);
        assert_eq!(validate_path_segment("a%b").len(), 1);
    }
}

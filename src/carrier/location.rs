// ==========================================
// 船期延误追踪系统 - 位置解析
// ==========================================
// LocationMap: 规范港口代码 ↔ 承运人位置代码 双向映射
// LocationResolver: 远程位置查询 + 当日结果持久化
// 不变式: 解析失败是合法终态 (记录后跳过), 不是错误
// ==========================================

use crate::cache::response_cache::ResponseCache;
use crate::carrier::error::{CarrierError, CarrierResult};
use crate::domain::types::{Carrier, LocationCode};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tracing::{debug, info, warn};

// ==========================================
// LocationMap - 位置代码映射
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LocationMap {
    forward: HashMap<String, LocationCode>, // 规范代码 → 承运人代码
    reverse: HashMap<LocationCode, String>, // 承运人代码 → 规范代码
}

impl LocationMap {
    pub fn insert(&mut self, canonical: &str, code: LocationCode) {
        self.forward.insert(canonical.to_string(), code.clone());
        self.reverse.insert(code, canonical.to_string());
    }

    /// 规范代码 → 承运人代码
    pub fn code_for(&self, canonical: &str) -> Option<&LocationCode> {
        self.forward.get(canonical)
    }

    /// 承运人代码 → 规范代码 (解析阶段回写用)
    pub fn canonical_for(&self, code: &str) -> Option<&String> {
        self.reverse.get(code)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// 一条位置解析请求: (规范港口代码, 承运人港名)
///
/// 港名为 None 表示对照表未命中, 直接计入未解析
pub type LocationRequest = (String, Option<String>);

/// 从行集收集唯一请求 (稳定排序)
pub fn collect_requests(
    ports: impl IntoIterator<Item = String>,
    crosswalk: &HashMap<String, String>,
) -> Vec<LocationRequest> {
    let unique: BTreeSet<String> = ports.into_iter().collect();
    unique
        .into_iter()
        .map(|port| {
            let name = crosswalk.get(&port).cloned();
            (port, name)
        })
        .collect()
}

// ==========================================
// LocationResolver - 远程位置解析器
// ==========================================
// 当日工件: "<承运人> locationID.json"  (港名 → 代码|null)
//          "<承运人>_exceptions.txt"   (未解析清单, 供运维复核)
pub struct LocationResolver {
    carrier: Carrier,
}

impl LocationResolver {
    pub fn new(carrier: Carrier) -> Self {
        Self { carrier }
    }

    /// 解析请求集合为位置映射
    ///
    /// # 参数
    /// - cache: 当日缓存 (解析表按承运人名持久化, 与路线无关)
    /// - requests: (规范代码, 承运人港名) 列表
    /// - lookup: 远程查询闭包, 每个唯一港名当日至多调用一次
    ///
    /// # 行为
    /// - 当日工件存在: 直接复用, 零网络调用
    /// - 当日首次: 逐港名查询, 连同失败清单一并落盘
    /// - 查询出错按未解析处理 (告警), 不中断
    pub async fn resolve<F, Fut>(
        &self,
        cache: &ResponseCache,
        requests: &[LocationRequest],
        lookup: F,
    ) -> CarrierResult<LocationMap>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = CarrierResult<Option<LocationCode>>>,
    {
        let artifact = format!("{} locationID.json", self.carrier.as_str());

        let names: BTreeSet<String> = requests
            .iter()
            .filter_map(|(_, name)| name.clone())
            .collect();

        let name_codes: HashMap<String, Option<LocationCode>> =
            match cache.read_artifact(&artifact)? {
                Some(body) => {
                    debug!(carrier = %self.carrier, "复用当日位置解析表");
                    serde_json::from_str(&body)
                        .map_err(|e| CarrierError::LocationArtifact(e.to_string()))?
                }
                None => {
                    let table = self.resolve_remote(&names, lookup).await;
                    let body = serde_json::to_string_pretty(&table)
                        .map_err(|e| CarrierError::LocationArtifact(e.to_string()))?;
                    cache.write_artifact(&artifact, &body)?;
                    table
                }
            };

        // 组合 规范代码 → 承运人代码, 收集未解析项
        let mut map = LocationMap::default();
        let mut unresolved = BTreeSet::new();
        for (canonical, name) in requests {
            match name {
                None => {
                    // 对照表未命中
                    unresolved.insert(canonical.clone());
                }
                Some(name) => match name_codes.get(name).and_then(|c| c.clone()) {
                    Some(code) => map.insert(canonical, code),
                    None => {
                        unresolved.insert(name.clone());
                    }
                },
            }
        }

        write_exceptions(cache, self.carrier, &unresolved)?;
        info!(
            carrier = %self.carrier,
            resolved = map.len(),
            unresolved = unresolved.len(),
            "位置解析完成"
        );
        Ok(map)
    }

    /// 当日首次: 逐港名远程查询
    async fn resolve_remote<F, Fut>(
        &self,
        names: &BTreeSet<String>,
        lookup: F,
    ) -> HashMap<String, Option<LocationCode>>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = CarrierResult<Option<LocationCode>>>,
    {
        let mut table = HashMap::new();
        for name in names {
            let code = match lookup(name.clone()).await {
                Ok(code) => code,
                Err(e) => {
                    warn!(carrier = %self.carrier, port = %name, error = %e, "位置查询失败, 按未解析处理");
                    None
                }
            };
            table.insert(name.clone(), code);
        }
        table
    }
}

/// 写未解析清单工件 (每行一项; 空清单也写, 便于运维确认)
pub fn write_exceptions(
    cache: &ResponseCache,
    carrier: Carrier,
    unresolved: &BTreeSet<String>,
) -> CarrierResult<()> {
    let artifact = format!("{}_exceptions.txt", carrier.as_str());
    let body = unresolved.iter().cloned().collect::<Vec<_>>().join("\n");
    cache.write_artifact(&artifact, &body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn open_cache(dir: &TempDir) -> ResponseCache {
        ResponseCache::open(&dir.path().join("2024-01-10"), (0, 0)).unwrap()
    }

    fn requests() -> Vec<LocationRequest> {
        vec![
            ("CNSHA".to_string(), Some("Shanghai".to_string())),
            ("SGSIN".to_string(), Some("Singapore".to_string())),
            ("ZZXXX".to_string(), None), // 对照表未命中
        ]
    }

    #[tokio::test]
    async fn test_resolve_persists_and_replays() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);
        let resolver = LocationResolver::new(Carrier::Msc);
        let calls = AtomicUsize::new(0);

        let map = resolver
            .resolve(&cache, &requests(), |name| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(match name.as_str() {
                        "Singapore" => Some("152".to_string()),
                        _ => None, // Shanghai 远端无代码
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2); // 每个唯一港名一次
        assert_eq!(map.code_for("SGSIN").map(String::as_str), Some("152"));
        assert_eq!(map.canonical_for("152").map(String::as_str), Some("SGSIN"));
        assert!(map.code_for("CNSHA").is_none());

        // 未解析清单: 远端无代码的港名 + 对照表未命中的规范代码
        let exceptions = cache.read_artifact("MSC_exceptions.txt").unwrap().unwrap();
        assert!(exceptions.contains("Shanghai"));
        assert!(exceptions.contains("ZZXXX"));

        // 同日重放: 零远程调用, 结果一致
        let replay = resolver
            .resolve(&cache, &requests(), |_| async {
                panic!("当日重放不应发起远程查询")
            })
            .await
            .unwrap();
        assert_eq!(replay.code_for("SGSIN").map(String::as_str), Some("152"));
    }

    #[tokio::test]
    async fn test_lookup_error_is_unresolved() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);
        let resolver = LocationResolver::new(Carrier::Msc);

        let map = resolver
            .resolve(&cache, &requests(), |_| async {
                Err(CarrierError::UrlBuild("boom".to_string()))
            })
            .await
            .unwrap();
        // 全部按未解析处理, 不上抛
        assert!(map.is_empty());
    }
}

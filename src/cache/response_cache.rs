// ==========================================
// 船期延误追踪系统 - 响应缓存
// ==========================================
// 按日目录的原始响应落盘缓存: responses/<YYYY-MM-DD>/
// 不变式: 当日目录下存在缓存文件即为事实, 不再发起网络调用
// 不变式: 空响应/错误响应不落盘, 下一日历日重试
// 延迟策略: 每次真实抓取后, 在 [lower, upper] 秒均匀采样一次延迟
// ==========================================

use rand::Rng;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 缓存错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("缓存目录创建失败: {0}")]
    DirCreation(std::io::Error),

    #[error("缓存读写失败: {0}")]
    Io(#[from] std::io::Error),
}

// ==========================================
// CachedPayload - 缓存载荷
// ==========================================
// from_cache 用于幂等性验证: 同日重放时必须全部为 true
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub body: String,
    pub from_cache: bool,
}

impl CachedPayload {
    /// 空哨兵载荷 (抓取失败时的占位, 解析阶段静默跳过)
    pub fn empty() -> Self {
        Self {
            body: String::new(),
            from_cache: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

// ==========================================
// ResponseCache - 响应缓存
// ==========================================
pub struct ResponseCache {
    root: PathBuf,        // 当日缓存目录
    interval: (u64, u64), // 抓取后延迟区间 (秒)
}

impl ResponseCache {
    /// 打开 (必要时创建) 当日缓存目录
    ///
    /// # 参数
    /// - root: 当日目录, 形如 responses/2024-01-10
    /// - interval: 抓取后随机延迟区间 (秒), (0, 0) 表示不延迟
    pub fn open(root: &Path, interval: (u64, u64)) -> Result<Self, CacheError> {
        fs::create_dir_all(root).map_err(CacheError::DirCreation)?;
        Ok(Self {
            root: root.to_path_buf(),
            interval,
        })
    }

    /// 当日目录路径
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 取缓存, 未命中则抓取
    ///
    /// # 参数
    /// - file_name: 确定性缓存键 (由承运人 + 路线 [+ 窗口] 构成)
    /// - fetch: 真实抓取闭包, 仅在未命中时调用
    ///
    /// # 行为
    /// - 命中: 读文件返回, 零网络调用, 不延迟
    /// - 未命中: 调用 fetch; 非空结果原样落盘; 空结果跳过落盘;
    ///   无论成败, 在返回前施加一次随机延迟
    pub async fn get_or_fetch<E, F, Fut>(
        &self,
        file_name: &str,
        fetch: F,
    ) -> Result<CachedPayload, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let path = self.root.join(file_name);
        if path.exists() {
            let body = fs::read_to_string(&path).map_err(CacheError::from)?;
            debug!(file = %file_name, "缓存命中");
            return Ok(CachedPayload {
                body,
                from_cache: true,
            });
        }

        let result = fetch().await;
        self.apply_delay().await;

        let body = result?;
        if body.trim().is_empty() {
            // 空响应不落盘, 下一日历日自然重试
            debug!(file = %file_name, "响应为空, 跳过落盘");
            return Ok(CachedPayload {
                body,
                from_cache: false,
            });
        }

        fs::write(&path, &body).map_err(CacheError::from)?;
        debug!(file = %file_name, bytes = body.len(), "响应已落盘");
        Ok(CachedPayload {
            body,
            from_cache: false,
        })
    }

    /// 读取当日工件 (位置解析表等)
    ///
    /// # 返回
    /// - Ok(Some): 工件存在
    /// - Ok(None): 工件不存在 (当日首次)
    pub fn read_artifact(&self, name: &str) -> Result<Option<String>, CacheError> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// 写入当日工件
    pub fn write_artifact(&self, name: &str, body: &str) -> Result<(), CacheError> {
        Ok(fs::write(self.root.join(name), body)?)
    }

    /// 抓取后随机延迟 (对远端站点的唯一限速手段)
    async fn apply_delay(&self) {
        let (lower, upper) = self.interval;
        if upper == 0 {
            return;
        }
        let secs = rand::thread_rng().gen_range(lower..=upper);
        if secs > 0 {
            debug!(secs, "抓取后延迟");
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn open_cache(dir: &TempDir) -> ResponseCache {
        ResponseCache::open(&dir.path().join("2024-01-10"), (0, 0)).unwrap()
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>("payload".to_string())
        };
        let first = cache.get_or_fetch("MSC 1-2.json", fetch).await.unwrap();
        assert!(!first.from_cache);

        // 第二次必须命中缓存, 不再调用闭包
        let second = cache
            .get_or_fetch("MSC 1-2.json", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>("other".to_string())
            })
            .await
            .unwrap();
        assert!(second.from_cache);
        assert_eq!(second.body, "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_response_not_persisted() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);

        let payload = cache
            .get_or_fetch("MSC 1-2.json", || async {
                Ok::<_, CacheError>("  ".to_string())
            })
            .await
            .unwrap();
        assert!(payload.is_empty());

        // 空响应未落盘, 再次调用仍会抓取
        let calls = AtomicUsize::new(0);
        let retried = cache
            .get_or_fetch("MSC 1-2.json", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>("real".to_string())
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!retried.from_cache);
        assert_eq!(retried.body, "real");
    }

    #[tokio::test]
    async fn test_fetch_error_not_persisted() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);

        let result: Result<CachedPayload, CacheError> = cache
            .get_or_fetch("MSC 1-2.json", || async {
                Err(CacheError::Io(std::io::Error::other("网络故障")))
            })
            .await;
        assert!(result.is_err());
        assert!(!dir.path().join("2024-01-10/MSC 1-2.json").exists());
    }

    #[test]
    fn test_artifact_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);

        assert!(cache.read_artifact("MSC locationID.json").unwrap().is_none());
        cache
            .write_artifact("MSC locationID.json", r#"{"Singapore":152}"#)
            .unwrap();
        assert_eq!(
            cache.read_artifact("MSC locationID.json").unwrap().unwrap(),
            r#"{"Singapore":152}"#
        );
    }
}

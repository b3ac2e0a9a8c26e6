use snowflake::SnowflakeIdBucket;
use std::sync::Mutex;

/// Source of fresh identifiers for migrated rules and folders.
///
/// The migration engine never generates uids on its own; callers inject a
/// source so tests can pin identifiers and reproduce collisions.
pub trait UidSource: Send + Sync {
    fn next_uid(&self) -> String;
}

/// 基于 Snowflake 的 uid 生成器（字符串形式）
pub struct SnowflakeUids {
    bucket: Mutex<SnowflakeIdBucket>,
}

impl SnowflakeUids {
    /// `machine_id`: 机器标识 (0-31)
    /// `node_id`: 节点标识 (0-31)
    pub fn new(machine_id: i32, node_id: i32) -> Self {
        Self {
            bucket: Mutex::new(SnowflakeIdBucket::new(machine_id, node_id)),
        }
    }
}

impl Default for SnowflakeUids {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl UidSource for SnowflakeUids {
    fn next_uid(&self) -> String {
        let mut bucket = self
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        bucket.get_id().to_string()
    }
}

/// 依次返回给定的 uid，用完后回退为 `uid-<n>`。
///
/// # Examples
///
/// ```
/// use unialert_common::id::{SequenceUids, UidSource};
///
/// let uids = SequenceUids::new(["a", "b"]);
/// assert_eq!(uids.next_uid(), "a");
/// assert_eq!(uids.next_uid(), "b");
/// assert_eq!(uids.next_uid(), "uid-3");
/// ```
pub struct SequenceUids {
    queue: Mutex<(std::collections::VecDeque<String>, usize)>,
}

impl SequenceUids {
    pub fn new<I, S>(uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new((uids.into_iter().map(Into::into).collect(), 0)),
        }
    }
}

impl UidSource for SequenceUids {
    fn next_uid(&self) -> String {
        let mut guard = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.1 += 1;
        let issued = guard.1;
        guard.0.pop_front().unwrap_or_else(|| format!("uid-{issued}"))
    }
}

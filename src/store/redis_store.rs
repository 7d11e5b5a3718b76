//! Redis-backed state store.
//!
//! # Responsibilities
//! - One hash per dependency at `<prefix>:<service>`
//! - Version-checked writes in a single Lua script, so the
//!   compare and the HSET are one atomic step on the server
//!
//! # Design Decisions
//! - `ConnectionManager` reconnects transparently; a failed command
//!   surfaces as `StoreError::Redis` and the breaker carries on in memory
//! - All fields are stored as strings, matching the existing key layout

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use std::collections::HashMap;

use crate::resilience::state::CircuitBreakerRecord;
use crate::store::{CasOutcome, StateStore, StoreError};

/// KEYS[1] = record key
/// ARGV[1] = expected version, ARGV[2..] = field/value pairs to write
///
/// Returns {"ok"} when written, or {"conflict", field, value, ...} with the
/// current hash otherwise.
const CAS_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'version')
if not current then
    current = '0'
end
if current ~= ARGV[1] then
    local reply = redis.call('HGETALL', KEYS[1])
    table.insert(reply, 1, 'conflict')
    return reply
end
redis.call('HSET', KEYS[1], unpack(ARGV, 2))
return {'ok'}
"#;

/// State store shared by every process pointing at the same redis.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    key_prefix: String,
    cas_script: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Open a managed connection to `url`.
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            key_prefix: key_prefix.to_string(),
            cas_script: Script::new(CAS_SCRIPT),
        })
    }

    /// Store key for a dependency.
    pub fn key(&self, service: &str) -> String {
        format!("{}:{}", self.key_prefix, service)
    }

}

fn decode(key: &str, fields: &HashMap<String, String>) -> Result<CircuitBreakerRecord, StoreError> {
    CircuitBreakerRecord::from_fields(fields).map_err(|reason| StoreError::Decode {
        key: key.to_string(),
        reason,
    })
}

/// Interpret the reply of [`CAS_SCRIPT`]. A conflict on a key that does
/// not exist yet carries no fields and reads as the default record.
fn parse_cas_reply(key: &str, reply: Vec<String>) -> Result<CasOutcome, StoreError> {
    match reply.split_first() {
        Some((tag, _)) if tag == "ok" => Ok(CasOutcome::Applied),
        Some((tag, rest)) if tag == "conflict" => {
            let fields: HashMap<String, String> = rest
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            let current = if fields.is_empty() {
                CircuitBreakerRecord::default()
            } else {
                decode(key, &fields)?
            };
            Ok(CasOutcome::Conflict(current))
        }
        _ => Err(StoreError::Unavailable(format!(
            "unexpected compare-and-swap reply for {}: {:?}",
            key, reply
        ))),
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn load(&self, service: &str) -> Result<Option<CircuitBreakerRecord>, StoreError> {
        let key = self.key(service);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = redis::cmd("HGETALL").arg(&key).query_async(&mut conn).await?;

        if fields.is_empty() {
            return Ok(None);
        }
        decode(&key, &fields).map(Some)
    }

    async fn compare_and_swap(
        &self,
        service: &str,
        expected_version: u64,
        record: &CircuitBreakerRecord,
    ) -> Result<CasOutcome, StoreError> {
        let key = self.key(service);
        let mut invocation = self.cas_script.key(&key);
        invocation.arg(expected_version.to_string());
        for (field, value) in record.to_fields() {
            invocation.arg(field).arg(value);
        }

        let mut conn = self.conn.clone();
        let reply: Vec<String> = invocation.invoke_async(&mut conn).await?;

        parse_cas_reply(&key, reply)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("unexpected PING reply: {}", pong)))
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

use std::time::Duration;

use anyhow::Context as _;
use deadpool_redis::Pool;
use deadpool_redis::redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::repository::RevocationList;
use crate::error::DetectorError;

#[derive(Clone)]
pub struct RedisRevocationList {
    pub pool: Pool,
}

fn revoked_key(jti: Uuid) -> String {
    format!("revoked_jti:{jti}")
}

impl RevocationList for RedisRevocationList {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<(), DetectorError> {
        // A zero TTL is rejected by Redis; such a token is already expired anyway.
        let secs = ttl.as_secs();
        if secs == 0 {
            return Ok(());
        }
        let mut conn = self.pool.get().await.context("redis connection")?;
        let (): () = conn
            .set_ex(revoked_key(jti), 1u8, secs)
            .await
            .context("store revoked token id")?;
        Ok(())
    }

    async fn revoke_if_absent(&self, jti: Uuid, ttl: Duration) -> Result<bool, DetectorError> {
        let mut conn = self.pool.get().await.context("redis connection")?;
        // SET NX replies nil when the key already exists.
        let reply: Option<String> = deadpool_redis::redis::cmd("SET")
            .arg(revoked_key(jti))
            .arg(1u8)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .context("claim token id")?;
        Ok(reply.is_some())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, DetectorError> {
        let mut conn = self.pool.get().await.context("redis connection")?;
        let exists: bool = conn
            .exists(revoked_key(jti))
            .await
            .context("check revoked token id")?;
        Ok(exists)
    }
}

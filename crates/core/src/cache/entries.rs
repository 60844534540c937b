//! Entry reads and writes within tiers.
//!
//! Writes are upserts keyed by (tier, request key): a second successful fetch
//! for the same request overwrites the first, it never duplicates it.

use super::connection::CacheDb;
use super::hash::RequestKey;
use super::snapshot::ResponseSnapshot;
use crate::Error;
use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};

const SELECT_COLUMNS: &str = "e.response_url, e.status, e.status_text, e.headers_json, e.body, e.stored_at";

fn insert_entry(
    conn: &rusqlite::Connection, tier: &str, request: &RequestKey, snapshot: &ResponseSnapshot, stored_at: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&snapshot.headers)?;
    conn.execute(
        "INSERT OR IGNORE INTO tiers (name, created_at) VALUES (?1, ?2)",
        params![tier, stored_at],
    )?;
    conn.execute(
        "INSERT INTO entries (tier, key, method, url, response_url, status, status_text, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(tier, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            tier,
            &request.key,
            &request.method,
            &request.url,
            &snapshot.url,
            snapshot.status,
            &snapshot.status_text,
            headers_json,
            &snapshot.body[..],
            stored_at,
        ],
    )?;
    Ok(())
}

fn read_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<(ResponseSnapshot, String)> {
    let headers_json: String = row.get(3)?;
    let body: Vec<u8> = row.get(4)?;
    Ok((
        ResponseSnapshot {
            url: row.get(0)?,
            status: row.get(1)?,
            status_text: row.get(2)?,
            headers: Vec::new(),
            body: Bytes::from(body),
            stored_at: row.get(5)?,
        },
        headers_json,
    ))
}

fn finish(found: Option<(ResponseSnapshot, String)>) -> Result<Option<ResponseSnapshot>, Error> {
    match found {
        Some((mut snapshot, headers_json)) => {
            snapshot.headers = serde_json::from_str(&headers_json)?;
            Ok(Some(snapshot))
        }
        None => Ok(None),
    }
}

impl CacheDb {
    /// Store a snapshot under a request key, creating the tier if needed.
    pub async fn put_entry(&self, tier: &str, request: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let tier = tier.to_string();
        let request = request.clone();
        let snapshot = snapshot.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                insert_entry(conn, &tier, &request, &snapshot, &stored_at)
            })
            .await
            .map_err(Error::from)
    }

    /// Store several snapshots in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, tier: &str, entries: Vec<(RequestKey, ResponseSnapshot)>) -> Result<(), Error> {
        let tier = tier.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                for (request, snapshot) in &entries {
                    insert_entry(&tx, &tier, request, snapshot, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a key in one tier.
    pub async fn match_in_tier(&self, tier: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let tier = tier.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM entries e WHERE e.tier = ?1 AND e.key = ?2"))?;
                let found = match stmt.query_row(params![tier, key], read_snapshot) {
                    Ok(found) => Some(found),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };
                finish(found)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a key across every tier.
    ///
    /// Tiers are searched in creation order and the first hit wins.
    pub async fn match_any(&self, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM entries e JOIN tiers t ON t.name = e.tier
                     WHERE e.key = ?1 ORDER BY t.rowid LIMIT 1"
                ))?;
                let found = match stmt.query_row(params![key], read_snapshot) {
                    Ok(found) => Some(found),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };
                finish(found)
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs stored in a tier, sorted.
    pub async fn tier_urls(&self, tier: &str) -> Result<Vec<String>, Error> {
        let tier = tier.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE tier = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![tier], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn entry_count(&self, tier: &str) -> Result<u64, Error> {
        let tier = tier.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE tier = ?1", params![tier], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> RequestKey {
        RequestKey::new("GET", &Url::parse("https://hub.example.com").unwrap().join(path).unwrap())
    }

    fn make_snapshot(path: &str, body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot {
            url: format!("https://hub.example.com{path}"),
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::from_static(body.as_bytes()),
            stored_at: None,
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/api/merchants");
        db.put_entry("api-v1", &req, &make_snapshot("/api/merchants", "[1]")).await.unwrap();

        let found = db.match_in_tier("api-v1", &req.key).await.unwrap().unwrap();
        assert_eq!(found.text(), "[1]");
        assert_eq!(found.header("Content-Type"), Some("application/json"));
        assert!(found.stored_at.is_some());
        assert!(db.has_tier("api-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/app.css");
        db.put_entry("dynamic-v1", &req, &make_snapshot("/app.css", "a{}")).await.unwrap();
        db.put_entry("dynamic-v1", &req, &make_snapshot("/app.css", "b{}")).await.unwrap();

        assert_eq!(db.entry_count("dynamic-v1").await.unwrap(), 1);
        let found = db.match_in_tier("dynamic-v1", &req.key).await.unwrap().unwrap();
        assert_eq!(found.text(), "b{}");
    }

    #[tokio::test]
    async fn test_match_any_prefers_older_tier() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/dashboard");
        db.open_tier("static-v1").await.unwrap();
        db.open_tier("dynamic-v1").await.unwrap();
        db.put_entry("dynamic-v1", &req, &make_snapshot("/dashboard", "dynamic")).await.unwrap();
        db.put_entry("static-v1", &req, &make_snapshot("/dashboard", "static")).await.unwrap();

        let found = db.match_any(&req.key).await.unwrap().unwrap();
        assert_eq!(found.text(), "static");
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.match_any("nonexistent").await.unwrap().is_none());
        assert!(db.match_in_tier("static-v1", "nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_entries_and_urls() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            (request("/dashboard"), make_snapshot("/dashboard", "d")),
            (request("/"), make_snapshot("/", "root")),
        ];
        db.put_entries("static-v1", entries).await.unwrap();

        let urls = db.tier_urls("static-v1").await.unwrap();
        assert_eq!(urls, vec!["https://hub.example.com/", "https://hub.example.com/dashboard"]);
    }

    #[tokio::test]
    async fn test_delete_tier_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = request("/reports");
        db.put_entry("dynamic-v0", &req, &make_snapshot("/reports", "r")).await.unwrap();

        db.delete_tier("dynamic-v0").await.unwrap();
        assert!(db.match_any(&req.key).await.unwrap().is_none());
        assert_eq!(db.entry_count("dynamic-v0").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tier_stats() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_tier("static-v1").await.unwrap();
        db.put_entry("api-v1", &request("/api/a"), &make_snapshot("/api/a", "a")).await.unwrap();
        db.put_entry("api-v1", &request("/api/b"), &make_snapshot("/api/b", "b")).await.unwrap();

        let stats = db.tier_stats().await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!((stats[0].name.as_str(), stats[0].entries), ("static-v1", 0));
        assert_eq!((stats[1].name.as_str(), stats[1].entries), ("api-v1", 2));
    }
}

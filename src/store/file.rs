// SPDX-License-Identifier: MIT

//! File-backed credential store with typed operations.
//!
//! One record kind per file, one file per user:
//! - `user_{id}.json`          — captured authorization artifact
//! - `tokens_user_{id}.json`   — current token set
//! - `filters_{id}.json`       — weekly schedule filter
//! - `collected_{id}.json`     — confirmed-shift outcomes
//! - `last_user.txt`           — the installation's current user id
//!
//! Writes are all-or-nothing: records are serialized to a temp file in the
//! same directory and renamed over the target, so a crash mid-write never
//! leaves a half-written record behind.

use crate::error::AppError;
use crate::models::{AuthorizationArtifact, CollectedShift, ScheduleFilter, TokenSet};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const LAST_USER_FILE: &str = "last_user.txt";

/// File-backed store for credentials, filters and outcomes.
#[derive(Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    // ─── Current User ────────────────────────────────────────────

    /// The user id of this installation, if a login ever completed.
    pub async fn current_user(&self) -> Result<Option<String>, AppError> {
        match fs::read_to_string(self.data_dir.join(LAST_USER_FILE)).await {
            Ok(raw) => {
                let id = raw.trim().to_string();
                Ok(if id.is_empty() { None } else { Some(id) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Persistence(format!("read last_user: {e}"))),
        }
    }

    pub async fn set_current_user(&self, user_id: &str) -> Result<(), AppError> {
        self.write_atomic(&self.data_dir.join(LAST_USER_FILE), user_id.as_bytes())
            .await
    }

    // ─── Authorization Artifact ──────────────────────────────────

    pub async fn get_artifact(
        &self,
        user_id: &str,
    ) -> Result<Option<AuthorizationArtifact>, AppError> {
        self.read_record(&self.artifact_path(user_id)).await
    }

    pub async fn put_artifact(
        &self,
        user_id: &str,
        artifact: &AuthorizationArtifact,
    ) -> Result<(), AppError> {
        self.write_record(&self.artifact_path(user_id), artifact)
            .await
    }

    /// Remove a consumed artifact so it can never be exchanged twice.
    pub async fn clear_artifact(&self, user_id: &str) -> Result<(), AppError> {
        match fs::remove_file(self.artifact_path(user_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Persistence(format!("clear artifact: {e}"))),
        }
    }

    // ─── Token Set ───────────────────────────────────────────────

    pub async fn get_tokens(&self, user_id: &str) -> Result<Option<TokenSet>, AppError> {
        self.read_record(&self.tokens_path(user_id)).await
    }

    pub async fn put_tokens(&self, user_id: &str, tokens: &TokenSet) -> Result<(), AppError> {
        self.write_record(&self.tokens_path(user_id), tokens).await
    }

    // ─── Schedule Filter ─────────────────────────────────────────

    pub async fn get_filter(&self, user_id: &str) -> Result<Option<ScheduleFilter>, AppError> {
        self.read_record(&self.filter_path(user_id)).await
    }

    pub async fn put_filter(&self, user_id: &str, filter: &ScheduleFilter) -> Result<(), AppError> {
        self.write_record(&self.filter_path(user_id), filter).await
    }

    // ─── Collected Outcomes ──────────────────────────────────────

    pub async fn list_collected(&self, user_id: &str) -> Result<Vec<CollectedShift>, AppError> {
        Ok(self
            .read_record(&self.collected_path(user_id))
            .await?
            .unwrap_or_default())
    }

    /// Append confirmation outcomes to the user's collected record.
    pub async fn append_collected(
        &self,
        user_id: &str,
        outcomes: &[CollectedShift],
    ) -> Result<(), AppError> {
        let mut all = self.list_collected(user_id).await?;
        all.extend(outcomes.iter().cloned());
        self.write_record(&self.collected_path(user_id), &all).await
    }

    // ─── Paths ───────────────────────────────────────────────────

    fn artifact_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("user_{user_id}.json"))
    }

    fn tokens_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("tokens_user_{user_id}.json"))
    }

    fn filter_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("filters_{user_id}.json"))
    }

    fn collected_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("collected_{user_id}.json"))
    }

    // ─── Record I/O ──────────────────────────────────────────────

    async fn read_record<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, AppError> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Persistence(format!(
                    "read {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| AppError::Persistence(format!("parse {}: {e}", path.display())))
    }

    async fn write_record<T: Serialize>(&self, path: &Path, record: &T) -> Result<(), AppError> {
        let raw = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::Persistence(format!("serialize {}: {e}", path.display())))?;
        self.write_atomic(path, &raw).await
    }

    /// Write to `<path>.tmp` then rename into place. Rename within one
    /// directory is atomic on the filesystems this runs on.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), AppError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| AppError::Persistence(format!("create data dir: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::Persistence(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::Persistence(format!("rename {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    fn sample_tokens() -> TokenSet {
        TokenSet {
            access_token: "at-1".to_string(),
            refresh_token: Some("rt-1".to_string()),
            expires_in: 300,
            obtained_at: Utc::now(),
            courier_id: Some("c-9".to_string()),
        }
    }

    #[tokio::test]
    async fn missing_records_read_as_absent() {
        let (_dir, store) = store();
        assert!(store.get_tokens("u1").await.unwrap().is_none());
        assert!(store.get_artifact("u1").await.unwrap().is_none());
        assert!(store.get_filter("u1").await.unwrap().is_none());
        assert!(store.list_collected("u1").await.unwrap().is_empty());
        assert!(store.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_set_roundtrip() {
        let (_dir, store) = store();
        let tokens = sample_tokens();
        store.put_tokens("u1", &tokens).await.unwrap();

        let loaded = store.get_tokens("u1").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "at-1");
        assert_eq!(loaded.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(loaded.courier_id.as_deref(), Some("c-9"));
    }

    #[tokio::test]
    async fn put_tokens_replaces_wholesale() {
        let (_dir, store) = store();
        store.put_tokens("u1", &sample_tokens()).await.unwrap();

        let replacement = TokenSet {
            access_token: "at-2".to_string(),
            refresh_token: None,
            expires_in: 60,
            obtained_at: Utc::now(),
            courier_id: None,
        };
        store.put_tokens("u1", &replacement).await.unwrap();

        let loaded = store.get_tokens("u1").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "at-2");
        assert!(loaded.refresh_token.is_none());
        assert!(loaded.courier_id.is_none());
    }

    #[tokio::test]
    async fn artifact_clear_is_idempotent() {
        let (_dir, store) = store();
        let artifact = AuthorizationArtifact {
            code: "code-1".to_string(),
            state: "state-1".to_string(),
            session_state: "sess-1".to_string(),
            captured_at: Utc::now(),
        };
        store.put_artifact("u1", &artifact).await.unwrap();
        assert!(store.get_artifact("u1").await.unwrap().is_some());

        store.clear_artifact("u1").await.unwrap();
        assert!(store.get_artifact("u1").await.unwrap().is_none());

        // Clearing again is a no-op, not an error.
        store.clear_artifact("u1").await.unwrap();
    }

    #[tokio::test]
    async fn current_user_roundtrip() {
        let (_dir, store) = store();
        store.set_current_user("abcd1234").await.unwrap();
        assert_eq!(store.current_user().await.unwrap().as_deref(), Some("abcd1234"));
    }

    #[tokio::test]
    async fn collected_appends_accumulate() {
        let (_dir, store) = store();
        let first = CollectedShift {
            shift_id: "s1".to_string(),
            shift_date: "2025-06-16".to_string(),
            start_local: "Monday 2025-06-16 09:00".to_string(),
            confirmed_at: Utc::now(),
        };
        let second = CollectedShift {
            shift_id: "s2".to_string(),
            shift_date: "2025-06-17".to_string(),
            start_local: "Tuesday 2025-06-17 10:00".to_string(),
            confirmed_at: Utc::now(),
        };
        store.append_collected("u1", &[first]).await.unwrap();
        store.append_collected("u1", &[second]).await.unwrap();

        let all = store.list_collected("u1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].shift_id, "s1");
        assert_eq!(all[1].shift_id, "s2");
    }

    #[tokio::test]
    async fn corrupt_record_surfaces_persistence_error() {
        let (dir, store) = store();
        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("tokens_user_u1.json"), b"{nope")
            .await
            .unwrap();

        let err = store.get_tokens("u1").await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }
}

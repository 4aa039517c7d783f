use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-flight [HTTP-01] challenge responses, keyed by challenge token.
///
/// Entries exist only while an order is being validated.
///
/// [HTTP-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.3
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct ChallengeStore {
    responses: Arc<RwLock<HashMap<String, String>>>,
}

impl ChallengeStore {
    pub async fn put(&self, token: String, key_authorization: String) {
        self.responses.write().await.insert(token, key_authorization);
    }

    pub async fn get(&self, token: &str) -> Option<String> {
        self.responses.read().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &str) {
        self.responses.write().await.remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove() {
        let store = ChallengeStore::default();
        assert_eq!(store.get("tok").await, None);

        store.put("tok".to_string(), "tok.thumb".to_string()).await;
        let shared = store.clone();
        assert_eq!(shared.get("tok").await.as_deref(), Some("tok.thumb"));

        store.remove("tok").await;
        assert_eq!(shared.get("tok").await, None);
    }
}

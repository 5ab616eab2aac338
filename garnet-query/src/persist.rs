//! Entity lifecycle operations: insert, update, remove, refresh, save, load.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::entity::Entity;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::query::SelectQuery;
use crate::relations::RelationLoader;
use crate::traits::QueryEngine;

impl Entity {
    fn key_filter(&self, operation: &str) -> QueryResult<Filter> {
        match self.id() {
            Some(id) => Ok(Filter::Equals(
                self.schema().primary_key().to_string(),
                FilterValue::from_json(id),
            )),
            None => Err(QueryError::not_persisted(self.schema().name(), operation)),
        }
    }

    /// Insert the entity's non-key attributes and take the key the engine
    /// returns. The snapshot is reset to the current attributes.
    #[instrument(skip_all, fields(model = %self.schema().name()))]
    pub async fn insert<E: QueryEngine>(&mut self, engine: E) -> QueryResult<Value> {
        let schema = self.schema();
        let values = self.attributes_without_id();
        let key = engine
            .insert(schema.table(), &values, schema.primary_key())
            .await?;

        debug!(key = %key, "inserted");
        self.set(schema.primary_key(), key.clone());
        self.mark_persisted();
        Ok(key)
    }

    /// Persist the attributes changed since the last read or write.
    ///
    /// Returns `false` without touching the engine when nothing changed.
    #[instrument(skip_all, fields(model = %self.schema().name()))]
    pub async fn update<E: QueryEngine>(&mut self, engine: E) -> QueryResult<bool> {
        let filter = self.key_filter("update")?;
        let changed = self.changed_attributes();
        if changed.is_empty() {
            return Ok(false);
        }

        debug!(columns = changed.len(), "updating changed attributes");
        engine
            .update(self.schema().table(), &changed, &filter)
            .await?;
        self.mark_persisted();
        Ok(true)
    }

    /// Delete the entity's row. Returns the number of deleted rows.
    #[instrument(skip_all, fields(model = %self.schema().name()))]
    pub async fn remove<E: QueryEngine>(&self, engine: E) -> QueryResult<u64> {
        let filter = self.key_filter("remove")?;
        engine.delete(self.schema().table(), &filter).await
    }

    /// Re-read the entity's row, replacing attributes and snapshot.
    ///
    /// Attached relations are left as they are.
    #[instrument(skip_all, fields(model = %self.schema().name()))]
    pub async fn refresh<E: QueryEngine>(&mut self, engine: E) -> QueryResult<()> {
        let filter = self.key_filter("refresh")?;
        let query = SelectQuery::new(self.schema().table()).r#where(filter).limit(1);
        let row = engine
            .select(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::not_found(self.schema().name()))?;

        self.replace_row(row);
        Ok(())
    }

    /// Insert the entity when it has no key yet, update it otherwise.
    pub async fn save<E: QueryEngine>(&mut self, engine: E) -> QueryResult<()> {
        if self.is_new() {
            self.insert(engine).await.map(|_| ())
        } else {
            self.update(engine).await.map(|_| ())
        }
    }

    /// Eager-load relation paths onto this entity.
    pub async fn load<E, I, S>(&mut self, engine: E, paths: I) -> QueryResult<()>
    where
        E: QueryEngine,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RelationLoader::new(engine)
            .load(std::slice::from_mut(self), paths)
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{MockEngine, Thing, User, seeded};
    use crate::traits::Model;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_key_and_resets_snapshot() {
        let engine = MockEngine::new();
        let mut thing = Thing::create([("name", json!("Lamp")), ("user_id", json!(1))]);

        let key = thing.insert(&engine).await.unwrap();

        assert_eq!(key, json!(1));
        assert_eq!(thing.id(), Some(&json!(1)));
        assert!(!thing.is_dirty());
        assert_eq!(engine.count_of("insert"), 1);
    }

    #[tokio::test]
    async fn test_insert_refresh_to_json_roundtrip() {
        let engine = MockEngine::new();
        let mut thing = Thing::create([("name", json!("Lamp")), ("user_id", json!(2))]);
        thing.insert(&engine).await.unwrap();

        let mut copy = Thing::create([("id", thing.id().cloned().unwrap())]);
        copy.refresh(&engine).await.unwrap();

        assert_eq!(
            copy.to_json(),
            json!({ "name": "Lamp", "user_id": 2, "id": 1 })
        );
    }

    #[tokio::test]
    async fn test_update_without_changes_issues_no_query() {
        let engine = seeded();
        let mut user = User::find(&engine, 1).exec().await.unwrap();
        engine.clear_log();

        assert!(!user.update(&engine).await.unwrap());
        assert!(engine.log().is_empty());
    }

    #[tokio::test]
    async fn test_update_persists_only_changes() {
        let engine = seeded();
        let mut user = User::find(&engine, 3).exec().await.unwrap();
        user.set("name", "Billy Idol");
        engine.clear_log();

        assert!(user.update(&engine).await.unwrap());
        assert_eq!(engine.log(), vec!["update users {name}".to_string()]);
        assert!(!user.is_dirty());

        let reread = User::find(&engine, 3).exec().await.unwrap();
        assert_eq!(reread.get("name"), Some(&json!("Billy Idol")));
    }

    #[tokio::test]
    async fn test_new_entity_operations_are_not_found() {
        let engine = MockEngine::new();
        let mut thing = Thing::create([("name", json!("Ghost"))]);

        assert!(thing.update(&engine).await.unwrap_err().is_not_found());
        assert!(thing.remove(&engine).await.unwrap_err().is_not_found());
        assert!(thing.refresh(&engine).await.unwrap_err().is_not_found());
        assert!(engine.log().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_missing_row_is_not_found() {
        let engine = seeded();
        let mut thing = Thing::create([("id", json!(99))]);
        assert!(thing.refresh(&engine).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remove_deletes_by_key() {
        let engine = seeded();
        let thing = Thing::find(&engine, 2).exec().await.unwrap();

        assert_eq!(thing.remove(&engine).await.unwrap(), 1);
        assert!(Thing::find(&engine, 2).exec_optional().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_inserts_then_updates() {
        let engine = MockEngine::new();
        let mut thing = Thing::create([("name", json!("Cup"))]);

        thing.save(&engine).await.unwrap();
        thing.set("name", "Mug");
        thing.save(&engine).await.unwrap();

        assert_eq!(
            engine.log(),
            vec!["insert things {name}".to_string(), "update things {name}".to_string()]
        );
    }
}

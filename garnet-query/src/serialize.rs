//! Rendering entities and their attached relations as plain documents.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::entity::{Entity, Related};

/// Attributes with this prefix are internal and never rendered.
const HIDDEN_PREFIX: &str = "__";

fn is_visible(name: &str) -> bool {
    !name.starts_with(HIDDEN_PREFIX)
}

impl Entity {
    /// Render the entity as a JSON object.
    ///
    /// Visible attributes come first, in attribute order; each loaded
    /// relation then overlays its own key: an object (or `null`) for to-one
    /// relations, an array for to-many relations.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in self.attributes() {
            if is_visible(name) {
                map.insert(name.clone(), value.clone());
            }
        }
        for (name, related) in self.loaded_relations() {
            map.insert(name.to_string(), related.to_json());
        }
        Value::Object(map)
    }
}

impl Related {
    /// Render the attached data.
    pub fn to_json(&self) -> Value {
        match self {
            Self::One(Some(entity)) => entity.to_json(),
            Self::One(None) => Value::Null,
            Self::Many(entities) => Value::Array(entities.iter().map(Entity::to_json).collect()),
        }
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let attributes: Vec<_> = self
            .attributes()
            .iter()
            .filter(|(name, _)| is_visible(name) && self.related(name).is_none())
            .collect();
        let relations: Vec<_> = self.loaded_relations().collect();

        let mut map = serializer.serialize_map(Some(attributes.len() + relations.len()))?;
        for (name, value) in attributes {
            map.serialize_entry(name, value)?;
        }
        for (name, related) in relations {
            map.serialize_entry(name, related)?;
        }
        map.end()
    }
}

impl Serialize for Related {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::One(entity) => entity.serialize(serializer),
            Self::Many(entities) => entities.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Place, Thing, User};
    use crate::traits::Model;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_hidden_attributes_are_skipped() {
        let user = User::create([
            ("id", json!(1)),
            ("name", json!("John Doe")),
            ("__token", json!("secret")),
        ]);
        assert_eq!(user.to_json(), json!({ "id": 1, "name": "John Doe" }));
    }

    #[test]
    fn test_relations_are_rendered() {
        let mut user = User::create([("id", json!(1)), ("name", json!("John Doe"))]);
        user.set_related("place", Related::One(None)).unwrap();
        user.set_related(
            "things",
            Related::Many(vec![
                Thing::create([("id", json!(1)), ("name", json!("Book"))]),
                Thing::create([("id", json!(2)), ("name", json!("Pen"))]),
            ]),
        )
        .unwrap();

        assert_eq!(
            user.to_json(),
            json!({
                "id": 1,
                "name": "John Doe",
                "place": null,
                "things": [
                    { "id": 1, "name": "Book" },
                    { "id": 2, "name": "Pen" }
                ]
            })
        );
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let mut user = User::create([("id", json!(2)), ("place", json!("stale"))]);
        let place = Place::create([("id", json!(1)), ("name", json!("Home"))]);
        user.set_related("place", Related::One(Some(Box::new(place))))
            .unwrap();

        let serialized = serde_json::to_value(&user).unwrap();
        assert_eq!(serialized, user.to_json());
        assert_eq!(serialized["place"], json!({ "id": 1, "name": "Home" }));

        let text = serde_json::to_string(&user).unwrap();
        assert_eq!(text.matches("\"place\"").count(), 1);
    }
}

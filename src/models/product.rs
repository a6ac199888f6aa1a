use serde::{Deserialize, Serialize};

/// One sellable inventory item.
///
/// `unit`, `quantity` and `price` are free-form text exactly as authored
/// (no numeric parsing). They, and `properties`, are left out of the JSON
/// form when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub brand: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub quantity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price: String,
    /// Authoring order is preserved; names may repeat.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

/// Free-form named attribute attached to a [`Product`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn espresso() -> Product {
        Product {
            id: "1".to_string(),
            kind: "Coffee".to_string(),
            brand: "Segafredo".to_string(),
            name: "Intermezzo".to_string(),
            unit: "gram".to_string(),
            quantity: "1000".to_string(),
            price: "7.99".to_string(),
            properties: vec![
                Property::new("flavour", "Caramel"),
                Property::new("intensity", ""),
            ],
        }
    }

    fn bare() -> Product {
        Product {
            id: "7".to_string(),
            kind: "Tea".to_string(),
            brand: "Acme".to_string(),
            name: "Green".to_string(),
            ..Product::default()
        }
    }

    // ── Wire shape ────────────────────────────────────────────────────────────

    #[test]
    fn compact_json_starts_with_id() {
        let encoded = serde_json::to_string(&espresso()).unwrap();
        assert!(encoded.starts_with(r#"{"id":"1","type":"Coffee""#), "got {encoded}");
    }

    #[test]
    fn kind_is_emitted_as_type() {
        let value = serde_json::to_value(espresso()).unwrap();
        assert_eq!(value["type"], "Coffee");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let value = serde_json::to_value(bare()).unwrap();
        assert_eq!(
            value,
            json!({ "id": "7", "type": "Tea", "brand": "Acme", "name": "Green" })
        );
    }

    #[test]
    fn empty_property_value_is_still_emitted() {
        let value = serde_json::to_value(espresso()).unwrap();
        assert_eq!(value["properties"][1], json!({ "name": "intensity", "value": "" }));
    }

    #[test]
    fn required_fields_are_emitted_even_when_empty() {
        let value = serde_json::to_value(Product::default()).unwrap();
        let object = value.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
        for key in ["id", "type", "brand", "name"] {
            assert_eq!(object[key], Value::String(String::new()));
        }
    }

    // ── Round trip ────────────────────────────────────────────────────────────

    #[test]
    fn round_trip_preserves_every_field() {
        for product in [espresso(), bare()] {
            let encoded = serde_json::to_vec(&product).unwrap();
            let decoded: Product = serde_json::from_slice(&encoded).unwrap();
            assert_eq!(decoded, product);
        }
    }

    #[test]
    fn missing_optional_fields_decode_as_empty() {
        let decoded: Product = serde_json::from_value(json!({
            "id": "7", "type": "Tea", "brand": "Acme", "name": "Green"
        }))
        .unwrap();
        assert_eq!(decoded, bare());
    }
}

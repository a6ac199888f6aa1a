use crate::models::{Product, Property};

/// Build one entry of the reference coffee inventory.
fn coffee(
    id: &str,
    brand: &str,
    name: &str,
    quantity: &str,
    price: &str,
    properties: &[(&str, &str)],
) -> Product {
    Product {
        id: id.to_string(),
        kind: "Coffee".to_string(),
        brand: brand.to_string(),
        name: name.to_string(),
        unit: "gram".to_string(),
        quantity: quantity.to_string(),
        price: price.to_string(),
        properties: properties
            .iter()
            .map(|(name, value)| Property::new(*name, *value))
            .collect(),
    }
}

/// The fixed inventory every in-memory store starts from. Ids are "1".."6".
pub fn inventory() -> Vec<Product> {
    vec![
        coffee(
            "1",
            "Segafredo",
            "Intermezzo",
            "1000",
            "7.99",
            &[
                (
                    "flavour",
                    "Acidic Robusta, Nuts, Aromatic Arabica, Caramel, Medium roasted beans",
                ),
                ("property", "1000 grams, Arabica/Robusta"),
                ("intensity", ""),
            ],
        ),
        coffee(
            "2",
            "Segafredo",
            "Caffé Crema Gustoso",
            "1000",
            "11.99",
            &[
                (
                    "flavour",
                    "Acidic Robusta, Nuts, Aromatic Arabica, Medium roasted beans",
                ),
                ("property", "1000 grams, Arabica/Robusta"),
                ("intensity", "Medium (6/10)"),
            ],
        ),
        coffee(
            "3",
            "Segafredo",
            "Selezione Espresso",
            "1000",
            "10.49",
            &[
                (
                    "flavour",
                    "Dark Chocolate, Acidic Robusta, Dark roasted beans, Aromatic Arabica",
                ),
                ("property", "1000 grams, Arabica/Robusta"),
            ],
        ),
        coffee(
            "4",
            "illy",
            "Intenso",
            "250",
            "7.99",
            &[
                ("flavour", "Fruit, Chocolate, Dark roasted beans, Bitterness"),
                ("property", "250 grams, Arabica"),
                ("intensity", "Very strong (9/10)"),
            ],
        ),
        coffee(
            "5",
            "illy",
            "Guatemala",
            "250",
            "7.99",
            &[
                ("flavour", "Honey, Caramel, Sweetness"),
                ("property", "250 gram, Arabica"),
                ("intensity", "Medium (6/10)"),
            ],
        ),
        coffee(
            "6",
            "Lavazza",
            "Espresso Barista Perfetto",
            "1000",
            "12.99",
            &[
                ("flavour", "Aromatic Arabica, Medium roasted beans"),
                ("property", "250 gram, Arabica"),
                ("intensity", "Medium (6/10)"),
            ],
        ),
    ]
}

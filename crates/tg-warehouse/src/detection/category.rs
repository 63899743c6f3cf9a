use serde::Serialize;

const PERSON: &str = "person";
const PRODUCTS: &[&str] = &["bottle", "cup", "box"];

/// Coarse classification of an image by the kinds of objects found on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ImageCategory {
    /// A person together with a product
    Promotional,
    /// A product without people
    ProductDisplay,
    /// People without products
    Lifestyle,
    Other,
}

impl ImageCategory {
    /// The category depends only on the set of labels, so neither the
    /// order nor the repetitions matter. Labels are matched exactly, the way
    /// the model spells its class names.
    pub(crate) fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let (mut person, mut product) = (false, false);

        for label in labels {
            person |= label == PERSON;
            product |= PRODUCTS.contains(&label);
        }

        match (person, product) {
            (true, true) => Self::Promotional,
            (false, true) => Self::ProductDisplay,
            (true, false) => Self::Lifestyle,
            (false, false) => Self::Other,
        }
    }
}

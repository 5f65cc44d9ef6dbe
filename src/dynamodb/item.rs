use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

/// A DynamoDB item moved as a unit from the source to the target table.
///
/// The copy never looks inside an item: attribute names and values are carried
/// exactly as the source table returned them.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) attributes: HashMap<String, AttributeValue>,
}

/// One batch of items returned by a single scan fetch.
pub type Page = Vec<Item>;

impl Item {
    /// Gets the value of an attribute as a string.
    ///
    /// Returns `None` if the attribute doesn't exist or is not a string.
    pub fn get_string(&self, key: &str) -> Option<&String> {
        self.attributes.get(key).and_then(|av| av.as_s().ok())
    }

    pub fn into_attributes(self) -> HashMap<String, AttributeValue> {
        self.attributes
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_keeps_attributes_verbatim() {
        let mut attributes = HashMap::new();
        attributes.insert("id".to_string(), AttributeValue::S("42".to_string()));
        attributes.insert("count".to_string(), AttributeValue::N("3".to_string()));

        let item = Item::from(attributes.clone());

        assert_eq!(item.get_string("id"), Some(&"42".to_string()));
        assert_eq!(item.get_string("count"), None);
        assert_eq!(item.into_attributes(), attributes);
    }
}

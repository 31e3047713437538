//! Label decoder: class index -> risk category

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("label encoder has no classes".to_string());
        }
        for (i, class) in classes.iter().enumerate() {
            if classes[..i].contains(class) {
                return Err(format!("duplicate class label `{}`", class));
            }
        }
        Ok(Self { classes })
    }

    /// Re-validate after deserialization
    pub fn validated(self) -> Result<Self, String> {
        Self::new(self.classes)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

use crate::error::CurioError;
use std::collections::{hash_map::Iter, HashMap};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, e.g., a loss or a mean reward.
    Scalar(f32),

    /// A 1-dimensional array of floating-point values.
    Array1(Vec<f32>),
}

/// A container of named values.
#[derive(Debug, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        let mut map = HashMap::new();
        map.insert(name.into(), RecordValue::Scalar(value));
        Self(map)
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the record has no entry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, CurioError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(CurioError::RecordValueTypeError("Scalar".to_string())),
            None => Err(CurioError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, CurioError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(CurioError::RecordValueTypeError("Array1".to_string())),
            None => Err(CurioError::RecordKeyError(k.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordValue};
    use crate::error::CurioError;

    #[test]
    fn test_get_scalar_type_mismatch() {
        let mut record = Record::empty();
        record.insert("obs", RecordValue::Array1(vec![1.0, 2.0]));
        assert!(matches!(
            record.get_scalar("obs"),
            Err(CurioError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            record.get_scalar("missing"),
            Err(CurioError::RecordKeyError(_))
        ));
        assert_eq!(record.get_array1("obs").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_insert_overwrites() {
        let mut record = Record::from_scalar("loss", 1.0);
        record.insert("loss", RecordValue::Scalar(2.0));
        record.insert("step", RecordValue::Scalar(3.0));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get_scalar("loss").unwrap(), 2.0);
    }
}

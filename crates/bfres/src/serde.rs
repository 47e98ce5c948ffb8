use std::fmt;
use std::marker::PhantomData;

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Serialize,
};

use crate::dict::ResDict;

impl<T: Serialize> Serialize for ResDict<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ResDictVisitor<T> {
    marker: PhantomData<T>,
}

impl<T> ResDictVisitor<T> {
    fn new() -> Self {
        ResDictVisitor {
            marker: PhantomData,
        }
    }
}

impl<'de, T: Deserialize<'de>> Visitor<'de> for ResDictVisitor<T> {
    type Value = ResDict<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map with unique, non-empty keys")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut dict = ResDict::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            dict.add(key, value).map_err(de::Error::custom)?;
        }
        dict.rebuild().map_err(de::Error::custom)?;
        Ok(dict)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ResDict<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(ResDictVisitor::new())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::dict::ResDict;
    use crate::error::{Error, Result};

    #[test]
    fn keeps_order_and_rebuilds_the_trie() -> Result<()> {
        let mut dict = ResDict::new();
        dict.add("zeta", 1)?;
        dict.add("alpha", 2)?;

        let json = serde_json::to_string(&dict).map_err(|e| Error::CustomError(e.to_string()))?;
        assert_eq!(json, r#"{"zeta":1,"alpha":2}"#);

        let parsed: ResDict<i32> =
            serde_json::from_str(&json).map_err(|e| Error::CustomError(e.to_string()))?;
        assert_eq!(parsed, dict);
        assert_eq!(parsed.traverse("alpha")?, &2);
        assert_eq!(parsed.nodes().len(), 3);
        Ok(())
    }

    #[test]
    fn rejects_empty_keys() {
        let parsed = serde_json::from_str::<ResDict<i32>>(r#"{"":1}"#);
        assert!(parsed.is_err());
    }
}

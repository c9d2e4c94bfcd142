use error_stack::ResultExt;

use crate::errors::{CustomResult, ParsingError};

pub trait ByteSliceExt {
    /// Deserialize a raw response body into type `<T>`
    fn parse_struct<T>(&self, type_name: &'static str) -> CustomResult<T, ParsingError>
    where
        T: serde::de::DeserializeOwned;
}

impl ByteSliceExt for [u8] {
    fn parse_struct<T>(&self, type_name: &'static str) -> CustomResult<T, ParsingError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self)
            .change_context(ParsingError::StructParseFailure(type_name))
            .attach_printable_lazy(|| {
                format!(
                    "Unable to parse {type_name} from bytes: {:?}",
                    String::from_utf8_lossy(self)
                )
            })
    }
}

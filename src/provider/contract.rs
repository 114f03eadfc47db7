//! Output contracts: the declared shape of a structured generation response.
//!
//! Each structured call site names a `Contract` type. The schema travels with the
//! request so the service can constrain its output, and the response is decoded
//! into the typed value on receipt. A payload that does not decode, or that fails
//! the type's own checks, surfaces as `GenerationError::SchemaValidation`.

use crate::error::GenerationError;
use crate::provider::Payload;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Named JSON schema attached to a generation request
#[derive(Debug, Clone, PartialEq)]
pub struct OutputContract {
    pub name: String,
    pub schema: Value,
}

impl OutputContract {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A typed structured response.
pub trait Contract: DeserializeOwned + Sized {
    /// Contract name used in requests and validation errors
    const NAME: &'static str;

    /// Schema describing the expected payload
    fn schema() -> Value;

    /// Checks serde cannot express. Runs after a successful decode.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    fn output_contract() -> OutputContract {
        OutputContract::new(Self::NAME, Self::schema())
    }

    /// Decode and validate a payload returned for this contract
    fn decode(payload: Payload) -> Result<Self, GenerationError> {
        Self::decode_value(payload.into_value(Self::NAME)?)
    }

    fn decode_value(value: Value) -> Result<Self, GenerationError> {
        let decoded: Self =
            serde_json::from_value(value).map_err(|e| GenerationError::SchemaValidation {
                contract: Self::NAME.to_string(),
                message: e.to_string(),
            })?;
        decoded
            .check()
            .map_err(|message| GenerationError::SchemaValidation {
                contract: Self::NAME.to_string(),
                message,
            })?;
        Ok(decoded)
    }
}

//! Module: marshal
//! Responsibility: encode adapter constructor arguments as opaque tokens
//! that survive embedding in a table-creation statement.
//!
//! Each argument is CBOR-encoded and then URL-safe base64 encoded, so a
//! token never contains quotes, commas or whitespace.

use crate::{adapter::ArgValue, error::InternalError};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

/// Encode one argument as a single token.
pub fn serialize_arg(value: &ArgValue) -> Result<String, InternalError> {
    let bytes = serde_cbor::to_vec(value)
        .map_err(|err| InternalError::marshal_invalid(format!("cannot encode argument: {err}")))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a token produced by `serialize_arg`.
pub fn deserialize_arg(token: &str) -> Result<ArgValue, InternalError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|err| InternalError::marshal_invalid(format!("malformed argument token: {err}")))?;

    serde_cbor::from_slice(&bytes)
        .map_err(|err| InternalError::marshal_invalid(format!("cannot decode argument: {err}")))
}

/// Encode a full argument list, one token per argument.
pub fn serialize_args(args: &[ArgValue]) -> Result<Vec<String>, InternalError> {
    args.iter().map(serialize_arg).collect()
}

pub fn deserialize_args<'a, I>(tokens: I) -> Result<Vec<ArgValue>, InternalError>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().map(deserialize_arg).collect()
}

//! Value translation between host and script

use crate::cache::RuntimeCache;
use crate::error::{Result, ScriptError};
use crate::script_object::HostRef;
use hostbridge_core::HostValue;
use rhai::{Array, Dynamic};
use std::sync::Arc;

/// Translate a host value into a script value.
///
/// Objects are wrapped through the proxy of their class in `cache`; a class
/// seen here for the first time has its instance members installed before
/// the runtime's next evaluation. Arrays are copied element by element.
pub fn to_script(value: HostValue, cache: &Arc<RuntimeCache>) -> Result<Dynamic> {
    let dynamic = match value {
        HostValue::Unit => Dynamic::UNIT,
        HostValue::Bool(b) => Dynamic::from(b),
        HostValue::Int(i) => Dynamic::from(i),
        HostValue::Float(f) => Dynamic::from(f),
        HostValue::Str(s) => Dynamic::from(s),
        HostValue::Object(object) => {
            let proxy = cache.proxy_for(object.class(), None);
            Dynamic::from(proxy.wrap(object)?)
        }
        HostValue::Array(items) => Dynamic::from_array(
            items
                .into_iter()
                .map(|item| to_script(item, cache))
                .collect::<Result<Array>>()?,
        ),
        HostValue::PrimitiveArray(array) => Dynamic::from_array(
            array
                .to_values()
                .into_iter()
                .map(|item| to_script(item, cache))
                .collect::<Result<Array>>()?,
        ),
    };
    Ok(dynamic)
}

/// Translate a script value into a host value
pub fn to_host(value: Dynamic) -> Result<HostValue> {
    if value.is_unit() {
        return Ok(HostValue::Unit);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(HostValue::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(HostValue::Int(i));
    }
    if let Ok(f) = value.as_float() {
        return Ok(HostValue::Float(f));
    }
    if let Ok(c) = value.as_char() {
        return Ok(HostValue::Str(c.to_string()));
    }
    if value.is_string() {
        let s = value
            .into_immutable_string()
            .map_err(|found| ScriptError::type_error(format!("expected string, found {found}")))?;
        return Ok(HostValue::Str(s.to_string()));
    }
    if value.is_array() {
        let items = value
            .into_array()
            .map_err(|found| ScriptError::type_error(format!("expected array, found {found}")))?;
        return items
            .into_iter()
            .map(to_host)
            .collect::<Result<Vec<_>>>()
            .map(HostValue::Array);
    }
    if value.is::<HostRef>() {
        let type_name = value.type_name().to_string();
        let host_ref = value.try_cast::<HostRef>().ok_or_else(|| {
            ScriptError::type_error(format!("expected host object, found {type_name}"))
        })?;
        return Ok(HostValue::Object(host_ref.object().clone()));
    }

    Err(ScriptError::type_error(format!(
        "cannot pass {} to the host",
        value.type_name()
    )))
}

/// Translate call arguments
pub fn args_to_host(args: Vec<Dynamic>) -> Result<Vec<HostValue>> {
    args.into_iter().map(to_host).collect()
}

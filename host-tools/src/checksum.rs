//! Signature checksums for registered tools.

use sha2::{Digest, Sha256};

use crate::registry::ToolImplementation;

/// Hex SHA-256 over everything that determines how a tool is called and
/// authorised: identity, arguments, return type, trust flag, variadic and
/// internal flags, and required capabilities.
///
/// Descriptions and effect tags do not contribute.
#[must_use]
pub fn signature_checksum(implementation: &ToolImplementation) -> String {
    let spec = implementation.spec();
    let mut hasher = Sha256::new();

    field(&mut hasher, implementation.identity().as_str());
    for arg in spec.args() {
        field(&mut hasher, arg.name());
        field(&mut hasher, arg.type_tag().as_str());
        field(&mut hasher, if arg.is_required() { "required" } else { "optional" });
    }
    field(&mut hasher, "->");
    field(&mut hasher, spec.return_type().as_str());
    field(&mut hasher, flag(implementation.requires_trust()));
    field(&mut hasher, flag(implementation.is_variadic()));
    field(&mut hasher, flag(implementation.is_internal()));
    for capability in implementation.required_capabilities() {
        field(&mut hasher, &capability.to_string());
    }

    hex::encode(hasher.finalize())
}

fn field(hasher: &mut Sha256, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update([0u8]);
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

//! TXT record value grammar
//!
//! Record values are flat `key=value` fields joined with semicolons;
//! list-valued fields join their items with commas.

use crate::error::DhtError;

/// Version tag every root record carries
const ROOT_VERSION: &str = "0";

/// Ordered `key=value` fields of one TXT record value
#[derive(Debug, Default)]
pub struct RecordFields {
    fields: Vec<(String, String)>,
}

impl RecordFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.fields.push((key.to_string(), value.into()));
    }

    /// Push a comma-joined list field, skipping it entirely when empty
    pub fn push_list(&mut self, key: &str, items: &[String]) {
        if !items.is_empty() {
            self.fields.push((key.to_string(), items.join(",")));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, key: &str) -> Result<&str, DhtError> {
        self.get(key).ok_or_else(|| {
            DhtError::packet_error(format!("Record value missing required field '{}'", key))
        })
    }

    /// Join the fields into the wire form
    pub fn to_value(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Split a wire value back into fields
    pub fn parse(value: &str) -> Result<RecordFields, DhtError> {
        let mut fields = RecordFields::new();
        for segment in value.split(';') {
            if segment.is_empty() {
                continue;
            }
            let (key, val) = segment.split_once('=').ok_or_else(|| {
                DhtError::packet_error(format!("Record field '{}' has no '=' separator", segment))
            })?;
            fields.push(key, val);
        }
        Ok(fields)
    }
}

/// Split a comma-joined list value; an empty value is an empty list
pub fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(',').map(str::to_string).collect()
    }
}

/// The `_did.<id>` record: membership lists for the whole family
///
/// Lists hold index labels (`k0`, `s1`) pointing at the sibling records
/// that carry the actual data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootRecord {
    pub vm: Vec<String>,
    pub auth: Vec<String>,
    pub asm: Vec<String>,
    pub agm: Vec<String>,
    pub inv: Vec<String>,
    pub del: Vec<String>,
    pub svc: Vec<String>,
}

impl RootRecord {
    pub fn to_txt_value(&self) -> String {
        let mut fields = RecordFields::new();
        fields.push("v", ROOT_VERSION);
        fields.push_list("vm", &self.vm);
        fields.push_list("auth", &self.auth);
        fields.push_list("asm", &self.asm);
        fields.push_list("agm", &self.agm);
        fields.push_list("inv", &self.inv);
        fields.push_list("del", &self.del);
        fields.push_list("svc", &self.svc);
        fields.to_value()
    }

    pub fn parse(value: &str) -> Result<RootRecord, DhtError> {
        let fields = RecordFields::parse(value)?;
        match fields.get("v") {
            Some(ROOT_VERSION) => {}
            Some(version) => {
                return Err(DhtError::decode_error(format!(
                    "Unsupported root record version '{}'",
                    version
                )))
            }
            None => {
                return Err(DhtError::decode_error("Root record missing its version field"))
            }
        }

        Ok(RootRecord {
            vm: split_list(fields.get("vm").unwrap_or("")),
            auth: split_list(fields.get("auth").unwrap_or("")),
            asm: split_list(fields.get("asm").unwrap_or("")),
            agm: split_list(fields.get("agm").unwrap_or("")),
            inv: split_list(fields.get("inv").unwrap_or("")),
            del: split_list(fields.get("del").unwrap_or("")),
            svc: split_list(fields.get("svc").unwrap_or("")),
        })
    }
}

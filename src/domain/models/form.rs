use std::collections::HashMap;

use axum::extract::Multipart;
use tracing::warn;

/// One uploaded file part: the client-declared filename and the full byte
/// payload.
#[derive(Debug, Clone)]
pub struct FormFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl FormFile {
    pub fn new(filename: String, content: Vec<u8>) -> Self {
        Self { filename, content }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// File parts extracted from an inbound multipart request, addressable by
/// field name.
///
/// A part whose byte stream failed to read is kept as an error entry so the
/// failure surfaces when (and only when) a caller asks for that field.
#[derive(Debug, Default)]
pub struct FormPayload {
    pub(crate) fields: HashMap<String, Result<FormFile, String>>,
}

impl FormPayload {
    pub async fn from_multipart(mut multipart: Multipart) -> Self {
        let mut fields = HashMap::new();

        loop {
            match multipart.next_field().await {
                Ok(Some(field)) => {
                    let name = match field.name() {
                        Some(n) => n.to_string(),
                        None => continue,
                    };
                    // Text-only fields are not file uploads; skip them.
                    let filename = match field.file_name() {
                        Some(f) => f.to_string(),
                        None => continue,
                    };

                    let entry = match field.bytes().await {
                        Ok(bytes) => Ok(FormFile::new(filename, bytes.to_vec())),
                        Err(e) => {
                            warn!("cannot read bytes of form field '{}': {}", name, e);
                            Err(e.to_string())
                        }
                    };
                    fields.insert(name, entry);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("invalid multipart data: {}", e);
                    break;
                }
            }
        }

        Self { fields }
    }

    /// Look up a file part by field name. `None` means the field was absent
    /// from the request; an `Err` entry means its stream could not be read.
    pub fn file(&self, name: &str) -> Option<&Result<FormFile, String>> {
        self.fields.get(name)
    }
}

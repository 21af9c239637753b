use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::result::Result as DefaultResult;
use std::sync::RwLock;

use serde_json::Value as JsnVal;

use super::AbstractConfidentiality;
use crate::error::{AppConfidentialityError, AppErrorCode};

const SOURCE_SIZE_LIMIT_NBYTES: u64 = 8196;

// Secrets are kept in a small JSON file in user space, callers look up
// nested values with slash-separated paths such as `backend/databases/order`.
// Found payloads are cached in serialized form since the file rarely changes.
pub struct UserSpaceConfidentiality {
    src_fullpath: String,
    cached: RwLock<HashMap<String, String>>,
}

impl UserSpaceConfidentiality {
    pub fn build(fullpath: String) -> Self {
        Self {
            src_fullpath: fullpath,
            cached: RwLock::new(HashMap::new()),
        }
    }

    fn load_source(&self) -> DefaultResult<JsnVal, AppConfidentialityError> {
        let mut file = File::open(self.src_fullpath.as_str()).map_err(|e| {
            AppConfidentialityError {
                code: AppErrorCode::IOerror(e.kind()),
                detail: e.to_string(),
            }
        })?;
        let f_sz = file
            .metadata()
            .map_err(|e| AppConfidentialityError {
                code: AppErrorCode::IOerror(e.kind()),
                detail: e.to_string(),
            })?
            .len();
        if f_sz >= SOURCE_SIZE_LIMIT_NBYTES {
            return Err(AppConfidentialityError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: format!("source-file-size:{f_sz}"),
            });
        }
        let mut rawbuf = Vec::new();
        file.read_to_end(&mut rawbuf)
            .map_err(|e| AppConfidentialityError {
                code: AppErrorCode::IOerror(e.kind()),
                detail: e.to_string(),
            })?;
        serde_json::from_slice::<JsnVal>(&rawbuf).map_err(|e| AppConfidentialityError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: e.to_string(),
        })
    }

    fn search(toplvl: &JsnVal, id_: &str) -> DefaultResult<String, AppConfidentialityError> {
        let pointer = id_
            .split('/')
            .fold(String::new(), |acc, tok| acc + "/" + tok);
        let found = toplvl
            .pointer(pointer.as_str())
            .ok_or(AppConfidentialityError {
                code: AppErrorCode::NoConfidentialityCfg,
                detail: format!("json-object-path-not-found, id:{id_}"),
            })?;
        serde_json::to_string(found).map_err(|e| AppConfidentialityError {
            code: AppErrorCode::DataCorruption,
            detail: e.to_string(),
        })
    }

    fn lock_error(detail: String) -> AppConfidentialityError {
        AppConfidentialityError {
            code: AppErrorCode::AcquireLockFailure,
            detail: detail + ", source: UserSpaceConfidentiality",
        }
    }
} // end of impl UserSpaceConfidentiality

impl AbstractConfidentiality for UserSpaceConfidentiality {
    fn try_get_payload(&self, id_: &str) -> DefaultResult<String, AppConfidentialityError> {
        {
            let rguard = self
                .cached
                .read()
                .map_err(|e| Self::lock_error(e.to_string()))?;
            if let Some(v) = rguard.get(id_) {
                return Ok(v.clone());
            }
        } // read guard dropped before loading the source file
        let toplvl = self.load_source()?;
        let found = Self::search(&toplvl, id_)?;
        let mut wguard = self
            .cached
            .write()
            .map_err(|e| Self::lock_error(e.to_string()))?;
        wguard.insert(id_.to_string(), found.clone());
        Ok(found)
    }
}

//! Common-header assembly from the request descriptor and inbound headers.

use crate::model::ServiceRequestInfo;
use axum::http::HeaderMap;
use chrono::Local;

/// Inbound HTTP headers copied verbatim into the common header.
pub mod inbound {
    pub const GLOBAL_NO: &str = "KOL-Global-No";
    pub const USER_ID: &str = "KOL-User-Id";
    pub const SOURCE_ID: &str = "KOL-Src-Id";
    pub const CMPN_CD: &str = "KOL-Cmpn-Cd";
    pub const LOG_DATETIME: &str = "KOL-Lg-Date-Time";
}

/// Option-map keys feeding the lock/token fields.
pub mod options {
    pub const LOCK_TYPE: &str = "lockType";
    pub const LOCK_ID: &str = "lockId";
    pub const LOCK_TIME_ST: &str = "lockTimeSt";
    pub const TOKEN_ID: &str = "tokenId";
    pub const BUSINESS_KEY: &str = "businessKey";
}

/// Fixed channel identity of this gateway instance.
pub const KN_CHNL_TYPE: &str = "KN";
/// Transaction flag: this gateway always originates ("throws") calls.
pub const TR_FLAG_THROW: &str = "T";
/// Service-account user recorded as the real user of every call.
pub const KN_REAL_USER_ID: &str = "91383041";
/// Service-account organization.
pub const KN_ORG_ID: &str = "SPT8050";

/// The fixed 20-field metadata block carried in every envelope.
///
/// All fields are strings; the empty string is the "absent" sentinel.
/// Field order matters to downstream legacy systems and is preserved by
/// the template renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonHeader {
    pub app_name: String,
    pub svc_name: String,
    pub fn_name: String,
    pub global_no: String,
    pub chnl_type: String,
    pub tr_flag: String,
    pub tr_date: String,
    pub tr_time: String,
    pub clnt_ip: String,
    pub user_id: String,
    pub real_user_id: String,
    pub org_id: String,
    pub src_id: String,
    pub cmpn_cd: String,
    pub lg_date_time: String,
    pub lock_type: String,
    pub lock_id: String,
    pub lock_time_st: String,
    pub token_id: String,
    pub business_key: String,
}

/// Current wall-clock time as `yyyyMMddHHmmssSSS`.
#[must_use]
pub fn now_yyyymmddhhmmss_millis() -> String {
    Local::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// Derives the common header from a request descriptor and inbound headers.
///
/// Stateless apart from the node address it stamps into `clntIp`.
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    node_ip: String,
}

impl HeaderBuilder {
    #[must_use]
    pub fn new(node_ip: impl Into<String>) -> Self {
        Self { node_ip: node_ip.into() }
    }

    /// Builds the common header.
    ///
    /// `trDate`/`trTime` are captured here, so they reflect gateway
    /// receive time rather than the caller's issue time; the skew is
    /// accepted by the downstream contract. `trTime` uses a 12-hour
    /// clock (`hhmmssSSS`), a quirk of the legacy schema that must not
    /// be corrected. Missing inbound headers and options become empty
    /// strings; this function never fails.
    #[must_use]
    pub fn build(&self, info: &ServiceRequestInfo, headers: &HeaderMap) -> CommonHeader {
        let now = Local::now();

        let lock_id = info.option(options::LOCK_ID).to_string();
        let lock_time_st = if lock_id.is_empty() {
            String::new()
        } else {
            let supplied = info.option(options::LOCK_TIME_ST);
            if supplied.is_empty() {
                now_yyyymmddhhmmss_millis()
            } else {
                supplied.to_string()
            }
        };

        CommonHeader {
            app_name: info.app_name.clone(),
            svc_name: info.svc_name.clone(),
            fn_name: info.fn_name.clone(),
            global_no: header_or_empty(headers, inbound::GLOBAL_NO),
            chnl_type: KN_CHNL_TYPE.to_string(),
            tr_flag: TR_FLAG_THROW.to_string(),
            tr_date: now.format("%Y%m%d").to_string(),
            tr_time: now.format("%I%M%S%3f").to_string(),
            clnt_ip: self.node_ip.clone(),
            user_id: header_or_empty(headers, inbound::USER_ID),
            real_user_id: KN_REAL_USER_ID.to_string(),
            org_id: KN_ORG_ID.to_string(),
            src_id: header_or_empty(headers, inbound::SOURCE_ID),
            cmpn_cd: header_or_empty(headers, inbound::CMPN_CD),
            lg_date_time: header_or_empty(headers, inbound::LOG_DATETIME),
            lock_type: info.option(options::LOCK_TYPE).to_string(),
            lock_id,
            lock_time_st,
            token_id: info.option(options::TOKEN_ID).to_string(),
            business_key: info.option(options::BUSINESS_KEY).to_string(),
        }
    }
}

fn header_or_empty(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

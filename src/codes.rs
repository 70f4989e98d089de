//! Lookup tables for HTTP status messages and LeanKit reply codes.
//!
//! LeanKit reports two layers of status: the HTTP status of the response and
//! a `ReplyCode` inside the JSON envelope. Reply codes of 500 and above are
//! application failures even when the HTTP status is 200.

/// Reply codes at or above this value are application-level failures.
pub const REPLY_FAILURE_THRESHOLD: i64 = 500;

/// Message for HTTP error statuses without a table entry.
pub const UNKNOWN_HTTP_MESSAGE: &str = "Err message tbd";

/// Description for reply codes without a table entry.
pub const UNKNOWN_REPLY_DESCRIPTION: &str = "No description found";

const HTTP_MESSAGES: &[(u16, &str)] = &[(401, "401 Authorization required - bad user or pass")];

const REPLY_CODES: &[(i64, &str)] = &[
    (100, "NoData"),
    (200, "DataRetrievalSuccess"),
    (201, "DataInsertSuccess"),
    (202, "DataUpdateSuccess"),
    (203, "DataDeleteSuccess"),
    (500, "SystemException"),
    (501, "MinorException"),
    (502, "UserException"),
    (503, "FatalException"),
    (800, "ThrottleWaitResponse"),
    (900, "WipOverrideCommentRequired"),
    (902, "ResendingEmailRequired"),
    (1000, "UnauthorizedAccess"),
];

/// Returns the human-readable message for an HTTP error status.
#[must_use]
pub fn http_status_message(status: u16) -> &'static str {
    HTTP_MESSAGES
        .iter()
        .find(|(code, _)| *code == status)
        .map_or(UNKNOWN_HTTP_MESSAGE, |(_, message)| message)
}

/// Returns the documented name of a LeanKit reply code.
#[must_use]
pub fn reply_code_description(code: i64) -> &'static str {
    REPLY_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map_or(UNKNOWN_REPLY_DESCRIPTION, |(_, description)| description)
}

/// Returns true when a reply code denotes an application failure.
#[must_use]
pub fn is_reply_failure(code: i64) -> bool {
    code >= REPLY_FAILURE_THRESHOLD
}
